//! Certificate PDF layout
//!
//! One landscape US-letter page. Coordinates are in PostScript points from
//! the bottom-left corner and converted to millimetres at draw time.

use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};
use uuid::Uuid;

const PAGE_WIDTH: f32 = 792.0;
const PAGE_HEIGHT: f32 = 612.0;
const MM_PER_PT: f32 = 0.352_778;

/// Widest a centred line may get before its font is scaled down
const MAX_TEXT_WIDTH: f32 = PAGE_WIDTH - 140.0;

#[derive(Debug, thiserror::Error)]
#[error("Failed to render certificate: {0}")]
pub struct RenderError(String);

impl From<printpdf::Error> for RenderError {
    fn from(err: printpdf::Error) -> Self {
        Self(err.to_string())
    }
}

/// Everything printed on a certificate
#[derive(Debug, Clone)]
pub struct CertificateDocument {
    pub id: Uuid,
    pub student_name: String,
    pub course_title: String,
    pub issued_at: DateTime<Utc>,
    pub verify_url: String,
}

/// "January 05, 2025"
pub fn issue_date_label(issued_at: &DateTime<Utc>) -> String {
    issued_at.format("%B %d, %Y").to_string()
}

fn pt(value: f32) -> Mm {
    Mm(value * MM_PER_PT)
}

fn rgb(hex: u32) -> Color {
    let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
    Color::Rgb(Rgb::new(channel(16), channel(8), channel(0), None))
}

/// Rough advance width of `text` in points. Builtin fonts carry no metrics
/// we can query, so this uses an average glyph width per family.
fn text_width(text: &str, size: f32, glyph_factor: f32) -> f32 {
    text.chars().count() as f32 * size * glyph_factor
}

/// Largest size not above `size` at which `text` fits `MAX_TEXT_WIDTH`
fn fit_size(text: &str, size: f32, glyph_factor: f32) -> f32 {
    let width = text_width(text, size, glyph_factor);
    if width <= MAX_TEXT_WIDTH {
        size
    } else {
        (size * MAX_TEXT_WIDTH / width).max(12.0)
    }
}

struct Fonts {
    bold: IndirectFontRef,
    bold_italic: IndirectFontRef,
    roman: IndirectFontRef,
    italic: IndirectFontRef,
    mono: IndirectFontRef,
}

const SERIF: f32 = 0.5;
const SERIF_BOLD: f32 = 0.55;
const MONO: f32 = 0.6;

struct Canvas<'a> {
    layer: PdfLayerReference,
    fonts: &'a Fonts,
}

impl Canvas<'_> {
    fn rect(&self, x: f32, y: f32, w: f32, h: f32, color: Color, thickness: f32) {
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(pt(x), pt(y)), false),
                (Point::new(pt(x + w), pt(y)), false),
                (Point::new(pt(x + w), pt(y + h)), false),
                (Point::new(pt(x), pt(y + h)), false),
            ],
            is_closed: true,
        });
    }

    fn line(&self, from: (f32, f32), to: (f32, f32), color: Color, thickness: f32) {
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(pt(from.0), pt(from.1)), false),
                (Point::new(pt(to.0), pt(to.1)), false),
            ],
            is_closed: false,
        });
    }

    fn circle(&self, cx: f32, cy: f32, radius: f32, color: Color, thickness: f32) {
        const SEGMENTS: usize = 48;
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(thickness);
        let points = (0..SEGMENTS)
            .map(|i| {
                let angle = i as f32 / SEGMENTS as f32 * std::f32::consts::TAU;
                let point = Point::new(pt(cx + radius * angle.cos()), pt(cy + radius * angle.sin()));
                (point, false)
            })
            .collect();
        self.layer.add_line(Line {
            points,
            is_closed: true,
        });
    }

    fn text_at(&self, text: &str, size: f32, x: f32, y: f32, font: &IndirectFontRef, color: Color) {
        self.layer.set_fill_color(color);
        self.layer.use_text(text, size, pt(x), pt(y), font);
    }

    fn centered(&self, text: &str, size: f32, y: f32, font: &IndirectFontRef, factor: f32, color: Color) {
        let size = fit_size(text, size, factor);
        let x = (PAGE_WIDTH - text_width(text, size, factor)) / 2.0;
        self.text_at(text, size, x, y, font, color);
    }

    fn right_aligned(&self, text: &str, size: f32, right: f32, y: f32, font: &IndirectFontRef, factor: f32, color: Color) {
        let x = right - text_width(text, size, factor);
        self.text_at(text, size, x, y, font, color);
    }
}

/// Render the certificate to PDF bytes
pub fn render_certificate(cert: &CertificateDocument) -> Result<Vec<u8>, RenderError> {
    let navy = || rgb(0x003366);
    let gold = || rgb(0xC5B358);
    let black = || rgb(0x000000);
    let grey = || rgb(0x555555);

    let (doc, page, layer) = PdfDocument::new(
        format!("Certificate {}", cert.id),
        pt(PAGE_WIDTH),
        pt(PAGE_HEIGHT),
        "Certificate",
    );

    let fonts = Fonts {
        bold: doc.add_builtin_font(BuiltinFont::TimesBold)?,
        bold_italic: doc.add_builtin_font(BuiltinFont::TimesBoldItalic)?,
        roman: doc.add_builtin_font(BuiltinFont::TimesRoman)?,
        italic: doc.add_builtin_font(BuiltinFont::TimesItalic)?,
        mono: doc.add_builtin_font(BuiltinFont::Courier)?,
    };
    let canvas = Canvas {
        layer: doc.get_page(page).get_layer(layer),
        fonts: &fonts,
    };
    let f = canvas.fonts;
    let (w, h) = (PAGE_WIDTH, PAGE_HEIGHT);

    // borders
    canvas.rect(20.0, 20.0, w - 40.0, h - 40.0, navy(), 10.0);
    canvas.rect(35.0, 35.0, w - 70.0, h - 70.0, gold(), 3.0);

    // header
    canvas.centered("CERTIFICATE OF COMPLETION", 40.0, h - 120.0, &f.bold, SERIF_BOLD, navy());
    canvas.centered("THIS CERTIFIES THAT", 16.0, h - 150.0, &f.roman, SERIF, gold());

    // recipient
    canvas.centered(&cert.student_name, 45.0, h - 230.0, &f.bold_italic, SERIF_BOLD, black());
    canvas.line((w / 2.0 - 150.0, h - 245.0), (w / 2.0 + 150.0, h - 245.0), navy(), 1.0);

    // course
    canvas.centered(
        "Has successfully demonstrated proficiency in",
        18.0,
        h - 280.0,
        &f.roman,
        SERIF,
        black(),
    );
    canvas.centered(&cert.course_title, 30.0, h - 330.0, &f.bold, SERIF_BOLD, navy());

    // footer
    let date = format!("Date Issued: {}", issue_date_label(&cert.issued_at));
    canvas.text_at(&date, 12.0, 60.0, 80.0, &f.mono, grey());
    canvas.line((60.0, 95.0), (200.0, 95.0), grey(), 1.0);

    let code = format!("ID: {}", cert.id);
    canvas.right_aligned(&code, 12.0, w - 60.0, 80.0, &f.mono, MONO, grey());
    let verify = format!("Verify at: {}", cert.verify_url);
    canvas.right_aligned(&verify, 10.0, w - 60.0, 65.0, &f.italic, SERIF, grey());

    // seal
    canvas.circle(w / 2.0, 85.0, 40.0, gold(), 3.0);
    canvas.centered("OFFICIAL", 10.0, 90.0, &f.bold, SERIF_BOLD, gold());
    canvas.centered("SEAL", 10.0, 78.0, &f.bold, SERIF_BOLD, gold());

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn document(name: &str) -> CertificateDocument {
        CertificateDocument {
            id: Uuid::new_v4(),
            student_name: name.to_string(),
            course_title: "Systems Programming in Rust".to_string(),
            issued_at: Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap(),
            verify_url: "https://apilearn.com/api/v1/certificates/verify".to_string(),
        }
    }

    #[test]
    fn test_issue_date_label() {
        let issued = Utc.with_ymd_and_hms(2025, 1, 5, 9, 30, 0).unwrap();
        assert_eq!(issue_date_label(&issued), "January 05, 2025");
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render_certificate(&document("Ada Lovelace")).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_names_are_scaled_down() {
        let long = "Maximilian Alexander Bartholomew von Habsburg-Lothringen";
        assert!(fit_size(long, 45.0, SERIF_BOLD) < 45.0);
        assert_eq!(fit_size("Ada", 45.0, SERIF_BOLD), 45.0);
        assert!(render_certificate(&document(long)).is_ok());
    }

    #[test]
    fn test_rgb_channels() {
        match rgb(0xFF0000) {
            Color::Rgb(c) => {
                assert_eq!(c.r, 1.0);
                assert_eq!(c.g, 0.0);
            },
            _ => panic!("expected rgb"),
        }
    }
}
