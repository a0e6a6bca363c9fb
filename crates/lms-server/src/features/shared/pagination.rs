//! Page/per-page parameters for list queries

use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

/// Requested page; out-of-range values are clamped rather than rejected
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PaginationParams {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self { page, per_page }
    }

    pub fn page(&self) -> i64 {
        self.page.map_or(1, |p| p.max(1))
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .map_or(DEFAULT_PER_PAGE, |n| n.clamp(1, MAX_PER_PAGE))
    }

    /// Rows to skip for `OFFSET`
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMetadata {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMetadata {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total = total.max(0);
        let pages = total / per_page + i64::from(total % per_page != 0);
        Self {
            page,
            per_page,
            total,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMetadata,
}

impl<T> Paginated<T> {
    pub fn from_items(items: Vec<T>, params: &PaginationParams, total: i64) -> Self {
        Self {
            items,
            pagination: PaginationMetadata::new(params.page(), params.per_page(), total),
        }
    }
}
