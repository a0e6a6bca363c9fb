pub mod complete;
pub mod toggle;

pub use complete::{MarkLessonCompleteCommand, MarkLessonCompleteError};
pub use toggle::{ToggleLessonCommand, ToggleLessonError, ToggleLessonResponse};

use sqlx::PgConnection;
use uuid::Uuid;

use crate::features::enrollments::ledger;
use crate::features::shared::{lookup, require_account, AuthError};
use crate::models::Course;

/// Outcome of looking up a lesson for a progress write
pub(super) enum LessonAccess {
    Missing,
    Allowed(Course),
}

/// Resolve the caller and make sure they are enrolled in (or own) the
/// lesson's course
pub(super) async fn authorize_lesson(
    conn: &mut PgConnection,
    caller_id: Uuid,
    lesson_id: Uuid,
) -> Result<LessonAccess, AuthError> {
    let caller = require_account(&mut *conn, caller_id).await?;

    let Some(course) = lookup::find_lesson_course(&mut *conn, lesson_id).await? else {
        return Ok(LessonAccess::Missing);
    };

    if !ledger::can_access_course(&mut *conn, caller.id, &course).await? {
        return Err(AuthError::PermissionDenied);
    }

    Ok(LessonAccess::Allowed(course))
}
