//! Shared query parameter types for API handlers.

use achievo_core::achievement::AchievementStatus;
use achievo_core::pagination::Page;
use serde::Deserialize;

use crate::error::AppError;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Out-of-range values are clamped by [`Page::new`], never rejected.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

/// Query parameters for `GET /achievements`.
#[derive(Debug, Default, Deserialize)]
pub struct AchievementListParams {
    /// One of `draft`, `submitted`, `verified`, `rejected`.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AchievementListParams {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }

    /// Parse the status filter. Deleted achievements are never listed, so
    /// `deleted` is rejected along with unknown names.
    pub fn status(&self) -> Result<Option<AchievementStatus>, AppError> {
        let Some(name) = self.status.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        match AchievementStatus::from_name(name) {
            Some(status) if status != AchievementStatus::Deleted => Ok(Some(status)),
            _ => Err(AppError::BadRequest(format!(
                "Invalid status filter '{name}'. Must be one of: draft, submitted, verified, rejected"
            ))),
        }
    }
}

/// Query parameters for `GET /notifications`.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl NotificationQuery {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}
