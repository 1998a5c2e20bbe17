//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`] and only ever touch
//! the caller's own inbox.

use achievo_core::error::CoreError;
use achievo_core::notification::InboxEntry;
use achievo_core::ports::{Paginated, StoreError};
use achievo_core::types::DbId;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::NotificationQuery;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub marked_read: u64,
}

fn inbox_error(err: StoreError) -> AppError {
    AppError::Core(err.into_core("inbox"))
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Paginated<InboxEntry>>>> {
    let page = state
        .inbox
        .list(auth.user_id, params.unread_only, params.page())
        .await
        .map_err(inbox_error)?;
    Ok(Json(DataResponse { data: page }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Returns 204 No Content, or 404 if the notification is not the caller's
/// or is already read.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let found = state
        .inbox
        .mark_read(auth.user_id, notification_id)
        .await
        .map_err(inbox_error)?;

    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let marked_read = state
        .inbox
        .mark_all_read(auth.user_id)
        .await
        .map_err(inbox_error)?;
    Ok(Json(DataResponse {
        data: MarkedRead { marked_read },
    }))
}
