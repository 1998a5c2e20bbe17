//! Handlers for the verification workflow.

use achievo_core::achievement::{AchievementReference, AchievementSummary};
use achievo_core::ports::Paginated;
use achievo_core::types::DbId;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::rbac::{RequireUpdate, RequireVerify};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /achievements/{id}/reject`.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Reason shown to the student. Blank notes are rejected by the workflow.
    #[serde(default)]
    pub note: String,
}

/// POST /api/v1/achievements/{id}/submit
pub async fn submit(
    RequireUpdate(user): RequireUpdate,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AchievementReference>>> {
    let reference = state.workflow.submit(&user.actor(), id).await?;
    Ok(Json(DataResponse { data: reference }))
}

/// POST /api/v1/achievements/{id}/verify
pub async fn verify(
    RequireVerify(user): RequireVerify,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AchievementReference>>> {
    let reference = state.workflow.verify(&user.actor(), id).await?;
    Ok(Json(DataResponse { data: reference }))
}

/// POST /api/v1/achievements/{id}/reject
pub async fn reject(
    RequireVerify(user): RequireVerify,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(body): AppJson<RejectRequest>,
) -> AppResult<Json<DataResponse<AchievementReference>>> {
    let reference = state.workflow.reject(&user.actor(), id, &body.note).await?;
    Ok(Json(DataResponse { data: reference }))
}

/// GET /api/v1/advisees/achievements
///
/// Submitted achievements awaiting the calling advisor's review.
pub async fn advisee_queue(
    RequireVerify(user): RequireVerify,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Paginated<AchievementSummary>>>> {
    let page = state
        .workflow
        .advisee_queue(&user.actor(), params.page())
        .await?;
    Ok(Json(DataResponse { data: page }))
}
