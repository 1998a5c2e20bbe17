//! Handlers for the `/achievements` resource.
//!
//! Role gating happens in the extractors; ownership and advisor relations
//! are checked by the coordinator on every call.

use achievo_core::achievement::{
    AchievementRecord, AchievementSummary, AttachmentDescriptor, StatusHistoryEntry,
};
use achievo_core::coordinator::{CreateAchievement, UpdateAchievement};
use achievo_core::error::CoreError;
use achievo_core::ports::Paginated;
use achievo_core::roles::Role;
use achievo_core::types::DbId;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::middleware::rbac::{RequireCreate, RequireDelete, RequireRead, RequireUpdate};
use crate::query::AchievementListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /achievements`.
#[derive(Debug, Deserialize)]
pub struct CreateAchievementRequest {
    /// Owning student record. Required for admins; students always create
    /// for themselves and may omit it.
    pub student_id: Option<DbId>,
    #[serde(flatten)]
    pub achievement: CreateAchievement,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/achievements
///
/// Achievements visible to the caller, newest first.
pub async fn list_achievements(
    RequireRead(user): RequireRead,
    State(state): State<AppState>,
    Query(params): Query<AchievementListParams>,
) -> AppResult<Json<DataResponse<Paginated<AchievementSummary>>>> {
    let status = params.status()?;
    let page = state
        .coordinator
        .list(&user.actor(), status, params.page())
        .await?;
    Ok(Json(DataResponse { data: page }))
}

/// POST /api/v1/achievements
///
/// Create a draft. Returns 201 with the document and its reference.
pub async fn create_achievement(
    RequireCreate(user): RequireCreate,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateAchievementRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = user.actor();
    let owner = match actor.role {
        Role::Student => {
            let own = state
                .coordinator
                .student_record(&actor)
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::Forbidden(
                        "No student profile for this user".into(),
                    ))
                })?;
            // A student naming someone else is caught by the guard.
            input.student_id.unwrap_or(own)
        }
        _ => input.student_id.ok_or_else(|| {
            AppError::BadRequest("student_id is required when creating for a student".into())
        })?,
    };

    let record = state
        .coordinator
        .create(&actor, owner, input.achievement)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// GET /api/v1/achievements/{id}
pub async fn get_achievement(
    RequireRead(user): RequireRead,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AchievementRecord>>> {
    let record = state.coordinator.get(&user.actor(), id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// PUT /api/v1/achievements/{id}
///
/// Edit a draft. Returns 409 once the achievement has been submitted.
pub async fn update_achievement(
    RequireUpdate(user): RequireUpdate,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<UpdateAchievement>,
) -> AppResult<Json<DataResponse<AchievementRecord>>> {
    let record = state.coordinator.update(&user.actor(), id, input).await?;
    Ok(Json(DataResponse { data: record }))
}

/// DELETE /api/v1/achievements/{id}
///
/// Tombstone a draft. Returns 204 No Content.
pub async fn delete_achievement(
    RequireDelete(user): RequireDelete,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.coordinator.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/achievements/{id}/attachments
///
/// Append a descriptor produced by the file storage service.
pub async fn add_attachment(
    RequireCreate(user): RequireCreate,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(descriptor): AppJson<AttachmentDescriptor>,
) -> AppResult<Json<DataResponse<AchievementRecord>>> {
    let record = state
        .coordinator
        .attach(&user.actor(), id, descriptor)
        .await?;
    Ok(Json(DataResponse { data: record }))
}

/// GET /api/v1/achievements/{id}/history
pub async fn get_history(
    RequireRead(user): RequireRead,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<StatusHistoryEntry>>>> {
    let history = state.coordinator.history(&user.actor(), id).await?;
    Ok(Json(DataResponse { data: history }))
}
