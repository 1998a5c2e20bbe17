//! Route definitions for the `/achievements` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{achievement, verification};
use crate::state::AppState;

/// Routes mounted at `/achievements`.
///
/// ```text
/// GET    /                    -> list_achievements
/// POST   /                    -> create_achievement
/// GET    /{id}                -> get_achievement
/// PUT    /{id}                -> update_achievement
/// DELETE /{id}                -> delete_achievement
/// POST   /{id}/attachments    -> add_attachment
/// GET    /{id}/history        -> get_history
/// POST   /{id}/submit         -> submit
/// POST   /{id}/verify         -> verify
/// POST   /{id}/reject         -> reject
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(achievement::list_achievements).post(achievement::create_achievement),
        )
        .route(
            "/{id}",
            get(achievement::get_achievement)
                .put(achievement::update_achievement)
                .delete(achievement::delete_achievement),
        )
        .route("/{id}/attachments", post(achievement::add_attachment))
        .route("/{id}/history", get(achievement::get_history))
        // Verification workflow
        .route("/{id}/submit", post(verification::submit))
        .route("/{id}/verify", post(verification::verify))
        .route("/{id}/reject", post(verification::reject))
}
