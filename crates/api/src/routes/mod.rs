pub mod achievement;
pub mod advisees;
pub mod health;
pub mod notification;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /achievements                                    list, create
/// /achievements/{id}                               get, update, delete
/// /achievements/{id}/attachments                   append attachment (POST)
/// /achievements/{id}/history                       status history
/// /achievements/{id}/submit                        submit (POST)
/// /achievements/{id}/verify                        verify (POST)
/// /achievements/{id}/reject                        reject (POST)
///
/// /advisees/achievements                           advisor review queue
///
/// /notifications                                   own inbox
/// /notifications/read-all                          mark all read (POST)
/// /notifications/{id}/read                         mark one read (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/achievements", achievement::router())
        .nest("/advisees", advisees::router())
        .nest("/notifications", notification::router())
}
