//! Route definitions for the `/advisees` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::verification;
use crate::state::AppState;

/// Routes mounted at `/advisees`.
///
/// ```text
/// GET    /achievements        -> advisee_queue
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/achievements", get(verification::advisee_queue))
}
