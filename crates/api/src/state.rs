use std::sync::Arc;

use achievo_core::coordinator::AchievementCoordinator;
use achievo_core::ports::Inbox;
use achievo_core::workflow::VerificationWorkflow;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every field is an `Arc` or a handle around one.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Create/read/update/delete/attach/list/history.
    pub coordinator: AchievementCoordinator,
    /// Submit/verify/reject and the advisee queue.
    pub workflow: VerificationWorkflow,
    /// Per-user notification inbox.
    pub inbox: Arc<dyn Inbox>,
    /// Named pools reported by `/health`. Empty when running on in-memory stores.
    pub databases: Arc<Vec<(&'static str, achievo_db::DbPool)>>,
}
