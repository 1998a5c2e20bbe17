//! Permission-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects with 403 Forbidden unless
//! the caller's role grants the named permission (see
//! [`Role::permissions`](achievo_core::roles::Role::permissions)).
//!
//! ```ignore
//! async fn verify(RequireVerify(user): RequireVerify) -> AppResult<Json<()>> {
//!     // user's role grants achievement:verify here
//!     Ok(Json(()))
//! }
//! ```

use achievo_core::error::CoreError;
use achievo_core::roles::{
    PERM_ACHIEVEMENT_CREATE, PERM_ACHIEVEMENT_DELETE, PERM_ACHIEVEMENT_READ,
    PERM_ACHIEVEMENT_UPDATE, PERM_ACHIEVEMENT_VERIFY,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticate and check one permission.
async fn require(
    parts: &mut Parts,
    state: &AppState,
    permission: &'static str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if !user.actor().has_permission(permission) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Permission '{permission}' required"
        ))));
    }
    Ok(user)
}

macro_rules! permission_extractor {
    ($(#[$doc:meta])* $name:ident => $permission:expr) => {
        $(#[$doc])*
        pub struct $name(pub AuthUser);

        impl FromRequestParts<AppState> for $name {
            type Rejection = AppError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, Self::Rejection> {
                require(parts, state, $permission).await.map($name)
            }
        }
    };
}

permission_extractor!(
    /// Requires `achievement:create` (students and admins).
    RequireCreate => PERM_ACHIEVEMENT_CREATE
);
permission_extractor!(
    /// Requires `achievement:read` (every role).
    RequireRead => PERM_ACHIEVEMENT_READ
);
permission_extractor!(
    /// Requires `achievement:update` (students and admins).
    RequireUpdate => PERM_ACHIEVEMENT_UPDATE
);
permission_extractor!(
    /// Requires `achievement:delete` (students and admins).
    RequireDelete => PERM_ACHIEVEMENT_DELETE
);
permission_extractor!(
    /// Requires `achievement:verify` (advisors and admins).
    RequireVerify => PERM_ACHIEVEMENT_VERIFY
);
