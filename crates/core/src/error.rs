use crate::types::{DbId, DocumentId};

/// Domain error kinds shared by the coordinator, the verification workflow
/// and the HTTP layer.
///
/// Messages are safe to show to the caller. Store error text never ends up
/// in here; adapters log it and the services report only which store failed.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid achievement type: {0}")]
    InvalidType(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A reference points at a document that does not exist. This is an
    /// integrity violation, never a user error.
    #[error("Document {document_id} for reference {reference_id} is missing")]
    DocumentMissing {
        reference_id: DbId,
        document_id: DocumentId,
    },

    #[error("The {store} store is unavailable")]
    StoreUnavailable { store: &'static str },

    /// The document was written but its reference could not be; the document
    /// has been (or was attempted to be) removed again.
    #[error("Failed to create achievement reference")]
    ReferenceCreateFailed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable kind, used as the `code` of HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidType(_) => "INVALID_TYPE",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::DocumentMissing { .. } => "DOCUMENT_MISSING",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            Self::ReferenceCreateFailed => "REFERENCE_CREATE_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
