//! Store and collaborator interfaces the achievement services depend on.
//!
//! Concrete implementations live elsewhere (`achievo-db` for PostgreSQL,
//! `achievo-events` for notifications, [`crate::memory`] for tests). The
//! services take them as `Arc<dyn Trait>` so the same logic runs against any
//! of them.

use async_trait::async_trait;
use serde::Serialize;

use crate::achievement::{
    AchievementDocument, AchievementReference, AchievementStatus, Attachment, DocumentPatch,
    NewDocument, NewReference, StatusHistoryEntry, Transition,
};
use crate::error::CoreError;
use crate::notification::{InboxEntry, Notification};
use crate::pagination::Page;
use crate::types::{DbId, DocumentId, Timestamp};

/// Failure reported by a store adapter.
///
/// The message is for logs only; services never forward it to callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the operation failed in transit.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness or foreign-key constraint rejected the write.
    #[error("constraint violated: {0}")]
    Conflict(String),

    /// Stored data could not be decoded into the domain model.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Log the adapter's error and report only which store failed.
    pub fn into_core(self, store: &'static str) -> CoreError {
        tracing::error!(store, error = %self, "Store operation failed");
        match self {
            Self::Unavailable(_) => CoreError::StoreUnavailable { store },
            Self::Conflict(_) | Self::Corrupt(_) => {
                CoreError::Internal(format!("The {store} store rejected the operation"))
            }
        }
    }
}

/* --------------------------------------------------------------------------
Document store
-------------------------------------------------------------------------- */

/// CRUD over achievement documents. Knows nothing about status or ownership rules.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document; the store assigns and returns its id.
    async fn insert(&self, document: NewDocument) -> StoreResult<AchievementDocument>;

    /// Find a live (not soft-deleted) document.
    async fn find(&self, id: DocumentId) -> StoreResult<Option<AchievementDocument>>;

    /// Find a document regardless of soft deletion. Audit use only.
    async fn find_including_deleted(
        &self,
        id: DocumentId,
    ) -> StoreResult<Option<AchievementDocument>>;

    /// Find several live documents at once. Missing ids are simply absent.
    async fn find_many(&self, ids: &[DocumentId]) -> StoreResult<Vec<AchievementDocument>>;

    /// Apply a content patch to a live document.
    async fn update(
        &self,
        id: DocumentId,
        patch: DocumentPatch,
        at: Timestamp,
    ) -> StoreResult<Option<AchievementDocument>>;

    /// Append one attachment to a live document.
    async fn append_attachment(
        &self,
        id: DocumentId,
        attachment: Attachment,
    ) -> StoreResult<Option<AchievementDocument>>;

    /// Mark a document as soft-deleted. Returns `false` if it was not live.
    async fn soft_delete(&self, id: DocumentId, at: Timestamp) -> StoreResult<bool>;

    /// Physically remove a document. Only used to compensate a failed create.
    async fn delete(&self, id: DocumentId) -> StoreResult<bool>;
}

/* --------------------------------------------------------------------------
Reference store
-------------------------------------------------------------------------- */

/// Filter for reference listings. Deleted references are never listed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceFilter {
    /// Restrict to these students; `None` means every student.
    pub student_ids: Option<Vec<DbId>>,
    pub status: Option<AchievementStatus>,
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// CRUD over reference records, the source of truth for status.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Insert a `draft` reference and its initial history entry.
    ///
    /// Fails with [`StoreError::Conflict`] if `document_id` is already linked.
    async fn insert(&self, reference: NewReference) -> StoreResult<AchievementReference>;

    /// Find a reference by id, including tombstoned ones.
    async fn find(&self, id: DbId) -> StoreResult<Option<AchievementReference>>;

    /// Apply `transition` only if the stored status is still `transition.source()`.
    ///
    /// The check and the write happen atomically against the store's current
    /// value, together with the history entry. Returns `None` when the status
    /// no longer matches (or the reference does not exist).
    async fn transition(
        &self,
        id: DbId,
        transition: Transition,
        actor_id: DbId,
    ) -> StoreResult<Option<AchievementReference>>;

    /// List references ordered by `created_at DESC, reference_id ASC`.
    async fn list(
        &self,
        filter: &ReferenceFilter,
        page: Page,
    ) -> StoreResult<Paginated<AchievementReference>>;

    /// Status history in chronological order.
    async fn history(&self, id: DbId) -> StoreResult<Vec<StatusHistoryEntry>>;
}

/* --------------------------------------------------------------------------
Collaborators
-------------------------------------------------------------------------- */

/// Student/advisor relationships.
///
/// Advisor *record* ids (`advisors.id`) are distinct from advisor *user* ids;
/// `students.advisor_id` holds the record id.
#[async_trait]
pub trait Directory: Send + Sync {
    /// The user account linked to a student record.
    async fn resolve_owner(&self, student_id: DbId) -> StoreResult<Option<DbId>>;

    /// The advisor record id assigned to a student, if any.
    async fn resolve_advisor(&self, student_id: DbId) -> StoreResult<Option<DbId>>;

    /// The student record of a user, if the user is a student.
    async fn student_for_user(&self, user_id: DbId) -> StoreResult<Option<DbId>>;

    /// The advisor record of a user, if the user is an advisor.
    async fn advisor_for_user(&self, user_id: DbId) -> StoreResult<Option<DbId>>;

    /// The user account linked to an advisor record.
    async fn advisor_user(&self, advisor_id: DbId) -> StoreResult<Option<DbId>>;

    /// Student record ids currently assigned to an advisor.
    async fn advisees(&self, advisor_id: DbId) -> StoreResult<Vec<DbId>>;
}

/// Fire-and-forget notification sink.
///
/// `enqueue` must return immediately and never fail the caller; delivery
/// problems are the implementation's to log.
pub trait Notifier: Send + Sync {
    fn enqueue(&self, notification: Notification);
}

/// Per-user notification inbox.
#[async_trait]
pub trait Inbox: Send + Sync {
    /// Persist a notification as unread; returns its id.
    async fn store(&self, notification: &Notification) -> StoreResult<DbId>;

    /// A user's notifications, newest first.
    async fn list(
        &self,
        user_id: DbId,
        unread_only: bool,
        page: Page,
    ) -> StoreResult<Paginated<InboxEntry>>;

    /// Mark one of the user's notifications read. `false` if it is not
    /// theirs or already read.
    async fn mark_read(&self, user_id: DbId, id: DbId) -> StoreResult<bool>;

    /// Mark every unread notification of the user read; returns the count.
    async fn mark_all_read(&self, user_id: DbId) -> StoreResult<u64>;
}
