//! Port implementations over the repositories.
//!
//! Each adapter owns a pool, calls the zero-sized repositories and converts
//! rows into domain types. Every sqlx error passes through [`store_error`].

use std::future::Future;

use achievo_core::achievement::{
    AchievementDocument, AchievementReference, AchievementStatus, Attachment, DocumentPatch,
    NewDocument, NewReference, StatusHistoryEntry, Transition,
};
use achievo_core::notification::{InboxEntry, Notification};
use achievo_core::pagination::Page;
use achievo_core::ports::{
    Directory, DocumentStore, Inbox, Paginated, ReferenceFilter, ReferenceStore, StoreResult,
};
use achievo_core::types::{DbId, DocumentId, Timestamp};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::store_error;
use crate::repositories::{
    DirectoryRepo, DocumentRepo, NotificationRepo, ReferenceRepo, StatusHistoryRepo,
};

/// Await `commit` only once the written row has decoded. On a decode failure
/// the commit future is dropped with its transaction, which rolls back.
async fn commit_decoded<T, F>(decoded: StoreResult<T>, commit: F) -> StoreResult<T>
where
    F: Future<Output = Result<(), sqlx::Error>>,
{
    let value = decoded?;
    commit.await.map_err(store_error)?;
    Ok(value)
}

fn convert<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = achievo_core::ports::StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/* --------------------------------------------------------------------------
Documents
-------------------------------------------------------------------------- */

/// Document store backed by the document database.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, document: NewDocument) -> StoreResult<AchievementDocument> {
        let row = DocumentRepo::create(&self.pool, &document)
            .await
            .map_err(store_error)?;
        row.try_into()
    }

    async fn find(&self, id: DocumentId) -> StoreResult<Option<AchievementDocument>> {
        DocumentRepo::find_by_id(&self.pool, id, false)
            .await
            .map_err(store_error)?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_including_deleted(
        &self,
        id: DocumentId,
    ) -> StoreResult<Option<AchievementDocument>> {
        DocumentRepo::find_by_id(&self.pool, id, true)
            .await
            .map_err(store_error)?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_many(&self, ids: &[DocumentId]) -> StoreResult<Vec<AchievementDocument>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = DocumentRepo::find_many(&self.pool, ids)
            .await
            .map_err(store_error)?;
        convert(rows)
    }

    async fn update(
        &self,
        id: DocumentId,
        patch: DocumentPatch,
        at: Timestamp,
    ) -> StoreResult<Option<AchievementDocument>> {
        DocumentRepo::update(&self.pool, id, &patch, at)
            .await
            .map_err(store_error)?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn append_attachment(
        &self,
        id: DocumentId,
        attachment: Attachment,
    ) -> StoreResult<Option<AchievementDocument>> {
        DocumentRepo::append_attachment(&self.pool, id, &attachment)
            .await
            .map_err(store_error)?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn soft_delete(&self, id: DocumentId, at: Timestamp) -> StoreResult<bool> {
        DocumentRepo::soft_delete(&self.pool, id, at)
            .await
            .map_err(store_error)
    }

    async fn delete(&self, id: DocumentId) -> StoreResult<bool> {
        DocumentRepo::hard_delete(&self.pool, id)
            .await
            .map_err(store_error)
    }
}

/* --------------------------------------------------------------------------
References
-------------------------------------------------------------------------- */

/// Reference store backed by the relational database.
///
/// Status changes and their history entries are written in one transaction.
#[derive(Clone)]
pub struct PgReferenceStore {
    pool: PgPool,
}

impl PgReferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceStore for PgReferenceStore {
    async fn insert(&self, reference: NewReference) -> StoreResult<AchievementReference> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let row = ReferenceRepo::create(&mut *tx, reference.student_id, reference.document_id)
            .await
            .map_err(store_error)?;
        StatusHistoryRepo::record(
            &mut *tx,
            row.id,
            None,
            AchievementStatus::Draft,
            reference.created_by,
            None,
        )
        .await
        .map_err(store_error)?;
        commit_decoded(row.try_into(), tx.commit()).await
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<AchievementReference>> {
        ReferenceRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn transition(
        &self,
        id: DbId,
        transition: Transition,
        actor_id: DbId,
    ) -> StoreResult<Option<AchievementReference>> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let Some(row) = ReferenceRepo::transition(&mut *tx, id, &transition)
            .await
            .map_err(store_error)?
        else {
            // Dropping the transaction rolls it back.
            return Ok(None);
        };
        StatusHistoryRepo::record(
            &mut *tx,
            id,
            Some(transition.source()),
            transition.target(),
            actor_id,
            transition.note(),
        )
        .await
        .map_err(store_error)?;
        commit_decoded(row.try_into(), tx.commit())
            .await
            .map(Some)
    }

    async fn list(
        &self,
        filter: &ReferenceFilter,
        page: Page,
    ) -> StoreResult<Paginated<AchievementReference>> {
        let student_ids = filter.student_ids.as_deref();
        let rows = ReferenceRepo::list(
            &self.pool,
            filter.status,
            student_ids,
            page.limit,
            page.offset,
        )
        .await
        .map_err(store_error)?;
        let total = ReferenceRepo::count(&self.pool, filter.status, student_ids)
            .await
            .map_err(store_error)?;
        Ok(Paginated {
            items: convert(rows)?,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn history(&self, id: DbId) -> StoreResult<Vec<StatusHistoryEntry>> {
        let rows = StatusHistoryRepo::list_for_reference(&self.pool, id)
            .await
            .map_err(store_error)?;
        convert(rows)
    }
}

/* --------------------------------------------------------------------------
Directory
-------------------------------------------------------------------------- */

/// Student/advisor relationships read from the relational database.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn resolve_owner(&self, student_id: DbId) -> StoreResult<Option<DbId>> {
        DirectoryRepo::student_user(&self.pool, student_id)
            .await
            .map_err(store_error)
    }

    async fn resolve_advisor(&self, student_id: DbId) -> StoreResult<Option<DbId>> {
        DirectoryRepo::student_advisor(&self.pool, student_id)
            .await
            .map_err(store_error)
    }

    async fn student_for_user(&self, user_id: DbId) -> StoreResult<Option<DbId>> {
        DirectoryRepo::student_by_user(&self.pool, user_id)
            .await
            .map_err(store_error)
    }

    async fn advisor_for_user(&self, user_id: DbId) -> StoreResult<Option<DbId>> {
        DirectoryRepo::advisor_by_user(&self.pool, user_id)
            .await
            .map_err(store_error)
    }

    async fn advisor_user(&self, advisor_id: DbId) -> StoreResult<Option<DbId>> {
        DirectoryRepo::advisor_user(&self.pool, advisor_id)
            .await
            .map_err(store_error)
    }

    async fn advisees(&self, advisor_id: DbId) -> StoreResult<Vec<DbId>> {
        DirectoryRepo::advisees(&self.pool, advisor_id)
            .await
            .map_err(store_error)
    }
}

/* --------------------------------------------------------------------------
Inbox
-------------------------------------------------------------------------- */

/// Notification inbox stored in the relational database.
#[derive(Clone)]
pub struct PgInbox {
    pool: PgPool,
}

impl PgInbox {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Inbox for PgInbox {
    async fn store(&self, notification: &Notification) -> StoreResult<DbId> {
        NotificationRepo::create(&self.pool, notification)
            .await
            .map_err(store_error)
    }

    async fn list(
        &self,
        user_id: DbId,
        unread_only: bool,
        page: Page,
    ) -> StoreResult<Paginated<InboxEntry>> {
        let rows =
            NotificationRepo::list_for_user(&self.pool, user_id, unread_only, page.limit, page.offset)
                .await
                .map_err(store_error)?;
        let total = NotificationRepo::count_for_user(&self.pool, user_id, unread_only)
            .await
            .map_err(store_error)?;
        Ok(Paginated {
            items: convert(rows)?,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn mark_read(&self, user_id: DbId, id: DbId) -> StoreResult<bool> {
        NotificationRepo::mark_read(&self.pool, id, user_id)
            .await
            .map_err(store_error)
    }

    async fn mark_all_read(&self, user_id: DbId) -> StoreResult<u64> {
        NotificationRepo::mark_all_read(&self.pool, user_id)
            .await
            .map_err(store_error)
    }
}
