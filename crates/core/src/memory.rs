//! In-memory adapters for the store and collaborator ports.
//!
//! Used by tests and by the API test harness. Every adapter supports fault
//! injection by operation name (`fail_next("insert")`) and counts successful
//! writes so tests can assert that a rejected call touched nothing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::achievement::{
    AchievementDocument, AchievementReference, AchievementStatus, Attachment, DocumentPatch,
    NewDocument, NewReference, StatusHistoryEntry, Transition,
};
use crate::notification::{InboxEntry, Notification};
use crate::pagination::Page;
use crate::ports::{
    Directory, DocumentStore, Inbox, Notifier, Paginated, ReferenceFilter, ReferenceStore,
    StoreError, StoreResult,
};
use crate::types::{DbId, DocumentId, Timestamp};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Injected failures shared by all adapters.
#[derive(Default)]
struct Faults {
    pending: Mutex<HashSet<&'static str>>,
    down: AtomicBool,
}

impl Faults {
    fn check(&self, op: &'static str) -> StoreResult<()> {
        if self.down.load(Ordering::SeqCst) || lock(&self.pending).remove(op) {
            return Err(StoreError::Unavailable(format!("injected failure on {op}")));
        }
        Ok(())
    }
}

/* --------------------------------------------------------------------------
Documents
-------------------------------------------------------------------------- */

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<DocumentId, AchievementDocument>>,
    faults: Faults,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    /// Fail the next call of `op` (`insert`, `update`, `append_attachment`,
    /// `soft_delete`, `delete`, `find`) with [`StoreError::Unavailable`].
    pub fn fail_next(&self, op: &'static str) {
        lock(&self.faults.pending).insert(op);
    }

    /// Fail every call until switched back.
    pub fn set_unavailable(&self, down: bool) {
        self.faults.down.store(down, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every stored document, soft-deleted ones included.
    pub fn all(&self) -> Vec<AchievementDocument> {
        let mut docs: Vec<_> = lock(&self.documents).values().cloned().collect();
        docs.sort_by_key(|d| d.created_at);
        docs
    }

    /// Drop a document behind the coordinator's back.
    pub fn remove(&self, id: DocumentId) {
        lock(&self.documents).remove(&id);
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn modify(
        &self,
        id: DocumentId,
        at: Timestamp,
        change: impl FnOnce(&mut AchievementDocument),
    ) -> Option<AchievementDocument> {
        let mut documents = lock(&self.documents);
        let document = documents.get_mut(&id).filter(|d| !d.is_deleted)?;
        change(document);
        document.updated_at = at;
        self.wrote();
        Some(document.clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, document: NewDocument) -> StoreResult<AchievementDocument> {
        self.faults.check("insert")?;
        let now = Utc::now();
        let stored = AchievementDocument {
            document_id: DocumentId::new_v4(),
            owner_student_id: document.owner_student_id,
            achievement_type: document.achievement_type,
            title: document.title,
            description: document.description,
            details: document.details,
            attachments: document.attachments,
            tags: document.tags,
            achieved_date: document.achieved_date,
            points: document.points,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        lock(&self.documents).insert(stored.document_id, stored.clone());
        self.wrote();
        Ok(stored)
    }

    async fn find(&self, id: DocumentId) -> StoreResult<Option<AchievementDocument>> {
        self.faults.check("find")?;
        Ok(lock(&self.documents)
            .get(&id)
            .filter(|d| !d.is_deleted)
            .cloned())
    }

    async fn find_including_deleted(
        &self,
        id: DocumentId,
    ) -> StoreResult<Option<AchievementDocument>> {
        self.faults.check("find")?;
        Ok(lock(&self.documents).get(&id).cloned())
    }

    async fn find_many(&self, ids: &[DocumentId]) -> StoreResult<Vec<AchievementDocument>> {
        self.faults.check("find")?;
        let documents = lock(&self.documents);
        Ok(ids
            .iter()
            .filter_map(|id| documents.get(id))
            .filter(|d| !d.is_deleted)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: DocumentId,
        patch: DocumentPatch,
        at: Timestamp,
    ) -> StoreResult<Option<AchievementDocument>> {
        self.faults.check("update")?;
        Ok(self.modify(id, at, |d| {
            if let Some(title) = patch.title {
                d.title = title;
            }
            if let Some(description) = patch.description {
                d.description = description;
            }
            if let Some(details) = patch.details {
                d.details = details;
            }
            if let Some(tags) = patch.tags {
                d.tags = tags;
            }
            if let Some(date) = patch.achieved_date {
                d.achieved_date = Some(date);
            }
            if let Some(points) = patch.points {
                d.points = points;
            }
        }))
    }

    async fn append_attachment(
        &self,
        id: DocumentId,
        attachment: Attachment,
    ) -> StoreResult<Option<AchievementDocument>> {
        self.faults.check("append_attachment")?;
        let at = attachment.uploaded_at;
        Ok(self.modify(id, at, |d| d.attachments.push(attachment)))
    }

    async fn soft_delete(&self, id: DocumentId, at: Timestamp) -> StoreResult<bool> {
        self.faults.check("soft_delete")?;
        Ok(self
            .modify(id, at, |d| {
                d.is_deleted = true;
                d.deleted_at = Some(at);
            })
            .is_some())
    }

    async fn delete(&self, id: DocumentId) -> StoreResult<bool> {
        self.faults.check("delete")?;
        let removed = lock(&self.documents).remove(&id).is_some();
        if removed {
            self.wrote();
        }
        Ok(removed)
    }
}

/* --------------------------------------------------------------------------
References
-------------------------------------------------------------------------- */

#[derive(Default)]
struct ReferenceState {
    references: BTreeMap<DbId, AchievementReference>,
    history: Vec<StatusHistoryEntry>,
}

impl ReferenceState {
    fn record(
        &mut self,
        reference_id: DbId,
        old_status: Option<AchievementStatus>,
        new_status: AchievementStatus,
        changed_by: DbId,
        note: Option<String>,
        at: Timestamp,
    ) {
        let id = self.history.len() as DbId + 1;
        self.history.push(StatusHistoryEntry {
            id,
            reference_id,
            old_status,
            new_status,
            changed_by,
            note,
            created_at: at,
        });
    }
}

#[derive(Default)]
pub struct MemoryReferenceStore {
    state: Mutex<ReferenceState>,
    faults: Faults,
    writes: AtomicUsize,
}

impl MemoryReferenceStore {
    /// Fail the next call of `op` (`insert`, `transition`, `find`, `list`,
    /// `history`) with [`StoreError::Unavailable`].
    pub fn fail_next(&self, op: &'static str) {
        lock(&self.faults.pending).insert(op);
    }

    pub fn set_unavailable(&self, down: bool) {
        self.faults.down.store(down, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every stored reference in id order, tombstones included.
    pub fn all(&self) -> Vec<AchievementReference> {
        lock(&self.state).references.values().cloned().collect()
    }

    /// Every history entry in insertion order.
    pub fn all_history(&self) -> Vec<StatusHistoryEntry> {
        lock(&self.state).history.clone()
    }
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn insert(&self, reference: NewReference) -> StoreResult<AchievementReference> {
        self.faults.check("insert")?;
        let mut state = lock(&self.state);
        if state
            .references
            .values()
            .any(|r| r.document_id == reference.document_id)
        {
            return Err(StoreError::Conflict(format!(
                "document {} is already referenced",
                reference.document_id
            )));
        }

        let now = Utc::now();
        let id = state.references.keys().next_back().copied().unwrap_or(0) + 1;
        let stored = AchievementReference {
            reference_id: id,
            student_id: reference.student_id,
            document_id: reference.document_id,
            status: AchievementStatus::Draft,
            submitted_at: None,
            verified_at: None,
            verified_by: None,
            rejection_note: None,
            created_at: now,
            updated_at: now,
        };
        state.references.insert(id, stored.clone());
        state.record(id, None, AchievementStatus::Draft, reference.created_by, None, now);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<AchievementReference>> {
        self.faults.check("find")?;
        Ok(lock(&self.state).references.get(&id).cloned())
    }

    async fn transition(
        &self,
        id: DbId,
        transition: Transition,
        actor_id: DbId,
    ) -> StoreResult<Option<AchievementReference>> {
        self.faults.check("transition")?;
        let mut state = lock(&self.state);
        let Some(reference) = state
            .references
            .get_mut(&id)
            .filter(|r| r.status == transition.source())
        else {
            return Ok(None);
        };
        transition.apply(reference);
        let updated = reference.clone();
        state.record(
            id,
            Some(transition.source()),
            transition.target(),
            actor_id,
            transition.note().map(str::to_string),
            transition.at(),
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(updated))
    }

    async fn list(
        &self,
        filter: &ReferenceFilter,
        page: Page,
    ) -> StoreResult<Paginated<AchievementReference>> {
        self.faults.check("list")?;
        let state = lock(&self.state);
        let mut matching: Vec<_> = state
            .references
            .values()
            .filter(|r| r.status != AchievementStatus::Deleted)
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| {
                filter
                    .student_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&r.student_id))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.reference_id.cmp(&b.reference_id))
        });

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Paginated {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn history(&self, id: DbId) -> StoreResult<Vec<StatusHistoryEntry>> {
        self.faults.check("history")?;
        Ok(lock(&self.state)
            .history
            .iter()
            .filter(|e| e.reference_id == id)
            .cloned()
            .collect())
    }
}

/* --------------------------------------------------------------------------
Directory and notifier
-------------------------------------------------------------------------- */

#[derive(Default)]
struct Roster {
    /// student record -> (user, assigned advisor record)
    students: HashMap<DbId, (DbId, Option<DbId>)>,
    /// advisor record -> user
    advisors: HashMap<DbId, DbId>,
}

#[derive(Default)]
pub struct MemoryDirectory {
    roster: Mutex<Roster>,
    faults: Faults,
}

impl MemoryDirectory {
    pub fn add_student(&self, student_id: DbId, user_id: DbId, advisor_id: Option<DbId>) {
        lock(&self.roster)
            .students
            .insert(student_id, (user_id, advisor_id));
    }

    pub fn add_advisor(&self, advisor_id: DbId, user_id: DbId) {
        lock(&self.roster).advisors.insert(advisor_id, user_id);
    }

    /// Change (or clear) a student's assigned advisor.
    pub fn assign(&self, student_id: DbId, advisor_id: Option<DbId>) {
        if let Some(entry) = lock(&self.roster).students.get_mut(&student_id) {
            entry.1 = advisor_id;
        }
    }

    pub fn set_unavailable(&self, down: bool) {
        self.faults.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn resolve_owner(&self, student_id: DbId) -> StoreResult<Option<DbId>> {
        self.faults.check("resolve_owner")?;
        Ok(lock(&self.roster).students.get(&student_id).map(|s| s.0))
    }

    async fn resolve_advisor(&self, student_id: DbId) -> StoreResult<Option<DbId>> {
        self.faults.check("resolve_advisor")?;
        Ok(lock(&self.roster)
            .students
            .get(&student_id)
            .and_then(|s| s.1))
    }

    async fn student_for_user(&self, user_id: DbId) -> StoreResult<Option<DbId>> {
        self.faults.check("student_for_user")?;
        Ok(lock(&self.roster)
            .students
            .iter()
            .find(|(_, s)| s.0 == user_id)
            .map(|(id, _)| *id))
    }

    async fn advisor_for_user(&self, user_id: DbId) -> StoreResult<Option<DbId>> {
        self.faults.check("advisor_for_user")?;
        Ok(lock(&self.roster)
            .advisors
            .iter()
            .find(|(_, u)| **u == user_id)
            .map(|(id, _)| *id))
    }

    async fn advisor_user(&self, advisor_id: DbId) -> StoreResult<Option<DbId>> {
        self.faults.check("advisor_user")?;
        Ok(lock(&self.roster).advisors.get(&advisor_id).copied())
    }

    async fn advisees(&self, advisor_id: DbId) -> StoreResult<Vec<DbId>> {
        self.faults.check("advisees")?;
        let mut ids: Vec<_> = lock(&self.roster)
            .students
            .iter()
            .filter(|(_, s)| s.1 == Some(advisor_id))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

/// Notifier that keeps every notification for inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn enqueue(&self, notification: Notification) {
        lock(&self.sent).push(notification);
    }
}

#[derive(Default)]
pub struct MemoryInbox {
    entries: Mutex<Vec<InboxEntry>>,
    faults: Faults,
}

impl MemoryInbox {
    pub fn fail_next(&self, op: &'static str) {
        lock(&self.faults.pending).insert(op);
    }

    pub fn all(&self) -> Vec<InboxEntry> {
        lock(&self.entries).clone()
    }
}

#[async_trait]
impl Inbox for MemoryInbox {
    async fn store(&self, notification: &Notification) -> StoreResult<DbId> {
        self.faults.check("store")?;
        let mut entries = lock(&self.entries);
        let id = entries.len() as DbId + 1;
        entries.push(InboxEntry {
            id,
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            payload: notification.payload.clone(),
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list(
        &self,
        user_id: DbId,
        unread_only: bool,
        page: Page,
    ) -> StoreResult<Paginated<InboxEntry>> {
        self.faults.check("list")?;
        let entries = lock(&self.entries);
        let mut matching: Vec<_> = entries
            .iter()
            .filter(|e| e.user_id == user_id && !(unread_only && e.is_read))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Paginated {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn mark_read(&self, user_id: DbId, id: DbId) -> StoreResult<bool> {
        self.faults.check("mark_read")?;
        let mut entries = lock(&self.entries);
        match entries
            .iter_mut()
            .find(|e| e.id == id && e.user_id == user_id && !e.is_read)
        {
            Some(entry) => {
                entry.is_read = true;
                entry.read_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: DbId) -> StoreResult<u64> {
        self.faults.check("mark_all_read")?;
        let now = Utc::now();
        let mut count = 0;
        for entry in lock(&self.entries)
            .iter_mut()
            .filter(|e| e.user_id == user_id && !e.is_read)
        {
            entry.is_read = true;
            entry.read_at = Some(now);
            count += 1;
        }
        Ok(count)
    }
}
