//! Achievement coordinator: keeps documents and references paired across
//! the two stores.
//!
//! Every create writes the document first and the reference second. If the
//! reference write fails the document is deleted again (best effort) and the
//! caller gets [`CoreError::ReferenceCreateFailed`]. A failed compensating
//! delete leaves an orphan document behind; it is logged with
//! `alarm = "consistency"` and left for the out-of-band reconciliation sweep.
//! Delete has the mirror-image window: a tombstoned reference whose document
//! could not be soft-deleted.
//!
//! Both two-write sequences run on their own task and are awaited, so
//! dropping the caller's future cannot stop them between the two writes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::achievement::{
    AchievementDocument, AchievementRecord, AchievementReference, AchievementStatus,
    AchievementSummary, AchievementType, Attachment, AttachmentDescriptor, DocumentPatch,
    NewDocument, NewReference, StatusHistoryEntry, Transition,
};
use crate::authorization::{directory_error, Actor, AuthorizationGuard, Relation};
use crate::error::CoreError;
use crate::pagination::Page;
use crate::ports::{DocumentStore, Paginated, ReferenceFilter, ReferenceStore, StoreError};
use crate::roles::Role;
use crate::scoring::score;
use crate::types::{DbId, DocumentId};

/// Relations allowed to read an achievement.
pub(crate) const READERS: &[Relation] = &[Relation::Owner, Relation::Advisor];

/// Relations allowed to change a draft.
pub(crate) const EDITORS: &[Relation] = &[Relation::Owner];

/* --------------------------------------------------------------------------
Inputs
-------------------------------------------------------------------------- */

/// Client input for a new achievement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAchievement {
    #[serde(rename = "type", alias = "achievement_type")]
    pub achievement_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default)]
    pub attachments: Vec<AttachmentDescriptor>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub achieved_date: Option<NaiveDate>,
}

/// Client edits to a draft. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAchievement {
    /// Accepted only if it names the current type.
    #[serde(default, rename = "type", alias = "achievement_type")]
    pub achievement_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<Map<String, Value>>,
    pub tags: Option<Vec<String>>,
    pub achieved_date: Option<NaiveDate>,
}

/* --------------------------------------------------------------------------
Coordinator
-------------------------------------------------------------------------- */

#[derive(Clone)]
pub struct AchievementCoordinator {
    documents: Arc<dyn DocumentStore>,
    references: Arc<dyn ReferenceStore>,
    guard: AuthorizationGuard,
}

impl AchievementCoordinator {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        references: Arc<dyn ReferenceStore>,
        guard: AuthorizationGuard,
    ) -> Self {
        Self {
            documents,
            references,
            guard,
        }
    }

    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    pub(crate) fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    pub(crate) fn references(&self) -> &Arc<dyn ReferenceStore> {
        &self.references
    }

    /// The student record of the calling user, if they are a student.
    pub async fn student_record(&self, actor: &Actor) -> Result<Option<DbId>, CoreError> {
        if actor.role != Role::Student {
            return Ok(None);
        }
        self.guard
            .directory()
            .student_for_user(actor.user_id)
            .await
            .map_err(directory_error)
    }

    /// Create a draft achievement owned by `owner_student_id`.
    pub async fn create(
        &self,
        actor: &Actor,
        owner_student_id: DbId,
        input: CreateAchievement,
    ) -> Result<AchievementRecord, CoreError> {
        let kind = AchievementType::parse(&input.achievement_type)?;
        let title = required_text("title", input.title)?;
        self.guard.ensure(actor, EDITORS, owner_student_id).await?;

        let scored = score(kind, &input.details);
        let now = Utc::now();
        let document = NewDocument {
            owner_student_id,
            achievement_type: kind,
            title,
            description: input.description,
            details: scored.details,
            attachments: input
                .attachments
                .into_iter()
                .map(|a| Attachment::from_descriptor(a, now))
                .collect(),
            tags: clean_tags(input.tags),
            achieved_date: input.achieved_date,
            points: scored.points,
        };

        let documents = Arc::clone(&self.documents);
        let references = Arc::clone(&self.references);
        let created_by = actor.user_id;

        let record = tokio::spawn(write_pair(documents, references, document, created_by))
            .await
            .map_err(join_error)??;

        tracing::info!(
            reference_id = record.reference.reference_id,
            document_id = %record.document.document_id,
            student_id = owner_student_id,
            achievement_type = %kind,
            points = record.document.points,
            "Achievement created",
        );
        Ok(record)
    }

    /// Read an achievement with its reference metadata.
    pub async fn get(&self, actor: &Actor, reference_id: DbId) -> Result<AchievementRecord, CoreError> {
        let reference = self.live_reference(reference_id).await?;
        self.guard.ensure(actor, READERS, reference.student_id).await?;
        self.record(reference).await
    }

    /// Edit a draft. Re-scores when the details change.
    pub async fn update(
        &self,
        actor: &Actor,
        reference_id: DbId,
        input: UpdateAchievement,
    ) -> Result<AchievementRecord, CoreError> {
        let reference = self.live_reference(reference_id).await?;
        self.guard.ensure(actor, EDITORS, reference.student_id).await?;
        ensure_draft(&reference, "edited")?;

        let current = self.document_of(&reference).await?;
        if let Some(requested) = input.achievement_type.as_deref() {
            if AchievementType::parse(requested)? != current.achievement_type {
                return Err(CoreError::InvalidArgument(
                    "Achievement type cannot be changed after creation".into(),
                ));
            }
        }

        let mut patch = DocumentPatch {
            title: input.title.map(|t| required_text("title", t)).transpose()?,
            description: input.description,
            tags: input.tags.map(clean_tags),
            achieved_date: input.achieved_date,
            ..DocumentPatch::default()
        };
        if let Some(raw) = input.details {
            let scored = score(current.achievement_type, &raw);
            patch.details = Some(scored.details);
            patch.points = Some(scored.points);
        }

        let document = self
            .documents
            .update(reference.document_id, patch, Utc::now())
            .await
            .map_err(|e| store_error("document", e))?
            .ok_or_else(|| document_missing(&reference))?;

        tracing::info!(reference_id, actor_id = actor.user_id, "Achievement updated");
        Ok(AchievementRecord {
            reference,
            document,
        })
    }

    /// Tombstone a draft and soft-delete its document.
    pub async fn delete(&self, actor: &Actor, reference_id: DbId) -> Result<(), CoreError> {
        let reference = self.live_reference(reference_id).await?;
        self.guard.ensure(actor, EDITORS, reference.student_id).await?;
        ensure_draft(&reference, "deleted")?;

        let documents = Arc::clone(&self.documents);
        let references = Arc::clone(&self.references);
        let actor_id = actor.user_id;
        let document_id = reference.document_id;

        tokio::spawn(tombstone_pair(
            documents,
            references,
            reference_id,
            document_id,
            actor_id,
        ))
        .await
        .map_err(join_error)?
    }

    /// Append an uploaded file to a draft.
    pub async fn attach(
        &self,
        actor: &Actor,
        reference_id: DbId,
        descriptor: AttachmentDescriptor,
    ) -> Result<AchievementRecord, CoreError> {
        if descriptor.filename.trim().is_empty() || descriptor.url.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "Attachment filename and url are required".into(),
            ));
        }
        let reference = self.live_reference(reference_id).await?;
        self.guard.ensure(actor, EDITORS, reference.student_id).await?;
        ensure_draft(&reference, "given new attachments")?;

        let attachment = Attachment::from_descriptor(descriptor, Utc::now());
        let document = self
            .documents
            .append_attachment(reference.document_id, attachment)
            .await
            .map_err(|e| store_error("document", e))?
            .ok_or_else(|| document_missing(&reference))?;

        tracing::info!(
            reference_id,
            attachments = document.attachments.len(),
            "Attachment added",
        );
        Ok(AchievementRecord {
            reference,
            document,
        })
    }

    /// List achievements visible to the caller.
    ///
    /// Admins see everything, students their own, advisors their advisees'.
    pub async fn list(
        &self,
        actor: &Actor,
        status: Option<AchievementStatus>,
        page: Page,
    ) -> Result<Paginated<AchievementSummary>, CoreError> {
        let directory = self.guard.directory();
        let student_ids = match actor.role {
            Role::Admin => None,
            Role::Student => Some(
                directory
                    .student_for_user(actor.user_id)
                    .await
                    .map_err(directory_error)?
                    .into_iter()
                    .collect(),
            ),
            Role::Advisor => match directory
                .advisor_for_user(actor.user_id)
                .await
                .map_err(directory_error)?
            {
                Some(advisor_id) => Some(
                    directory
                        .advisees(advisor_id)
                        .await
                        .map_err(directory_error)?,
                ),
                None => Some(Vec::new()),
            },
        };

        let filter = ReferenceFilter {
            student_ids,
            status,
        };
        self.list_filtered(&filter, page).await
    }

    /// Status history of an achievement, oldest first.
    pub async fn history(
        &self,
        actor: &Actor,
        reference_id: DbId,
    ) -> Result<Vec<StatusHistoryEntry>, CoreError> {
        let reference = self.live_reference(reference_id).await?;
        self.guard.ensure(actor, READERS, reference.student_id).await?;
        self.references
            .history(reference_id)
            .await
            .map_err(|e| store_error("reference", e))
    }

    /* ---- shared with the verification workflow ---- */

    /// A reference that exists and is not tombstoned.
    pub(crate) async fn live_reference(
        &self,
        reference_id: DbId,
    ) -> Result<AchievementReference, CoreError> {
        match self
            .references
            .find(reference_id)
            .await
            .map_err(|e| store_error("reference", e))?
        {
            Some(r) if r.status != AchievementStatus::Deleted => Ok(r),
            _ => Err(CoreError::NotFound {
                entity: "Achievement",
                id: reference_id,
            }),
        }
    }

    pub(crate) async fn list_filtered(
        &self,
        filter: &ReferenceFilter,
        page: Page,
    ) -> Result<Paginated<AchievementSummary>, CoreError> {
        if matches!(&filter.student_ids, Some(ids) if ids.is_empty()) {
            return Ok(Paginated {
                items: Vec::new(),
                total: 0,
                limit: page.limit,
                offset: page.offset,
            });
        }
        let references = self
            .references
            .list(filter, page)
            .await
            .map_err(|e| store_error("reference", e))?;
        self.summarize(references).await
    }

    async fn summarize(
        &self,
        page: Paginated<AchievementReference>,
    ) -> Result<Paginated<AchievementSummary>, CoreError> {
        let ids: Vec<_> = page.items.iter().map(|r| r.document_id).collect();
        let documents: HashMap<_, _> = self
            .documents
            .find_many(&ids)
            .await
            .map_err(|e| store_error("document", e))?
            .into_iter()
            .map(|d| (d.document_id, d))
            .collect();

        let items = page
            .items
            .into_iter()
            .filter_map(|reference| match documents.get(&reference.document_id) {
                Some(document) => Some(AchievementSummary::new(reference, document)),
                None => {
                    tracing::error!(
                        alarm = "consistency",
                        reference_id = reference.reference_id,
                        document_id = %reference.document_id,
                        "Listed reference has no document",
                    );
                    None
                }
            })
            .collect();

        Ok(Paginated {
            items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn record(&self, reference: AchievementReference) -> Result<AchievementRecord, CoreError> {
        let document = self.document_of(&reference).await?;
        Ok(AchievementRecord {
            reference,
            document,
        })
    }

    pub(crate) async fn document_of(
        &self,
        reference: &AchievementReference,
    ) -> Result<AchievementDocument, CoreError> {
        self.documents
            .find(reference.document_id)
            .await
            .map_err(|e| store_error("document", e))?
            .ok_or_else(|| document_missing(reference))
    }
}

/* --------------------------------------------------------------------------
Two-write sequences
-------------------------------------------------------------------------- */

/// Document first, then reference; compensate the document on failure.
async fn write_pair(
    documents: Arc<dyn DocumentStore>,
    references: Arc<dyn ReferenceStore>,
    document: NewDocument,
    created_by: DbId,
) -> Result<AchievementRecord, CoreError> {
    let document = documents
        .insert(document)
        .await
        .map_err(|e| store_error("document", e))?;

    let new_reference = NewReference {
        student_id: document.owner_student_id,
        document_id: document.document_id,
        created_by,
    };
    match references.insert(new_reference).await {
        Ok(reference) => Ok(AchievementRecord {
            reference,
            document,
        }),
        Err(err) => {
            tracing::error!(
                error = %err,
                document_id = %document.document_id,
                "Reference write failed, deleting document",
            );
            compensate_create(documents.as_ref(), document.document_id).await;
            Err(CoreError::ReferenceCreateFailed)
        }
    }
}

async fn compensate_create(documents: &dyn DocumentStore, document_id: DocumentId) {
    match documents.delete(document_id).await {
        Ok(true) => tracing::warn!(%document_id, "Compensating delete removed document"),
        Ok(false) => tracing::warn!(%document_id, "Compensating delete found no document"),
        Err(err) => tracing::error!(
            alarm = "consistency",
            error = %err,
            %document_id,
            "Compensating delete failed, document is orphaned",
        ),
    }
}

/// Reference tombstone first, then document soft delete.
///
/// A document failure is logged and does not fail the delete.
async fn tombstone_pair(
    documents: Arc<dyn DocumentStore>,
    references: Arc<dyn ReferenceStore>,
    reference_id: DbId,
    document_id: DocumentId,
    actor_id: DbId,
) -> Result<(), CoreError> {
    let at = Utc::now();
    references
        .transition(reference_id, Transition::Delete { at }, actor_id)
        .await
        .map_err(|e| store_error("reference", e))?
        .ok_or_else(|| lost_race(reference_id))?;

    tracing::info!(
        reference_id,
        actor_id,
        from = %AchievementStatus::Draft,
        to = %AchievementStatus::Deleted,
        "Achievement status changed",
    );

    match documents.soft_delete(document_id, at).await {
        Ok(true) => {}
        Ok(false) => tracing::error!(
            alarm = "consistency",
            reference_id,
            %document_id,
            "Tombstoned reference had no live document",
        ),
        Err(err) => tracing::error!(
            alarm = "consistency",
            error = %err,
            reference_id,
            %document_id,
            "Soft delete failed, tombstoned reference points at a live document",
        ),
    }
    Ok(())
}

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

pub(crate) fn ensure_draft(reference: &AchievementReference, action: &str) -> Result<(), CoreError> {
    if reference.status == AchievementStatus::Draft {
        return Ok(());
    }
    Err(CoreError::InvalidState(format!(
        "Achievement is {} and can no longer be {action}",
        reference.status
    )))
}

pub(crate) fn lost_race(reference_id: DbId) -> CoreError {
    CoreError::InvalidState(format!(
        "Achievement {reference_id} was changed by another request"
    ))
}

pub(crate) fn document_missing(reference: &AchievementReference) -> CoreError {
    tracing::error!(
        alarm = "consistency",
        reference_id = reference.reference_id,
        document_id = %reference.document_id,
        "Reference points at a missing document",
    );
    CoreError::DocumentMissing {
        reference_id: reference.reference_id,
        document_id: reference.document_id,
    }
}

pub(crate) fn store_error(store: &'static str, err: StoreError) -> CoreError {
    err.into_core(store)
}

fn join_error(err: tokio::task::JoinError) -> CoreError {
    tracing::error!(error = %err, "Store write task did not complete");
    CoreError::Internal("Store write task did not complete".into())
}

fn required_text(field: &str, value: String) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trim, drop empty and duplicate tags, keeping first-seen order.
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
