//! Achievement domain model.
//!
//! An achievement lives in two stores: the [`AchievementDocument`] (content,
//! owned by the document store) and the [`AchievementReference`] (lifecycle
//! status, owned by the reference store). The two are linked 1:1 through
//! `document_id`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::details::AchievementDetails;
use crate::error::CoreError;
use crate::types::{DbId, DocumentId, Timestamp};

/* --------------------------------------------------------------------------
Achievement type
-------------------------------------------------------------------------- */

/// The closed set of achievement types. Immutable once a document exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementType {
    Academic,
    Competition,
    Organization,
    Publication,
    Certification,
    Other,
}

impl AchievementType {
    pub const ALL: [AchievementType; 6] = [
        Self::Academic,
        Self::Competition,
        Self::Organization,
        Self::Publication,
        Self::Certification,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Academic => "academic",
            Self::Competition => "competition",
            Self::Organization => "organization",
            Self::Publication => "publication",
            Self::Certification => "certification",
            Self::Other => "other",
        }
    }

    /// Parse a client-supplied type name, failing with [`CoreError::InvalidType`].
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| {
                let valid: Vec<_> = Self::ALL.iter().map(|t| t.as_str()).collect();
                CoreError::InvalidType(format!(
                    "'{name}' is not an achievement type. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for AchievementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
Status state machine
-------------------------------------------------------------------------- */

/// Lifecycle status of an achievement reference.
///
/// ```text
/// draft -> submitted -> verified
///                    -> rejected
/// draft -> deleted
/// ```
///
/// `verified`, `rejected` and `deleted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementStatus {
    Draft,
    Submitted,
    Verified,
    Rejected,
    Deleted,
}

impl AchievementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Deleted => "deleted",
        }
    }

    /// Parse the `status` column / query parameter value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Submitted)
                | (Self::Draft, Self::Deleted)
                | (Self::Submitted, Self::Verified)
                | (Self::Submitted, Self::Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Rejected | Self::Deleted)
    }
}

impl std::fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status change applied to a reference by the reference store.
///
/// Each variant carries exactly the columns its target status populates, so
/// `verified_by`/`verified_at`/`rejection_note` can only be written together.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Submit { at: Timestamp },
    Verify { at: Timestamp, by: DbId },
    Reject { at: Timestamp, by: DbId, note: String },
    Delete { at: Timestamp },
}

impl Transition {
    /// The status the reference must currently hold.
    pub fn source(&self) -> AchievementStatus {
        match self {
            Self::Submit { .. } | Self::Delete { .. } => AchievementStatus::Draft,
            Self::Verify { .. } | Self::Reject { .. } => AchievementStatus::Submitted,
        }
    }

    pub fn target(&self) -> AchievementStatus {
        match self {
            Self::Submit { .. } => AchievementStatus::Submitted,
            Self::Verify { .. } => AchievementStatus::Verified,
            Self::Reject { .. } => AchievementStatus::Rejected,
            Self::Delete { .. } => AchievementStatus::Deleted,
        }
    }

    pub fn at(&self) -> Timestamp {
        match self {
            Self::Submit { at }
            | Self::Verify { at, .. }
            | Self::Reject { at, .. }
            | Self::Delete { at } => *at,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Reject { note, .. } => Some(note.as_str()),
            _ => None,
        }
    }

    /// Apply the change to an in-memory copy of the reference.
    ///
    /// Callers must have checked `reference.status == self.source()`.
    pub fn apply(&self, reference: &mut AchievementReference) {
        debug_assert_eq!(reference.status, self.source());
        match self {
            Self::Submit { at } => {
                reference.submitted_at = Some(*at);
            }
            Self::Verify { at, by } => {
                reference.verified_at = Some(*at);
                reference.verified_by = Some(*by);
            }
            Self::Reject { at, by, note } => {
                reference.verified_at = Some(*at);
                reference.verified_by = Some(*by);
                reference.rejection_note = Some(note.clone());
            }
            Self::Delete { .. } => {}
        }
        reference.status = self.target();
        reference.updated_at = self.at();
    }
}

/* --------------------------------------------------------------------------
Documents
-------------------------------------------------------------------------- */

/// File descriptor produced by the external file storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    pub filename: String,
    pub url: String,
    pub content_type: String,
}

/// An attachment on a document. Attachments are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    pub content_type: String,
    pub uploaded_at: Timestamp,
}

impl Attachment {
    pub fn from_descriptor(descriptor: AttachmentDescriptor, uploaded_at: Timestamp) -> Self {
        Self {
            filename: descriptor.filename,
            url: descriptor.url,
            content_type: descriptor.content_type,
            uploaded_at,
        }
    }
}

/// The content-bearing record of an achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDocument {
    pub document_id: DocumentId,
    pub owner_student_id: DbId,
    pub achievement_type: AchievementType,
    pub title: String,
    pub description: String,
    pub details: AchievementDetails,
    pub attachments: Vec<Attachment>,
    pub tags: Vec<String>,
    pub achieved_date: Option<NaiveDate>,
    pub points: i32,
    pub is_deleted: bool,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A document ready to be inserted; the store assigns `document_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub owner_student_id: DbId,
    pub achievement_type: AchievementType,
    pub title: String,
    pub description: String,
    pub details: AchievementDetails,
    pub attachments: Vec<Attachment>,
    pub tags: Vec<String>,
    pub achieved_date: Option<NaiveDate>,
    pub points: i32,
}

/// Content changes to a draft document. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<AchievementDetails>,
    pub tags: Option<Vec<String>>,
    pub achieved_date: Option<NaiveDate>,
    pub points: Option<i32>,
}

/* --------------------------------------------------------------------------
References
-------------------------------------------------------------------------- */

/// The lightweight, status-bearing record of an achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementReference {
    pub reference_id: DbId,
    pub student_id: DbId,
    pub document_id: DocumentId,
    pub status: AchievementStatus,
    pub submitted_at: Option<Timestamp>,
    pub verified_at: Option<Timestamp>,
    pub verified_by: Option<DbId>,
    pub rejection_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A reference ready to be inserted with status `draft`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReference {
    pub student_id: DbId,
    pub document_id: DocumentId,
    /// User recorded as the author of the initial history entry.
    pub created_by: DbId,
}

/// One entry of a reference's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: DbId,
    pub reference_id: DbId,
    pub old_status: Option<AchievementStatus>,
    pub new_status: AchievementStatus,
    pub changed_by: DbId,
    pub note: Option<String>,
    pub created_at: Timestamp,
}

/* --------------------------------------------------------------------------
Read models
-------------------------------------------------------------------------- */

/// A document together with its reference metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementRecord {
    pub reference: AchievementReference,
    pub document: AchievementDocument,
}

/// A reference enriched with a summary of its document, used by listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementSummary {
    #[serde(flatten)]
    pub reference: AchievementReference,
    pub title: String,
    pub achievement_type: AchievementType,
    pub points: i32,
    pub tags: Vec<String>,
}

impl AchievementSummary {
    pub fn new(reference: AchievementReference, document: &AchievementDocument) -> Self {
        Self {
            reference,
            title: document.title.clone(),
            achievement_type: document.achievement_type,
            points: document.points,
            tags: document.tags.clone(),
        }
    }
}
