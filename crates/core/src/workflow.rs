//! Verification workflow: the status state machine and its side effects.
//!
//! Each transition reads the reference, authorizes the actor against the
//! owning student, checks the current status and then asks the reference
//! store to compare-and-set. A concurrent caller that loses the race gets
//! [`CoreError::InvalidState`]. Notifications are built on a spawned task
//! after the transition is stored; they never delay or fail it.

use std::sync::Arc;

use chrono::Utc;

use crate::achievement::{AchievementReference, AchievementStatus, AchievementSummary, Transition};
use crate::authorization::{directory_error, Actor, Relation};
use crate::coordinator::{lost_race, store_error, AchievementCoordinator, EDITORS};
use crate::error::CoreError;
use crate::notification::Notification;
use crate::pagination::Page;
use crate::ports::{Notifier, Paginated, ReferenceFilter};
use crate::roles::Role;
use crate::types::DbId;

/// Relations allowed to verify or reject.
const REVIEWERS: &[Relation] = &[Relation::Advisor];

/// Title used in notifications when the document cannot be read.
const FALLBACK_TITLE: &str = "your achievement";

#[derive(Clone)]
pub struct VerificationWorkflow {
    coordinator: AchievementCoordinator,
    notifier: Arc<dyn Notifier>,
}

impl VerificationWorkflow {
    pub fn new(coordinator: AchievementCoordinator, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            coordinator,
            notifier,
        }
    }

    /// `draft -> submitted`. Owner only; notifies the assigned advisor.
    pub async fn submit(
        &self,
        actor: &Actor,
        reference_id: DbId,
    ) -> Result<AchievementReference, CoreError> {
        let reference = self.coordinator.live_reference(reference_id).await?;
        self.coordinator
            .guard()
            .ensure(actor, EDITORS, reference.student_id)
            .await?;

        let updated = self
            .apply(actor, &reference, Transition::Submit { at: Utc::now() })
            .await?;
        self.dispatch(updated.clone(), Outcome::Submitted);
        Ok(updated)
    }

    /// `submitted -> verified`. Assigned advisor or admin.
    pub async fn verify(
        &self,
        actor: &Actor,
        reference_id: DbId,
    ) -> Result<AchievementReference, CoreError> {
        let reference = self.reviewable(actor, reference_id).await?;
        let updated = self
            .apply(
                actor,
                &reference,
                Transition::Verify {
                    at: Utc::now(),
                    by: actor.user_id,
                },
            )
            .await?;
        self.dispatch(updated.clone(), Outcome::Verified { by: actor.user_id });
        Ok(updated)
    }

    /// `submitted -> rejected`. Assigned advisor or admin; `note` is required.
    pub async fn reject(
        &self,
        actor: &Actor,
        reference_id: DbId,
        note: &str,
    ) -> Result<AchievementReference, CoreError> {
        let reference = self.reviewable(actor, reference_id).await?;

        let note = note.trim();
        if note.is_empty() {
            return Err(CoreError::InvalidArgument(
                "A rejection note is required".into(),
            ));
        }

        let updated = self
            .apply(
                actor,
                &reference,
                Transition::Reject {
                    at: Utc::now(),
                    by: actor.user_id,
                    note: note.to_string(),
                },
            )
            .await?;
        self.dispatch(
            updated.clone(),
            Outcome::Rejected {
                by: actor.user_id,
                note: note.to_string(),
            },
        );
        Ok(updated)
    }

    /// Submitted achievements of the calling advisor's own advisees.
    ///
    /// The roster is resolved from the directory; callers cannot name
    /// students themselves.
    pub async fn advisee_queue(
        &self,
        actor: &Actor,
        page: Page,
    ) -> Result<Paginated<AchievementSummary>, CoreError> {
        if actor.role != Role::Advisor {
            return Err(CoreError::Forbidden(
                "Only advisors have an advisee queue".into(),
            ));
        }
        let directory = self.coordinator.guard().directory();
        let advisor_id = directory
            .advisor_for_user(actor.user_id)
            .await
            .map_err(directory_error)?
            .ok_or_else(|| CoreError::Forbidden("No advisor profile for this user".into()))?;
        let advisees = directory
            .advisees(advisor_id)
            .await
            .map_err(directory_error)?;

        let filter = ReferenceFilter {
            student_ids: Some(advisees),
            status: Some(AchievementStatus::Submitted),
        };
        self.coordinator.list_filtered(&filter, page).await
    }

    /* ---- internals ---- */

    /// Load a reference and check the actor may review it.
    async fn reviewable(
        &self,
        actor: &Actor,
        reference_id: DbId,
    ) -> Result<AchievementReference, CoreError> {
        let reference = self.coordinator.live_reference(reference_id).await?;
        self.coordinator
            .guard()
            .ensure(actor, REVIEWERS, reference.student_id)
            .await?;
        Ok(reference)
    }

    /// Check the edge, then compare-and-set against the stored status.
    async fn apply(
        &self,
        actor: &Actor,
        reference: &AchievementReference,
        transition: Transition,
    ) -> Result<AchievementReference, CoreError> {
        let (from, to) = (transition.source(), transition.target());
        if reference.status != from {
            return Err(CoreError::InvalidState(format!(
                "Cannot move achievement from {} to {to}",
                reference.status
            )));
        }

        let updated = self
            .coordinator
            .references()
            .transition(reference.reference_id, transition, actor.user_id)
            .await
            .map_err(|e| store_error("reference", e))?
            .ok_or_else(|| lost_race(reference.reference_id))?;

        tracing::info!(
            reference_id = reference.reference_id,
            actor_id = actor.user_id,
            from = %from,
            to = %to,
            "Achievement status changed",
        );
        Ok(updated)
    }

    /// Build and enqueue the notification for a stored transition on its
    /// own task. Recipient and title lookups never delay the caller.
    fn dispatch(&self, reference: AchievementReference, outcome: Outcome) {
        let workflow = self.clone();
        tokio::spawn(async move { workflow.notify(reference, outcome).await });
    }

    async fn notify(&self, reference: AchievementReference, outcome: Outcome) {
        let recipient = match outcome {
            Outcome::Submitted => self.advisor_user(&reference).await,
            Outcome::Verified { .. } | Outcome::Rejected { .. } => {
                self.student_user(&reference).await
            }
        };
        let Some(user_id) = recipient else {
            return;
        };

        let title = self.title_of(&reference).await;
        let notification = match outcome {
            Outcome::Submitted => Notification::submitted(
                user_id,
                reference.reference_id,
                reference.student_id,
                &title,
            ),
            Outcome::Verified { by } => {
                Notification::verified(user_id, reference.reference_id, by, &title)
            }
            Outcome::Rejected { by, note } => {
                Notification::rejected(user_id, reference.reference_id, by, &title, &note)
            }
        };
        self.notifier.enqueue(notification);
    }

    async fn advisor_user(&self, reference: &AchievementReference) -> Option<DbId> {
        let directory = self.coordinator.guard().directory();
        let advisor_user = match directory.resolve_advisor(reference.student_id).await {
            Ok(Some(advisor_id)) => directory.advisor_user(advisor_id).await,
            Ok(None) => {
                tracing::debug!(
                    student_id = reference.student_id,
                    "No advisor assigned, skipping notification",
                );
                return None;
            }
            Err(err) => Err(err),
        };

        match advisor_user {
            Ok(Some(user_id)) => Some(user_id),
            Ok(None) => {
                tracing::warn!(
                    student_id = reference.student_id,
                    "Assigned advisor has no user account",
                );
                None
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    reference_id = reference.reference_id,
                    "Could not resolve advisor for notification",
                );
                None
            }
        }
    }

    async fn student_user(&self, reference: &AchievementReference) -> Option<DbId> {
        let directory = self.coordinator.guard().directory();
        match directory.resolve_owner(reference.student_id).await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    reference_id = reference.reference_id,
                    "Could not resolve student for notification",
                );
                None
            }
        }
    }

    async fn title_of(&self, reference: &AchievementReference) -> String {
        match self.coordinator.documents().find(reference.document_id).await {
            Ok(Some(document)) => document.title,
            Ok(None) | Err(_) => FALLBACK_TITLE.to_string(),
        }
    }
}

/// Which notification a stored transition produces.
enum Outcome {
    Submitted,
    Verified { by: DbId },
    Rejected { by: DbId, note: String },
}
