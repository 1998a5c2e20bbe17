//! Relationship-scoped authorization for achievement operations.
//!
//! Roles alone are not enough: a student may only act on their own
//! achievements and an advisor only on their advisees'. [`AuthorizationGuard`]
//! resolves those relationships through the [`Directory`] on every call; the
//! decision itself is the pure function [`decide`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ports::{Directory, StoreError};
use crate::roles::Role;
use crate::types::DbId;

/// An authenticated caller, as provided by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: DbId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: DbId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.role.permissions().contains(&permission)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The relation an actor must hold to a target student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Owner,
    Advisor,
    Admin,
}

impl Relation {
    fn describe(self) -> &'static str {
        match self {
            Self::Owner => "the owning student",
            Self::Advisor => "the student's assigned advisor",
            Self::Admin => "an administrator",
        }
    }
}

/// Current relationship state between an actor and a target student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudentRelations {
    /// User linked to the target student record.
    pub owner_user_id: Option<DbId>,
    /// Advisor record assigned to the target student.
    pub advisor_id: Option<DbId>,
    /// Advisor record of the actor, if the actor is an advisor.
    pub actor_advisor_id: Option<DbId>,
}

/// Pure authorization decision. Admin satisfies every relation.
pub fn decide(actor: &Actor, relation: Relation, relations: &StudentRelations) -> bool {
    if actor.is_admin() {
        return true;
    }
    match relation {
        Relation::Owner => relations.owner_user_id == Some(actor.user_id),
        Relation::Advisor => {
            actor.role == Role::Advisor
                && relations.advisor_id.is_some()
                && relations.advisor_id == relations.actor_advisor_id
        }
        Relation::Admin => false,
    }
}

#[derive(Clone)]
pub struct AuthorizationGuard {
    directory: Arc<dyn Directory>,
}

impl AuthorizationGuard {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    /// Whether `actor` holds any of `allowed` towards `student_id`.
    pub async fn can_act(
        &self,
        actor: &Actor,
        allowed: &[Relation],
        student_id: DbId,
    ) -> Result<bool, CoreError> {
        if actor.is_admin() {
            return Ok(true);
        }
        let relations = self.relations(actor, allowed, student_id).await?;
        Ok(allowed.iter().any(|r| decide(actor, *r, &relations)))
    }

    /// Like [`can_act`](Self::can_act) but fails with [`CoreError::Forbidden`].
    pub async fn ensure(
        &self,
        actor: &Actor,
        allowed: &[Relation],
        student_id: DbId,
    ) -> Result<(), CoreError> {
        if self.can_act(actor, allowed, student_id).await? {
            return Ok(());
        }
        let who: Vec<_> = allowed.iter().map(|r| r.describe()).collect();
        Err(CoreError::Forbidden(format!(
            "Only {} may perform this action",
            who.join(" or ")
        )))
    }

    /// Load only the relationship state the requested relations need.
    async fn relations(
        &self,
        actor: &Actor,
        allowed: &[Relation],
        student_id: DbId,
    ) -> Result<StudentRelations, CoreError> {
        let mut relations = StudentRelations::default();
        if allowed.contains(&Relation::Owner) && actor.role == Role::Student {
            relations.owner_user_id = self
                .directory
                .resolve_owner(student_id)
                .await
                .map_err(directory_error)?;
        }
        if allowed.contains(&Relation::Advisor) && actor.role == Role::Advisor {
            relations.actor_advisor_id = self
                .directory
                .advisor_for_user(actor.user_id)
                .await
                .map_err(directory_error)?;
            if relations.actor_advisor_id.is_some() {
                relations.advisor_id = self
                    .directory
                    .resolve_advisor(student_id)
                    .await
                    .map_err(directory_error)?;
            }
        }
        Ok(relations)
    }
}

pub(crate) fn directory_error(err: StoreError) -> CoreError {
    tracing::error!(error = %err, "Directory lookup failed");
    CoreError::StoreUnavailable { store: "directory" }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDENT_USER: DbId = 10;
    const ADVISOR_RECORD: DbId = 3;

    fn relations() -> StudentRelations {
        StudentRelations {
            owner_user_id: Some(STUDENT_USER),
            advisor_id: Some(ADVISOR_RECORD),
            actor_advisor_id: None,
        }
    }

    #[test]
    fn owner_matches_linked_user() {
        let owner = Actor::new(STUDENT_USER, Role::Student);
        let other = Actor::new(11, Role::Student);
        assert!(decide(&owner, Relation::Owner, &relations()));
        assert!(!decide(&other, Relation::Owner, &relations()));
    }

    #[test]
    fn advisor_compares_record_ids_not_user_ids() {
        // The advisor's user id happens to equal the advisor record id of the
        // student; only the actor's own record id counts.
        let advisor = Actor::new(ADVISOR_RECORD, Role::Advisor);
        assert!(!decide(&advisor, Relation::Advisor, &relations()));

        let assigned = StudentRelations {
            actor_advisor_id: Some(ADVISOR_RECORD),
            ..relations()
        };
        assert!(decide(&advisor, Relation::Advisor, &assigned));
    }

    #[test]
    fn unassigned_student_has_no_advisor() {
        let advisor = Actor::new(50, Role::Advisor);
        let rel = StudentRelations {
            owner_user_id: Some(STUDENT_USER),
            advisor_id: None,
            actor_advisor_id: None,
        };
        assert!(!decide(&advisor, Relation::Advisor, &rel));
    }

    #[test]
    fn advisor_role_required_for_advisor_relation() {
        let student = Actor::new(99, Role::Student);
        let rel = StudentRelations {
            actor_advisor_id: Some(ADVISOR_RECORD),
            ..relations()
        };
        assert!(!decide(&student, Relation::Advisor, &rel));
    }

    #[test]
    fn admin_satisfies_every_relation() {
        let admin = Actor::new(1, Role::Admin);
        let empty = StudentRelations::default();
        for relation in [Relation::Owner, Relation::Advisor, Relation::Admin] {
            assert!(decide(&admin, relation, &empty));
        }
    }

    #[test]
    fn non_admin_never_satisfies_admin_relation() {
        for role in [Role::Student, Role::Advisor] {
            let actor = Actor::new(STUDENT_USER, role);
            assert!(!decide(&actor, Relation::Admin, &relations()));
        }
    }

    #[test]
    fn permissions_follow_role() {
        let advisor = Actor::new(5, Role::Advisor);
        assert!(advisor.has_permission(crate::roles::PERM_ACHIEVEMENT_VERIFY));
        assert!(!advisor.has_permission(crate::roles::PERM_ACHIEVEMENT_CREATE));
    }
}
