//! Well-known role and permission names.
//!
//! These must match the seed data in `20260301000001_create_identity_tables.sql`.

use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_ADVISOR: &str = "advisor";
pub const ROLE_STUDENT: &str = "student";

pub const PERM_ACHIEVEMENT_CREATE: &str = "achievement:create";
pub const PERM_ACHIEVEMENT_READ: &str = "achievement:read";
pub const PERM_ACHIEVEMENT_UPDATE: &str = "achievement:update";
pub const PERM_ACHIEVEMENT_DELETE: &str = "achievement:delete";
pub const PERM_ACHIEVEMENT_VERIFY: &str = "achievement:verify";
/// Elevated permission held only by administrators.
pub const PERM_ACHIEVEMENT_MANAGE: &str = "achievement:manage";

const STUDENT_PERMISSIONS: &[&str] = &[
    PERM_ACHIEVEMENT_CREATE,
    PERM_ACHIEVEMENT_READ,
    PERM_ACHIEVEMENT_UPDATE,
    PERM_ACHIEVEMENT_DELETE,
];

const ADVISOR_PERMISSIONS: &[&str] = &[PERM_ACHIEVEMENT_READ, PERM_ACHIEVEMENT_VERIFY];

const ADMIN_PERMISSIONS: &[&str] = &[
    PERM_ACHIEVEMENT_CREATE,
    PERM_ACHIEVEMENT_READ,
    PERM_ACHIEVEMENT_UPDATE,
    PERM_ACHIEVEMENT_DELETE,
    PERM_ACHIEVEMENT_VERIFY,
    PERM_ACHIEVEMENT_MANAGE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Advisor,
    Student,
}

impl Role {
    /// Parse from the `roles.name` column / JWT `role` claim.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            ROLE_ADMIN => Some(Self::Admin),
            ROLE_ADVISOR => Some(Self::Advisor),
            ROLE_STUDENT => Some(Self::Student),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Advisor => ROLE_ADVISOR,
            Self::Student => ROLE_STUDENT,
        }
    }

    /// Permissions granted to every holder of this role.
    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            Self::Admin => ADMIN_PERMISSIONS,
            Self::Advisor => ADVISOR_PERMISSIONS,
            Self::Student => STUDENT_PERMISSIONS,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        for role in [Role::Admin, Role::Advisor, Role::Student] {
            assert_eq!(Role::from_name(role.name()), Some(role));
        }
        assert_eq!(Role::from_name("lecturer"), None);
    }

    #[test]
    fn only_admin_holds_manage() {
        assert!(Role::Admin.permissions().contains(&PERM_ACHIEVEMENT_MANAGE));
        assert!(!Role::Advisor.permissions().contains(&PERM_ACHIEVEMENT_MANAGE));
        assert!(!Role::Student.permissions().contains(&PERM_ACHIEVEMENT_MANAGE));
    }

    #[test]
    fn advisor_can_verify_but_not_create() {
        let perms = Role::Advisor.permissions();
        assert!(perms.contains(&PERM_ACHIEVEMENT_VERIFY));
        assert!(!perms.contains(&PERM_ACHIEVEMENT_CREATE));
    }
}
