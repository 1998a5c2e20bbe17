//! Notifications emitted by achievement transitions.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    AchievementSubmitted,
    AchievementVerified,
    AchievementRejected,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AchievementSubmitted => "achievement_submitted",
            Self::AchievementVerified => "achievement_verified",
            Self::AchievementRejected => "achievement_rejected",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "achievement_submitted" => Some(Self::AchievementSubmitted),
            "achievement_verified" => Some(Self::AchievementVerified),
            "achievement_rejected" => Some(Self::AchievementRejected),
            _ => None,
        }
    }
}

/// A message addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: DbId,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn submitted(advisor_user_id: DbId, reference_id: DbId, student_id: DbId, title: &str) -> Self {
        Self {
            user_id: advisor_user_id,
            kind: NotificationType::AchievementSubmitted,
            title: "New Achievement Submitted".to_string(),
            message: format!("A student submitted a new achievement: {title}"),
            payload: serde_json::json!({
                "reference_id": reference_id,
                "student_id": student_id,
            }),
        }
    }

    pub fn verified(student_user_id: DbId, reference_id: DbId, verified_by: DbId, title: &str) -> Self {
        Self {
            user_id: student_user_id,
            kind: NotificationType::AchievementVerified,
            title: "Achievement Verified".to_string(),
            message: format!("Your achievement '{title}' has been verified"),
            payload: serde_json::json!({
                "reference_id": reference_id,
                "verified_by": verified_by,
            }),
        }
    }

    pub fn rejected(
        student_user_id: DbId,
        reference_id: DbId,
        verified_by: DbId,
        title: &str,
        note: &str,
    ) -> Self {
        Self {
            user_id: student_user_id,
            kind: NotificationType::AchievementRejected,
            title: "Achievement Rejected".to_string(),
            message: format!("Your achievement '{title}' has been rejected. Reason: {note}"),
            payload: serde_json::json!({
                "reference_id": reference_id,
                "verified_by": verified_by,
                "rejection_note": note,
            }),
        }
    }
}

/// A stored notification in a user's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxEntry {
    pub id: DbId,
    pub user_id: DbId,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_carries_reason() {
        let n = Notification::rejected(5, 1, 9, "Hackathon", "missing certificate");
        assert_eq!(n.user_id, 5);
        assert_eq!(n.kind, NotificationType::AchievementRejected);
        assert!(n.message.contains("missing certificate"));
        assert_eq!(n.payload["rejection_note"], "missing certificate");
    }

    #[test]
    fn type_names_round_trip() {
        for kind in [
            NotificationType::AchievementSubmitted,
            NotificationType::AchievementVerified,
            NotificationType::AchievementRejected,
        ] {
            assert_eq!(NotificationType::from_name(kind.as_str()), Some(kind));
        }
    }
}
