//! Achievement point scoring.
//!
//! Points are a pure function of the achievement type and its normalized
//! details. Bonuses stack additively on top of the per-type base.

use serde_json::{Map, Value};

use crate::achievement::AchievementType;
use crate::details::{normalize, AchievementDetails, CompetitionLevel, PublicationType, TypeDetails};

/// Result of scoring raw input.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub points: i32,
    pub details: AchievementDetails,
}

/// Normalize raw details and compute their points.
///
/// Deterministic and side-effect free; called on create and on every
/// pre-submission edit of the details.
pub fn score(kind: AchievementType, raw: &Map<String, Value>) -> Score {
    let details = normalize(kind, raw);
    Score {
        points: points_for(&details),
        details,
    }
}

/// Points for already-normalized details.
pub fn points_for(details: &AchievementDetails) -> i32 {
    let kind = details.specific.achievement_type();
    let bonus = match &details.specific {
        TypeDetails::Competition {
            competition_level,
            rank,
            ..
        } => competition_level.map_or(0, level_bonus) + rank.map_or(0, rank_bonus),
        TypeDetails::Publication {
            publication_type, ..
        } => publication_type.map_or(0, publication_bonus),
        _ => 0,
    };
    base_points(kind) + bonus
}

pub fn base_points(kind: AchievementType) -> i32 {
    match kind {
        AchievementType::Competition => 100,
        AchievementType::Publication => 150,
        AchievementType::Certification => 75,
        AchievementType::Organization => 50,
        AchievementType::Academic => 25,
        AchievementType::Other => 10,
    }
}

pub fn level_bonus(level: CompetitionLevel) -> i32 {
    match level {
        CompetitionLevel::International => 200,
        CompetitionLevel::National => 100,
        CompetitionLevel::Regional => 50,
        CompetitionLevel::Local => 25,
    }
}

pub fn rank_bonus(rank: i32) -> i32 {
    match rank {
        1 => 100,
        2 => 75,
        3 => 50,
        _ => 0,
    }
}

pub fn publication_bonus(publication: PublicationType) -> i32 {
    match publication {
        PublicationType::Journal => 100,
        PublicationType::Conference => 75,
        PublicationType::Book => 150,
    }
}
