//! Type-specific achievement details.
//!
//! Clients send details as a free-form JSON object. [`normalize`] turns it
//! into [`AchievementDetails`]: common fields, one [`TypeDetails`] variant per
//! achievement type carrying only that type's declared fields, and a
//! `custom_fields` map holding everything else untouched.
//!
//! A declared key whose value has the wrong shape (e.g. `rank: "first"`) is
//! not interpreted; it is kept in `custom_fields` under its original key.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::achievement::AchievementType;

/// Date format accepted for every date-valued detail field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw key holding client-provided custom attributes, merged into `custom_fields`.
const CUSTOM_FIELDS_KEY: &str = "custom_fields";

/* --------------------------------------------------------------------------
Enumerated detail values
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionLevel {
    International,
    National,
    Regional,
    Local,
}

impl CompetitionLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "international" => Some(Self::International),
            "national" => Some(Self::National),
            "regional" => Some(Self::Regional),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedalType {
    Gold,
    Silver,
    Bronze,
}

impl MedalType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gold" => Some(Self::Gold),
            "silver" => Some(Self::Silver),
            "bronze" => Some(Self::Bronze),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationType {
    Journal,
    Conference,
    Book,
}

impl PublicationType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "journal" => Some(Self::Journal),
            "conference" => Some(Self::Conference),
            "book" => Some(Self::Book),
            _ => None,
        }
    }
}

/* --------------------------------------------------------------------------
Details
-------------------------------------------------------------------------- */

/// Declared fields of each achievement type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeDetails {
    Academic {
        score: Option<f64>,
        semester: Option<i32>,
    },
    Competition {
        competition_name: Option<String>,
        competition_level: Option<CompetitionLevel>,
        rank: Option<i32>,
        medal_type: Option<MedalType>,
    },
    Organization {
        organization_name: Option<String>,
        position: Option<String>,
        period_start: Option<NaiveDate>,
        period_end: Option<NaiveDate>,
    },
    Publication {
        publication_type: Option<PublicationType>,
        publication_title: Option<String>,
        #[serde(default)]
        authors: Vec<String>,
        publisher: Option<String>,
        issn: Option<String>,
        journal_name: Option<String>,
    },
    Certification {
        certification_name: Option<String>,
        issued_by: Option<String>,
        certification_number: Option<String>,
        valid_until: Option<NaiveDate>,
    },
    Other,
}

impl TypeDetails {
    pub fn achievement_type(&self) -> AchievementType {
        match self {
            Self::Academic { .. } => AchievementType::Academic,
            Self::Competition { .. } => AchievementType::Competition,
            Self::Organization { .. } => AchievementType::Organization,
            Self::Publication { .. } => AchievementType::Publication,
            Self::Certification { .. } => AchievementType::Certification,
            Self::Other => AchievementType::Other,
        }
    }
}

/// Normalized details of an achievement document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDetails {
    pub event_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub organizer: Option<String>,
    #[serde(flatten)]
    pub specific: TypeDetails,
    /// Attributes outside the declared set, preserved verbatim.
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

/// Parse raw client details for the given type. Never fails.
pub fn normalize(kind: AchievementType, raw: &Map<String, Value>) -> AchievementDetails {
    let mut fields = Fields::new(raw);

    let event_date = fields.date(&["event_date"]);
    let location = fields.string(&["location"]);
    let organizer = fields.string(&["organizer"]);

    let specific = match kind {
        AchievementType::Academic => TypeDetails::Academic {
            score: fields.float(&["score"]),
            semester: fields.int(&["semester"]),
        },
        AchievementType::Competition => TypeDetails::Competition {
            competition_name: fields.string(&["competition_name"]),
            competition_level: fields.parsed(&["competition_level", "level"], CompetitionLevel::parse),
            rank: fields.int(&["rank"]),
            medal_type: fields.parsed(&["medal_type", "medal"], MedalType::parse),
        },
        AchievementType::Organization => TypeDetails::Organization {
            organization_name: fields.string(&["organization_name"]),
            position: fields.string(&["position"]),
            period_start: fields.date(&["period_start"]),
            period_end: fields.date(&["period_end"]),
        },
        AchievementType::Publication => TypeDetails::Publication {
            publication_type: fields.parsed(&["publication_type"], PublicationType::parse),
            publication_title: fields.string(&["publication_title"]),
            authors: fields.strings(&["authors"]).unwrap_or_default(),
            publisher: fields.string(&["publisher"]),
            issn: fields.string(&["issn", "ISSN"]),
            journal_name: fields.string(&["journal_name", "journal"]),
        },
        AchievementType::Certification => TypeDetails::Certification {
            certification_name: fields.string(&["certification_name"]),
            issued_by: fields.string(&["issued_by"]),
            certification_number: fields.string(&["certification_number"]),
            valid_until: fields.date(&["valid_until"]),
        },
        AchievementType::Other => TypeDetails::Other,
    };

    AchievementDetails {
        event_date,
        location,
        organizer,
        specific,
        custom_fields: fields.into_custom_fields(),
    }
}

/// Tracks which raw keys have been interpreted.
struct Fields<'a> {
    raw: &'a Map<String, Value>,
    consumed: BTreeSet<String>,
}

impl<'a> Fields<'a> {
    fn new(raw: &'a Map<String, Value>) -> Self {
        Self {
            raw,
            consumed: BTreeSet::new(),
        }
    }

    /// Take the first key (in alias order) whose value `extract` accepts.
    fn take<T>(&mut self, keys: &[&str], extract: impl Fn(&Value) -> Option<T>) -> Option<T> {
        for key in keys {
            if self.consumed.contains(*key) {
                continue;
            }
            if let Some(parsed) = self.raw.get(*key).and_then(&extract) {
                self.consumed.insert((*key).to_string());
                return Some(parsed);
            }
        }
        None
    }

    fn string(&mut self, keys: &[&str]) -> Option<String> {
        self.take(keys, |v| v.as_str().map(str::to_string))
    }

    fn parsed<T>(&mut self, keys: &[&str], parse: fn(&str) -> Option<T>) -> Option<T> {
        self.take(keys, |v| v.as_str().and_then(parse))
    }

    fn date(&mut self, keys: &[&str]) -> Option<NaiveDate> {
        self.take(keys, |v| {
            v.as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
        })
    }

    fn int(&mut self, keys: &[&str]) -> Option<i32> {
        self.take(keys, |v| match v {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .and_then(|i| i32::try_from(i).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    fn float(&mut self, keys: &[&str]) -> Option<f64> {
        self.take(keys, |v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    fn strings(&mut self, keys: &[&str]) -> Option<Vec<String>> {
        self.take(keys, |v| {
            v.as_array()?
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect()
        })
    }

    /// Everything not interpreted. Entries of a nested `custom_fields` object
    /// are merged in; top-level keys win on collision.
    fn into_custom_fields(self) -> Map<String, Value> {
        let mut custom = Map::new();
        if let Some(Value::Object(nested)) = self.raw.get(CUSTOM_FIELDS_KEY) {
            custom.extend(nested.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        for (key, value) in self.raw {
            if self.consumed.contains(key) {
                continue;
            }
            if key == CUSTOM_FIELDS_KEY && value.is_object() {
                continue;
            }
            custom.insert(key.clone(), value.clone());
        }
        custom
    }
}
