//! Typed catalog entities (season -> dungeon -> boss encounter -> ability)
//! and their closed enum domains. These are the immutable value objects the
//! display layer consumes; the store hands out owned clones, never
//! references into its tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an ability fundamentally does, from the healer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbilityType {
    Damage,
    Heal,
    Mechanic,
    Movement,
    Interrupt,
}

impl AbilityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Damage => "damage",
            Self::Heal => "heal",
            Self::Mechanic => "mechanic",
            Self::Movement => "movement",
            Self::Interrupt => "interrupt",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "damage" => Some(Self::Damage),
            "heal" => Some(Self::Heal),
            "mechanic" => Some(Self::Mechanic),
            "movement" => Some(Self::Movement),
            "interrupt" => Some(Self::Interrupt),
            _ => None,
        }
    }
}

/// Who an ability hits. `RandomPlayer` and `Location` keep the wire labels
/// the content pipeline emits (`randomPlayer`, `location`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetType {
    Tank,
    RandomPlayer,
    Group,
    Healers,
    Location,
}

impl TargetType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tank => "tank",
            Self::RandomPlayer => "randomPlayer",
            Self::Group => "group",
            Self::Healers => "healers",
            Self::Location => "location",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "tank" => Some(Self::Tank),
            "randomPlayer" => Some(Self::RandomPlayer),
            "group" => Some(Self::Group),
            "healers" => Some(Self::Healers),
            "location" => Some(Self::Location),
            _ => None,
        }
    }
}

/// Ordinal severity of an ability for healers. Totally ordered:
/// Critical > High > Moderate > Mechanic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageProfile {
    Mechanic,
    Moderate,
    High,
    Critical,
}

impl DamageProfile {
    /// Ordinal used by the healer priority formula (Critical=4 .. Mechanic=1).
    pub const fn priority(self) -> u32 {
        match self {
            Self::Critical => 4,
            Self::High => 3,
            Self::Moderate => 2,
            Self::Mechanic => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Moderate => "Moderate",
            Self::Mechanic => "Mechanic",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Critical" => Some(Self::Critical),
            "High" => Some(Self::High),
            "Moderate" => Some(Self::Moderate),
            "Mechanic" => Some(Self::Mechanic),
            _ => None,
        }
    }
}

/// A versioned content bundle valid for one game patch. At most one season
/// is active at any time; superseded seasons are deactivated, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: Uuid,
    pub name: String,
    pub major_version: u32,
    pub is_active: bool,
    pub dungeon_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dungeon {
    pub id: Uuid,
    pub season_id: Uuid,
    pub name: String,
    pub short_name: String,
    pub difficulty_level: String,
    pub display_order: u32,
    pub estimated_duration_minutes: u32,
    pub healer_notes: Option<String>,
    pub boss_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossEncounter {
    pub id: Uuid,
    pub dungeon_id: Uuid,
    pub name: String,
    /// Position within the dungeon. Values for one dungeon form a dense
    /// 1..=N sequence with no gaps or duplicates.
    pub encounter_order: u32,
    pub healer_summary: String,
    pub key_mechanics: Vec<String>,
    pub ability_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: Uuid,
    pub boss_encounter_id: Uuid,
    pub name: String,
    pub ability_type: AbilityType,
    pub targets: TargetType,
    pub damage_profile: DamageProfile,
    pub healer_action: String,
    pub critical_insight: String,
    pub cooldown_seconds: Option<u32>,
    pub display_order: u32,
    pub is_key_mechanic: bool,
}
