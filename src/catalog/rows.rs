//! Schema-typed wire and storage rows. These are the exact shapes the
//! content-patch pipeline emits (camelCase fields, enums as raw string
//! labels) and the shapes the store persists. Conversion to typed entities
//! happens at read time and validates required fields and enum domains per
//! record; a bad row yields a `DataCorruption` for that record only.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::entity::{
    Ability, AbilityType, BossEncounter, DamageProfile, Dungeon, Season, TargetType,
};
use crate::catalog::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRow {
    pub id: Uuid,
    pub name: String,
    pub major_version: u32,
    pub is_active: bool,
    #[serde(default)]
    pub dungeon_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonRow {
    pub id: Uuid,
    #[serde(default)]
    pub season_id: Uuid,
    pub name: String,
    pub short_name: String,
    pub difficulty_level: String,
    pub display_order: u32,
    #[serde(rename = "estimatedDuration")]
    pub estimated_duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healer_notes: Option<String>,
    #[serde(default)]
    pub boss_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterRow {
    pub id: Uuid,
    #[serde(default)]
    pub dungeon_id: Uuid,
    pub name: String,
    pub encounter_order: u32,
    pub healer_summary: String,
    #[serde(default)]
    pub key_mechanics: Vec<String>,
    #[serde(default)]
    pub ability_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityRow {
    pub id: Uuid,
    #[serde(default)]
    pub boss_encounter_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub ability_type: String,
    pub targets: String,
    pub damage_profile: String,
    pub healer_action: String,
    #[serde(default)]
    pub critical_insight: String,
    #[serde(default, rename = "cooldown", skip_serializing_if = "Option::is_none")]
    pub cooldown_seconds: Option<u32>,
    pub display_order: u32,
    #[serde(default)]
    pub is_key_mechanic: bool,
}

/// One full season patch: the unit the ingestion process hands to the
/// coordinator, and the unit `export_season` reproduces (round-trip
/// compatible).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonPatch {
    pub season_info: SeasonRow,
    #[serde(default)]
    pub dungeons: Vec<DungeonPatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonPatch {
    pub dungeon_info: DungeonRow,
    #[serde(default)]
    pub boss_encounters: Vec<EncounterPatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterPatch {
    pub encounter_info: EncounterRow,
    #[serde(default)]
    pub abilities: Vec<AbilityRow>,
}

/// On-disk catalog snapshot: every season's full subtree in ingestion
/// payload shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_version: Option<String>,
    #[serde(default)]
    pub seasons: Vec<SeasonPatch>,
}

/// Load a catalog snapshot from a JSON file. Returns None if the file is
/// missing or unreadable (callers start from an empty catalog).
pub fn load_snapshot(path: &Path) -> Option<CatalogSnapshot> {
    let data = fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn save_snapshot(path: &Path, snapshot: &CatalogSnapshot) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialized = serde_json::to_string_pretty(snapshot)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    fs::write(path, serialized)
}

fn required(kind: &str, id: Uuid, field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::corruption(format!(
            "{kind} '{id}': missing non-empty '{field}'"
        )));
    }
    Ok(())
}

impl SeasonRow {
    pub fn to_entity(&self) -> Result<Season, CatalogError> {
        required("season", self.id, "name", &self.name)?;
        Ok(Season {
            id: self.id,
            name: self.name.clone(),
            major_version: self.major_version,
            is_active: self.is_active,
            dungeon_count: self.dungeon_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl DungeonRow {
    pub fn to_entity(&self) -> Result<Dungeon, CatalogError> {
        required("dungeon", self.id, "name", &self.name)?;
        required("dungeon", self.id, "shortName", &self.short_name)?;
        Ok(Dungeon {
            id: self.id,
            season_id: self.season_id,
            name: self.name.clone(),
            short_name: self.short_name.clone(),
            difficulty_level: self.difficulty_level.clone(),
            display_order: self.display_order,
            estimated_duration_minutes: self.estimated_duration_minutes,
            healer_notes: self.healer_notes.clone(),
            boss_count: self.boss_count,
        })
    }
}

impl EncounterRow {
    pub fn to_entity(&self) -> Result<BossEncounter, CatalogError> {
        required("boss_encounter", self.id, "name", &self.name)?;
        if self.encounter_order == 0 {
            return Err(CatalogError::corruption(format!(
                "boss_encounter '{}': encounterOrder must be >= 1",
                self.id
            )));
        }
        Ok(BossEncounter {
            id: self.id,
            dungeon_id: self.dungeon_id,
            name: self.name.clone(),
            encounter_order: self.encounter_order,
            healer_summary: self.healer_summary.clone(),
            key_mechanics: self.key_mechanics.clone(),
            ability_count: self.ability_count,
        })
    }
}

impl AbilityRow {
    pub fn to_entity(&self) -> Result<Ability, CatalogError> {
        required("ability", self.id, "name", &self.name)?;
        let ability_type = AbilityType::parse(&self.ability_type).ok_or_else(|| {
            CatalogError::corruption(format!(
                "ability '{}': unknown type '{}'",
                self.id, self.ability_type
            ))
        })?;
        let targets = TargetType::parse(&self.targets).ok_or_else(|| {
            CatalogError::corruption(format!(
                "ability '{}': unknown targets '{}'",
                self.id, self.targets
            ))
        })?;
        let damage_profile = DamageProfile::parse(&self.damage_profile).ok_or_else(|| {
            CatalogError::corruption(format!(
                "ability '{}': unknown damageProfile '{}'",
                self.id, self.damage_profile
            ))
        })?;
        Ok(Ability {
            id: self.id,
            boss_encounter_id: self.boss_encounter_id,
            name: self.name.clone(),
            ability_type,
            targets,
            damage_profile,
            healer_action: self.healer_action.clone(),
            critical_insight: self.critical_insight.clone(),
            cooldown_seconds: self.cooldown_seconds,
            display_order: self.display_order,
            is_key_mechanic: self.is_key_mechanic,
        })
    }

    /// Check the enum labels alone, without building an entity. Ingestion
    /// validation reports these as patch errors (the row is not yet stored,
    /// so they are not corruption).
    pub fn validate_labels(&self) -> Result<(), String> {
        if AbilityType::parse(&self.ability_type).is_none() {
            return Err(format!("unknown type '{}'", self.ability_type));
        }
        if TargetType::parse(&self.targets).is_none() {
            return Err(format!("unknown targets '{}'", self.targets));
        }
        if DamageProfile::parse(&self.damage_profile).is_none() {
            return Err(format!("unknown damageProfile '{}'", self.damage_profile));
        }
        Ok(())
    }

    /// Build a row from a typed entity. Exports go through this so the wire
    /// shape always carries valid labels.
    pub fn from_entity(ability: &Ability) -> Self {
        AbilityRow {
            id: ability.id,
            boss_encounter_id: ability.boss_encounter_id,
            name: ability.name.clone(),
            ability_type: ability.ability_type.as_str().to_string(),
            targets: ability.targets.as_str().to_string(),
            damage_profile: ability.damage_profile.as_str().to_string(),
            healer_action: ability.healer_action.clone(),
            critical_insight: ability.critical_insight.clone(),
            cooldown_seconds: ability.cooldown_seconds,
            display_order: ability.display_order,
            is_key_mechanic: ability.is_key_mechanic,
        }
    }
}
