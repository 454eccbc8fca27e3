//! SeasonUpdateCoordinator: applies a full season patch to the store as one
//! atomic operation and invalidates the read cache after commit.
//!
//! The whole nested upsert (season + dungeons + encounters + abilities) sits
//! inside a single transaction; any validation failure rolls the entire call
//! back, so no entity from a failed patch is ever observable. Replaying an
//! identical patch is idempotent.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::cache::{ReadCache, ACTIVE_SEASON_KEY};
use crate::catalog::error::CatalogError;
use crate::catalog::report::{ValidationReport, ValidationSeverity};
use crate::catalog::rows::{DungeonPatch, SeasonPatch};
use crate::catalog::store::ContentStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonUpdateSummary {
    pub season_id: Uuid,
    pub season_name: String,
    /// Season that lost its active flag in this call, if any.
    pub deactivated_season: Option<Uuid>,
    pub dungeons: usize,
    pub boss_encounters: usize,
    pub abilities: usize,
}

pub struct SeasonUpdateCoordinator {
    store: Arc<ContentStore>,
    cache: Arc<ReadCache>,
}

impl SeasonUpdateCoordinator {
    pub fn new(store: Arc<ContentStore>, cache: Arc<ReadCache>) -> Self {
        SeasonUpdateCoordinator { store, cache }
    }

    /// Ingest one full season patch, all-or-nothing.
    pub async fn apply_season_patch(
        &self,
        patch: &SeasonPatch,
    ) -> Result<SeasonUpdateSummary, CatalogError> {
        let season_id = patch.season_info.id;
        let mut txn = self.store.begin_update().await;

        if patch.season_info.name.trim().is_empty() {
            txn.rollback();
            return Err(CatalogError::validation(
                format!("season '{season_id}'.name"),
                "season name must be non-empty",
            ));
        }
        if let Some(existing) = txn.season_id_by_name(&patch.season_info.name) {
            if existing != season_id {
                txn.rollback();
                return Err(CatalogError::validation(
                    format!("season '{season_id}'.name"),
                    format!(
                        "season name '{}' already used by season '{existing}'",
                        patch.season_info.name
                    ),
                ));
            }
        }

        let mut deactivated_season = None;
        if patch.season_info.is_active {
            if let Some(active_id) = txn.staged_active_season() {
                if active_id != season_id {
                    txn.deactivate_season(active_id, Utc::now());
                    deactivated_season = Some(active_id);
                }
            }
        }

        // A season patch replaces the season's subtree wholesale; children
        // from an earlier patch of this season that are absent from the new
        // one must not linger.
        txn.clear_season_subtree(season_id);

        let mut season_row = patch.season_info.clone();
        season_row.dungeon_count = patch.dungeons.len() as u32;
        txn.upsert_season(season_row);

        let mut dungeon_names = HashSet::new();
        let mut dungeon_ids = HashSet::new();
        let mut encounter_ids = HashSet::new();
        let mut ability_ids = HashSet::new();
        let mut encounter_total = 0usize;
        let mut ability_total = 0usize;
        for dungeon_patch in &patch.dungeons {
            let dungeon_id = dungeon_patch.dungeon_info.id;
            if !dungeon_names.insert(dungeon_patch.dungeon_info.name.trim().to_lowercase()) {
                txn.rollback();
                return Err(CatalogError::validation(
                    format!("dungeon '{dungeon_id}'.name"),
                    format!(
                        "dungeon name '{}' duplicated within the season patch",
                        dungeon_patch.dungeon_info.name
                    ),
                ));
            }
            if !dungeon_ids.insert(dungeon_id) {
                txn.rollback();
                return Err(CatalogError::validation(
                    format!("dungeon '{dungeon_id}'.id"),
                    "dungeon id duplicated within the season patch",
                ));
            }
            // This season's subtree was just cleared, so any surviving row
            // with this id belongs to another season.
            if let Some(owner) = txn.dungeon_season(dungeon_id) {
                txn.rollback();
                return Err(CatalogError::validation(
                    format!("dungeon '{dungeon_id}'.id"),
                    format!("dungeon id already belongs to season '{owner}'"),
                ));
            }

            let report = validate_dungeon_patch(dungeon_patch);
            if let Some(first) = report
                .diagnostics
                .iter()
                .find(|diag| diag.severity == ValidationSeverity::Error)
            {
                txn.rollback();
                return Err(CatalogError::validation(first.context.clone(), first.message.clone()));
            }

            let mut dungeon_row = dungeon_patch.dungeon_info.clone();
            dungeon_row.season_id = season_id;
            dungeon_row.boss_count = dungeon_patch.boss_encounters.len() as u32;
            txn.upsert_dungeon(dungeon_row);

            for encounter_patch in &dungeon_patch.boss_encounters {
                let encounter_id = encounter_patch.encounter_info.id;
                if !encounter_ids.insert(encounter_id) {
                    txn.rollback();
                    return Err(CatalogError::validation(
                        format!("boss_encounter '{encounter_id}'.id"),
                        "encounter id duplicated within the season patch",
                    ));
                }
                if let Some(owner) = txn.encounter_dungeon(encounter_id) {
                    txn.rollback();
                    return Err(CatalogError::validation(
                        format!("boss_encounter '{encounter_id}'.id"),
                        format!("encounter id already belongs to dungeon '{owner}'"),
                    ));
                }

                let mut encounter_row = encounter_patch.encounter_info.clone();
                encounter_row.dungeon_id = dungeon_id;
                encounter_row.ability_count = encounter_patch.abilities.len() as u32;
                txn.upsert_encounter(encounter_row);
                encounter_total += 1;

                for ability in &encounter_patch.abilities {
                    if !ability_ids.insert(ability.id) {
                        txn.rollback();
                        return Err(CatalogError::validation(
                            format!("ability '{}'.id", ability.id),
                            "ability id duplicated within the season patch",
                        ));
                    }
                    if let Some(owner) = txn.ability_encounter(ability.id) {
                        txn.rollback();
                        return Err(CatalogError::validation(
                            format!("ability '{}'.id", ability.id),
                            format!("ability id already belongs to encounter '{owner}'"),
                        ));
                    }
                    let mut ability_row = ability.clone();
                    ability_row.boss_encounter_id = encounter_id;
                    txn.upsert_ability(ability_row);
                    ability_total += 1;
                }
            }
        }

        txn.commit().await;

        // Invalidation comes strictly after the commit: a cache entry can be
        // stale only inside this window, never after.
        self.cache.invalidate_season(season_id);
        if let Some(old_active) = deactivated_season {
            self.cache.invalidate_season(old_active);
        }
        if patch.season_info.is_active || deactivated_season.is_some() {
            self.cache.invalidate(ACTIVE_SEASON_KEY);
        }

        info!(
            season = %season_id,
            name = %patch.season_info.name,
            dungeons = patch.dungeons.len(),
            encounters = encounter_total,
            abilities = ability_total,
            deactivated = ?deactivated_season,
            "season patch applied"
        );

        Ok(SeasonUpdateSummary {
            season_id,
            season_name: patch.season_info.name.clone(),
            deactivated_season,
            dungeons: patch.dungeons.len(),
            boss_encounters: encounter_total,
            abilities: ability_total,
        })
    }
}

/// Validate a season patch offline, collecting every finding instead of
/// stopping at the first. Used by the CLI `validate` verb; the coordinator
/// runs the same per-dungeon checks inside its transaction.
pub fn validate_patch(patch: &SeasonPatch) -> ValidationReport {
    let mut report = ValidationReport::default();
    let season_context = format!("season '{}'", patch.season_info.id);

    if patch.season_info.name.trim().is_empty() {
        report.push(ValidationSeverity::Error, &season_context, "missing non-empty 'name'");
    }
    if patch.season_info.dungeon_count != 0
        && patch.season_info.dungeon_count as usize != patch.dungeons.len()
    {
        report.push(
            ValidationSeverity::Warning,
            &season_context,
            format!(
                "declared dungeonCount {} differs from {} dungeons in patch (will be recomputed)",
                patch.season_info.dungeon_count,
                patch.dungeons.len()
            ),
        );
    }

    let mut names = HashSet::new();
    let mut dungeon_ids = HashSet::new();
    let mut encounter_ids = HashSet::new();
    let mut ability_ids = HashSet::new();
    for dungeon in &patch.dungeons {
        if !names.insert(dungeon.dungeon_info.name.trim().to_lowercase()) {
            report.push(
                ValidationSeverity::Error,
                format!("dungeon '{}'", dungeon.dungeon_info.id),
                format!("duplicate dungeon name '{}'", dungeon.dungeon_info.name),
            );
        }
        if !dungeon_ids.insert(dungeon.dungeon_info.id) {
            report.push(
                ValidationSeverity::Error,
                format!("dungeon '{}'", dungeon.dungeon_info.id),
                "duplicate dungeon id in patch",
            );
        }
        for encounter in &dungeon.boss_encounters {
            if !encounter_ids.insert(encounter.encounter_info.id) {
                report.push(
                    ValidationSeverity::Error,
                    format!("boss_encounter '{}'", encounter.encounter_info.id),
                    "duplicate encounter id in patch",
                );
            }
            for ability in &encounter.abilities {
                if !ability_ids.insert(ability.id) {
                    report.push(
                        ValidationSeverity::Error,
                        format!("ability '{}'", ability.id),
                        "duplicate ability id in patch",
                    );
                }
            }
        }
        report.merge(validate_dungeon_patch(dungeon));
    }
    report
}

fn validate_dungeon_patch(patch: &DungeonPatch) -> ValidationReport {
    let mut report = ValidationReport::default();
    let dungeon = &patch.dungeon_info;
    let context = format!("dungeon '{}'", dungeon.id);

    if dungeon.name.trim().is_empty() {
        report.push(ValidationSeverity::Error, &context, "missing non-empty 'name'");
    }
    if dungeon.short_name.trim().is_empty() {
        report.push(ValidationSeverity::Error, &context, "missing non-empty 'shortName'");
    }
    if dungeon.boss_count != 0 && dungeon.boss_count as usize != patch.boss_encounters.len() {
        report.push(
            ValidationSeverity::Warning,
            &context,
            format!(
                "declared bossCount {} differs from {} encounters in patch (will be recomputed)",
                dungeon.boss_count,
                patch.boss_encounters.len()
            ),
        );
    }

    let mut encounter_names = HashSet::new();
    let mut orders: Vec<u32> = Vec::with_capacity(patch.boss_encounters.len());
    for encounter_patch in &patch.boss_encounters {
        let encounter = &encounter_patch.encounter_info;
        let encounter_context = format!("boss_encounter '{}'", encounter.id);
        if encounter.name.trim().is_empty() {
            report.push(ValidationSeverity::Error, &encounter_context, "missing non-empty 'name'");
        }
        if !encounter_names.insert(encounter.name.trim().to_lowercase()) {
            report.push(
                ValidationSeverity::Error,
                &encounter_context,
                format!("duplicate encounter name '{}' in dungeon '{}'", encounter.name, dungeon.name),
            );
        }
        orders.push(encounter.encounter_order);

        let mut ability_names = HashSet::new();
        for ability in &encounter_patch.abilities {
            let ability_context = format!("ability '{}'", ability.id);
            if ability.name.trim().is_empty() {
                report.push(ValidationSeverity::Error, &ability_context, "missing non-empty 'name'");
            }
            if !ability_names.insert(ability.name.trim().to_lowercase()) {
                report.push(
                    ValidationSeverity::Error,
                    &ability_context,
                    format!(
                        "duplicate ability name '{}' in encounter '{}'",
                        ability.name, encounter.name
                    ),
                );
            }
            if let Err(message) = ability.validate_labels() {
                report.push(ValidationSeverity::Error, &ability_context, message);
            }
        }
    }

    orders.sort_unstable();
    let dense = orders.iter().enumerate().all(|(i, &order)| order == i as u32 + 1);
    if !dense {
        warn!(dungeon = %dungeon.id, ?orders, "rejecting non-dense encounter order");
        report.push(
            ValidationSeverity::Error,
            &context,
            format!(
                "encounterOrder values {orders:?} must form a dense 1..{} sequence",
                orders.len()
            ),
        );
    }

    report
}
