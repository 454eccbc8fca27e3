//! ContentStore: sole owner of persisted catalog rows.
//!
//! Single-writer/many-reader discipline: a writer mutex serializes
//! transactions, readers take a shared lock on the committed tables. A
//! transaction stages its changes on a private clone and swaps it in at
//! commit, so readers observe either the pre- or post-commit state, never a
//! partially applied patch. Dropping an uncommitted transaction rolls it
//! back.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::entity::{Ability, BossEncounter, Dungeon, Season};
use crate::catalog::error::{CatalogError, EntityKind};
use crate::catalog::report::{ValidationReport, ValidationSeverity};
use crate::catalog::rows::{
    AbilityRow, CatalogSnapshot, DungeonPatch, DungeonRow, EncounterPatch, EncounterRow,
    SeasonPatch, SeasonRow,
};

/// A listing read that survived per-record corruption: good records plus the
/// issues collected for the rows that failed conversion.
#[derive(Debug, Clone)]
pub struct RecordSet<T> {
    pub records: Vec<T>,
    pub corrupt: Vec<CorruptRecord>,
}

impl<T> Default for RecordSet<T> {
    fn default() -> Self {
        RecordSet { records: Vec::new(), corrupt: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptRecord {
    pub id: Uuid,
    pub detail: String,
}

/// Entity totals for the collaborator summary hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub seasons: usize,
    pub dungeons: usize,
    pub boss_encounters: usize,
    pub abilities: usize,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    seasons: HashMap<Uuid, SeasonRow>,
    dungeons: HashMap<Uuid, DungeonRow>,
    encounters: HashMap<Uuid, EncounterRow>,
    abilities: HashMap<Uuid, AbilityRow>,
}

/// The read contract consumed by the cache front, the analyzer, and tests.
/// This is the one behavioral seam of the data layer; entities themselves
/// are plain data and carry no trait abstraction.
#[allow(async_fn_in_trait)]
pub trait ContentSource {
    async fn active_season(&self) -> Result<Option<Season>, CatalogError>;
    async fn get_season(&self, id: Uuid) -> Result<Season, CatalogError>;
    async fn get_dungeon(&self, id: Uuid) -> Result<Dungeon, CatalogError>;
    async fn get_encounter(&self, id: Uuid) -> Result<BossEncounter, CatalogError>;
    async fn get_ability(&self, id: Uuid) -> Result<Ability, CatalogError>;
    async fn dungeons_for_season(&self, season_id: Uuid)
        -> Result<RecordSet<Dungeon>, CatalogError>;
    async fn encounters_for_dungeon(
        &self,
        dungeon_id: Uuid,
    ) -> Result<RecordSet<BossEncounter>, CatalogError>;
    /// NotFound only when the encounter itself is missing; an existing
    /// encounter with zero abilities returns an empty, issue-free set.
    async fn abilities_for_encounter(
        &self,
        encounter_id: Uuid,
    ) -> Result<RecordSet<Ability>, CatalogError>;
    async fn search_dungeons(
        &self,
        scope: Option<Uuid>,
        query: &str,
    ) -> Result<Vec<Dungeon>, CatalogError>;
}

pub struct ContentStore {
    tables: RwLock<Tables>,
    writer: Mutex<()>,
}

impl ContentStore {
    pub fn new() -> Self {
        ContentStore {
            tables: RwLock::new(Tables::default()),
            writer: Mutex::new(()),
        }
    }

    /// Build a store from a persisted snapshot. Rows are loaded as-is; run
    /// `check_integrity` to surface anything a hand-edited snapshot broke.
    pub fn from_snapshot(snapshot: &CatalogSnapshot) -> Self {
        let mut tables = Tables::default();
        for season in &snapshot.seasons {
            tables.seasons.insert(season.season_info.id, season.season_info.clone());
            for dungeon in &season.dungeons {
                let mut dungeon_row = dungeon.dungeon_info.clone();
                dungeon_row.season_id = season.season_info.id;
                let dungeon_id = dungeon_row.id;
                tables.dungeons.insert(dungeon_id, dungeon_row);
                for encounter in &dungeon.boss_encounters {
                    let mut encounter_row = encounter.encounter_info.clone();
                    encounter_row.dungeon_id = dungeon_id;
                    let encounter_id = encounter_row.id;
                    tables.encounters.insert(encounter_id, encounter_row);
                    for ability in &encounter.abilities {
                        let mut ability_row = ability.clone();
                        ability_row.boss_encounter_id = encounter_id;
                        tables.abilities.insert(ability_row.id, ability_row);
                    }
                }
            }
        }
        ContentStore {
            tables: RwLock::new(tables),
            writer: Mutex::new(()),
        }
    }

    pub fn from_snapshot_file(path: &Path) -> Self {
        match crate::catalog::rows::load_snapshot(path) {
            Some(snapshot) => Self::from_snapshot(&snapshot),
            None => Self::new(),
        }
    }

    /// Open a write transaction. Serialized: a second call waits until the
    /// first transaction commits or rolls back. Not cancellable once begun;
    /// callers must await `commit` or drop to roll back.
    pub async fn begin_update(&self) -> SeasonTransaction<'_> {
        let guard = self.writer.lock().await;
        let stage = self.tables.read().await.clone();
        SeasonTransaction {
            store: self,
            _writer: guard,
            stage,
        }
    }

    pub async fn entity_counts(&self) -> CatalogSummary {
        let tables = self.tables.read().await;
        CatalogSummary {
            seasons: tables.seasons.len(),
            dungeons: tables.dungeons.len(),
            boss_encounters: tables.encounters.len(),
            abilities: tables.abilities.len(),
        }
    }

    /// All seasons, newest major version first. Corrupt rows are collected,
    /// not fatal.
    pub async fn seasons(&self) -> RecordSet<Season> {
        let tables = self.tables.read().await;
        let mut set = convert_rows(tables.seasons.values(), |row| row.id, SeasonRow::to_entity);
        set.records
            .sort_by(|a, b| b.major_version.cmp(&a.major_version).then(a.name.cmp(&b.name)));
        set
    }

    /// Re-validate every catalog invariant without mutating anything.
    pub async fn check_integrity(&self) -> ValidationReport {
        let tables = self.tables.read().await;
        let mut report = ValidationReport::default();

        let mut active_seasons = Vec::new();
        let mut season_names: HashMap<String, Uuid> = HashMap::new();
        for row in tables.seasons.values() {
            let context = format!("season '{}'", row.id);
            if let Err(err) = row.to_entity() {
                report.push(ValidationSeverity::Error, context.clone(), err.to_string());
            }
            if row.is_active {
                active_seasons.push(row.id);
            }
            if let Some(existing) = season_names.insert(row.name.trim().to_string(), row.id) {
                report.push(
                    ValidationSeverity::Error,
                    context,
                    format!("duplicate season name '{}' (also used by '{existing}')", row.name),
                );
            }
        }
        if active_seasons.len() > 1 {
            report.push(
                ValidationSeverity::Error,
                "season",
                format!("{} seasons are active; at most one may be", active_seasons.len()),
            );
        }

        let mut dungeons_by_season: HashMap<Uuid, Vec<&DungeonRow>> = HashMap::new();
        for row in tables.dungeons.values() {
            let context = format!("dungeon '{}'", row.id);
            if let Err(err) = row.to_entity() {
                report.push(ValidationSeverity::Error, context.clone(), err.to_string());
            }
            if !tables.seasons.contains_key(&row.season_id) {
                report.push(
                    ValidationSeverity::Error,
                    context,
                    format!("references missing season '{}'", row.season_id),
                );
            }
            dungeons_by_season.entry(row.season_id).or_default().push(row);
        }
        for (season_id, dungeons) in &dungeons_by_season {
            let mut names = HashSet::new();
            for dungeon in dungeons {
                if !names.insert(dungeon.name.trim().to_lowercase()) {
                    report.push(
                        ValidationSeverity::Error,
                        format!("dungeon '{}'", dungeon.id),
                        format!("duplicate dungeon name '{}' in season '{season_id}'", dungeon.name),
                    );
                }
            }
        }
        for season in tables.seasons.values() {
            let actual = dungeons_by_season.get(&season.id).map_or(0, Vec::len);
            if season.dungeon_count as usize != actual {
                report.push(
                    ValidationSeverity::Warning,
                    format!("season '{}'", season.id),
                    format!(
                        "stored dungeonCount {} differs from actual {actual}",
                        season.dungeon_count
                    ),
                );
            }
        }

        let mut encounters_by_dungeon: HashMap<Uuid, Vec<&EncounterRow>> = HashMap::new();
        for row in tables.encounters.values() {
            let context = format!("boss_encounter '{}'", row.id);
            if let Err(err) = row.to_entity() {
                report.push(ValidationSeverity::Error, context.clone(), err.to_string());
            }
            if !tables.dungeons.contains_key(&row.dungeon_id) {
                report.push(
                    ValidationSeverity::Error,
                    context,
                    format!("references missing dungeon '{}'", row.dungeon_id),
                );
            }
            encounters_by_dungeon.entry(row.dungeon_id).or_default().push(row);
        }
        for (dungeon_id, encounters) in &encounters_by_dungeon {
            let mut names = HashSet::new();
            for encounter in encounters {
                if !names.insert(encounter.name.trim().to_lowercase()) {
                    report.push(
                        ValidationSeverity::Error,
                        format!("boss_encounter '{}'", encounter.id),
                        format!("duplicate encounter name '{}' in dungeon '{dungeon_id}'", encounter.name),
                    );
                }
            }
            let mut orders: Vec<u32> = encounters.iter().map(|e| e.encounter_order).collect();
            orders.sort_unstable();
            let dense = orders.iter().enumerate().all(|(i, &o)| o == i as u32 + 1);
            if !dense {
                report.push(
                    ValidationSeverity::Error,
                    format!("dungeon '{dungeon_id}'"),
                    format!("encounterOrder values {orders:?} are not a dense 1..{} sequence", orders.len()),
                );
            }
        }
        for dungeon in tables.dungeons.values() {
            let actual = encounters_by_dungeon.get(&dungeon.id).map_or(0, Vec::len);
            if dungeon.boss_count as usize != actual {
                report.push(
                    ValidationSeverity::Warning,
                    format!("dungeon '{}'", dungeon.id),
                    format!(
                        "stored bossCount {} differs from actual {actual}",
                        dungeon.boss_count
                    ),
                );
            }
        }

        let mut abilities_by_encounter: HashMap<Uuid, Vec<&AbilityRow>> = HashMap::new();
        for row in tables.abilities.values() {
            let context = format!("ability '{}'", row.id);
            if let Err(err) = row.to_entity() {
                report.push(ValidationSeverity::Error, context.clone(), err.to_string());
            }
            if !tables.encounters.contains_key(&row.boss_encounter_id) {
                report.push(
                    ValidationSeverity::Error,
                    context,
                    format!("references missing boss_encounter '{}'", row.boss_encounter_id),
                );
            }
            abilities_by_encounter
                .entry(row.boss_encounter_id)
                .or_default()
                .push(row);
        }
        for (encounter_id, abilities) in &abilities_by_encounter {
            let mut names = HashSet::new();
            for ability in abilities {
                if !names.insert(ability.name.trim().to_lowercase()) {
                    report.push(
                        ValidationSeverity::Error,
                        format!("ability '{}'", ability.id),
                        format!("duplicate ability name '{}' in encounter '{encounter_id}'", ability.name),
                    );
                }
            }
        }
        for encounter in tables.encounters.values() {
            let actual = abilities_by_encounter.get(&encounter.id).map_or(0, Vec::len);
            if encounter.ability_count as usize != actual {
                report.push(
                    ValidationSeverity::Warning,
                    format!("boss_encounter '{}'", encounter.id),
                    format!(
                        "stored abilityCount {} differs from actual {actual}",
                        encounter.ability_count
                    ),
                );
            }
        }

        report
    }

    /// Export one season's full subtree in ingestion payload shape.
    pub async fn export_season(&self, season_id: Uuid) -> Result<SeasonPatch, CatalogError> {
        let tables = self.tables.read().await;
        let season = tables
            .seasons
            .get(&season_id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Season, season_id))?;
        Ok(export_season_from(&tables, season))
    }

    /// Export the whole catalog, round-trip compatible with `from_snapshot`.
    pub async fn export_catalog(&self) -> CatalogSnapshot {
        let tables = self.tables.read().await;
        let mut seasons: Vec<&SeasonRow> = tables.seasons.values().collect();
        seasons.sort_by(|a, b| {
            b.major_version
                .cmp(&a.major_version)
                .then_with(|| a.name.cmp(&b.name))
        });
        CatalogSnapshot {
            data_version: None,
            seasons: seasons
                .into_iter()
                .map(|season| export_season_from(&tables, season))
                .collect(),
        }
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSource for ContentStore {
    async fn active_season(&self) -> Result<Option<Season>, CatalogError> {
        let tables = self.tables.read().await;
        match tables.seasons.values().find(|row| row.is_active) {
            Some(row) => row.to_entity().map(Some),
            None => Ok(None),
        }
    }

    async fn get_season(&self, id: Uuid) -> Result<Season, CatalogError> {
        let tables = self.tables.read().await;
        tables
            .seasons
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Season, id))?
            .to_entity()
    }

    async fn get_dungeon(&self, id: Uuid) -> Result<Dungeon, CatalogError> {
        let tables = self.tables.read().await;
        tables
            .dungeons
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Dungeon, id))?
            .to_entity()
    }

    async fn get_encounter(&self, id: Uuid) -> Result<BossEncounter, CatalogError> {
        let tables = self.tables.read().await;
        tables
            .encounters
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::BossEncounter, id))?
            .to_entity()
    }

    async fn get_ability(&self, id: Uuid) -> Result<Ability, CatalogError> {
        let tables = self.tables.read().await;
        tables
            .abilities
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Ability, id))?
            .to_entity()
    }

    async fn dungeons_for_season(
        &self,
        season_id: Uuid,
    ) -> Result<RecordSet<Dungeon>, CatalogError> {
        let tables = self.tables.read().await;
        if !tables.seasons.contains_key(&season_id) {
            return Err(CatalogError::not_found(EntityKind::Season, season_id));
        }
        let mut set = convert_rows(
            tables.dungeons.values().filter(|row| row.season_id == season_id),
            |row| row.id,
            DungeonRow::to_entity,
        );
        set.records.sort_by(|a, b| {
            a.display_order.cmp(&b.display_order).then_with(|| a.name.cmp(&b.name))
        });
        Ok(set)
    }

    async fn encounters_for_dungeon(
        &self,
        dungeon_id: Uuid,
    ) -> Result<RecordSet<BossEncounter>, CatalogError> {
        let tables = self.tables.read().await;
        if !tables.dungeons.contains_key(&dungeon_id) {
            return Err(CatalogError::not_found(EntityKind::Dungeon, dungeon_id));
        }
        let mut set = convert_rows(
            tables.encounters.values().filter(|row| row.dungeon_id == dungeon_id),
            |row| row.id,
            EncounterRow::to_entity,
        );
        set.records.sort_by_key(|encounter| encounter.encounter_order);
        Ok(set)
    }

    async fn abilities_for_encounter(
        &self,
        encounter_id: Uuid,
    ) -> Result<RecordSet<Ability>, CatalogError> {
        let tables = self.tables.read().await;
        if !tables.encounters.contains_key(&encounter_id) {
            return Err(CatalogError::not_found(EntityKind::BossEncounter, encounter_id));
        }
        let mut set = convert_rows(
            tables
                .abilities
                .values()
                .filter(|row| row.boss_encounter_id == encounter_id),
            |row| row.id,
            AbilityRow::to_entity,
        );
        set.records.sort_by(|a, b| {
            a.display_order.cmp(&b.display_order).then_with(|| a.name.cmp(&b.name))
        });
        Ok(set)
    }

    async fn search_dungeons(
        &self,
        scope: Option<Uuid>,
        query: &str,
    ) -> Result<Vec<Dungeon>, CatalogError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            // Blank queries short-circuit before the storage lock.
            return Ok(Vec::new());
        }
        let tables = self.tables.read().await;
        let mut matches: Vec<Dungeon> = tables
            .dungeons
            .values()
            .filter(|row| scope.map_or(true, |season_id| row.season_id == season_id))
            .filter(|row| {
                row.name.to_lowercase().contains(&needle)
                    || row.short_name.to_lowercase().contains(&needle)
            })
            .filter_map(|row| row.to_entity().ok())
            .collect();
        matches.sort_by(|a, b| {
            a.display_order.cmp(&b.display_order).then_with(|| a.name.cmp(&b.name))
        });
        Ok(matches)
    }
}

/// An open write transaction. All mutation happens on the private stage;
/// nothing is observable until `commit` swaps the tables. Holding the writer
/// guard serializes transactions for the life of this value.
pub struct SeasonTransaction<'a> {
    store: &'a ContentStore,
    _writer: MutexGuard<'a, ()>,
    stage: Tables,
}

impl SeasonTransaction<'_> {
    /// Id of the season currently flagged active in the staged state.
    pub fn staged_active_season(&self) -> Option<Uuid> {
        self.stage.seasons.values().find(|row| row.is_active).map(|row| row.id)
    }

    /// Season currently owning this dungeon id in the staged state, if any.
    pub fn dungeon_season(&self, dungeon_id: Uuid) -> Option<Uuid> {
        self.stage.dungeons.get(&dungeon_id).map(|row| row.season_id)
    }

    /// Dungeon currently owning this encounter id in the staged state.
    pub fn encounter_dungeon(&self, encounter_id: Uuid) -> Option<Uuid> {
        self.stage.encounters.get(&encounter_id).map(|row| row.dungeon_id)
    }

    /// Encounter currently owning this ability id in the staged state.
    pub fn ability_encounter(&self, ability_id: Uuid) -> Option<Uuid> {
        self.stage.abilities.get(&ability_id).map(|row| row.boss_encounter_id)
    }

    /// Another season (different id) already using this name, if any.
    pub fn season_id_by_name(&self, name: &str) -> Option<Uuid> {
        let needle = name.trim().to_lowercase();
        self.stage
            .seasons
            .values()
            .find(|row| row.name.trim().to_lowercase() == needle)
            .map(|row| row.id)
    }

    pub fn deactivate_season(&mut self, season_id: Uuid, updated_at: chrono::DateTime<chrono::Utc>) {
        if let Some(row) = self.stage.seasons.get_mut(&season_id) {
            row.is_active = false;
            row.updated_at = updated_at;
        }
    }

    /// Drop every dungeon, encounter, and ability belonging to a season.
    /// Season patches replace the subtree wholesale; the season row itself
    /// is never deleted, only superseded.
    pub fn clear_season_subtree(&mut self, season_id: Uuid) {
        let dungeon_ids: HashSet<Uuid> = self
            .stage
            .dungeons
            .values()
            .filter(|row| row.season_id == season_id)
            .map(|row| row.id)
            .collect();
        let encounter_ids: HashSet<Uuid> = self
            .stage
            .encounters
            .values()
            .filter(|row| dungeon_ids.contains(&row.dungeon_id))
            .map(|row| row.id)
            .collect();
        self.stage
            .abilities
            .retain(|_, row| !encounter_ids.contains(&row.boss_encounter_id));
        self.stage.encounters.retain(|id, _| !encounter_ids.contains(id));
        self.stage.dungeons.retain(|id, _| !dungeon_ids.contains(id));
    }

    pub fn upsert_season(&mut self, row: SeasonRow) {
        self.stage.seasons.insert(row.id, row);
    }

    pub fn upsert_dungeon(&mut self, row: DungeonRow) {
        self.stage.dungeons.insert(row.id, row);
    }

    pub fn upsert_encounter(&mut self, row: EncounterRow) {
        self.stage.encounters.insert(row.id, row);
    }

    pub fn upsert_ability(&mut self, row: AbilityRow) {
        self.stage.abilities.insert(row.id, row);
    }

    /// Atomically publish the staged state. Readers switch from the old
    /// tables to the new ones in one step.
    pub async fn commit(self) {
        let mut tables = self.store.tables.write().await;
        *tables = self.stage;
        info!(
            seasons = tables.seasons.len(),
            dungeons = tables.dungeons.len(),
            encounters = tables.encounters.len(),
            abilities = tables.abilities.len(),
            "content store transaction committed"
        );
    }

    /// Discard the staged state. Dropping the transaction has the same
    /// effect; this form exists to make the intent explicit at call sites.
    pub fn rollback(self) {
        debug!("content store transaction rolled back");
    }
}

fn convert_rows<'a, R: 'a, T>(
    rows: impl Iterator<Item = &'a R>,
    id_of: impl Fn(&R) -> Uuid,
    convert: impl Fn(&R) -> Result<T, CatalogError>,
) -> RecordSet<T> {
    let mut set = RecordSet { records: Vec::new(), corrupt: Vec::new() };
    for row in rows {
        match convert(row) {
            Ok(entity) => set.records.push(entity),
            Err(err) => set.corrupt.push(CorruptRecord {
                id: id_of(row),
                detail: err.to_string(),
            }),
        }
    }
    set
}

fn export_season_from(tables: &Tables, season: &SeasonRow) -> SeasonPatch {
    let mut dungeons: Vec<&DungeonRow> = tables
        .dungeons
        .values()
        .filter(|row| row.season_id == season.id)
        .collect();
    dungeons.sort_by(|a, b| {
        a.display_order.cmp(&b.display_order).then_with(|| a.name.cmp(&b.name))
    });

    SeasonPatch {
        season_info: season.clone(),
        dungeons: dungeons
            .into_iter()
            .map(|dungeon| {
                let mut encounters: Vec<&EncounterRow> = tables
                    .encounters
                    .values()
                    .filter(|row| row.dungeon_id == dungeon.id)
                    .collect();
                encounters.sort_by_key(|row| row.encounter_order);
                DungeonPatch {
                    dungeon_info: dungeon.clone(),
                    boss_encounters: encounters
                        .into_iter()
                        .map(|encounter| {
                            let mut abilities: Vec<&AbilityRow> = tables
                                .abilities
                                .values()
                                .filter(|row| row.boss_encounter_id == encounter.id)
                                .collect();
                            abilities.sort_by(|a, b| {
                                a.display_order
                                    .cmp(&b.display_order)
                                    .then_with(|| a.name.cmp(&b.name))
                            });
                            EncounterPatch {
                                encounter_info: encounter.clone(),
                                abilities: abilities.into_iter().cloned().collect(),
                            }
                        })
                        .collect(),
                }
            })
            .collect(),
    }
}
