//! Season patch ingestion: atomicity, idempotency, activation handoff,
//! and commit-coherent cache invalidation.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use healerkit::catalog::cache::{CachedCatalog, ReadCache};
use healerkit::catalog::coordinator::{validate_patch, SeasonUpdateCoordinator};
use healerkit::catalog::error::CatalogError;
use healerkit::catalog::rows::{
    AbilityRow, DungeonPatch, DungeonRow, EncounterPatch, EncounterRow, SeasonPatch, SeasonRow,
};
use healerkit::catalog::store::{ContentSource, ContentStore};

fn ability_row(name: &str, profile: &str, order: u32) -> AbilityRow {
    AbilityRow {
        id: Uuid::new_v4(),
        boss_encounter_id: Uuid::nil(),
        name: name.to_string(),
        ability_type: "damage".to_string(),
        targets: "group".to_string(),
        damage_profile: profile.to_string(),
        healer_action: "Heal through it".to_string(),
        critical_insight: String::new(),
        cooldown_seconds: Some(30),
        display_order: order,
        is_key_mechanic: false,
    }
}

fn encounter_patch(name: &str, order: u32) -> EncounterPatch {
    EncounterPatch {
        encounter_info: EncounterRow {
            id: Uuid::new_v4(),
            dungeon_id: Uuid::nil(),
            name: name.to_string(),
            encounter_order: order,
            healer_summary: "Spread healing with burst windows".to_string(),
            key_mechanics: vec!["Adds".to_string()],
            ability_count: 0,
        },
        abilities: vec![
            ability_row(&format!("{name} Slam"), "Critical", 1),
            ability_row(&format!("{name} Wave"), "Moderate", 2),
        ],
    }
}

fn dungeon_patch(name: &str, short: &str, order: u32) -> DungeonPatch {
    DungeonPatch {
        dungeon_info: DungeonRow {
            id: Uuid::new_v4(),
            season_id: Uuid::nil(),
            name: name.to_string(),
            short_name: short.to_string(),
            difficulty_level: "mythic".to_string(),
            display_order: order,
            estimated_duration_minutes: 32,
            healer_notes: None,
            boss_count: 0,
        },
        boss_encounters: vec![encounter_patch("First Guardian", 1), encounter_patch("Last Warden", 2)],
    }
}

fn season_patch(name: &str, active: bool) -> SeasonPatch {
    let now = Utc::now();
    SeasonPatch {
        season_info: SeasonRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            major_version: 11,
            is_active: active,
            dungeon_count: 0,
            created_at: now,
            updated_at: now,
        },
        dungeons: vec![
            dungeon_patch("Ara-Kara, City of Echoes", "AK", 1),
            dungeon_patch("The Dawnbreaker", "DB", 2),
        ],
    }
}

fn services() -> (Arc<ContentStore>, Arc<ReadCache>, SeasonUpdateCoordinator) {
    let store = Arc::new(ContentStore::new());
    let cache = Arc::new(ReadCache::default());
    let coordinator = SeasonUpdateCoordinator::new(Arc::clone(&store), Arc::clone(&cache));
    (store, cache, coordinator)
}

#[tokio::test]
async fn ingest_populates_full_hierarchy() {
    let (store, _cache, coordinator) = services();
    let patch = season_patch("The War Within Season 3", true);

    let summary = coordinator.apply_season_patch(&patch).await.unwrap();
    assert_eq!(summary.dungeons, 2);
    assert_eq!(summary.boss_encounters, 4);
    assert_eq!(summary.abilities, 8);

    let counts = store.entity_counts().await;
    assert_eq!(counts.seasons, 1);
    assert_eq!(counts.dungeons, 2);
    assert_eq!(counts.boss_encounters, 4);
    assert_eq!(counts.abilities, 8);

    let season = store.get_season(patch.season_info.id).await.unwrap();
    assert!(season.is_active);
    assert_eq!(season.dungeon_count, 2, "counts are recomputed from the patch");

    let report = store.check_integrity().await;
    assert!(report.is_valid(), "fresh ingest must satisfy every invariant: {report:?}");
}

#[tokio::test]
async fn activating_a_new_season_deactivates_the_old_one() {
    let (store, _cache, coordinator) = services();
    let old = season_patch("Season One", true);
    let new = season_patch("Season Two", true);

    coordinator.apply_season_patch(&old).await.unwrap();
    let summary = coordinator.apply_season_patch(&new).await.unwrap();
    assert_eq!(summary.deactivated_season, Some(old.season_info.id));

    let old_season = store.get_season(old.season_info.id).await.unwrap();
    assert!(!old_season.is_active);
    let active = store.active_season().await.unwrap().expect("one active season");
    assert_eq!(active.id, new.season_info.id);

    let all = store.seasons().await;
    assert_eq!(all.records.iter().filter(|s| s.is_active).count(), 1);
}

#[tokio::test]
async fn replaying_an_identical_patch_is_idempotent() {
    let (store, _cache, coordinator) = services();
    let patch = season_patch("Replay Season", true);

    coordinator.apply_season_patch(&patch).await.unwrap();
    let first = store.export_season(patch.season_info.id).await.unwrap();
    let first_counts = store.entity_counts().await;

    coordinator.apply_season_patch(&patch).await.unwrap();
    let second = store.export_season(patch.season_info.id).await.unwrap();
    assert_eq!(first, second, "replay must not change store content");
    assert_eq!(first_counts, store.entity_counts().await, "replay must not duplicate rows");
}

#[tokio::test]
async fn failing_dungeon_rolls_back_the_whole_patch() {
    let (store, _cache, coordinator) = services();
    let existing = season_patch("Stable Season", true);
    coordinator.apply_season_patch(&existing).await.unwrap();
    let before = store.export_catalog().await;

    // Dungeon 2 of 2 has a gap in encounter order; dungeon 1 is fine.
    let mut bad = season_patch("Broken Season", false);
    bad.dungeons[1].boss_encounters[1].encounter_info.encounter_order = 5;

    let err = coordinator.apply_season_patch(&bad).await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }), "got {err:?}");

    assert!(matches!(
        store.get_season(bad.season_info.id).await,
        Err(CatalogError::NotFound { .. })
    ));
    let good_dungeon = bad.dungeons[0].dungeon_info.id;
    assert!(
        matches!(store.get_dungeon(good_dungeon).await, Err(CatalogError::NotFound { .. })),
        "dungeon 1, although valid on its own, must not survive the rollback"
    );
    assert_eq!(store.export_catalog().await, before, "prior content is untouched");
}

#[tokio::test]
async fn unknown_enum_label_is_rejected_before_commit() {
    let (store, _cache, coordinator) = services();
    let mut patch = season_patch("Enum Season", false);
    patch.dungeons[0].boss_encounters[0].abilities[0].damage_profile = "Catastrophic".to_string();

    let err = coordinator.apply_season_patch(&patch).await.unwrap_err();
    match err {
        CatalogError::Validation { message, .. } => {
            assert!(message.contains("Catastrophic"), "message names the bad label: {message}")
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(store.entity_counts().await.seasons, 0);
}

#[tokio::test]
async fn duplicate_season_name_is_rejected() {
    let (_store, _cache, coordinator) = services();
    coordinator
        .apply_season_patch(&season_patch("Same Name", true))
        .await
        .unwrap();
    let err = coordinator
        .apply_season_patch(&season_patch("Same Name", false))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }));
}

#[tokio::test]
async fn duplicate_dungeon_id_within_a_patch_is_rejected() {
    let (store, _cache, coordinator) = services();
    let mut patch = season_patch("Twin Ids", true);
    // Distinct names, shared id: name checks alone would let this through
    // and the second dungeon's encounters would pile onto the first.
    patch.dungeons[1].dungeon_info.id = patch.dungeons[0].dungeon_info.id;

    let err = coordinator.apply_season_patch(&patch).await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }), "got {err:?}");
    assert_eq!(store.entity_counts().await.seasons, 0, "nothing from the patch commits");
}

#[tokio::test]
async fn duplicate_encounter_id_across_dungeons_is_rejected() {
    let (store, _cache, coordinator) = services();
    let mut patch = season_patch("Colliding Encounters", true);
    patch.dungeons[1].boss_encounters[0].encounter_info.id =
        patch.dungeons[0].boss_encounters[0].encounter_info.id;

    let err = coordinator.apply_season_patch(&patch).await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }), "got {err:?}");
    assert_eq!(store.entity_counts().await.boss_encounters, 0);

    // A duplicated ability id is rejected the same way.
    let mut patch = season_patch("Colliding Abilities", true);
    patch.dungeons[1].boss_encounters[0].abilities[0].id =
        patch.dungeons[0].boss_encounters[0].abilities[0].id;
    let err = coordinator.apply_season_patch(&patch).await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }), "got {err:?}");
    assert_eq!(store.entity_counts().await.abilities, 0);
}

#[tokio::test]
async fn reusing_another_seasons_dungeon_id_is_rejected() {
    let (store, _cache, coordinator) = services();
    let owner = season_patch("Owner Season", true);
    coordinator.apply_season_patch(&owner).await.unwrap();
    let before = store.export_catalog().await;

    // A different season claiming one of the owner's dungeon ids would
    // silently re-parent the row and orphan the owner's subtree.
    let mut thief = season_patch("Thief Season", false);
    thief.dungeons[0].dungeon_info.id = owner.dungeons[1].dungeon_info.id;

    let err = coordinator.apply_season_patch(&thief).await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }), "got {err:?}");
    assert_eq!(store.export_catalog().await, before, "owner season keeps its subtree");
    assert!(store.check_integrity().await.is_valid());
}

#[test]
fn offline_validation_reports_duplicate_ids() {
    let mut patch = season_patch("Offline Dupes", true);
    patch.dungeons[1].dungeon_info.id = patch.dungeons[0].dungeon_info.id;
    patch.dungeons[1].boss_encounters[1].encounter_info.id =
        patch.dungeons[0].boss_encounters[0].encounter_info.id;

    let report = validate_patch(&patch);
    assert!(report.has_errors());
    let messages: Vec<&str> =
        report.diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.contains("duplicate dungeon id")), "{messages:?}");
    assert!(messages.iter().any(|m| m.contains("duplicate encounter id")), "{messages:?}");
}

#[tokio::test]
async fn reingesting_a_season_replaces_its_subtree_wholesale() {
    let (store, _cache, coordinator) = services();
    let mut patch = season_patch("Shrinking Season", true);
    coordinator.apply_season_patch(&patch).await.unwrap();
    assert_eq!(store.entity_counts().await.dungeons, 2);

    patch.dungeons.pop();
    coordinator.apply_season_patch(&patch).await.unwrap();
    let counts = store.entity_counts().await;
    assert_eq!(counts.dungeons, 1, "dropped dungeon must not linger");
    assert_eq!(counts.boss_encounters, 2);
    assert_eq!(counts.abilities, 4);
}

#[tokio::test]
async fn export_then_reimport_reproduces_identical_counts() {
    let (store, _cache, coordinator) = services();
    let patch = season_patch("Round Trip", true);
    coordinator.apply_season_patch(&patch).await.unwrap();
    let exported = store.export_season(patch.season_info.id).await.unwrap();

    // Serialize through the wire shape to prove the payload is round-trip
    // compatible, then ingest into a fresh catalog.
    let json = serde_json::to_string(&exported).unwrap();
    let reparsed: SeasonPatch = serde_json::from_str(&json).unwrap();

    let (store2, _cache2, coordinator2) = services();
    coordinator2.apply_season_patch(&reparsed).await.unwrap();
    assert_eq!(store.entity_counts().await, store2.entity_counts().await);
    assert_eq!(
        store2.export_season(patch.season_info.id).await.unwrap(),
        exported
    );
}

#[tokio::test]
async fn reads_after_commit_never_see_stale_cache_entries() {
    let (store, cache, coordinator) = services();
    let mut patch = season_patch("Cached Season", true);
    coordinator.apply_season_patch(&patch).await.unwrap();

    let catalog = CachedCatalog::new(Arc::clone(&store), Arc::clone(&cache));
    let before = catalog
        .dungeons_for_season(patch.season_info.id)
        .await
        .unwrap();
    assert_eq!(before.records.len(), 2);
    // Prime the active-season entry too.
    assert!(catalog.active_season().await.unwrap().is_some());

    patch.dungeons.pop();
    coordinator.apply_season_patch(&patch).await.unwrap();

    let after = catalog
        .dungeons_for_season(patch.season_info.id)
        .await
        .unwrap();
    assert_eq!(after.records.len(), 1, "commit must invalidate the cached listing");

    let active = catalog.active_season().await.unwrap().unwrap();
    assert_eq!(active.dungeon_count, 1, "active-season entry refreshed after commit");
}

#[tokio::test]
async fn activation_handoff_invalidates_the_active_season_entry() {
    let (store, cache, coordinator) = services();
    let first = season_patch("Handoff One", true);
    coordinator.apply_season_patch(&first).await.unwrap();

    let catalog = CachedCatalog::new(Arc::clone(&store), Arc::clone(&cache));
    assert_eq!(
        catalog.active_season().await.unwrap().unwrap().id,
        first.season_info.id
    );

    let second = season_patch("Handoff Two", true);
    coordinator.apply_season_patch(&second).await.unwrap();
    assert_eq!(
        catalog.active_season().await.unwrap().unwrap().id,
        second.season_info.id,
        "stale active-season entry would return the superseded season"
    );
}
