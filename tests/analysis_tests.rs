//! End-to-end analysis paths: classifier scenarios from the content team's
//! acceptance list, and the analyzer running against a live store.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use healerkit::analysis::classifier::{classify_ability, Impact, Urgency};
use healerkit::analysis::damage::{
    prioritize_for_healer, AnalyzerConfig, DamageProfileAnalyzer, DisplayHint, HealingLoad,
};
use healerkit::catalog::entity::{Ability, AbilityType, DamageProfile, TargetType};
use healerkit::catalog::error::CatalogError;
use healerkit::catalog::rows::{
    AbilityRow, CatalogSnapshot, DungeonPatch, DungeonRow, EncounterPatch, EncounterRow,
    SeasonPatch, SeasonRow,
};
use healerkit::catalog::store::ContentStore;

fn ability(
    name: &str,
    profile: DamageProfile,
    targets: TargetType,
    key: bool,
    action: &str,
    cooldown: Option<u32>,
) -> Ability {
    Ability {
        id: Uuid::new_v4(),
        boss_encounter_id: Uuid::new_v4(),
        name: name.to_string(),
        ability_type: AbilityType::Damage,
        targets,
        damage_profile: profile,
        healer_action: action.to_string(),
        critical_insight: String::new(),
        cooldown_seconds: cooldown,
        display_order: 1,
        is_key_mechanic: key,
    }
}

fn store_with_encounter(abilities: Vec<AbilityRow>) -> (Arc<ContentStore>, Uuid) {
    let now = Utc::now();
    let season = SeasonRow {
        id: Uuid::new_v4(),
        name: "Analysis Season".to_string(),
        major_version: 11,
        is_active: true,
        dungeon_count: 1,
        created_at: now,
        updated_at: now,
    };
    let dungeon = DungeonRow {
        id: Uuid::new_v4(),
        season_id: season.id,
        name: "Eco-Dome Al'dani".to_string(),
        short_name: "ED".to_string(),
        difficulty_level: "mythic".to_string(),
        display_order: 1,
        estimated_duration_minutes: 30,
        healer_notes: None,
        boss_count: 1,
    };
    let encounter = EncounterRow {
        id: Uuid::new_v4(),
        dungeon_id: dungeon.id,
        name: "Azhiccar".to_string(),
        encounter_order: 1,
        healer_summary: "Devour windows demand grouped healing".to_string(),
        key_mechanics: vec!["Toxic Regurgitation".to_string()],
        ability_count: abilities.len() as u32,
    };
    let encounter_id = encounter.id;
    let snapshot = CatalogSnapshot {
        data_version: None,
        seasons: vec![SeasonPatch {
            season_info: season,
            dungeons: vec![DungeonPatch {
                dungeon_info: dungeon,
                boss_encounters: vec![EncounterPatch { encounter_info: encounter, abilities }],
            }],
        }],
    };
    (Arc::new(ContentStore::from_snapshot(&snapshot)), encounter_id)
}

fn ability_row(name: &str, profile: &str, targets: &str, cooldown: Option<u32>) -> AbilityRow {
    AbilityRow {
        id: Uuid::new_v4(),
        boss_encounter_id: Uuid::nil(),
        name: name.to_string(),
        ability_type: "damage".to_string(),
        targets: targets.to_string(),
        damage_profile: profile.to_string(),
        healer_action: "Heal through it".to_string(),
        critical_insight: String::new(),
        cooldown_seconds: cooldown,
        display_order: 1,
        is_key_mechanic: false,
    }
}

#[test]
fn acceptance_scenario_critical_group_key_mechanic() {
    let a = ability(
        "Invoke Collapse",
        DamageProfile::Critical,
        TargetType::Group,
        true,
        "Use immediate cooldown",
        Some(45),
    );
    let classified = classify_ability(&a);
    assert_eq!(classified.urgency, Urgency::Immediate);
    assert_eq!(classified.impact, Impact::Critical);

    let ranked = prioritize_for_healer(std::slice::from_ref(&a));
    assert!(ranked[0].priority >= 100);
    assert_eq!(ranked[0].display_hint, DisplayHint::Highlight);
}

#[test]
fn ranking_property_holds_across_a_mixed_list() {
    let top = ability(
        "Cascade",
        DamageProfile::Critical,
        TargetType::Group,
        true,
        "Use immediate raid cooldown",
        Some(60),
    );
    let fillers = vec![
        ability("Jab", DamageProfile::Moderate, TargetType::RandomPlayer, false, "Spot heal", None),
        ability("Poke", DamageProfile::Moderate, TargetType::Healers, false, "Self heal", Some(20)),
        ability("Nick", DamageProfile::Moderate, TargetType::Location, false, "Dodge", None),
    ];
    let mut all = fillers.clone();
    all.push(top.clone());

    let ranked = prioritize_for_healer(&all);
    assert_eq!(ranked[0].ability_name, "Cascade");
    for filler in ranked.iter().skip(1) {
        assert!(filler.priority < ranked[0].priority);
    }
}

#[tokio::test]
async fn analyzing_a_missing_encounter_is_not_found() {
    let (store, _) = store_with_encounter(vec![]);
    let analyzer = DamageProfileAnalyzer::new(store);
    let err = analyzer.analyze_damage_profile(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
}

#[tokio::test]
async fn analyzing_an_empty_encounter_is_a_well_formed_empty_analysis() {
    let (store, encounter_id) = store_with_encounter(vec![]);
    let analyzer = DamageProfileAnalyzer::new(store);
    let analysis = analyzer.analyze_damage_profile(encounter_id).await.unwrap();
    assert_eq!(analysis.encounter_id, encounter_id);
    assert_eq!(analysis.distribution.total(), 0);
    assert_eq!(analysis.healing_load, HealingLoad::Light);
    assert!(analysis.key_timings.is_empty());
    assert!(analysis.recommendations.is_empty());
}

#[tokio::test]
async fn acceptance_scenario_overlapping_critical_cooldowns() {
    let (store, encounter_id) = store_with_encounter(vec![
        ability_row("Toxic Regurgitation", "Critical", "group", Some(45)),
        ability_row("Devour", "Critical", "tank", Some(50)),
    ]);
    let analyzer = DamageProfileAnalyzer::new(store);
    let analysis = analyzer.analyze_damage_profile(encounter_id).await.unwrap();

    assert_eq!(analysis.key_timings.len(), 2);
    for timing in &analysis.key_timings {
        assert!(timing.overlaps_with_others, "{} should overlap", timing.ability_name);
    }
    assert!(matches!(analysis.healing_load, HealingLoad::Heavy | HealingLoad::Burst));
}

#[tokio::test]
async fn overlap_window_is_overridable_configuration() {
    let (store, encounter_id) = store_with_encounter(vec![
        ability_row("Early Slam", "High", "group", Some(30)),
        ability_row("Late Slam", "High", "group", Some(38)),
    ]);
    let narrow = AnalyzerConfig { overlap_window_seconds: 5, ..Default::default() };
    let analyzer = DamageProfileAnalyzer::with_config(store, narrow);
    let analysis = analyzer.analyze_damage_profile(encounter_id).await.unwrap();
    for timing in &analysis.key_timings {
        assert!(!timing.overlaps_with_others, "8s apart is outside the 5s window");
    }
}

#[test]
fn classification_is_deterministic_across_repeated_calls() {
    let a = ability(
        "Arcing Void",
        DamageProfile::High,
        TargetType::RandomPlayer,
        false,
        "Dispel the afflicted player",
        Some(25),
    );
    let first = classify_ability(&a);
    for _ in 0..10 {
        assert_eq!(classify_ability(&a), first);
    }
}
