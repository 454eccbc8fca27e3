//! Thin command dispatch for the collaborator tooling surface. All
//! behavior lives in the catalog/analysis modules; this file only parses
//! argv, wires the services together, and formats output.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::analysis::damage::{analyze_abilities, AnalyzerConfig};
use crate::analysis::prioritize_for_healer;
use crate::catalog::cache::{CacheLimits, ReadCache};
use crate::catalog::coordinator::{validate_patch, SeasonUpdateCoordinator};
use crate::catalog::rows::{save_snapshot, SeasonPatch};
use crate::catalog::store::{ContentSource, ContentStore};

const DEFAULT_CATALOG_PATH: &str = "data/catalog.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ingest,
    Validate,
    Export,
    Summary,
    Integrity,
    Analyze,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("ingest") => Some(Command::Ingest),
        Some("validate") => Some(Command::Validate),
        Some("export") => Some(Command::Export),
        Some("summary") => Some(Command::Summary),
        Some("integrity") => Some(Command::Integrity),
        Some("analyze") => Some(Command::Analyze),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Ingest) => handle_ingest(args),
        Some(Command::Validate) => handle_validate(args),
        Some(Command::Export) => handle_export(args),
        Some(Command::Summary) => handle_summary(),
        Some(Command::Integrity) => handle_integrity(),
        Some(Command::Analyze) => handle_analyze(args),
        None => {
            eprintln!("usage: healerkit <ingest|validate|export|summary|integrity|analyze>");
            2
        }
    }
}

fn catalog_path() -> PathBuf {
    env::var("HEALERKIT_CATALOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CATALOG_PATH))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

fn read_patch(path: &str) -> Result<SeasonPatch, String> {
    let raw = fs::read_to_string(path).map_err(|err| format!("unable to read '{path}': {err}"))?;
    serde_json::from_str(&raw).map_err(|err| format!("unable to parse patch '{path}': {err}"))
}

fn handle_ingest(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: healerkit ingest <path-to-season-patch.json>");
        return 2;
    };
    let patch = match read_patch(path) {
        Ok(patch) => patch,
        Err(err) => {
            eprintln!("ingest failed: {err}");
            return 1;
        }
    };

    let catalog = catalog_path();
    runtime().block_on(async {
        let store = Arc::new(ContentStore::from_snapshot_file(&catalog));
        let cache = Arc::new(ReadCache::new(CacheLimits::default()));
        let coordinator = SeasonUpdateCoordinator::new(Arc::clone(&store), cache);

        match coordinator.apply_season_patch(&patch).await {
            Ok(summary) => {
                let snapshot = store.export_catalog().await;
                if let Err(err) = save_snapshot(&catalog, &snapshot) {
                    eprintln!("ingest committed but snapshot write failed: {err}");
                    return 1;
                }
                println!(
                    "ingested season '{}': {} dungeons, {} encounters, {} abilities",
                    summary.season_name,
                    summary.dungeons,
                    summary.boss_encounters,
                    summary.abilities
                );
                if let Some(old) = summary.deactivated_season {
                    println!("deactivated previous active season '{old}'");
                }
                0
            }
            Err(err) => {
                eprintln!("ingest failed: {err}");
                1
            }
        }
    })
}

fn handle_validate(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: healerkit validate <path-to-season-patch.json>");
        return 2;
    };
    let patch = match read_patch(path) {
        Ok(patch) => patch,
        Err(err) => {
            eprintln!("validate failed: {err}");
            return 1;
        }
    };

    let report = validate_patch(&patch);
    if report.diagnostics.is_empty() {
        println!("validation passed: {path}");
        return 0;
    }
    for diag in &report.diagnostics {
        println!("{diag}");
    }
    if report.has_errors() {
        eprintln!("validation failed: {} finding(s)", report.diagnostics.len());
        1
    } else {
        println!("validation passed with warnings: {path}");
        0
    }
}

fn handle_export(args: &[String]) -> i32 {
    let catalog = catalog_path();
    runtime().block_on(async {
        let store = ContentStore::from_snapshot_file(&catalog);
        let payload = match args.get(2) {
            Some(raw_id) => {
                let Ok(season_id) = raw_id.parse::<Uuid>() else {
                    eprintln!("invalid season id '{raw_id}'");
                    return 2;
                };
                match store.export_season(season_id).await {
                    Ok(patch) => serde_json::to_string_pretty(&patch),
                    Err(err) => {
                        eprintln!("export failed: {err}");
                        return 1;
                    }
                }
            }
            None => serde_json::to_string_pretty(&store.export_catalog().await),
        };
        match payload {
            Ok(json) => {
                println!("{json}");
                0
            }
            Err(err) => {
                eprintln!("failed to serialize export: {err}");
                1
            }
        }
    })
}

fn handle_summary() -> i32 {
    let catalog = catalog_path();
    runtime().block_on(async {
        let store = ContentStore::from_snapshot_file(&catalog);
        let counts = store.entity_counts().await;
        match serde_json::to_string_pretty(&counts) {
            Ok(json) => {
                println!("{json}");
                0
            }
            Err(err) => {
                eprintln!("failed to serialize summary: {err}");
                1
            }
        }
    })
}

fn handle_integrity() -> i32 {
    let catalog = catalog_path();
    runtime().block_on(async {
        let store = ContentStore::from_snapshot_file(&catalog);
        let report = store.check_integrity().await;
        if report.diagnostics.is_empty() {
            println!("integrity check passed: {}", catalog.display());
            return 0;
        }
        for diag in &report.diagnostics {
            println!("{diag}");
        }
        if report.has_errors() {
            eprintln!("integrity check failed: {} finding(s)", report.diagnostics.len());
            1
        } else {
            println!("integrity check passed with warnings");
            0
        }
    })
}

fn handle_analyze(args: &[String]) -> i32 {
    let Some(raw_id) = args.get(2) else {
        eprintln!("usage: healerkit analyze <encounter-id>");
        return 2;
    };
    let Ok(encounter_id) = raw_id.parse::<Uuid>() else {
        eprintln!("invalid encounter id '{raw_id}'");
        return 2;
    };

    let catalog = catalog_path();
    runtime().block_on(async {
        let store = ContentStore::from_snapshot_file(&catalog);

        // One read serves both the aggregate analysis and the ranking.
        let abilities = match store.abilities_for_encounter(encounter_id).await {
            Ok(set) => set,
            Err(err) => {
                eprintln!("analyze failed: {err}");
                return 1;
            }
        };
        let analysis =
            analyze_abilities(encounter_id, &abilities.records, &AnalyzerConfig::default());
        let priorities = prioritize_for_healer(&abilities.records);

        let payload = serde_json::json!({
            "analysis": analysis,
            "priorities": priorities,
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(json) => {
                println!("{json}");
                0
            }
            Err(err) => {
                eprintln!("failed to serialize analysis: {err}");
                1
            }
        }
    })
}
