//! Content catalog core: typed entities, the owning store, the season
//! update coordinator, and the invalidation-coherent read cache.

pub mod cache;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod report;
pub mod rows;
pub mod store;

pub use cache::{CacheLimits, CachedCatalog, ReadCache};
pub use coordinator::{SeasonUpdateCoordinator, SeasonUpdateSummary};
pub use entity::{Ability, AbilityType, BossEncounter, DamageProfile, Dungeon, Season, TargetType};
pub use error::{CatalogError, EntityKind};
pub use report::{ValidationDiagnostic, ValidationReport, ValidationSeverity};
pub use rows::{CatalogSnapshot, DungeonPatch, EncounterPatch, SeasonPatch};
pub use store::{CatalogSummary, ContentSource, ContentStore, CorruptRecord, RecordSet};
