//! Bounded, cost-aware read cache and the read-through catalog front.
//!
//! Coherence is by invalidation, never by TTL: the coordinator invalidates
//! the affected season's entries right after a successful commit, so an
//! entry can be stale only inside that commit-to-invalidation window. All
//! mutation goes through this component's mutex-guarded inner map; the map
//! itself is never exposed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::catalog::entity::{Ability, BossEncounter, Dungeon, Season};
use crate::catalog::error::CatalogError;
use crate::catalog::store::{ContentSource, ContentStore, RecordSet};

pub const ACTIVE_SEASON_KEY: &str = "season:active";

pub fn dungeons_key(season_id: Uuid) -> String {
    format!("dungeons:{season_id}")
}

pub fn encounters_key(dungeon_id: Uuid) -> String {
    format!("encounters:{dungeon_id}")
}

pub fn abilities_key(encounter_id: Uuid) -> String {
    format!("abilities:{encounter_id}")
}

pub fn search_key(scope: Option<Uuid>, normalized_query: &str) -> String {
    match scope {
        Some(season_id) => format!("search:{normalized_query}:{season_id}"),
        None => format!("search:{normalized_query}:all"),
    }
}

/// Entry-count and total-cost bounds. Cost is a per-entry weight estimated
/// from the cached record count.
#[derive(Debug, Clone, Copy)]
pub struct CacheLimits {
    pub max_entries: usize,
    pub max_total_cost: u64,
}

impl Default for CacheLimits {
    fn default() -> Self {
        CacheLimits { max_entries: 256, max_total_cost: 4096 }
    }
}

/// Which season a cached entry's data belongs to. Global entries (e.g. an
/// unscoped search, or the cached absence of an active season) depend on the
/// whole catalog and fall on any commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryScope {
    Season(Uuid),
    Global,
}

#[derive(Debug, Clone)]
pub enum CachedValue {
    ActiveSeason(Option<Season>),
    Dungeons(RecordSet<Dungeon>),
    Encounters(RecordSet<BossEncounter>),
    Abilities(RecordSet<Ability>),
    SearchResults(Vec<Dungeon>),
}

struct Entry {
    value: CachedValue,
    scope: EntryScope,
    cost: u64,
    last_used: u64,
}

#[derive(Default)]
struct CacheInner {
    map: HashMap<String, Entry>,
    total_cost: u64,
    tick: u64,
}

pub struct ReadCache {
    inner: Mutex<CacheInner>,
    limits: CacheLimits,
}

impl ReadCache {
    pub fn new(limits: CacheLimits) -> Self {
        ReadCache { inner: Mutex::new(CacheInner::default()), limits }
    }

    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.map.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: String, value: CachedValue, season: Option<Uuid>) {
        let cost = estimate_cost(&value);
        let scope = match season {
            Some(id) => EntryScope::Season(id),
            None => EntryScope::Global,
        };
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        if let Some(old) = inner
            .map
            .insert(key, Entry { value, scope, cost, last_used: tick })
        {
            inner.total_cost -= old.cost;
        }
        inner.total_cost += cost;
        self.evict_over_limit(&mut inner);
    }

    pub fn invalidate(&self, key: &str) {
        let mut inner = self.lock();
        if let Some(entry) = inner.map.remove(key) {
            inner.total_cost -= entry.cost;
        }
    }

    /// Drop every entry whose data came from this season, plus global
    /// entries (they depend on every season). Called by the coordinator
    /// right after a successful commit.
    pub fn invalidate_season(&self, season_id: Uuid) {
        let mut inner = self.lock();
        let before = inner.map.len();
        inner.map.retain(|_, entry| {
            entry.scope != EntryScope::Season(season_id) && entry.scope != EntryScope::Global
        });
        inner.total_cost = inner.map.values().map(|entry| entry.cost).sum();
        debug!(
            season = %season_id,
            dropped = before - inner.map.len(),
            "cache invalidated for season commit"
        );
    }

    /// Host memory-pressure hook: drop everything.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.total_cost = 0;
        debug!("cache cleared under memory pressure");
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_over_limit(&self, inner: &mut CacheInner) {
        while inner.map.len() > self.limits.max_entries
            || inner.total_cost > self.limits.max_total_cost
        {
            let Some(oldest_key) = inner
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            else {
                return;
            };
            if let Some(entry) = inner.map.remove(&oldest_key) {
                inner.total_cost -= entry.cost;
                debug!(key = %oldest_key, cost = entry.cost, "cache entry evicted");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        // The critical section is short and never held across an await;
        // recover the inner state if a panicking reader poisoned it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new(CacheLimits::default())
    }
}

fn estimate_cost(value: &CachedValue) -> u64 {
    let records = match value {
        CachedValue::ActiveSeason(_) => 1,
        CachedValue::Dungeons(set) => set.records.len(),
        CachedValue::Encounters(set) => set.records.len(),
        CachedValue::Abilities(set) => set.records.len(),
        CachedValue::SearchResults(results) => results.len(),
    };
    records as u64 + 1
}

/// Read-through front over the store: serve from cache, compute on miss,
/// insert tagged with the owning season so commit invalidation stays
/// precise.
pub struct CachedCatalog<S = ContentStore> {
    source: Arc<S>,
    cache: Arc<ReadCache>,
}

impl<S: ContentSource> CachedCatalog<S> {
    pub fn new(source: Arc<S>, cache: Arc<ReadCache>) -> Self {
        CachedCatalog { source, cache }
    }

    pub fn cache(&self) -> &ReadCache {
        &self.cache
    }

    pub async fn active_season(&self) -> Result<Option<Season>, CatalogError> {
        if let Some(CachedValue::ActiveSeason(season)) = self.cache.get(ACTIVE_SEASON_KEY) {
            return Ok(season);
        }
        let season = self.source.active_season().await?;
        self.cache.insert(
            ACTIVE_SEASON_KEY.to_string(),
            CachedValue::ActiveSeason(season.clone()),
            season.as_ref().map(|s| s.id),
        );
        Ok(season)
    }

    pub async fn dungeons_for_season(
        &self,
        season_id: Uuid,
    ) -> Result<RecordSet<Dungeon>, CatalogError> {
        let key = dungeons_key(season_id);
        if let Some(CachedValue::Dungeons(set)) = self.cache.get(&key) {
            return Ok(set);
        }
        let set = self.source.dungeons_for_season(season_id).await?;
        self.cache.insert(key, CachedValue::Dungeons(set.clone()), Some(season_id));
        Ok(set)
    }

    pub async fn dungeons_for_active_season(&self) -> Result<RecordSet<Dungeon>, CatalogError> {
        match self.active_season().await? {
            Some(season) => self.dungeons_for_season(season.id).await,
            None => Ok(RecordSet::default()),
        }
    }

    pub async fn encounters_for_dungeon(
        &self,
        dungeon_id: Uuid,
    ) -> Result<RecordSet<BossEncounter>, CatalogError> {
        let key = encounters_key(dungeon_id);
        if let Some(CachedValue::Encounters(set)) = self.cache.get(&key) {
            return Ok(set);
        }
        // The dungeon lookup both validates the parent and yields the season
        // id the entry is scoped under.
        let dungeon = self.source.get_dungeon(dungeon_id).await?;
        let set = self.source.encounters_for_dungeon(dungeon_id).await?;
        self.cache
            .insert(key, CachedValue::Encounters(set.clone()), Some(dungeon.season_id));
        Ok(set)
    }

    pub async fn abilities_for_encounter(
        &self,
        encounter_id: Uuid,
    ) -> Result<RecordSet<Ability>, CatalogError> {
        let key = abilities_key(encounter_id);
        if let Some(CachedValue::Abilities(set)) = self.cache.get(&key) {
            return Ok(set);
        }
        let encounter = self.source.get_encounter(encounter_id).await?;
        let season_id = self
            .source
            .get_dungeon(encounter.dungeon_id)
            .await
            .map(|dungeon| dungeon.season_id)
            .ok();
        let set = self.source.abilities_for_encounter(encounter_id).await?;
        self.cache.insert(key, CachedValue::Abilities(set.clone()), season_id);
        Ok(set)
    }

    pub async fn search_dungeons(
        &self,
        scope: Option<Uuid>,
        query: &str,
    ) -> Result<Vec<Dungeon>, CatalogError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let key = search_key(scope, &needle);
        if let Some(CachedValue::SearchResults(results)) = self.cache.get(&key) {
            return Ok(results);
        }
        let results = self.source.search_dungeons(scope, query).await?;
        self.cache.insert(key, CachedValue::SearchResults(results.clone()), scope);
        Ok(results)
    }
}
