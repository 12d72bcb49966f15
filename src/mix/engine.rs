//! Mix engine: turns a run option and rule settings into a track list.
//!
//! One run:
//! 1. merge per-option overrides into the rules and validate them
//! 2. load the catalog config, resolving unlinked slots first if needed
//! 3. snapshot the block list and cooldown history into a [`TrackFilter`]
//! 4. fetch and select per the option kind
//! 5. stamp the served ids in the cooldown history
//!
//! Every run bumps a generation counter. A caller that fired several runs
//! can drop any result whose generation is no longer current.

use crate::catalog::{
    BlockList, CandidateTrack, CatalogApi, CatalogConfig, CatalogConfigStore, CatalogPatch, Seeds,
    SlotKind,
};
use crate::config::{EngineConfig, SLOT_PRIMARY_ARTIST};
use crate::errors::{MixError, MixResult};
use crate::history::CooldownStore;
use crate::mix::artist_radio;
use crate::mix::cache::ArtistIdCache;
use crate::mix::fetcher::{FilteredPool, SourcePool, SourcePoolFetcher, TrackFilter};
use crate::mix::rap_radio;
use crate::mix::recipe::{compute_recipe, SourceCategory};
use crate::mix::resolver::CatalogResolver;
use crate::mix::selector::{interleave, CategoryPool};
use crate::models::{ArtistMode, MixKind, RuleSettings, RunOption, RunResult, Track};
use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const NOVEL_LABEL: &str = "Discover";

/// What a generator hands back before tracks are mapped and stamped.
#[derive(Debug, Default)]
struct Outcome {
    tracks: Vec<CandidateTrack>,
    summary: String,
    warning: Option<String>,
    failures: Vec<String>,
    /// Ids that came from the discover pool
    novel_ids: HashSet<String>,
}

pub struct MixEngine {
    api: Arc<dyn CatalogApi>,
    blocks: Arc<dyn BlockList>,
    catalog_store: Arc<dyn CatalogConfigStore>,
    cooldown: CooldownStore,
    config: EngineConfig,
    artist_ids: Arc<ArtistIdCache>,
    resolver: CatalogResolver,
    generation: AtomicU64,
}

impl MixEngine {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        blocks: Arc<dyn BlockList>,
        catalog_store: Arc<dyn CatalogConfigStore>,
        cooldown: CooldownStore,
        config: EngineConfig,
    ) -> Self {
        let artist_ids = Arc::new(ArtistIdCache::new());
        let resolver = CatalogResolver::new(api.clone(), catalog_store.clone(), artist_ids.clone());
        Self {
            api,
            blocks,
            catalog_store,
            cooldown,
            config,
            artist_ids,
            resolver,
            generation: AtomicU64::new(0),
        }
    }

    pub fn cooldown(&self) -> &CooldownStore {
        &self.cooldown
    }

    /// Start a new generation and return its number.
    pub fn begin_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current_generation(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub fn reset_caches(&self) {
        self.artist_ids.reset();
    }

    pub async fn resolve_all(&self) -> MixResult<CatalogConfig> {
        self.resolver.resolve_all().await
    }

    pub async fn generate_run_result(
        &self,
        option: &RunOption,
        rules: &RuleSettings,
    ) -> MixResult<RunResult> {
        let generation = self.begin_generation();
        let rules = self.effective_rules(option, rules)?;
        log::info!(
            "Generating '{}' ({}) with {} tracks, generation {}",
            option.id,
            option.kind,
            rules.total_length,
            generation
        );

        let catalog = self.prepare_catalog(option).await?;
        let filter = self.build_filter(&rules).await?;
        let fetcher = SourcePoolFetcher::new(
            self.api.as_ref(),
            &filter,
            self.config.fetch_size(rules.total_length),
        );
        let mut rng = self.rng();

        let outcome = match option.kind {
            MixKind::Blend => self.generate_blend(option, &rules, &catalog, &fetcher, &mut rng).await,
            MixKind::SingleSource => {
                self.generate_single_source(option, &rules, &catalog, &fetcher, &mut rng)
                    .await?
            }
            MixKind::RapRadio => {
                self.generate_rap_radio(option, &rules, &catalog, &fetcher, &mut rng)
                    .await?
            }
            MixKind::ArtistRadio => {
                self.generate_artist_radio(option, &rules, &catalog, &fetcher, &mut rng)
                    .await?
            }
        };

        let tracks: Vec<Track> = outcome
            .tracks
            .iter()
            .filter_map(|candidate| {
                let mut track = candidate.to_track()?;
                if outcome.novel_ids.contains(&track.id) {
                    track.is_new = Some(true);
                }
                Some(track)
            })
            .collect();
        if tracks.is_empty() {
            return Err(exhausted(&outcome.failures));
        }

        if self.cooldown_active(&rules) {
            let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
            if let Err(e) = self.cooldown.mark_used(&ids).await {
                log::warn!("Could not record cooldown stamps: {}", e);
            }
        }

        if !self.is_current_generation(generation) {
            log::debug!("Generation {} finished after being superseded", generation);
        }

        let warning = merge_warnings(outcome.warning, &outcome.failures);
        if let Some(w) = &warning {
            log::info!("Run '{}' finished with warning: {}", option.id, w);
        }
        log::info!("Run '{}' produced {} tracks: {}", option.id, tracks.len(), outcome.summary);

        Ok(RunResult {
            tracks,
            summary: outcome.summary,
            warning,
            generation,
        })
    }

    fn effective_rules(&self, option: &RunOption, rules: &RuleSettings) -> MixResult<RuleSettings> {
        let merged = match self.config.overrides_for(&option.id) {
            Some(overrides) => rules.merged(overrides),
            None => rules.clone(),
        };
        merged.normalized().map_err(MixError::InvalidRules)
    }

    fn cooldown_active(&self, rules: &RuleSettings) -> bool {
        !self.config.offline && rules.avoid_repeats
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Slot keys an option draws from.
    fn required_slots(&self, option: &RunOption, catalog: &CatalogConfig) -> Vec<String> {
        let sources = &self.config.category_sources;
        match option.kind {
            MixKind::Blend => SourceCategory::ALL
                .iter()
                .flat_map(|c| sources.slots_for(*c).iter().cloned())
                .collect(),
            MixKind::SingleSource => option.id_key.iter().cloned().collect(),
            MixKind::RapRadio => catalog.rap_sources.clone(),
            MixKind::ArtistRadio => sources.artist_primary.clone(),
        }
    }

    async fn prepare_catalog(&self, option: &RunOption) -> MixResult<CatalogConfig> {
        let catalog = self.catalog_store.load().await?;
        if !self.config.auto_resolve {
            return Ok(catalog);
        }

        let resolvable = self.required_slots(option, &catalog).iter().any(|key| {
            catalog
                .slot(key)
                .is_some_and(|slot| !slot.is_linked() && slot.kind != SlotKind::Album)
        });
        if !resolvable {
            return Ok(catalog);
        }

        match self.resolver.resolve_all().await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                log::warn!("Resolver failed, continuing with stored links: {}", e);
                Ok(catalog)
            }
        }
    }

    async fn build_filter(&self, rules: &RuleSettings) -> MixResult<TrackFilter> {
        let blocked = self
            .blocks
            .blocked_ids()
            .await
            .map_err(|e| MixError::Database(format!("{:#}", e)))?;
        let restricted = if self.cooldown_active(rules) {
            self.cooldown.restricted_ids().await?
        } else {
            HashSet::new()
        };
        log::debug!(
            "Filter snapshot: {} blocked, {} in cooldown",
            blocked.len(),
            restricted.len()
        );
        Ok(TrackFilter::new(blocked, restricted, rules.allow_explicit))
    }

    async fn fetch_category(
        &self,
        fetcher: &SourcePoolFetcher<'_>,
        catalog: &CatalogConfig,
        category: SourceCategory,
        mode: ArtistMode,
        seed: u64,
    ) -> SourcePool {
        match category {
            SourceCategory::Liked => fetcher.fetch_liked().await,
            other => {
                let keys = self.config.category_sources.slots_for(other);
                fetcher.fetch_slots(catalog, keys, mode, seed).await
            }
        }
    }

    /// Seeds for the discover share: linked primary artists first, then
    /// liked tracks.
    fn novel_seeds(
        &self,
        catalog: &CatalogConfig,
        pools: &[(SourceCategory, SourcePool)],
        rng: &mut StdRng,
    ) -> Seeds {
        let artists: Vec<String> = self
            .config
            .category_sources
            .artist_primary
            .iter()
            .filter_map(|key| match catalog.linked(key) {
                Some((id, SlotKind::Artist)) => Some(id.to_string()),
                _ => None,
            })
            .collect();

        let liked = pools
            .iter()
            .find(|(c, _)| *c == SourceCategory::Liked)
            .map(|(_, p)| p);
        let mut tracks: Vec<String> = match liked {
            Some(pool) => pool.pool.eligible_ids().map(str::to_string).collect(),
            None => pools
                .iter()
                .flat_map(|(_, p)| p.pool.eligible_ids().map(str::to_string))
                .collect(),
        };
        tracks.shuffle(rng);
        Seeds::new(artists, tracks)
    }

    async fn generate_blend(
        &self,
        option: &RunOption,
        rules: &RuleSettings,
        catalog: &CatalogConfig,
        fetcher: &SourcePoolFetcher<'_>,
        rng: &mut StdRng,
    ) -> Outcome {
        let recipe = compute_recipe(&option.id, rules);
        let categories: Vec<(SourceCategory, u64)> = SourceCategory::ALL
            .iter()
            .filter(|c| recipe.quota(**c) > 0)
            .map(|c| (*c, rng.random()))
            .collect();

        let fetched = join_all(categories.iter().map(|(category, seed)| {
            self.fetch_category(fetcher, catalog, *category, rules.artist_mode, *seed)
        }))
        .await;
        let pools: Vec<(SourceCategory, SourcePool)> = categories
            .iter()
            .map(|(c, _)| *c)
            .zip(fetched)
            .collect();

        for (category, pool) in &pools {
            log::debug!(
                "{}: {} eligible, {} cooling, quota {}",
                category,
                pool.pool.eligible.len(),
                pool.pool.cooled.len(),
                recipe.quota(*category)
            );
        }

        let mut novel: Option<SourcePool> = None;
        if recipe.novel > 0 {
            let seeds = self.novel_seeds(catalog, &pools, rng);
            let mut fetched = fetcher.fetch_recommendations(&seeds).await;
            fetched
                .pool
                .eligible
                .retain(|t| !pools.iter().any(|(_, p)| in_pool(&p.pool, t)));
            novel = Some(fetched);
        }

        let mut failures = Vec::new();
        let mut category_pools: Vec<CategoryPool> = Vec::with_capacity(pools.len() + 1);
        for (category, source) in pools {
            failures.extend(source.failures);
            category_pools.push(CategoryPool::new(
                category.label(),
                recipe.quota(category),
                source.pool,
            ));
        }
        let mut novel_ids = HashSet::new();
        if let Some(source) = novel {
            failures.extend(source.failures);
            novel_ids = source.pool.eligible_ids().map(str::to_string).collect();
            category_pools.push(CategoryPool::new(NOVEL_LABEL, recipe.novel, source.pool));
        }

        let selection = interleave(category_pools, rules.total_length, rng);
        Outcome {
            summary: selection.summary(),
            warning: selection.warning(),
            tracks: selection.tracks,
            failures,
            novel_ids,
        }
    }

    async fn generate_single_source(
        &self,
        option: &RunOption,
        rules: &RuleSettings,
        catalog: &CatalogConfig,
        fetcher: &SourcePoolFetcher<'_>,
        rng: &mut StdRng,
    ) -> MixResult<Outcome> {
        let key = option.id_key.as_deref().ok_or_else(|| {
            MixError::Config(format!("Option '{}' does not name a source slot", option.id))
        })?;
        let label = catalog
            .slot(key)
            .map(|s| s.label.clone())
            .unwrap_or_else(|| option.label.clone());
        let (id, kind) = catalog.linked(key).ok_or_else(|| MixError::Unlinked {
            slot: key.to_string(),
            label: label.clone(),
        })?;

        let pool = fetcher
            .fetch_source(id, kind, rules.artist_mode, rng.random())
            .await
            .map_err(|e| MixError::Exhausted(format!("{}: {:#}", label, e)))?;

        let selection = interleave(
            vec![CategoryPool::new(&label, rules.total_length, pool)],
            rules.total_length,
            rng,
        );
        Ok(Outcome {
            summary: selection.summary(),
            warning: selection.warning(),
            tracks: selection.tracks,
            failures: Vec::new(),
            ..Default::default()
        })
    }

    async fn liked_ids(&self) -> HashSet<String> {
        match self.api.liked_track_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                log::warn!("Could not load liked ids, treating every track as new: {:#}", e);
                HashSet::new()
            }
        }
    }

    async fn generate_rap_radio(
        &self,
        option: &RunOption,
        rules: &RuleSettings,
        catalog: &CatalogConfig,
        fetcher: &SourcePoolFetcher<'_>,
        rng: &mut StdRng,
    ) -> MixResult<Outcome> {
        let linked: Vec<String> = catalog
            .rap_sources
            .iter()
            .filter(|key| catalog.linked(key).is_some())
            .cloned()
            .collect();
        if linked.is_empty() {
            let slot = catalog
                .rap_sources
                .first()
                .cloned()
                .unwrap_or_else(|| "rap_sources".to_string());
            let label = catalog
                .slot(&slot)
                .map(|s| s.label.clone())
                .unwrap_or_else(|| option.label.clone());
            return Err(MixError::Unlinked { slot, label });
        }

        let seed = rng.random();
        let (merged, liked) = futures_util::join!(
            fetcher.fetch_slots(catalog, &linked, rules.artist_mode, seed),
            self.liked_ids()
        );
        log::debug!(
            "Rap pool: {} eligible from {} source(s), {} liked ids",
            merged.pool.eligible.len(),
            linked.len(),
            liked.len()
        );

        let selection = rap_radio::select_rap_radio(merged.pool, &liked, rules.total_length, rng);
        Ok(Outcome {
            summary: selection.summary(),
            warning: selection.warning,
            tracks: selection.tracks,
            failures: merged.failures,
            ..Default::default()
        })
    }

    async fn generate_artist_radio(
        &self,
        option: &RunOption,
        rules: &RuleSettings,
        catalog: &CatalogConfig,
        fetcher: &SourcePoolFetcher<'_>,
        rng: &mut StdRng,
    ) -> MixResult<Outcome> {
        let key = self
            .config
            .category_sources
            .artist_primary
            .first()
            .cloned()
            .unwrap_or_else(|| SLOT_PRIMARY_ARTIST.to_string());
        let Some(slot) = catalog.slot(&key) else {
            return Err(MixError::Unlinked {
                slot: key,
                label: option.label.clone(),
            });
        };
        let artist_name = slot.label.clone();
        let artist_id = match catalog.linked(&key) {
            Some((id, _)) => id.to_string(),
            None => self.link_primary_artist(&key, &artist_name).await?,
        };

        let roster = &catalog.similar_artists;
        let primary_seed = rng.random();
        let (primary, similar_ids) = futures_util::join!(
            fetcher.fetch_source(&artist_id, SlotKind::Artist, rules.artist_mode, primary_seed),
            join_all(roster.iter().map(|name| self.resolver.resolve_artist(name)))
        );

        let mut failures = Vec::new();
        let primary = primary.unwrap_or_else(|e| {
            log::warn!("Primary artist '{}' failed: {:#}", artist_name, e);
            failures.push(format!("{}: {:#}", artist_name, e));
            FilteredPool::default()
        });

        let similar: Vec<(&String, String)> = roster
            .iter()
            .zip(similar_ids)
            .filter_map(|(name, id)| id.filter(|id| *id != artist_id).map(|id| (name, id)))
            .collect();
        log::debug!("Resolved {} of {} similar artists", similar.len(), roster.len());

        let similar_pools = join_all(
            similar
                .iter()
                .map(|(name, id)| fetcher.fetch_artist_top(name, id)),
        )
        .await;
        let mut pools = Vec::with_capacity(similar_pools.len());
        for source in similar_pools {
            failures.extend(source.failures);
            pools.push(source.pool);
        }

        let selection = artist_radio::assemble(primary, pools, rules.total_length, rng);
        Ok(Outcome {
            summary: selection.summary(&artist_name),
            warning: selection.warning.clone(),
            tracks: selection.tracks,
            failures,
            ..Default::default()
        })
    }

    /// Resolve the primary artist by name and persist the link.
    async fn link_primary_artist(&self, key: &str, name: &str) -> MixResult<String> {
        let id = self
            .resolver
            .resolve_artist(name)
            .await
            .ok_or_else(|| MixError::Unlinked {
                slot: key.to_string(),
                label: name.to_string(),
            })?;

        let mut patch = CatalogPatch::default();
        patch.link(key, &id, SlotKind::Artist);
        if let Err(e) = self.catalog_store.patch(&patch).await {
            log::warn!("Could not save link for '{}': {:#}", name, e);
        }
        Ok(id)
    }
}

fn in_pool(pool: &FilteredPool, track: &CandidateTrack) -> bool {
    track.id.as_deref().is_some_and(|id| pool.contains(id))
}

fn exhausted(failures: &[String]) -> MixError {
    match failures.last() {
        Some(last) => MixError::Exhausted(format!(
            "no source returned a playable track (last error: {})",
            last
        )),
        None => MixError::Exhausted("no source returned a playable track".to_string()),
    }
}

fn merge_warnings(warning: Option<String>, failures: &[String]) -> Option<String> {
    let failed = match failures.len() {
        0 => None,
        1 => Some("1 source could not be loaded".to_string()),
        n => Some(format!("{} sources could not be loaded", n)),
    };
    match (warning, failed) {
        (Some(w), Some(f)) => Some(format!("{}. {}", w, f)),
        (w, f) => w.or(f),
    }
}
