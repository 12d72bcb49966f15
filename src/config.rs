use crate::catalog::{CatalogConfig, CatalogSlot, SlotKind};
use crate::errors::{MixError, MixResult};
use crate::mix::recipe::SourceCategory;
use crate::models::{MixKind, RuleOverrides, RunOption};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "mixsmith";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DATABASE_FILE_NAME: &str = "mixsmith.db";

pub const DEFAULT_COOLDOWN_DAYS: u32 = 3;
pub const DEFAULT_FETCH_FLOOR: usize = 50;
pub const DEFAULT_FETCH_MULTIPLIER: usize = 3;
pub const DEFAULT_MARKET: &str = "from_token";

pub const SLOT_ACOUSTIC: &str = "acoustic_playlist";
pub const SLOT_PRIMARY_ARTIST: &str = "primary_artist";
pub const SLOT_SIGNAL: &str = "signal_playlist";
pub const SLOT_GENRE: &str = "genre_playlist";

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn get_config_file_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE_NAME)
}

pub fn get_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(get_config_dir)
        .join(APP_DIR_NAME)
        .join(DATABASE_FILE_NAME)
}

/// Which catalog slots feed each weighted category.
/// `Liked` is served from the user's library and needs no slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySources {
    pub acoustic: Vec<String>,
    pub artist_primary: Vec<String>,
    pub secondary_signal: Vec<String>,
    pub curated_genre: Vec<String>,
}

impl Default for CategorySources {
    fn default() -> Self {
        Self {
            acoustic: vec![SLOT_ACOUSTIC.to_string()],
            artist_primary: vec![SLOT_PRIMARY_ARTIST.to_string()],
            secondary_signal: vec![SLOT_SIGNAL.to_string()],
            curated_genre: vec![SLOT_GENRE.to_string()],
        }
    }
}

impl CategorySources {
    pub fn slots_for(&self, category: SourceCategory) -> &[String] {
        match category {
            SourceCategory::Acoustic => &self.acoustic,
            SourceCategory::ArtistPrimary => &self.artist_primary,
            SourceCategory::SecondarySignal => &self.secondary_signal,
            SourceCategory::CuratedGenre => &self.curated_genre,
            SourceCategory::Liked => &[],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cooldown_days: u32,
    pub fetch_floor: usize,
    pub fetch_multiplier: usize,
    /// Skip cooldown filtering and stamping entirely
    pub offline: bool,
    /// Try the resolver before a run when the option's slots are unlinked
    pub auto_resolve: bool,
    /// Fixed seed for reproducible selections
    pub seed: Option<u64>,
    pub market: String,
    pub category_sources: CategorySources,
    pub options: Vec<RunOption>,
    pub rule_overrides: HashMap<String, RuleOverrides>,
    /// Slots and rosters seeded into the catalog store on first run
    pub catalog: CatalogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown_days: DEFAULT_COOLDOWN_DAYS,
            fetch_floor: DEFAULT_FETCH_FLOOR,
            fetch_multiplier: DEFAULT_FETCH_MULTIPLIER,
            offline: false,
            auto_resolve: true,
            seed: None,
            market: DEFAULT_MARKET.to_string(),
            category_sources: CategorySources::default(),
            options: builtin_options(),
            rule_overrides: HashMap::new(),
            catalog: default_catalog(),
        }
    }
}

impl EngineConfig {
    /// Read the config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> MixResult<Self> {
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)
            .map_err(|e| MixError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> MixResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Raw candidates requested per source for a mix of `total` tracks.
    pub fn fetch_size(&self, total: usize) -> usize {
        self.fetch_floor.max(total * self.fetch_multiplier)
    }

    pub fn cooldown_window_ms(&self) -> i64 {
        i64::from(self.cooldown_days) * 24 * 60 * 60 * 1000
    }

    pub fn option(&self, id: &str) -> Option<&RunOption> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn overrides_for(&self, option_id: &str) -> Option<&RuleOverrides> {
        self.rule_overrides.get(option_id)
    }
}

pub fn builtin_options() -> Vec<RunOption> {
    vec![
        RunOption::new("daily", "Daily Mix", MixKind::Blend),
        RunOption::new("morning", "Slow Morning", MixKind::Blend),
        RunOption::new("workout", "Workout", MixKind::Blend),
        RunOption::new("throwback", "Throwback", MixKind::Blend),
        RunOption::new("acoustic_only", "Acoustic Session", MixKind::SingleSource)
            .with_id_key(SLOT_ACOUSTIC),
        RunOption::new("rap_radio", "Golden Era Rap", MixKind::RapRadio),
        RunOption::new("artist_radio", "Artist Radio", MixKind::ArtistRadio),
    ]
}

pub fn default_catalog() -> CatalogConfig {
    let mut catalog = CatalogConfig::default();
    let slots = [
        (SLOT_ACOUSTIC, "90s Acoustic", SlotKind::Playlist),
        (SLOT_PRIMARY_ARTIST, "Nas", SlotKind::Artist),
        (SLOT_SIGNAL, "Release Radar", SlotKind::Playlist),
        (SLOT_GENRE, "Golden Era Hip-Hop", SlotKind::Playlist),
        ("rap_classics", "Rap Classics", SlotKind::Playlist),
        ("rap_90s", "90s Hip Hop", SlotKind::Playlist),
        ("rap_2000s", "2000s Rap", SlotKind::Playlist),
        ("rap_illmatic", "Illmatic", SlotKind::Album),
    ];
    for (key, label, kind) in slots {
        catalog
            .slots
            .insert(key.to_string(), CatalogSlot::unlinked(label, kind));
    }
    catalog.rap_sources = ["rap_classics", "rap_90s", "rap_2000s", "rap_illmatic"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    catalog.similar_artists = [
        "Mobb Deep",
        "Wu-Tang Clan",
        "A Tribe Called Quest",
        "Common",
        "Mos Def",
        "Big L",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_size_floor_and_multiplier() {
        let config = EngineConfig::default();
        assert_eq!(config.fetch_size(10), 50);
        assert_eq!(config.fetch_size(35), 105);
    }

    #[test]
    fn test_cooldown_window() {
        let config = EngineConfig::default();
        assert_eq!(config.cooldown_window_ms(), 3 * 86_400_000);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("mixsmith-config-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE_NAME);
        let mut config = EngineConfig::default();
        config.cooldown_days = 5;
        config.seed = Some(7);
        config.save(&path).unwrap();

        let loaded = EngineConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.cooldown_days, 5);
        assert_eq!(loaded.seed, Some(7));
        assert_eq!(loaded.options.len(), config.options.len());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("mixsmith-does-not-exist/config.json");
        let config = EngineConfig::load_or_default(&path).unwrap();
        assert_eq!(config.cooldown_days, DEFAULT_COOLDOWN_DAYS);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = std::env::temp_dir().join(format!("mixsmith-partial-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "offline": true }"#).unwrap();

        let config = EngineConfig::load_or_default(&path).unwrap();
        assert!(config.offline);
        assert_eq!(config.fetch_floor, DEFAULT_FETCH_FLOOR);
        assert!(config.option("rap_radio").is_some());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_default_catalog_rap_sources_exist() {
        let catalog = default_catalog();
        for key in &catalog.rap_sources {
            assert!(catalog.slot(key).is_some(), "missing slot {}", key);
        }
        assert_eq!(
            catalog.slot(SLOT_PRIMARY_ARTIST).map(|s| s.kind),
            Some(SlotKind::Artist)
        );
    }
}
