use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User-facing mark on a generated track. The engine only ever emits `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    #[default]
    None,
    Liked,
    Gem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    #[serde(rename = "cover_image")]
    pub image_url: Option<String>,
    pub duration_ms: Option<u64>,
    pub is_new: Option<bool>,
    #[serde(default)]
    pub status: TrackStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixKind {
    /// Five-category weighted recipe
    Blend,
    /// Everything comes from the slot named by `id_key`
    SingleSource,
    RapRadio,
    ArtistRadio,
}

impl fmt::Display for MixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixKind::Blend => write!(f, "blend"),
            MixKind::SingleSource => write!(f, "single_source"),
            MixKind::RapRadio => write!(f, "rap_radio"),
            MixKind::ArtistRadio => write!(f, "artist_radio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOption {
    pub id: String,
    pub label: String,
    pub kind: MixKind,
    /// Catalog slot this option draws from, for single-source mixes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_key: Option<String>,
}

impl RunOption {
    pub fn new(id: &str, label: &str, kind: MixKind) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            id_key: None,
        }
    }

    pub fn with_id_key(mut self, key: &str) -> Self {
        self.id_key = Some(key.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtistMode {
    #[default]
    TopTracks,
    DeepCuts,
}

impl FromStr for ArtistMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "top_tracks" | "top" => Ok(ArtistMode::TopTracks),
            "deep_cuts" | "deep" => Ok(ArtistMode::DeepCuts),
            _ => Err(format!(
                "Invalid artist mode: '{}'. Valid: top_tracks, deep_cuts",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSettings {
    pub total_length: usize,
    pub allow_explicit: bool,
    pub avoid_repeats: bool,
    pub artist_mode: ArtistMode,
    /// 0 = calmer, 1 = more energetic
    pub calm_hype: f64,
    /// Fraction of the mix given to recommendation-seeded tracks
    pub discover_level: f64,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            total_length: 35,
            allow_explicit: true,
            avoid_repeats: true,
            artist_mode: ArtistMode::TopTracks,
            calm_hype: 0.5,
            discover_level: 0.0,
        }
    }
}

impl RuleSettings {
    /// Apply per-option overrides. Every field set on the override wins.
    pub fn merged(&self, overrides: &RuleOverrides) -> RuleSettings {
        RuleSettings {
            total_length: overrides.total_length.unwrap_or(self.total_length),
            allow_explicit: overrides.allow_explicit.unwrap_or(self.allow_explicit),
            avoid_repeats: overrides.avoid_repeats.unwrap_or(self.avoid_repeats),
            artist_mode: overrides.artist_mode.unwrap_or(self.artist_mode),
            calm_hype: overrides.calm_hype.unwrap_or(self.calm_hype),
            discover_level: overrides.discover_level.unwrap_or(self.discover_level),
        }
    }

    /// Clamp the sliders into range and reject an empty mix.
    pub fn normalized(mut self) -> Result<RuleSettings, String> {
        if self.total_length == 0 {
            return Err("total length must be at least 1".to_string());
        }
        if !self.calm_hype.is_finite() || !self.discover_level.is_finite() {
            return Err("sliders must be finite numbers".to_string());
        }
        self.calm_hype = self.calm_hype.clamp(0.0, 1.0);
        self.discover_level = self.discover_level.clamp(0.0, 1.0);
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_explicit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid_repeats: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_mode: Option<ArtistMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calm_hype: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discover_level: Option<f64>,
}

/// Everything a caller gets back from one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub tracks: Vec<Track>,
    /// Per-source counts, e.g. "Acoustic 7 · Artist 7 · Liked 7"
    pub summary: String,
    /// Set whenever a fallback filled part of the mix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Generation counter value this result belongs to
    pub generation: u64,
}
