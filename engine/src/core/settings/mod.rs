//! Edit Settings
//!
//! Engine tunables with:
//! - Per-field defaults, so partial or older files still load
//! - Normalization that corrects out-of-range values instead of failing
//! - Atomic file writes (temp file + rename)

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::core::{CoreResult, TimeMs, TimeSec};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Maximum number of commands kept in undo history
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Minimum distance between a split point and either clip boundary
    #[serde(default = "default_min_split_distance")]
    pub min_split_distance_sec: TimeSec,

    /// Timeline end changes below this are ignored by propagation
    #[serde(default = "default_timeline_tolerance")]
    pub timeline_tolerance_ms: TimeMs,

    /// Pause the playback clock when it reaches the total duration
    #[serde(default = "default_true")]
    pub pause_at_end: bool,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_max_history() -> usize {
    100
}

fn default_min_split_distance() -> TimeSec {
    0.1
}

fn default_timeline_tolerance() -> TimeMs {
    0.001
}

fn default_true() -> bool {
    true
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            max_history: default_max_history(),
            min_split_distance_sec: default_min_split_distance(),
            timeline_tolerance_ms: default_timeline_tolerance(),
            pause_at_end: default_true(),
        }
    }
}

impl EditSettings {
    /// Clamps every field into its valid range.
    ///
    /// Tolerant: corrupted or hand-edited values are corrected, never rejected.
    pub fn normalize(&mut self) {
        if self.version < SETTINGS_VERSION {
            info!(
                "Migrating edit settings from version {} to {}",
                self.version, SETTINGS_VERSION
            );
        }
        self.version = SETTINGS_VERSION;

        self.max_history = self.max_history.clamp(1, 1000);
        self.min_split_distance_sec = clamp_f64(self.min_split_distance_sec, 0.0, 10.0);
        self.timeline_tolerance_ms = clamp_f64(self.timeline_tolerance_ms, 0.0, 1000.0);
    }

    /// Parses settings from JSON text and normalizes them
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.normalize();
        Ok(settings)
    }

    /// Loads settings from a JSON file, returning defaults if it doesn't exist
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            info!("Settings file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Loads settings, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load edit settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Saves normalized settings using an atomic write (temp file + rename)
    pub fn save(&self, path: &Path) -> CoreResult<Self> {
        let mut normalized = self.clone();
        normalized.normalize();

        let content = serde_json::to_string_pretty(&normalized)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)?;

        info!("Edit settings saved to {:?}", path);
        Ok(normalized)
    }
}

fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}
