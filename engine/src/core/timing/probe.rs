//! Media Duration Probe
//!
//! The engine never decodes media itself. Hosts supply an [`AssetProbe`]
//! (for example a hidden media element in the browser) that reports a
//! source's duration.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::TimeSec;

/// Reports the duration of a media source in seconds
#[async_trait(?Send)]
pub trait AssetProbe {
    /// Returns the duration of `url`, or `None` if it could not be determined
    async fn probe_duration(&self, url: &str) -> Option<TimeSec>;
}

/// Probe that never knows a duration; every auto length falls back to the default
#[derive(Clone, Debug, Default)]
pub struct NullProbe;

#[async_trait(?Send)]
impl AssetProbe for NullProbe {
    async fn probe_duration(&self, _url: &str) -> Option<TimeSec> {
        None
    }
}

/// Probe backed by a fixed table of durations
#[derive(Clone, Debug, Default)]
pub struct StaticProbe {
    durations: HashMap<String, TimeSec>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the duration for a source
    pub fn with_duration(mut self, url: &str, duration: TimeSec) -> Self {
        self.durations.insert(url.to_string(), duration);
        self
    }

    /// Builds a probe from a `{ "url": seconds }` table
    pub fn from_table(durations: HashMap<String, TimeSec>) -> Self {
        Self { durations }
    }
}

#[async_trait(?Send)]
impl AssetProbe for StaticProbe {
    async fn probe_duration(&self, url: &str) -> Option<TimeSec> {
        self.durations.get(url).copied()
    }
}
