//! Shotline Core Type Definitions
//!
//! Defines fundamental types used throughout the engine.

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// ID Types
// =============================================================================

/// Player (clip instance) unique identifier (ULID)
pub type PlayerId = String;

/// Track unique identifier (ULID)
pub type TrackId = String;

/// Operation unique identifier (ULID)
pub type OpId = String;

/// Event handler registration identifier
pub type HandlerId = u64;

/// Generates a fresh ULID string
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point). Used by authored clip configuration.
pub type TimeSec = f64;

/// Time in milliseconds (floating point). Used by resolved timing.
pub type TimeMs = f64;

/// Converts seconds to milliseconds
pub fn sec_to_ms(sec: TimeSec) -> TimeMs {
    sec * 1000.0
}

/// Converts milliseconds to seconds
pub fn ms_to_sec(ms: TimeMs) -> TimeSec {
    ms / 1000.0
}

/// Returns true when the value is usable as a timeline position or length
pub fn is_valid_time(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

// =============================================================================
// Spatial Types
// =============================================================================

/// 2D size
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size2D {
    pub width: u32,
    pub height: u32,
}

impl Size2D {
    /// Creates a new size, falling back to 1920x1080 for zero dimensions
    pub fn new(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            warn!(
                "Size2D created with zero dimension ({}x{}), defaulting to 1920x1080",
                width, height
            );
            return Self {
                width: 1920,
                height: 1080,
            };
        }
        Self { width, height }
    }
}

impl Default for Size2D {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}
