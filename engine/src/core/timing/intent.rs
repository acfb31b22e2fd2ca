//! Timing Intent and Resolved Timing
//!
//! A clip's authored timing may be symbolic: `start` can be `"auto"` (follow
//! the previous clip on the track) and `length` can be `"auto"` (probe the
//! media) or `"end"` (fill to the end of the edit). The intent is kept as
//! authored; resolution produces a separate [`ResolvedTiming`] in milliseconds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{is_valid_time, TimeMs, TimeSec};

const AUTO_KEYWORD: &str = "auto";
const END_KEYWORD: &str = "end";

/// Whole seconds serialize as integers so authored `"start": 2` survives a
/// load/save cycle unchanged.
fn seconds_value(sec: TimeSec) -> Value {
    if sec.fract() == 0.0 && sec >= 0.0 && sec <= u32::MAX as f64 {
        Value::from(sec as u64)
    } else {
        Value::from(sec)
    }
}

// =============================================================================
// Start Intent
// =============================================================================

/// Authored start of a clip
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum StartIntent {
    /// Starts where the previous clip on the track ends
    Auto,
    /// Starts at a fixed time in seconds
    Seconds(TimeSec),
}

impl StartIntent {
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Returns the fixed start in seconds, if any
    pub fn seconds(&self) -> Option<TimeSec> {
        match self {
            Self::Seconds(sec) => Some(*sec),
            Self::Auto => None,
        }
    }
}

impl TryFrom<Value> for StartIntent {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) if s == AUTO_KEYWORD => Ok(Self::Auto),
            Value::Number(n) => {
                let sec = n.as_f64().unwrap_or(f64::NAN);
                if is_valid_time(sec) {
                    Ok(Self::Seconds(sec))
                } else {
                    Err(format!("start must be a non-negative number, got {sec}"))
                }
            }
            other => Err(format!("start must be a number or \"auto\", got {other}")),
        }
    }
}

impl From<StartIntent> for Value {
    fn from(intent: StartIntent) -> Self {
        match intent {
            StartIntent::Auto => Value::String(AUTO_KEYWORD.to_string()),
            StartIntent::Seconds(sec) => seconds_value(sec),
        }
    }
}

// =============================================================================
// Length Intent
// =============================================================================

/// Authored length of a clip
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum LengthIntent {
    /// Length of the source media (minus trim), or a default
    Auto,
    /// Fills to the end of the edit
    End,
    /// Fixed length in seconds
    Seconds(TimeSec),
}

impl LengthIntent {
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns the fixed length in seconds, if any
    pub fn seconds(&self) -> Option<TimeSec> {
        match self {
            Self::Seconds(sec) => Some(*sec),
            Self::Auto | Self::End => None,
        }
    }
}

impl TryFrom<Value> for LengthIntent {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) if s == AUTO_KEYWORD => Ok(Self::Auto),
            Value::String(s) if s == END_KEYWORD => Ok(Self::End),
            Value::Number(n) => {
                let sec = n.as_f64().unwrap_or(f64::NAN);
                if is_valid_time(sec) {
                    Ok(Self::Seconds(sec))
                } else {
                    Err(format!("length must be a non-negative number, got {sec}"))
                }
            }
            other => Err(format!(
                "length must be a number, \"auto\" or \"end\", got {other}"
            )),
        }
    }
}

impl From<LengthIntent> for Value {
    fn from(intent: LengthIntent) -> Self {
        match intent {
            LengthIntent::Auto => Value::String(AUTO_KEYWORD.to_string()),
            LengthIntent::End => Value::String(END_KEYWORD.to_string()),
            LengthIntent::Seconds(sec) => seconds_value(sec),
        }
    }
}

// =============================================================================
// Timing Intent / Resolved Timing
// =============================================================================

/// The user's declarative timing request
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingIntent {
    pub start: StartIntent,
    pub length: LengthIntent,
}

impl TimingIntent {
    pub fn new(start: StartIntent, length: LengthIntent) -> Self {
        Self { start, length }
    }
}

/// Concrete timing used for playback and layout (milliseconds)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTiming {
    pub start: TimeMs,
    pub length: TimeMs,
}

impl ResolvedTiming {
    pub fn new(start: TimeMs, length: TimeMs) -> Self {
        Self { start, length }
    }

    /// Returns the end of the clip in milliseconds
    pub fn end(&self) -> TimeMs {
        self.start + self.length
    }

    /// Returns true if both fields are within `tolerance` of `other`
    pub fn approx_eq(&self, other: &ResolvedTiming, tolerance: TimeMs) -> bool {
        (self.start - other.start).abs() <= tolerance
            && (self.length - other.length).abs() <= tolerance
    }
}
