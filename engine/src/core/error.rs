//! Shotline Error Definitions
//!
//! Defines error types used throughout the engine.

use thiserror::Error;

use super::{PlayerId, TimeSec};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Timeline Errors
    // =========================================================================
    #[error("Track not found: {0}")]
    TrackNotFound(usize),

    #[error("Clip not found: track {track}, clip {clip}")]
    ClipNotFound { track: usize, clip: usize },

    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("Player already exists: {0}")]
    DuplicatePlayer(PlayerId),

    #[error("Invalid split point: {0} seconds")]
    InvalidSplitPoint(TimeSec),

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    // =========================================================================
    // Asset / Player Errors
    // =========================================================================
    #[error("Unsupported asset type: {0}")]
    UnsupportedAsset(String),

    #[error("Player construction failed: {0}")]
    PlayerConstruction(String),

    #[error("Asset load failed: {0}")]
    AssetLoadFailed(String),

    // =========================================================================
    // Command Errors
    // =========================================================================
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;
