//! Shotline Core Library
//!
//! Command-based edit engine for a browser video editor.
//! This library contains the timing resolver, the undoable command system
//! and the edit orchestrator that owns players, tracks and playback.
//!
//! Rendering, asset decoding and UI stay with the host, behind the
//! [`Player`](core::players::Player), [`AssetLoader`](core::players::AssetLoader),
//! [`AssetProbe`](core::timing::AssetProbe) and
//! [`SceneGraph`](core::scene::SceneGraph) traits.

pub mod core;

pub use crate::core::{edit::Edit, settings::EditSettings, timeline::EditDocument, CoreError, CoreResult};
