//! Shotline Core Engine
//!
//! Core editing engine module.
//! Handles timing resolution, the command system, players and the edit
//! orchestrator.

pub mod commands;
pub mod edit;
pub mod events;
pub mod players;
pub mod scene;
pub mod settings;
pub mod timeline;
pub mod timing;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod tests_scenarios;
