//! Timeline Module
//!
//! Edit document, track and clip configuration types.

mod models;

pub use models::*;
