//! Edit Command System
//!
//! Every state change of an edit goes through a [`Command`] executed with a
//! [`CommandContext`] and recorded in the [`CommandHistory`].

mod clip;
mod context;
mod history;
mod selection;
mod text;
mod track;
mod traits;

pub use clip::*;
pub use context::*;
pub use history::*;
pub use selection::*;
pub use text::*;
pub use track::*;
pub use traits::*;
