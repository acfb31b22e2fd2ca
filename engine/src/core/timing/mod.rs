//! Timing Module
//!
//! Timing intent types, the pure resolver functions, the load-time
//! resolution pipeline and the duration probe interface.

mod intent;
mod pipeline;
mod probe;
mod resolver;

pub use intent::*;
pub use pipeline::*;
pub use probe::*;
pub use resolver::*;
