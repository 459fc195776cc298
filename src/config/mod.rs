//! Configuration
//!
//! Settings are read from an optional JSON file; command-line flags override them.

mod settings;

pub use settings::*;
