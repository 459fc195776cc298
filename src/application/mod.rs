// Application layer - use cases and orchestration.
// Validation of user input happens here; the domain layer only does arithmetic.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
