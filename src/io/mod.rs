// Presentation boundary - files in and out of the store.

mod columns;
pub mod export;
pub mod import;

pub use columns::*;
pub use export::*;
pub use import::*;
