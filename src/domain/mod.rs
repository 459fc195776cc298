mod client;
mod entry;
mod invoice;
mod ledger;
mod money;

pub use client::*;
pub use entry::*;
pub use invoice::*;
pub use ledger::*;
pub use money::*;
