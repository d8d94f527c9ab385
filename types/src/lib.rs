//! Common types used throughout yieldroom.

pub mod api;
mod constants;
mod ledger;
mod session;

pub use constants::*;
pub use ledger::*;
pub use session::*;
