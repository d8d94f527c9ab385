pub mod broadcast;
pub mod engine;
pub mod ledger;
pub mod returns;
pub mod session;
pub mod settlement;

pub use broadcast::{Audience, Envelope};
pub use engine::Engine;
pub use session::{Credentials, SessionState, SharedSecret};
