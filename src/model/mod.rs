//! Domain records held by the sync core
//!
//! - **identity**: canonical identity keys and the `Entity` trait
//! - **token**: tracked assets
//! - **tweet**: social posts about a token
//! - **window**: trailing time windows and clocks

pub mod identity;
pub mod token;
pub mod tweet;
pub mod window;

pub use identity::{Entity, IdentityKey};
pub use token::{Token, TokenField};
pub use tweet::Tweet;
pub use window::{Clock, FixedClock, SystemClock, TrailingWindow};
