//! Synchronized Stores
//!
//! One [`SyncedCollection`] per entity type is the single merge authority for
//! that type. A [`SyncSession`] wires a collection to the change feed and the
//! bulk loader and owns the subscription for as long as it lives.
//!
//! - **Collection**: merge rules, snapshots, notices
//! - **Policy**: per-entity admission and liveness rules
//! - **Session**: subscribe-then-load lifecycle

mod collection;
mod policy;
mod session;

pub use collection::{LoadState, MergeOutcome, Snapshot, StoreNotice, SyncedCollection};
pub use policy::{MergePolicy, TokenPolicy, TweetPolicy};
pub use session::{SyncError, SyncSession};
