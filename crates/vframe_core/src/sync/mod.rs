//! # Synchronization
//!
//! The scene is shared between caller threads and the physics thread through
//! a single reader-writer lock with bounded waits.
//!
//! ## Rules
//!
//! - Every public scene operation runs under the lock
//! - The physics tick holds the lock exclusively from start to finish
//! - Callbacks run inside the tick and never see the lock

mod lock;

pub use lock::SceneLock;
