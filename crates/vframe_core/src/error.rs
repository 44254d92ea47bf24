//! # Scene Error Types
//!
//! Failures surfaced to callers. Hierarchy depth overruns and invalid masses
//! are not here: they are recovered in place and only logged and counted.

use thiserror::Error;

use crate::memory::{AllocError, Block};
use crate::store::Handle;

/// Errors that can occur in scene operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Neither the tank arena nor the heap could serve an allocation.
    #[error("allocation of {size} bytes exhausted both the tank arena and the heap")]
    AllocationExhausted {
        /// Bytes requested.
        size: usize,
    },

    /// The handle is stale, null, malformed or of the wrong kind.
    #[error("handle {0} does not resolve to a live object")]
    InvalidHandle(Handle),

    /// A raw block was freed twice or never came from this scene.
    #[error("block {0:?} is not currently allocated")]
    UnknownBlock(Block),

    /// The scene lock was not acquired within the bounded wait.
    #[error("scene lock not acquired within {waited_ms} ms, try again")]
    LockTimeout {
        /// Milliseconds waited.
        waited_ms: u64,
    },

    /// The object belongs to a live entity and only goes away with it.
    #[error("{handle} is owned by entity {entity}, destroy the entity instead")]
    OwnedByEntity {
        /// Transform or bound that was targeted.
        handle: Handle,
        /// Owning entity.
        entity: Handle,
    },

    /// Parenting would close a loop in the transform hierarchy.
    #[error("parenting {child} under {parent} would create a cycle")]
    CyclicParent {
        /// Transform being re-parented.
        child: Handle,
        /// Requested parent.
        parent: Handle,
    },

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<AllocError> for SceneError {
    fn from(error: AllocError) -> Self {
        match error {
            AllocError::ZeroSize => Self::AllocationExhausted { size: 0 },
            AllocError::Exhausted { size } => Self::AllocationExhausted { size },
            AllocError::UnknownBlock(block) => Self::UnknownBlock(block),
        }
    }
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
