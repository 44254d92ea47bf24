//! # VFRAME Core
//!
//! Pooled object storage for a real-time 2D scene:
//! - Tank allocator: one arena of size-class fields, heap overflow counted
//! - Generational handles that never alias a destroyed object
//! - Transform hierarchy folded without allocation
//! - A scene lock with bounded waits
//!
//! ## Architecture Rules
//!
//! 1. **Objects hold handles, never references** - destroyed targets read as missing
//! 2. **Memory is pooled** - records live in tank fields sized at startup
//! 3. **Nothing waits forever** - lock waits and parent walks are bounded
//!
//! ## Example
//!
//! ```rust,ignore
//! use vframe_core::{ObjectStore, Transform};
//!
//! let mut store = ObjectStore::default();
//! let handle = store.insert(Transform::IDENTITY)?;
//! assert!(store.contains::<Transform>(handle));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod memory;
pub mod store;
pub mod sync;

pub use config::{
    AllocatorConfig, BufferConfig, HierarchyConfig, LockConfig, PhysicsConfig, SceneConfig,
};
pub use error::{SceneError, SceneResult};
pub use hierarchy::{children_of, set_parent, world_transform, WorldTransform};
pub use memory::{AllocError, Block, FreeStatus, TankAllocator, TankClass, TankStats};
pub use store::{
    Bound, Entity, Handle, Object, ObjectCounts, ObjectKind, ObjectStore, Particle, Physics,
    ShapeId, Stored, TextureId, Transform,
};
pub use sync::SceneLock;
