//! # Object Store
//!
//! Handle-addressed storage for every scene object.
//!
//! ## Layout
//!
//! ```text
//!  Handle (u64)                 ObjectStore
//!  ┌──────┬──────┬────────┐     ┌───────────────────────────────┐
//!  │ kind │ gen  │ index  │ ──► │ transforms: ObjectBuffer<..>  │
//!  └──────┴──────┴────────┘     │ bounds:     ObjectBuffer<..>  │──► TankAllocator
//!                               │ particles:  ObjectBuffer<..>  │
//!                               │ entities:   ObjectBuffer<..>  │
//!                               └───────────────────────────────┘
//! ```

mod buffer;
mod handle;
mod object;
mod table;

pub use buffer::ObjectBuffer;
pub use handle::{Handle, ObjectKind, MAX_GENERATION};
pub use object::{Bound, Entity, Object, Particle, Physics, ShapeId, TextureId, Transform};
pub use table::{ObjectCounts, ObjectStore, Stored};
