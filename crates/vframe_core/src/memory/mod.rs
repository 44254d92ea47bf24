//! # Memory Management
//!
//! Pooled storage for scene objects.
//!
//! ## Design Philosophy
//!
//! The arena is allocated once when the scene is built. During simulation:
//! - Object records are written into tank fields, not individual heap boxes
//! - Freed fields are zeroed by default before they can be reused
//! - Heap overflow is tolerated but always counted and reported

mod tank;

pub use tank::{
    default_layout, AllocError, Block, BlockOrigin, FreeStatus, TankAllocator, TankClass,
    TankStats, TankUsage, FIELD_ALIGN,
};
