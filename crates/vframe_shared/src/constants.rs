//! # Scene Defaults
//!
//! Default sizing and cadence values. Every one of these can be overridden
//! through `SceneConfig`; they only seed `Default`.

// =============================================================================
// OBJECT BUFFERS
// =============================================================================

/// Initial slot count of every object buffer.
pub const BUFFER_SIZE_INIT: usize = 0x60;

/// Number of slots added when an object buffer runs out of free slots.
pub const BUFFER_SIZE_INCREMENT: usize = 0x30;

// =============================================================================
// HIERARCHY
// =============================================================================

/// Maximum number of parent links followed before a chain is cut short.
pub const PARENT_SEARCH_THRESHOLD: usize = 0x20;

/// Maximum number of children reported by a single children query.
pub const MAX_CHILDREN: usize = 0x10;

// =============================================================================
// PHYSICS
// =============================================================================

/// Physics ticks per second.
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Largest displacement a single collision may apply to one body.
pub const DEFAULT_MAX_PUSHBACK: f32 = 4.0;

/// Angular velocity below which rotation snaps to rest.
pub const DEFAULT_MIN_VELOCITY: f32 = 0.001;

/// Angular velocity magnitude cap (radians per second).
pub const DEFAULT_MAX_ANGULAR_VELOCITY: f32 = 32.0;

// =============================================================================
// CONCURRENCY
// =============================================================================

/// Bounded wait on the scene lock, in milliseconds.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 250;
