//! # VFRAME
//!
//! Real-time 2D scene kernel: pooled object storage, a transform hierarchy,
//! a fixed-step physics thread and read-only render passes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              VFRAME                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐   │
//! │  │   vframe_core   │     │   Scene         │     │   Renderer      │   │
//! │  │                 │────>│                 │────>│                 │   │
//! │  │  • Tanks        │     │  • Create/Query │     │  • Particles    │   │
//! │  │  • Handles      │     │  • Hierarchy    │     │  • Entities     │   │
//! │  │  • Hierarchy    │     │  • Callbacks    │     │  • Bounds       │   │
//! │  │  • SceneLock    │     │  • Physics tick │     │                 │   │
//! │  └─────────────────┘     └────────┬────────┘     └─────────────────┘   │
//! │                                   │                                     │
//! │                          ┌────────┴────────┐                            │
//! │                          │   Simulation    │                            │
//! │                          │  • Scene lock   │                            │
//! │                          │  • Tick thread  │                            │
//! │                          └─────────────────┘                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `scene`: Object lifecycle, queries, hierarchy and callback registration
//! - `physics`: Drag, integration, collision and the per-tick step
//! - `callback`: Callback types and the scope they run in
//! - `render`: Draw passes over a [`GraphicsBackend`]
//! - `simulation`: Shared scene plus the physics thread
//! - `tick_loop`: Fixed-timestep cadence

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod callback;
pub mod physics;
pub mod render;
pub mod scene;
pub mod simulation;
pub mod tick_loop;

pub use vframe_core as core;
pub use vframe_shared as shared;

pub use callback::{CallbackScope, CollisionFn, DeferredFn, UpdateFn};
pub use physics::{BodyState, Contact, Resolution, StepReport};
pub use render::{GraphicsBackend, RenderStats, Renderer, Sprite};
pub use scene::{EntityDesc, Scene, SceneStats};
pub use simulation::Simulation;
pub use tick_loop::{TickLoop, TickStats, MAX_CATCH_UP_TICKS};

pub use vframe_core::{
    Block, Bound, Entity, Handle, ObjectCounts, ObjectKind, Particle, Physics, SceneConfig,
    SceneError, SceneResult, ShapeId, TextureId, Transform, WorldTransform,
};
pub use vframe_shared::{Color, Rect, Vector};
