//! # Object Records
//!
//! Objects are plain data written into tank fields. They carry no pointers:
//! every cross-reference is a [`Handle`] and resolves through the store, so a
//! destroyed target reads as "not found" instead of dangling.

use bytemuck::{Pod, Zeroable};
use vframe_shared::{Color, Vector};

use super::handle::{Handle, ObjectKind};

/// Marker trait for storable objects.
///
/// Objects must be:
/// - `Pod`: written into and read from raw tank bytes
/// - at most 8-byte aligned, which the tank arena guarantees
///
/// # Example
///
/// ```rust,ignore
/// impl Object for Transform {
///     const KIND: ObjectKind = ObjectKind::Transform;
/// }
/// ```
pub trait Object: Pod + Send + Sync + 'static {
    /// Kind tag baked into every handle of this type.
    const KIND: ObjectKind;
}

/// Opaque shape id owned by the graphics backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct ShapeId(pub u32);

/// Opaque texture id owned by the graphics backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct TextureId(pub u32);

#[inline]
const fn flag(value: bool) -> u32 {
    value as u32
}

// =============================================================================
// TRANSFORM
// =============================================================================

/// Position, rotation (radians) and uniform scale, relative to an optional
/// parent transform.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Transform {
    /// Parent transform, or [`Handle::NULL`] for a root. Never owned.
    pub parent: Handle,
    /// Owning entity, or [`Handle::NULL`] for a free-standing transform.
    pub entity: Handle,
    /// Local position.
    pub position: Vector,
    /// Local rotation in radians.
    pub rotation: f32,
    /// Local uniform scale.
    pub scale: f32,
}

impl Object for Transform {
    const KIND: ObjectKind = ObjectKind::Transform;
}

impl Transform {
    /// Root transform at `position`, no rotation, unit scale.
    #[inline]
    #[must_use]
    pub const fn at(position: Vector) -> Self {
        Self::new(position, 0.0, 1.0)
    }

    /// Root transform with explicit rotation and scale.
    #[inline]
    #[must_use]
    pub const fn new(position: Vector, rotation: f32, scale: f32) -> Self {
        Self {
            parent: Handle::NULL,
            entity: Handle::NULL,
            position,
            rotation,
            scale,
        }
    }

    /// Identity transform parented to `parent`.
    #[inline]
    #[must_use]
    pub const fn child_of(parent: Handle) -> Self {
        Self {
            parent,
            ..Self::IDENTITY
        }
    }

    /// Identity transform.
    pub const IDENTITY: Self = Self::new(Vector::ZERO, 0.0, 1.0);
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// =============================================================================
// BOUND
// =============================================================================

/// Axis-aligned collision rectangle attached to a transform.
///
/// World rectangle = body's world position + `position`, extent `dimensions`.
/// The body's rotation and scale do not affect the rectangle.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Bound {
    /// Transform the bound follows. Never owned.
    pub body: Handle,
    /// Owning entity, or [`Handle::NULL`] for a free-standing bound.
    pub entity: Handle,
    /// Offset from the body's world position.
    pub position: Vector,
    /// Width and height.
    pub dimensions: Vector,
    active: u32,
    _padding: u32,
}

impl Object for Bound {
    const KIND: ObjectKind = ObjectKind::Bound;
}

impl Bound {
    /// Unit bound with no offset.
    #[inline]
    #[must_use]
    pub const fn on(body: Handle) -> Self {
        Self::new(body, Vector::ZERO, Vector::new(1.0, 1.0))
    }

    /// Bound with explicit offset and dimensions.
    #[inline]
    #[must_use]
    pub const fn new(body: Handle, position: Vector, dimensions: Vector) -> Self {
        Self {
            body,
            entity: Handle::NULL,
            position,
            dimensions,
            active: 1,
            _padding: 0,
        }
    }

    /// Whether the bound takes part in collision.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active != 0
    }

    /// Enables or disables collision for this bound.
    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = flag(active);
    }
}

// =============================================================================
// PARTICLE
// =============================================================================

/// Visual-only object following a transform.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Transform the particle is drawn at. Never owned.
    pub transform: Handle,
    /// Color multiplied into the texture.
    pub bias: Color,
    /// Backend shape.
    pub shape: ShapeId,
    /// Backend texture.
    pub texture: TextureId,
    /// Draw order, lower first.
    pub layer: i32,
    active: u32,
}

impl Object for Particle {
    const KIND: ObjectKind = ObjectKind::Particle;
}

impl Particle {
    /// Particle with default visuals on layer 0.
    #[inline]
    #[must_use]
    pub const fn on(transform: Handle) -> Self {
        Self::new(transform, TextureId(0), ShapeId(0), 0)
    }

    /// Particle with explicit visuals.
    #[inline]
    #[must_use]
    pub const fn new(transform: Handle, texture: TextureId, shape: ShapeId, layer: i32) -> Self {
        Self {
            transform,
            bias: Color::WHITE,
            shape,
            texture,
            layer,
            active: 1,
        }
    }

    /// Whether the particle is drawn.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active != 0
    }

    /// Shows or hides the particle.
    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = flag(active);
    }
}

// =============================================================================
// PHYSICS
// =============================================================================

/// Physics block, stored by value inside an [`Entity`].
///
/// A non-moveable body behaves as if its mass were infinite.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Physics {
    active: u32,
    moveable: u32,
    rotation_lock: u32,
    /// Fraction of approach speed kept after a collision (0 = dead stop).
    pub bounciness: f32,
    /// Fraction of velocity removed per tick, 0..=1.
    pub drag: f32,
    /// Mass, must be positive for moveable bodies.
    pub mass: f32,
    /// Linear velocity, units per second.
    pub velocity: Vector,
    /// Angular velocity, radians per second.
    pub torque: f32,
    _padding: u32,
}

impl Physics {
    /// Active, moveable body free to rotate.
    #[inline]
    #[must_use]
    pub const fn new(bounciness: f32, drag: f32, mass: f32) -> Self {
        Self::with_flags(bounciness, drag, mass, true, false)
    }

    /// Active body with explicit movement flags.
    #[inline]
    #[must_use]
    pub const fn with_flags(
        bounciness: f32,
        drag: f32,
        mass: f32,
        moveable: bool,
        rotation_lock: bool,
    ) -> Self {
        Self {
            active: 1,
            moveable: flag(moveable),
            rotation_lock: flag(rotation_lock),
            bounciness,
            drag,
            mass,
            velocity: Vector::ZERO,
            torque: 0.0,
            _padding: 0,
        }
    }

    /// Immovable obstacle.
    #[inline]
    #[must_use]
    pub const fn fixed() -> Self {
        Self::with_flags(0.0, 0.0, 1.0, false, true)
    }

    /// Whether the physics block participates in the tick.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active != 0
    }

    /// Whether velocity and pushback move the body.
    #[inline]
    #[must_use]
    pub const fn is_moveable(&self) -> bool {
        self.moveable != 0
    }

    /// Whether angular velocity is ignored.
    #[inline]
    #[must_use]
    pub const fn is_rotation_locked(&self) -> bool {
        self.rotation_lock != 0
    }

    /// Toggles participation in the tick.
    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = flag(active);
    }

    /// Toggles movement.
    #[inline]
    pub fn set_moveable(&mut self, moveable: bool) {
        self.moveable = flag(moveable);
    }

    /// Toggles rotation lock.
    #[inline]
    pub fn set_rotation_lock(&mut self, locked: bool) {
        self.rotation_lock = flag(locked);
    }

    /// Whether the mass is usable for a moveable body.
    #[inline]
    #[must_use]
    pub fn has_valid_mass(&self) -> bool {
        self.mass > 0.0 && self.mass.is_finite()
    }

    /// Inverse mass; zero for non-moveable or invalid-mass bodies.
    #[inline]
    #[must_use]
    pub fn inverse_mass(&self) -> f32 {
        if self.is_active() && self.is_moveable() && self.has_valid_mass() {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Adds `impulse / mass` to the velocity. No effect on immovable bodies.
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vector) {
        let inverse = self.inverse_mass();
        self.velocity += impulse * inverse;
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Physics-enabled composite: owns its transform and bound.
///
/// Callbacks are not part of the record; they are registered on the scene and
/// keyed by the entity handle.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Entity {
    /// Owned transform.
    pub transform: Handle,
    /// Owned bound.
    pub bound: Handle,
    /// Physics state.
    pub physics: Physics,
    /// Backend shape.
    pub shape: ShapeId,
    /// Backend texture.
    pub texture: TextureId,
    /// Draw order, lower first.
    pub layer: i32,
    active: u32,
    /// Color multiplied into the texture.
    pub bias: Color,
}

impl Object for Entity {
    const KIND: ObjectKind = ObjectKind::Entity;
}

impl Entity {
    /// Entity record over already-created transform and bound.
    #[inline]
    #[must_use]
    pub const fn new(
        transform: Handle,
        bound: Handle,
        physics: Physics,
        shape: ShapeId,
        texture: TextureId,
        layer: i32,
    ) -> Self {
        Self {
            transform,
            bound,
            physics,
            shape,
            texture,
            layer,
            active: 1,
            bias: Color::WHITE,
        }
    }

    /// Whether the entity is simulated and drawn.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active != 0
    }

    /// Enables or disables the entity.
    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = flag(active);
    }
}
