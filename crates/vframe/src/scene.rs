//! # Scene
//!
//! The explicit context every operation goes through. A scene owns:
//! - The object store (tank allocator + one buffer per object type)
//! - The registered entity callbacks
//! - The deferred queue filled by callbacks during a tick
//! - Anomaly counters
//!
//! A scene is single-threaded by itself; share it through
//! [`Simulation`](crate::Simulation), which wraps it in the scene lock.
//!
//! ## Ownership
//!
//! ```text
//!   Entity ──owns──► Transform ◄──weak── Particle
//!     │                 ▲  ▲
//!     └──owns──► Bound ─┘  └──weak── child Transform (parent link)
//! ```
//!
//! Destroying an entity destroys its transform and bound. Every other link is
//! weak and simply stops resolving once its target is gone.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use vframe_core::{
    children_of, set_parent, world_transform, Block, Bound, Entity, FreeStatus, Handle,
    ObjectCounts, ObjectStore, Particle, Physics, SceneConfig, SceneError, SceneResult, ShapeId,
    Stored, TankStats, TextureId, Transform, WorldTransform,
};
use vframe_shared::{Color, Rect, Vector};

use crate::callback::{CallbackScope, CallbackTable, Deferred};
use crate::physics::StepScratch;

/// Everything needed to create an entity with its transform and bound.
///
/// # Example
///
/// ```rust,ignore
/// let ball = scene.create_entity(
///     EntityDesc::new(Physics::new(0.8, 0.01, 1.0))
///         .at(Vector::new(10.0, 0.0))
///         .with_bound(Vector::new(-0.5, -0.5), Vector::new(1.0, 1.0))
///         .with_visuals(ShapeId(1), TextureId(4), 2),
/// )?;
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityDesc {
    /// Initial local position.
    pub position: Vector,
    /// Initial local rotation in radians.
    pub rotation: f32,
    /// Initial uniform scale.
    pub scale: f32,
    /// Parent of the entity transform, or [`Handle::NULL`].
    pub parent: Handle,
    /// Physics block.
    pub physics: Physics,
    /// Bound offset from the transform.
    pub bound_offset: Vector,
    /// Bound width and height.
    pub bound_dimensions: Vector,
    /// Backend shape.
    pub shape: ShapeId,
    /// Backend texture.
    pub texture: TextureId,
    /// Draw layer.
    pub layer: i32,
}

impl EntityDesc {
    /// Entity at the origin with a unit bound.
    #[must_use]
    pub const fn new(physics: Physics) -> Self {
        Self {
            position: Vector::ZERO,
            rotation: 0.0,
            scale: 1.0,
            parent: Handle::NULL,
            physics,
            bound_offset: Vector::ZERO,
            bound_dimensions: Vector::new(1.0, 1.0),
            shape: ShapeId(0),
            texture: TextureId(0),
            layer: 0,
        }
    }

    /// Sets the initial position.
    #[must_use]
    pub const fn at(mut self, position: Vector) -> Self {
        self.position = position;
        self
    }

    /// Parents the entity transform.
    #[must_use]
    pub const fn child_of(mut self, parent: Handle) -> Self {
        self.parent = parent;
        self
    }

    /// Sets the bound offset and dimensions.
    #[must_use]
    pub const fn with_bound(mut self, offset: Vector, dimensions: Vector) -> Self {
        self.bound_offset = offset;
        self.bound_dimensions = dimensions;
        self
    }

    /// Sets shape, texture and layer.
    #[must_use]
    pub const fn with_visuals(mut self, shape: ShapeId, texture: TextureId, layer: i32) -> Self {
        self.shape = shape;
        self.texture = texture;
        self.layer = layer;
        self
    }
}

impl Default for EntityDesc {
    fn default() -> Self {
        Self::new(Physics::default())
    }
}

/// Snapshot of scene counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Live objects per kind.
    pub counts: ObjectCounts,
    /// Allocator counters.
    pub allocator: TankStats,
    /// Entities with at least one callback.
    pub callbacks: usize,
    /// World-transform walks cut at the parent-search threshold.
    pub hierarchy_truncations: u64,
    /// Body-ticks skipped because a moveable body had no usable mass.
    pub invalid_mass: u64,
    /// Overlapping pairs resolved since creation.
    pub collisions: u64,
    /// Physics ticks run.
    pub ticks: u64,
    /// Whether the physics tick is enabled.
    pub physics_enabled: bool,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub(crate) truncations: AtomicU64,
    pub(crate) invalid_mass: u64,
    pub(crate) collisions: u64,
    pub(crate) ticks: u64,
}

/// The scene context.
pub struct Scene {
    pub(crate) store: ObjectStore,
    pub(crate) config: SceneConfig,
    pub(crate) callbacks: CallbackTable,
    /// Accessed through `get_mut` only.
    pub(crate) deferred: Mutex<Vec<Deferred>>,
    pub(crate) physics_enabled: bool,
    pub(crate) counters: Counters,
    pub(crate) scratch: StepScratch,
}

impl Scene {
    /// Builds an empty scene.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: SceneConfig) -> SceneResult<Self> {
        config.validate()?;
        let store = ObjectStore::new(
            config.buffers,
            &config.allocator.tanks,
            config.allocator.overflow_budget,
        );
        tracing::debug!(
            arena_bytes = store.tanks().arena_bytes(),
            tick_rate = config.physics.tick_rate,
            "scene created"
        );

        Ok(Self {
            store,
            config,
            callbacks: CallbackTable::default(),
            deferred: Mutex::new(Vec::new()),
            physics_enabled: true,
            counters: Counters::default(),
            scratch: StepScratch::default(),
        })
    }

    /// Configuration the scene was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Stores a transform. Build it with [`Transform::at`], [`Transform::new`]
    /// or [`Transform::child_of`].
    ///
    /// # Errors
    ///
    /// - [`SceneError::InvalidHandle`] if the parent is set but not live
    /// - [`SceneError::AllocationExhausted`] if memory ran out
    pub fn create_transform(&mut self, transform: Transform) -> SceneResult<Handle> {
        self.expect_live_or_null::<Transform>(transform.parent)?;
        self.store.insert(transform)
    }

    /// Stores a bound. Build it with [`Bound::on`] or [`Bound::new`].
    ///
    /// # Errors
    ///
    /// - [`SceneError::InvalidHandle`] if the body transform is not live
    /// - [`SceneError::AllocationExhausted`] if memory ran out
    pub fn create_bound(&mut self, bound: Bound) -> SceneResult<Handle> {
        self.store.get::<Transform>(bound.body)?;
        self.expect_live_or_null::<Entity>(bound.entity)?;
        self.store.insert(bound)
    }

    /// Stores a particle. Build it with [`Particle::on`] or [`Particle::new`].
    ///
    /// # Errors
    ///
    /// - [`SceneError::InvalidHandle`] if the particle transform is not live
    /// - [`SceneError::AllocationExhausted`] if memory ran out
    pub fn create_particle(&mut self, particle: Particle) -> SceneResult<Handle> {
        self.store.get::<Transform>(particle.transform)?;
        self.store.insert(particle)
    }

    /// Creates an entity together with the transform and bound it owns.
    ///
    /// Nothing is left behind if any of the three allocations fails.
    ///
    /// # Errors
    ///
    /// - [`SceneError::InvalidHandle`] if `desc.parent` is set but not live
    /// - [`SceneError::AllocationExhausted`] if memory ran out
    pub fn create_entity(&mut self, desc: EntityDesc) -> SceneResult<Handle> {
        let mut transform = Transform::new(desc.position, desc.rotation, desc.scale);
        transform.parent = desc.parent;
        let transform = self.create_transform(transform)?;

        let bound = Bound::new(transform, desc.bound_offset, desc.bound_dimensions);
        let bound = match self.store.insert(bound) {
            Ok(bound) => bound,
            Err(error) => {
                self.store.remove::<Transform>(transform, true);
                return Err(error);
            }
        };

        let entity = Entity::new(
            transform,
            bound,
            desc.physics,
            desc.shape,
            desc.texture,
            desc.layer,
        );
        let entity = match self.store.insert(entity) {
            Ok(entity) => entity,
            Err(error) => {
                self.store.remove::<Bound>(bound, true);
                self.store.remove::<Transform>(transform, true);
                return Err(error);
            }
        };

        self.store.get_mut::<Bound>(bound)?.entity = entity;
        self.store.get_mut::<Transform>(transform)?.entity = entity;
        Ok(entity)
    }

    // =========================================================================
    // Destruction
    // =========================================================================

    /// Destroys any object, zeroing its memory. Entities take their transform,
    /// bound and callbacks with them.
    ///
    /// # Errors
    ///
    /// - [`SceneError::InvalidHandle`] if the handle is stale or null
    /// - [`SceneError::OwnedByEntity`] for the transform or bound of a live
    ///   entity
    pub fn destroy(&mut self, handle: Handle) -> SceneResult<()> {
        self.destroy_with(handle, true)
    }

    /// Like [`destroy`](Self::destroy), but leaves the old bytes in the freed
    /// fields.
    ///
    /// # Errors
    ///
    /// Same as [`destroy`](Self::destroy).
    pub fn destroy_unzeroed(&mut self, handle: Handle) -> SceneResult<()> {
        self.destroy_with(handle, false)
    }

    fn destroy_with(&mut self, handle: Handle, zero: bool) -> SceneResult<()> {
        self.store.destroy(handle, zero)?;
        self.callbacks.remove(handle);
        Ok(())
    }

    /// Destroys every object and drops every callback.
    pub fn clear(&mut self) {
        self.store.clear(true);
        self.callbacks.clear();
        self.deferred.get_mut().clear();
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Reads an object.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] for stale, null or wrong-typed handles.
    #[inline]
    pub fn get<T: Stored>(&self, handle: Handle) -> SceneResult<&T> {
        self.store.get(handle)
    }

    /// Writes an object in place.
    ///
    /// Changing an entity's `transform` or `bound` handle, or a bound's
    /// `entity` back-link, breaks ownership tracking; edit values, not links.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] for stale, null or wrong-typed handles.
    #[inline]
    pub fn get_mut<T: Stored>(&mut self, handle: Handle) -> SceneResult<&mut T> {
        self.store.get_mut(handle)
    }

    /// Whether `handle` is a live `T`.
    #[inline]
    #[must_use]
    pub fn contains<T: Stored>(&self, handle: Handle) -> bool {
        self.store.contains::<T>(handle)
    }

    /// Whether `handle` resolves to any live object.
    #[inline]
    #[must_use]
    pub fn is_live(&self, handle: Handle) -> bool {
        self.store.is_live(handle)
    }

    /// Handle of the live `T` in buffer slot `slot`.
    #[inline]
    #[must_use]
    pub fn handle_at<T: Stored>(&self, slot: usize) -> Option<Handle> {
        self.store.handle_at::<T>(slot)
    }

    /// Number of live `T`.
    #[inline]
    #[must_use]
    pub fn count<T: Stored>(&self) -> usize {
        self.store.count::<T>()
    }

    /// Live counts for every kind.
    #[inline]
    #[must_use]
    pub fn counts(&self) -> ObjectCounts {
        self.store.counts()
    }

    /// Iterates over every live `T`.
    pub fn iter<T: Stored>(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.store.iter::<T>()
    }

    // =========================================================================
    // Bulk copy-out
    // =========================================================================

    /// Copies live `T` into `out`, in slot order, until `out` is full.
    /// Returns the number copied.
    pub fn copy_out<T: Stored>(&self, out: &mut [T]) -> usize {
        self.copy_field(out, |object: &T| *object)
    }

    /// Copies one field of each live `T` into `out`, in slot order, until `out`
    /// is full. Returns the number copied.
    ///
    /// ```rust,ignore
    /// let mut layers = [0_i32; 64];
    /// let n = scene.copy_field(&mut layers, |p: &Particle| p.layer);
    /// ```
    pub fn copy_field<T, F, R>(&self, out: &mut [R], field: F) -> usize
    where
        T: Stored,
        F: Fn(&T) -> R,
    {
        let mut written = 0;
        for (slot, (_, object)) in out.iter_mut().zip(self.store.iter::<T>()) {
            *slot = field(object);
            written += 1;
        }
        written
    }

    // =========================================================================
    // Raw pooled memory
    // =========================================================================

    /// Allocates `size` zeroed bytes from the scene tanks.
    ///
    /// # Errors
    ///
    /// [`SceneError::AllocationExhausted`] if memory ran out or `size` is zero.
    pub fn allocate_raw(&mut self, size: usize) -> SceneResult<Block> {
        self.store.allocate_raw(size, true)
    }

    /// Allocates `size` bytes with unspecified contents.
    ///
    /// # Errors
    ///
    /// [`SceneError::AllocationExhausted`] if memory ran out or `size` is zero.
    pub fn allocate_raw_unzeroed(&mut self, size: usize) -> SceneResult<Block> {
        self.store.allocate_raw(size, false)
    }

    /// Frees a raw block, zeroing it.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownBlock`] if the block is not currently allocated.
    pub fn free_raw(&mut self, block: Block) -> SceneResult<FreeStatus> {
        self.store.free_raw(block, true)
    }

    /// Frees a raw block without zeroing it.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownBlock`] if the block is not currently allocated.
    pub fn free_raw_unzeroed(&mut self, block: Block) -> SceneResult<FreeStatus> {
        self.store.free_raw(block, false)
    }

    /// Bytes of a raw block.
    #[must_use]
    pub fn raw_bytes(&self, block: Block) -> Option<&[u8]> {
        self.store.raw_bytes(block)
    }

    /// Mutable bytes of a raw block.
    pub fn raw_bytes_mut(&mut self, block: Block) -> Option<&mut [u8]> {
        self.store.raw_bytes_mut(block)
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// World position, rotation and scale of a transform.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `transform` is not live.
    pub fn world_transform(&self, transform: Handle) -> SceneResult<WorldTransform> {
        let world = world_transform(
            &self.store,
            transform,
            self.config.hierarchy.parent_search_threshold,
        )?;
        if world.truncated {
            self.counters.truncations.fetch_add(1, Ordering::Relaxed);
        }
        Ok(world)
    }

    /// World position of a transform.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `transform` is not live.
    pub fn world_position(&self, transform: Handle) -> SceneResult<Vector> {
        self.world_transform(transform).map(|world| world.position)
    }

    /// World rotation of a transform, in radians.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `transform` is not live.
    pub fn world_rotation(&self, transform: Handle) -> SceneResult<f32> {
        self.world_transform(transform).map(|world| world.rotation)
    }

    /// World scale of a transform.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `transform` is not live.
    pub fn world_scale(&self, transform: Handle) -> SceneResult<f32> {
        self.world_transform(transform).map(|world| world.scale)
    }

    /// World rectangle of a bound.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if the bound or its body is not live.
    pub fn bound_rect(&self, bound: Handle) -> SceneResult<Rect> {
        let record = self.store.get::<Bound>(bound)?;
        let body = self.world_transform(record.body)?;
        Ok(Rect::new(body.position + record.position, record.dimensions))
    }

    /// Links `child` under `parent`.
    ///
    /// # Errors
    ///
    /// - [`SceneError::InvalidHandle`] if either transform is not live
    /// - [`SceneError::CyclicParent`] if `child` is an ancestor of `parent`
    pub fn set_parent(&mut self, child: Handle, parent: Handle) -> SceneResult<()> {
        if parent.is_null() {
            return Err(SceneError::InvalidHandle(parent));
        }
        set_parent(
            &mut self.store,
            child,
            parent,
            self.config.hierarchy.parent_search_threshold,
        )
    }

    /// Makes `child` a root.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `child` is not live.
    pub fn clear_parent(&mut self, child: Handle) -> SceneResult<()> {
        set_parent(&mut self.store, child, Handle::NULL, 0)
    }

    /// Writes up to `max_children` direct children of `parent` into `out`.
    pub fn children_of(&self, parent: Handle, out: &mut Vec<Handle>) -> usize {
        children_of(&self.store, parent, self.config.hierarchy.max_children, out)
    }

    // =========================================================================
    // Entity and particle accessors
    // =========================================================================

    /// Sets an entity's linear velocity.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `entity` is not live.
    pub fn set_velocity(&mut self, entity: Handle, velocity: Vector) -> SceneResult<()> {
        self.store.get_mut::<Entity>(entity)?.physics.velocity = velocity;
        Ok(())
    }

    /// Sets an entity's angular velocity, in radians per second.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `entity` is not live.
    pub fn set_torque(&mut self, entity: Handle, torque: f32) -> SceneResult<()> {
        self.store.get_mut::<Entity>(entity)?.physics.torque = torque;
        Ok(())
    }

    /// Adds `impulse / mass` to an entity's velocity.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `entity` is not live.
    pub fn apply_impulse(&mut self, entity: Handle, impulse: Vector) -> SceneResult<()> {
        self.store
            .get_mut::<Entity>(entity)?
            .physics
            .apply_impulse(impulse);
        Ok(())
    }

    /// Includes or excludes an entity from integration and resolution.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `entity` is not live.
    pub fn set_physics_active(&mut self, entity: Handle, active: bool) -> SceneResult<()> {
        self.store
            .get_mut::<Entity>(entity)?
            .physics
            .set_active(active);
        Ok(())
    }

    /// Sets a particle's color bias.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `particle` is not live.
    pub fn set_particle_bias(&mut self, particle: Handle, bias: Color) -> SceneResult<()> {
        self.store.get_mut::<Particle>(particle)?.bias = bias;
        Ok(())
    }

    /// Moves a particle to another draw layer.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `particle` is not live.
    pub fn set_particle_layer(&mut self, particle: Handle, layer: i32) -> SceneResult<()> {
        self.store.get_mut::<Particle>(particle)?.layer = layer;
        Ok(())
    }

    // =========================================================================
    // Callbacks and physics control
    // =========================================================================

    /// Registers the collision callback of an entity, replacing any previous
    /// one. Called as `(scope, self, other)` once per overlapping pair per tick.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `entity` is not live.
    pub fn set_collision_callback<F>(&mut self, entity: Handle, callback: F) -> SceneResult<()>
    where
        F: Fn(&mut CallbackScope<'_>, Handle, Handle) + Send + Sync + 'static,
    {
        self.store.get::<Entity>(entity)?;
        self.callbacks
            .set_collision(entity, Some(std::sync::Arc::new(callback)));
        Ok(())
    }

    /// Registers the update callback of an entity, replacing any previous one.
    /// Called once per tick after collisions are resolved.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] if `entity` is not live.
    pub fn set_update_callback<F>(&mut self, entity: Handle, callback: F) -> SceneResult<()>
    where
        F: Fn(&mut CallbackScope<'_>, Handle) + Send + Sync + 'static,
    {
        self.store.get::<Entity>(entity)?;
        self.callbacks
            .set_update(entity, Some(std::sync::Arc::new(callback)));
        Ok(())
    }

    /// Removes both callbacks of an entity.
    pub fn clear_callbacks(&mut self, entity: Handle) {
        self.callbacks.remove(entity);
    }

    /// Pauses or resumes the physics tick. Object state is untouched.
    pub fn set_physics_enabled(&mut self, enabled: bool) {
        if self.physics_enabled != enabled {
            tracing::info!(enabled, "physics toggled");
        }
        self.physics_enabled = enabled;
    }

    /// Whether the physics tick runs.
    #[inline]
    #[must_use]
    pub const fn physics_enabled(&self) -> bool {
        self.physics_enabled
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> SceneStats {
        SceneStats {
            counts: self.store.counts(),
            allocator: self.store.tanks().stats(),
            callbacks: self.callbacks.len(),
            hierarchy_truncations: self.counters.truncations.load(Ordering::Relaxed),
            invalid_mass: self.counters.invalid_mass,
            collisions: self.counters.collisions,
            ticks: self.counters.ticks,
            physics_enabled: self.physics_enabled,
        }
    }

    fn expect_live_or_null<T: Stored>(&self, handle: Handle) -> SceneResult<()> {
        if handle.is_null() || self.store.contains::<T>(handle) {
            Ok(())
        } else {
            Err(SceneError::InvalidHandle(handle))
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            store: ObjectStore::default(),
            config: SceneConfig::default(),
            callbacks: CallbackTable::default(),
            deferred: Mutex::new(Vec::new()),
            physics_enabled: true,
            counters: Counters::default(),
            scratch: StepScratch::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(scene: &mut Scene, x: f32) -> Handle {
        scene
            .create_entity(EntityDesc::new(Physics::new(0.0, 0.0, 1.0)).at(Vector::new(x, 0.0)))
            .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SceneConfig::default();
        config.physics.tick_rate = 0;
        assert!(matches!(Scene::new(config), Err(SceneError::InvalidConfig(_))));
    }

    #[test]
    fn test_entity_owns_transform_and_bound() {
        let mut scene = Scene::default();
        let entity = ball(&mut scene, 0.0);
        let record = *scene.get::<Entity>(entity).unwrap();
        assert_eq!(scene.get::<Bound>(record.bound).unwrap().entity, entity);
        assert_eq!(scene.get::<Bound>(record.bound).unwrap().body, record.transform);

        scene.set_update_callback(entity, |_, _| {}).unwrap();
        scene.destroy(entity).unwrap();
        assert_eq!(scene.counts(), ObjectCounts::default());
        assert_eq!(scene.stats().callbacks, 0);
        assert!(!scene.is_live(record.transform));
    }

    #[test]
    fn test_owned_parts_only_die_with_entity() {
        let mut scene = Scene::default();
        let entity = ball(&mut scene, 0.0);
        let record = *scene.get::<Entity>(entity).unwrap();

        assert_eq!(
            scene.destroy(record.transform),
            Err(SceneError::OwnedByEntity {
                handle: record.transform,
                entity
            })
        );
        assert!(matches!(
            scene.destroy_unzeroed(record.bound),
            Err(SceneError::OwnedByEntity { .. })
        ));
        assert!(scene.is_live(entity));
        assert!(scene.world_position(record.transform).is_ok());

        scene.destroy(entity).unwrap();
        assert_eq!(scene.counts(), ObjectCounts::default());
    }

    #[test]
    fn test_create_rejects_dead_references() {
        let mut scene = Scene::default();
        let transform = scene.create_transform(Transform::IDENTITY).unwrap();
        scene.destroy(transform).unwrap();

        assert_eq!(
            scene.create_particle(Particle::on(transform)),
            Err(SceneError::InvalidHandle(transform))
        );
        assert_eq!(
            scene.create_bound(Bound::on(transform)),
            Err(SceneError::InvalidHandle(transform))
        );
        assert_eq!(
            scene.create_transform(Transform::child_of(transform)),
            Err(SceneError::InvalidHandle(transform))
        );
        assert_eq!(scene.counts(), ObjectCounts::default());
    }

    #[test]
    fn test_copy_out_stops_at_buffer_length() {
        let mut scene = Scene::default();
        for i in 0..5 {
            scene
                .create_transform(Transform::at(Vector::new(i as f32, 0.0)))
                .unwrap();
        }

        let mut three = [Transform::IDENTITY; 3];
        assert_eq!(scene.copy_out(&mut three), 3);
        assert_eq!(three[2].position.x, 2.0);

        let mut xs = [0.0_f32; 8];
        assert_eq!(scene.copy_field(&mut xs, |t: &Transform| t.position.x), 5);
        assert_eq!(&xs[..5], &[0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_handle_at_matches_iteration() {
        let mut scene = Scene::default();
        let a = scene.create_transform(Transform::IDENTITY).unwrap();
        let b = scene.create_transform(Transform::IDENTITY).unwrap();
        assert_eq!(scene.handle_at::<Transform>(a.index() as usize), Some(a));
        assert_eq!(scene.handle_at::<Transform>(b.index() as usize), Some(b));
        assert_eq!(scene.handle_at::<Particle>(a.index() as usize), None);
    }

    #[test]
    fn test_parenting_and_children() {
        let mut scene = Scene::default();
        let root = scene.create_transform(Transform::at(Vector::new(5.0, 0.0))).unwrap();
        let child = scene.create_transform(Transform::at(Vector::new(1.0, 0.0))).unwrap();

        scene.set_parent(child, root).unwrap();
        assert_eq!(scene.world_position(child).unwrap(), Vector::new(6.0, 0.0));

        let mut out = Vec::new();
        assert_eq!(scene.children_of(root, &mut out), 1);
        assert_eq!(out, vec![child]);

        assert!(matches!(
            scene.set_parent(root, child),
            Err(SceneError::CyclicParent { .. })
        ));

        scene.clear_parent(child).unwrap();
        assert_eq!(scene.world_position(child).unwrap(), Vector::new(1.0, 0.0));
    }

    #[test]
    fn test_truncation_counted() {
        let mut config = SceneConfig::default();
        config.hierarchy.parent_search_threshold = 2;
        let mut scene = Scene::new(config).unwrap();

        let mut parent = Handle::NULL;
        for _ in 0..5 {
            let mut transform = Transform::at(Vector::new(1.0, 0.0));
            transform.parent = parent;
            parent = scene.create_transform(transform).unwrap();
        }
        let world = scene.world_transform(parent).unwrap();
        assert!(world.truncated);
        assert_eq!(world.position.x, 3.0);
        assert_eq!(scene.stats().hierarchy_truncations, 1);
    }

    #[test]
    fn test_bound_rect_follows_body() {
        let mut scene = Scene::default();
        let entity = scene
            .create_entity(
                EntityDesc::default()
                    .at(Vector::new(5.0, 5.0))
                    .with_bound(Vector::new(-1.0, -1.0), Vector::new(2.0, 2.0)),
            )
            .unwrap();
        let bound = scene.get::<Entity>(entity).unwrap().bound;
        let rect = scene.bound_rect(bound).unwrap();
        assert_eq!(rect.position, Vector::new(4.0, 4.0));
        assert_eq!(rect.dimensions, Vector::new(2.0, 2.0));
    }

    #[test]
    fn test_raw_blocks() {
        let mut scene = Scene::default();
        let block = scene.allocate_raw(24).unwrap();
        assert!(scene.raw_bytes(block).unwrap().iter().all(|&b| b == 0));
        scene.raw_bytes_mut(block).unwrap().fill(0xAB);
        assert_eq!(scene.free_raw(block).unwrap(), FreeStatus::Pooled);
        assert!(matches!(
            scene.allocate_raw(0),
            Err(SceneError::AllocationExhausted { .. })
        ));
    }

    #[test]
    fn test_stale_raw_block_cannot_free_object() {
        let mut scene = Scene::default();
        let block = scene.allocate_raw(24).unwrap();
        scene.free_raw(block).unwrap();

        let first = scene
            .create_transform(Transform::at(Vector::new(7.0, 7.0)))
            .unwrap();
        assert_eq!(scene.free_raw(block), Err(SceneError::UnknownBlock(block)));
        assert!(scene.raw_bytes(block).is_none());

        let second = scene
            .create_transform(Transform::at(Vector::new(9.0, 9.0)))
            .unwrap();
        assert_eq!(scene.world_position(first).unwrap(), Vector::new(7.0, 7.0));
        assert_eq!(scene.world_position(second).unwrap(), Vector::new(9.0, 9.0));
    }

    #[test]
    fn test_particle_editing() {
        let mut scene = Scene::default();
        let transform = scene.create_transform(Transform::IDENTITY).unwrap();
        let particle = scene.create_particle(Particle::on(transform)).unwrap();

        scene.set_particle_layer(particle, 7).unwrap();
        scene
            .set_particle_bias(particle, Color::new(10, 20, 30, 40))
            .unwrap();
        let record = scene.get::<Particle>(particle).unwrap();
        assert_eq!(record.layer, 7);
        assert_eq!(record.bias, Color::new(10, 20, 30, 40));
    }

    #[test]
    fn test_callbacks_require_live_entity() {
        let mut scene = Scene::default();
        let entity = ball(&mut scene, 0.0);
        scene.destroy(entity).unwrap();
        assert_eq!(
            scene.set_collision_callback(entity, |_, _, _| {}),
            Err(SceneError::InvalidHandle(entity))
        );
    }
}
