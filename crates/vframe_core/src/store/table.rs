//! # Object Store
//!
//! The handle table: one tank allocator, one buffer per object type, and the
//! dispatch that turns a tagged handle into the right buffer and slot.

use crate::config::BufferConfig;
use crate::error::{SceneError, SceneResult};
use crate::memory::{Block, FreeStatus, TankAllocator, TankClass};

use super::buffer::ObjectBuffer;
use super::handle::{Handle, ObjectKind};
use super::object::{Bound, Entity, Object, Particle, Transform};

/// Objects that live in an [`ObjectStore`].
///
/// Implemented for the four scene object types; the accessors pick the
/// matching buffer out of the store.
pub trait Stored: Object {
    /// The buffer holding this type.
    fn buffer(store: &ObjectStore) -> &ObjectBuffer<Self>;

    /// The buffer holding this type, split from the allocator.
    fn split(store: &mut ObjectStore) -> (&mut ObjectBuffer<Self>, &mut TankAllocator);
}

macro_rules! impl_stored {
    ($ty:ty, $field:ident) => {
        impl Stored for $ty {
            #[inline]
            fn buffer(store: &ObjectStore) -> &ObjectBuffer<Self> {
                &store.$field
            }

            #[inline]
            fn split(store: &mut ObjectStore) -> (&mut ObjectBuffer<Self>, &mut TankAllocator) {
                (&mut store.$field, &mut store.tanks)
            }
        }
    };
}

impl_stored!(Transform, transforms);
impl_stored!(Bound, bounds);
impl_stored!(Particle, particles);
impl_stored!(Entity, entities);

/// Live object counts per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectCounts {
    /// Live transforms.
    pub transforms: usize,
    /// Live bounds.
    pub bounds: usize,
    /// Live particles.
    pub particles: usize,
    /// Live entities.
    pub entities: usize,
}

/// Handle-indexed storage for every scene object.
///
/// # Ownership
///
/// Destroying an entity also destroys the transform and bound it owns. All
/// other references (parents, bound bodies, particle transforms) are weak:
/// destroying their target leaves them stale, and stale handles resolve to
/// [`SceneError::InvalidHandle`].
pub struct ObjectStore {
    tanks: TankAllocator,
    transforms: ObjectBuffer<Transform>,
    bounds: ObjectBuffer<Bound>,
    particles: ObjectBuffer<Particle>,
    entities: ObjectBuffer<Entity>,
}

impl ObjectStore {
    /// Creates an empty store.
    ///
    /// # Arguments
    ///
    /// * `buffers` - Initial capacity and growth increment of every buffer
    /// * `layout` - Tank size classes
    /// * `overflow_budget` - Heap bytes tolerated before overflow is reported
    #[must_use]
    pub fn new(buffers: BufferConfig, layout: &[TankClass], overflow_budget: usize) -> Self {
        let (initial, increment) = (buffers.initial_capacity, buffers.increment);
        Self {
            tanks: TankAllocator::new(layout, overflow_budget),
            transforms: ObjectBuffer::new(initial, increment),
            bounds: ObjectBuffer::new(initial, increment),
            particles: ObjectBuffer::new(initial, increment),
            entities: ObjectBuffer::new(initial, increment),
        }
    }

    /// The allocator backing every buffer.
    #[inline]
    #[must_use]
    pub const fn tanks(&self) -> &TankAllocator {
        &self.tanks
    }

    /// Stores a new object.
    ///
    /// # Errors
    ///
    /// [`SceneError::AllocationExhausted`] if no memory could be found.
    pub fn insert<T: Stored>(&mut self, value: T) -> SceneResult<Handle> {
        let (buffer, tanks) = T::split(self);
        Ok(buffer.create(tanks, value)?)
    }

    /// Gets an object by handle.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] for stale, null or wrong-typed handles.
    #[inline]
    pub fn get<T: Stored>(&self, handle: Handle) -> SceneResult<&T> {
        T::buffer(self)
            .get(&self.tanks, handle)
            .ok_or(SceneError::InvalidHandle(handle))
    }

    /// Gets an object mutably by handle.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidHandle`] for stale, null or wrong-typed handles.
    #[inline]
    pub fn get_mut<T: Stored>(&mut self, handle: Handle) -> SceneResult<&mut T> {
        let (buffer, tanks) = T::split(self);
        buffer
            .get_mut(tanks, handle)
            .ok_or(SceneError::InvalidHandle(handle))
    }

    /// Checks if a handle resolves to a live object of type `T`.
    #[inline]
    #[must_use]
    pub fn contains<T: Stored>(&self, handle: Handle) -> bool {
        T::buffer(self).contains(handle)
    }

    /// Checks if a handle resolves to any live object.
    #[must_use]
    pub fn is_live(&self, handle: Handle) -> bool {
        match handle.kind() {
            Some(ObjectKind::Transform) => self.transforms.contains(handle),
            Some(ObjectKind::Bound) => self.bounds.contains(handle),
            Some(ObjectKind::Particle) => self.particles.contains(handle),
            Some(ObjectKind::Entity) => self.entities.contains(handle),
            None => false,
        }
    }

    /// Current handle of the live `T` in slot `index`.
    #[inline]
    #[must_use]
    pub fn handle_at<T: Stored>(&self, index: usize) -> Option<Handle> {
        T::buffer(self).handle_at(index)
    }

    /// Number of live `T`. O(1).
    #[inline]
    #[must_use]
    pub fn count<T: Stored>(&self) -> usize {
        T::buffer(self).live_count()
    }

    /// Live object counts for every kind.
    #[must_use]
    pub fn counts(&self) -> ObjectCounts {
        ObjectCounts {
            transforms: self.transforms.live_count(),
            bounds: self.bounds.live_count(),
            particles: self.particles.live_count(),
            entities: self.entities.live_count(),
        }
    }

    /// Iterates over all live `T` with their handles.
    pub fn iter<T: Stored>(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        T::buffer(self).iter(&self.tanks)
    }

    /// Collects the handles of all live `T` into `out`, replacing its contents.
    ///
    /// Lets a caller walk the buffer while mutating it, reusing `out`'s memory.
    pub fn collect_handles<T: Stored>(&self, out: &mut Vec<Handle>) {
        out.clear();
        out.extend(T::buffer(self).handles());
    }

    /// Destroys the object behind `handle`, whatever its kind.
    ///
    /// Entities take their owned transform and bound with them.
    ///
    /// # Errors
    ///
    /// - [`SceneError::InvalidHandle`] if the handle is stale or null
    /// - [`SceneError::OwnedByEntity`] for a transform or bound whose entity
    ///   is still live
    pub fn destroy(&mut self, handle: Handle, zero: bool) -> SceneResult<()> {
        let destroyed = match handle.kind() {
            Some(ObjectKind::Transform) => {
                let owner = self.get::<Transform>(handle)?.entity;
                self.check_unowned(handle, owner, |entity| entity.transform)?;
                self.remove::<Transform>(handle, zero).is_some()
            }
            Some(ObjectKind::Bound) => {
                let owner = self.get::<Bound>(handle)?.entity;
                self.check_unowned(handle, owner, |entity| entity.bound)?;
                self.remove::<Bound>(handle, zero).is_some()
            }
            Some(ObjectKind::Particle) => self.remove::<Particle>(handle, zero).is_some(),
            Some(ObjectKind::Entity) => match self.remove::<Entity>(handle, zero) {
                Some(entity) => {
                    self.remove::<Bound>(entity.bound, zero);
                    self.remove::<Transform>(entity.transform, zero);
                    true
                }
                None => false,
            },
            None => false,
        };

        if destroyed {
            Ok(())
        } else {
            Err(SceneError::InvalidHandle(handle))
        }
    }

    fn check_unowned(
        &self,
        handle: Handle,
        owner: Handle,
        owned: fn(&Entity) -> Handle,
    ) -> SceneResult<()> {
        match self.get::<Entity>(owner) {
            Ok(entity) if owned(entity) == handle => Err(SceneError::OwnedByEntity {
                handle,
                entity: owner,
            }),
            _ => Ok(()),
        }
    }

    /// Removes a single object without touching anything it references.
    pub fn remove<T: Stored>(&mut self, handle: Handle, zero: bool) -> Option<T> {
        let (buffer, tanks) = T::split(self);
        buffer.destroy(tanks, handle, zero)
    }

    /// Destroys every object. Handles issued before stay stale forever.
    pub fn clear(&mut self, zero: bool) {
        self.entities.clear(&mut self.tanks, zero);
        self.bounds.clear(&mut self.tanks, zero);
        self.particles.clear(&mut self.tanks, zero);
        self.transforms.clear(&mut self.tanks, zero);
    }

    // =========================================================================
    // Raw pooled memory
    // =========================================================================

    /// Allocates raw bytes from the same tanks that back the objects.
    ///
    /// # Errors
    ///
    /// [`SceneError::AllocationExhausted`] if neither the arena nor the heap
    /// can serve the request, or the request is empty.
    pub fn allocate_raw(&mut self, size: usize, zero: bool) -> SceneResult<Block> {
        Ok(self.tanks.allocate(size, zero)?)
    }

    /// Frees raw bytes.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownBlock`] if the block is not currently allocated.
    pub fn free_raw(&mut self, block: Block, zero: bool) -> SceneResult<FreeStatus> {
        Ok(self.tanks.free(block, zero)?)
    }

    /// Bytes of a raw block.
    #[must_use]
    pub fn raw_bytes(&self, block: Block) -> Option<&[u8]> {
        self.tanks.bytes(block)
    }

    /// Mutable bytes of a raw block.
    pub fn raw_bytes_mut(&mut self, block: Block) -> Option<&mut [u8]> {
        self.tanks.bytes_mut(block)
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new(
            BufferConfig::default(),
            &crate::memory::default_layout(),
            1 << 20,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::object::{Physics, ShapeId, TextureId};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;
    use vframe_shared::Vector;

    fn spawn_entity(store: &mut ObjectStore) -> Handle {
        let transform = store.insert(Transform::IDENTITY).unwrap();
        let bound = store.insert(Bound::on(transform)).unwrap();
        let entity = store
            .insert(Entity::new(
                transform,
                bound,
                Physics::default(),
                ShapeId(0),
                TextureId(0),
                0,
            ))
            .unwrap();
        store.get_mut::<Bound>(bound).unwrap().entity = entity;
        store.get_mut::<Transform>(transform).unwrap().entity = entity;
        entity
    }

    #[test]
    fn test_entity_destroy_releases_owned_objects() {
        let mut store = ObjectStore::default();
        let entity = spawn_entity(&mut store);
        let record = *store.get::<Entity>(entity).unwrap();
        assert_eq!(store.counts().transforms, 1);

        store.destroy(entity, true).unwrap();
        assert_eq!(store.counts(), ObjectCounts::default());
        assert!(!store.is_live(record.transform));
        assert!(!store.is_live(record.bound));
        assert_eq!(store.tanks().stats().live_bytes, 0);
    }

    #[test]
    fn test_owned_parts_outlive_direct_destroy() {
        let mut store = ObjectStore::default();
        let entity = spawn_entity(&mut store);
        let record = *store.get::<Entity>(entity).unwrap();

        assert_eq!(
            store.destroy(record.transform, true),
            Err(SceneError::OwnedByEntity {
                handle: record.transform,
                entity
            })
        );
        assert_eq!(
            store.destroy(record.bound, true),
            Err(SceneError::OwnedByEntity {
                handle: record.bound,
                entity
            })
        );
        assert!(store.is_live(record.transform));
        assert!(store.is_live(record.bound));

        store.destroy(entity, true).unwrap();
        assert_eq!(store.counts(), ObjectCounts::default());
    }

    #[test]
    fn test_destroy_stale_handle_fails() {
        let mut store = ObjectStore::default();
        let handle = store.insert(Transform::IDENTITY).unwrap();
        store.destroy(handle, true).unwrap();
        assert_eq!(store.destroy(handle, true), Err(SceneError::InvalidHandle(handle)));
        assert_eq!(
            store.destroy(Handle::NULL, true),
            Err(SceneError::InvalidHandle(Handle::NULL))
        );
    }

    #[test]
    fn test_get_wrong_type_is_not_found() {
        let mut store = ObjectStore::default();
        let handle = store.insert(Transform::IDENTITY).unwrap();
        assert!(store.get::<Bound>(handle).is_err());
        assert!(store.get::<Transform>(handle).is_ok());
    }

    #[test]
    fn test_random_sequences_never_alias() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
        let mut store = ObjectStore::new(
            BufferConfig {
                initial_capacity: 4,
                increment: 4,
            },
            &crate::memory::default_layout(),
            1 << 16,
        );
        let mut live: HashMap<Handle, f32> = HashMap::new();
        let mut dead: Vec<Handle> = Vec::new();

        for step in 0..5_000 {
            if live.is_empty() || rng.gen_bool(0.55) {
                let tag = step as f32;
                let handle = store.insert(Transform::at(Vector::new(tag, 0.0))).unwrap();
                assert!(live.insert(handle, tag).is_none(), "handle issued twice");
            } else {
                let pick = rng.gen_range(0..live.len());
                let handle = *live.keys().nth(pick).unwrap();
                live.remove(&handle);
                store.destroy(handle, rng.gen_bool(0.5)).unwrap();
                dead.push(handle);
            }

            assert_eq!(store.count::<Transform>(), live.len());
        }

        for (handle, tag) in &live {
            assert_eq!(store.get::<Transform>(*handle).unwrap().position.x, *tag);
        }
        for handle in &dead {
            assert!(store.get::<Transform>(*handle).is_err());
        }
    }

    #[test]
    fn test_raw_blocks_share_the_tanks() {
        let mut store = ObjectStore::default();
        let block = store.allocate_raw(20, true).unwrap();
        store.raw_bytes_mut(block).unwrap()[0] = 9;
        assert_eq!(store.raw_bytes(block).unwrap()[0], 9);
        assert_eq!(store.free_raw(block, true).unwrap(), FreeStatus::Pooled);
        assert!(store.free_raw(block, true).is_err());
    }
}
