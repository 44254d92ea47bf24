//! # Object Buffers
//!
//! Growable slot arrays, one per object type. A slot owns at most one tank
//! block holding the object bytes.
//!
//! The buffer:
//! - Starts at an initial capacity and grows by a fixed increment
//! - Never shrinks; destroyed slots are reused before growing
//! - Searches for a free slot linearly from the last known free position
//! - Bumps the slot generation on every create, so old handles go stale

use std::marker::PhantomData;

use crate::memory::{AllocError, Block, TankAllocator};

use super::handle::{Handle, MAX_GENERATION};
use super::object::Object;

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    generation: u32,
    block: Option<Block>,
    retired: bool,
}

impl Slot {
    #[inline]
    const fn is_live(&self) -> bool {
        self.block.is_some()
    }

    #[inline]
    const fn is_free(&self) -> bool {
        self.block.is_none() && !self.retired
    }
}

/// Growable storage for one object type.
///
/// # Type Parameters
///
/// * `T` - The object type to store
///
/// # Example
///
/// ```rust,ignore
/// let mut tanks = TankAllocator::default();
/// let mut transforms: ObjectBuffer<Transform> = ObjectBuffer::new(0x60, 0x30);
/// let handle = transforms.create(&mut tanks, Transform::IDENTITY)?;
/// assert!(transforms.get(&tanks, handle).is_some());
/// ```
pub struct ObjectBuffer<T: Object> {
    slots: Vec<Slot>,
    live_count: usize,
    retired_count: usize,
    search_from: usize,
    increment: usize,
    _phantom: PhantomData<T>,
}

impl<T: Object> ObjectBuffer<T> {
    /// Creates a buffer with `initial` empty slots.
    ///
    /// # Arguments
    ///
    /// * `initial` - Slots reserved up front
    /// * `increment` - Slots added each time the buffer is full
    ///
    /// # Panics
    ///
    /// Panics if `increment` is zero.
    #[must_use]
    pub fn new(initial: usize, increment: usize) -> Self {
        assert!(increment > 0, "Buffer increment must be greater than zero");
        Self {
            slots: vec![Slot::default(); initial],
            live_count: 0,
            retired_count: 0,
            search_from: 0,
            increment,
            _phantom: PhantomData,
        }
    }

    /// Number of live objects. O(1).
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live_count
    }

    /// Number of slots, live or not.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots permanently taken out of rotation after exhausting generations.
    #[inline]
    #[must_use]
    pub const fn retired_count(&self) -> usize {
        self.retired_count
    }

    /// Stores `value` in a free slot, growing the buffer if none is free.
    ///
    /// # Errors
    ///
    /// Propagates allocator exhaustion; no slot is claimed in that case.
    pub fn create(&mut self, tanks: &mut TankAllocator, value: T) -> Result<Handle, AllocError> {
        let index = self.find_free_slot();
        let block = tanks.allocate(std::mem::size_of::<T>(), true)?;
        if let Some(object) = tanks.get_mut::<T>(block) {
            *object = value;
        }

        let slot = &mut self.slots[index];
        slot.generation += 1;
        slot.block = Some(block);
        self.live_count += 1;
        self.search_from = index + 1;

        Ok(Handle::new(T::KIND, index as u32, slot.generation))
    }

    /// Destroys the object behind `handle`, returning its last value.
    ///
    /// # Arguments
    ///
    /// * `handle` - Handle from [`create`](Self::create)
    /// * `zero` - Clear the tank bytes before the field is reused
    ///
    /// Returns `None` for stale, foreign or null handles.
    pub fn destroy(&mut self, tanks: &mut TankAllocator, handle: Handle, zero: bool) -> Option<T> {
        let index = self.resolve(handle)?;
        let block = self.slots[index].block.take()?;
        let value = tanks.get::<T>(block).copied();

        if let Err(error) = tanks.free(block, zero) {
            tracing::warn!(%handle, %error, "object block was already released");
        }

        let slot = &mut self.slots[index];
        if slot.generation >= MAX_GENERATION {
            slot.retired = true;
            self.retired_count += 1;
            tracing::debug!(%handle, "slot generations exhausted, retiring slot");
        }
        self.live_count -= 1;
        self.search_from = self.search_from.min(index);

        value
    }

    /// Validates a handle and returns its slot index.
    #[inline]
    #[must_use]
    pub fn resolve(&self, handle: Handle) -> Option<usize> {
        if handle.kind() != Some(T::KIND) {
            return None;
        }
        let index = handle.index() as usize;
        let slot = self.slots.get(index)?;
        (slot.is_live() && slot.generation == handle.generation()).then_some(index)
    }

    /// Checks if a handle refers to a live object of this buffer.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.resolve(handle).is_some()
    }

    /// Gets the object behind `handle`.
    #[inline]
    #[must_use]
    pub fn get<'a>(&self, tanks: &'a TankAllocator, handle: Handle) -> Option<&'a T> {
        let block = self.slots[self.resolve(handle)?].block?;
        tanks.get::<T>(block)
    }

    /// Gets the object behind `handle` mutably.
    #[inline]
    pub fn get_mut<'a>(&self, tanks: &'a mut TankAllocator, handle: Handle) -> Option<&'a mut T> {
        let block = self.slots[self.resolve(handle)?].block?;
        tanks.get_mut::<T>(block)
    }

    /// Current handle of the object in `index`, if that slot is live.
    #[inline]
    #[must_use]
    pub fn handle_at(&self, index: usize) -> Option<Handle> {
        let slot = self.slots.get(index)?;
        slot.is_live()
            .then(|| Handle::new(T::KIND, index as u32, slot.generation))
    }

    /// Handles of all live objects, in slot order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_live())
            .map(|(index, slot)| Handle::new(T::KIND, index as u32, slot.generation))
    }

    /// Iterates over all live objects with their handles.
    pub fn iter<'a>(&'a self, tanks: &'a TankAllocator) -> impl Iterator<Item = (Handle, &'a T)> {
        self.handles()
            .filter_map(move |handle| self.get(tanks, handle).map(|object| (handle, object)))
    }

    /// Destroys every live object.
    pub fn clear(&mut self, tanks: &mut TankAllocator, zero: bool) {
        let live: Vec<Handle> = self.handles().collect();
        for handle in live {
            self.destroy(tanks, handle, zero);
        }
        self.search_from = 0;
    }

    fn find_free_slot(&mut self) -> usize {
        let len = self.slots.len();
        let start = self.search_from.min(len);
        let found = (start..len)
            .chain(0..start)
            .find(|&index| self.slots[index].is_free());

        if let Some(index) = found {
            return index;
        }

        self.slots.reserve_exact(self.increment);
        self.slots.resize(len + self.increment, Slot::default());
        tracing::debug!(
            kind = T::KIND.name(),
            capacity = self.slots.len(),
            "object buffer grown"
        );
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::object::Transform;
    use vframe_shared::Vector;

    fn setup() -> (TankAllocator, ObjectBuffer<Transform>) {
        (TankAllocator::default(), ObjectBuffer::new(2, 3))
    }

    #[test]
    fn test_create_get_destroy() {
        let (mut tanks, mut buffer) = setup();
        let handle = buffer
            .create(&mut tanks, Transform::at(Vector::new(1.0, 2.0)))
            .unwrap();
        assert_eq!(buffer.live_count(), 1);
        assert_eq!(buffer.get(&tanks, handle).unwrap().position, Vector::new(1.0, 2.0));

        let removed = buffer.destroy(&mut tanks, handle, true).unwrap();
        assert_eq!(removed.position, Vector::new(1.0, 2.0));
        assert_eq!(buffer.live_count(), 0);
        assert!(buffer.get(&tanks, handle).is_none());
        assert!(buffer.destroy(&mut tanks, handle, true).is_none());
    }

    #[test]
    fn test_reused_slot_does_not_alias_old_handle() {
        let (mut tanks, mut buffer) = setup();
        let old = buffer.create(&mut tanks, Transform::IDENTITY).unwrap();
        buffer.destroy(&mut tanks, old, true);

        let new = buffer
            .create(&mut tanks, Transform::at(Vector::new(5.0, 5.0)))
            .unwrap();
        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(buffer.get(&tanks, old).is_none());
        assert!(buffer.get(&tanks, new).is_some());
    }

    #[test]
    fn test_grows_by_increment() {
        let (mut tanks, mut buffer) = setup();
        assert_eq!(buffer.capacity(), 2);
        for _ in 0..3 {
            buffer.create(&mut tanks, Transform::IDENTITY).unwrap();
        }
        assert_eq!(buffer.capacity(), 5);
        assert_eq!(buffer.live_count(), 3);
    }

    #[test]
    fn test_destroyed_slots_reused_before_growth() {
        let (mut tanks, mut buffer) = setup();
        let a = buffer.create(&mut tanks, Transform::IDENTITY).unwrap();
        let _b = buffer.create(&mut tanks, Transform::IDENTITY).unwrap();
        buffer.destroy(&mut tanks, a, true);
        let c = buffer.create(&mut tanks, Transform::IDENTITY).unwrap();
        assert_eq!(c.index(), a.index());
        assert_eq!(buffer.capacity(), 2);
    }

    #[test]
    fn test_wrong_kind_handle_rejected() {
        let (mut tanks, mut buffer) = setup();
        let handle = buffer.create(&mut tanks, Transform::IDENTITY).unwrap();
        let forged = Handle::new(
            crate::store::ObjectKind::Bound,
            handle.index(),
            handle.generation(),
        );
        assert!(buffer.get(&tanks, forged).is_none());
        assert!(buffer.get(&tanks, Handle::NULL).is_none());
    }

    #[test]
    fn test_handles_and_handle_at_agree() {
        let (mut tanks, mut buffer) = setup();
        let a = buffer.create(&mut tanks, Transform::IDENTITY).unwrap();
        let b = buffer.create(&mut tanks, Transform::IDENTITY).unwrap();
        buffer.destroy(&mut tanks, a, true);

        let live: Vec<_> = buffer.handles().collect();
        assert_eq!(live, vec![b]);
        assert_eq!(buffer.handle_at(b.index() as usize), Some(b));
        assert_eq!(buffer.handle_at(a.index() as usize), None);
    }

    #[test]
    fn test_clear_releases_blocks() {
        let (mut tanks, mut buffer) = setup();
        for _ in 0..10 {
            buffer.create(&mut tanks, Transform::IDENTITY).unwrap();
        }
        buffer.clear(&mut tanks, true);
        assert_eq!(buffer.live_count(), 0);
        assert_eq!(tanks.stats().live_bytes, 0);
    }
}
