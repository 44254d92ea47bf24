//! # Entity Callbacks
//!
//! Collision and update callbacks run on the physics thread, inside the tick,
//! while the scene lock is held. They receive a [`CallbackScope`] instead of
//! the scene:
//!
//! - Object state (positions, velocities, visuals) can be read and written
//! - Structural changes (destroying objects, re-registering callbacks) are
//!   queued and applied once the tick is over
//! - The lock is out of reach, so a callback can never wait on itself
//!
//! ```rust,ignore
//! scene.set_collision_callback(bullet, |scope, bullet, target| {
//!     if let Ok(entity) = scope.entity_mut(target) {
//!         entity.bias = Color::new(255, 0, 0, 255);
//!     }
//!     scope.defer_destroy(bullet);
//! })?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use vframe_core::{
    world_transform, Entity, Handle, HierarchyConfig, ObjectStore, SceneResult, Stored,
    WorldTransform,
};

use crate::scene::Scene;

/// Collision callback: `(scope, self, other)`.
pub type CollisionFn = Arc<dyn Fn(&mut CallbackScope<'_>, Handle, Handle) + Send + Sync>;

/// Update callback: `(scope, self)`.
pub type UpdateFn = Arc<dyn Fn(&mut CallbackScope<'_>, Handle) + Send + Sync>;

/// Scene edit applied after the tick.
pub type DeferredFn = Box<dyn FnOnce(&mut Scene) + Send>;

/// Work queued by callbacks.
pub(crate) enum Deferred {
    Destroy(Handle),
    Apply(DeferredFn),
}

#[derive(Clone, Default)]
struct Callbacks {
    on_collision: Option<CollisionFn>,
    on_update: Option<UpdateFn>,
}

/// Callbacks keyed by entity handle.
#[derive(Default)]
pub(crate) struct CallbackTable {
    entries: HashMap<Handle, Callbacks>,
}

impl CallbackTable {
    pub(crate) fn set_collision(&mut self, entity: Handle, callback: Option<CollisionFn>) {
        self.entries.entry(entity).or_default().on_collision = callback;
        self.prune(entity);
    }

    pub(crate) fn set_update(&mut self, entity: Handle, callback: Option<UpdateFn>) {
        self.entries.entry(entity).or_default().on_update = callback;
        self.prune(entity);
    }

    pub(crate) fn collision(&self, entity: Handle) -> Option<CollisionFn> {
        self.entries.get(&entity)?.on_collision.clone()
    }

    pub(crate) fn update(&self, entity: Handle) -> Option<UpdateFn> {
        self.entries.get(&entity)?.on_update.clone()
    }

    pub(crate) fn remove(&mut self, entity: Handle) {
        self.entries.remove(&entity);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn prune(&mut self, entity: Handle) {
        if let Some(entry) = self.entries.get(&entity) {
            if entry.on_collision.is_none() && entry.on_update.is_none() {
                self.entries.remove(&entity);
            }
        }
    }
}

/// What a callback may touch while the tick is running.
pub struct CallbackScope<'a> {
    store: &'a mut ObjectStore,
    deferred: &'a mut Vec<Deferred>,
    hierarchy: HierarchyConfig,
    delta_time: f32,
}

impl<'a> CallbackScope<'a> {
    pub(crate) fn new(
        store: &'a mut ObjectStore,
        deferred: &'a mut Vec<Deferred>,
        hierarchy: HierarchyConfig,
        delta_time: f32,
    ) -> Self {
        Self {
            store,
            deferred,
            hierarchy,
            delta_time,
        }
    }

    /// Seconds simulated by the current tick.
    #[inline]
    #[must_use]
    pub const fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Reads any object.
    ///
    /// # Errors
    ///
    /// [`vframe_core::SceneError::InvalidHandle`] for stale or wrong-typed handles.
    pub fn get<T: Stored>(&self, handle: Handle) -> SceneResult<&T> {
        self.store.get(handle)
    }

    /// Writes any object in place.
    ///
    /// # Errors
    ///
    /// [`vframe_core::SceneError::InvalidHandle`] for stale or wrong-typed handles.
    pub fn get_mut<T: Stored>(&mut self, handle: Handle) -> SceneResult<&mut T> {
        self.store.get_mut(handle)
    }

    /// Reads an entity.
    ///
    /// # Errors
    ///
    /// [`vframe_core::SceneError::InvalidHandle`] if `handle` is not a live entity.
    pub fn entity(&self, handle: Handle) -> SceneResult<&Entity> {
        self.store.get(handle)
    }

    /// Writes an entity in place.
    ///
    /// # Errors
    ///
    /// [`vframe_core::SceneError::InvalidHandle`] if `handle` is not a live entity.
    pub fn entity_mut(&mut self, handle: Handle) -> SceneResult<&mut Entity> {
        self.store.get_mut(handle)
    }

    /// World values of a transform.
    ///
    /// # Errors
    ///
    /// [`vframe_core::SceneError::InvalidHandle`] if `handle` is not a live transform.
    pub fn world_transform(&self, handle: Handle) -> SceneResult<WorldTransform> {
        world_transform(self.store, handle, self.hierarchy.parent_search_threshold)
    }

    /// Whether `handle` still resolves.
    #[must_use]
    pub fn is_live(&self, handle: Handle) -> bool {
        self.store.is_live(handle)
    }

    /// Destroys `handle` once the tick is over.
    pub fn defer_destroy(&mut self, handle: Handle) {
        self.deferred.push(Deferred::Destroy(handle));
    }

    /// Runs `edit` against the scene once the tick is over.
    pub fn defer<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut Scene) + Send + 'static,
    {
        self.deferred.push(Deferred::Apply(Box::new(edit)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_prunes_empty_entries() {
        let mut table = CallbackTable::default();
        let entity = Handle::from_raw(0x0400_0001_0000_0000);
        table.set_update(
            entity,
            Some(Arc::new(|_: &mut CallbackScope<'_>, _: Handle| {})),
        );
        assert_eq!(table.len(), 1);
        assert!(table.update(entity).is_some());
        assert!(table.collision(entity).is_none());

        table.set_update(entity, None);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_scope_queues_work() {
        let mut store = ObjectStore::default();
        let mut deferred = Vec::new();
        let handle = store.insert(vframe_core::Transform::IDENTITY).unwrap();

        let mut scope =
            CallbackScope::new(&mut store, &mut deferred, HierarchyConfig::default(), 0.5);
        assert!(scope.is_live(handle));
        assert_eq!(scope.delta_time(), 0.5);
        scope.defer_destroy(handle);
        scope.defer(|_| {});

        assert_eq!(deferred.len(), 2);
        assert!(matches!(deferred[0], Deferred::Destroy(h) if h == handle));
        assert!(store.is_live(handle));
    }
}
