//! # Transform Hierarchy
//!
//! Parent links are weak handles stored inside each [`Transform`]. World
//! values are folded from the child upward without allocating:
//!
//! ```text
//! p     = child.position
//! for each ancestor a (nearest first):
//!     p = a.position + rotate(p * a.scale, a.rotation)
//! rotation = sum of rotations, scale = product of scales
//! ```
//!
//! The walk stops after `threshold` ancestors. A longer chain is treated as
//! rooted at that point and the result is flagged as truncated. A parent
//! handle that no longer resolves ends the chain as if it were null.

use vframe_shared::Vector;

use crate::error::{SceneError, SceneResult};
use crate::store::{Handle, ObjectStore, Transform};

/// World-space values of a transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTransform {
    /// World position.
    pub position: Vector,
    /// World rotation in radians.
    pub rotation: f32,
    /// World uniform scale.
    pub scale: f32,
    /// The chain was longer than the search threshold.
    pub truncated: bool,
}

/// Folds a transform with all of its ancestors.
///
/// # Arguments
///
/// * `store` - Store holding the transforms
/// * `handle` - Transform to evaluate
/// * `threshold` - Most ancestors followed
///
/// # Errors
///
/// [`SceneError::InvalidHandle`] if `handle` is not a live transform.
pub fn world_transform(
    store: &ObjectStore,
    handle: Handle,
    threshold: usize,
) -> SceneResult<WorldTransform> {
    let local = store.get::<Transform>(handle)?;
    let mut world = WorldTransform {
        position: local.position,
        rotation: local.rotation,
        scale: local.scale,
        truncated: false,
    };

    let mut parent = local.parent;
    let mut depth = 0;
    while let Ok(ancestor) = store.get::<Transform>(parent) {
        if depth == threshold {
            world.truncated = true;
            tracing::warn!(%handle, threshold, "parent chain truncated");
            break;
        }
        world.position =
            ancestor.position + (world.position * ancestor.scale).rotated(ancestor.rotation);
        world.rotation += ancestor.rotation;
        world.scale *= ancestor.scale;
        parent = ancestor.parent;
        depth += 1;
    }

    Ok(world)
}

/// Re-parents `child` under `parent`, or makes it a root when `parent` is
/// [`Handle::NULL`].
///
/// The ancestors of `parent` are searched for `child` up to `threshold` links.
///
/// # Errors
///
/// - [`SceneError::InvalidHandle`] if either handle is not a live transform
/// - [`SceneError::CyclicParent`] if the link would close a loop
pub fn set_parent(
    store: &mut ObjectStore,
    child: Handle,
    parent: Handle,
    threshold: usize,
) -> SceneResult<()> {
    store.get::<Transform>(child)?;

    if !parent.is_null() {
        store.get::<Transform>(parent)?;
        let mut cursor = parent;
        for _ in 0..=threshold {
            if cursor == child {
                return Err(SceneError::CyclicParent { child, parent });
            }
            match store.get::<Transform>(cursor) {
                Ok(transform) => cursor = transform.parent,
                Err(_) => break,
            }
        }
    }

    store.get_mut::<Transform>(child)?.parent = parent;
    Ok(())
}

/// Collects the live direct children of `parent` into `out`.
///
/// `out` is cleared first and receives at most `max_children` handles, in
/// slot order. Returns the number written.
pub fn children_of(
    store: &ObjectStore,
    parent: Handle,
    max_children: usize,
    out: &mut Vec<Handle>,
) -> usize {
    out.clear();
    if parent.is_null() {
        return 0;
    }
    out.extend(
        store
            .iter::<Transform>()
            .filter(|(_, transform)| transform.parent == parent)
            .map(|(handle, _)| handle)
            .take(max_children),
    );
    out.len()
}
