//! # Physics Tick
//!
//! One tick, in order:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ 1. INTEGRATE   drag, world pos += v*dt, rotation += w*dt    │
//! │                (active, moveable entities with valid mass)  │
//! │ 2. GATHER      world rect of every active bound whose       │
//! │                entity is active                             │
//! │ 3. RESOLVE     all pairs: detect, push apart, bounce        │
//! │ 4. COLLISION   callbacks (a, b) then (b, a) per contact     │
//! │ 5. UPDATE      callbacks, once per active entity            │
//! │ 6. DEFERRED    destroys and edits queued by callbacks       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scratch vectors live in the scene and are reused, so a tick allocates
//! nothing once they have grown to the scene's size.

mod collision;
mod integrate;

pub use collision::{detect, resolve, BodyState, Contact, Resolution};
pub use integrate::{apply_drag, integrate, Motion};

use vframe_core::{Bound, Entity, Handle, Physics, Transform};
use vframe_shared::{Rect, Vector};

use crate::callback::{CallbackScope, Deferred};
use crate::scene::Scene;

/// What a single tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// The tick was skipped because physics is disabled.
    pub paused: bool,
    /// Bodies integrated.
    pub integrated: usize,
    /// Bound pairs tested.
    pub pairs_tested: usize,
    /// Overlapping pairs found.
    pub contacts: usize,
    /// Moveable bodies held in place for lack of a usable mass.
    pub invalid_mass: usize,
    /// Collision and update callbacks invoked.
    pub callbacks: usize,
    /// Deferred destroys and edits applied.
    pub deferred: usize,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Collider {
    entity: Handle,
    transform: Handle,
    rect: Rect,
}

/// Per-tick working memory.
#[derive(Default)]
pub(crate) struct StepScratch {
    entities: Vec<Handle>,
    colliders: Vec<Collider>,
    contacts: Vec<(Handle, Handle)>,
}

impl Scene {
    /// Runs one tick with the configured tick length.
    pub fn tick(&mut self) -> StepReport {
        self.step(self.config.physics.delta_time())
    }

    /// Runs one tick of `dt` seconds. Does nothing while physics is disabled.
    pub fn step(&mut self, dt: f32) -> StepReport {
        let mut report = StepReport::default();
        if !self.physics_enabled {
            report.paused = true;
            return report;
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        self.store.collect_handles::<Entity>(&mut scratch.entities);

        self.integrate_bodies(&scratch.entities, dt, &mut report);
        self.gather_colliders(&mut scratch.colliders);
        self.resolve_contacts(&mut scratch.colliders, &mut scratch.contacts, &mut report);

        for &(a, b) in &scratch.contacts {
            report.callbacks += usize::from(self.invoke_collision(a, b, dt));
            report.callbacks += usize::from(self.invoke_collision(b, a, dt));
        }
        for &entity in &scratch.entities {
            report.callbacks += usize::from(self.invoke_update(entity, dt));
        }

        self.scratch = scratch;
        report.deferred = self.apply_deferred();
        self.counters.ticks += 1;
        report
    }

    fn integrate_bodies(&mut self, entities: &[Handle], dt: f32, report: &mut StepReport) {
        for &handle in entities {
            let Ok(entity) = self.store.get::<Entity>(handle) else {
                continue;
            };
            let mut physics = entity.physics;
            if !entity.is_active() || !physics.is_active() || !physics.is_moveable() {
                continue;
            }
            if !physics.has_valid_mass() {
                self.counters.invalid_mass += 1;
                report.invalid_mass += 1;
                tracing::warn!(
                    entity = %handle,
                    mass = physics.mass,
                    "moveable entity has no usable mass, held in place"
                );
                continue;
            }

            let transform = entity.transform;
            if !self.store.contains::<Transform>(transform) {
                continue;
            }
            let motion = integrate(&mut physics, dt, &self.config.physics);
            self.push_transform(transform, motion.displacement);
            if let Ok(record) = self.store.get_mut::<Transform>(transform) {
                record.rotation += motion.spin;
            }
            self.write_physics(handle, physics);
            report.integrated += 1;
        }
    }

    fn gather_colliders(&self, colliders: &mut Vec<Collider>) {
        colliders.clear();
        for (_, bound) in self.store.iter::<Bound>() {
            if !bound.is_active() {
                continue;
            }
            let Ok(entity) = self.store.get::<Entity>(bound.entity) else {
                continue;
            };
            if !entity.is_active() {
                continue;
            }
            let Ok(body) = self.world_transform(bound.body) else {
                continue;
            };
            colliders.push(Collider {
                entity: bound.entity,
                transform: entity.transform,
                rect: Rect::new(body.position + bound.position, bound.dimensions),
            });
        }
    }

    fn resolve_contacts(
        &mut self,
        colliders: &mut [Collider],
        contacts: &mut Vec<(Handle, Handle)>,
        report: &mut StepReport,
    ) {
        contacts.clear();
        let max_pushback = self.config.physics.max_pushback;

        for i in 0..colliders.len() {
            for j in (i + 1)..colliders.len() {
                let (a, b) = (colliders[i], colliders[j]);
                report.pairs_tested += 1;
                if a.entity == b.entity {
                    continue;
                }
                let Some(contact) = detect(a.rect, b.rect) else {
                    continue;
                };
                let (Ok(entity_a), Ok(entity_b)) = (
                    self.store.get::<Entity>(a.entity),
                    self.store.get::<Entity>(b.entity),
                ) else {
                    continue;
                };
                let (mut physics_a, mut physics_b) = (entity_a.physics, entity_b.physics);

                let resolution = resolve(
                    contact,
                    body_state(&physics_a),
                    body_state(&physics_b),
                    max_pushback,
                );
                self.push_transform(a.transform, resolution.push_a);
                self.push_transform(b.transform, resolution.push_b);
                colliders[i].rect.position += resolution.push_a;
                colliders[j].rect.position += resolution.push_b;

                physics_a.apply_impulse(-resolution.impulse);
                physics_b.apply_impulse(resolution.impulse);
                self.write_physics(a.entity, physics_a);
                self.write_physics(b.entity, physics_b);

                contacts.push((a.entity, b.entity));
                report.contacts += 1;
                self.counters.collisions += 1;
            }
        }
    }

    /// Moves a transform by a world-space delta, undoing the parent's
    /// rotation and scale so the world position moves by exactly `delta`.
    fn push_transform(&mut self, transform: Handle, delta: Vector) {
        if delta == Vector::ZERO {
            return;
        }
        let Ok(parent) = self.store.get::<Transform>(transform).map(|t| t.parent) else {
            return;
        };
        let local = match self.world_transform(parent) {
            Ok(world) if world.scale != 0.0 => delta.rotated(-world.rotation) * (1.0 / world.scale),
            _ => delta,
        };
        if let Ok(record) = self.store.get_mut::<Transform>(transform) {
            record.position += local;
        }
    }

    fn write_physics(&mut self, entity: Handle, physics: Physics) {
        if let Ok(record) = self.store.get_mut::<Entity>(entity) {
            record.physics = physics;
        }
    }

    fn invoke_collision(&mut self, this: Handle, other: Handle, dt: f32) -> bool {
        let Some(callback) = self.callbacks.collision(this) else {
            return false;
        };
        let mut scope = CallbackScope::new(
            &mut self.store,
            self.deferred.get_mut(),
            self.config.hierarchy,
            dt,
        );
        callback(&mut scope, this, other);
        true
    }

    fn invoke_update(&mut self, entity: Handle, dt: f32) -> bool {
        let active = self
            .store
            .get::<Entity>(entity)
            .is_ok_and(|record| record.is_active());
        if !active {
            return false;
        }
        let Some(callback) = self.callbacks.update(entity) else {
            return false;
        };
        let mut scope = CallbackScope::new(
            &mut self.store,
            self.deferred.get_mut(),
            self.config.hierarchy,
            dt,
        );
        callback(&mut scope, entity);
        true
    }

    fn apply_deferred(&mut self) -> usize {
        let mut queue = std::mem::take(self.deferred.get_mut());
        let applied = queue.len();

        for work in queue.drain(..) {
            match work {
                Deferred::Destroy(handle) => {
                    if let Err(error) = self.destroy(handle) {
                        tracing::debug!(%handle, %error, "deferred destroy skipped");
                    }
                }
                Deferred::Apply(edit) => edit(self),
            }
        }

        let pending = self.deferred.get_mut();
        if pending.is_empty() {
            *pending = queue;
        }
        applied
    }
}

fn body_state(physics: &Physics) -> BodyState {
    BodyState {
        inverse_mass: physics.inverse_mass(),
        velocity: physics.velocity,
        bounciness: physics.bounciness,
    }
}
