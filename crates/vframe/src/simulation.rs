//! # Simulation Runtime
//!
//! Owns the shared scene and the physics thread.
//!
//! ```text
//!            Arc<SceneLock<Scene>>
//!           ┌─────────┴──────────┐
//!   caller thread           physics thread ("vframe-physics")
//!   write()/read()          loop {
//!   with_scene(..)            recv_timeout(until next tick) ── stop? ─► exit
//!                             for each due tick:
//!                               write() → scene.tick()
//!                           }
//! ```
//!
//! Shutdown order: signal the thread, join it, then take the write side once
//! more so no guard is outstanding when the scene is released.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use vframe_core::{SceneConfig, SceneError, SceneLock, SceneResult};

use crate::scene::Scene;
use crate::tick_loop::{TickLoop, TickStats};

struct PhysicsThread {
    stop: Sender<()>,
    handle: JoinHandle<TickStats>,
}

/// A scene shared with its physics thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = Simulation::new(SceneConfig::default())?;
/// let ball = sim.with_scene(|scene| scene.create_entity(EntityDesc::default()))??;
/// sim.start_physics()?;
/// // ...
/// let scene = sim.read()?;
/// let position = scene.world_position(scene.get::<Entity>(ball)?.transform)?;
/// drop(scene);
/// sim.shutdown()?;
/// ```
pub struct Simulation {
    scene: Arc<SceneLock<Scene>>,
    physics: Option<PhysicsThread>,
    last_tick_stats: Option<TickStats>,
}

impl Simulation {
    /// Builds the scene and its lock. The physics thread is not started.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: SceneConfig) -> SceneResult<Self> {
        let timeout = config.lock.timeout();
        let scene = Scene::new(config)?;
        Ok(Self::from_scene(scene, timeout))
    }

    /// Wraps an existing scene.
    #[must_use]
    pub fn from_scene(scene: Scene, lock_timeout: Duration) -> Self {
        Self {
            scene: Arc::new(SceneLock::new(scene, lock_timeout)),
            physics: None,
            last_tick_stats: None,
        }
    }

    /// The shared lock, for callers that hand it to other threads.
    #[must_use]
    pub fn shared(&self) -> Arc<SceneLock<Scene>> {
        Arc::clone(&self.scene)
    }

    /// Exclusive access with the configured bounded wait.
    ///
    /// # Errors
    ///
    /// [`SceneError::LockTimeout`] if the lock stays held.
    pub fn write(&self) -> SceneResult<RwLockWriteGuard<'_, Scene>> {
        self.scene.write()
    }

    /// Shared access with the configured bounded wait. Enough for rendering.
    ///
    /// # Errors
    ///
    /// [`SceneError::LockTimeout`] if a writer keeps the lock.
    pub fn read(&self) -> SceneResult<RwLockReadGuard<'_, Scene>> {
        self.scene.read()
    }

    /// Runs `f` with exclusive access.
    ///
    /// # Errors
    ///
    /// [`SceneError::LockTimeout`] if the lock stays held.
    pub fn with_scene<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> SceneResult<R> {
        let mut scene = self.scene.write()?;
        Ok(f(&mut scene))
    }

    /// Pauses or resumes physics without stopping the thread.
    ///
    /// # Errors
    ///
    /// [`SceneError::LockTimeout`] if the lock stays held.
    pub fn set_physics_enabled(&self, enabled: bool) -> SceneResult<()> {
        self.scene.write()?.set_physics_enabled(enabled);
        Ok(())
    }

    /// Number of bounded waits that ran out, from any thread.
    #[must_use]
    pub fn lock_timeouts(&self) -> u64 {
        self.scene.timeout_count()
    }

    /// Whether the physics thread is running.
    #[must_use]
    pub const fn is_physics_running(&self) -> bool {
        self.physics.is_some()
    }

    /// Tick statistics of the last physics thread that was stopped.
    #[must_use]
    pub const fn last_tick_stats(&self) -> Option<TickStats> {
        self.last_tick_stats
    }

    /// Starts the physics thread. Does nothing if it is already running.
    ///
    /// # Errors
    ///
    /// - [`SceneError::LockTimeout`] if the tick rate could not be read
    /// - [`SceneError::InvalidConfig`] if the thread could not be spawned
    pub fn start_physics(&mut self) -> SceneResult<()> {
        if self.physics.is_some() {
            return Ok(());
        }

        let tick_duration = self.scene.read()?.config().physics.tick_duration();
        let (stop, stopped) = bounded::<()>(1);
        let scene = Arc::clone(&self.scene);

        let handle = thread::Builder::new()
            .name("vframe-physics".into())
            .spawn(move || {
                let mut tick_loop = TickLoop::new(tick_duration);
                tracing::info!(?tick_duration, "physics thread started");

                loop {
                    match stopped.recv_timeout(tick_loop.until_next_tick()) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    for _ in 0..tick_loop.poll() {
                        let start = tick_loop.begin_tick();
                        match scene.write() {
                            Ok(mut scene) => {
                                scene.tick();
                            }
                            Err(error) => {
                                tracing::warn!(%error, "physics tick skipped");
                            }
                        }
                        tick_loop.end_tick(start);
                    }
                }

                let stats = *tick_loop.stats();
                tracing::info!(ticks = tick_loop.tick_count(), "physics thread stopped");
                stats
            })
            .map_err(|e| SceneError::InvalidConfig(format!("physics thread: {e}")))?;

        self.physics = Some(PhysicsThread { stop, handle });
        Ok(())
    }

    /// Stops and joins the physics thread. Returns its tick statistics, or
    /// `None` if it was not running or panicked.
    pub fn stop_physics(&mut self) -> Option<TickStats> {
        let PhysicsThread { stop, handle } = self.physics.take()?;
        let _ = stop.send(());
        match handle.join() {
            Ok(stats) => {
                self.last_tick_stats = Some(stats);
                Some(stats)
            }
            Err(_) => {
                tracing::warn!("physics thread panicked");
                None
            }
        }
    }

    /// Stops physics and confirms no guard is still held before the scene is
    /// released.
    ///
    /// # Errors
    ///
    /// [`SceneError::LockTimeout`] if another holder keeps the lock.
    pub fn shutdown(mut self) -> SceneResult<()> {
        self.stop_physics();
        drop(self.scene.write()?);
        Ok(())
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.stop_physics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::EntityDesc;
    use vframe_core::{Entity, Physics};
    use vframe_shared::Vector;

    fn fast_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.physics.tick_rate = 500;
        config.lock.timeout_ms = 50;
        config
    }

    #[test]
    fn test_physics_thread_advances_scene() {
        let mut sim = Simulation::new(fast_config()).unwrap();
        let ball = sim
            .with_scene(|scene| {
                let ball = scene.create_entity(EntityDesc::new(Physics::new(0.0, 0.0, 1.0)))?;
                scene.set_velocity(ball, Vector::new(1.0, 0.0))?;
                SceneResult::Ok(ball)
            })
            .unwrap()
            .unwrap();

        sim.start_physics().unwrap();
        assert!(sim.is_physics_running());
        thread::sleep(Duration::from_millis(60));
        let stats = sim.stop_physics().unwrap();
        assert!(stats.total_ticks > 0);

        let scene = sim.read().unwrap();
        let transform = scene.get::<Entity>(ball).unwrap().transform;
        assert!(scene.world_position(transform).unwrap().x > 0.0);
        assert_eq!(scene.stats().ticks, stats.total_ticks);
    }

    #[test]
    fn test_disabled_physics_keeps_state() {
        let mut sim = Simulation::new(fast_config()).unwrap();
        sim.set_physics_enabled(false).unwrap();
        sim.start_physics().unwrap();
        thread::sleep(Duration::from_millis(20));
        sim.stop_physics();
        assert_eq!(sim.read().unwrap().stats().ticks, 0);
    }

    #[test]
    fn test_held_guard_times_out_caller() {
        let sim = Simulation::new(fast_config()).unwrap();
        let shared = sim.shared();
        let guard = shared.write().unwrap();

        assert!(matches!(sim.read(), Err(SceneError::LockTimeout { .. })));
        assert!(matches!(
            sim.with_scene(|_| ()),
            Err(SceneError::LockTimeout { waited_ms: 50 })
        ));
        assert_eq!(sim.lock_timeouts(), 2);
        drop(guard);
        assert!(sim.read().is_ok());
    }

    #[test]
    fn test_shutdown_joins_thread() {
        let mut sim = Simulation::new(fast_config()).unwrap();
        sim.start_physics().unwrap();
        sim.start_physics().unwrap();
        assert!(sim.shutdown().is_ok());
    }
}
