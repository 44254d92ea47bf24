//! # Scene Lock
//!
//! One reader-writer lock guards the whole scene. The physics thread holds it
//! exclusively for a full tick; callers hold it for a single operation or a
//! batch.
//!
//! ```text
//!   caller thread            physics thread
//!   ─────────────            ──────────────
//!   write_for(250ms) ──┐     write_for(250ms)
//!                      │       step()
//!        (waits)       │       release
//!   ◄──────────────────┘
//!   create/destroy/...
//!   release
//! ```
//!
//! Waits are bounded: a guard that is not obtained in time is reported as
//! [`SceneError::LockTimeout`] instead of blocking forever.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{SceneError, SceneResult};

/// Reader-writer lock with bounded waits and a timeout counter.
///
/// # Example
///
/// ```rust,ignore
/// let lock = SceneLock::new(Scene::new(config)?, Duration::from_millis(250));
/// {
///     let mut scene = lock.write()?;
///     scene.create_transform(Transform::IDENTITY)?;
/// }
/// let count = lock.read()?.counts().transforms;
/// ```
pub struct SceneLock<T> {
    inner: RwLock<T>,
    timeout: Duration,
    timeouts: AtomicU64,
}

impl<T> SceneLock<T> {
    /// Wraps `value`, using `timeout` as the default bounded wait.
    #[must_use]
    pub const fn new(value: T, timeout: Duration) -> Self {
        Self {
            inner: RwLock::new(value),
            timeout,
            timeouts: AtomicU64::new(0),
        }
    }

    /// Default bounded wait.
    #[inline]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Exclusive access, waiting at most the default timeout.
    ///
    /// # Errors
    ///
    /// [`SceneError::LockTimeout`] if the lock stays held.
    #[inline]
    pub fn write(&self) -> SceneResult<RwLockWriteGuard<'_, T>> {
        self.write_for(self.timeout)
    }

    /// Shared access, waiting at most the default timeout.
    ///
    /// # Errors
    ///
    /// [`SceneError::LockTimeout`] if a writer keeps the lock.
    #[inline]
    pub fn read(&self) -> SceneResult<RwLockReadGuard<'_, T>> {
        self.read_for(self.timeout)
    }

    /// Exclusive access, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// [`SceneError::LockTimeout`] if the lock stays held.
    pub fn write_for(&self, timeout: Duration) -> SceneResult<RwLockWriteGuard<'_, T>> {
        self.inner
            .try_write_for(timeout)
            .ok_or_else(|| self.timed_out(timeout, "write"))
    }

    /// Shared access, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// [`SceneError::LockTimeout`] if a writer keeps the lock.
    pub fn read_for(&self, timeout: Duration) -> SceneResult<RwLockReadGuard<'_, T>> {
        self.inner
            .try_read_for(timeout)
            .ok_or_else(|| self.timed_out(timeout, "read"))
    }

    /// Direct access through exclusive ownership; never waits.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Unwraps the value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }

    /// Number of waits that ran out since creation.
    #[inline]
    #[must_use]
    pub fn timeout_count(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Whether some thread currently holds the lock exclusively.
    #[inline]
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.inner.is_locked_exclusive()
    }

    fn timed_out(&self, waited: Duration, mode: &'static str) -> SceneError {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        let waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX);
        tracing::warn!(mode, waited_ms, "scene lock wait timed out");
        SceneError::LockTimeout { waited_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_uncontended_access() {
        let lock = SceneLock::new(5_u32, Duration::from_millis(10));
        *lock.write().unwrap() += 1;
        assert_eq!(*lock.read().unwrap(), 6);
        assert_eq!(lock.timeout_count(), 0);
    }

    #[test]
    fn test_held_writer_times_out_others() {
        let lock = SceneLock::new(0_u32, Duration::from_millis(20));
        let guard = lock.write().unwrap();
        assert!(lock.is_write_locked());

        assert_eq!(
            lock.write().unwrap_err(),
            SceneError::LockTimeout { waited_ms: 20 }
        );
        assert!(lock.read_for(Duration::from_millis(5)).is_err());
        assert_eq!(lock.timeout_count(), 2);

        drop(guard);
        assert!(lock.write().is_ok());
    }

    #[test]
    fn test_readers_share() {
        let lock = SceneLock::new(1_u32, Duration::from_millis(20));
        let a = lock.read().unwrap();
        let b = lock.read().unwrap();
        assert_eq!(*a + *b, 2);
    }

    #[test]
    fn test_cross_thread_timeout() {
        let lock = Arc::new(SceneLock::new(0_u32, Duration::from_millis(10)));
        let guard = lock.write().unwrap();

        let other = Arc::clone(&lock);
        let result = thread::spawn(move || other.write().map(|_| ())).join().unwrap();
        assert!(matches!(result, Err(SceneError::LockTimeout { .. })));

        drop(guard);
        let other = Arc::clone(&lock);
        let result = thread::spawn(move || other.write().map(|mut g| *g = 7)).join().unwrap();
        assert!(result.is_ok());
        assert_eq!(*lock.read().unwrap(), 7);
    }
}
