//! # Scene Configuration
//!
//! Every tunable of the kernel in one place. Loaded once at startup, usually
//! from a TOML file; any missing section or key falls back to the defaults in
//! `vframe_shared::constants`.
//!
//! ```toml
//! [buffers]
//! initial_capacity = 96
//! increment = 48
//!
//! [physics]
//! tick_rate = 120
//! max_pushback = 2.0
//!
//! [[allocator.tanks]]
//! field_size = 32
//! field_count = 512
//! tanks = 2
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vframe_shared::constants::{
    BUFFER_SIZE_INCREMENT, BUFFER_SIZE_INIT, DEFAULT_LOCK_TIMEOUT_MS,
    DEFAULT_MAX_ANGULAR_VELOCITY, DEFAULT_MAX_PUSHBACK, DEFAULT_MIN_VELOCITY, DEFAULT_TICK_RATE,
    MAX_CHILDREN, PARENT_SEARCH_THRESHOLD,
};

use crate::error::{SceneError, SceneResult};
use crate::memory::{default_layout, TankClass};

/// Object buffer sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Slots reserved per buffer at creation.
    pub initial_capacity: usize,
    /// Slots added when a buffer is full.
    pub increment: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            initial_capacity: BUFFER_SIZE_INIT,
            increment: BUFFER_SIZE_INCREMENT,
        }
    }
}

/// Transform hierarchy limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Parent links followed before a chain is treated as rooted.
    pub parent_search_threshold: usize,
    /// Most children a single children query reports.
    pub max_children: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            parent_search_threshold: PARENT_SEARCH_THRESHOLD,
            max_children: MAX_CHILDREN,
        }
    }
}

/// Tank allocator layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Size classes.
    pub tanks: Vec<TankClass>,
    /// Heap bytes tolerated before overflow allocations are reported.
    pub overflow_budget: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            tanks: default_layout(),
            overflow_budget: 1 << 20,
        }
    }
}

/// Physics tick tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Ticks per second.
    pub tick_rate: u32,
    /// Largest displacement one collision may apply to one body.
    pub max_pushback: f32,
    /// Angular velocity under which rotation snaps to rest.
    pub min_velocity: f32,
    /// Angular velocity magnitude cap.
    pub max_angular_velocity: f32,
}

impl PhysicsConfig {
    /// Seconds per tick.
    #[must_use]
    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Wall-clock duration of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate.max(1)))
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_pushback: DEFAULT_MAX_PUSHBACK,
            min_velocity: DEFAULT_MIN_VELOCITY,
            max_angular_velocity: DEFAULT_MAX_ANGULAR_VELOCITY,
        }
    }
}

/// Scene lock tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Bounded wait for the scene lock, in milliseconds.
    pub timeout_ms: u64,
}

impl LockConfig {
    /// Bounded wait as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

/// Complete scene configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Object buffer sizing.
    pub buffers: BufferConfig,
    /// Hierarchy limits.
    pub hierarchy: HierarchyConfig,
    /// Allocator layout.
    pub allocator: AllocatorConfig,
    /// Physics tuning.
    pub physics: PhysicsConfig,
    /// Lock tuning.
    pub lock: LockConfig,
}

impl SceneConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidConfig`] on parse failure or invalid values.
    pub fn from_toml_str(source: &str) -> SceneResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| SceneError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidConfig`] if serialization fails.
    pub fn to_toml_string(&self) -> SceneResult<String> {
        toml::to_string(self).map_err(|e| SceneError::InvalidConfig(e.to_string()))
    }

    /// Checks every value the kernel cannot run with.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> SceneResult<()> {
        let invalid = |key: &str| Err(SceneError::InvalidConfig(format!("{key} is out of range")));

        if self.buffers.increment == 0 {
            return invalid("buffers.increment");
        }
        if self.hierarchy.parent_search_threshold == 0 {
            return invalid("hierarchy.parent_search_threshold");
        }
        if self.physics.tick_rate == 0 {
            return invalid("physics.tick_rate");
        }
        if !(self.physics.max_pushback > 0.0) {
            return invalid("physics.max_pushback");
        }
        if !(self.physics.min_velocity >= 0.0) {
            return invalid("physics.min_velocity");
        }
        if !(self.physics.max_angular_velocity > self.physics.min_velocity) {
            return invalid("physics.max_angular_velocity");
        }
        if self.lock.timeout_ms == 0 {
            return invalid("lock.timeout_ms");
        }
        if self.allocator.tanks.iter().map(|c| c.tanks).sum::<usize>() > u16::MAX as usize {
            return invalid("allocator.tanks");
        }
        if self.allocator.tanks.iter().any(|c| c.field_count > u32::MAX as usize) {
            return invalid("allocator.tanks.field_count");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = SceneConfig::default();
        assert_eq!(config.buffers.initial_capacity, 0x60);
        assert_eq!(config.buffers.increment, 0x30);
        assert_eq!(config.hierarchy.parent_search_threshold, 0x20);
        assert_eq!(config.hierarchy.max_children, 0x10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SceneConfig::from_toml_str(
            r"
            [physics]
            tick_rate = 120

            [[allocator.tanks]]
            field_size = 32
            field_count = 8
            tanks = 1
            ",
        )
        .unwrap();
        assert_eq!(config.physics.tick_rate, 120);
        assert_eq!(config.physics.max_pushback, DEFAULT_MAX_PUSHBACK);
        assert_eq!(config.allocator.tanks, vec![TankClass::new(32, 8, 1)]);
        assert_eq!(config.buffers, BufferConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SceneConfig::from_toml_str("[physics]\ntick_rate = 0\n").unwrap_err();
        assert_eq!(
            err,
            SceneError::InvalidConfig("physics.tick_rate is out of range".into())
        );
        assert!(SceneConfig::from_toml_str("[buffers]\nincrement = 0\n").is_err());
        assert!(SceneConfig::from_toml_str("not = [valid").is_err());
    }

    #[test]
    fn test_toml_roundtrip_defaults() {
        let text = SceneConfig::default().to_toml_string().unwrap();
        assert_eq!(SceneConfig::from_toml_str(&text).unwrap(), SceneConfig::default());
    }

    #[test]
    fn test_tick_duration() {
        let physics = PhysicsConfig::default();
        assert_eq!(physics.tick_duration(), Duration::from_micros(16_666));
        assert!((physics.delta_time() - 1.0 / 60.0).abs() < f32::EPSILON);
    }
}
