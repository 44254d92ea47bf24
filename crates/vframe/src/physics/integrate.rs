//! # Integration
//!
//! Per-body drag and explicit Euler integration. Drag is a per-tick fraction,
//! applied before the position update.
//!
//! Velocity is a world-space quantity, the same frame collision impulses
//! work in. Integration yields a world displacement; the scene converts it
//! into the parent's frame before writing the local transform.

use vframe_core::{Physics, PhysicsConfig};
use vframe_shared::Vector;

/// Movement of one body over one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Motion {
    /// World-space displacement.
    pub displacement: Vector,
    /// Rotation change in radians. Zero for rotation-locked bodies.
    pub spin: f32,
}

/// Applies drag to linear and angular velocity.
///
/// Angular velocity is decayed, clamped to `max_angular_velocity` and snapped
/// to zero under `min_velocity`. Linear velocity is only decayed.
#[inline]
pub fn apply_drag(physics: &mut Physics, config: &PhysicsConfig) {
    let keep = (1.0 - physics.drag).clamp(0.0, 1.0);
    physics.velocity = physics.velocity * keep;

    let limit = config.max_angular_velocity;
    let torque = (physics.torque * keep).clamp(-limit, limit);
    physics.torque = if torque.abs() < config.min_velocity {
        0.0
    } else {
        torque
    };
}

/// Advances a moveable body by one tick.
///
/// # Arguments
///
/// * `physics` - Body state, velocity decayed in place
/// * `dt` - Seconds per tick
/// * `config` - Velocity limits
#[must_use]
pub fn integrate(physics: &mut Physics, dt: f32, config: &PhysicsConfig) -> Motion {
    apply_drag(physics, config);

    Motion {
        displacement: physics.velocity * dt,
        spin: if physics.is_rotation_locked() {
            0.0
        } else {
            physics.torque * dt
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_drag_free_advances_exactly() {
        let config = PhysicsConfig::default();
        let mut physics = Physics::new(0.0, 0.0, 1.0);
        physics.velocity = Vector::new(3.0, -1.5);

        let motion = integrate(&mut physics, 0.5, &config);
        assert_eq!(motion.displacement, Vector::new(1.5, -0.75));
        assert_eq!(physics.velocity, Vector::new(3.0, -1.5));
    }

    #[test]
    fn test_drag_decays_velocity() {
        let config = PhysicsConfig::default();
        let mut physics = Physics::new(0.0, 0.25, 1.0);
        physics.velocity = Vector::new(4.0, 0.0);
        physics.torque = 2.0;

        apply_drag(&mut physics, &config);
        assert_relative_eq!(physics.velocity.x, 3.0);
        assert_relative_eq!(physics.torque, 1.5);
    }

    #[test]
    fn test_torque_clamped_and_snapped() {
        let config = PhysicsConfig {
            max_angular_velocity: 10.0,
            min_velocity: 0.1,
            ..PhysicsConfig::default()
        };
        let mut physics = Physics::new(0.0, 0.0, 1.0);

        physics.torque = -50.0;
        apply_drag(&mut physics, &config);
        assert_eq!(physics.torque, -10.0);

        physics.torque = 0.05;
        apply_drag(&mut physics, &config);
        assert_eq!(physics.torque, 0.0);
    }

    #[test]
    fn test_rotation_lock() {
        let config = PhysicsConfig::default();
        let mut physics = Physics::with_flags(0.0, 0.0, 1.0, true, true);
        physics.torque = 1.0;
        assert_eq!(integrate(&mut physics, 1.0, &config).spin, 0.0);

        physics.set_rotation_lock(false);
        assert_eq!(integrate(&mut physics, 1.0, &config).spin, 1.0);
    }
}
