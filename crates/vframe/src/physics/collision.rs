//! # Collision
//!
//! Axis-aligned detection and pushback between two bounds.
//!
//! ```text
//!   ┌───────┐
//!   │   A ┌─┼─────┐        overlap.x < overlap.y
//!   │     │▒│  B  │   ──►  normal = +X (A toward B)
//!   └─────┼─┘     │        depth  = overlap.x
//!         └───────┘
//! ```
//!
//! Rotation never enters: bounds stay axis-aligned whatever the body rotation.

use vframe_shared::{Rect, Vector};

/// Overlap between two rectangles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Unit axis of least penetration, pointing from the first rect to the second.
    pub normal: Vector,
    /// Penetration along `normal`.
    pub depth: f32,
}

/// The parts of a body the resolver reads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    /// Zero for immovable bodies.
    pub inverse_mass: f32,
    /// Linear velocity.
    pub velocity: Vector,
    /// Restitution.
    pub bounciness: f32,
}

/// Corrections for one contact.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Resolution {
    /// Displacement of the first body.
    pub push_a: Vector,
    /// Displacement of the second body.
    pub push_b: Vector,
    /// Impulse applied to the second body; the first receives its negation.
    pub impulse: Vector,
}

/// Tests two rectangles for overlap. Touching edges do not count.
#[must_use]
pub fn detect(a: Rect, b: Rect) -> Option<Contact> {
    if !a.intersects(b) {
        return None;
    }

    let overlap = a.overlap(b);
    let toward = b.center() - a.center();
    let contact = if overlap.x < overlap.y {
        Contact {
            normal: Vector::new(if toward.x < 0.0 { -1.0 } else { 1.0 }, 0.0),
            depth: overlap.x,
        }
    } else {
        Contact {
            normal: Vector::new(0.0, if toward.y < 0.0 { -1.0 } else { 1.0 }),
            depth: overlap.y,
        }
    };
    Some(contact)
}

/// Splits the pushback by inverse mass and computes the bounce impulse.
///
/// # Arguments
///
/// * `contact` - Result of [`detect`] for `a` against `b`
/// * `a`, `b` - The two bodies
/// * `max_pushback` - Cap on each body's displacement
///
/// Two immovable bodies get an empty resolution. The impulse is only non-zero
/// when the bodies approach each other along the normal.
#[must_use]
pub fn resolve(contact: Contact, a: BodyState, b: BodyState, max_pushback: f32) -> Resolution {
    let total = a.inverse_mass + b.inverse_mass;
    if total <= 0.0 {
        return Resolution::default();
    }

    let share_a = contact.depth * a.inverse_mass / total;
    let share_b = contact.depth * b.inverse_mass / total;
    let push_a = (contact.normal * -share_a).clamp_length(max_pushback);
    let push_b = (contact.normal * share_b).clamp_length(max_pushback);

    let approach = (b.velocity - a.velocity).dot(contact.normal);
    let impulse = if approach < 0.0 {
        let restitution = (a.bounciness + b.bounciness) * 0.5;
        contact.normal * (-(1.0 + restitution) * approach / total)
    } else {
        Vector::ZERO
    };

    Resolution {
        push_a,
        push_b,
        impulse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn body(inverse_mass: f32, vx: f32, bounciness: f32) -> BodyState {
        BodyState {
            inverse_mass,
            velocity: Vector::new(vx, 0.0),
            bounciness,
        }
    }

    fn square(x: f32, y: f32) -> Rect {
        Rect::new(Vector::new(x, y), Vector::new(2.0, 2.0))
    }

    #[test]
    fn test_detect_least_penetration_axis() {
        let contact = detect(square(0.0, 0.0), square(1.5, 0.2)).unwrap();
        assert_eq!(contact.normal, Vector::X);
        assert_relative_eq!(contact.depth, 0.5);

        let contact = detect(square(0.0, 0.0), square(0.2, -1.5)).unwrap();
        assert_eq!(contact.normal, Vector::new(0.0, -1.0));
        assert_relative_eq!(contact.depth, 0.5);
    }

    #[test]
    fn test_touching_edges_do_not_collide() {
        assert!(detect(square(0.0, 0.0), square(2.0, 0.0)).is_none());
        assert!(detect(square(0.0, 0.0), square(5.0, 5.0)).is_none());
    }

    #[test]
    fn test_equal_mass_split_is_antisymmetric() {
        let contact = detect(square(0.0, 0.0), square(1.5, 0.0)).unwrap();
        let resolution = resolve(contact, body(1.0, 1.0, 0.0), body(1.0, -1.0, 0.0), 10.0);

        assert_relative_eq!(resolution.push_a.x, -0.25);
        assert_relative_eq!(resolution.push_b.x, 0.25);
        assert_eq!(resolution.push_a, -resolution.push_b);
        assert_relative_eq!(resolution.impulse.x, 1.0);
    }

    #[test]
    fn test_pushback_capped() {
        let contact = detect(square(0.0, 0.0), square(0.2, 0.0)).unwrap();
        let resolution = resolve(contact, body(1.0, 0.0, 0.0), body(1.0, 0.0, 0.0), 0.5);
        assert_relative_eq!(resolution.push_a.x, -0.5);
        assert_relative_eq!(resolution.push_b.x, 0.5);
    }

    #[test]
    fn test_immovable_takes_no_share() {
        let contact = detect(square(0.0, 0.0), square(1.0, 0.0)).unwrap();
        let resolution = resolve(contact, body(0.0, 0.0, 1.0), body(0.5, -2.0, 1.0), 10.0);
        assert_eq!(resolution.push_a, Vector::ZERO);
        assert_relative_eq!(resolution.push_b.x, 1.0);
        // Full bounce off a wall: velocity change of 4 for mass 2.
        assert_relative_eq!(resolution.impulse.x * 0.5, 4.0);
    }

    #[test]
    fn test_both_immovable_is_empty() {
        let contact = detect(square(0.0, 0.0), square(1.0, 0.0)).unwrap();
        let resolution = resolve(contact, body(0.0, 1.0, 1.0), body(0.0, -1.0, 1.0), 10.0);
        assert_eq!(resolution, Resolution::default());
    }

    #[test]
    fn test_separating_bodies_get_no_impulse() {
        let contact = detect(square(0.0, 0.0), square(1.5, 0.0)).unwrap();
        let resolution = resolve(contact, body(1.0, -1.0, 1.0), body(1.0, 1.0, 1.0), 10.0);
        assert_eq!(resolution.impulse, Vector::ZERO);
    }
}
