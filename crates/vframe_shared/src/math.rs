//! Plain 2D value types.
//!
//! Rotations are in radians throughout the kernel.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 2D Vector - positions, offsets, dimensions, velocities
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vector {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vector {
    /// Creates a new Vector
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Rotates counter-clockwise by `angle` radians.
    #[must_use]
    pub fn rotated(self, angle: f32) -> Self {
        if angle == 0.0 {
            return self;
        }
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Returns this vector shortened to at most `max` length.
    #[must_use]
    pub fn clamp_length(self, max: f32) -> Self {
        let len_sq = self.length_squared();
        if len_sq <= max * max || len_sq == 0.0 {
            return self;
        }
        self * (max / len_sq.sqrt())
    }
}

impl std::ops::Add for Vector {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vector {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vector {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::SubAssign for Vector {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::ops::Mul<f32> for Vector {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// RGBA color bias. Components are expected in 0-255 but never clamped.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Color {
    /// Red
    pub r: i32,
    /// Green
    pub g: i32,
    /// Blue
    pub b: i32,
    /// Alpha
    pub a: i32,
}

impl Color {
    /// Creates a new color
    #[must_use]
    pub const fn new(r: i32, g: i32, b: i32, a: i32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque white, the neutral bias.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Axis-aligned rectangle in world space.
///
/// `position` is the minimum corner, `dimensions` the extent along each axis.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum corner
    pub position: Vector,
    /// Width and height
    pub dimensions: Vector,
}

impl Rect {
    /// Creates a new rectangle
    #[must_use]
    pub const fn new(position: Vector, dimensions: Vector) -> Self {
        Self { position, dimensions }
    }

    /// Maximum corner
    #[must_use]
    pub fn max(self) -> Vector {
        self.position + self.dimensions
    }

    /// Center point
    #[must_use]
    pub fn center(self) -> Vector {
        self.position + self.dimensions * 0.5
    }

    /// Checks if this rectangle overlaps another. Touching edges do not count.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        let (a_max, b_max) = (self.max(), other.max());
        self.position.x < b_max.x
            && a_max.x > other.position.x
            && self.position.y < b_max.y
            && a_max.y > other.position.y
    }

    /// Returns the overlap amount on each axis. Positive = overlap, Negative = gap.
    #[must_use]
    pub fn overlap(self, other: Self) -> Vector {
        let (a_max, b_max) = (self.max(), other.max());
        Vector::new(
            a_max.x.min(b_max.x) - self.position.x.max(other.position.x),
            a_max.y.min(b_max.y) - self.position.y.max(other.position.y),
        )
    }
}
