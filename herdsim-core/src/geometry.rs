use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, PI, SQRT_2, TAU};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Planar vector used for positions, velocities and accelerations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` radians from the +x axis.
    pub fn from_angle(angle: f64) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn norm_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn norm(self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).norm()
    }

    /// Angle of the vector in radians, measured from the +x axis.
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Rotates the vector counterclockwise by `angle` radians.
    pub fn rotated(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Scales the vector down so its magnitude does not exceed `max`.
    pub fn clamp_norm(self, max: f64) -> Self {
        let norm = self.norm();
        if norm > max { self * (max / norm) } else { self }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Vec2) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, scalar: f64) -> Vec2 {
        Vec2::new(self.x * scalar, self.y * scalar)
    }
}

/// Returns true when two circles of equal `radius` overlap.
pub fn circles_intersect(a: Vec2, b: Vec2, radius: f64) -> bool {
    let reach = 2.0 * radius;
    (a - b).norm_squared() < reach * reach
}

/// Absolute difference between two angles, folded into [0, pi].
///
/// `compare_angle(0.1, TAU - 0.1)` is 0.2, not 6.08.
pub fn compare_angle(a: f64, b: f64) -> f64 {
    ((a - b + PI).rem_euclid(TAU) - PI).abs()
}

/// Corners of a square centered at `center` and rotated to `heading`,
/// in adjacent order.
pub fn square_corners(center: Vec2, heading: f64, width: f64) -> [Vec2; 4] {
    let diagonal = width / SQRT_2;
    let offsets = [
        heading - FRAC_PI_4,
        heading - 3.0 * FRAC_PI_4,
        heading + 3.0 * FRAC_PI_4,
        heading + FRAC_PI_4,
    ];
    offsets.map(|angle| center + Vec2::from_angle(angle) * diagonal)
}

/// Returns true when a circle overlaps the segment from `p0` to `p1`.
///
/// Endpoints count only if the perpendicular projection of the center
/// falls within the segment.
pub fn circle_intersects_segment(center: Vec2, radius: f64, p0: Vec2, p1: Vec2) -> bool {
    let segment = p1 - p0;
    let length = segment.norm();
    if length == 0.0 {
        return center.distance(p0) < radius;
    }
    let direction = segment * (1.0 / length);
    let along = direction.dot(center - p0);
    if along < 0.0 || along > length {
        return false;
    }
    let closest = p0 + direction * along;
    closest.distance(center) < radius
}

/// Returns true when a circle overlaps any edge of a rotated square.
pub fn circle_intersects_square(center: Vec2, radius: f64, square: SquareExtent) -> bool {
    let [a, b, c, d] = square_corners(square.center, square.heading, square.width);
    circle_intersects_segment(center, radius, a, b)
        || circle_intersects_segment(center, radius, b, c)
        || circle_intersects_segment(center, radius, c, d)
        || circle_intersects_segment(center, radius, d, a)
}

/// Footprint of a square body in the arena plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquareExtent {
    pub center: Vec2,
    pub heading: f64,
    pub width: f64,
}

impl SquareExtent {
    pub fn new(center: Vec2, heading: f64, width: f64) -> Self {
        Self {
            center,
            heading,
            width,
        }
    }
}
