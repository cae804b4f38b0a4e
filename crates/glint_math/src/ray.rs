use crate::Vec3;

/// A ray in 3D space with an origin and a direction.
///
/// Directions produced by the renderer are unit length, but nothing here
/// depends on it: `at(t)` simply walks `t` direction vectors from the origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Create a ray whose direction is normalized.
    ///
    /// A zero-length direction stays zero and will not hit anything.
    pub fn normalized(origin: Vec3, direction: Vec3) -> Self {
        Self::new(origin, direction.normalize_or_zero())
    }

    /// Ray from `from` pointing at `to`.
    pub fn towards(from: Vec3, to: Vec3) -> Self {
        Self::normalized(from, to - from)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// True when the direction is the zero vector.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.direction.length_squared() == 0.0
    }
}
