//! Axis-aligned bounded planes, used to build box walls.

use super::SurfaceHit;
use glint_math::{Axis, Interval, Ray};

/// A finite axis-aligned rectangle.
///
/// `axis` is the fixed axis and `offset` its coordinate; the two remaining
/// axes (in X, Y, Z order) are limited by `bounds`. The plane is two-sided:
/// the reported normal faces the side the ray came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedPlane {
    pub axis: Axis,
    pub offset: f32,
    pub bounds: [Interval; 2],
}

impl BoundedPlane {
    /// Create a new bounded plane.
    pub fn new(axis: Axis, offset: f32, first: Interval, second: Interval) -> Self {
        Self {
            axis,
            offset,
            bounds: [first, second],
        }
    }

    /// Plane with the same bounds on both free axes.
    pub fn square(axis: Axis, offset: f32, bounds: Interval) -> Self {
        Self::new(axis, offset, bounds, bounds)
    }

    pub fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        let d = self.axis.of(ray.direction);
        if d == 0.0 {
            return None;
        }

        let t = (self.offset - self.axis.of(ray.origin)) / d;
        if !(t >= 0.0) || !t.is_finite() {
            return None;
        }

        let mut point = ray.at(t);
        let (first, second) = self.axis.others();
        if !self.bounds[0].contains(first.of(point)) || !self.bounds[1].contains(second.of(point)) {
            return None;
        }

        // Snap onto the plane to avoid drift off the surface
        point[self.axis.index()] = self.offset;
        let normal = self.axis.unit() * -d.signum();
        Some(SurfaceHit { t, point, normal })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_math::Vec3;

    fn floor() -> BoundedPlane {
        BoundedPlane::square(Axis::Y, -5.0, Interval::new(-5.0, 5.0))
    }

    #[test]
    fn test_plane_hit() {
        let ray = Ray::towards(Vec3::ZERO, Vec3::new(1.0, -5.0, 2.0));
        let hit = floor().intersect(&ray).unwrap();

        assert_eq!(hit.point.y, -5.0);
        assert!((hit.point.x - 1.0).abs() < 1e-5);
        assert!((hit.point.z - 2.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3::Y);
    }

    #[test]
    fn test_plane_parallel_ray_never_hits() {
        let plane = floor();
        for origin in [Vec3::ZERO, Vec3::new(0.0, -5.0, 0.0), Vec3::new(2.0, -7.0, 1.0)] {
            for direction in [Vec3::X, Vec3::Z, Vec3::new(1.0, 0.0, 1.0).normalize()] {
                assert!(plane.intersect(&Ray::new(origin, direction)).is_none());
            }
        }
    }

    #[test]
    fn test_plane_rejects_out_of_bounds_hit() {
        let plane = BoundedPlane::new(
            Axis::Z,
            10.0,
            Interval::new(-5.0, 5.0),
            Interval::new(-1.0, 1.0),
        );
        // x inside, y outside [-1, 1]
        let ray = Ray::towards(Vec3::ZERO, Vec3::new(0.0, 2.0, 10.0));
        assert!(plane.intersect(&ray).is_none());
        // x outside [-5, 5]
        let ray = Ray::towards(Vec3::ZERO, Vec3::new(6.0, 0.0, 10.0));
        assert!(plane.intersect(&ray).is_none());
        // Inside both
        let ray = Ray::towards(Vec3::ZERO, Vec3::new(4.0, 0.5, 10.0));
        assert!(plane.intersect(&ray).is_some());
    }

    #[test]
    fn test_plane_behind_ray() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        assert!(floor().intersect(&ray).is_none());
    }

    #[test]
    fn test_plane_normal_faces_incoming_ray() {
        let wall = BoundedPlane::square(Axis::X, 5.0, Interval::new(-5.0, 5.0));
        let from_inside = wall.intersect(&Ray::new(Vec3::ZERO, Vec3::X)).unwrap();
        assert_eq!(from_inside.normal, Vec3::NEG_X);

        let from_outside = wall
            .intersect(&Ray::new(Vec3::new(8.0, 0.0, 0.0), Vec3::NEG_X))
            .unwrap();
        assert_eq!(from_outside.normal, Vec3::X);
    }
}
