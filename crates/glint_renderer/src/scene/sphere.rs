//! Sphere primitive.

use super::SurfaceHit;
use glint_math::{Ray, Vec3};

/// Roots closer than this are treated as the surface the ray starts on.
const T_MIN: f32 = 1e-4;

/// A sphere given by center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Analytic ray-sphere intersection.
    ///
    /// Projects `center - origin` onto the ray and keeps the nearer root in
    /// front of the origin. The normal points outward.
    pub fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        if a == 0.0 {
            return None;
        }
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Nearest root in front of the ray
        let mut t = (h - sqrtd) / a;
        if t <= T_MIN {
            t = (h + sqrtd) / a;
            if t <= T_MIN {
                return None;
            }
        }

        let point = ray.at(t);
        let normal = (point - self.center) / self.radius;
        Some(SurfaceHit { t, point, normal })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit_from_outside() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, 10.0), 2.0);
        let origin = Vec3::new(3.0, 4.0, -2.0);
        let ray = Ray::towards(origin, sphere.center);

        let hit = sphere.intersect(&ray).unwrap();
        let expected = origin.distance(sphere.center) - sphere.radius;
        assert!((hit.t - expected).abs() < 1e-4);
        assert!((hit.point.distance(origin) - expected).abs() < 1e-4);

        // Outward normal points back at the ray origin
        let outward = (hit.point - sphere.center).normalize();
        assert!((hit.normal - outward).length() < 1e-5);
        assert!(hit.normal.dot(ray.direction) < 0.0);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5);

        // Ray pointing away from sphere
        assert!(sphere.intersect(&Ray::new(Vec3::ZERO, Vec3::Y)).is_none());
        // Sphere behind the ray
        assert!(sphere.intersect(&Ray::new(Vec3::ZERO, Vec3::Z)).is_none());
    }

    #[test]
    fn test_sphere_hit_from_inside_uses_far_root() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let hit = sphere.intersect(&Ray::new(Vec3::ZERO, Vec3::X)).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_sphere_ignores_surface_origin() {
        // Leaving the surface outward must not report the starting point
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn test_sphere_degenerate_direction() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO);
        assert!(sphere.intersect(&ray).is_none());
    }
}
