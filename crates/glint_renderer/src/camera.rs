//! Pinhole camera looking down +Z through the z = 0 view plane.

use crate::sampling::gen_f32;
use crate::settings::RenderSettings;
use glint_math::{Ray, Vec3};
use rand::RngCore;

/// Generates primary rays for a render target.
///
/// Row 0 is the bottom of the image; rows are flipped when the target is
/// downsampled for output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    eye: Vec3,
    /// Size of one target pixel on the view plane
    pixel_size: f32,
    /// Target dimensions in pixels
    width: usize,
    height: usize,
}

impl Camera {
    /// Create a camera at `eye` whose view plane spans `view_width` units.
    pub fn new(eye: Vec3, view_width: f32, width: usize, height: usize) -> Self {
        Self {
            eye,
            pixel_size: view_width / width.max(1) as f32,
            width,
            height,
        }
    }

    /// Camera for the supersampled target described by `settings`.
    pub fn from_settings(settings: &RenderSettings) -> Self {
        let (width, height) = settings.target_size();
        Self::new(settings.eye_position(), settings.view_width, width, height)
    }

    /// Point on the view plane for target pixel `(x, y)` at sub-pixel offset `(u, v)`.
    pub fn view_point(&self, x: usize, y: usize, u: f32, v: f32) -> Vec3 {
        let px = (x as f32 + u - self.width as f32 * 0.5) * self.pixel_size;
        let py = (y as f32 + v - self.height as f32 * 0.5) * self.pixel_size;
        Vec3::new(px, py, 0.0)
    }

    /// Ray through a jittered point inside a target pixel.
    pub fn get_ray(&self, x: usize, y: usize, rng: &mut dyn RngCore) -> Ray {
        let u = gen_f32(rng);
        let v = gen_f32(rng);
        Ray::towards(self.eye, self.view_point(x, y, u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_middle_ray_points_down_z() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, -12.0), 20.0, 100, 50);
        let mut rng = StdRng::seed_from_u64(1);
        // Pixel (50, 25) starts at the view plane origin
        let ray = camera.get_ray(50, 25, &mut rng);
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, -12.0));
        assert!(ray.direction.z > 0.99);
        assert!((ray.direction.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_view_plane_spans_view_width() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, -12.0), 20.0, 100, 50);
        let left = camera.view_point(0, 0, 0.0, 0.0);
        let right = camera.view_point(100, 0, 0.0, 0.0);
        assert!((right.x - left.x - 20.0).abs() < 1e-4);
        assert!((left.x + 10.0).abs() < 1e-4);
        // Row 0 is the bottom
        assert!((left.y + 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_jitter_stays_inside_pixel() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, -12.0), 20.0, 10, 10);
        let mut rng = StdRng::seed_from_u64(3);
        let lo = camera.view_point(3, 7, 0.0, 0.0);
        let hi = camera.view_point(3, 7, 1.0, 1.0);
        for _ in 0..100 {
            let ray = camera.get_ray(3, 7, &mut rng);
            // Intersect with z = 0
            let t = -ray.origin.z / ray.direction.z;
            let p = ray.at(t);
            assert!(p.x >= lo.x - 1e-4 && p.x <= hi.x + 1e-4);
            assert!(p.y >= lo.y - 1e-4 && p.y <= hi.y + 1e-4);
        }
    }
}
