//! Rectangular area light facing down the -Y axis.

use crate::material::Color;
use crate::sampling::{cosine_hemisphere, gen_f32};
use glint_math::{Interval, Vec3};
use rand::RngCore;

/// A horizontal rectangle that emits light downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaLight {
    /// Extent along X
    pub x: Interval,
    /// Extent along Z
    pub z: Interval,
    /// Height of the emitting rectangle
    pub y: f32,
    /// Emitted color (0-1)
    pub color: Color,
}

impl Default for AreaLight {
    fn default() -> Self {
        Self {
            x: Interval::new(-1.0, 1.0),
            z: Interval::new(3.0, 5.0),
            y: 4.95,
            color: Color::splat(0.6),
        }
    }
}

impl AreaLight {
    pub fn new(x: Interval, z: Interval, y: f32, color: Color) -> Self {
        Self { x, z, y, color }
    }

    /// Uniform point on the rectangle.
    pub fn sample_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        let x = self.x.lerp(gen_f32(rng));
        let z = self.z.lerp(gen_f32(rng));
        Vec3::new(x, self.y, z)
    }

    /// Cosine-weighted emission direction about the downward normal.
    ///
    /// `downward_bias` scales the cosine term before normalizing; values above
    /// 1 aim more photons straight down at the scene.
    pub fn sample_direction(&self, downward_bias: f32, rng: &mut dyn RngCore) -> Vec3 {
        let local = cosine_hemisphere(rng);
        Vec3::new(local.x, -downward_bias * local.y, local.z).normalize_or_zero()
    }

    /// True if `p` lies above the aperture, inside its rectangle.
    pub fn contains(&self, p: Vec3) -> bool {
        p.y > self.y && self.x.surrounds(p.x) && self.z.surrounds(p.z)
    }

    /// Photon power derived from the light color, alpha opaque.
    pub fn photon_power(&self) -> [u8; 4] {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [
            channel(self.color.x),
            channel(self.color.y),
            channel(self.color.z),
            255,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_point_inside_rectangle() {
        let light = AreaLight::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let p = light.sample_point(&mut rng);
            assert!(light.x.contains(p.x));
            assert!(light.z.contains(p.z));
            assert_eq!(p.y, light.y);
        }
    }

    #[test]
    fn test_sample_direction_points_down() {
        let light = AreaLight::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut global_down = 0.0;
        let mut caustic_down = 0.0;
        for _ in 0..2000 {
            let d = light.sample_direction(1.0, &mut rng);
            assert!(d.y <= 0.0);
            assert!((d.length() - 1.0).abs() < 1e-4);
            global_down += -d.y;
            caustic_down += -light.sample_direction(2.0, &mut rng).y;
        }
        // The biased distribution is tighter around the normal
        assert!(caustic_down > global_down);
    }

    #[test]
    fn test_contains() {
        let light = AreaLight::default();
        assert!(light.contains(Vec3::new(0.0, 5.0, 4.0)));
        assert!(!light.contains(Vec3::new(0.0, 4.0, 4.0)));
        assert!(!light.contains(Vec3::new(2.0, 5.0, 4.0)));
        assert!(!light.contains(Vec3::new(0.0, 5.0, 6.0)));
    }

    #[test]
    fn test_photon_power() {
        assert_eq!(AreaLight::default().photon_power(), [153, 153, 153, 255]);
    }
}
