//! Distributed recursive ray tracing over the photon maps.
//!
//! At every hit the transmissive, specular and absorbing responses of the
//! material are all evaluated and blended by their probabilities. The
//! absorbing response is the local radiance estimate: global illumination
//! and caustics from the photon maps plus direct light from shadow rays.

use std::f32::consts::PI;

use crate::kdtree::{KdTree, NearestPhotons};
use crate::material::{Color, Material};
use crate::photon::{facing, SURFACE_EPSILON};
use crate::sampling::{reflect, refract};
use crate::scene::{AreaLight, Hit, ObjectId, Scene};
use crate::settings::RenderSettings;
use glint_math::{Ray, Vec3};
use rand::RngCore;

/// Squared offset from the tangent plane beyond which a photon is ignored.
const TANGENT_PLANE_TOLERANCE: f32 = 0.1;

/// Added to caustic photon power so caustics stay close to white.
const CAUSTIC_POWER_BOOST: f32 = 0.3;

/// Weight of the cosine term of direct light.
const DIRECT_DIFFUSE_WEIGHT: f32 = 0.2;

/// Weight of the Blinn-Phong highlight.
const DIRECT_SPECULAR_WEIGHT: f32 = 0.3;

/// Which photon map a density estimate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Estimate {
    Global,
    Caustic,
}

impl Estimate {
    /// Radial falloff for a photon at `ratio = d² / r²`.
    fn filter(self, ratio: f32) -> f32 {
        let falloff = 1.0 - ratio;
        match self {
            Estimate::Global => falloff.powi(2),
            Estimate::Caustic => falloff.powi(4),
        }
    }

    /// Normalization for a gather disc of squared radius `r2`.
    fn area(self, r2: f32) -> f32 {
        match self {
            Estimate::Global => 2.0 * PI * r2,
            Estimate::Caustic => 8.0 * PI * r2,
        }
    }

    fn power(self, photon: [u8; 4]) -> Color {
        let power = Color::new(photon[0] as f32, photon[1] as f32, photon[2] as f32) / 255.0;
        match self {
            Estimate::Global => power,
            Estimate::Caustic => (power + Color::splat(CAUSTIC_POWER_BOOST)).min(Color::ONE),
        }
    }
}

/// Per-thread buffers reused across shading points.
#[derive(Debug)]
pub struct TraceScratch {
    global: NearestPhotons,
    caustic: NearestPhotons,
}

impl TraceScratch {
    pub fn new(global: usize, caustic: usize) -> Self {
        Self {
            global: NearestPhotons::new(global),
            caustic: NearestPhotons::new(caustic),
        }
    }
}

/// Everything needed to shade a ray. Read-only, shared by all workers.
#[derive(Debug, Clone, Copy)]
pub struct Tracer<'a> {
    scene: &'a Scene,
    light: &'a AreaLight,
    global: &'a KdTree,
    caustic: &'a KdTree,
    settings: &'a RenderSettings,
}

impl<'a> Tracer<'a> {
    pub fn new(
        scene: &'a Scene,
        light: &'a AreaLight,
        global: &'a KdTree,
        caustic: &'a KdTree,
        settings: &'a RenderSettings,
    ) -> Self {
        Self {
            scene,
            light,
            global,
            caustic,
            settings,
        }
    }

    /// Scratch buffers sized for this tracer's estimates.
    pub fn scratch(&self) -> TraceScratch {
        TraceScratch::new(
            self.settings.photons_in_estimate,
            self.settings.caustic_photons_in_estimate,
        )
    }

    /// Color seen along `ray`.
    ///
    /// `depth` counts the recursion so far; past `max_depth` the background is
    /// returned, which bounds recursion between facing mirrors.
    pub fn trace_ray(
        &self,
        ray: &Ray,
        exclude: Option<ObjectId>,
        depth: u32,
        rng: &mut dyn RngCore,
        scratch: &mut TraceScratch,
    ) -> Color {
        let background = self.settings.background_color();
        if depth > self.settings.max_depth {
            return background;
        }
        let Some(hit) = self.scene.intersect(ray, exclude) else {
            return background;
        };
        if self.light.contains(hit.point) {
            return self.light_color();
        }

        let material = self.scene.material(hit.object);
        let mut color = Color::ZERO;

        if material.transmission > 0.0 {
            // Total internal reflection falls back to the mirror direction
            let direction = refract(ray.direction, hit.normal, material.refractive_index)
                .unwrap_or_else(|| reflect(ray.direction, hit.normal).normalize_or_zero());
            let refracted = Ray::new(hit.point + direction * SURFACE_EPSILON, direction);
            color += material.transmission * self.trace_ray(&refracted, None, depth + 1, rng, scratch);
        }

        if material.specular > 0.0 {
            let direction = reflect(ray.direction, hit.normal).normalize_or_zero();
            let reflected = Ray::new(hit.point, direction);
            color += material.specular
                * self.trace_ray(&reflected, Some(hit.object), depth + 1, rng, scratch);
        }

        if material.absorb > 0.0 {
            color += material.absorb * self.local_radiance(ray, &hit, material, rng, scratch);
        }

        color
    }

    /// Light color seen when a ray hits the aperture.
    fn light_color(&self) -> Color {
        let boost = self.settings.light_boost as f32 / 255.0;
        (self.light.color + Color::splat(boost)).min(Color::ONE)
    }

    /// Radiance leaving an absorbing surface toward the viewer.
    fn local_radiance(
        &self,
        ray: &Ray,
        hit: &Hit,
        material: &Material,
        rng: &mut dyn RngCore,
        scratch: &mut TraceScratch,
    ) -> Color {
        let normal = facing(hit.normal, ray.direction);

        let global = density_estimate(
            Estimate::Global,
            self.global,
            &mut scratch.global,
            hit.point,
            normal,
            self.settings.max_photon_radius_sq,
        );
        let caustic = density_estimate(
            Estimate::Caustic,
            self.caustic,
            &mut scratch.caustic,
            hit.point,
            normal,
            self.settings.max_photon_radius_sq,
        );
        let direct = Color::splat(self.direct_light(ray, hit, normal, material, rng));

        let radiance = (global + caustic + direct).clamp(Color::ZERO, Color::ONE);
        radiance * material.color
    }

    /// Direct light from the area light, estimated with shadow rays.
    fn direct_light(
        &self,
        ray: &Ray,
        hit: &Hit,
        normal: Vec3,
        material: &Material,
        rng: &mut dyn RngCore,
    ) -> f32 {
        let samples = self.settings.shadow_rays;
        if samples == 0 {
            return 0.0;
        }

        let mut unoccluded = 0usize;
        let mut cosine_sum = 0.0;
        let mut last_direction = None;
        for _ in 0..samples {
            let target = self.light.sample_point(rng);
            let shadow = Ray::towards(hit.point, target);
            let distance_squared = hit.point.distance_squared(target);
            if self.scene.occluded(&shadow, distance_squared, Some(hit.object)) {
                continue;
            }
            unoccluded += 1;
            cosine_sum += normal.dot(shadow.direction).max(0.0);
            last_direction = Some(shadow.direction);
        }

        let Some(light_direction) = last_direction else {
            return 0.0;
        };
        let visible = unoccluded as f32 / samples as f32;
        let diffuse = DIRECT_DIFFUSE_WEIGHT * cosine_sum / samples as f32;

        let specular = if material.specular_exponent > 0.0 {
            let half = (light_direction - ray.direction).normalize_or_zero();
            DIRECT_SPECULAR_WEIGHT * half.dot(normal).max(0.0).powf(material.specular_exponent) * visible
        } else {
            0.0
        };

        (diffuse + specular).clamp(0.0, 1.0)
    }
}

/// Photon density estimate at `point`, clamped to [0, 1].
fn density_estimate(
    kind: Estimate,
    tree: &KdTree,
    nearest: &mut NearestPhotons,
    point: Vec3,
    normal: Vec3,
    max_distance_squared: f32,
) -> Color {
    if tree.k_nearest(point, max_distance_squared, nearest) == 0 {
        return Color::ZERO;
    }
    let r2 = match nearest.max_distance_squared() {
        Some(r2) if r2 > 0.0 => r2,
        _ => return Color::ZERO,
    };

    let mut sum = Color::ZERO;
    for (photon, distance_squared) in nearest.iter() {
        let cosine = -normal.dot(photon.direction);
        if cosine <= 0.0 {
            continue;
        }
        let offset = (point - photon.position).dot(normal);
        if offset * offset > TANGENT_PLANE_TOLERANCE {
            continue;
        }
        let weight = cosine * kind.filter(distance_squared / r2);
        sum += kind.power(photon.power) * weight;
    }

    (sum / kind.area(r2)).clamp(Color::ZERO, Color::ONE)
}
