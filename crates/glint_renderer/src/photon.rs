//! Photon emission and transport.
//!
//! Photons leave the area light, bounce through the scene according to each
//! surface's interaction probabilities and are stored where they are absorbed.
//! The stored set is then organized into a [`KdTree`].

use std::collections::TryReserveError;
use std::fmt;
use std::time::Instant;

use crate::kdtree::KdTree;
use crate::material::Interaction;
use crate::sampling::{cosine_direction, gen_f32, reflect, refract};
use crate::scene::{AreaLight, ObjectId, Scene};
use glint_math::{Ray, Vec3};
use rand::RngCore;
use thiserror::Error;

/// Offset used to move a new ray origin off the surface it leaves.
pub const SURFACE_EPSILON: f32 = 0.01;

/// Emissions allowed per requested photon before the map gives up.
pub const MAX_EMISSIONS_PER_PHOTON: usize = 64;

/// Errors that can occur while building a photon map.
#[derive(Error, Debug)]
pub enum PhotonMapError {
    #[error("failed to allocate storage for {count} photons")]
    Allocation {
        count: usize,
        #[source]
        source: TryReserveError,
    },
}

pub type PhotonMapResult<T> = Result<T, PhotonMapError>;

/// A recorded light-transport sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    /// Where the photon was absorbed
    pub position: Vec3,
    /// Unit direction the photon was travelling in
    pub direction: Vec3,
    /// RGBA power
    pub power: [u8; 4],
    /// Number of surface hits along the path, including the absorbing one
    pub bounce: u8,
}

/// Which photon map is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotonMapKind {
    /// Every absorbed photon
    Global,
    /// Only photons that took at least one specular or transmissive bounce
    Caustic,
}

impl PhotonMapKind {
    /// Scale applied to the cosine term of the emission direction.
    ///
    /// Caustic photons are aimed more directly down at the scene geometry.
    fn downward_bias(self) -> f32 {
        match self {
            PhotonMapKind::Global => 1.0,
            PhotonMapKind::Caustic => 2.0,
        }
    }
}

impl fmt::Display for PhotonMapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotonMapKind::Global => write!(f, "global"),
            PhotonMapKind::Caustic => write!(f, "caustic"),
        }
    }
}

/// Parameters for a single photon map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotonMapOptions {
    pub kind: PhotonMapKind,
    /// Number of photons to record
    pub photon_count: usize,
    /// Absorption is forced once a path has hit more surfaces than this
    pub max_bounces: u32,
}

impl PhotonMapOptions {
    pub fn global(photon_count: usize) -> Self {
        Self {
            kind: PhotonMapKind::Global,
            photon_count,
            max_bounces: 3,
        }
    }

    pub fn caustic(photon_count: usize) -> Self {
        Self {
            kind: PhotonMapKind::Caustic,
            ..Self::global(photon_count)
        }
    }

    pub fn with_max_bounces(mut self, max_bounces: u32) -> Self {
        self.max_bounces = max_bounces;
        self
    }
}

/// Emit photons and build the kd-tree over them.
pub fn build_photon_map(
    options: &PhotonMapOptions,
    light: &AreaLight,
    scene: &Scene,
    rng: &mut dyn RngCore,
) -> PhotonMapResult<KdTree> {
    log::info!(
        "Building {} photon map from {} photons",
        options.kind,
        options.photon_count
    );

    let start = Instant::now();
    let photons = emit_photons(options, light, scene, rng)?;
    log::info!(
        "{} photons traced in {:.3}s",
        options.kind,
        start.elapsed().as_secs_f64()
    );

    let start = Instant::now();
    let tree = KdTree::build(photons, rng)?;
    log::info!(
        "{} photon kd-tree with {} photons built in {:.3}s",
        options.kind,
        tree.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(tree)
}

/// Emit photons until `options.photon_count` have been recorded.
///
/// Gives up after `photon_count * MAX_EMISSIONS_PER_PHOTON` emissions and
/// returns what was recorded, so scenes where photons can never be stored
/// (no geometry, or no specular surfaces for a caustic map) still terminate.
pub fn emit_photons(
    options: &PhotonMapOptions,
    light: &AreaLight,
    scene: &Scene,
    rng: &mut dyn RngCore,
) -> PhotonMapResult<Vec<Photon>> {
    let count = options.photon_count;
    let mut photons = Vec::new();
    photons
        .try_reserve_exact(count)
        .map_err(|source| PhotonMapError::Allocation { count, source })?;

    let power = light.photon_power();
    let budget = count.saturating_mul(MAX_EMISSIONS_PER_PHOTON);
    let mut emitted = 0;
    while photons.len() < count && emitted < budget {
        emitted += 1;
        if let Some(photon) = trace_photon(options, light, scene, power, rng) {
            photons.push(photon);
        }
    }

    if photons.len() < count {
        log::warn!(
            "Only {} of {} {} photons recorded after {} emissions",
            photons.len(),
            count,
            options.kind,
            emitted
        );
    } else {
        log::debug!("{} {} photons from {} emissions", count, options.kind, emitted);
    }
    Ok(photons)
}

/// Follow one photon from the light until it is absorbed or leaves the scene.
fn trace_photon(
    options: &PhotonMapOptions,
    light: &AreaLight,
    scene: &Scene,
    power: [u8; 4],
    rng: &mut dyn RngCore,
) -> Option<Photon> {
    let origin = light.sample_point(rng);
    let direction = light.sample_direction(options.kind.downward_bias(), rng);
    let mut ray = Ray::new(origin, direction);
    let mut exclude: Option<ObjectId> = None;
    let mut specular_path = false;
    let mut bounces: u32 = 0;

    loop {
        bounces += 1;
        let hit = scene.intersect(&ray, exclude)?;
        let material = scene.material(hit.object);

        let interaction = if bounces > options.max_bounces {
            Interaction::Absorb
        } else {
            material.choose(gen_f32(rng))
        };

        match interaction {
            Interaction::Diffuse => {
                let normal = facing(hit.normal, ray.direction);
                let direction = cosine_direction(normal, rng);
                ray = Ray::new(hit.point + normal * SURFACE_EPSILON, direction);
                exclude = None;
            }
            Interaction::Specular => {
                let direction = reflect(ray.direction, hit.normal).normalize_or_zero();
                ray = Ray::new(hit.point, direction);
                exclude = Some(hit.object);
                specular_path = true;
            }
            Interaction::Transmission => {
                // Total internal reflection keeps the photon inside
                let direction = refract(ray.direction, hit.normal, material.refractive_index)
                    .unwrap_or_else(|| reflect(ray.direction, hit.normal).normalize_or_zero());
                ray = Ray::new(hit.point + direction * SURFACE_EPSILON, direction);
                exclude = None;
                specular_path = true;
            }
            Interaction::Absorb => {
                if options.kind == PhotonMapKind::Caustic && !specular_path {
                    return None;
                }
                if !hit.point.is_finite() {
                    return None;
                }
                return Some(Photon {
                    position: hit.point,
                    direction: ray.direction,
                    power,
                    bounce: bounces.min(u8::MAX as u32) as u8,
                });
            }
        }
    }
}

/// `normal` flipped, if needed, to face against `direction`.
#[inline]
pub(crate) fn facing(normal: Vec3, direction: Vec3) -> Vec3 {
    if normal.dot(direction) > 0.0 {
        -normal
    } else {
        normal
    }
}
