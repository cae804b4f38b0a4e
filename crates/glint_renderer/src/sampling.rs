//! Random sampling and direction helpers shared by photon emission and
//! ray tracing.
//!
//! There is no global generator: every caller owns its `RngCore` and passes
//! it down explicitly.

use glint_math::Vec3;
use rand::{Rng, RngCore};
use std::f32::consts::TAU;

/// Uniform float in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Cosine-weighted direction in the local frame where the pole is `(0, 1, 0)`.
///
/// Returns `(sin_theta * cos_psi, cos_theta, sin_theta * sin_psi)`.
pub fn cosine_hemisphere(rng: &mut dyn RngCore) -> Vec3 {
    let u = gen_f32(rng);
    let v = gen_f32(rng);
    let sin_theta = u.sqrt();
    let cos_theta = (1.0 - sin_theta * sin_theta).max(0.0).sqrt();
    let psi = TAU * v;
    Vec3::new(sin_theta * psi.cos(), cos_theta, sin_theta * psi.sin())
}

/// Orthonormal basis `(tangent, bitangent)` around a unit normal.
///
/// The tangent is the cross product with whichever of X or Y is further from
/// the normal, so the result is deterministic for a given normal.
pub fn orthonormal_basis(normal: Vec3) -> (Vec3, Vec3) {
    let helper = if normal.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
    let tangent = helper.cross(normal).normalize();
    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}

/// Cosine-weighted direction about `normal`.
pub fn cosine_direction(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let local = cosine_hemisphere(rng);
    let (tangent, bitangent) = orthonormal_basis(normal);
    (tangent * local.x + normal * local.y + bitangent * local.z).normalize_or_zero()
}

/// Mirror `direction` about `normal`: `d - 2(d.n)n`.
#[inline]
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Refract a unit `direction` through a surface with outward unit `normal`.
///
/// Entering the surface (`d.n < 0`) uses the ratio `1 / ior`; leaving it flips
/// the normal and uses `ior`. Returns `None` on total internal reflection.
pub fn refract(direction: Vec3, normal: Vec3, ior: f32) -> Option<Vec3> {
    let mut n = normal;
    let mut cos = direction.dot(n);
    let mut eta = 1.0 / ior;
    if cos > 0.0 {
        n = -n;
        cos = -cos;
        eta = ior;
    }

    let k = 1.0 - eta * eta * (1.0 - cos * cos);
    if k < 0.0 {
        return None;
    }
    Some((eta * (direction - n * cos) - n * k.sqrt()).normalize_or_zero())
}
