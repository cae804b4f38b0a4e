//! Built-in test scenes.

use super::{AreaLight, BoundedPlane, Scene, SceneObject, SceneResult, Sphere};
use crate::material::Material;
use glint_math::{Axis, Interval, Vec3};

const WALL: Interval = Interval::new(-5.0, 5.0);
const DEPTH: Interval = Interval::new(0.0, 10.0);

/// Classic Cornell box with a glass sphere and a mirror sphere.
///
/// The box spans [-5, 5] on X and Y and [0, 10] on Z, open on the side
/// facing the camera; the light hangs just below the ceiling.
pub fn cornell_box() -> SceneResult<(Scene, AreaLight)> {
    let mut scene = Scene::new();
    let wall = |argb| Material::from_argb(argb, 0.4, 0.0, 0.0, 0.6);

    // floor and ceiling
    scene.add(SceneObject::plane(
        BoundedPlane::new(Axis::Y, -5.0, WALL, DEPTH),
        wall(0xFFEE_EEEE),
    ))?;
    scene.add(SceneObject::plane(
        BoundedPlane::new(Axis::Y, 5.0, WALL, DEPTH),
        wall(0xFFEE_EEEE),
    ))?;
    // red and blue side walls
    scene.add(SceneObject::plane(
        BoundedPlane::new(Axis::X, 5.0, WALL, DEPTH),
        wall(0xFFFF_3333),
    ))?;
    scene.add(SceneObject::plane(
        BoundedPlane::new(Axis::X, -5.0, WALL, DEPTH),
        wall(0xFF33_33FF),
    ))?;
    // back wall
    scene.add(SceneObject::plane(
        BoundedPlane::square(Axis::Z, 10.0, WALL),
        wall(0xFFEE_EEEE),
    ))?;

    scene.add(SceneObject::sphere(
        Sphere::new(Vec3::new(2.0, -3.5, 3.0), 1.5),
        Material::from_argb(0xFFFF_FFFF, 0.0, 0.1, 0.9, 0.0).with_refractive_index(2.5),
    ))?;
    scene.add(SceneObject::sphere(
        Sphere::new(Vec3::new(-2.0, -3.5, 5.0), 1.5),
        Material::mirror(),
    ))?;

    Ok((scene, AreaLight::default()))
}
