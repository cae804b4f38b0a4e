//! Scene model: an unindexed list of analytic objects.
//!
//! Intersection is a linear scan over every object; the only spatial index in
//! the renderer is the photon kd-tree.

mod light;
mod plane;
pub mod presets;
mod sphere;

pub use light::AreaLight;
pub use plane::BoundedPlane;
pub use sphere::Sphere;

use crate::material::{Material, MaterialError};
use glint_math::{Ray, Vec3};
use thiserror::Error;

/// Errors raised while assembling a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("invalid material: {0}")]
    Material(#[from] MaterialError),

    #[error("sphere radius must be positive and finite, got {0}")]
    SphereRadius(f32),

    #[error("plane bounds must be finite and ordered: [{min}, {max}]")]
    PlaneBounds { min: f32, max: f32 },

    #[error("object position is not finite")]
    NonFinite,
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Identifies an object within its scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Geometric result of a single shape intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Ray parameter of the hit
    pub t: f32,
    pub point: Vec3,
    /// Unit surface normal (outward for spheres, facing the ray for planes)
    pub normal: Vec3,
}

/// Nearest intersection against the whole scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub point: Vec3,
    pub normal: Vec3,
    /// Squared distance from the ray origin
    pub distance_squared: f32,
    pub object: ObjectId,
}

/// The supported primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere(Sphere),
    Plane(BoundedPlane),
}

impl Shape {
    pub fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        match self {
            Shape::Sphere(sphere) => sphere.intersect(ray),
            Shape::Plane(plane) => plane.intersect(ray),
        }
    }

    fn validate(&self) -> SceneResult<()> {
        match self {
            Shape::Sphere(sphere) => {
                if !sphere.center.is_finite() {
                    return Err(SceneError::NonFinite);
                }
                if !(sphere.radius > 0.0 && sphere.radius.is_finite()) {
                    return Err(SceneError::SphereRadius(sphere.radius));
                }
            }
            Shape::Plane(plane) => {
                if !plane.offset.is_finite() {
                    return Err(SceneError::NonFinite);
                }
                for bounds in plane.bounds {
                    if !bounds.is_valid() {
                        return Err(SceneError::PlaneBounds {
                            min: bounds.min,
                            max: bounds.max,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// A shape together with its surface description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneObject {
    pub shape: Shape,
    pub material: Material,
}

impl SceneObject {
    pub fn new(shape: Shape, material: Material) -> Self {
        Self { shape, material }
    }

    pub fn sphere(sphere: Sphere, material: Material) -> Self {
        Self::new(Shape::Sphere(sphere), material)
    }

    pub fn plane(plane: BoundedPlane, material: Material) -> Self {
        Self::new(Shape::Plane(plane), material)
    }
}

/// An ordered collection of scene objects.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object after validating its geometry and material.
    pub fn add(&mut self, object: SceneObject) -> SceneResult<ObjectId> {
        object.shape.validate()?;
        object.material.validate()?;
        if !object.material.is_partition() {
            log::warn!(
                "Material probabilities of object {} sum to {:.3}, expected 1",
                self.objects.len(),
                object.material.probability_sum()
            );
        }
        self.objects.push(object);
        Ok(ObjectId(self.objects.len() - 1))
    }

    /// Get the number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn material(&self, id: ObjectId) -> &Material {
        &self.objects[id.0].material
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, object)| (ObjectId(i), object))
    }

    /// Nearest hit along `ray`, skipping `exclude`.
    pub fn intersect(&self, ray: &Ray, exclude: Option<ObjectId>) -> Option<Hit> {
        if ray.is_degenerate() {
            return None;
        }

        let mut nearest: Option<Hit> = None;
        for (id, object) in self.objects() {
            if Some(id) == exclude {
                continue;
            }
            let Some(hit) = object.shape.intersect(ray) else {
                continue;
            };
            let distance_squared = hit.point.distance_squared(ray.origin);
            if nearest.map_or(true, |n| distance_squared < n.distance_squared) {
                nearest = Some(Hit {
                    point: hit.point,
                    normal: hit.normal,
                    distance_squared,
                    object: id,
                });
            }
        }
        nearest
    }

    /// True if any object other than `exclude` is hit closer than `max_distance_squared`.
    pub fn occluded(&self, ray: &Ray, max_distance_squared: f32, exclude: Option<ObjectId>) -> bool {
        self.objects().any(|(id, object)| {
            Some(id) != exclude
                && object
                    .shape
                    .intersect(ray)
                    .is_some_and(|hit| hit.point.distance_squared(ray.origin) < max_distance_squared)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Color;
    use glint_math::{Axis, Interval};

    fn two_spheres() -> Scene {
        let mut scene = Scene::new();
        scene
            .add(SceneObject::sphere(
                Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0),
                Material::matte(Color::ONE),
            ))
            .unwrap();
        scene
            .add(SceneObject::sphere(
                Sphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0),
                Material::mirror(),
            ))
            .unwrap();
        scene
    }

    #[test]
    fn test_empty_scene_never_hits() {
        let scene = Scene::new();
        assert!(scene.is_empty());
        assert!(scene.intersect(&Ray::new(Vec3::ZERO, Vec3::Z), None).is_none());
    }

    #[test]
    fn test_nearest_hit_wins() {
        let scene = two_spheres();
        let hit = scene.intersect(&Ray::new(Vec3::ZERO, Vec3::Z), None).unwrap();
        assert_eq!(hit.object.index(), 0);
        assert!((hit.distance_squared - 16.0).abs() < 1e-3);
    }

    #[test]
    fn test_exclude_skips_object() {
        let scene = two_spheres();
        let first = scene.intersect(&Ray::new(Vec3::ZERO, Vec3::Z), None).unwrap();
        let hit = scene
            .intersect(&Ray::new(Vec3::ZERO, Vec3::Z), Some(first.object))
            .unwrap();
        assert_eq!(hit.object.index(), 1);
        assert!(scene.material(hit.object).specular > 0.0);
    }

    #[test]
    fn test_degenerate_ray_never_hits() {
        let scene = two_spheres();
        assert!(scene.intersect(&Ray::new(Vec3::ZERO, Vec3::ZERO), None).is_none());
    }

    #[test]
    fn test_occluded() {
        let scene = two_spheres();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(scene.occluded(&ray, 100.0, None));
        // The blocker is further away than the target
        assert!(!scene.occluded(&ray, 9.0, None));
        // Only the excluded object is in range
        assert!(!scene.occluded(&ray, 36.0, Some(ObjectId(0))));
    }

    #[test]
    fn test_add_rejects_invalid_objects() {
        let mut scene = Scene::new();
        let bad_radius = SceneObject::sphere(Sphere::new(Vec3::ZERO, -1.0), Material::mirror());
        assert_eq!(scene.add(bad_radius), Err(SceneError::SphereRadius(-1.0)));

        let bad_bounds = SceneObject::plane(
            BoundedPlane::square(Axis::Y, 0.0, Interval::new(1.0, -1.0)),
            Material::mirror(),
        );
        assert!(matches!(scene.add(bad_bounds), Err(SceneError::PlaneBounds { .. })));

        let bad_material = SceneObject::sphere(
            Sphere::new(Vec3::ZERO, 1.0),
            Material::new(Color::ONE, -0.5, 0.0, 0.0, 1.0),
        );
        assert!(matches!(scene.add(bad_material), Err(SceneError::Material(_))));
        assert!(scene.is_empty());
    }
}
