//! glint renderer - CPU photon mapping
//!
//! Renders a scene of analytic spheres and bounded planes lit by a
//! rectangular area light. Two photon maps (global and caustic) are built
//! first, then rows of the image are traced in parallel on a fixed worker
//! pool with a distributed recursive ray tracer that gathers photons for
//! indirect light and casts shadow rays for direct light.

mod camera;
pub mod image;
mod kdtree;
mod material;
mod photon;
mod renderer;
mod sampling;
pub mod scene;
mod scheduler;
mod settings;
mod tracer;

pub use camera::Camera;
pub use kdtree::{KdNode, KdTree, NearestPhotons, NodeId};
pub use material::{pack_argb, unpack_rgb, Color, Interaction, Material, MaterialError};
pub use photon::{
    build_photon_map, emit_photons, Photon, PhotonMapError, PhotonMapKind, PhotonMapOptions,
    PhotonMapResult, MAX_EMISSIONS_PER_PHOTON, SURFACE_EPSILON,
};
pub use renderer::{render_scene, RenderError, RenderResult, RenderStats};
pub use sampling::{cosine_direction, cosine_hemisphere, gen_f32, orthonormal_basis, reflect, refract};
pub use scene::{
    AreaLight, BoundedPlane, Hit, ObjectId, Scene, SceneError, SceneObject, SceneResult, Shape, Sphere,
    SurfaceHit,
};
pub use scheduler::{Job, Scheduler, SchedulerError, SchedulerResult, BATCH_SIZE};
pub use settings::RenderSettings;
pub use tracer::{TraceScratch, Tracer};

/// Re-export math types from glint_math
pub use glint_math::{Aabb, Axis, Interval, Ray, Vec3};
