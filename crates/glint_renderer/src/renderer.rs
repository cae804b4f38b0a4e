//! Render loop: photon maps, then one job per row of the target.

use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::material::pack_argb;
use crate::photon::{build_photon_map, PhotonMapError, PhotonMapOptions};
use crate::scene::{AreaLight, Scene, SceneError};
use crate::scheduler::{Scheduler, SchedulerError};
use crate::settings::RenderSettings;
use crate::tracer::Tracer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

/// Errors that abort a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    PhotonMap(#[from] PhotonMapError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("pixel buffer holds {actual} pixels, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("invalid render settings: {0}")]
    InvalidSettings(String),

    #[error("failed to parse render settings")]
    Settings(#[from] serde_json::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Summary of a finished render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStats {
    /// Photons stored in the global map
    pub global_photons: usize,
    /// Photons stored in the caustic map
    pub caustic_photons: usize,
    /// Rows of the target rendered
    pub rows: usize,
    /// Time spent building both photon maps
    pub photon_time: Duration,
    /// Time spent tracing rays
    pub render_time: Duration,
}

/// Seed for the generator owned by one row job.
fn row_seed(seed: u64, row: usize) -> u64 {
    seed ^ (row as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Render `scene` into `pixels`, a `width × height × supersample²` ARGB buffer.
///
/// Rows are stored bottom to top. Every pixel is written exactly once with
/// alpha `0xFF`.
pub fn render_scene(
    scene: &Scene,
    light: &AreaLight,
    settings: &RenderSettings,
    pixels: &mut [u32],
) -> RenderResult<RenderStats> {
    settings.validate()?;
    let (width, height) = settings.target_size();
    let expected = width * height;
    if pixels.len() != expected {
        return Err(RenderError::BufferSize {
            expected,
            actual: pixels.len(),
        });
    }

    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let global = build_photon_map(
        &PhotonMapOptions::global(settings.global_photons).with_max_bounces(settings.max_photon_bounces),
        light,
        scene,
        &mut rng,
    )?;
    let caustic = build_photon_map(
        &PhotonMapOptions::caustic(settings.caustic_photons).with_max_bounces(settings.max_photon_bounces),
        light,
        scene,
        &mut rng,
    )?;
    let photon_time = start.elapsed();

    log::info!("Rendering scene at {}x{}", width, height);
    let start = Instant::now();
    let camera = Camera::from_settings(settings);
    let tracer = Tracer::new(scene, light, &global, &caustic, settings);

    std::thread::scope(|scope| -> RenderResult<()> {
        let scheduler = Scheduler::start(scope, settings.workers)?;
        for (y, row) in pixels.chunks_mut(width).enumerate() {
            let tracer = &tracer;
            let camera = &camera;
            let seed = settings.seed;
            scheduler.submit(move || render_row(tracer, camera, y, row, seed));
        }
        scheduler.wait_for_completion()?;
        Ok(())
    })?;

    let render_time = start.elapsed();
    log::info!("Scene rendered in {:.3}s", render_time.as_secs_f64());

    Ok(RenderStats {
        global_photons: global.len(),
        caustic_photons: caustic.len(),
        rows: height,
        photon_time,
        render_time,
    })
}

/// Trace every pixel of one target row.
fn render_row(tracer: &Tracer, camera: &Camera, y: usize, row: &mut [u32], seed: u64) {
    let mut rng = StdRng::seed_from_u64(row_seed(seed, y));
    let mut scratch = tracer.scratch();
    for (x, pixel) in row.iter_mut().enumerate() {
        let ray = camera.get_ray(x, y, &mut rng);
        let color = tracer.trace_ray(&ray, None, 0, &mut rng, &mut scratch);
        *pixel = pack_argb(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::presets;

    fn small_settings() -> RenderSettings {
        RenderSettings {
            supersample: 2,
            shadow_rays: 4,
            ..RenderSettings::default()
        }
        .with_resolution(16, 9)
        .with_photons(200, 100)
        .with_workers(3)
        .with_seed(11)
    }

    #[test]
    fn test_render_writes_every_pixel() {
        let (scene, light) = presets::cornell_box().unwrap();
        let settings = small_settings();
        let (width, height) = settings.target_size();
        let mut pixels = vec![0u32; width * height];

        let stats = render_scene(&scene, &light, &settings, &mut pixels).unwrap();
        assert_eq!(stats.rows, 18);
        assert_eq!(stats.global_photons, 200);
        assert!(pixels.iter().all(|&p| p >> 24 == 0xFF));
        // The box is lit, so some pixels are not black
        assert!(pixels.iter().any(|&p| p & 0x00FF_FFFF != 0));
    }

    #[test]
    fn test_render_is_reproducible() {
        let (scene, light) = presets::cornell_box().unwrap();
        let settings = small_settings();
        let (width, height) = settings.target_size();
        let mut first = vec![0u32; width * height];
        let mut second = vec![0u32; width * height];

        render_scene(&scene, &light, &settings, &mut first).unwrap();
        render_scene(&scene, &light, &settings.clone().with_workers(1), &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_scene_renders_background() {
        let scene = Scene::new();
        let light = AreaLight::default();
        let mut settings = small_settings();
        settings.background = [0.0, 0.0, 1.0];
        let (width, height) = settings.target_size();
        let mut pixels = vec![0u32; width * height];

        let stats = render_scene(&scene, &light, &settings, &mut pixels).unwrap();
        assert_eq!(stats.global_photons, 0);
        assert!(pixels.iter().all(|&p| p == 0xFF00_00FF));
    }

    #[test]
    fn test_buffer_size_mismatch() {
        let (scene, light) = presets::cornell_box().unwrap();
        let settings = small_settings();
        let mut pixels = vec![0u32; 10];

        let err = render_scene(&scene, &light, &settings, &mut pixels).unwrap_err();
        assert!(matches!(err, RenderError::BufferSize { expected: 576, actual: 10 }));
    }

    #[test]
    fn test_row_seeds_differ() {
        assert_ne!(row_seed(0, 0), row_seed(0, 1));
        assert_ne!(row_seed(5, 3), row_seed(6, 3));
    }
}
