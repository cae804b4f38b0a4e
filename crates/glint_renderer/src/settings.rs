//! Render configuration.

use crate::material::Color;
use crate::renderer::{RenderError, RenderResult};
use glint_math::Vec3;
use serde::{Deserialize, Serialize};

/// Every tunable of a render.
///
/// Missing fields fall back to their defaults when deserializing, so a
/// settings file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output width in pixels
    pub width: usize,
    /// Output height in pixels
    pub height: usize,
    /// Sub-pixels per axis; the render target is `width * supersample` wide
    pub supersample: usize,
    /// Worker threads in the job system
    pub workers: usize,
    /// Seed for photon emission and per-row sampling
    pub seed: u64,

    /// Photons stored in the global map
    pub global_photons: usize,
    /// Photons stored in the caustic map
    pub caustic_photons: usize,
    /// Search radius (squared) for density estimates
    pub max_photon_radius_sq: f32,
    /// Photons gathered per global estimate
    pub photons_in_estimate: usize,
    /// Photons gathered per caustic estimate
    pub caustic_photons_in_estimate: usize,
    /// Surface hits after which a photon is forced to absorb
    pub max_photon_bounces: u32,

    /// Shadow rays per shading point
    pub shadow_rays: usize,
    /// Recursion depth after which rays return the background
    pub max_depth: u32,
    /// Added to each 8-bit channel when a ray hits the light
    pub light_boost: u8,
    /// Background color (RGB, 0-1)
    pub background: [f32; 3],

    /// Camera position
    pub eye: [f32; 3],
    /// Width of the view plane at z = 0, in scene units
    pub view_width: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            supersample: 1,
            workers: default_workers(),
            seed: 0,
            global_photons: 2048,
            caustic_photons: 2048,
            max_photon_radius_sq: 100.0,
            photons_in_estimate: 63,
            caustic_photons_in_estimate: 63,
            max_photon_bounces: 3,
            shadow_rays: 25,
            max_depth: 3,
            light_boost: 50,
            background: [0.0, 0.0, 0.0],
            eye: [0.0, 0.0, -12.0],
            view_width: 20.0,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl RenderSettings {
    /// Parse settings from JSON.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> RenderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set output resolution.
    pub fn with_resolution(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set photon counts for both maps.
    pub fn with_photons(mut self, global: usize, caustic: usize) -> Self {
        self.global_photons = global;
        self.caustic_photons = caustic;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Dimensions of the supersampled render target. Only meaningful once
    /// [`validate`](Self::validate) has accepted the settings.
    pub fn target_size(&self) -> (usize, usize) {
        (
            self.width * self.supersample,
            self.height * self.supersample,
        )
    }

    pub fn background_color(&self) -> Color {
        Color::from_array(self.background)
    }

    pub fn eye_position(&self) -> Vec3 {
        Vec3::from_array(self.eye)
    }

    /// Reject settings the render loop cannot work with.
    pub fn validate(&self) -> RenderResult<()> {
        let invalid = |msg: &str| -> RenderResult<()> { Err(RenderError::InvalidSettings(msg.to_string())) };

        if self.width == 0 || self.height == 0 {
            return invalid("width and height must be non-zero");
        }
        if self.supersample == 0 {
            return invalid("supersample must be at least 1");
        }
        let target_pixels = self
            .width
            .checked_mul(self.supersample)
            .zip(self.height.checked_mul(self.supersample))
            .and_then(|(w, h)| w.checked_mul(h));
        if target_pixels.is_none() {
            return invalid("supersampled resolution overflows");
        }
        if self.workers == 0 {
            return invalid("at least one worker is required");
        }
        if self.photons_in_estimate == 0 || self.caustic_photons_in_estimate == 0 {
            return invalid("photon estimate sizes must be non-zero");
        }
        if !(self.max_photon_radius_sq > 0.0 && self.max_photon_radius_sq.is_finite()) {
            return invalid("max_photon_radius_sq must be positive and finite");
        }
        if !(self.view_width > 0.0 && self.view_width.is_finite()) {
            return invalid("view_width must be positive and finite");
        }
        if !self.eye_position().is_finite() || !self.background_color().is_finite() {
            return invalid("eye and background must be finite");
        }
        Ok(())
    }
}
