//! glint command line renderer.
//!
//! Renders the Cornell box preset to a PNG file.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use glint_renderer::image::{downsample, to_rgba8};
use glint_renderer::scene::presets;
use glint_renderer::{render_scene, RenderSettings};

/// Render the Cornell box with photon mapping
#[derive(Parser, Debug)]
#[command(name = "glint", version, about)]
struct Cli {
    /// Number of worker threads (values below 1 use one worker)
    workers: usize,

    /// Output width in pixels
    width: usize,

    /// Output height in pixels (width / 16 must equal height / 9)
    height: usize,

    /// Supersampling factor per axis
    samples: usize,

    /// Output PNG file
    #[arg(short, long, default_value = "raytraced.png")]
    output: PathBuf,

    /// JSON file with render settings; positional arguments take precedence
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Random seed (defaults to the current time)
    #[arg(long)]
    seed: Option<u64>,

    /// Photons in the global map
    #[arg(long)]
    global_photons: Option<usize>,

    /// Photons in the caustic map
    #[arg(long)]
    caustic_photons: Option<usize>,

    /// Shadow rays per shading point
    #[arg(long)]
    shadow_rays: Option<usize>,
}

impl Cli {
    /// Check the image arguments. Returns the message to print on failure.
    fn validate(&self) -> Result<(), &'static str> {
        if self.width / 16 != self.height / 9 {
            return Err("Image dimensions must be a 16:9 ratio.");
        }
        if self.width == 0 || self.height == 0 || self.samples == 0 {
            return Err("Dimensions and samples must be positive");
        }
        Ok(())
    }

    fn settings(&self) -> Result<RenderSettings> {
        let mut settings = match &self.settings {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings file {}", path.display()))?;
                RenderSettings::from_json(&json)
                    .with_context(|| format!("Invalid settings file {}", path.display()))?
            }
            None => RenderSettings::default(),
        };

        settings.workers = self.workers.max(1);
        settings.width = self.width;
        settings.height = self.height;
        settings.supersample = self.samples;
        settings.seed = match self.seed {
            Some(seed) => seed,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        };
        if let Some(count) = self.global_photons {
            settings.global_photons = count;
        }
        if let Some(count) = self.caustic_photons {
            settings.caustic_photons = count;
        }
        if let Some(count) = self.shadow_rays {
            settings.shadow_rays = count;
        }
        Ok(settings)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    if let Err(message) = cli.validate() {
        println!("{message}");
        return Ok(());
    }
    let settings = cli.settings()?;
    settings.validate().context("Invalid render settings")?;

    log::info!("Setting up scene");
    let (scene, light) = presets::cornell_box().context("Failed to build the Cornell box")?;

    let (target_width, target_height) = settings.target_size();
    let mut pixels = vec![0u32; target_width * target_height];
    let stats = render_scene(&scene, &light, &settings, &mut pixels).context("Render failed")?;
    log::info!(
        "{} global and {} caustic photons in {:.3}s, {} rows in {:.3}s",
        stats.global_photons,
        stats.caustic_photons,
        stats.photon_time.as_secs_f64(),
        stats.rows,
        stats.render_time.as_secs_f64()
    );

    let output = downsample(&pixels, settings.width, settings.height, settings.supersample)
        .context("Failed to downsample the render target")?;
    let image = image::RgbaImage::from_raw(
        settings.width as u32,
        settings.height as u32,
        to_rgba8(&output),
    )
    .context("Image buffer does not match its dimensions")?;
    image
        .save(&cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    log::info!("Saved {}", cli.output.display());
    Ok(())
}
