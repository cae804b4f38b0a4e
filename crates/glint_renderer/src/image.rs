//! Post-processing of the render target for output.

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

use crate::renderer::{RenderError, RenderResult};

/// One 8-bit RGBA pixel, laid out as the bytes image encoders expect.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<u32> for Rgba8 {
    /// Unpack a `0xAARRGGBB` pixel.
    fn from(argb: u32) -> Self {
        Self {
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
            a: (argb >> 24) as u8,
        }
    }
}

/// Box-filter a supersampled target down to `width × height` and flip it.
///
/// `pixels` holds `(width * supersample) × (height * supersample)` ARGB
/// pixels stored bottom row first. The result is stored top row first, with
/// each channel the truncated mean of its `supersample²` block and alpha
/// `0xFF`. Fails when `pixels` does not hold exactly that many pixels.
pub fn downsample(
    pixels: &[u32],
    width: usize,
    height: usize,
    supersample: usize,
) -> RenderResult<Vec<u32>> {
    let samples = supersample.max(1);
    let stride = width * samples;
    let expected = stride * height * samples;
    if pixels.len() != expected {
        return Err(RenderError::BufferSize {
            expected,
            actual: pixels.len(),
        });
    }

    let mut output = vec![0u32; width * height];
    output
        .par_chunks_mut(width.max(1))
        .enumerate()
        .for_each(|(y, row)| {
            let source_row = (height - 1 - y) * samples;
            for (x, pixel) in row.iter_mut().enumerate() {
                let mut sum = [0u32; 3];
                for sy in source_row..source_row + samples {
                    let start = sy * stride + x * samples;
                    for &p in &pixels[start..start + samples] {
                        sum[0] += (p >> 16) & 0xFF;
                        sum[1] += (p >> 8) & 0xFF;
                        sum[2] += p & 0xFF;
                    }
                }
                let count = (samples * samples) as u32;
                *pixel = 0xFF00_0000 | (sum[0] / count) << 16 | (sum[1] / count) << 8 | (sum[2] / count);
            }
        });
    Ok(output)
}

/// Convert ARGB pixels to a tightly packed RGBA byte buffer.
pub fn to_rgba8(pixels: &[u32]) -> Vec<u8> {
    let rgba: Vec<Rgba8> = pixels.iter().map(|&p| Rgba8::from(p)).collect();
    bytemuck::cast_slice(&rgba).to_vec()
}
