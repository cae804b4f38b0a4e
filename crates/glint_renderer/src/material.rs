//! Material coefficients for scene objects.

use glint_math::Vec3;
use thiserror::Error;

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Tolerance used when checking that the interaction probabilities form a partition.
const PARTITION_TOLERANCE: f32 = 1e-3;

/// Errors for invalid material coefficients.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    #[error("{name} probability {value} is outside [0, 1]")]
    Probability { name: &'static str, value: f32 },

    #[error("transmissive material needs a positive refractive index, got {0}")]
    RefractiveIndex(f32),

    #[error("specular exponent must be non-negative, got {0}")]
    SpecularExponent(f32),

    #[error("reflectance component {0} is outside [0, 1]")]
    Reflectance(f32),
}

/// The outcome of a photon hitting a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Diffuse,
    Specular,
    Transmission,
    Absorb,
}

/// Per-object surface description.
///
/// `diffuse`, `specular`, `transmission` and `absorb` are mutually exclusive
/// interaction probabilities and should sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Reflectance color (RGB, 0-1)
    pub color: Color,
    pub diffuse: f32,
    pub specular: f32,
    pub transmission: f32,
    pub absorb: f32,
    /// Index of refraction, only meaningful when `transmission > 0`
    pub refractive_index: f32,
    /// Blinn-Phong exponent, 0 disables the highlight
    pub specular_exponent: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::splat(0.9),
            diffuse: 0.0,
            specular: 0.0,
            transmission: 0.0,
            absorb: 1.0,
            refractive_index: 1.0,
            specular_exponent: 0.0,
        }
    }
}

impl Material {
    /// Create a material from its reflectance and the four probabilities.
    pub fn new(color: Color, diffuse: f32, specular: f32, transmission: f32, absorb: f32) -> Self {
        Self {
            color,
            diffuse,
            specular,
            transmission,
            absorb,
            ..Default::default()
        }
    }

    /// Build a material from a packed `0xAARRGGBB` color.
    pub fn from_argb(argb: u32, diffuse: f32, specular: f32, transmission: f32, absorb: f32) -> Self {
        Self::new(unpack_rgb(argb), diffuse, specular, transmission, absorb)
    }

    /// A fully absorbing (matte) surface.
    pub fn matte(color: Color) -> Self {
        Self::new(color, 0.0, 0.0, 0.0, 1.0)
    }

    /// A perfect mirror.
    pub fn mirror() -> Self {
        Self::new(Color::ONE, 0.0, 1.0, 0.0, 0.0)
    }

    /// Set the refractive index.
    pub fn with_refractive_index(mut self, ior: f32) -> Self {
        self.refractive_index = ior;
        self
    }

    /// Set the Blinn-Phong exponent.
    pub fn with_specular_exponent(mut self, exponent: f32) -> Self {
        self.specular_exponent = exponent;
        self
    }

    /// Sum of the four interaction probabilities.
    pub fn probability_sum(&self) -> f32 {
        self.diffuse + self.specular + self.transmission + self.absorb
    }

    /// True when the probabilities sum to 1 within tolerance.
    pub fn is_partition(&self) -> bool {
        (self.probability_sum() - 1.0).abs() <= PARTITION_TOLERANCE
    }

    /// Check ranges and the parameters required by nonzero probabilities.
    pub fn validate(&self) -> Result<(), MaterialError> {
        let probabilities = [
            ("diffuse", self.diffuse),
            ("specular", self.specular),
            ("transmission", self.transmission),
            ("absorb", self.absorb),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(MaterialError::Probability { name, value });
            }
        }
        for c in self.color.to_array() {
            if !(0.0..=1.0).contains(&c) {
                return Err(MaterialError::Reflectance(c));
            }
        }
        if self.transmission > 0.0 && !(self.refractive_index > 0.0 && self.refractive_index.is_finite()) {
            return Err(MaterialError::RefractiveIndex(self.refractive_index));
        }
        if !(self.specular_exponent >= 0.0 && self.specular_exponent.is_finite()) {
            return Err(MaterialError::SpecularExponent(self.specular_exponent));
        }
        Ok(())
    }

    /// Pick an interaction for a uniform draw `u` in [0, 1).
    ///
    /// The draw is compared against the cumulative diffuse, specular and
    /// transmission thresholds; anything past them absorbs.
    pub fn choose(&self, u: f32) -> Interaction {
        let diffuse = self.diffuse;
        let specular = diffuse + self.specular;
        let transmission = specular + self.transmission;

        if u < diffuse {
            Interaction::Diffuse
        } else if u < specular {
            Interaction::Specular
        } else if u < transmission {
            Interaction::Transmission
        } else {
            Interaction::Absorb
        }
    }
}

/// Unpack the RGB part of a `0xAARRGGBB` color to 0-1 floats.
pub fn unpack_rgb(argb: u32) -> Color {
    Color::new(
        ((argb >> 16) & 0xFF) as f32 / 255.0,
        ((argb >> 8) & 0xFF) as f32 / 255.0,
        (argb & 0xFF) as f32 / 255.0,
    )
}

/// Pack a 0-1 color into an opaque `0xFFRRGGBB` pixel.
pub fn pack_argb(color: Color) -> u32 {
    let channel = |c: f32| -> u32 {
        if c.is_nan() {
            0
        } else {
            (c.clamp(0.0, 1.0) * 255.0).floor() as u32
        }
    };
    0xFF00_0000 | (channel(color.x) << 16) | (channel(color.y) << 8) | channel(color.z)
}
