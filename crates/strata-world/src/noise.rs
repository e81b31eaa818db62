use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use serde::{Deserialize, Serialize};

use crate::coords::WorldPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    /// Summed octaves of gradient noise.
    Fbm,
    /// Octaves folded around zero; produces sharp ridges used for caves.
    Ridged,
}

/// Octave shape of a fractal noise field, as read from worldgen config.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FractalShape {
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default = "default_octaves")]
    pub octaves: i32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
}

fn default_frequency() -> f32 {
    0.01
}
fn default_lacunarity() -> f32 {
    2.0
}
fn default_octaves() -> i32 {
    4
}
fn default_persistence() -> f32 {
    0.5
}

impl Default for FractalShape {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            lacunarity: default_lacunarity(),
            octaves: default_octaves(),
            persistence: default_persistence(),
        }
    }
}

impl FractalShape {
    pub const fn new(frequency: f32, lacunarity: f32, octaves: i32, persistence: f32) -> Self {
        Self {
            frequency,
            lacunarity,
            octaves,
            persistence,
        }
    }
}

const TERRAIN_SALT: i32 = 0x1f12_3bb5;
const CAVES_SALT: i32 = 0x2545_f491;
const DIRECTION_SALT: i32 = 0x0b5a_d4ec;
const ROTATION_SALT: i32 = 0x68e3_1da4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseSettings {
    pub kind: NoiseKind,
    pub shape: FractalShape,
    pub seed: i32,
}

impl NoiseSettings {
    pub fn new(kind: NoiseKind, shape: FractalShape, seed: i32) -> Self {
        Self { kind, shape, seed }
    }

    pub fn terrain(seed: i32) -> Self {
        Self::terrain_with(seed, FractalShape::default())
    }

    pub fn terrain_with(seed: i32, shape: FractalShape) -> Self {
        Self::new(NoiseKind::Fbm, shape, seed ^ TERRAIN_SALT)
    }

    pub fn caves(seed: i32) -> Self {
        Self::caves_with(seed, FractalShape::new(0.03, 2.0, 2, 0.5))
    }

    pub fn caves_with(seed: i32, shape: FractalShape) -> Self {
        Self::new(NoiseKind::Ridged, shape, seed ^ CAVES_SALT)
    }

    /// Low-frequency field steering cave worms.
    pub fn direction(seed: i32) -> Self {
        Self::direction_with(seed, FractalShape::new(0.02, 2.0, 2, 0.5))
    }

    pub fn direction_with(seed: i32, shape: FractalShape) -> Self {
        Self::new(NoiseKind::Fbm, shape, seed ^ DIRECTION_SALT)
    }

    /// High-frequency single-octave field picking per-voxel texture rotation.
    pub fn rotation(seed: i32) -> Self {
        Self::new(
            NoiseKind::Fbm,
            FractalShape::new(0.37, 2.0, 1, 0.5),
            seed ^ ROTATION_SALT,
        )
    }
}

/// Deterministic 3D noise field. Sampling is pure in `(settings, x, y, z)`.
pub struct NoiseSampler {
    settings: NoiseSettings,
    noise: FastNoiseLite,
}

impl NoiseSampler {
    pub fn new(settings: NoiseSettings) -> Self {
        let mut noise = FastNoiseLite::with_seed(settings.seed);
        noise.set_noise_type(Some(NoiseType::Perlin));
        noise.set_fractal_type(Some(match settings.kind {
            NoiseKind::Fbm => FractalType::FBm,
            NoiseKind::Ridged => FractalType::Ridged,
        }));
        noise.set_frequency(Some(settings.shape.frequency));
        noise.set_fractal_octaves(Some(settings.shape.octaves.max(1)));
        noise.set_fractal_lacunarity(Some(settings.shape.lacunarity));
        noise.set_fractal_gain(Some(settings.shape.persistence));
        Self { settings, noise }
    }

    #[inline]
    pub fn settings(&self) -> &NoiseSettings {
        &self.settings
    }

    /// Noise value, roughly in `[-1, 1]`.
    #[inline]
    pub fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        self.noise.get_noise_3d(x, y, z)
    }

    #[inline]
    pub fn sample_at(&self, p: WorldPos) -> f32 {
        self.sample(p.x as f32, p.y as f32, p.z as f32)
    }
}

impl std::fmt::Debug for NoiseSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseSampler")
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_settings_same_values() {
        let a = NoiseSampler::new(NoiseSettings::terrain(7));
        let b = NoiseSampler::new(NoiseSettings::terrain(7));
        for i in 0..64 {
            let (x, y, z) = (i as f32 * 3.3, i as f32 * -1.7, i as f32 * 0.9);
            assert_eq!(a.sample(x, y, z), b.sample(x, y, z));
        }
    }

    #[test]
    fn presets_derive_distinct_seeds() {
        let seeds = [
            NoiseSettings::terrain(1).seed,
            NoiseSettings::caves(1).seed,
            NoiseSettings::direction(1).seed,
            NoiseSettings::rotation(1).seed,
        ];
        for i in 0..seeds.len() {
            for j in (i + 1)..seeds.len() {
                assert_ne!(seeds[i], seeds[j]);
            }
        }
    }

    #[test]
    fn samples_are_bounded() {
        let n = NoiseSampler::new(NoiseSettings::caves(99));
        for i in 0..500 {
            let v = n.sample(i as f32 * 1.31, (i % 37) as f32, i as f32 * -0.77);
            assert!(v.is_finite());
            assert!((-1.5..=1.5).contains(&v));
        }
    }
}
