use serde::Deserialize;

use crate::noise::FractalShape;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub bands: Bands,
    #[serde(default)]
    pub caves: Caves,
    #[serde(default)]
    pub worms: Worms,
    #[serde(default)]
    pub trees: Trees,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Terrain {
    #[serde(default)]
    pub noise: FractalShape,
    #[serde(default = "default_height_multiplier")]
    pub height_multiplier: f32,
    #[serde(default = "default_air_cutoff")]
    pub air_cutoff: f32,
    #[serde(default = "default_top_layer_cutoff")]
    pub top_layer_cutoff: f32,
    #[serde(default = "default_second_layer_cutoff")]
    pub second_layer_cutoff: f32,
    #[serde(default = "default_band_jitter")]
    pub band_jitter: i32,
}
fn default_height_multiplier() -> f32 {
    0.012
}
fn default_air_cutoff() -> f32 {
    1.4
}
fn default_top_layer_cutoff() -> f32 {
    0.9
}
fn default_second_layer_cutoff() -> f32 {
    0.6
}
fn default_band_jitter() -> i32 {
    4
}
impl Default for Terrain {
    fn default() -> Self {
        Self {
            noise: FractalShape::default(),
            height_multiplier: default_height_multiplier(),
            air_cutoff: default_air_cutoff(),
            top_layer_cutoff: default_top_layer_cutoff(),
            second_layer_cutoff: default_second_layer_cutoff(),
            band_jitter: default_band_jitter(),
        }
    }
}

/// Altitude bands for the near-surface layer (lower bounds, before jitter) and the
/// subsurface dirt/stone split.
#[derive(Clone, Debug, Deserialize)]
pub struct Bands {
    #[serde(default = "default_snow_y")]
    pub snow_y: i32,
    #[serde(default = "default_stone_y")]
    pub stone_y: i32,
    #[serde(default = "default_grass_y")]
    pub grass_y: i32,
    #[serde(default = "default_dirt_y")]
    pub dirt_y: i32,
    #[serde(default = "default_subsurface_dirt_y")]
    pub subsurface_dirt_y: i32,
}
fn default_snow_y() -> i32 {
    140
}
fn default_stone_y() -> i32 {
    120
}
fn default_grass_y() -> i32 {
    80
}
fn default_dirt_y() -> i32 {
    72
}
fn default_subsurface_dirt_y() -> i32 {
    64
}
impl Default for Bands {
    fn default() -> Self {
        Self {
            snow_y: default_snow_y(),
            stone_y: default_stone_y(),
            grass_y: default_grass_y(),
            dirt_y: default_dirt_y(),
            subsurface_dirt_y: default_subsurface_dirt_y(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Caves {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_cave_cutoff")]
    pub cutoff: f32,
    #[serde(default = "default_cave_noise")]
    pub noise: FractalShape,
}
fn default_true() -> bool {
    true
}
fn default_cave_cutoff() -> f32 {
    0.75
}
fn default_cave_noise() -> FractalShape {
    FractalShape::new(0.03, 2.0, 2, 0.5)
}
impl Default for Caves {
    fn default() -> Self {
        Self {
            enable: true,
            cutoff: default_cave_cutoff(),
            noise: default_cave_noise(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Worms {
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Chance that a chunk seeds a worm head.
    #[serde(default = "default_worm_probability")]
    pub probability: f32,
    #[serde(default = "default_worm_max_segments")]
    pub max_segments: usize,
    #[serde(default = "default_worm_step_length")]
    pub step_length: f32,
    #[serde(default = "default_worm_min_radius")]
    pub min_radius: f32,
    #[serde(default = "default_worm_max_radius")]
    pub max_radius: f32,
    #[serde(default = "default_worm_max_chunk_distance")]
    pub max_chunk_distance: i32,
    #[serde(default = "default_worm_noise")]
    pub noise: FractalShape,
}
fn default_worm_probability() -> f32 {
    0.04
}
fn default_worm_max_segments() -> usize {
    48
}
fn default_worm_step_length() -> f32 {
    1.5
}
fn default_worm_min_radius() -> f32 {
    1.5
}
fn default_worm_max_radius() -> f32 {
    3.5
}
fn default_worm_max_chunk_distance() -> i32 {
    2
}
fn default_worm_noise() -> FractalShape {
    FractalShape::new(0.02, 2.0, 2, 0.5)
}
impl Default for Worms {
    fn default() -> Self {
        Self {
            enable: true,
            probability: default_worm_probability(),
            max_segments: default_worm_max_segments(),
            step_length: default_worm_step_length(),
            min_radius: default_worm_min_radius(),
            max_radius: default_worm_max_radius(),
            max_chunk_distance: default_worm_max_chunk_distance(),
            noise: default_worm_noise(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Trees {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_tree_probability")]
    pub probability: f32,
    #[serde(default = "default_trunk_min")]
    pub trunk_min: i32,
    #[serde(default = "default_trunk_max")]
    pub trunk_max: i32,
    #[serde(default = "default_leaf_radius")]
    pub leaf_radius: i32,
}
fn default_tree_probability() -> f32 {
    0.02
}
fn default_trunk_min() -> i32 {
    4
}
fn default_trunk_max() -> i32 {
    6
}
fn default_leaf_radius() -> i32 {
    2
}
impl Default for Trees {
    fn default() -> Self {
        Self {
            enable: true,
            probability: default_tree_probability(),
            trunk_min: default_trunk_min(),
            trunk_max: default_trunk_max(),
            leaf_radius: default_leaf_radius(),
        }
    }
}

/// Validated, flattened generation parameters consumed by `TerrainGenerator`.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldGenParams {
    pub terrain_noise: FractalShape,
    pub height_multiplier: f32,
    pub air_cutoff: f32,
    pub top_layer_cutoff: f32,
    pub second_layer_cutoff: f32,
    pub band_jitter: i32,
    pub snow_y: i32,
    pub stone_y: i32,
    pub grass_y: i32,
    pub dirt_y: i32,
    pub subsurface_dirt_y: i32,
    pub caves_enable: bool,
    pub cave_cutoff: f32,
    pub cave_noise: FractalShape,
    pub worms_enable: bool,
    pub worm_probability: f32,
    pub worm_max_segments: usize,
    pub worm_step_length: f32,
    pub worm_min_radius: f32,
    pub worm_max_radius: f32,
    pub worm_max_chunk_distance: i32,
    pub worm_noise: FractalShape,
    pub trees_enable: bool,
    pub tree_probability: f32,
    pub trunk_min: i32,
    pub trunk_max: i32,
    pub leaf_radius: i32,
}

impl WorldGenParams {
    pub fn from_config(cfg: &WorldGenConfig) -> Self {
        let t = &cfg.terrain;
        let mut cutoffs = [t.air_cutoff, t.top_layer_cutoff, t.second_layer_cutoff];
        if !(cutoffs[0] > cutoffs[1] && cutoffs[1] > cutoffs[2]) {
            log::warn!(
                "terrain cutoffs {:?} are not strictly descending; sorting them",
                cutoffs
            );
            cutoffs.sort_by(|a, b| b.total_cmp(a));
        }
        let (worm_min_radius, worm_max_radius) = ordered(cfg.worms.min_radius, cfg.worms.max_radius);
        let trunk_min = cfg.trees.trunk_min.max(1);
        Self {
            terrain_noise: t.noise,
            height_multiplier: t.height_multiplier,
            air_cutoff: cutoffs[0],
            top_layer_cutoff: cutoffs[1],
            second_layer_cutoff: cutoffs[2],
            band_jitter: t.band_jitter.max(0),
            snow_y: cfg.bands.snow_y,
            stone_y: cfg.bands.stone_y,
            grass_y: cfg.bands.grass_y,
            dirt_y: cfg.bands.dirt_y,
            subsurface_dirt_y: cfg.bands.subsurface_dirt_y,
            caves_enable: cfg.caves.enable,
            cave_cutoff: cfg.caves.cutoff,
            cave_noise: cfg.caves.noise,
            worms_enable: cfg.worms.enable,
            worm_probability: cfg.worms.probability.clamp(0.0, 1.0),
            worm_max_segments: cfg.worms.max_segments.max(1),
            worm_step_length: cfg.worms.step_length.max(0.1),
            worm_min_radius,
            worm_max_radius,
            worm_max_chunk_distance: cfg.worms.max_chunk_distance.max(0),
            worm_noise: cfg.worms.noise,
            trees_enable: cfg.trees.enable,
            tree_probability: cfg.trees.probability.clamp(0.0, 1.0),
            trunk_min,
            trunk_max: cfg.trees.trunk_max.max(trunk_min),
            leaf_radius: cfg.trees.leaf_radius.max(1),
        }
    }
}

impl Default for WorldGenParams {
    fn default() -> Self {
        Self::from_config(&WorldGenConfig::default())
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}
