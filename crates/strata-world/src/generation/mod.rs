//! Voxel classification: terrain density bands, ridged-noise caves, worm tunnels and trees.

mod trees;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_blocks::{Block, BlockId, BlockRegistry};
use thiserror::Error;

use crate::caves::{self, WormShape};
use crate::coords::{CHUNK_VOLUME, ChunkPos, LocalPos, WorldPos, chunk_and_local_to_world};
use crate::hash;
use crate::noise::{NoiseSampler, NoiseSettings};
use crate::worldgen::WorldGenParams;

const JITTER_SALT: u32 = 0x5bd1_e995;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("block `{0}` used by the terrain generator is not registered")]
    MissingBlock(&'static str),
}

/// A block write addressed to a chunk that may not be generated yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub pos: WorldPos,
    pub type_id: BlockId,
}

impl PendingUpdate {
    #[inline]
    pub const fn new(pos: WorldPos, type_id: BlockId) -> Self {
        Self { pos, type_id }
    }

    #[inline]
    pub fn target(&self) -> ChunkPos {
        crate::coords::world_to_chunk(self.pos)
    }
}

/// Ids of every block the generator writes, resolved once against the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainBlocks {
    pub air: BlockId,
    pub stone: BlockId,
    pub dirt: BlockId,
    pub grass: BlockId,
    pub sand: BlockId,
    pub snow: BlockId,
    pub wood: BlockId,
    pub leaves: BlockId,
}

impl TerrainBlocks {
    pub fn resolve(reg: &BlockRegistry) -> Result<Self, GenerationError> {
        let id = |name: &'static str| {
            reg.id_by_name(name)
                .ok_or(GenerationError::MissingBlock(name))
        };
        Ok(Self {
            air: id("air")?,
            stone: id("stone")?,
            dirt: id("dirt")?,
            grass: id("grass")?,
            sand: id("sand")?,
            snow: id("snow")?,
            wood: id("wood")?,
            leaves: id("leaves")?,
        })
    }
}

/// Classifies one voxel from its terrain density `h`, altitude `y` and band jitter.
///
/// Ties on a cutoff resolve to the denser class.
pub fn classify_voxel(
    h: f32,
    y: i32,
    jitter: i32,
    params: &WorldGenParams,
    ids: &TerrainBlocks,
) -> BlockId {
    if h > params.air_cutoff {
        ids.air
    } else if h > params.top_layer_cutoff {
        let yj = y - jitter;
        if yj >= params.snow_y {
            ids.snow
        } else if yj >= params.stone_y {
            ids.stone
        } else if yj >= params.grass_y {
            ids.grass
        } else if yj >= params.dirt_y {
            ids.dirt
        } else {
            ids.sand
        }
    } else if h > params.second_layer_cutoff {
        if y >= params.subsurface_dirt_y {
            ids.dirt
        } else {
            ids.stone
        }
    } else {
        ids.stone
    }
}

/// Voxel array for one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedBlocks {
    pub pos: ChunkPos,
    pub blocks: Vec<Block>,
}

/// Deterministic chunk generator; identical `(seed, params)` give identical chunks.
#[derive(Debug)]
pub struct TerrainGenerator {
    seed: i32,
    params: WorldGenParams,
    reg: Arc<BlockRegistry>,
    ids: TerrainBlocks,
    /// Block value per id, carrying the type's light emission.
    values: Vec<Block>,
    terrain: NoiseSampler,
    caves: NoiseSampler,
    direction: NoiseSampler,
}

impl TerrainGenerator {
    pub fn new(
        seed: i32,
        params: WorldGenParams,
        reg: Arc<BlockRegistry>,
    ) -> Result<Self, GenerationError> {
        let ids = TerrainBlocks::resolve(&reg)?;
        let values = reg.iter().map(|ty| ty.block()).collect();
        Ok(Self {
            seed,
            terrain: NoiseSampler::new(NoiseSettings::terrain_with(seed, params.terrain_noise)),
            caves: NoiseSampler::new(NoiseSettings::caves_with(seed, params.cave_noise)),
            direction: NoiseSampler::new(NoiseSettings::direction_with(seed, params.worm_noise)),
            params,
            reg,
            ids,
            values,
        })
    }

    #[inline]
    pub fn seed(&self) -> i32 {
        self.seed
    }

    #[inline]
    pub fn params(&self) -> &WorldGenParams {
        &self.params
    }

    #[inline]
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.reg
    }

    #[inline]
    pub fn blocks(&self) -> &TerrainBlocks {
        &self.ids
    }

    /// Voxel value for a block id; unknown ids map to air.
    #[inline]
    pub fn block_value(&self, id: BlockId) -> Block {
        self.values.get(id as usize).copied().unwrap_or(Block::AIR)
    }

    /// Terrain density `h = noise + height_multiplier * y`.
    #[inline]
    pub fn density(&self, p: WorldPos) -> f32 {
        self.terrain.sample_at(p) + self.params.height_multiplier * p.y as f32
    }

    #[inline]
    fn band_jitter(&self, p: WorldPos) -> i32 {
        let h = hash::hash3(p.x, p.y, p.z, self.seed as u32 ^ JITTER_SALT);
        hash::signed(h, self.params.band_jitter)
    }

    /// Terrain and ridged-noise cave classification of one voxel. Worm tunnels and
    /// trees are chunk-level passes and not reflected here.
    pub fn classify(&self, p: WorldPos) -> BlockId {
        let base = classify_voxel(
            self.density(p),
            p.y,
            self.band_jitter(p),
            &self.params,
            &self.ids,
        );
        if base != self.ids.air
            && self.params.caves_enable
            && self.caves.sample_at(p) > self.params.cave_cutoff
        {
            return self.ids.air;
        }
        base
    }

    /// Generates the full voxel array for a chunk, including the parts of trees
    /// rooted in its neighbours.
    pub fn generate(&self, pos: ChunkPos) -> GeneratedBlocks {
        let mut blocks = Vec::with_capacity(CHUNK_VOLUME);
        for i in 0..CHUNK_VOLUME {
            let wp = chunk_and_local_to_world(pos, LocalPos::from_index(i));
            blocks.push(self.block_value(self.classify(wp)));
        }
        if self.params.worms_enable {
            self.carve_worms(pos, &mut blocks);
        }
        if self.params.trees_enable {
            trees::place_trees(self, pos, &mut blocks);
        }
        GeneratedBlocks { pos, blocks }
    }

    fn worm_shape(&self) -> WormShape {
        WormShape {
            step_length: self.params.worm_step_length,
            min_radius: self.params.worm_min_radius,
            max_radius: self.params.worm_max_radius,
            max_segments: self.params.worm_max_segments,
            max_chunk_distance: self.params.worm_max_chunk_distance,
        }
    }

    fn carve_worms(&self, pos: ChunkPos, blocks: &mut [Block]) {
        let shape = self.worm_shape();
        let air = self.block_value(self.ids.air);
        let (h_reach, v_reach) = shape.chunk_reach();
        for dz in -h_reach..=h_reach {
            for dy in -v_reach..=v_reach {
                for dx in -h_reach..=h_reach {
                    let head_chunk = pos.offset(dx, dy, dz);
                    let Some(head) =
                        caves::worm_head(self.seed as u32, head_chunk, self.params.worm_probability)
                    else {
                        continue;
                    };
                    let worm = caves::CaveWorm::grow(head, &self.direction, &shape);
                    worm.carve_into(pos, blocks, air);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> TerrainBlocks {
        TerrainBlocks::resolve(&BlockRegistry::builtin()).unwrap()
    }

    #[test]
    fn dense_air_threshold_wins_at_any_height() {
        let p = WorldGenParams::default();
        let ids = ids();
        for y in [-500, 0, 95, 4000] {
            assert_eq!(classify_voxel(1.6, y, 0, &p, &ids), ids.air);
        }
    }

    #[test]
    fn subsurface_band_uses_altitude() {
        let p = WorldGenParams::default();
        let ids = ids();
        assert_eq!(classify_voxel(0.7, 95, 0, &p, &ids), ids.dirt);
        assert_eq!(classify_voxel(0.7, 10, 0, &p, &ids), ids.stone);
        assert_eq!(classify_voxel(0.2, 95, 0, &p, &ids), ids.stone);
    }

    #[test]
    fn cutoff_equality_resolves_to_denser_class() {
        let p = WorldGenParams::default();
        let ids = ids();
        assert_ne!(classify_voxel(p.air_cutoff, 95, 0, &p, &ids), ids.air);
        assert_eq!(classify_voxel(p.top_layer_cutoff, 95, 0, &p, &ids), ids.dirt);
        assert_eq!(classify_voxel(p.second_layer_cutoff, 95, 0, &p, &ids), ids.stone);
    }

    #[test]
    fn top_layer_bands_shift_with_jitter() {
        let p = WorldGenParams::default();
        let ids = ids();
        let h = 1.0;
        assert_eq!(classify_voxel(h, p.snow_y, 0, &p, &ids), ids.snow);
        assert_eq!(classify_voxel(h, p.snow_y, 1, &p, &ids), ids.stone);
        assert_eq!(classify_voxel(h, p.grass_y + 2, 0, &p, &ids), ids.grass);
        assert_eq!(classify_voxel(h, p.dirt_y, 0, &p, &ids), ids.dirt);
        assert_eq!(classify_voxel(h, p.dirt_y - 1, 0, &p, &ids), ids.sand);
    }

    #[test]
    fn missing_block_is_reported_at_construction() {
        use strata_blocks::registry::BUILTIN_BLOCKS;
        let defs: Vec<_> = BUILTIN_BLOCKS
            .iter()
            .copied()
            .filter(|d| d.name != "snow")
            .collect();
        let reg = Arc::new(BlockRegistry::from_defs(&defs).unwrap());
        let err = TerrainGenerator::new(1, WorldGenParams::default(), reg).unwrap_err();
        assert_eq!(err, GenerationError::MissingBlock("snow"));
    }

    #[test]
    fn glowing_blocks_carry_their_emission() {
        let reg = Arc::new(BlockRegistry::builtin());
        let generator = TerrainGenerator::new(1, WorldGenParams::default(), reg.clone()).unwrap();
        let glow = reg.id_by_name("glowstone").unwrap();
        assert_eq!(generator.block_value(glow).light_value, 15);
        assert_eq!(generator.block_value(9999), Block::AIR);
    }
}
