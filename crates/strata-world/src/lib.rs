//! Coordinates, coherent noise, worldgen parameters and terrain generation.
#![forbid(unsafe_code)]

pub mod caves;
mod hash;
pub mod coords;
pub mod generation;
pub mod noise;
pub mod worldgen;

pub use coords::{
    CHUNK_SIZE, CHUNK_VOLUME, ChunkPos, LocalPos, WorldPos, chunk_and_local_to_world,
    chunk_to_world_center, world_to_chunk, world_to_local,
};
pub use generation::{GeneratedBlocks, GenerationError, PendingUpdate, TerrainGenerator};
pub use noise::{FractalShape, NoiseKind, NoiseSampler, NoiseSettings};
pub use worldgen::{WorldGenConfig, WorldGenParams};
