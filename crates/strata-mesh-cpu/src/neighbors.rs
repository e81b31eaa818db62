use strata_blocks::{Block, Face};
use strata_chunk::Chunk;
use strata_world::{ChunkPos, WorldPos, world_to_chunk};

/// Voxel lookups outside the chunk being meshed.
pub trait NeighborSource {
    /// The voxel at `p`, or `None` if its chunk is missing or not yet generated.
    fn neighbor_block(&self, p: WorldPos) -> Option<Block>;
}

/// Every outside voxel is unknown.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoNeighbors;

impl NeighborSource for NoNeighbors {
    #[inline]
    fn neighbor_block(&self, _p: WorldPos) -> Option<Block> {
        None
    }
}

impl<F> NeighborSource for F
where
    F: Fn(WorldPos) -> Option<Block>,
{
    #[inline]
    fn neighbor_block(&self, p: WorldPos) -> Option<Block> {
        self(p)
    }
}

/// The six face neighbours of a chunk, indexed by `Face::index`.
#[derive(Clone, Copy, Debug)]
pub struct ChunkNeighbors<'a> {
    center: ChunkPos,
    chunks: [Option<&'a Chunk>; 6],
}

impl<'a> ChunkNeighbors<'a> {
    pub fn new(center: ChunkPos) -> Self {
        Self {
            center,
            chunks: [None; 6],
        }
    }

    /// Registers `chunk` if it is one of the face neighbours of the centre.
    pub fn insert(&mut self, chunk: &'a Chunk) -> bool {
        for face in Face::ALL {
            if self.center.neighbor(face) == chunk.pos() {
                self.chunks[face.index()] = Some(chunk);
                return true;
            }
        }
        false
    }

    #[inline]
    pub fn get(&self, face: Face) -> Option<&'a Chunk> {
        self.chunks[face.index()]
    }
}

impl NeighborSource for ChunkNeighbors<'_> {
    fn neighbor_block(&self, p: WorldPos) -> Option<Block> {
        let target = world_to_chunk(p);
        self.chunks
            .iter()
            .flatten()
            .find(|c| c.pos() == target)
            .filter(|c| c.is_generated())
            .and_then(|c| c.get_world(p))
    }
}
