use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use strata_chunk::Chunk;
use strata_world::ChunkPos;
use thiserror::Error;

pub type ChunkHandle = Arc<RwLock<Chunk>>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    /// The chunk is absent or not generated yet. Its voxels are unknown, not air.
    #[error("chunk {0:?} is not loaded")]
    ChunkNotLoaded(ChunkPos),
}

/// Concurrent map of every loaded chunk.
///
/// Membership changes only on the streaming worker. Chunk contents sit behind
/// their own lock so readers of one chunk never block writers of another.
#[derive(Default)]
pub struct WorldIndex {
    chunks: RwLock<HashMap<ChunkPos, ChunkHandle>>,
}

impl WorldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        self.chunks.read().get(&pos).cloned()
    }

    #[inline]
    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.read().contains_key(&pos)
    }

    /// Inserts an `Empty` chunk at `pos` unless one is already present.
    pub fn insert_empty(&self, pos: ChunkPos) -> ChunkHandle {
        let mut map = self.chunks.write();
        map.entry(pos)
            .or_insert_with(|| Arc::new(RwLock::new(Chunk::new(pos))))
            .clone()
    }

    pub fn remove(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        self.chunks.write().remove(&pos)
    }

    pub fn positions(&self) -> Vec<ChunkPos> {
        self.chunks.read().keys().copied().collect()
    }

    /// Clones every handle so callers can lock chunks without holding the map.
    pub fn handles(&self) -> Vec<(ChunkPos, ChunkHandle)> {
        self.chunks
            .read()
            .iter()
            .map(|(p, h)| (*p, h.clone()))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }
}
