//! Block updates waiting for their chunk, and edit seam bookkeeping.
#![forbid(unsafe_code)]

use std::collections::HashMap;

use strata_blocks::Face;
use strata_world::{CHUNK_SIZE, ChunkPos, PendingUpdate, WorldPos, world_to_chunk, world_to_local};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStoreStats {
    pub targets: usize,
    pub updates: usize,
}

/// Updates addressed to chunks that are not generated, keyed by target chunk.
/// Updates for one target keep arrival order so later writes win on replay.
#[derive(Default, Debug, Clone)]
pub struct PendingStore {
    inner: HashMap<ChunkPos, Vec<PendingUpdate>>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, update: PendingUpdate) {
        self.inner.entry(update.target()).or_default().push(update);
    }

    pub fn extend(&mut self, updates: impl IntoIterator<Item = PendingUpdate>) {
        for u in updates {
            self.push(u);
        }
    }

    /// Removes and returns everything addressed to `pos`.
    pub fn take_for(&mut self, pos: ChunkPos) -> Vec<PendingUpdate> {
        self.inner.remove(&pos).unwrap_or_default()
    }

    /// Empties the store, grouped by target.
    pub fn drain_all(&mut self) -> Vec<(ChunkPos, Vec<PendingUpdate>)> {
        self.inner.drain().collect()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> PendingStoreStats {
        PendingStoreStats {
            targets: self.inner.len(),
            updates: self.inner.values().map(Vec::len).sum(),
        }
    }
}

/// Face neighbours whose mesh depends on the voxel at `p`: one per local coordinate
/// sitting on the chunk shell. Diagonal chunks never share a face with the voxel.
pub fn affected_neighbors(p: WorldPos) -> Vec<ChunkPos> {
    let c = world_to_chunk(p);
    let l = world_to_local(p);
    let last = CHUNK_SIZE as i32 - 1;
    let mut out = Vec::with_capacity(3);
    let axes = [
        (l.x, Face::NegX, Face::PosX),
        (l.y, Face::NegY, Face::PosY),
        (l.z, Face::NegZ, Face::PosZ),
    ];
    for (v, low, high) in axes {
        if v == 0 {
            out.push(c.neighbor(low));
        }
        if v == last {
            out.push(c.neighbor(high));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_world::{LocalPos, chunk_and_local_to_world};

    #[test]
    fn minus_x_seam_flags_only_minus_x() {
        let c = ChunkPos::new(4, 7, -2);
        let p = chunk_and_local_to_world(c, LocalPos::new(0, 5, 5));
        assert_eq!(affected_neighbors(p), vec![ChunkPos::new(3, 7, -2)]);
    }

    #[test]
    fn corner_flags_three_face_neighbours() {
        let c = ChunkPos::new(0, 0, 0);
        let p = chunk_and_local_to_world(c, LocalPos::new(15, 0, 15));
        let mut got = affected_neighbors(p);
        got.sort_by_key(|c| (c.cx, c.cy, c.cz));
        assert_eq!(
            got,
            vec![
                ChunkPos::new(0, -1, 0),
                ChunkPos::new(0, 0, 1),
                ChunkPos::new(1, 0, 0),
            ]
        );
    }

    #[test]
    fn interior_voxel_flags_nothing() {
        assert!(affected_neighbors(WorldPos::new(-8, 3, 40)).is_empty());
    }

    #[test]
    fn store_groups_by_target_and_keeps_order() {
        let mut store = PendingStore::new();
        let p = WorldPos::new(-1, 2, 3);
        store.push(PendingUpdate::new(p, 1));
        store.push(PendingUpdate::new(WorldPos::new(40, 0, 0), 2));
        store.push(PendingUpdate::new(p, 3));
        assert_eq!(store.stats(), PendingStoreStats { targets: 2, updates: 3 });
        let target = world_to_chunk(p);
        let taken = store.take_for(target);
        assert_eq!(taken.iter().map(|u| u.type_id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(store.stats(), PendingStoreStats { targets: 1, updates: 1 });
        assert!(store.take_for(target).is_empty());
        assert_eq!(store.drain_all().len(), 1);
        assert!(store.is_empty());
    }
}
