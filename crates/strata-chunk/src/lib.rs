//! Chunk voxel storage and its generation state machine.
#![forbid(unsafe_code)]

use std::sync::Arc;

use strata_blocks::Block;
use strata_geom::MeshOutput;
use strata_world::{
    CHUNK_VOLUME, ChunkPos, GeneratedBlocks, LocalPos, PendingUpdate, TerrainGenerator, WorldPos,
    chunk_and_local_to_world, world_to_chunk, world_to_local,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Allocated, voxel array not yet populated. Readers treat it as not loaded.
    Empty,
    Generated,
    Meshed,
    /// The consumer has received the current mesh.
    Rendered,
}

/// Whether `generate`/`install_blocks` may overwrite an already populated chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GeneratePolicy {
    #[default]
    Once,
    /// Re-run classification on every request (debug worlds).
    Regenerate,
}

#[derive(Clone, Debug)]
pub struct Chunk {
    pos: ChunkPos,
    state: ChunkState,
    blocks: Box<[Block]>,
    modified: bool,
    needs_update: bool,
    pending: Vec<PendingUpdate>,
    mesh: Option<Arc<MeshOutput>>,
    /// Bumped on every change a mesh depends on.
    revision: u64,
    detached: bool,
}

impl Chunk {
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            state: ChunkState::Empty,
            blocks: vec![Block::AIR; CHUNK_VOLUME].into_boxed_slice(),
            modified: false,
            needs_update: false,
            pending: Vec::new(),
            mesh: None,
            revision: 0,
            detached: false,
        }
    }

    #[inline]
    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        self.state
    }

    #[inline]
    pub fn is_generated(&self) -> bool {
        self.state != ChunkState::Empty
    }

    /// Set by the first player edit or applied foreign update; never cleared.
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    #[inline]
    pub fn mark_needs_update(&mut self) {
        self.needs_update = true;
        self.revision += 1;
    }

    #[inline]
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Marks the chunk as removed from the world; writers must go elsewhere.
    #[inline]
    pub fn detach(&mut self) {
        self.detached = true;
    }

    #[inline]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn get_local(&self, l: LocalPos) -> Block {
        self.blocks[l.index()]
    }

    /// Voxel at a world position, `None` when it lies outside this chunk.
    #[inline]
    pub fn get_world(&self, p: WorldPos) -> Option<Block> {
        (world_to_chunk(p) == self.pos).then(|| self.blocks[world_to_local(p).index()])
    }

    #[inline]
    pub fn world_pos(&self, l: LocalPos) -> WorldPos {
        chunk_and_local_to_world(self.pos, l)
    }

    /// Classifies the chunk with `generator` and installs the result. Returns `false`
    /// when the chunk was already populated and `policy` forbids regeneration.
    pub fn generate(&mut self, generator: &TerrainGenerator, policy: GeneratePolicy) -> bool {
        if self.is_generated() && policy == GeneratePolicy::Once {
            return false;
        }
        let out = generator.generate(self.pos);
        self.install_blocks(out, policy)
    }

    /// Installs a voxel array produced off-lock. `Empty -> Generated`.
    pub fn install_blocks(&mut self, generated: GeneratedBlocks, policy: GeneratePolicy) -> bool {
        if generated.pos != self.pos || generated.blocks.len() != CHUNK_VOLUME {
            log::warn!(
                "rejecting voxel array for {:?} on chunk {:?} ({} voxels)",
                generated.pos,
                self.pos,
                generated.blocks.len()
            );
            return false;
        }
        self.install_raw(generated.blocks, policy)
    }

    /// Installs a full voxel array, e.g. one loaded from disk.
    pub fn install_raw(&mut self, blocks: Vec<Block>, policy: GeneratePolicy) -> bool {
        if blocks.len() != CHUNK_VOLUME {
            return false;
        }
        let regenerating = self.is_generated();
        if regenerating && policy == GeneratePolicy::Once {
            return false;
        }
        self.blocks = blocks.into_boxed_slice();
        self.state = ChunkState::Generated;
        self.needs_update = regenerating;
        self.revision += 1;
        true
    }

    /// Writes one voxel on behalf of the player. Returns the previous value.
    pub fn set_block_local(&mut self, l: LocalPos, b: Block) -> Block {
        let idx = l.index();
        let prev = std::mem::replace(&mut self.blocks[idx], b);
        self.modified = true;
        self.mark_needs_update();
        prev
    }

    /// Queues an update until the chunk is generated.
    pub fn queue_pending(&mut self, update: PendingUpdate) {
        self.pending.push(update);
    }

    #[inline]
    pub fn pending(&self) -> &[PendingUpdate] {
        &self.pending
    }

    pub fn take_pending(&mut self) -> Vec<PendingUpdate> {
        std::mem::take(&mut self.pending)
    }

    /// Applies queued updates once generated, resolving ids with `value`.
    /// Returns how many voxels were written.
    pub fn apply_pending(&mut self, value: impl Fn(u16) -> Block) -> usize {
        if !self.is_generated() || self.pending.is_empty() {
            return 0;
        }
        let updates = std::mem::take(&mut self.pending);
        let mut applied = 0;
        for u in updates {
            if self.apply_update(u, &value) {
                applied += 1;
            }
        }
        applied
    }

    /// Writes one foreign update into a generated chunk, marking it Modified.
    pub fn apply_update(&mut self, u: PendingUpdate, value: impl Fn(u16) -> Block) -> bool {
        if world_to_chunk(u.pos) != self.pos {
            log::debug!("dropping update {:?} misaddressed to {:?}", u, self.pos);
            return false;
        }
        if !self.is_generated() {
            self.pending.push(u);
            return false;
        }
        self.set_block_local(world_to_local(u.pos), value(u.type_id));
        true
    }

    /// Replaces the chunk's mesh. `Generated | Meshed | Rendered -> Meshed`.
    ///
    /// `built_from` is the revision the mesh was built from; if the chunk changed
    /// since, it stays flagged for another re-mesh.
    pub fn set_mesh(&mut self, mesh: Arc<MeshOutput>, built_from: u64) {
        debug_assert!(self.is_generated());
        self.mesh = Some(mesh);
        self.state = ChunkState::Meshed;
        self.needs_update = self.revision != built_from;
    }

    #[inline]
    pub fn mesh(&self) -> Option<&Arc<MeshOutput>> {
        self.mesh.as_ref()
    }

    /// Consumer hand-off. Returns `false` unless the chunk was `Meshed`.
    pub fn mark_rendered(&mut self) -> bool {
        if self.state == ChunkState::Meshed {
            self.state = ChunkState::Rendered;
            true
        } else {
            false
        }
    }

    /// Voxel type ids in index order, as persisted.
    pub fn block_ids(&self) -> Vec<u16> {
        self.blocks.iter().map(|b| b.type_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_blocks::BlockRegistry;
    use strata_geom::{Vec2, Vec3};
    use strata_world::WorldGenParams;

    fn generator() -> TerrainGenerator {
        TerrainGenerator::new(9, WorldGenParams::default(), Arc::new(BlockRegistry::builtin()))
            .unwrap()
    }

    fn quad_mesh() -> MeshOutput {
        let mut m = MeshOutput::new();
        m.add_quad([Vec3::ZERO; 4], [Vec2::new(0.0, 0.0); 4]);
        m
    }

    #[test]
    fn generate_runs_once_unless_regenerating() {
        let generator = generator();
        let mut c = Chunk::new(ChunkPos::new(0, 5, 0));
        assert_eq!(c.state(), ChunkState::Empty);
        assert!(c.generate(&generator, GeneratePolicy::Once));
        assert_eq!(c.state(), ChunkState::Generated);
        assert!(!c.needs_update());
        assert!(!c.generate(&generator, GeneratePolicy::Once));
        let before = c.blocks().to_vec();
        assert!(c.generate(&generator, GeneratePolicy::Regenerate));
        assert_eq!(c.blocks(), &before[..]);
        assert!(c.needs_update());
    }

    #[test]
    fn mesh_lifecycle() {
        let mut c = Chunk::new(ChunkPos::new(0, 0, 0));
        assert!(!c.mark_rendered());
        c.install_raw(vec![Block::AIR; CHUNK_VOLUME], GeneratePolicy::Once);
        c.mark_needs_update();
        c.set_mesh(Arc::new(quad_mesh()), c.revision());
        assert_eq!(c.state(), ChunkState::Meshed);
        assert!(!c.needs_update());
        assert!(c.mark_rendered());
        assert_eq!(c.state(), ChunkState::Rendered);
        c.set_mesh(Arc::new(MeshOutput::new()), c.revision());
        assert_eq!(c.state(), ChunkState::Meshed);
        assert!(c.mesh().unwrap().is_empty());
    }

    #[test]
    fn stale_mesh_keeps_update_flag() {
        let mut c = Chunk::new(ChunkPos::new(0, 0, 0));
        c.install_raw(vec![Block::AIR; CHUNK_VOLUME], GeneratePolicy::Once);
        let built_from = c.revision();
        c.set_block_local(LocalPos::new(1, 1, 1), Block::new(1));
        c.set_mesh(Arc::new(quad_mesh()), built_from);
        assert_eq!(c.state(), ChunkState::Meshed);
        assert!(c.needs_update());
        c.set_mesh(Arc::new(quad_mesh()), c.revision());
        assert!(!c.needs_update());
    }

    #[test]
    fn pending_updates_wait_for_generation() {
        let pos = ChunkPos::new(-1, 0, 2);
        let mut c = Chunk::new(pos);
        let target = chunk_and_local_to_world(pos, LocalPos::new(3, 4, 5));
        let stone = Block::new(1);
        assert!(!c.apply_update(PendingUpdate::new(target, 1), |_| stone));
        assert_eq!(c.pending().len(), 1);
        assert_eq!(c.apply_pending(|_| stone), 0);

        c.install_raw(vec![Block::AIR; CHUNK_VOLUME], GeneratePolicy::Once);
        assert!(!c.is_modified());
        assert_eq!(c.apply_pending(|_| stone), 1);
        assert!(c.pending().is_empty());
        assert_eq!(c.get_local(LocalPos::new(3, 4, 5)), stone);
        assert_eq!(c.get_world(target), Some(stone));
        assert!(c.is_modified());
        assert!(c.needs_update());
    }

    #[test]
    fn misaddressed_updates_are_dropped() {
        let mut c = Chunk::new(ChunkPos::new(0, 0, 0));
        c.install_raw(vec![Block::AIR; CHUNK_VOLUME], GeneratePolicy::Once);
        assert!(!c.apply_update(PendingUpdate::new(WorldPos::new(16, 0, 0), 1), Block::new));
        assert!(!c.is_modified());
        assert!(c.pending().is_empty());
    }

    #[test]
    fn mismatched_arrays_are_rejected() {
        let mut c = Chunk::new(ChunkPos::new(0, 0, 0));
        assert!(!c.install_raw(vec![Block::AIR; 10], GeneratePolicy::Once));
        let wrong = GeneratedBlocks {
            pos: ChunkPos::new(1, 0, 0),
            blocks: vec![Block::AIR; CHUNK_VOLUME],
        };
        assert!(!c.install_blocks(wrong, GeneratePolicy::Once));
        assert_eq!(c.state(), ChunkState::Empty);
    }
}
