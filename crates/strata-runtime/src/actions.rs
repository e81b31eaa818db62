use std::sync::Arc;

use parking_lot::Mutex;
use strata_geom::MeshOutput;
use strata_world::{ChunkPos, WorldPos};

/// Instruction for the consumer, produced by the streaming worker.
#[derive(Clone, Debug)]
pub enum Action {
    /// Show (or replace) the chunk's mesh; vertices are relative to `placement`.
    Materialize {
        pos: ChunkPos,
        placement: WorldPos,
        mesh: Arc<MeshOutput>,
    },
    Destroy {
        pos: ChunkPos,
    },
}

impl Action {
    #[inline]
    pub fn pos(&self) -> ChunkPos {
        match self {
            Action::Materialize { pos, .. } | Action::Destroy { pos } => *pos,
        }
    }
}

/// Receives chunk meshes on the consumer thread. Never sees voxel data.
pub trait Presenter {
    fn materialize(&mut self, pos: ChunkPos, placement: WorldPos, mesh: &MeshOutput);
    fn destroy(&mut self, pos: ChunkPos);
}

/// Worker → consumer hand-off. Locked only to push or to swap out the batch.
#[derive(Default)]
pub struct ActionQueue {
    inner: Mutex<Vec<Action>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, action: Action) {
        self.inner.lock().push(action);
    }

    /// Takes every queued action in push order.
    pub fn drain(&self) -> Vec<Action> {
        std::mem::take(&mut *self.inner.lock())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
