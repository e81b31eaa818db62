use std::iter;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use hashbrown::HashSet;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use strata_blocks::{Block, BlockId, BlockRegistry, Face, Transparency};
use strata_chunk::{ChunkState, GeneratePolicy};
use strata_edit::{PendingStore, affected_neighbors};
use strata_geom::{MeshOutput, Vec3};
use strata_io::{ChunkRecord, PersistenceError, PersistenceStore};
use strata_mesh_cpu::{ChunkNeighbors, MeshContext, TextureAtlas, build_chunk_mesh};
use strata_world::{
    ChunkPos, GeneratedBlocks, GenerationError, PendingUpdate, TerrainGenerator, WorldGenParams,
    WorldPos, chunk_to_world_center, world_to_chunk,
};
use thiserror::Error;

use crate::actions::{Action, ActionQueue, Presenter};
use crate::config::StreamingConfig;
use crate::index::{ChunkHandle, LookupError, WorldIndex};

#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("failed to spawn streaming worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    #[error("unknown block type {0}")]
    UnknownBlockType(BlockId),
    #[error("streaming manager is shut down")]
    Stopped,
}

pub struct StartOptions {
    pub seed: i32,
    pub worldgen: WorldGenParams,
    pub streaming: StreamingConfig,
    pub atlas: TextureAtlas,
    /// Where Modified chunks are saved. Without one they are never evicted.
    pub save_dir: Option<PathBuf>,
    pub registry: Arc<BlockRegistry>,
}

impl StartOptions {
    /// Built-in blocks, default parameters and a grid atlas over every texture key.
    pub fn new(seed: i32) -> Self {
        let registry = Arc::new(BlockRegistry::builtin());
        Self {
            seed,
            worldgen: WorldGenParams::default(),
            streaming: StreamingConfig::default(),
            atlas: grid_atlas(&registry),
            save_dir: None,
            registry,
        }
    }
}

fn grid_atlas(reg: &BlockRegistry) -> TextureAtlas {
    let mut keys: Vec<&str> = Vec::new();
    for ty in reg.iter().filter(|ty| ty.has_geometry) {
        for face in Face::ALL {
            let key = ty.texture_key(face);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    TextureAtlas::grid(keys, 8)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub loaded: usize,
    pub meshed: usize,
    pub modified: usize,
    pub pending_targets: usize,
    pub generated_total: u64,
    pub evicted_total: u64,
    pub saved_total: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub evicted: usize,
    pub generated: usize,
    pub meshed: usize,
    /// More chunks were missing than one cycle may create.
    pub saturated: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkInfo {
    pub state: ChunkState,
    pub modified: bool,
    pub needs_update: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub saved: usize,
    pub pending_flushed: usize,
    pub failed: usize,
}

enum Control {
    Wake,
    Stop,
}

/// Voxels for one chunk, produced off-lock.
struct Produced {
    blocks: Vec<Block>,
    pending: Vec<PendingUpdate>,
    from_disk: bool,
}

struct Shared {
    cfg: StreamingConfig,
    generator: TerrainGenerator,
    mesh_ctx: MeshContext,
    index: WorldIndex,
    actions: ActionQueue,
    store: Option<PersistenceStore>,
    pending: Mutex<PendingStore>,
    observer: Mutex<Vec3>,
    running: AtomicBool,
    pool: ThreadPool,
    generated_total: AtomicU64,
    evicted_total: AtomicU64,
    saved_total: AtomicU64,
}

/// Keeps the chunks around the observer generated, meshed and published.
///
/// The worker thread owns index membership. Consumers edit voxels, read them back
/// and drain [`Action`]s; they never see a chunk before it is generated.
pub struct StreamingManager {
    shared: Arc<Shared>,
    control: Sender<Control>,
    worker: Option<JoinHandle<()>>,
    spawn: WorldPos,
    stopped: bool,
}

impl StreamingManager {
    /// Builds the world around the spawn column, picks a spawn point and starts
    /// the worker (unless `streaming.background` is off).
    pub fn start(opts: StartOptions) -> Result<Self, StartError> {
        let StartOptions {
            seed,
            worldgen,
            streaming: cfg,
            atlas,
            save_dir,
            registry,
        } = opts;
        let generator = TerrainGenerator::new(seed, worldgen, registry.clone())?;
        let mesh_ctx = MeshContext::new(registry.clone(), atlas, seed);
        let store = save_dir
            .map(|dir| PersistenceStore::open(dir, registry.clone()))
            .transpose()?;
        let threads = match cfg.streaming.worker_threads {
            0 => thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            n => n,
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("strata-gen-{i}"))
            .build()?;

        let spawn_cfg = &cfg.spawn;
        let origin = WorldPos::new(
            spawn_cfg.origin_x,
            (spawn_cfg.search_top_y + spawn_cfg.search_bottom_y) / 2,
            spawn_cfg.origin_z,
        );
        let background = cfg.streaming.background;
        let shared = Arc::new(Shared {
            cfg,
            generator,
            mesh_ctx,
            index: WorldIndex::new(),
            actions: ActionQueue::new(),
            store,
            pending: Mutex::new(PendingStore::new()),
            observer: Mutex::new(origin.to_vec3()),
            running: AtomicBool::new(true),
            pool,
            generated_total: AtomicU64::new(0),
            evicted_total: AtomicU64::new(0),
            saved_total: AtomicU64::new(0),
        });

        let started = Instant::now();
        let warm = shared.warm_up(world_to_chunk(origin));
        let spawn = shared.find_spawn();
        *shared.observer.lock() = Vec3::new(
            spawn.x as f32 + 0.5,
            spawn.y as f32,
            spawn.z as f32 + 0.5,
        );
        log::info!(
            target: "stream",
            "world ready: {} chunks in {:.1}ms, spawn at {:?}",
            warm,
            started.elapsed().as_secs_f32() * 1000.0,
            spawn
        );

        let (control, rx) = unbounded();
        let worker = if background {
            let s = shared.clone();
            let handle = thread::Builder::new()
                .name("strata-stream".into())
                .spawn(move || worker_loop(s, rx))
                .map_err(StartError::Spawn)?;
            Some(handle)
        } else {
            None
        };
        Ok(Self {
            shared,
            control,
            worker,
            spawn,
            stopped: false,
        })
    }

    /// The air voxel the observer was placed in at startup.
    #[inline]
    pub fn spawn_point(&self) -> WorldPos {
        self.spawn
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        self.shared.generator.registry()
    }

    pub fn observer(&self) -> Vec3 {
        *self.shared.observer.lock()
    }

    pub fn set_observer(&self, p: Vec3) {
        *self.shared.observer.lock() = p;
        let _ = self.control.send(Control::Wake);
    }

    /// Runs one streaming cycle on the calling thread. Only valid when the manager
    /// was started without a background worker.
    pub fn step(&self) -> CycleReport {
        if self.worker.is_some() || !self.is_running() {
            log::debug!(target: "stream", "step ignored: worker owns the cycle or manager stopped");
            return CycleReport::default();
        }
        self.shared.run_cycle()
    }

    /// Writes one voxel. Edits to chunks that are not loaded are kept until the
    /// chunk is generated (or flushed to disk at shutdown).
    pub fn set_block(&self, p: WorldPos, id: BlockId) -> Result<(), EditError> {
        if !self.is_running() {
            return Err(EditError::Stopped);
        }
        if !self.registry().contains(id) {
            return Err(EditError::UnknownBlockType(id));
        }
        self.shared.route_update(PendingUpdate::new(p, id));
        let _ = self.control.send(Control::Wake);
        Ok(())
    }

    pub fn block_at(&self, p: WorldPos) -> Result<Block, LookupError> {
        self.shared.block_at(p)
    }

    /// Hands queued actions to `presenter` in production order. Returns how many ran.
    pub fn drain_actions(&self, presenter: &mut impl Presenter) -> usize {
        let actions = self.shared.actions.drain();
        let n = actions.len();
        for action in actions {
            match action {
                Action::Materialize {
                    pos,
                    placement,
                    mesh,
                } => {
                    presenter.materialize(pos, placement, &mesh);
                    if let Some(handle) = self.shared.index.get(pos) {
                        let mut chunk = handle.write();
                        if chunk.mesh().is_some_and(|m| Arc::ptr_eq(m, &mesh)) {
                            chunk.mark_rendered();
                        }
                    }
                }
                Action::Destroy { pos } => presenter.destroy(pos),
            }
        }
        n
    }

    pub fn pending_actions(&self) -> usize {
        self.shared.actions.len()
    }

    pub fn stats(&self) -> StreamStats {
        let mut stats = StreamStats::default();
        for (_, handle) in self.shared.index.handles() {
            let chunk = handle.read();
            if !chunk.is_generated() {
                continue;
            }
            stats.loaded += 1;
            if matches!(chunk.state(), ChunkState::Meshed | ChunkState::Rendered) {
                stats.meshed += 1;
            }
            if chunk.is_modified() {
                stats.modified += 1;
            }
        }
        stats.pending_targets = self.shared.pending.lock().stats().targets;
        stats.generated_total = self.shared.generated_total.load(Ordering::Relaxed);
        stats.evicted_total = self.shared.evicted_total.load(Ordering::Relaxed);
        stats.saved_total = self.shared.saved_total.load(Ordering::Relaxed);
        stats
    }

    pub fn chunk_info(&self, pos: ChunkPos) -> Option<ChunkInfo> {
        let handle = self.shared.index.get(pos)?;
        let chunk = handle.read();
        Some(ChunkInfo {
            state: chunk.state(),
            modified: chunk.is_modified(),
            needs_update: chunk.needs_update(),
        })
    }

    /// Copy of a generated chunk's voxels in index order.
    pub fn snapshot_blocks(&self, pos: ChunkPos) -> Option<Vec<Block>> {
        let handle = self.shared.index.get(pos)?;
        let chunk = handle.read();
        (chunk.is_generated() && !chunk.is_detached()).then(|| chunk.blocks().to_vec())
    }

    pub fn loaded_chunks(&self) -> Vec<ChunkPos> {
        self.shared.index.positions()
    }

    /// Stops the worker, then writes every Modified chunk and every pending update.
    /// Later calls return an empty report.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.stopped {
            return ShutdownReport::default();
        }
        self.stopped = true;
        self.shared.running.store(false, Ordering::Release);
        let _ = self.control.send(Control::Stop);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!(target: "stream", "streaming worker panicked");
            }
        }
        let report = self.shared.flush();
        log::info!(
            target: "stream",
            "shutdown: saved {} chunks, flushed {} pending targets, {} failures",
            report.saved,
            report.pending_flushed,
            report.failed
        );
        report
    }
}

impl Drop for StreamingManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>, rx: Receiver<Control>) {
    let poll = shared.cfg.streaming.poll_interval();
    while shared.running.load(Ordering::Acquire) {
        let report = shared.run_cycle();
        if report.saturated {
            continue;
        }
        match rx.recv_timeout(poll) {
            Ok(Control::Wake) | Err(RecvTimeoutError::Timeout) => {}
            Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::debug!(target: "stream", "worker exiting");
}

impl Shared {
    fn policy(&self) -> GeneratePolicy {
        if self.cfg.generation.regenerate_every_cycle {
            GeneratePolicy::Regenerate
        } else {
            GeneratePolicy::Once
        }
    }

    fn observer_chunk(&self) -> ChunkPos {
        world_to_chunk(WorldPos::from_vec3(*self.observer.lock()))
    }

    fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let center = self.observer_chunk();
        let evicted = self.evict_far(center);

        let missing = self.missing_within(center, self.cfg.streaming.radius);
        let limit = self.cfg.streaming.max_chunks_per_cycle.max(1);
        let batch = &missing[..missing.len().min(limit)];
        let generated = self.generate_batch(batch);

        if self.policy() == GeneratePolicy::Regenerate {
            self.regenerate_loaded();
        }
        let meshed = self.remesh_dirty();
        if evicted + generated + meshed > 0 {
            log::info!(
                target: "perf",
                "cycle at {:?}: -{} +{} meshed {} in {:.1}ms",
                center,
                evicted,
                generated,
                meshed,
                started.elapsed().as_secs_f32() * 1000.0
            );
        }
        CycleReport {
            evicted,
            generated,
            meshed,
            saturated: missing.len() > limit,
        }
    }

    /// Positions within `radius` of `center` that are not in the index, nearest first.
    fn missing_within(&self, center: ChunkPos, radius: i32) -> Vec<ChunkPos> {
        let r = radius.max(0);
        let r2 = i64::from(r) * i64::from(r);
        let mut out = Vec::new();
        for dz in -r..=r {
            for dy in -r..=r {
                for dx in -r..=r {
                    let pos = center.offset(dx, dy, dz);
                    if pos.distance_sq(center) <= r2 && !self.index.contains(pos) {
                        out.push(pos);
                    }
                }
            }
        }
        out.sort_unstable_by_key(|p| (p.distance_sq(center), p.cx, p.cy, p.cz));
        out
    }

    fn warm_up(&self, center: ChunkPos) -> usize {
        let missing = self.missing_within(center, self.cfg.spawn.start_radius);
        self.generate_batch(&missing)
    }

    fn evict_far(&self, center: ChunkPos) -> usize {
        let limit = self.cfg.streaming.evict_radius_sq();
        let far: Vec<(ChunkPos, ChunkHandle)> = self
            .index
            .handles()
            .into_iter()
            .filter(|(p, _)| p.distance_sq(center) > limit)
            .collect();
        if far.is_empty() {
            return 0;
        }
        let evicted = far
            .into_iter()
            .filter(|(pos, handle)| self.evict_one(*pos, handle))
            .count();
        log::debug!(target: "stream", "evicted {} chunks around {:?}", evicted, center);
        evicted
    }

    /// Removes one chunk from the world, saving it first if Modified.
    /// Returns `false` when the chunk has to stay for another cycle.
    fn evict_one(&self, pos: ChunkPos, handle: &ChunkHandle) -> bool {
        let snapshot = {
            let chunk = handle.read();
            chunk.is_modified().then(|| {
                let record = ChunkRecord {
                    pos,
                    blocks: chunk.block_ids(),
                    pending: chunk.pending().to_vec(),
                };
                (record, chunk.revision())
            })
        };

        let had_mesh = match snapshot {
            Some((record, revision)) => {
                let Some(store) = &self.store else {
                    return false;
                };
                if let Err(e) = store.save(&record) {
                    log::warn!(target: "persist", "keeping {:?} loaded, save failed: {e}", pos);
                    return false;
                }
                self.saved_total.fetch_add(1, Ordering::Relaxed);
                let mut chunk = handle.write();
                if chunk.revision() != revision {
                    log::debug!(target: "stream", "{:?} changed while saving; retrying", pos);
                    return false;
                }
                chunk.detach();
                chunk.mesh().is_some()
            }
            None => {
                let (had_mesh, leftovers) = {
                    let mut chunk = handle.write();
                    if chunk.is_modified() {
                        return false;
                    }
                    chunk.detach();
                    (chunk.mesh().is_some(), chunk.take_pending())
                };
                if !leftovers.is_empty() {
                    self.pending.lock().extend(leftovers);
                }
                had_mesh
            }
        };

        self.index.remove(pos);
        if had_mesh {
            self.actions.push(Action::Destroy { pos });
        }
        self.evicted_total.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Loads or classifies `batch`, applies waiting updates, then meshes the new
    /// chunks together with their already-meshed face neighbours.
    fn generate_batch(&self, batch: &[ChunkPos]) -> usize {
        if batch.is_empty() {
            return 0;
        }
        let started = Instant::now();
        let mut slots = Vec::with_capacity(batch.len());
        for &pos in batch {
            let handle = self.index.insert_empty(pos);
            let waiting = self.pending.lock().take_for(pos);
            slots.push((handle, waiting));
        }

        let produced: Vec<Produced> = self
            .pool
            .install(|| batch.par_iter().map(|&pos| self.produce(pos)).collect());

        let mut from_disk = 0;
        for ((handle, waiting), out) in slots.into_iter().zip(produced) {
            let mut chunk = handle.write();
            if !chunk.install_raw(out.blocks, GeneratePolicy::Once) {
                continue;
            }
            if out.from_disk {
                chunk.mark_modified();
                from_disk += 1;
            }
            for u in out.pending.into_iter().chain(waiting) {
                chunk.queue_pending(u);
            }
            chunk.apply_pending(|id| self.generator.block_value(id));
        }
        self.generated_total
            .fetch_add(batch.len() as u64, Ordering::Relaxed);

        let mut targets: HashSet<ChunkPos> = batch.iter().copied().collect();
        for &pos in batch {
            for face in Face::ALL {
                let n = pos.neighbor(face);
                if targets.contains(&n) {
                    continue;
                }
                if let Some(handle) = self.index.get(n) {
                    if handle.read().mesh().is_some() {
                        targets.insert(n);
                    }
                }
            }
        }
        let mut targets: Vec<ChunkPos> = targets.into_iter().collect();
        targets.sort_unstable_by_key(|p| (p.cx, p.cy, p.cz));
        let meshed = self.mesh_and_publish(&targets);

        log::debug!(
            target: "stream",
            "generated {} chunks ({} from disk), meshed {} in {:.1}ms",
            batch.len(),
            from_disk,
            meshed,
            started.elapsed().as_secs_f32() * 1000.0
        );
        batch.len()
    }

    /// Saved voxels when a readable file exists, fresh classification otherwise.
    fn produce(&self, pos: ChunkPos) -> Produced {
        if let Some(store) = &self.store {
            match store.load(pos) {
                Ok(record) => {
                    let blocks = record
                        .blocks
                        .iter()
                        .map(|&id| self.generator.block_value(id))
                        .collect();
                    return Produced {
                        blocks,
                        pending: record.pending,
                        from_disk: true,
                    };
                }
                Err(PersistenceError::NotFound(_)) => {}
                Err(e) => {
                    log::warn!(target: "persist", "regenerating {:?}: {e}", pos);
                }
            }
        }
        Produced {
            blocks: self.generator.generate(pos).blocks,
            pending: Vec::new(),
            from_disk: false,
        }
    }

    fn regenerate_loaded(&self) {
        let targets: Vec<(ChunkPos, ChunkHandle)> = self
            .index
            .handles()
            .into_iter()
            .filter(|(_, h)| {
                let c = h.read();
                c.is_generated() && !c.is_modified() && !c.is_detached()
            })
            .collect();
        let produced: Vec<GeneratedBlocks> = self.pool.install(|| {
            targets
                .par_iter()
                .map(|(pos, _)| self.generator.generate(*pos))
                .collect()
        });
        for ((_, handle), out) in targets.iter().zip(produced) {
            let mut chunk = handle.write();
            if chunk.is_modified() || chunk.is_detached() {
                continue;
            }
            chunk.install_blocks(out, GeneratePolicy::Regenerate);
        }
    }

    fn remesh_dirty(&self) -> usize {
        let mut dirty: Vec<ChunkPos> = self
            .index
            .handles()
            .into_iter()
            .filter(|(_, h)| {
                let c = h.read();
                c.needs_update() && c.is_generated() && !c.is_detached()
            })
            .map(|(p, _)| p)
            .collect();
        dirty.sort_unstable_by_key(|p| (p.cx, p.cy, p.cz));
        self.mesh_and_publish(&dirty)
    }

    fn mesh_and_publish(&self, targets: &[ChunkPos]) -> usize {
        if targets.is_empty() {
            return 0;
        }
        let built: Vec<(ChunkPos, ChunkHandle, Arc<MeshOutput>, u64)> = self.pool.install(|| {
            targets
                .par_iter()
                .filter_map(|&pos| self.build_mesh(pos))
                .collect()
        });
        let mut published = 0;
        for (pos, handle, mesh, revision) in built {
            {
                let mut chunk = handle.write();
                if chunk.is_detached() || !chunk.is_generated() {
                    continue;
                }
                chunk.set_mesh(mesh.clone(), revision);
            }
            self.actions.push(Action::Materialize {
                pos,
                placement: chunk_to_world_center(pos),
                mesh,
            });
            published += 1;
        }
        published
    }

    /// Meshes one chunk under read locks on it and its loaded face neighbours.
    /// Locks are taken in coordinate order so concurrent builders cannot cycle.
    fn build_mesh(&self, pos: ChunkPos) -> Option<(ChunkPos, ChunkHandle, Arc<MeshOutput>, u64)> {
        let mut handles: Vec<(ChunkPos, ChunkHandle)> = iter::once(pos)
            .chain(Face::ALL.map(|f| pos.neighbor(f)))
            .filter_map(|p| self.index.get(p).map(|h| (p, h)))
            .collect();
        let center = handles
            .iter()
            .find(|(p, _)| *p == pos)
            .map(|(_, h)| h.clone())?;
        handles.sort_unstable_by_key(|(p, _)| (p.cx, p.cy, p.cz));

        let (mesh, revision) = {
            let guards: Vec<_> = handles.iter().map(|(p, h)| (*p, h.read())).collect();
            let chunk = guards.iter().find(|(p, _)| *p == pos).map(|(_, g)| g)?;
            if !chunk.is_generated() || chunk.is_detached() {
                return None;
            }
            let mut neighbors = ChunkNeighbors::new(pos);
            for (p, g) in &guards {
                if *p != pos && !g.is_detached() {
                    neighbors.insert(g);
                }
            }
            let mesh = build_chunk_mesh(chunk, &neighbors, &self.mesh_ctx);
            (Arc::new(mesh), chunk.revision())
        };
        Some((pos, center, mesh, revision))
    }

    /// Delivers one voxel write to its chunk, or to the pending store when the
    /// chunk is not in the index. Returns whether a voxel changed now.
    fn route_update(&self, u: PendingUpdate) -> bool {
        let target = u.target();
        let value = self.generator.block_value(u.type_id);
        loop {
            let handle = {
                let mut pending = self.pending.lock();
                match self.index.get(target) {
                    Some(h) => h,
                    None => {
                        pending.push(u);
                        return false;
                    }
                }
            };
            let mut chunk = handle.write();
            if chunk.is_detached() {
                drop(chunk);
                thread::yield_now();
                continue;
            }
            if chunk.get_world(u.pos) == Some(value) && chunk.is_generated() {
                return false;
            }
            let applied = chunk.apply_update(u, |id| self.generator.block_value(id));
            drop(chunk);
            if applied {
                self.flag_neighbors(u.pos);
            }
            return applied;
        }
    }

    /// Raises NeedsUpdate on the face neighbours sharing a face with `p`, one
    /// lock at a time.
    fn flag_neighbors(&self, p: WorldPos) {
        for n in affected_neighbors(p) {
            if let Some(handle) = self.index.get(n) {
                let mut chunk = handle.write();
                if chunk.is_generated() && !chunk.is_detached() {
                    chunk.mark_needs_update();
                }
            }
        }
    }

    fn block_at(&self, p: WorldPos) -> Result<Block, LookupError> {
        let pos = world_to_chunk(p);
        let not_loaded = LookupError::ChunkNotLoaded(pos);
        let handle = self.index.get(pos).ok_or(not_loaded)?;
        let chunk = handle.read();
        if !chunk.is_generated() || chunk.is_detached() {
            return Err(not_loaded);
        }
        chunk.get_world(p).ok_or(not_loaded)
    }

    fn find_spawn(&self) -> WorldPos {
        let spawn = &self.cfg.spawn;
        let mut rng = fastrand::Rng::with_seed(u64::from(self.generator.seed() as u32));
        let reach = spawn.max_offset.max(1);
        for attempt in 0..=spawn.max_attempts {
            let (x, z) = if attempt == 0 {
                (spawn.origin_x, spawn.origin_z)
            } else {
                (
                    spawn.origin_x + rng.i32(-reach..=reach),
                    spawn.origin_z + rng.i32(-reach..=reach),
                )
            };
            self.load_column(x, z);
            if let Some(p) = self.scan_column(x, z) {
                return p;
            }
            log::debug!(target: "stream", "no standing room in column ({x}, {z})");
        }
        let fallback = WorldPos::new(spawn.origin_x, spawn.search_top_y, spawn.origin_z);
        log::warn!(
            target: "stream",
            "no spawn found after {} attempts; using {:?}",
            spawn.max_attempts,
            fallback
        );
        fallback
    }

    fn load_column(&self, x: i32, z: i32) {
        let spawn = &self.cfg.spawn;
        let lo = world_to_chunk(WorldPos::new(x, spawn.search_bottom_y, z));
        let hi = world_to_chunk(WorldPos::new(x, spawn.search_top_y + 2, z));
        let missing: Vec<ChunkPos> = (lo.cy..=hi.cy)
            .map(|cy| ChunkPos::new(lo.cx, cy, lo.cz))
            .filter(|p| !self.index.contains(*p))
            .collect();
        self.generate_batch(&missing);
    }

    /// Highest solid voxel with two Transparent voxels above; returns the first of those.
    fn scan_column(&self, x: i32, z: i32) -> Option<WorldPos> {
        let spawn = &self.cfg.spawn;
        let reg = self.generator.registry();
        let clear = |p: WorldPos| {
            self.block_at(p)
                .map(|b| reg.transparency(b) == Transparency::Transparent)
                .unwrap_or(false)
        };
        for y in (spawn.search_bottom_y..=spawn.search_top_y).rev() {
            let ground = WorldPos::new(x, y, z);
            let Ok(b) = self.block_at(ground) else {
                continue;
            };
            if reg.is_solid(b) && clear(ground.offset(0, 1, 0)) && clear(ground.offset(0, 2, 0)) {
                return Some(ground.offset(0, 1, 0));
            }
        }
        None
    }

    fn flush(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let Some(store) = &self.store else {
            let stats = self.pending.lock().stats();
            let modified = self
                .index
                .handles()
                .iter()
                .filter(|(_, h)| h.read().is_modified())
                .count();
            if modified > 0 || stats.updates > 0 {
                log::warn!(
                    target: "persist",
                    "no save directory: discarding {} modified chunks and {} pending updates",
                    modified,
                    stats.updates
                );
            }
            return report;
        };

        let mut leftovers = Vec::new();
        for (pos, handle) in self.index.handles() {
            let record = {
                let mut chunk = handle.write();
                if !chunk.is_generated() {
                    leftovers.extend(chunk.take_pending());
                    continue;
                }
                if !chunk.is_modified() {
                    continue;
                }
                ChunkRecord {
                    pos,
                    blocks: chunk.block_ids(),
                    pending: chunk.pending().to_vec(),
                }
            };
            match store.save(&record) {
                Ok(()) => {
                    report.saved += 1;
                    self.saved_total.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    report.failed += 1;
                    log::warn!(target: "persist", "failed to save {:?}: {e}", pos);
                }
            }
        }

        let drained = {
            let mut pending = self.pending.lock();
            pending.extend(leftovers);
            pending.drain_all()
        };
        for (pos, updates) in drained {
            let record = match store.load(pos) {
                Ok(mut record) => {
                    record.pending.extend(updates);
                    record
                }
                Err(e) => {
                    if !matches!(e, PersistenceError::NotFound(_)) {
                        log::warn!(target: "persist", "replacing unreadable {:?}: {e}", pos);
                    }
                    let out = self.generator.generate(pos);
                    ChunkRecord {
                        pos,
                        blocks: out.blocks.iter().map(|b| b.type_id).collect(),
                        pending: updates,
                    }
                }
            };
            match store.save(&record) {
                Ok(()) => report.pending_flushed += 1,
                Err(e) => {
                    report.failed += 1;
                    log::warn!(target: "persist", "lost pending updates for {:?}: {e}", pos);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_options() -> StartOptions {
        let mut opts = StartOptions::new(7);
        opts.streaming.streaming.background = false;
        opts.streaming.streaming.radius = 1;
        opts.streaming.streaming.worker_threads = 2;
        opts.streaming.spawn.start_radius = 0;
        opts.streaming.spawn.max_attempts = 0;
        opts.streaming.spawn.search_top_y = 40;
        opts.streaming.spawn.search_bottom_y = 36;
        opts
    }

    #[test]
    fn grid_atlas_covers_every_rendered_key() {
        let reg = BlockRegistry::builtin();
        let atlas = grid_atlas(&reg);
        for ty in reg.iter().filter(|ty| ty.has_geometry) {
            for face in Face::ALL {
                assert!(atlas.contains(ty.texture_key(face)), "{}", ty.texture_key(face));
            }
        }
        assert!(!atlas.contains("air"));
    }

    #[test]
    fn missing_positions_are_sorted_nearest_first() {
        let mgr = StreamingManager::start(manual_options()).unwrap();
        let center = ChunkPos::new(100, 0, 100);
        let missing = mgr.shared.missing_within(center, 2);
        assert_eq!(missing.first(), Some(&center));
        assert!(missing.windows(2).all(|w| w[0].distance_sq(center) <= w[1].distance_sq(center)));
        assert!(missing.iter().all(|p| p.distance_sq(center) <= 4));
        // 33 lattice points lie in a radius-2 ball.
        assert_eq!(missing.len(), 33);
    }

    #[test]
    fn edit_to_unloaded_chunk_waits_in_store() {
        let mgr = StreamingManager::start(manual_options()).unwrap();
        let far = WorldPos::new(10_000, 5, 10_000);
        mgr.set_block(far, 1).unwrap();
        assert_eq!(mgr.stats().pending_targets, 1);
        assert_eq!(
            mgr.block_at(far),
            Err(LookupError::ChunkNotLoaded(world_to_chunk(far)))
        );
    }

    #[test]
    fn rejected_edits() {
        let mut mgr = StreamingManager::start(manual_options()).unwrap();
        let p = mgr.spawn_point();
        assert_eq!(mgr.set_block(p, 9999), Err(EditError::UnknownBlockType(9999)));
        mgr.shutdown();
        assert_eq!(mgr.set_block(p, 1), Err(EditError::Stopped));
        assert_eq!(mgr.shutdown(), ShutdownReport::default());
    }
}
