use std::thread;
use std::time::Duration;

use hashbrown::HashSet;
use strata_geom::{MeshOutput, Vec3};
use strata_runtime::{Presenter, StreamingManager};
use strata_world::{ChunkPos, WorldPos};

/// Presenter that only keeps counts; stands in for a renderer.
#[derive(Default, Debug)]
pub struct CountingPresenter {
    pub materialized: usize,
    pub destroyed: usize,
    pub quads: usize,
    live: HashSet<ChunkPos>,
}

impl CountingPresenter {
    pub fn visible(&self) -> usize {
        self.live.len()
    }
}

impl Presenter for CountingPresenter {
    fn materialize(&mut self, pos: ChunkPos, _placement: WorldPos, mesh: &MeshOutput) {
        self.materialized += 1;
        self.quads += mesh.quad_count();
        self.live.insert(pos);
    }

    fn destroy(&mut self, pos: ChunkPos) {
        self.destroyed += 1;
        self.live.remove(&pos);
    }
}

pub struct SessionOptions {
    pub ticks: u32,
    pub tick: Duration,
    /// Observer displacement per tick.
    pub velocity: Vec3,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ticks: 200,
            tick: Duration::from_millis(20),
            velocity: Vec3::new(0.5, 0.0, 0.25),
        }
    }
}

/// Walks the observer in a straight line, draining actions every tick. Halfway
/// through, a glowstone block is placed above the observer's head.
pub fn run(mgr: &StreamingManager, opts: &SessionOptions) -> CountingPresenter {
    let mut presenter = CountingPresenter::default();
    let mut pos = mgr.observer();
    let glow = mgr.registry().id_by_name("glowstone");
    for t in 0..opts.ticks {
        pos += opts.velocity;
        mgr.set_observer(pos);
        thread::sleep(opts.tick);
        mgr.drain_actions(&mut presenter);

        if t == opts.ticks / 2 {
            if let Some(id) = glow {
                let at = WorldPos::from_vec3(pos).offset(0, 3, 0);
                match mgr.set_block(at, id) {
                    Ok(()) => log::info!("placed glowstone at {:?}", at),
                    Err(e) => log::warn!("demo edit failed: {e}"),
                }
            }
        }
        if t % 50 == 0 {
            let s = mgr.stats();
            log::info!(
                "tick {t}: observer ({:.1}, {:.1}, {:.1}), {} loaded, {} meshed, {} visible, {} pending targets",
                pos.x,
                pos.y,
                pos.z,
                s.loaded,
                s.meshed,
                presenter.visible(),
                s.pending_targets
            );
        }
    }
    mgr.drain_actions(&mut presenter);
    presenter
}
