use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct StreamingConfig {
    #[serde(default)]
    pub streaming: StreamingSection,
    #[serde(default)]
    pub spawn: SpawnSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StreamingSection {
    /// Active radius in chunks (Euclidean).
    #[serde(default = "default_radius")]
    pub radius: i32,
    /// Extra chunks beyond `radius` before a chunk is evicted.
    #[serde(default = "default_evict_margin")]
    pub evict_margin: i32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on chunks created per worker cycle.
    #[serde(default = "default_max_chunks_per_cycle")]
    pub max_chunks_per_cycle: usize,
    /// Threads in the generation/meshing pool; 0 picks the available parallelism.
    #[serde(default)]
    pub worker_threads: usize,
    /// Run the streaming loop on its own thread. When false the caller drives it
    /// with `StreamingManager::step`.
    #[serde(default = "default_true")]
    pub background: bool,
}
fn default_radius() -> i32 {
    4
}
fn default_evict_margin() -> i32 {
    1
}
fn default_poll_interval_ms() -> u64 {
    50
}
fn default_max_chunks_per_cycle() -> usize {
    64
}
fn default_true() -> bool {
    true
}
impl Default for StreamingSection {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            evict_margin: default_evict_margin(),
            poll_interval_ms: default_poll_interval_ms(),
            max_chunks_per_cycle: default_max_chunks_per_cycle(),
            worker_threads: 0,
            background: true,
        }
    }
}

impl StreamingSection {
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[inline]
    pub fn load_radius_sq(&self) -> i64 {
        let r = i64::from(self.radius.max(0));
        r * r
    }

    #[inline]
    pub fn evict_radius_sq(&self) -> i64 {
        let r = i64::from(self.radius.max(0) + self.evict_margin.max(0));
        r * r
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SpawnSection {
    #[serde(default)]
    pub origin_x: i32,
    #[serde(default)]
    pub origin_z: i32,
    /// The downward search for standing room starts here.
    #[serde(default = "default_search_top_y")]
    pub search_top_y: i32,
    #[serde(default = "default_search_bottom_y")]
    pub search_bottom_y: i32,
    /// Radius in chunks generated synchronously before the worker starts.
    #[serde(default = "default_start_radius")]
    pub start_radius: i32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Largest horizontal offset, in voxels, tried after a failed column.
    #[serde(default = "default_max_offset")]
    pub max_offset: i32,
}
fn default_search_top_y() -> i32 {
    176
}
fn default_search_bottom_y() -> i32 {
    32
}
fn default_start_radius() -> i32 {
    2
}
fn default_max_attempts() -> u32 {
    8
}
fn default_max_offset() -> i32 {
    48
}
impl Default for SpawnSection {
    fn default() -> Self {
        Self {
            origin_x: 0,
            origin_z: 0,
            search_top_y: default_search_top_y(),
            search_bottom_y: default_search_bottom_y(),
            start_radius: default_start_radius(),
            max_attempts: default_max_attempts(),
            max_offset: default_max_offset(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct GenerationSection {
    /// Debug policy: reclassify every loaded, unmodified chunk each cycle.
    #[serde(default)]
    pub regenerate_every_cycle: bool,
}
