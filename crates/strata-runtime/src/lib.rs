//! Chunk streaming around a moving observer: world index, background worker and
//! the action queue handed to the presenter.
#![forbid(unsafe_code)]

mod actions;
pub mod config;
mod index;
mod streaming;

pub use actions::{Action, ActionQueue, Presenter};
pub use config::{GenerationSection, SpawnSection, StreamingConfig, StreamingSection};
pub use index::{ChunkHandle, LookupError, WorldIndex};
pub use streaming::{
    ChunkInfo, CycleReport, EditError, ShutdownReport, StartError, StartOptions, StreamStats,
    StreamingManager,
};
