//! Block values, block-type metadata and the fixed block registry.
#![forbid(unsafe_code)]

pub mod registry;
pub mod types;

pub use registry::{BlockRegistry, BlockType, RegistryError};
pub use types::{Block, BlockId, Face, FaceMask, Transparency};
