//! CPU meshing crate: visible-face mesher with cross-chunk lookahead.
#![forbid(unsafe_code)]

mod atlas;
mod build;
mod context;
mod face;
mod neighbors;

pub use atlas::{TextureAtlas, UvRect};
pub use build::build_chunk_mesh;
pub use context::{MeshContext, rotation_step};
pub use neighbors::{ChunkNeighbors, NeighborSource, NoNeighbors};
pub use strata_geom::MeshOutput;
