use strata_blocks::Face;
use strata_chunk::Chunk;
use strata_geom::{MeshOutput, Vec3};
use strata_world::{CHUNK_SIZE, CHUNK_VOLUME, LocalPos};

use crate::context::MeshContext;
use crate::face::{quad_corners, unit_uvs};
use crate::neighbors::NeighborSource;

const HALF: f32 = (CHUNK_SIZE / 2) as f32;

/// Builds the visible-face mesh of `chunk`.
///
/// A face is emitted when the voxel across it is Transparent or SemiTransparent.
/// Voxels across the chunk shell come from `neighbors`; an unknown neighbour hides
/// the face. Vertices are relative to the chunk's render origin.
pub fn build_chunk_mesh(
    chunk: &Chunk,
    neighbors: &impl NeighborSource,
    ctx: &MeshContext,
) -> MeshOutput {
    let mut out = MeshOutput::new();
    if !chunk.is_generated() {
        return out;
    }
    let reg = ctx.registry();
    let blocks = chunk.blocks();
    debug_assert_eq!(blocks.len(), CHUNK_VOLUME);
    for (i, &b) in blocks.iter().enumerate() {
        let Some(ty) = reg.get(b.type_id) else {
            continue;
        };
        if !ty.has_geometry {
            continue;
        }
        let local = LocalPos::from_index(i);
        let world = chunk.world_pos(local);
        let min = Vec3::new(
            local.x as f32 - HALF,
            local.y as f32 - HALF,
            local.z as f32 - HALF,
        );
        for face in Face::ALL {
            let nb = match local.step(face) {
                Some(l) => Some(blocks[l.index()]),
                None => neighbors.neighbor_block(world.step(face)),
            };
            let Some(nb) = nb else {
                continue;
            };
            if !reg.transparency(nb).reveals_neighbor() {
                continue;
            }
            // Stacked grass-like voxels show their side texture on the shared faces.
            let tex_face = if ty.grass_like && face.is_vertical() && nb.type_id == b.type_id {
                Face::PosX
            } else {
                face
            };
            let rect = ctx.face_uv(b.type_id, tex_face);
            let mut uvs = unit_uvs(face).map(|(u, v)| rect.lerp(u, v));
            if ty.random_faces.contains(face) {
                uvs.rotate_left(ctx.rotation_at(world));
            }
            out.add_quad(quad_corners(face, min), uvs);
        }
    }
    log::trace!("meshed {:?}: {} quads", chunk.pos(), out.quad_count());
    out
}

