use std::sync::Arc;

use proptest::prelude::*;
use strata_blocks::registry::{BUILTIN_BLOCKS, BlockDef};
use strata_blocks::{Block, BlockRegistry, Face, FaceMask, Transparency};
use strata_chunk::{Chunk, GeneratePolicy};
use strata_geom::Vec2;
use strata_mesh_cpu::{MeshContext, NoNeighbors, TextureAtlas, UvRect, build_chunk_mesh};
use strata_world::{CHUNK_SIZE, CHUNK_VOLUME, ChunkPos, LocalPos, WorldPos};

const STONE: Block = Block::new(1);

fn ctx() -> MeshContext {
    let reg = Arc::new(BlockRegistry::builtin());
    let keys: Vec<String> = reg
        .iter()
        .flat_map(|ty| Face::ALL.map(|f| ty.texture_key(f).to_string()))
        .collect();
    MeshContext::new(reg, TextureAtlas::grid(keys, 8), 1)
}

fn chunk_with(blocks: Vec<Block>) -> Chunk {
    let mut c = Chunk::new(ChunkPos::new(0, 0, 0));
    assert!(c.install_raw(blocks, GeneratePolicy::Once));
    c
}

fn solid_neighbors(_: WorldPos) -> Option<Block> {
    Some(STONE)
}

fn air_neighbors(_: WorldPos) -> Option<Block> {
    Some(Block::AIR)
}

#[test]
fn opaque_chunk_with_opaque_neighbours_has_no_faces() {
    let c = chunk_with(vec![STONE; CHUNK_VOLUME]);
    let mesh = build_chunk_mesh(&c, &solid_neighbors, &ctx());
    assert!(mesh.is_empty());
    assert!(mesh.triangle_indices.is_empty());
}

#[test]
fn single_cavity_shows_six_faces() {
    let mut blocks = vec![STONE; CHUNK_VOLUME];
    blocks[LocalPos::new(7, 7, 7).index()] = Block::AIR;
    let c = chunk_with(blocks);
    let mesh = build_chunk_mesh(&c, &solid_neighbors, &ctx());
    assert_eq!(mesh.quad_count(), 6);
    assert_eq!(mesh.vertices.len(), 24);
    assert_eq!(mesh.uvs.len(), 24);
    assert_eq!(mesh.triangle_indices.len(), 36);
}

#[test]
fn unknown_neighbours_hide_boundary_faces() {
    let c = chunk_with(vec![STONE; CHUNK_VOLUME]);
    assert!(build_chunk_mesh(&c, &NoNeighbors, &ctx()).is_empty());
    let open = build_chunk_mesh(&c, &air_neighbors, &ctx());
    assert_eq!(open.quad_count(), 6 * CHUNK_SIZE * CHUNK_SIZE);
}

#[test]
fn empty_chunk_meshes_to_nothing() {
    let c = Chunk::new(ChunkPos::new(0, 0, 0));
    assert!(build_chunk_mesh(&c, &air_neighbors, &ctx()).is_empty());
}

#[test]
fn vertices_are_relative_to_render_origin() {
    let mut blocks = vec![Block::AIR; CHUNK_VOLUME];
    blocks[LocalPos::new(0, 0, 0).index()] = STONE;
    blocks[LocalPos::new(15, 15, 15).index()] = STONE;
    let c = chunk_with(blocks);
    let mesh = build_chunk_mesh(&c, &air_neighbors, &ctx());
    assert_eq!(mesh.quad_count(), 12);
    let half = (CHUNK_SIZE / 2) as f32;
    for v in &mesh.vertices {
        for c in [v.x, v.y, v.z] {
            assert!((-half..=half).contains(&c));
        }
    }
    assert!(mesh.vertices.iter().any(|v| v.x == -half && v.y == -half));
    assert!(mesh.vertices.iter().any(|v| v.x == half && v.z == half));
}

#[test]
fn face_uvs_stay_inside_their_atlas_rect() {
    let ctx = ctx();
    let reg = BlockRegistry::builtin();
    let grass = reg.id_by_name("grass").unwrap();
    let mut blocks = vec![Block::AIR; CHUNK_VOLUME];
    blocks[LocalPos::new(4, 4, 4).index()] = Block::new(grass);
    let mesh = build_chunk_mesh(&chunk_with(blocks), &air_neighbors, &ctx);
    assert_eq!(mesh.quad_count(), 6);
    let top = ctx.atlas().get("grass_top");
    // The +y quad is the first one emitted.
    for uv in &mesh.uvs[0..4] {
        assert!(uv.x >= top.u0 && uv.x <= top.u1 && uv.y >= top.v0 && uv.y <= top.v1);
    }
    let mut corners: Vec<(u32, u32)> = mesh.uvs[0..4]
        .iter()
        .map(|uv| (uv.x.to_bits(), uv.y.to_bits()))
        .collect();
    corners.sort();
    corners.dedup();
    assert_eq!(corners.len(), 4);
}

#[test]
fn stacked_grass_like_blocks_use_side_texture_on_shared_faces() {
    let mut defs: Vec<BlockDef> = BUILTIN_BLOCKS.to_vec();
    defs.push(BlockDef {
        name: "moss",
        transparency: Transparency::SemiTransparent,
        light_emission: 0,
        unique_faces: FaceMask::ALL,
        random_faces: FaceMask::NONE,
        face_suffixes: ["_top", "_bottom", "_side", "_side", "_side", "_side"],
        grass_like: true,
        has_geometry: true,
    });
    let reg = Arc::new(BlockRegistry::from_defs(&defs).unwrap());
    let moss = reg.id_by_name("moss").unwrap();
    let top = UvRect::new(0.1, 0.6, 0.4, 0.9);
    let bottom = UvRect::new(0.6, 0.1, 0.9, 0.4);
    let side = UvRect::new(0.6, 0.6, 0.9, 0.9);
    let mut atlas = TextureAtlas::new(UvRect::new(0.0, 0.0, 0.05, 0.05));
    atlas.insert("moss_top", top);
    atlas.insert("moss_bottom", bottom);
    atlas.insert("moss_side", side);
    let ctx = MeshContext::new(reg, atlas, 0);

    let mut blocks = vec![Block::AIR; CHUNK_VOLUME];
    blocks[LocalPos::new(5, 5, 5).index()] = Block::new(moss);
    blocks[LocalPos::new(5, 6, 5).index()] = Block::new(moss);
    let mesh = build_chunk_mesh(&chunk_with(blocks), &air_neighbors, &ctx);
    assert_eq!(mesh.quad_count(), 12);
    let inside = |r: UvRect, uv: &Vec2| uv.x >= r.u0 && uv.x <= r.u1 && uv.y >= r.v0 && uv.y <= r.v1;
    let count = |r: UvRect| {
        mesh.uvs
            .chunks(4)
            .filter(|quad| quad.iter().all(|uv| inside(r, uv)))
            .count()
    };
    // The two shared faces join the eight outer sides on the side texture.
    assert_eq!(count(side), 10);
    assert_eq!(count(top), 1);
    assert_eq!(count(bottom), 1);
}

fn voxel_grid() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(prop::bool::weighted(0.3), CHUNK_VOLUME)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn quad_count_matches_exposed_faces(solid in voxel_grid()) {
        let blocks: Vec<Block> = solid.iter().map(|&s| if s { STONE } else { Block::AIR }).collect();
        let c = chunk_with(blocks);
        let mesh = build_chunk_mesh(&c, &air_neighbors, &ctx());
        let mut expect = 0;
        for (i, &s) in solid.iter().enumerate() {
            if !s {
                continue;
            }
            let l = LocalPos::from_index(i);
            for face in Face::ALL {
                match l.step(face) {
                    Some(n) if solid[n.index()] => {}
                    _ => expect += 1,
                }
            }
        }
        prop_assert_eq!(mesh.quad_count(), expect);
        prop_assert_eq!(mesh.vertices.len(), expect * 4);
        prop_assert!(mesh.triangle_indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }
}
