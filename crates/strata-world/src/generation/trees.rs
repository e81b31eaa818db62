use strata_blocks::{Block, BlockId};

use super::TerrainGenerator;
use crate::coords::{CHUNK_SIZE, ChunkPos, WorldPos, world_to_chunk, world_to_local};
use crate::hash;

const TREE_SALT: u32 = 0x7a3d_9c41;
const TRUNK_SALT: u32 = 0x1b87_3593;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Tree {
    base: WorldPos,
    height: i32,
}

/// Writes every tree voxel that lands in `pos`, whether the tree is rooted here or
/// in a neighbouring chunk. Roots are a function of world position alone, so the
/// result does not depend on which neighbours exist. Tree voxels only replace air.
pub(super) fn place_trees(generator: &TerrainGenerator, pos: ChunkPos, blocks: &mut [Block]) {
    let params = generator.params();
    let ids = *generator.blocks();
    let n = CHUNK_SIZE as i32;
    // Leaves reach `leaf_radius + 1` sideways, two above the trunk and one below the root.
    let spread = params.leaf_radius + 1;
    let h_reach = (spread + n - 1) / n;
    let v_reach = (params.trunk_max + 2 + n - 1) / n;
    let origin = pos.origin();
    let near = |v: i32, lo: i32| v >= lo - spread && v < lo + n + spread;

    for dy in -v_reach..=1 {
        for dz in -h_reach..=h_reach {
            for dx in -h_reach..=h_reach {
                let root_chunk = pos.offset(dx, dy, dz);
                let ro = root_chunk.origin();
                for z in (ro.z..ro.z + n).filter(|&z| near(z, origin.z)) {
                    for x in (ro.x..ro.x + n).filter(|&x| near(x, origin.x)) {
                        let Some(tree) = tree_root(generator, root_chunk, x, z) else {
                            continue;
                        };
                        if tree.base.y + tree.height + 2 < origin.y
                            || tree.base.y - 1 >= origin.y + n
                        {
                            continue;
                        }
                        write_tree(tree, params.leaf_radius, ids.wood, ids.leaves, |wp, id| {
                            if world_to_chunk(wp) != pos {
                                return;
                            }
                            let idx = world_to_local(wp).index();
                            if blocks[idx].is_air() {
                                blocks[idx] = generator.block_value(id);
                            }
                        });
                    }
                }
            }
        }
    }
}

/// The tree growing from column `(x, z)` inside `chunk`, if the column rolls one:
/// rooted on the highest grass voxel with air above, by terrain classification.
fn tree_root(generator: &TerrainGenerator, chunk: ChunkPos, x: i32, z: i32) -> Option<Tree> {
    let params = generator.params();
    let seed = generator.seed() as u32;
    if hash::unit(hash::hash2(x, z, seed ^ TREE_SALT)) >= params.tree_probability {
        return None;
    }
    let ids = generator.blocks();
    let n = CHUNK_SIZE as i32;
    let oy = chunk.origin().y;
    let mut above = generator.classify(WorldPos::new(x, oy + n, z));
    for y in (oy..oy + n).rev() {
        let here = generator.classify(WorldPos::new(x, y, z));
        if here == ids.grass && above == ids.air {
            let span = (params.trunk_max - params.trunk_min + 1) as u32;
            let height = params.trunk_min + (hash::hash2(x, z, seed ^ TRUNK_SALT) % span) as i32;
            return Some(Tree {
                base: WorldPos::new(x, y, z),
                height,
            });
        }
        above = here;
    }
    None
}

fn write_tree(
    tree: Tree,
    leaf_r: i32,
    wood: BlockId,
    leaves: BlockId,
    mut put: impl FnMut(WorldPos, BlockId),
) {
    for dy in 1..=tree.height {
        put(tree.base.offset(0, dy, 0), wood);
    }
    let top = tree.base.offset(0, tree.height, 0);
    for dy in -2i32..=2 {
        let rad = if dy.abs() == 2 { leaf_r - 1 } else { leaf_r };
        let extra = if dy >= 1 { 0 } else { 1 };
        for dz in -leaf_r..=leaf_r {
            for dx in -leaf_r..=leaf_r {
                if dx == 0 && dz == 0 && dy <= 0 {
                    continue;
                }
                if dx.abs() + dz.abs() <= rad + extra {
                    put(top.offset(dx, dy, dz), leaves);
                }
            }
        }
    }
}
