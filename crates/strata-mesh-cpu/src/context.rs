use std::sync::Arc;

use strata_blocks::{BlockId, BlockRegistry, Face};
use strata_world::{NoiseSampler, NoiseSettings, WorldPos};

use crate::atlas::{TextureAtlas, UvRect};

/// Everything the mesher needs besides voxels: block table, atlas and rotation noise.
#[derive(Debug)]
pub struct MeshContext {
    reg: Arc<BlockRegistry>,
    atlas: TextureAtlas,
    rotation: NoiseSampler,
    /// Atlas rect per block id and face, resolved once.
    face_uvs: Vec<[UvRect; 6]>,
}

impl MeshContext {
    pub fn new(reg: Arc<BlockRegistry>, atlas: TextureAtlas, seed: i32) -> Self {
        let face_uvs = reg
            .iter()
            .map(|ty| Face::ALL.map(|f| atlas.get(ty.texture_key(f))))
            .collect();
        Self {
            rotation: NoiseSampler::new(NoiseSettings::rotation(seed)),
            reg,
            atlas,
            face_uvs,
        }
    }

    #[inline]
    pub fn registry(&self) -> &BlockRegistry {
        &self.reg
    }

    #[inline]
    pub fn atlas(&self) -> &TextureAtlas {
        &self.atlas
    }

    /// Atlas rect for a block's face; unknown ids get the atlas fallback.
    #[inline]
    pub fn face_uv(&self, id: BlockId, face: Face) -> UvRect {
        match self.face_uvs.get(id as usize) {
            Some(rects) => rects[face.index()],
            None => self.atlas.get(""),
        }
    }

    /// Quarter-turn count `0..4` for texture rotation at `p`.
    #[inline]
    pub fn rotation_at(&self, p: WorldPos) -> usize {
        rotation_step(self.rotation.sample_at(p))
    }
}

/// Maps a noise sample in `[-1, 1]` to a quarter-turn count: `floor((s*0.5+0.5)*4) mod 4`.
#[inline]
pub fn rotation_step(sample: f32) -> usize {
    let s = sample.clamp(-1.0, 1.0);
    (((s * 0.5 + 0.5) * 4.0).floor() as i32).rem_euclid(4) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_step_covers_quarters() {
        assert_eq!(rotation_step(-1.0), 0);
        assert_eq!(rotation_step(-0.6), 0);
        assert_eq!(rotation_step(-0.4), 1);
        assert_eq!(rotation_step(0.1), 2);
        assert_eq!(rotation_step(0.6), 3);
        assert_eq!(rotation_step(1.0), 0);
        assert_eq!(rotation_step(7.5), 0);
    }

    #[test]
    fn face_uvs_follow_texture_keys() {
        let reg = Arc::new(BlockRegistry::builtin());
        let top = UvRect::new(0.0, 0.0, 0.5, 0.5);
        let side = UvRect::new(0.5, 0.0, 1.0, 0.5);
        let mut atlas = TextureAtlas::default();
        atlas.insert("grass_top", top);
        atlas.insert("grass_side", side);
        let grass = reg.id_by_name("grass").unwrap();
        let ctx = MeshContext::new(reg, atlas, 0);
        assert_eq!(ctx.face_uv(grass, Face::PosY), top);
        assert_eq!(ctx.face_uv(grass, Face::NegZ), side);
        assert_eq!(ctx.face_uv(grass, Face::NegY), UvRect::FULL);
        assert_eq!(ctx.face_uv(4000, Face::PosY), UvRect::FULL);
    }
}
