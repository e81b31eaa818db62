use std::collections::HashMap;

use thiserror::Error;

use super::types::{Block, BlockId, Face, FaceMask, Transparency};

/// Static description of a block type. The built-in table is a slice of these.
#[derive(Clone, Copy, Debug)]
pub struct BlockDef {
    pub name: &'static str,
    pub transparency: Transparency,
    pub light_emission: u8,
    pub unique_faces: FaceMask,
    pub random_faces: FaceMask,
    /// Texture-name suffix per face, indexed by `Face::index`.
    pub face_suffixes: [&'static str; 6],
    pub grass_like: bool,
    pub has_geometry: bool,
}

const NO_SUFFIXES: [&str; 6] = ["", "", "", "", "", ""];
const TOP_BOTTOM_SIDE: [&str; 6] = ["_top", "_bottom", "_side", "_side", "_side", "_side"];
const END_GRAIN: [&str; 6] = ["_top", "_top", "", "", "", ""];

const fn solid(name: &'static str) -> BlockDef {
    BlockDef {
        name,
        transparency: Transparency::Opaque,
        light_emission: 0,
        unique_faces: FaceMask::NONE,
        random_faces: FaceMask::NONE,
        face_suffixes: NO_SUFFIXES,
        grass_like: false,
        has_geometry: true,
    }
}

/// The in-process block table. Position in the slice is the persisted block id.
pub const BUILTIN_BLOCKS: &[BlockDef] = &[
    BlockDef {
        transparency: Transparency::Transparent,
        has_geometry: false,
        ..solid("air")
    },
    BlockDef {
        random_faces: FaceMask::ALL,
        ..solid("stone")
    },
    BlockDef {
        random_faces: FaceMask::ALL,
        ..solid("dirt")
    },
    BlockDef {
        unique_faces: FaceMask::ALL,
        random_faces: FaceMask::TOP,
        face_suffixes: TOP_BOTTOM_SIDE,
        grass_like: true,
        ..solid("grass")
    },
    BlockDef {
        random_faces: FaceMask::ALL,
        ..solid("sand")
    },
    BlockDef {
        random_faces: FaceMask::TOP,
        ..solid("snow")
    },
    BlockDef {
        unique_faces: FaceMask::TOP_BOTTOM,
        face_suffixes: END_GRAIN,
        ..solid("wood")
    },
    BlockDef {
        transparency: Transparency::SemiTransparent,
        random_faces: FaceMask::ALL,
        grass_like: true,
        ..solid("leaves")
    },
    BlockDef {
        transparency: Transparency::Transparent,
        ..solid("glass")
    },
    BlockDef {
        light_emission: 15,
        ..solid("glowstone")
    },
];

#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: &'static str,
    pub transparency: Transparency,
    pub light_emission: u8,
    pub unique_faces: FaceMask,
    pub random_faces: FaceMask,
    pub face_suffixes: [&'static str; 6],
    pub grass_like: bool,
    pub has_geometry: bool,
    texture_keys: [String; 6],
}

impl BlockType {
    fn from_def(id: BlockId, def: &BlockDef) -> Self {
        let texture_keys = Face::ALL.map(|face| {
            if def.unique_faces.contains(face) {
                format!("{}{}", def.name, def.face_suffixes[face.index()])
            } else {
                def.name.to_string()
            }
        });
        Self {
            id,
            name: def.name,
            transparency: def.transparency,
            light_emission: def.light_emission,
            unique_faces: def.unique_faces,
            random_faces: def.random_faces,
            face_suffixes: def.face_suffixes,
            grass_like: def.grass_like,
            has_geometry: def.has_geometry,
            texture_keys,
        }
    }

    /// Atlas key for a face: `name + suffix` for unique faces, otherwise the bare name.
    #[inline]
    pub fn texture_key(&self, face: Face) -> &str {
        &self.texture_keys[face.index()]
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.transparency == Transparency::Opaque
    }

    /// A fresh voxel of this type, carrying the type's emission as its light value.
    #[inline]
    pub fn block(&self) -> Block {
        Block::with_light(self.id, self.light_emission)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate block name `{0}`")]
    DuplicateName(&'static str),
    #[error("block table must start with a non-rendering transparent `air` entry")]
    MissingAir,
    #[error("block table has {0} entries, more than the id space allows")]
    TooManyBlocks(usize),
}

/// Immutable id → block type table, built once at startup and shared by reference.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: Vec<BlockType>,
    by_name: HashMap<&'static str, BlockId>,
}

impl BlockRegistry {
    /// Registry over the built-in block table.
    pub fn builtin() -> Self {
        // The built-in table is covered by tests; an invalid edit to it is a programming error.
        match Self::from_defs(BUILTIN_BLOCKS) {
            Ok(reg) => reg,
            Err(e) => panic!("built-in block table is invalid: {e}"),
        }
    }

    pub fn from_defs(defs: &[BlockDef]) -> Result<Self, RegistryError> {
        if defs.len() > usize::from(BlockId::MAX) {
            return Err(RegistryError::TooManyBlocks(defs.len()));
        }
        match defs.first() {
            Some(air)
                if air.name == "air"
                    && air.transparency == Transparency::Transparent
                    && !air.has_geometry => {}
            _ => return Err(RegistryError::MissingAir),
        }
        let mut blocks = Vec::with_capacity(defs.len());
        let mut by_name = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            let id = i as BlockId;
            if by_name.insert(def.name, id).is_some() {
                return Err(RegistryError::DuplicateName(def.name));
            }
            blocks.push(BlockType::from_def(id, def));
        }
        Ok(Self { blocks, by_name })
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id as usize)
    }

    #[inline]
    pub fn contains(&self, id: BlockId) -> bool {
        (id as usize) < self.blocks.len()
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    /// Transparency of the voxel's type; unknown ids are treated as opaque.
    #[inline]
    pub fn transparency(&self, b: Block) -> Transparency {
        self.get(b.type_id)
            .map(|ty| ty.transparency)
            .unwrap_or(Transparency::Opaque)
    }

    /// Whether the voxel is solid ground for standing on: has geometry and is not transparent.
    #[inline]
    pub fn is_solid(&self, b: Block) -> bool {
        self.get(b.type_id)
            .map(|ty| ty.has_geometry && ty.transparency != Transparency::Transparent)
            .unwrap_or(false)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockType> {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_follow_table_order() {
        let reg = BlockRegistry::builtin();
        assert_eq!(reg.len(), BUILTIN_BLOCKS.len());
        for (i, ty) in reg.iter().enumerate() {
            assert_eq!(ty.id as usize, i);
            assert_eq!(reg.id_by_name(ty.name), Some(ty.id));
        }
        assert_eq!(reg.id_by_name("air"), Some(Block::AIR.type_id));
    }

    #[test]
    fn texture_keys_use_suffix_only_on_unique_faces() {
        let reg = BlockRegistry::builtin();
        let grass = reg.get(reg.id_by_name("grass").unwrap()).unwrap();
        assert_eq!(grass.texture_key(Face::PosY), "grass_top");
        assert_eq!(grass.texture_key(Face::NegY), "grass_bottom");
        assert_eq!(grass.texture_key(Face::PosX), "grass_side");
        let wood = reg.get(reg.id_by_name("wood").unwrap()).unwrap();
        assert_eq!(wood.texture_key(Face::NegY), "wood_top");
        assert_eq!(wood.texture_key(Face::NegZ), "wood");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let defs = [BUILTIN_BLOCKS[0], BUILTIN_BLOCKS[1], BUILTIN_BLOCKS[1]];
        assert_eq!(
            BlockRegistry::from_defs(&defs).unwrap_err(),
            RegistryError::DuplicateName("stone")
        );
    }

    #[test]
    fn table_without_air_is_rejected() {
        let defs = [BUILTIN_BLOCKS[1]];
        assert_eq!(
            BlockRegistry::from_defs(&defs).unwrap_err(),
            RegistryError::MissingAir
        );
    }

    #[test]
    fn unknown_ids_read_as_opaque_and_not_solid() {
        let reg = BlockRegistry::builtin();
        let bogus = Block::new(9999);
        assert_eq!(reg.transparency(bogus), Transparency::Opaque);
        assert!(!reg.is_solid(bogus));
        assert!(!reg.is_solid(Block::AIR));
    }
}
