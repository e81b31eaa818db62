pub type BlockId = u16;

/// A single voxel value. Stored by value inside a chunk's contiguous array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    pub type_id: BlockId,
    pub light_value: u8,
}

impl Block {
    pub const AIR: Block = Block {
        type_id: 0,
        light_value: 0,
    };

    #[inline]
    pub const fn new(type_id: BlockId) -> Self {
        Self {
            type_id,
            light_value: 0,
        }
    }

    #[inline]
    pub const fn with_light(type_id: BlockId, light_value: u8) -> Self {
        Self {
            type_id,
            light_value,
        }
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self.type_id == Block::AIR.type_id
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Transparency {
    Transparent,
    SemiTransparent,
    Opaque,
}

impl Transparency {
    /// Whether a face adjacent to a voxel of this class can be seen.
    #[inline]
    pub fn reveals_neighbor(self) -> bool {
        !matches!(self, Transparency::Opaque)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Face {
    PosY = 0,
    NegY = 1,
    PosX = 2,
    NegX = 3,
    PosZ = 4,
    NegZ = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::PosY,
        Face::NegY,
        Face::PosX,
        Face::NegX,
        Face::PosZ,
        Face::NegZ,
    ];

    /// Returns the `[0..6)` index of this face.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts a face index `[0..6)` back into a `Face` value.
    /// Falls back to `PosY` for out-of-range indices.
    #[inline]
    pub fn from_index(i: usize) -> Face {
        match i {
            0 => Face::PosY,
            1 => Face::NegY,
            2 => Face::PosX,
            3 => Face::NegX,
            4 => Face::PosZ,
            5 => Face::NegZ,
            _ => Face::PosY,
        }
    }

    /// Returns the integer grid delta `(dx,dy,dz)` when stepping out of this face.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Face::PosY => (0, 1, 0),
            Face::NegY => (0, -1, 0),
            Face::PosX => (1, 0, 0),
            Face::NegX => (-1, 0, 0),
            Face::PosZ => (0, 0, 1),
            Face::NegZ => (0, 0, -1),
        }
    }

    #[inline]
    pub fn opposite(self) -> Face {
        match self {
            Face::PosY => Face::NegY,
            Face::NegY => Face::PosY,
            Face::PosX => Face::NegX,
            Face::NegX => Face::PosX,
            Face::PosZ => Face::NegZ,
            Face::NegZ => Face::PosZ,
        }
    }

    #[inline]
    pub fn is_vertical(self) -> bool {
        matches!(self, Face::PosY | Face::NegY)
    }
}

/// Bit set over the six faces, indexed by `Face::index`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct FaceMask(u8);

impl FaceMask {
    pub const NONE: FaceMask = FaceMask(0);
    pub const ALL: FaceMask = FaceMask(0b11_1111);
    pub const TOP: FaceMask = FaceMask(1 << Face::PosY as u8);
    pub const BOTTOM: FaceMask = FaceMask(1 << Face::NegY as u8);
    pub const TOP_BOTTOM: FaceMask = FaceMask(Self::TOP.0 | Self::BOTTOM.0);
    pub const SIDES: FaceMask = FaceMask(Self::ALL.0 & !Self::TOP_BOTTOM.0);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, face: Face) -> bool {
        self.0 & (1 << face.index()) != 0
    }

    #[inline]
    pub fn with(self, face: Face) -> FaceMask {
        FaceMask(self.0 | (1 << face.index()))
    }

    #[inline]
    pub const fn union(self, other: FaceMask) -> FaceMask {
        FaceMask(self.0 | other.0)
    }
}
