use serde::{Deserialize, Serialize};
use strata_blocks::Face;
use strata_geom::Vec3;

/// Edge length of a chunk in voxels.
pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

const N: i32 = CHUNK_SIZE as i32;

/// Absolute integer voxel coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Voxel containing a continuous position (floor toward negative infinity).
    #[inline]
    pub fn from_f32(x: f32, y: f32, z: f32) -> Self {
        Self::new(x.floor() as i32, y.floor() as i32, z.floor() as i32)
    }

    #[inline]
    pub fn from_vec3(v: Vec3) -> Self {
        Self::from_f32(v.x, v.y, v.z)
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    #[inline]
    pub fn step(self, face: Face) -> Self {
        let (dx, dy, dz) = face.delta();
        self.offset(dx, dy, dz)
    }

    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

impl From<(i32, i32, i32)> for WorldPos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

/// Integer chunk coordinate; chunk `c` covers world voxels `[c*N, c*N + N)` on each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkPos {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn neighbor(self, face: Face) -> Self {
        let (dx, dy, dz) = face.delta();
        self.offset(dx, dy, dz)
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkPos) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dy = i64::from(self.cy - other.cy);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dy * dy + dz * dz
    }

    /// World position of local `(0,0,0)`.
    #[inline]
    pub fn origin(self) -> WorldPos {
        WorldPos::new(self.cx * N, self.cy * N, self.cz * N)
    }
}

impl From<(i32, i32, i32)> for ChunkPos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkPos> for (i32, i32, i32) {
    fn from(value: ChunkPos) -> Self {
        (value.cx, value.cy, value.cz)
    }
}

/// Coordinate inside a chunk, each component in `[0, N)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl LocalPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn in_bounds(x: i32, y: i32, z: i32) -> bool {
        (0..N).contains(&x) && (0..N).contains(&y) && (0..N).contains(&z)
    }

    /// Row-major index into a chunk's voxel array: `x + N*(y + N*z)`.
    #[inline]
    pub fn index(self) -> usize {
        debug_assert!(Self::in_bounds(self.x, self.y, self.z));
        (self.x + N * (self.y + N * self.z)) as usize
    }

    #[inline]
    pub fn from_index(i: usize) -> Self {
        let i = i as i32;
        Self::new(i % N, (i / N) % N, i / (N * N))
    }

    /// Whether the voxel touches the chunk's outer shell.
    #[inline]
    pub fn is_boundary(self) -> bool {
        let edge = |v: i32| v == 0 || v == N - 1;
        edge(self.x) || edge(self.y) || edge(self.z)
    }

    /// The neighbouring local position across `face`, or `None` when it leaves the chunk.
    #[inline]
    pub fn step(self, face: Face) -> Option<LocalPos> {
        let (dx, dy, dz) = face.delta();
        let (x, y, z) = (self.x + dx, self.y + dy, self.z + dz);
        Self::in_bounds(x, y, z).then_some(LocalPos::new(x, y, z))
    }
}

#[inline]
pub fn world_to_chunk(p: WorldPos) -> ChunkPos {
    ChunkPos::new(p.x.div_euclid(N), p.y.div_euclid(N), p.z.div_euclid(N))
}

#[inline]
pub fn world_to_local(p: WorldPos) -> LocalPos {
    LocalPos::new(p.x.rem_euclid(N), p.y.rem_euclid(N), p.z.rem_euclid(N))
}

#[inline]
pub fn chunk_and_local_to_world(c: ChunkPos, l: LocalPos) -> WorldPos {
    c.origin().offset(l.x, l.y, l.z)
}

/// Render origin of a chunk: its centre voxel corner, `chunk*N + N/2`.
#[inline]
pub fn chunk_to_world_center(c: ChunkPos) -> WorldPos {
    c.origin().offset(N / 2, N / 2, N / 2)
}
