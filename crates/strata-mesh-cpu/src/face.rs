use strata_blocks::Face;
use strata_geom::Vec3;

/// Unit-cube corners of each face, counter-clockwise seen from outside, indexed by
/// `Face::index`.
const CORNERS: [[[f32; 3]; 4]; 6] = [
    [[0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]],
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
    [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 1.0]],
    [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
    [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
];

/// Face quad corners for the voxel whose minimum corner is `min`.
#[inline]
pub(crate) fn quad_corners(face: Face, min: Vec3) -> [Vec3; 4] {
    CORNERS[face.index()].map(|[x, y, z]| Vec3::new(min.x + x, min.y + y, min.z + z))
}

/// Planar texture coordinates in the unit square for each corner of a face:
/// top/bottom project onto x/z, sides onto the horizontal axis and inverted y.
#[inline]
pub(crate) fn unit_uvs(face: Face) -> [(f32, f32); 4] {
    CORNERS[face.index()].map(|[x, y, z]| match face {
        Face::PosY | Face::NegY => (x, z),
        Face::PosX => (1.0 - z, 1.0 - y),
        Face::NegX => (z, 1.0 - y),
        Face::PosZ => (x, 1.0 - y),
        Face::NegZ => (1.0 - x, 1.0 - y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cross(a: Vec3, b: Vec3) -> Vec3 {
        Vec3::new(
            a.y * b.z - a.z * b.y,
            a.z * b.x - a.x * b.z,
            a.x * b.y - a.y * b.x,
        )
    }

    #[test]
    fn winding_faces_outward() {
        for face in Face::ALL {
            let [a, b, c, _] = quad_corners(face, Vec3::ZERO);
            let n = cross(b - a, c - a);
            let (dx, dy, dz) = face.delta();
            assert_eq!(n, Vec3::new(dx as f32, dy as f32, dz as f32), "{face:?}");
        }
    }

    #[test]
    fn side_uvs_put_v_zero_at_top() {
        for face in [Face::PosX, Face::NegX, Face::PosZ, Face::NegZ] {
            let corners = CORNERS[face.index()];
            for (corner, (_, v)) in corners.iter().zip(unit_uvs(face)) {
                assert_eq!(v, 1.0 - corner[1]);
            }
        }
    }
}
