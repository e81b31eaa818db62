use crate::{Vec2, Vec3};

/// Triangle mesh for one chunk: positions, per-vertex UVs and triangle indices.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct MeshOutput {
    pub vertices: Vec<Vec3>,
    pub triangle_indices: Vec<u32>,
    pub uvs: Vec<Vec2>,
}

impl MeshOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-reserve capacity for approximately `n_quads` quads.
    #[inline]
    pub fn reserve_quads(&mut self, n_quads: usize) {
        self.vertices.reserve(n_quads * 4);
        self.uvs.reserve(n_quads * 4);
        self.triangle_indices.reserve(n_quads * 6);
    }

    /// Appends a quad `a,b,c,d` (counter-clockwise seen from outside) as two triangles.
    pub fn add_quad(&mut self, corners: [Vec3; 4], uvs: [Vec2; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.uvs.extend_from_slice(&uvs);
        self.triangle_indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.triangle_indices.len() / 6
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(z: f32) -> MeshOutput {
        let mut m = MeshOutput::new();
        m.add_quad(
            [
                Vec3::new(0.0, 0.0, z),
                Vec3::new(1.0, 0.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(0.0, 1.0, z),
            ],
            [Vec2::new(0.0, 0.0); 4],
        );
        m
    }

    #[test]
    fn second_quad_indexes_its_own_vertices() {
        let mut m = quad(0.0);
        m.add_quad(
            [
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
            ],
            [Vec2::new(0.0, 0.0); 4],
        );
        assert_eq!(m.vertices.len(), 8);
        assert_eq!(m.uvs.len(), 8);
        assert_eq!(m.quad_count(), 2);
        assert_eq!(&m.triangle_indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn new_mesh_is_empty() {
        let m = MeshOutput::new();
        assert!(m.is_empty());
        assert_eq!(m.quad_count(), 0);
        assert!(!quad(0.0).is_empty());
    }
}
