use terrace_geom::{Vec2, Vec3, face_normal};

/// One vertex handed to a mesh sink.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub pos: Vec3,
    pub uv: Vec2,
    /// Material-specific extra channel: ridge (u, v), flow velocity, or (depth, fog).
    pub aux: Vec2,
}

impl MeshVertex {
    #[inline]
    pub const fn new(pos: Vec3, uv: Vec2, aux: Vec2) -> Self {
        Self { pos, uv, aux }
    }
}

/// Flat vertex/index buffers for one material, ready for upload.
#[derive(Default, Clone, Debug)]
pub struct MeshBuild {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub aux: Vec<f32>,
    pub idx: Vec<u32>,
}

impl MeshBuild {
    #[inline]
    pub fn reserve(&mut self, verts: usize, tris: usize) {
        self.pos.reserve(verts * 3);
        self.norm.reserve(verts * 3);
        self.uv.reserve(verts * 2);
        self.aux.reserve(verts * 2);
        self.idx.reserve(tris * 3);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    /// Appends a batch of indexed triangles. Normals are area-weighted averages of
    /// the faces in this batch touching each vertex.
    pub fn add_triangles(&mut self, vertices: &[MeshVertex], faces: &[[u32; 3]]) {
        let base = self.vertex_count() as u32;
        self.reserve(vertices.len(), faces.len());
        let mut normals = vec![Vec3::ZERO; vertices.len()];
        for f in faces {
            let [a, b, c] = f.map(|i| vertices[i as usize].pos);
            // cross product magnitude doubles as the area weight
            let n = (b - a).cross(c - a);
            for &i in f {
                normals[i as usize] += n;
            }
        }
        for (v, n) in vertices.iter().zip(normals) {
            let n = if n.length() > 0.0 {
                n.normalized()
            } else {
                Vec3::UP
            };
            self.pos.extend_from_slice(&[v.pos.x, v.pos.y, v.pos.z]);
            self.norm.extend_from_slice(&[n.x, n.y, n.z]);
            self.uv.extend_from_slice(&[v.uv.x, v.uv.y]);
            self.aux.extend_from_slice(&[v.aux.x, v.aux.y]);
        }
        for f in faces {
            self.idx
                .extend_from_slice(&[base + f[0], base + f[1], base + f[2]]);
        }
    }

    /// Position of vertex `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos[i * 3], self.pos[i * 3 + 1], self.pos[i * 3 + 2])
    }

    /// Normal of triangle `t` computed from its positions.
    pub fn triangle_normal(&self, t: usize) -> Vec3 {
        let i = &self.idx[t * 3..t * 3 + 3];
        face_normal(
            self.position(i[0] as usize),
            self.position(i[1] as usize),
            self.position(i[2] as usize),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_offset_indices() {
        let v = [
            MeshVertex::new(Vec3::new(0.0, 0.0, 0.0), Vec2::ZERO, Vec2::ZERO),
            MeshVertex::new(Vec3::new(1.0, 0.0, 0.0), Vec2::ZERO, Vec2::ZERO),
            MeshVertex::new(Vec3::new(1.0, 1.0, 0.0), Vec2::ZERO, Vec2::ZERO),
        ];
        let mut mb = MeshBuild::default();
        mb.add_triangles(&v, &[[0, 1, 2]]);
        mb.add_triangles(&v, &[[0, 1, 2]]);
        assert_eq!(mb.vertex_count(), 6);
        assert_eq!(&mb.idx[3..], &[3, 4, 5]);
        assert!(mb.triangle_normal(1).z > 0.99);
    }
}
