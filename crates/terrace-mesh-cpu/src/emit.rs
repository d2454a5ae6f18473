use std::collections::HashMap;

use terrace_map::MaterialTag;

use crate::mesh_build::{MeshBuild, MeshVertex};

/// Receives finished triangle batches tagged with a material.
pub trait MeshSink {
    fn add_triangles(&mut self, material: MaterialTag, vertices: &[MeshVertex], faces: &[[u32; 3]]);
}

impl MeshSink for HashMap<MaterialTag, MeshBuild> {
    #[inline]
    fn add_triangles(&mut self, material: MaterialTag, vertices: &[MeshVertex], faces: &[[u32; 3]]) {
        if faces.is_empty() {
            return;
        }
        self.entry(material)
            .or_default()
            .add_triangles(vertices, faces);
    }
}

/// Counts what passes through without keeping geometry.
#[derive(Default, Debug, Clone)]
pub struct CountingSink {
    pub vertices: usize,
    pub triangles: usize,
    pub per_material: HashMap<MaterialTag, usize>,
}

impl MeshSink for CountingSink {
    fn add_triangles(&mut self, material: MaterialTag, vertices: &[MeshVertex], faces: &[[u32; 3]]) {
        self.vertices += vertices.len();
        self.triangles += faces.len();
        *self.per_material.entry(material).or_default() += faces.len();
    }
}
