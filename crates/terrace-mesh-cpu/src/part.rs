//! Per-tile mesh fragments and their merge.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use terrace_geom::{Vec2, Vec3, triangle_area};
use terrace_map::GridCoord;

use crate::edge_chain::ChainId;
use crate::error::BuildError;

/// Triangles at or below this area are rejected as degenerate.
pub const MIN_TRIANGLE_AREA: f32 = 1e-6;

/// Indexed triangle fragment for one tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshPart {
    /// Tile position inside its cut.
    pub local: GridCoord,
    pub world: GridCoord,
    pub verts: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub faces: Vec<[u32; 3]>,
}

impl MeshPart {
    pub fn new(local: GridCoord, world: GridCoord) -> Self {
        Self {
            local,
            world,
            ..Default::default()
        }
    }

    #[inline]
    pub fn push_vertex(&mut self, pos: Vec3, uv: Vec2) -> u32 {
        self.verts.push(pos);
        self.uvs.push(uv);
        (self.verts.len() - 1) as u32
    }

    #[inline]
    pub fn push_face(&mut self, face: [u32; 3]) {
        self.faces.push(face);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn area(&self) -> f32 {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = f.map(|i| self.verts[i as usize]);
                triangle_area(a, b, c)
            })
            .sum()
    }

    /// Checks index ranges, finiteness and triangle areas.
    pub fn validate(&self) -> Result<(), String> {
        if self.uvs.len() != self.verts.len() {
            return Err(format!(
                "{} uvs for {} vertices",
                self.uvs.len(),
                self.verts.len()
            ));
        }
        if let Some(i) = self.verts.iter().position(|v| !v.is_finite()) {
            return Err(format!("vertex {i} is not finite"));
        }
        let n = self.verts.len() as u32;
        for (t, f) in self.faces.iter().enumerate() {
            if f.iter().any(|&i| i >= n) {
                return Err(format!("face {t} indexes past {n} vertices"));
            }
            let [a, b, c] = f.map(|i| self.verts[i as usize]);
            let area = triangle_area(a, b, c);
            if !(area > MIN_TRIANGLE_AREA) {
                return Err(format!("face {t} has area {area}"));
            }
        }
        Ok(())
    }

    pub fn flip_faces(&mut self) {
        for f in &mut self.faces {
            f.swap(1, 2);
        }
    }

    /// Flips winding if the summed face normal points away from `target` in the xy plane.
    pub fn orient_towards(&mut self, target: Vec2) {
        if self.verts.is_empty() {
            return;
        }
        let mut n = Vec3::ZERO;
        for f in &self.faces {
            let [a, b, c] = f.map(|i| self.verts[i as usize]);
            n += (b - a).cross(c - a);
        }
        let centroid = self
            .verts
            .iter()
            .fold(Vec3::ZERO, |acc, &v| acc + v)
            / self.verts.len() as f32;
        if n.xy().dot(target - centroid.xy()) < 0.0 {
            self.flip_faces();
        }
    }

    /// Appends `other`, returning the index offset applied to its faces.
    pub fn append(&mut self, other: &MeshPart) -> u32 {
        let base = self.verts.len() as u32;
        self.verts.extend_from_slice(&other.verts);
        self.uvs.extend_from_slice(&other.uvs);
        self.faces
            .extend(other.faces.iter().map(|f| f.map(|i| i + base)));
        base
    }

    /// Concatenates parts that share no vertices.
    pub fn merge(local: GridCoord, world: GridCoord, parts: &[MeshPart]) -> Result<MeshPart, BuildError> {
        let mut out = MeshPart::new(local, world);
        let verts: usize = parts.iter().map(|p| p.verts.len()).sum();
        let faces: usize = parts.iter().map(|p| p.faces.len()).sum();
        out.verts.reserve(verts);
        out.uvs.reserve(verts);
        out.faces.reserve(faces);
        for p in parts {
            out.append(p);
        }
        if out.verts.len() != verts || out.faces.len() != faces || out.uvs.len() != verts {
            return Err(BuildError::Invariant(format!(
                "merge produced {} vertices and {} faces, expected {verts} and {faces}",
                out.verts.len(),
                out.faces.len()
            )));
        }
        Ok(out)
    }
}

/// Ridge fragment: a mesh plus ridge-relative parameters per vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RidgePart {
    pub mesh: MeshPart,
    /// 0 on the first chain of the strip, 1 on the second.
    pub ridge_u: Vec<f32>,
    /// Height of the vertex above the base of its own chain, in world units.
    pub ridge_v: Vec<f32>,
    pub ridge_id: Vec<u16>,
    /// Total physical height of each ridge.
    pub heights: Vec<f32>,
    /// Chains each ridge was built from.
    pub sources: Vec<Vec<ChainId>>,
}

impl RidgePart {
    pub fn new(local: GridCoord, world: GridCoord) -> Self {
        Self {
            mesh: MeshPart::new(local, world),
            ..Default::default()
        }
    }

    #[inline]
    pub fn ridge_count(&self) -> usize {
        self.heights.len()
    }

    /// Position of vertex `i` along its ridge's height, in `[0, 1]`.
    pub fn normalized_v(&self, i: usize) -> f32 {
        let h = self.heights[self.ridge_id[i] as usize];
        if h > 0.0 {
            (self.ridge_v[i] / h).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Number of texture repeats covering ridge `id`.
    #[inline]
    pub fn repeats(&self, id: u16, texture_height: f32) -> f32 {
        let h = self.heights[id as usize];
        if texture_height > 0.0 {
            (h / texture_height).round().max(1.0)
        } else {
            1.0
        }
    }

    /// Final texture coordinate of vertex `i`: V repeats once per `texture_height`.
    pub fn texture_uv(&self, i: usize, texture_height: f32) -> Vec2 {
        let reps = self.repeats(self.ridge_id[i], texture_height);
        Vec2::new(self.ridge_u[i], self.normalized_v(i) * reps)
    }

    /// Rewrites the mesh uvs as (u, normalized v).
    pub fn refresh_uvs(&mut self) {
        let uvs: Vec<Vec2> = (0..self.mesh.verts.len())
            .map(|i| Vec2::new(self.ridge_u[i], self.normalized_v(i)))
            .collect();
        self.mesh.uvs = uvs;
    }

    pub fn validate(&self) -> Result<(), String> {
        let n = self.mesh.verts.len();
        if self.ridge_u.len() != n || self.ridge_v.len() != n || self.ridge_id.len() != n {
            return Err(format!("ridge attributes do not cover {n} vertices"));
        }
        if let Some(i) = self
            .ridge_id
            .iter()
            .position(|&r| r as usize >= self.heights.len())
        {
            return Err(format!("vertex {i} names a missing ridge"));
        }
        self.mesh.validate()
    }

    /// Concatenates ridge parts. Sub-ridges built from a common chain collapse into
    /// one ridge; the merged ridge keeps the tallest height.
    pub fn merge(local: GridCoord, world: GridCoord, parts: &[RidgePart]) -> Result<RidgePart, BuildError> {
        let mut first = Vec::with_capacity(parts.len());
        let mut total = 0usize;
        for p in parts {
            if p.sources.len() != p.heights.len() {
                return Err(BuildError::Invariant(format!(
                    "{} ridge sources for {} ridges",
                    p.sources.len(),
                    p.heights.len()
                )));
            }
            first.push(total);
            total += p.heights.len();
        }

        let mut sets = DisjointSet::new(total);
        let mut owner: HashMap<ChainId, usize> = HashMap::new();
        for (pi, p) in parts.iter().enumerate() {
            for (r, chains) in p.sources.iter().enumerate() {
                let slot = first[pi] + r;
                for &c in chains {
                    match owner.entry(c) {
                        Entry::Occupied(e) => sets.union(*e.get(), slot),
                        Entry::Vacant(e) => {
                            e.insert(slot);
                        }
                    }
                }
            }
        }

        let mut out = RidgePart::new(local, world);
        let mut remap = vec![0u16; total];
        let mut ids: HashMap<usize, u16> = HashMap::new();
        for (pi, p) in parts.iter().enumerate() {
            for r in 0..p.heights.len() {
                let slot = first[pi] + r;
                let root = sets.find(slot);
                let id = *ids.entry(root).or_insert_with(|| {
                    out.heights.push(0.0);
                    out.sources.push(Vec::new());
                    (out.heights.len() - 1) as u16
                });
                remap[slot] = id;
                let h = &mut out.heights[id as usize];
                *h = h.max(p.heights[r]);
                out.sources[id as usize].extend_from_slice(&p.sources[r]);
            }
        }
        for s in &mut out.sources {
            s.sort_unstable();
            s.dedup();
        }

        let expected: usize = parts.iter().map(|p| p.mesh.verts.len()).sum();
        for (pi, p) in parts.iter().enumerate() {
            out.mesh.append(&p.mesh);
            out.ridge_u.extend_from_slice(&p.ridge_u);
            out.ridge_v.extend_from_slice(&p.ridge_v);
            for &r in &p.ridge_id {
                if r as usize >= p.heights.len() {
                    return Err(BuildError::Invariant(format!(
                        "ridge id {r} out of range for {} ridges",
                        p.heights.len()
                    )));
                }
                out.ridge_id.push(remap[first[pi] + r as usize]);
            }
        }
        let n = out.mesh.verts.len();
        if n != expected || out.ridge_u.len() != n || out.ridge_v.len() != n || out.ridge_id.len() != n {
            return Err(BuildError::Invariant(format!(
                "ridge merge produced {n} vertices, expected {expected}"
            )));
        }
        out.refresh_uvs();
        Ok(out)
    }
}

/// Union-find with path halving.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // keep the earlier slot as root so ids follow first appearance
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}
