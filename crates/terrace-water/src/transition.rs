//! Shoreline blend strips where a water tile meets a non-water neighbour.

use terrace_geom::Vec3;
use terrace_map::config::Materials;
use terrace_map::{Dir, GridCoord, MaterialTag};
use terrace_mesh_cpu::MeshPart;
use terrace_mesh_cpu::ground::ground_uv;

/// Fraction of the tile covered by a transition strip.
pub const STRIP_WIDTH: f32 = 0.25;

/// What a handler sees for one shoreline edge of a water tile.
#[derive(Clone, Copy, Debug)]
pub struct ShoreEdge {
    pub local: GridCoord,
    pub world: GridCoord,
    /// Side of the water tile facing land.
    pub dir: Dir,
    /// Surface points at the two ends of the edge.
    pub ends: [Vec3; 2],
    /// Smoothed depth at the strip's inner ends.
    pub inner_depth: [f32; 2],
    pub tile_size: f32,
}

impl ShoreEdge {
    /// Unit step from the shore into the water tile.
    fn inward(&self) -> Vec3 {
        let (dx, dy) = self.dir.opposite().delta();
        Vec3::new(dx as f32, dy as f32, 0.0)
    }
}

/// Blend strip built by a handler; `alpha` is 1 at the shore and 0 inside.
#[derive(Clone, Debug)]
pub struct TransitionFace {
    pub dir: Dir,
    pub material: MaterialTag,
    pub mesh: MeshPart,
    pub alpha: Vec<f32>,
}

pub trait TransitionHandler: Send + Sync {
    fn material(&self) -> MaterialTag;
    fn build(&self, edge: &ShoreEdge) -> TransitionFace;
}

/// Generic path: a strip lying on the water surface.
#[derive(Clone, Copy, Debug)]
pub struct GroundTransition {
    pub material: MaterialTag,
}

/// The bottom material's own path: the strip dips from the shore to the bottom.
#[derive(Clone, Copy, Debug)]
pub struct BottomTransition {
    pub material: MaterialTag,
}

fn strip(edge: &ShoreEdge, material: MaterialTag, sink: [f32; 2]) -> TransitionFace {
    let step = edge.inward() * (STRIP_WIDTH * edge.tile_size);
    let [a, b] = edge.ends;
    let inner = [a + step - Vec3::new(0.0, 0.0, sink[0]), b + step - Vec3::new(0.0, 0.0, sink[1])];
    let mut mesh = MeshPart::new(edge.local, edge.world);
    for p in [a, b, inner[1], inner[0]] {
        mesh.push_vertex(p, ground_uv(p, edge.tile_size));
    }
    mesh.push_face([0, 1, 2]);
    mesh.push_face([0, 2, 3]);
    // the shore ends may come in either order; keep the strip facing up
    if mesh.faces.iter().any(|f| {
        let [p, q, r] = f.map(|i| mesh.verts[i as usize]);
        (q - p).cross(r - p).z < 0.0
    }) {
        mesh.flip_faces();
    }
    TransitionFace {
        dir: edge.dir,
        material,
        mesh,
        alpha: vec![1.0, 1.0, 0.0, 0.0],
    }
}

impl TransitionHandler for GroundTransition {
    fn material(&self) -> MaterialTag {
        self.material
    }

    fn build(&self, edge: &ShoreEdge) -> TransitionFace {
        strip(edge, self.material, [0.0, 0.0])
    }
}

impl TransitionHandler for BottomTransition {
    fn material(&self) -> MaterialTag {
        self.material
    }

    fn build(&self, edge: &ShoreEdge) -> TransitionFace {
        strip(edge, self.material, edge.inner_depth)
    }
}

/// The bottom material's handler when it declares one, else the generic ground path.
pub fn select_handler(materials: &Materials) -> Box<dyn TransitionHandler> {
    match materials.bottom_transition {
        Some(material) => Box::new(BottomTransition { material }),
        None => Box::new(GroundTransition {
            material: materials.ground_transition,
        }),
    }
}

/// Depth at the strip's inner ends, interpolated from the shore corners toward the
/// opposite corners of the tile.
pub(crate) fn inner_depths(depth_a: f32, depth_b: f32, depth_far_a: f32, depth_far_b: f32) -> [f32; 2] {
    let t = STRIP_WIDTH;
    [
        depth_a + (depth_far_a - depth_a) * t,
        depth_b + (depth_far_b - depth_b) * t,
    ]
}
