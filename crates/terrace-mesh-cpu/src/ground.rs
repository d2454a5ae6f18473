//! Flat ground pieces: split quads and convex polygon fans.

use terrace_geom::{Vec2, Vec3};
use terrace_map::GridCoord;

use crate::classify::Diagonal;
use crate::part::MeshPart;

/// The diagonal a quad with NW, NE, SE, SW heights `h` is split along: the one with
/// the smaller height delta, NW-SE on ties. Neighbours agree on it without talking.
#[inline]
pub fn split_diagonal(h: [f32; 4]) -> Diagonal {
    if (h[0] - h[2]).abs() <= (h[1] - h[3]).abs() {
        Diagonal::NwSe
    } else {
        Diagonal::NeSw
    }
}

/// Two triangles over corners ordered NW, NE, SE, SW, wound with +z normals.
#[inline]
pub fn split_quad(h: [f32; 4]) -> [[u32; 3]; 2] {
    match split_diagonal(h) {
        Diagonal::NwSe => [[0, 1, 2], [0, 2, 3]],
        Diagonal::NeSw => [[0, 1, 3], [1, 2, 3]],
    }
}

/// World positions of a tile's corners (NW, NE, SE, SW).
pub fn corner_positions(tile: GridCoord, heights: [i32; 4], tile_size: f32) -> [Vec3; 4] {
    let mut out = [Vec3::ZERO; 4];
    for (i, c) in tile.tile_corners().into_iter().enumerate() {
        out[i] = Vec3::new(
            c.x as f32 * tile_size,
            c.y as f32 * tile_size,
            heights[i] as f32,
        );
    }
    out
}

/// Ground texture coordinates are planar, one unit per tile.
#[inline]
pub fn ground_uv(p: Vec3, tile_size: f32) -> Vec2 {
    Vec2::new(p.x / tile_size, p.y / tile_size)
}

/// A plain tile as one split quad.
pub fn flat_tile(local: GridCoord, world: GridCoord, corners: [Vec3; 4], tile_size: f32) -> MeshPart {
    let mut part = MeshPart::new(local, world);
    for p in corners {
        part.push_vertex(p, ground_uv(p, tile_size));
    }
    for f in split_quad(corners.map(|p| p.z)) {
        part.push_face(f);
    }
    part
}

/// Fans a convex polygon from its first point. `ring` must run NW->NE->SE order.
pub fn polygon(local: GridCoord, world: GridCoord, ring: &[Vec3], tile_size: f32) -> MeshPart {
    let mut part = MeshPart::new(local, world);
    for &p in ring {
        part.push_vertex(p, ground_uv(p, tile_size));
    }
    for k in 1..ring.len().saturating_sub(1) {
        part.push_face([0, k as u32, k as u32 + 1]);
    }
    part
}

/// Fans `ring` around `centre`, leaving out the wedge after every index where
/// `open[k]` is set. The last point connects back to the first unless open.
pub fn fan_around(
    local: GridCoord,
    world: GridCoord,
    centre: Vec3,
    ring: &[Vec3],
    open: &[bool],
    tile_size: f32,
) -> MeshPart {
    let mut part = MeshPart::new(local, world);
    let c = part.push_vertex(centre, ground_uv(centre, tile_size));
    for &p in ring {
        part.push_vertex(p, ground_uv(p, tile_size));
    }
    let n = ring.len() as u32;
    for k in 0..n {
        if open.get(k as usize).copied().unwrap_or(false) {
            continue;
        }
        part.push_face([c, 1 + k, 1 + (k + 1) % n]);
    }
    part
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_prefers_smaller_delta() {
        assert_eq!(split_diagonal([0.0, 5.0, 1.0, 0.0]), Diagonal::NwSe);
        assert_eq!(split_diagonal([0.0, 5.0, 9.0, 6.0]), Diagonal::NeSw);
        assert_eq!(split_diagonal([1.0, 2.0, 2.0, 1.0]), Diagonal::NwSe);
    }

    #[test]
    fn flat_tile_faces_up() {
        let g = GridCoord::new(3, 4);
        let part = flat_tile(g, g, corner_positions(g, [0, 2, 7, 1], 11.0), 11.0);
        assert_eq!(part.triangle_count(), 2);
        assert!(part.validate().is_ok());
        for f in &part.faces {
            let [a, b, c] = f.map(|i| part.verts[i as usize]);
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }

    #[test]
    fn open_wedges_are_skipped() {
        let g = GridCoord::new(0, 0);
        let ring = corner_positions(g, [0; 4], 1.0);
        let part = fan_around(g, g, Vec3::new(0.5, 0.5, 0.0), &ring, &[false, true, false, false], 1.0);
        assert_eq!(part.triangle_count(), 3);
    }
}
