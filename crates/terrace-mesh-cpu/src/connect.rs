//! Triangle strips between two seam polylines.

use terrace_geom::Vec3;
use terrace_map::GridCoord;

use crate::edge_chain::{ChainId, EdgeChain};
use crate::error::BuildError;
use crate::part::RidgePart;

/// One side of a ridge strip: a chain in a chosen direction, or a single point.
#[derive(Clone, Debug, PartialEq)]
pub struct StripSide {
    pub points: Vec<Vec3>,
    pub chain: Option<ChainId>,
    /// Height the side's V is measured from.
    pub base_z: f32,
}

impl StripSide {
    /// `chain` walked from the end nearest `corner`.
    pub fn from_chain(id: ChainId, chain: &EdgeChain, corner: GridCoord) -> Self {
        Self {
            points: chain.from_corner(corner),
            chain: Some(id),
            base_z: chain.low().z,
        }
    }

    /// A collapsed side, measured against a partner chain's base.
    pub fn point(p: Vec3, base_z: f32) -> Self {
        Self {
            points: vec![p],
            chain: None,
            base_z,
        }
    }

    fn top(&self) -> f32 {
        self.points
            .iter()
            .fold(f32::NEG_INFINITY, |m, p| m.max(p.z))
    }
}

/// Relative arc length of each point, in `[0, 1]`.
pub fn arc_params(points: &[Vec3]) -> Vec<f32> {
    let mut acc = Vec::with_capacity(points.len());
    let mut d = 0.0f32;
    acc.push(0.0);
    for w in points.windows(2) {
        d += (w[1] - w[0]).length();
        acc.push(d);
    }
    if d > 0.0 {
        for a in &mut acc {
            *a /= d;
        }
    } else if points.len() > 1 {
        // coincident points: fall back to even spacing
        let last = (points.len() - 1) as f32;
        for (k, a) in acc.iter_mut().enumerate() {
            *a = k as f32 / last;
        }
    }
    acc
}

/// Stitches sides with `n` and `m` points, parameterised by `ta` and `tb`.
/// Vertices of the first side are numbered `0..n`, the second `n..n + m`.
/// Always yields `n + m - 2` triangles.
pub fn stitch(ta: &[f32], tb: &[f32]) -> Vec<[u32; 3]> {
    let (n, m) = (ta.len(), tb.len());
    let mut faces = Vec::with_capacity((n + m).saturating_sub(2));
    let (mut i, mut j) = (0usize, 0usize);
    while i + 1 < n || j + 1 < m {
        let advance_a = if i + 1 >= n {
            false
        } else if j + 1 >= m {
            true
        } else {
            ta[i + 1] <= tb[j + 1]
        };
        let (ai, bj) = (i as u32, (n + j) as u32);
        if advance_a {
            faces.push([ai, ai + 1, bj]);
            i += 1;
        } else {
            faces.push([ai, bj + 1, bj]);
            j += 1;
        }
    }
    faces
}

/// Builds a single-ridge part spanning sides `a` (U = 0) and `b` (U = 1).
pub fn connect(
    local: GridCoord,
    world: GridCoord,
    a: &StripSide,
    b: &StripSide,
) -> Result<RidgePart, BuildError> {
    let (n, m) = (a.points.len(), b.points.len());
    if n == 0 || m == 0 || n + m < 3 {
        return Err(BuildError::Degenerate {
            tile: world,
            reason: format!("cannot stitch sides of {n} and {m} points"),
        });
    }
    let mut part = RidgePart::new(local, world);
    for (side, u) in [(a, 0.0f32), (b, 1.0f32)] {
        for &p in &side.points {
            part.mesh.push_vertex(p, Default::default());
            part.ridge_u.push(u);
            part.ridge_v.push((p.z - side.base_z).max(0.0));
            part.ridge_id.push(0);
        }
    }
    part.mesh.faces = stitch(&arc_params(&a.points), &arc_params(&b.points));
    let height = (a.top() - a.base_z).max(b.top() - b.base_z).max(0.0);
    part.heights.push(height);
    part.sources.push(a.chain.into_iter().chain(b.chain).collect());
    part.refresh_uvs();
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(x: f32, n: usize, h: f32) -> Vec<Vec3> {
        (0..n)
            .map(|k| Vec3::new(x, 0.0, h * k as f32 / (n.max(2) - 1) as f32))
            .collect()
    }

    #[test]
    fn uneven_sides_use_every_vertex() {
        let a = StripSide {
            points: column(0.0, 3, 30.0),
            chain: Some(ChainId(0)),
            base_z: 0.0,
        };
        let b = StripSide {
            points: column(5.0, 6, 30.0),
            chain: Some(ChainId(1)),
            base_z: 0.0,
        };
        let part = connect(GridCoord::new(0, 0), GridCoord::new(0, 0), &a, &b).unwrap();
        assert_eq!(part.mesh.triangle_count(), 3 + 6 - 2);
        let mut used = vec![false; 9];
        for f in &part.mesh.faces {
            for &i in f {
                used[i as usize] = true;
            }
        }
        assert!(used.iter().all(|&u| u));
        assert!(part.validate().is_ok());
        assert_eq!(part.sources, vec![vec![ChainId(0), ChainId(1)]]);
    }

    #[test]
    fn collapsed_side_fans() {
        let a = StripSide {
            points: column(0.0, 4, 30.0),
            chain: Some(ChainId(3)),
            base_z: 0.0,
        };
        let c = StripSide::point(Vec3::new(5.0, 5.0, 15.0), 0.0);
        let part = connect(GridCoord::new(0, 0), GridCoord::new(0, 0), &a, &c).unwrap();
        assert_eq!(part.mesh.triangle_count(), 3);
        assert_eq!(part.heights, vec![30.0]);
        assert_eq!(part.normalized_v(4), 0.5);
    }

    #[test]
    fn two_points_cannot_stitch() {
        let p = StripSide::point(Vec3::ZERO, 0.0);
        assert!(connect(GridCoord::new(0, 0), GridCoord::new(0, 0), &p, &p).is_err());
    }
}
