//! Jittered seam polylines along broken edges.

use std::collections::HashMap;

use rand::Rng;
use terrace_geom::Vec3;
use terrace_map::config::Ridge;
use terrace_map::{Axis, CutRandom, Deferred, EdgeId, GridCoord, HeightField, MeshConfig, edge_rng};

/// Lateral offsets stay inside the edge so seams never reach a corner.
const MAX_OFFSET: f32 = 0.45;
/// Interior points never move more than this fraction of a segment vertically,
/// which keeps the chain strictly monotone in height.
const MAX_HEIGHT_JITTER: f32 = 0.45;

/// Index of a chain in its cut's `ChainArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u32);

/// Polyline from the low end to the high end of one broken edge.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeChain {
    pub edge: EdgeId,
    pub low_corner: GridCoord,
    pub high_corner: GridCoord,
    /// Offset of the low end along the edge, as a fraction of the tile size.
    pub low_offset: f32,
    pub high_offset: f32,
    pub points: Vec<Vec3>,
}

impl EdgeChain {
    /// Builds the chain for `edge` whose corners sit at heights `ha` and `hb`.
    /// Draws from `rng` in a fixed order, so equal generators give equal chains.
    pub fn build<R: Rng + ?Sized>(
        edge: EdgeId,
        ha: i32,
        hb: i32,
        rng: &mut R,
        cfg: &Ridge,
        tile_size: f32,
    ) -> Self {
        let (a, b) = edge.corners();
        let (low_corner, high_corner, z_lo, z_hi) = if ha <= hb {
            (a, b, ha as f32, hb as f32)
        } else {
            (b, a, hb as f32, ha as f32)
        };
        let drop = z_hi - z_lo;
        let n = ((drop / cfg.segment_height).round() as usize).max(2);
        let seg = drop / n as f32;

        let lat = cfg.lateral_jitter.abs().min(MAX_OFFSET);
        // the end attached to `a` never sits past the end attached to `b`
        let (o1, o2) = (sym(rng, lat), sym(rng, lat));
        let (off_a, off_b) = if o1 <= o2 { (o1, o2) } else { (o2, o1) };
        let (low_offset, high_offset) = if low_corner == a {
            (off_a, off_b)
        } else {
            (off_b, off_a)
        };
        let belly = sym(rng, cfg.belly.abs());
        let hj = cfg.height_jitter.abs().min(MAX_HEIGHT_JITTER) * seg;
        let wobble = lat * 0.1;

        let dir = match edge.axis {
            Axis::X => Vec3::new(1.0, 0.0, 0.0),
            Axis::Y => Vec3::new(0.0, 1.0, 0.0),
        };
        let mid = Vec3::new(
            (a.x + b.x) as f32 * 0.5 * tile_size,
            (a.y + b.y) as f32 * 0.5 * tile_size,
            0.0,
        );
        let mut points = Vec::with_capacity(n + 1);
        for k in 0..=n {
            let t = k as f32 / n as f32;
            let interior = k != 0 && k != n;
            let (dz, doff) = if interior {
                (sym(rng, hj), sym(rng, wobble))
            } else {
                (0.0, 0.0)
            };
            let off = (low_offset + (high_offset - low_offset) * t
                + belly * 4.0 * t * (1.0 - t)
                + doff)
                .clamp(-MAX_OFFSET, MAX_OFFSET);
            let mut p = mid + dir * (off * tile_size);
            p.z = if k == n { z_hi } else { z_lo + seg * k as f32 + dz };
            points.push(p);
        }
        Self {
            edge,
            low_corner,
            high_corner,
            low_offset,
            high_offset,
            points,
        }
    }

    #[inline]
    pub fn segments(&self) -> usize {
        self.points.len() - 1
    }

    #[inline]
    pub fn low(&self) -> Vec3 {
        self.points[0]
    }

    #[inline]
    pub fn high(&self) -> Vec3 {
        self.points[self.points.len() - 1]
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.high().z - self.low().z
    }

    /// Lateral offset of one end along the edge's a->b direction.
    #[inline]
    pub fn offset(&self, high: bool) -> f32 {
        if high { self.high_offset } else { self.low_offset }
    }

    /// The chain end attached to the half of the edge nearest `corner`.
    #[inline]
    pub fn end_near(&self, corner: GridCoord) -> Vec3 {
        if corner == self.low_corner {
            self.low()
        } else {
            self.high()
        }
    }

    /// Points ordered starting from the end near `corner`.
    pub fn from_corner(&self, corner: GridCoord) -> Vec<Vec3> {
        let mut pts = self.points.clone();
        if corner != self.low_corner {
            pts.reverse();
        }
        pts
    }
}

#[inline]
fn sym<R: Rng + ?Sized>(rng: &mut R, amp: f32) -> f32 {
    if amp > 0.0 {
        rng.gen_range(-amp..=amp)
    } else {
        0.0
    }
}

/// All chains built while meshing one cut, looked up by edge.
#[derive(Clone, Debug, Default)]
pub struct ChainArena {
    chains: Vec<EdgeChain>,
    by_edge: HashMap<EdgeId, ChainId>,
}

impl ChainArena {
    /// Returns the chain for `edge`, building it on first use.
    pub fn get_or_build<F: HeightField + ?Sized>(
        &mut self,
        field: &F,
        edge: EdgeId,
        seeds: &dyn CutRandom,
        cfg: &MeshConfig,
    ) -> Result<ChainId, Deferred> {
        if let Some(&id) = self.by_edge.get(&edge) {
            return Ok(id);
        }
        let (a, b) = edge.corners();
        let ha = field.elevation(a)?;
        let hb = field.elevation(b)?;
        let mut rng = edge_rng(seeds, edge, cfg.grid.cut_size);
        let chain = EdgeChain::build(edge, ha, hb, &mut rng, &cfg.ridge, cfg.grid.tile_size);
        let id = ChainId(self.chains.len() as u32);
        self.chains.push(chain);
        self.by_edge.insert(edge, id);
        Ok(id)
    }

    #[inline]
    pub fn get(&self, id: ChainId) -> &EdgeChain {
        &self.chains[id.0 as usize]
    }

    #[inline]
    pub fn lookup(&self, edge: EdgeId) -> Option<&EdgeChain> {
        self.by_edge.get(&edge).map(|&id| self.get(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EdgeChain> {
        self.chains.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn chain(ha: i32, hb: i32, seed: u64) -> EdgeChain {
        let e = EdgeId::new(GridCoord::new(2, 3), Axis::Y);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        EdgeChain::build(e, ha, hb, &mut rng, &Ridge::default(), 11.0)
    }

    #[test]
    fn segment_count_scales_with_drop() {
        assert_eq!(chain(0, 3, 1).segments(), 2);
        assert_eq!(chain(0, 40, 1).segments(), 5);
        assert_eq!(chain(100, 20, 1).segments(), 10);
    }

    #[test]
    fn runs_low_to_high_and_stays_on_edge() {
        let c = chain(50, 0, 9);
        assert_eq!(c.low_corner, GridCoord::new(2, 4));
        assert_eq!(c.low().z, 0.0);
        assert_eq!(c.high().z, 50.0);
        for w in c.points.windows(2) {
            assert!(w[1].z > w[0].z);
        }
        for p in &c.points {
            assert_eq!(p.x, 22.0);
            assert!(p.y > 33.0 && p.y < 44.0);
        }
    }

    #[test]
    fn same_seed_same_chain() {
        assert_eq!(chain(0, 33, 5), chain(0, 33, 5));
        assert_ne!(chain(0, 33, 5).points, chain(0, 33, 6).points);
    }

    #[test]
    fn from_corner_orders_points() {
        let c = chain(0, 30, 2);
        assert_eq!(c.from_corner(c.high_corner)[0], c.high());
        assert_eq!(c.from_corner(c.low_corner)[0], c.low());
        assert_eq!(c.end_near(c.high_corner), c.high());
    }
}
