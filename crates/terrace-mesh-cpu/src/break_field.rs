//! Per-edge break flags for one cut.
//!
//! Each edge is stored exactly once: horizontal (`Axis::X`) edges in one array,
//! vertical (`Axis::Y`) edges in another. A tile reads its four flags from the
//! shared arrays, so two tiles sharing an edge can never disagree.

use terrace_map::{Axis, Deferred, Dir, EdgeId, GridCoord, HeightField};

/// The four break flags of a tile, indexed by `Dir`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BreakFlags(u8);

impl BreakFlags {
    pub const NONE: BreakFlags = BreakFlags(0);

    #[inline]
    pub fn from_dirs(dirs: &[Dir]) -> Self {
        let mut f = BreakFlags::NONE;
        for &d in dirs {
            f.set(d, true);
        }
        f
    }

    #[inline]
    pub fn has(self, d: Dir) -> bool {
        self.0 & (1 << d.index()) != 0
    }

    #[inline]
    pub fn set(&mut self, d: Dir, on: bool) {
        if on {
            self.0 |= 1 << d.index();
        } else {
            self.0 &= !(1 << d.index());
        }
    }

    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn dirs(self) -> impl Iterator<Item = Dir> {
        Dir::ALL.into_iter().filter(move |&d| self.has(d))
    }
}

/// Whether a single edge breaks: the drop must exceed the threshold of both
/// tiles sharing it. Tiles without a threshold (plain, water) never break.
pub fn edge_breaks<F: HeightField + ?Sized>(field: &F, edge: EdgeId) -> Result<bool, Deferred> {
    let (ta, tb) = edge.tiles();
    let Some(thr_a) = field.tile_kind(ta)?.break_threshold() else {
        return Ok(false);
    };
    let Some(thr_b) = field.tile_kind(tb)?.break_threshold() else {
        return Ok(false);
    };
    let (ca, cb) = edge.corners();
    let delta = (i64::from(field.elevation(ca)?) - i64::from(field.elevation(cb)?)).abs();
    Ok(delta > i64::from(thr_a) && delta > i64::from(thr_b))
}

#[derive(Clone, Debug)]
pub struct BreakField {
    origin: GridCoord,
    size: usize,
    // (size + 1) rows of `size` edges
    x_edges: Vec<bool>,
    // `size` rows of (size + 1) edges
    y_edges: Vec<bool>,
}

impl BreakField {
    /// Computes every edge of the `size * size` tiles starting at `origin`,
    /// including the edges on the cut border.
    pub fn compute<F: HeightField + ?Sized>(
        field: &F,
        origin: GridCoord,
        size: usize,
    ) -> Result<Self, Deferred> {
        let mut x_edges = Vec::with_capacity((size + 1) * size);
        for j in 0..=size {
            for i in 0..size {
                let e = EdgeId::new(origin.offset(i as i32, j as i32), Axis::X);
                x_edges.push(edge_breaks(field, e)?);
            }
        }
        let mut y_edges = Vec::with_capacity(size * (size + 1));
        for j in 0..size {
            for i in 0..=size {
                let e = EdgeId::new(origin.offset(i as i32, j as i32), Axis::Y);
                y_edges.push(edge_breaks(field, e)?);
            }
        }
        Ok(Self {
            origin,
            size,
            x_edges,
            y_edges,
        })
    }

    #[inline]
    pub fn origin(&self) -> GridCoord {
        self.origin
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Flag of an edge bordering at least one tile of the cut; `None` otherwise.
    pub fn edge(&self, e: EdgeId) -> Option<bool> {
        let i = e.corner.x - self.origin.x;
        let j = e.corner.y - self.origin.y;
        let n = self.size as i32;
        match e.axis {
            Axis::X if (0..n).contains(&i) && (0..=n).contains(&j) => {
                Some(self.x_edges[(j * n + i) as usize])
            }
            Axis::Y if (0..=n).contains(&i) && (0..n).contains(&j) => {
                Some(self.y_edges[(j * (n + 1) + i) as usize])
            }
            _ => None,
        }
    }

    /// Flags of a tile given in world coordinates; `None` outside the cut.
    pub fn flags(&self, tile: GridCoord) -> Option<BreakFlags> {
        if !self.contains(tile) {
            return None;
        }
        let mut f = BreakFlags::NONE;
        for d in Dir::ALL {
            f.set(d, self.edge(EdgeId::of_tile(tile, d))?);
        }
        Some(f)
    }

    #[inline]
    pub fn contains(&self, tile: GridCoord) -> bool {
        let i = tile.x - self.origin.x;
        let j = tile.y - self.origin.y;
        i >= 0 && j >= 0 && (i as usize) < self.size && (j as usize) < self.size
    }

    /// Whether any edge of `tile` is broken.
    #[inline]
    pub fn is_broken(&self, tile: GridCoord) -> bool {
        self.flags(tile).is_some_and(|f| !f.is_empty())
    }

    pub fn broken_count(&self) -> usize {
        self.x_edges.iter().chain(&self.y_edges).filter(|&&b| b).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrace_map::{HeightGrid, TileKind};

    fn ridge(t: i32) -> TileKind {
        TileKind::Ridge { break_threshold: t }
    }

    #[test]
    fn both_thresholds_must_be_exceeded() {
        let g = HeightGrid::filled(GridCoord::new(0, 0), 2, 1, 0, ridge(10));
        // edge between tiles (0,0) and (1,0) runs from corner (1,0) to (1,1)
        g.set_elevation(GridCoord::new(1, 1), 15);
        let e = EdgeId::new(GridCoord::new(1, 0), Axis::Y);
        assert!(edge_breaks(&g, e).unwrap());
        g.set_kind(GridCoord::new(1, 0), ridge(20));
        assert!(!edge_breaks(&g, e).unwrap());
        g.set_kind(GridCoord::new(1, 0), TileKind::Water { depth: 4 });
        assert!(!edge_breaks(&g, e).unwrap());
    }

    #[test]
    fn map_border_never_breaks() {
        let g = HeightGrid::filled(GridCoord::new(0, 0), 1, 1, 0, ridge(1));
        g.set_elevation(GridCoord::new(0, 1), 50);
        let bf = BreakField::compute(&g, GridCoord::new(0, 0), 1).unwrap();
        assert_eq!(bf.flags(GridCoord::new(0, 0)), Some(BreakFlags::NONE));
    }

    #[test]
    fn shared_edge_agrees_between_tiles() {
        let g = HeightGrid::from_fn(
            GridCoord::new(0, 0),
            4,
            4,
            |c| (c.x * 37 + c.y * 11) % 23,
            |_| ridge(5),
        );
        let bf = BreakField::compute(&g, GridCoord::new(0, 0), 4).unwrap();
        for y in 0..3 {
            for x in 0..3 {
                let t = GridCoord::new(x, y);
                let f = bf.flags(t).unwrap();
                assert_eq!(f.has(Dir::East), bf.flags(t.step(Dir::East)).unwrap().has(Dir::West));
                assert_eq!(f.has(Dir::South), bf.flags(t.step(Dir::South)).unwrap().has(Dir::North));
            }
        }
        assert!(bf.broken_count() > 0);
    }

    #[test]
    fn extreme_drops_break_without_overflow() {
        let g = HeightGrid::filled(GridCoord::new(0, 0), 2, 1, i32::MIN, ridge(10));
        g.set_elevation(GridCoord::new(1, 1), i32::MAX);
        let e = EdgeId::new(GridCoord::new(1, 0), Axis::Y);
        assert!(edge_breaks(&g, e).unwrap());
    }
}
