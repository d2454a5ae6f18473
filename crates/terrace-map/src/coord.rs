use serde::{Deserialize, Serialize};

/// Integer grid position. Addresses either a tile cell or the tile corner at
/// its north-west; tile `(x, y)` spans corners `(x, y)..=(x + 1, y + 1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    #[inline]
    pub fn step(self, dir: Dir) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    /// The four corners of the tile at `self`, ordered NW, NE, SE, SW.
    #[inline]
    pub fn tile_corners(self) -> [GridCoord; 4] {
        [
            self,
            self.offset(1, 0),
            self.offset(1, 1),
            self.offset(0, 1),
        ]
    }

    /// The four tiles touching the corner at `self`, ordered NW, NE, SE, SW.
    #[inline]
    pub fn corner_tiles(self) -> [GridCoord; 4] {
        [
            self.offset(-1, -1),
            self.offset(0, -1),
            self,
            self.offset(-1, 0),
        ]
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Compass direction on the tile grid; north is -y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::North, Dir::East, Dir::South, Dir::West];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(i: usize) -> Dir {
        Dir::ALL[i & 3]
    }

    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::North => (0, -1),
            Dir::East => (1, 0),
            Dir::South => (0, 1),
            Dir::West => (-1, 0),
        }
    }

    #[inline]
    pub fn opposite(self) -> Dir {
        Dir::from_index(self.index() + 2)
    }

    /// Next direction clockwise.
    #[inline]
    pub fn cw(self) -> Dir {
        Dir::from_index(self.index() + 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Edge from `corner` to `corner + (1, 0)`.
    X,
    /// Edge from `corner` to `corner + (0, 1)`.
    Y,
}

/// A grid edge between two adjacent corners, stored by its lower corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EdgeId {
    pub corner: GridCoord,
    pub axis: Axis,
}

impl EdgeId {
    #[inline]
    pub const fn new(corner: GridCoord, axis: Axis) -> Self {
        Self { corner, axis }
    }

    /// The edge on side `dir` of `tile`.
    #[inline]
    pub fn of_tile(tile: GridCoord, dir: Dir) -> Self {
        match dir {
            Dir::North => Self::new(tile, Axis::X),
            Dir::South => Self::new(tile.offset(0, 1), Axis::X),
            Dir::West => Self::new(tile, Axis::Y),
            Dir::East => Self::new(tile.offset(1, 0), Axis::Y),
        }
    }

    #[inline]
    pub fn corners(self) -> (GridCoord, GridCoord) {
        match self.axis {
            Axis::X => (self.corner, self.corner.offset(1, 0)),
            Axis::Y => (self.corner, self.corner.offset(0, 1)),
        }
    }

    /// The two tiles sharing this edge: (north, south) for X edges, (west, east) for Y edges.
    #[inline]
    pub fn tiles(self) -> (GridCoord, GridCoord) {
        match self.axis {
            Axis::X => (self.corner.offset(0, -1), self.corner),
            Axis::Y => (self.corner.offset(-1, 0), self.corner),
        }
    }

    /// Stable 64-bit key used for seeding.
    #[inline]
    pub fn key(self) -> u64 {
        let x = self.corner.x as u32 as u64;
        let y = self.corner.y as u32 as u64;
        let axis = match self.axis {
            Axis::X => 0u64,
            Axis::Y => 1u64,
        };
        (x << 33) ^ (y << 1) ^ axis
    }
}

/// Coordinate of a cut, the fixed-size square of tiles used as build and cache unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CutCoord {
    pub cx: i32,
    pub cy: i32,
}

impl CutCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    #[inline]
    pub fn containing(g: GridCoord, cut_size: usize) -> Self {
        let s = cut_size as i32;
        Self {
            cx: g.x.div_euclid(s),
            cy: g.y.div_euclid(s),
        }
    }

    /// World coordinate of the cut's first tile (and first corner).
    #[inline]
    pub fn origin(self, cut_size: usize) -> GridCoord {
        let s = cut_size as i32;
        GridCoord::new(self.cx * s, self.cy * s)
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
        }
    }
}

impl From<(i32, i32)> for CutCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_edges_share_identity_with_neighbours() {
        let t = GridCoord::new(3, -2);
        assert_eq!(
            EdgeId::of_tile(t, Dir::East),
            EdgeId::of_tile(t.step(Dir::East), Dir::West)
        );
        assert_eq!(
            EdgeId::of_tile(t, Dir::South),
            EdgeId::of_tile(t.step(Dir::South), Dir::North)
        );
        let (a, b) = EdgeId::of_tile(t, Dir::North).tiles();
        assert_eq!(b, t);
        assert_eq!(a, t.step(Dir::North));
    }

    #[test]
    fn cut_containing_handles_negative_coords() {
        assert_eq!(CutCoord::containing(GridCoord::new(-1, 0), 16), CutCoord::new(-1, 0));
        assert_eq!(CutCoord::containing(GridCoord::new(16, 15), 16), CutCoord::new(1, 0));
        assert_eq!(CutCoord::new(-1, 2).origin(16), GridCoord::new(-16, 32));
    }

    #[test]
    fn edge_keys_differ_by_axis() {
        let c = GridCoord::new(5, 7);
        assert_ne!(EdgeId::new(c, Axis::X).key(), EdgeId::new(c, Axis::Y).key());
    }
}
