use terrace_map::Dir;

use crate::break_field::BreakFlags;

/// Which corner pair a diagonal-through tile is split along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Diagonal {
    /// Corners NW and SE stay on the centre piece.
    NwSe,
    /// Corners NE and SW stay on the centre piece.
    NeSw,
}

impl Diagonal {
    /// Index into the NW, NE, SE, SW corner order of the first kept corner.
    #[inline]
    pub fn first_corner(self) -> usize {
        match self {
            Diagonal::NwSe => 0,
            Diagonal::NeSw => 1,
        }
    }
}

/// Topological category of a tile, picked from its break flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileClass {
    /// No broken edge; plain split quad.
    Flat,
    /// One broken edge, on the given side.
    End(Dir),
    /// Two opposite broken edges: `North` for N+S, `East` for E+W.
    Straight(Dir),
    /// Broken edges on `d` and `d.cw()`, enclosing the corner between them.
    DiagonalAdjacent(Dir),
    /// All four edges broken, split along a flat diagonal.
    DiagonalThrough(Diagonal),
    Complex,
}

impl TileClass {
    pub fn name(self) -> &'static str {
        match self {
            TileClass::Flat => "flat",
            TileClass::End(_) => "end",
            TileClass::Straight(_) => "straight",
            TileClass::DiagonalAdjacent(_) => "diagonal-adjacent",
            TileClass::DiagonalThrough(_) => "diagonal-through",
            TileClass::Complex => "complex",
        }
    }
}

/// Classifies a tile. `corners` are NW, NE, SE, SW heights and are only read when
/// all four edges are broken; `threshold` is the tile's own break threshold.
pub fn classify(flags: BreakFlags, corners: [i32; 4], threshold: i32) -> TileClass {
    match flags.count() {
        0 => TileClass::Flat,
        1 => match flags.dirs().next() {
            Some(d) => TileClass::End(d),
            None => TileClass::Complex,
        },
        2 => {
            if flags.has(Dir::North) && flags.has(Dir::South) {
                TileClass::Straight(Dir::North)
            } else if flags.has(Dir::East) && flags.has(Dir::West) {
                TileClass::Straight(Dir::East)
            } else {
                // two adjacent flags: find the one whose clockwise neighbour is also set
                Dir::ALL
                    .into_iter()
                    .find(|&d| flags.has(d) && flags.has(d.cw()))
                    .map_or(TileClass::Complex, TileClass::DiagonalAdjacent)
            }
        }
        4 => {
            let delta = |a: i32, b: i32| (i64::from(a) - i64::from(b)).abs();
            let nw_se = delta(corners[0], corners[2]);
            let ne_sw = delta(corners[1], corners[3]);
            let threshold = i64::from(threshold);
            match (nw_se <= threshold, ne_sw <= threshold) {
                (true, true) if ne_sw < nw_se => TileClass::DiagonalThrough(Diagonal::NeSw),
                (true, _) => TileClass::DiagonalThrough(Diagonal::NwSe),
                (false, true) => TileClass::DiagonalThrough(Diagonal::NeSw),
                (false, false) => TileClass::Complex,
            }
        }
        _ => TileClass::Complex,
    }
}
