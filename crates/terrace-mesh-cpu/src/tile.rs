//! Ground and ridge geometry for one classified tile.
//!
//! Corners are numbered NW=0, NE=1, SE=2, SW=3 and edges by `Dir` index, so edge
//! `d` runs from corner `d` to corner `d + 1` (mod 4). A seam point `seam(d, c)` is
//! the end of edge `d`'s chain attached to corner `c`.

use terrace_geom::{Vec2, Vec3};
use terrace_map::{Dir, GridCoord};

use crate::classify::TileClass;
use crate::connect::{StripSide, connect};
use crate::edge_chain::{ChainArena, ChainId, EdgeChain};
use crate::error::BuildError;
use crate::ground::{corner_positions, fan_around, flat_tile, polygon};
use crate::part::{MeshPart, RidgePart};

/// Geometry produced for one tile.
#[derive(Clone, Debug)]
pub struct TileGeometry {
    pub ground: MeshPart,
    pub ridge: Option<RidgePart>,
}

/// Everything one tile build reads.
pub struct TileFrame<'a> {
    pub local: GridCoord,
    pub world: GridCoord,
    pub heights: [i32; 4],
    /// Chain on each edge, indexed by `Dir`.
    pub edges: [Option<ChainId>; 4],
    pub chains: &'a ChainArena,
    pub tile_size: f32,
}

impl TileFrame<'_> {
    fn corner_coord(&self, c: usize) -> GridCoord {
        self.world.tile_corners()[c % 4]
    }

    fn corners(&self) -> [Vec3; 4] {
        corner_positions(self.world, self.heights, self.tile_size)
    }

    fn corner(&self, c: usize) -> Vec3 {
        self.corners()[c % 4]
    }

    fn chain(&self, d: usize) -> Result<(ChainId, &EdgeChain), BuildError> {
        let d = d % 4;
        self.edges[d]
            .map(|id| (id, self.chains.get(id)))
            .ok_or_else(|| {
                BuildError::Invariant(format!(
                    "tile ({}, {}) has no chain on its {:?} edge",
                    self.world.x,
                    self.world.y,
                    Dir::from_index(d)
                ))
            })
    }

    fn seam(&self, d: usize, c: usize) -> Result<Vec3, BuildError> {
        let (_, chain) = self.chain(d)?;
        Ok(chain.end_near(self.corner_coord(c)))
    }

    fn side(&self, d: usize, from_corner: usize) -> Result<StripSide, BuildError> {
        let (id, chain) = self.chain(d)?;
        Ok(StripSide::from_chain(id, chain, self.corner_coord(from_corner)))
    }

    fn polygon(&self, ring: &[Vec3]) -> MeshPart {
        polygon(self.local, self.world, ring, self.tile_size)
    }

    fn centre_xy(&self) -> (f32, f32) {
        (
            (self.world.x as f32 + 0.5) * self.tile_size,
            (self.world.y as f32 + 0.5) * self.tile_size,
        )
    }

    /// Faces the ridge toward the low corners of the chains it was built from.
    fn orient(&self, ridge: &mut RidgePart, chain_edges: &[usize]) -> Result<(), BuildError> {
        let mut target = Vec2::ZERO;
        for &d in chain_edges {
            let (_, chain) = self.chain(d)?;
            target += Vec2::new(
                chain.low_corner.x as f32 * self.tile_size,
                chain.low_corner.y as f32 * self.tile_size,
            );
        }
        ridge.mesh.orient_towards(target / chain_edges.len().max(1) as f32);
        Ok(())
    }

    fn merge_ground(&self, parts: &[MeshPart]) -> Result<MeshPart, BuildError> {
        MeshPart::merge(self.local, self.world, parts)
    }

    fn merge_ridges(&self, parts: &[RidgePart]) -> Result<RidgePart, BuildError> {
        RidgePart::merge(self.local, self.world, parts)
    }
}

/// Builds the tile's geometry for its class and validates it. A `Degenerate`
/// error means the caller should fall back to `flat_geometry`.
pub fn build_tile(frame: &TileFrame<'_>, class: TileClass) -> Result<TileGeometry, BuildError> {
    let geom = match class {
        TileClass::Flat => flat_geometry(frame),
        TileClass::End(d) => end(frame, d.index())?,
        TileClass::Straight(d) => straight(frame, d.index())?,
        TileClass::DiagonalAdjacent(d) => {
            let (corner_piece, rest, ridge) = diagonal_adjacent(frame, d.index())?;
            TileGeometry {
                ground: frame.merge_ground(&[corner_piece, rest])?,
                ridge: Some(ridge),
            }
        }
        TileClass::DiagonalThrough(diag) => diagonal_through(frame, diag.first_corner())?,
        TileClass::Complex => complex(frame)?,
    };
    let invalid = geom
        .ground
        .validate()
        .err()
        .or_else(|| geom.ridge.as_ref().and_then(|r| r.validate().err()));
    match invalid {
        Some(reason) => Err(BuildError::Degenerate {
            tile: frame.world,
            reason,
        }),
        None => Ok(geom),
    }
}

/// Plain split quad with no ridge.
pub fn flat_geometry(frame: &TileFrame<'_>) -> TileGeometry {
    TileGeometry {
        ground: flat_tile(frame.local, frame.world, frame.corners(), frame.tile_size),
        ridge: None,
    }
}

fn end(f: &TileFrame<'_>, d: usize) -> Result<TileGeometry, BuildError> {
    let (_, chain) = f.chain(d)?;
    let (cx, cy) = f.centre_xy();
    let centre = Vec3::new(cx, cy, 0.5 * (chain.low().z + chain.high().z));
    let base = chain.low().z;
    // ring starts right after the gap left for the ridge
    let ring = [
        f.seam(d, d + 1)?,
        f.corner(d + 1),
        f.corner(d + 2),
        f.corner(d + 3),
        f.corner(d),
        f.seam(d, d)?,
    ];
    let mut open = [false; 6];
    open[5] = true;
    let ground = fan_around(f.local, f.world, centre, &ring, &open, f.tile_size);
    let mut ridge = connect(f.local, f.world, &f.side(d, d)?, &StripSide::point(centre, base))?;
    f.orient(&mut ridge, &[d])?;
    Ok(TileGeometry {
        ground,
        ridge: Some(ridge),
    })
}

fn straight(f: &TileFrame<'_>, d: usize) -> Result<TileGeometry, BuildError> {
    let d2 = d + 2;
    let first = f.polygon(&[f.seam(d2, d + 3)?, f.corner(d + 3), f.corner(d), f.seam(d, d)?]);
    let second = f.polygon(&[
        f.seam(d, d + 1)?,
        f.corner(d + 1),
        f.corner(d + 2),
        f.seam(d2, d + 2)?,
    ]);
    let mut ridge = connect(f.local, f.world, &f.side(d, d)?, &f.side(d2, d + 3)?)?;
    f.orient(&mut ridge, &[d, d2])?;
    Ok(TileGeometry {
        ground: f.merge_ground(&[first, second])?,
        ridge: Some(ridge),
    })
}

/// Corner piece, remaining pentagon and ridge for broken edges `d` and `d + 1`.
fn diagonal_adjacent(f: &TileFrame<'_>, d: usize) -> Result<(MeshPart, MeshPart, RidgePart), BuildError> {
    let e = d + 1;
    let corner_piece = f.polygon(&[f.seam(d, d + 1)?, f.corner(d + 1), f.seam(e, d + 1)?]);
    let rest = f.polygon(&[
        f.corner(d),
        f.seam(d, d)?,
        f.seam(e, d + 2)?,
        f.corner(d + 2),
        f.corner(d + 3),
    ]);
    let mut ridge = connect(f.local, f.world, &f.side(d, d + 1)?, &f.side(e, d + 1)?)?;
    f.orient(&mut ridge, &[d, e])?;
    Ok((corner_piece, rest, ridge))
}

fn diagonal_through(f: &TileFrame<'_>, c0: usize) -> Result<TileGeometry, BuildError> {
    let (piece_a, _, ridge_a) = diagonal_adjacent(f, c0)?;
    let (piece_b, _, ridge_b) = diagonal_adjacent(f, c0 + 2)?;
    let centre = f.polygon(&[
        f.corner(c0),
        f.seam(c0, c0)?,
        f.seam(c0 + 1, c0 + 2)?,
        f.corner(c0 + 2),
        f.seam(c0 + 2, c0 + 2)?,
        f.seam(c0 + 3, c0)?,
    ]);
    Ok(TileGeometry {
        ground: f.merge_ground(&[piece_a, centre, piece_b])?,
        ridge: Some(f.merge_ridges(&[ridge_a, ridge_b])?),
    })
}

/// One end-style wedge per broken edge around a shared centre point.
fn complex(f: &TileFrame<'_>) -> Result<TileGeometry, BuildError> {
    let (cx, cy) = f.centre_xy();
    let mean = f.heights.iter().map(|&h| h as f32).sum::<f32>() / 4.0;
    let centre = Vec3::new(cx, cy, mean);
    let mut ring = Vec::with_capacity(12);
    let mut open = Vec::with_capacity(12);
    let mut ridges = Vec::new();
    for d in 0..4 {
        ring.push(f.corner(d));
        open.push(false);
        if f.edges[d].is_some() {
            ring.push(f.seam(d, d)?);
            open.push(true);
            ring.push(f.seam(d, d + 1)?);
            open.push(false);
            let (_, chain) = f.chain(d)?;
            let mut r = connect(
                f.local,
                f.world,
                &f.side(d, d)?,
                &StripSide::point(centre, chain.low().z),
            )?;
            f.orient(&mut r, &[d])?;
            ridges.push(r);
        }
    }
    let ground = fan_around(f.local, f.world, centre, &ring, &open, f.tile_size);
    Ok(TileGeometry {
        ground,
        ridge: Some(f.merge_ridges(&ridges)?),
    })
}
