use std::sync::RwLock;

use thiserror::Error;

use crate::coord::GridCoord;

/// Height or tile data for `at` is not resident yet. Retry on a later pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("map data not resident at ({}, {})", at.x, at.y)]
pub struct Deferred {
    pub at: GridCoord,
}

/// Surface classification of a tile as seen by the mesher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileKind {
    /// Ordinary ground; never part of a break.
    Plain,
    /// Ground that breaks into a ridge when an edge drop exceeds `break_threshold`.
    Ridge { break_threshold: i32 },
    /// Water surface at the corner elevations, with the bottom `depth` units below.
    Water { depth: i32 },
}

impl TileKind {
    #[inline]
    pub fn break_threshold(self) -> Option<i32> {
        match self {
            TileKind::Ridge { break_threshold } => Some(break_threshold),
            _ => None,
        }
    }

    #[inline]
    pub fn water_depth(self) -> Option<i32> {
        match self {
            TileKind::Water { depth } => Some(depth),
            _ => None,
        }
    }

    #[inline]
    pub fn is_water(self) -> bool {
        matches!(self, TileKind::Water { .. })
    }
}

/// Height-field and tile-kind queries consumed by the mesher. Tiles beyond the map
/// must report `TileKind::Plain`.
pub trait HeightField: Send + Sync {
    fn elevation(&self, corner: GridCoord) -> Result<i32, Deferred>;
    fn tile_kind(&self, tile: GridCoord) -> Result<TileKind, Deferred>;
}

impl<T: HeightField + ?Sized> HeightField for std::sync::Arc<T> {
    #[inline]
    fn elevation(&self, corner: GridCoord) -> Result<i32, Deferred> {
        (**self).elevation(corner)
    }

    #[inline]
    fn tile_kind(&self, tile: GridCoord) -> Result<TileKind, Deferred> {
        (**self).tile_kind(tile)
    }
}

/// Half-open rectangle of grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRect {
    pub min: GridCoord,
    pub max: GridCoord,
}

impl GridRect {
    #[inline]
    pub const fn new(min: GridCoord, max: GridCoord) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, g: GridCoord) -> bool {
        g.x >= self.min.x && g.y >= self.min.y && g.x < self.max.x && g.y < self.max.y
    }
}

/// In-memory height field over a rectangular window of the map.
///
/// Corners outside the window clamp to its border, tiles outside are `Plain`.
/// An optional resident rectangle emulates streaming: queries outside it return
/// `Deferred`.
#[derive(Debug)]
pub struct HeightGrid {
    base: GridCoord,
    tiles_x: usize,
    tiles_y: usize,
    heights: RwLock<Vec<i32>>,
    kinds: RwLock<Vec<TileKind>>,
    resident: RwLock<Option<GridRect>>,
}

impl HeightGrid {
    /// A flat grid of `tiles_x * tiles_y` tiles of `kind` at elevation `h`.
    pub fn filled(base: GridCoord, tiles_x: usize, tiles_y: usize, h: i32, kind: TileKind) -> Self {
        Self {
            base,
            tiles_x,
            tiles_y,
            heights: RwLock::new(vec![h; (tiles_x + 1) * (tiles_y + 1)]),
            kinds: RwLock::new(vec![kind; tiles_x * tiles_y]),
            resident: RwLock::new(None),
        }
    }

    /// Builds a grid from a corner-height function and a tile-kind function.
    pub fn from_fn(
        base: GridCoord,
        tiles_x: usize,
        tiles_y: usize,
        mut height: impl FnMut(GridCoord) -> i32,
        mut kind: impl FnMut(GridCoord) -> TileKind,
    ) -> Self {
        let mut heights = Vec::with_capacity((tiles_x + 1) * (tiles_y + 1));
        for y in 0..=tiles_y {
            for x in 0..=tiles_x {
                heights.push(height(base.offset(x as i32, y as i32)));
            }
        }
        let mut kinds = Vec::with_capacity(tiles_x * tiles_y);
        for y in 0..tiles_y {
            for x in 0..tiles_x {
                kinds.push(kind(base.offset(x as i32, y as i32)));
            }
        }
        Self {
            base,
            tiles_x,
            tiles_y,
            heights: RwLock::new(heights),
            kinds: RwLock::new(kinds),
            resident: RwLock::new(None),
        }
    }

    #[inline]
    pub fn base(&self) -> GridCoord {
        self.base
    }

    #[inline]
    pub fn size(&self) -> (usize, usize) {
        (self.tiles_x, self.tiles_y)
    }

    /// Restricts which coordinates answer; `None` makes everything resident.
    pub fn set_resident(&self, rect: Option<GridRect>) {
        if let Ok(mut r) = self.resident.write() {
            *r = rect;
        }
    }

    pub fn set_elevation(&self, corner: GridCoord, h: i32) {
        if let Some(idx) = self.corner_index(corner) {
            if let Ok(mut heights) = self.heights.write() {
                heights[idx] = h;
            }
        }
    }

    pub fn set_kind(&self, tile: GridCoord, kind: TileKind) {
        if let Some(idx) = self.tile_index(tile) {
            if let Ok(mut kinds) = self.kinds.write() {
                kinds[idx] = kind;
            }
        }
    }

    #[inline]
    fn corner_index(&self, c: GridCoord) -> Option<usize> {
        let dx = c.x - self.base.x;
        let dy = c.y - self.base.y;
        if dx < 0 || dy < 0 {
            return None;
        }
        let (dx, dy) = (dx as usize, dy as usize);
        if dx > self.tiles_x || dy > self.tiles_y {
            return None;
        }
        Some(dy * (self.tiles_x + 1) + dx)
    }

    #[inline]
    fn tile_index(&self, t: GridCoord) -> Option<usize> {
        let dx = t.x - self.base.x;
        let dy = t.y - self.base.y;
        if dx < 0 || dy < 0 {
            return None;
        }
        let (dx, dy) = (dx as usize, dy as usize);
        if dx >= self.tiles_x || dy >= self.tiles_y {
            return None;
        }
        Some(dy * self.tiles_x + dx)
    }

    fn check_resident(&self, at: GridCoord) -> Result<(), Deferred> {
        match self.resident.read().ok().and_then(|r| *r) {
            Some(rect) if !rect.contains(at) => Err(Deferred { at }),
            _ => Ok(()),
        }
    }
}

impl HeightField for HeightGrid {
    fn elevation(&self, corner: GridCoord) -> Result<i32, Deferred> {
        self.check_resident(corner)?;
        let cx = (corner.x - self.base.x).clamp(0, self.tiles_x as i32);
        let cy = (corner.y - self.base.y).clamp(0, self.tiles_y as i32);
        let idx = cy as usize * (self.tiles_x + 1) + cx as usize;
        let heights = self.heights.read().map_err(|_| Deferred { at: corner })?;
        Ok(heights[idx])
    }

    fn tile_kind(&self, tile: GridCoord) -> Result<TileKind, Deferred> {
        self.check_resident(tile)?;
        match self.tile_index(tile) {
            Some(idx) => {
                let kinds = self.kinds.read().map_err(|_| Deferred { at: tile })?;
                Ok(kinds[idx])
            }
            None => Ok(TileKind::Plain),
        }
    }
}

/// Immutable snapshot of corner heights and tile kinds over a rectangle of tiles.
///
/// A cut build fetches one window up front, so a `Deferred` surfaces before any
/// geometry is produced and the build never commits half a cut.
#[derive(Clone, Debug)]
pub struct MapWindow {
    min: GridCoord,
    tiles_x: usize,
    tiles_y: usize,
    heights: Vec<i32>,
    kinds: Vec<TileKind>,
}

impl MapWindow {
    /// Samples tiles `min .. min + (tiles_x, tiles_y)` and their corners.
    pub fn fetch<F: HeightField + ?Sized>(
        field: &F,
        min: GridCoord,
        tiles_x: usize,
        tiles_y: usize,
    ) -> Result<Self, Deferred> {
        let mut heights = Vec::with_capacity((tiles_x + 1) * (tiles_y + 1));
        for y in 0..=tiles_y {
            for x in 0..=tiles_x {
                heights.push(field.elevation(min.offset(x as i32, y as i32))?);
            }
        }
        let mut kinds = Vec::with_capacity(tiles_x * tiles_y);
        for y in 0..tiles_y {
            for x in 0..tiles_x {
                kinds.push(field.tile_kind(min.offset(x as i32, y as i32))?);
            }
        }
        Ok(Self {
            min,
            tiles_x,
            tiles_y,
            heights,
            kinds,
        })
    }

    /// Window of `size` tiles starting at `origin`, grown by `margin` tiles on every side.
    pub fn fetch_around<F: HeightField + ?Sized>(
        field: &F,
        origin: GridCoord,
        size: usize,
        margin: usize,
    ) -> Result<Self, Deferred> {
        let m = margin as i32;
        Self::fetch(field, origin.offset(-m, -m), size + 2 * margin, size + 2 * margin)
    }

    #[inline]
    pub fn min(&self) -> GridCoord {
        self.min
    }

    #[inline]
    pub fn height(&self, corner: GridCoord) -> Option<i32> {
        let dx = corner.x - self.min.x;
        let dy = corner.y - self.min.y;
        if dx < 0 || dy < 0 || dx as usize > self.tiles_x || dy as usize > self.tiles_y {
            return None;
        }
        Some(self.heights[dy as usize * (self.tiles_x + 1) + dx as usize])
    }

    #[inline]
    pub fn kind(&self, tile: GridCoord) -> Option<TileKind> {
        let dx = tile.x - self.min.x;
        let dy = tile.y - self.min.y;
        if dx < 0 || dy < 0 || dx as usize >= self.tiles_x || dy as usize >= self.tiles_y {
            return None;
        }
        Some(self.kinds[dy as usize * self.tiles_x + dx as usize])
    }
}

impl HeightField for MapWindow {
    fn elevation(&self, corner: GridCoord) -> Result<i32, Deferred> {
        self.height(corner).ok_or(Deferred { at: corner })
    }

    fn tile_kind(&self, tile: GridCoord) -> Result<TileKind, Deferred> {
        self.kind(tile).ok_or(Deferred { at: tile })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_tiles_are_plain_and_corners_clamp() {
        let g = HeightGrid::from_fn(
            GridCoord::new(0, 0),
            2,
            2,
            |c| c.x * 10 + c.y,
            |_| TileKind::Ridge { break_threshold: 4 },
        );
        assert_eq!(g.tile_kind(GridCoord::new(-1, 0)).unwrap(), TileKind::Plain);
        assert_eq!(g.tile_kind(GridCoord::new(2, 0)).unwrap(), TileKind::Plain);
        assert_eq!(g.elevation(GridCoord::new(2, 2)).unwrap(), 22);
        assert_eq!(g.elevation(GridCoord::new(5, -3)).unwrap(), 20);
    }

    #[test]
    fn resident_rect_defers_outside_queries() {
        let g = HeightGrid::filled(GridCoord::new(0, 0), 4, 4, 0, TileKind::Plain);
        g.set_resident(Some(GridRect::new(GridCoord::new(0, 0), GridCoord::new(2, 2))));
        assert!(g.elevation(GridCoord::new(1, 1)).is_ok());
        assert_eq!(
            g.elevation(GridCoord::new(3, 1)),
            Err(Deferred { at: GridCoord::new(3, 1) })
        );
        g.set_resident(None);
        assert!(g.elevation(GridCoord::new(3, 1)).is_ok());
    }

    #[test]
    fn window_fetch_propagates_deferred() {
        let g = HeightGrid::filled(GridCoord::new(0, 0), 8, 8, 3, TileKind::Plain);
        g.set_resident(Some(GridRect::new(GridCoord::new(0, 0), GridCoord::new(4, 4))));
        let err = MapWindow::fetch(&g, GridCoord::new(2, 2), 4, 4).unwrap_err();
        assert!(err.at.x >= 4 || err.at.y >= 4);
        let w = MapWindow::fetch(&g, GridCoord::new(0, 0), 3, 3).unwrap();
        assert_eq!(w.height(GridCoord::new(3, 3)), Some(3));
        assert_eq!(w.height(GridCoord::new(4, 0)), None);
        assert_eq!(w.kind(GridCoord::new(3, 0)), None);
    }

    #[test]
    fn window_fetches_through_shared_trait_object() {
        let g: std::sync::Arc<dyn HeightField> =
            std::sync::Arc::new(HeightGrid::filled(GridCoord::new(0, 0), 4, 4, 7, TileKind::Plain));
        let w = MapWindow::fetch_around(g.as_ref(), GridCoord::new(1, 1), 2, 1).unwrap();
        assert_eq!(w.min(), GridCoord::new(0, 0));
        assert_eq!(w.height(GridCoord::new(4, 4)), Some(7));
        assert_eq!(w.height(GridCoord::new(5, 4)), None);
    }
}
