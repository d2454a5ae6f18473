use terrace_map::GridCoord;

use crate::classify::TileClass;
use crate::error::BuildError;
use crate::part::{MeshPart, RidgePart};
use crate::tile::TileGeometry;

/// Index into one of a store's part arenas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PartId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRecord {
    pub class: TileClass,
    pub ground: PartId,
    pub ridge: Option<PartId>,
    /// The tile's ridge geometry was unusable and it fell back to a flat quad.
    pub fallback: bool,
}

/// Ground and ridge parts of every ridge-handled tile in a cut, addressed by
/// cut-local tile coordinate. Records hold indices into flat arenas.
#[derive(Clone, Debug, Default)]
pub struct PartStore {
    size: usize,
    tiles: Vec<Option<TileRecord>>,
    ground: Vec<MeshPart>,
    ridges: Vec<RidgePart>,
}

impl PartStore {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            tiles: vec![None; size * size],
            ground: Vec::new(),
            ridges: Vec::new(),
        }
    }

    #[inline]
    fn slot(&self, local: GridCoord) -> Option<usize> {
        let n = self.size as i32;
        if local.x < 0 || local.y < 0 || local.x >= n || local.y >= n {
            return None;
        }
        Some((local.y * n + local.x) as usize)
    }

    pub fn insert(
        &mut self,
        local: GridCoord,
        class: TileClass,
        geom: TileGeometry,
        fallback: bool,
    ) -> Result<PartId, BuildError> {
        let slot = self.slot(local).ok_or_else(|| {
            BuildError::Invariant(format!("tile ({}, {}) outside the cut", local.x, local.y))
        })?;
        if self.tiles[slot].is_some() {
            return Err(BuildError::Invariant(format!(
                "tile ({}, {}) stored twice",
                local.x, local.y
            )));
        }
        let ground = PartId(self.ground.len() as u32);
        self.ground.push(geom.ground);
        let ridge = geom.ridge.map(|r| {
            self.ridges.push(r);
            PartId((self.ridges.len() - 1) as u32)
        });
        self.tiles[slot] = Some(TileRecord {
            class,
            ground,
            ridge,
            fallback,
        });
        Ok(ground)
    }

    #[inline]
    pub fn record(&self, local: GridCoord) -> Option<&TileRecord> {
        self.slot(local).and_then(|s| self.tiles[s].as_ref())
    }

    pub fn ground(&self, local: GridCoord) -> Option<&MeshPart> {
        self.record(local).map(|r| &self.ground[r.ground.0 as usize])
    }

    pub fn ridge(&self, local: GridCoord) -> Option<&RidgePart> {
        self.record(local)
            .and_then(|r| r.ridge)
            .map(|id| &self.ridges[id.0 as usize])
    }

    /// Stored tiles in row-major order with their local coordinates.
    pub fn tiles(&self) -> impl Iterator<Item = (GridCoord, &TileRecord)> + '_ {
        let n = self.size.max(1);
        self.tiles.iter().enumerate().filter_map(move |(i, r)| {
            r.as_ref()
                .map(|r| (GridCoord::new((i % n) as i32, (i / n) as i32), r))
        })
    }

    #[inline]
    pub fn ground_parts(&self) -> &[MeshPart] {
        &self.ground
    }

    #[inline]
    pub fn ridge_parts(&self) -> &[RidgePart] {
        &self.ridges
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ground.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ground.is_empty()
    }
}
