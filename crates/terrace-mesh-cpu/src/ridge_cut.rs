//! Ridge meshing for one cut.

use std::collections::HashMap;
use std::time::Instant;

use terrace_geom::{Aabb, Vec2};
use terrace_map::{CutCoord, CutRandom, Dir, EdgeId, GridCoord, HeightField, MaterialTag, MeshConfig};

use crate::break_field::BreakField;
use crate::classify::{TileClass, classify};
use crate::edge_chain::ChainArena;
use crate::emit::MeshSink;
use crate::error::BuildError;
use crate::mesh_build::{MeshBuild, MeshVertex};
use crate::part::{MeshPart, RidgePart};
use crate::store::PartStore;
use crate::tile::{TileFrame, build_tile, flat_geometry};

/// Tile-class histogram of one cut.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassCounts {
    pub flat: usize,
    pub end: usize,
    pub straight: usize,
    pub diagonal_adjacent: usize,
    pub diagonal_through: usize,
    pub complex: usize,
    /// Tiles whose ridge geometry was degenerate and got a flat quad instead.
    pub fallback: usize,
}

impl ClassCounts {
    pub fn record(&mut self, class: TileClass) {
        match class {
            TileClass::Flat => self.flat += 1,
            TileClass::End(_) => self.end += 1,
            TileClass::Straight(_) => self.straight += 1,
            TileClass::DiagonalAdjacent(_) => self.diagonal_adjacent += 1,
            TileClass::DiagonalThrough(_) => self.diagonal_through += 1,
            TileClass::Complex => self.complex += 1,
        }
    }

    pub fn merge(&mut self, o: &ClassCounts) {
        self.flat += o.flat;
        self.end += o.end;
        self.straight += o.straight;
        self.diagonal_adjacent += o.diagonal_adjacent;
        self.diagonal_through += o.diagonal_through;
        self.complex += o.complex;
        self.fallback += o.fallback;
    }

    pub fn ridged(&self) -> usize {
        self.end + self.straight + self.diagonal_adjacent + self.diagonal_through + self.complex
    }
}

/// Immutable ridge output of one cut.
#[derive(Clone, Debug)]
pub struct RidgeCut {
    pub cut: CutCoord,
    pub origin: GridCoord,
    pub size: usize,
    pub breaks: BreakField,
    pub chains: ChainArena,
    pub parts: PartStore,
    pub counts: ClassCounts,
}

impl RidgeCut {
    /// Builds every ridge-handled tile of `cut`. Degenerate tiles fall back to a
    /// flat quad; `Deferred` and invariant failures abort the whole cut.
    pub fn build<F: HeightField + ?Sized>(
        field: &F,
        cut: CutCoord,
        cfg: &MeshConfig,
        seeds: &dyn CutRandom,
    ) -> Result<Self, BuildError> {
        let t0 = Instant::now();
        let size = cfg.grid.cut_size;
        let origin = cut.origin(size);
        let breaks = BreakField::compute(field, origin, size)?;
        let mut chains = ChainArena::default();
        let mut parts = PartStore::new(size);
        let mut counts = ClassCounts::default();

        for j in 0..size as i32 {
            for i in 0..size as i32 {
                let local = GridCoord::new(i, j);
                let world = origin.offset(i, j);
                let flags = breaks.flags(world).ok_or_else(|| {
                    BuildError::Invariant(format!("break field misses tile ({}, {})", world.x, world.y))
                })?;
                if flags.is_empty() {
                    counts.flat += 1;
                    continue;
                }
                let threshold = field.tile_kind(world)?.break_threshold().unwrap_or(0);
                let mut heights = [0i32; 4];
                for (h, c) in heights.iter_mut().zip(world.tile_corners()) {
                    *h = field.elevation(c)?;
                }
                let class = classify(flags, heights, threshold);
                counts.record(class);

                let mut edges = [None; 4];
                for d in flags.dirs() {
                    edges[d.index()] =
                        Some(chains.get_or_build(field, EdgeId::of_tile(world, d), seeds, cfg)?);
                }
                let frame = TileFrame {
                    local,
                    world,
                    heights,
                    edges,
                    chains: &chains,
                    tile_size: cfg.grid.tile_size,
                };
                let (geom, fallback) = match build_tile(&frame, class) {
                    Ok(g) => (g, false),
                    Err(BuildError::Degenerate { tile, reason }) => {
                        log::warn!(
                            "flat fallback for {} tile ({}, {}): {}",
                            class.name(),
                            tile.x,
                            tile.y,
                            reason
                        );
                        counts.fallback += 1;
                        (flat_geometry(&frame), true)
                    }
                    Err(e) => return Err(e),
                };
                parts.insert(local, class, geom, fallback)?;
            }
        }

        log::debug!(
            target: "perf",
            "ms={} ridge_cut cut=({}, {}) ridged={} chains={} fallback={}",
            t0.elapsed().as_millis(),
            cut.cx,
            cut.cy,
            counts.ridged(),
            chains.len(),
            counts.fallback
        );
        Ok(Self {
            cut,
            origin,
            size,
            breaks,
            chains,
            parts,
            counts,
        })
    }

    /// Whether any edge of `tile` is broken. Tiles outside the cut report false.
    #[inline]
    pub fn is_broken(&self, tile: GridCoord) -> bool {
        self.breaks.is_broken(tile)
    }

    /// Lateral seam offset of the chain on `dir` of `tile`, as a fraction of the tile
    /// size along the edge. Zero for unbroken edges.
    pub fn edge_offset(&self, tile: GridCoord, dir: Dir, high: bool) -> f32 {
        self.chains
            .lookup(EdgeId::of_tile(tile, dir))
            .map_or(0.0, |c| c.offset(high))
    }

    pub fn bounds(&self) -> Option<Aabb> {
        let ground = self.parts.ground_parts().iter().flat_map(|p| p.verts.iter().copied());
        let ridges = self
            .parts
            .ridge_parts()
            .iter()
            .flat_map(|p| p.mesh.verts.iter().copied());
        Aabb::from_points(ground.chain(ridges))
    }

    /// Pushes every stored fragment into `sink`.
    pub fn emit<S: MeshSink + ?Sized>(&self, sink: &mut S, cfg: &MeshConfig) {
        let mats = &cfg.materials;
        for (local, rec) in self.parts.tiles() {
            if let Some(g) = self.parts.ground(local) {
                emit_ground(sink, mats.ground, g);
            }
            if rec.ridge.is_some() {
                if let Some(r) = self.parts.ridge(local) {
                    emit_ridge(sink, mats.ridge, r, cfg.ridge.texture_height);
                }
            }
        }
    }

    /// Collects the cut's fragments into per-material buffers.
    pub fn to_cpu_mesh(&self, cfg: &MeshConfig) -> CutMeshCpu {
        let mut parts: HashMap<MaterialTag, MeshBuild> = HashMap::new();
        self.emit(&mut parts, cfg);
        CutMeshCpu {
            cut: self.cut,
            bbox: self.bounds(),
            parts,
        }
    }
}

/// Ground fragment with planar uvs.
pub fn emit_ground<S: MeshSink + ?Sized>(sink: &mut S, material: MaterialTag, part: &MeshPart) {
    let verts: Vec<MeshVertex> = part
        .verts
        .iter()
        .zip(&part.uvs)
        .map(|(&p, &uv)| MeshVertex::new(p, uv, Vec2::ZERO))
        .collect();
    sink.add_triangles(material, &verts, &part.faces);
}

/// Ridge fragment with repeat-scaled uvs and the raw ridge (u, v) in `aux`.
pub fn emit_ridge<S: MeshSink + ?Sized>(
    sink: &mut S,
    material: MaterialTag,
    part: &RidgePart,
    texture_height: f32,
) {
    let verts: Vec<MeshVertex> = (0..part.mesh.verts.len())
        .map(|i| {
            MeshVertex::new(
                part.mesh.verts[i],
                part.texture_uv(i, texture_height),
                Vec2::new(part.ridge_u[i], part.normalized_v(i)),
            )
        })
        .collect();
    sink.add_triangles(material, &verts, &part.mesh.faces);
}

/// Per-material CPU buffers of one cut.
pub struct CutMeshCpu {
    pub cut: CutCoord,
    pub bbox: Option<Aabb>,
    pub parts: HashMap<MaterialTag, MeshBuild>,
}
