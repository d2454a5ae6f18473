use std::time::Instant;

use terrace_geom::Vec2;
use terrace_map::{CutCoord, CutRandom, Dir, GridCoord, HeightField, MapWindow, MeshConfig};
use terrace_mesh_cpu::{BuildError, CutMeshCpu, MeshBuild, MeshSink, RidgeCut};
use terrace_water::WaterCut;

/// Everything built for one cut, frozen once the build commits.
#[derive(Clone, Debug)]
pub struct ChunkMeshes {
    pub cut: CutCoord,
    pub rev: u64,
    pub ridges: RidgeCut,
    pub water: WaterCut,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BuildTimings {
    pub fetch_ms: u32,
    pub ridge_ms: u32,
    pub water_ms: u32,
}

#[inline]
fn ms_since(t: Instant) -> u32 {
    t.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

/// Builds a cut from a single height snapshot. Any `Deferred` surfaces while
/// fetching the snapshot, before any geometry exists.
pub fn build_chunk<F: HeightField + ?Sized>(
    field: &F,
    cut: CutCoord,
    rev: u64,
    cfg: &MeshConfig,
    seeds: &dyn CutRandom,
) -> Result<(ChunkMeshes, BuildTimings), BuildError> {
    let size = cfg.grid.cut_size;
    let margin = cfg.flow.margin.max(cfg.bottom.margin) + 1;

    let t0 = Instant::now();
    let window = MapWindow::fetch_around(field, cut.origin(size), size, margin)?;
    let fetch_ms = ms_since(t0);

    let t1 = Instant::now();
    let ridges = RidgeCut::build(&window, cut, cfg, seeds)?;
    let ridge_ms = ms_since(t1);

    let t2 = Instant::now();
    let water = WaterCut::build(&window, cut, cfg)?;
    let water_ms = ms_since(t2);

    Ok((
        ChunkMeshes {
            cut,
            rev,
            ridges,
            water,
        },
        BuildTimings {
            fetch_ms,
            ridge_ms,
            water_ms,
        },
    ))
}

impl ChunkMeshes {
    #[inline]
    pub fn is_broken(&self, tile: GridCoord) -> bool {
        self.ridges.is_broken(tile)
    }

    #[inline]
    pub fn edge_offset(&self, tile: GridCoord, dir: Dir, high: bool) -> f32 {
        self.ridges.edge_offset(tile, dir, high)
    }

    #[inline]
    pub fn bottom_depth(&self, corner: GridCoord) -> Option<f32> {
        self.water.depth.at(corner)
    }

    #[inline]
    pub fn flow_at(&self, corner: GridCoord) -> Option<Vec2> {
        self.water.flow.at(corner)
    }

    /// Pushes ridge, ground and water fragments into `sink`.
    pub fn emit<S: MeshSink + ?Sized>(&self, sink: &mut S, cfg: &MeshConfig) {
        self.ridges.emit(sink, cfg);
        self.water.emit(sink, cfg);
    }

    pub fn to_cpu_mesh(&self, cfg: &MeshConfig) -> CutMeshCpu {
        let mut cpu = self.ridges.to_cpu_mesh(cfg);
        self.water.emit(&mut cpu.parts, cfg);
        cpu
    }

    pub fn triangle_count(&self, cfg: &MeshConfig) -> usize {
        self.to_cpu_mesh(cfg)
            .parts
            .values()
            .map(MeshBuild::triangle_count)
            .sum()
    }
}
