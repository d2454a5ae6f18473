//! Per-cut water geometry: surface, foam, sunken bottom and shoreline strips.

use std::time::Instant;

use terrace_geom::Vec2;
use terrace_map::{CutCoord, Dir, GridCoord, HeightField, MaterialTag, MeshConfig};
use terrace_mesh_cpu::ground::corner_positions;
use terrace_mesh_cpu::{BuildError, MeshPart, MeshSink, MeshVertex, flat_tile};

use crate::depth::{DepthField, DepthSummary};
use crate::flow::{FlowField, FlowSummary};
use crate::transition::{ShoreEdge, TransitionFace, inner_depths, select_handler};

/// Foam overlay; `flow` holds the velocity at each vertex.
#[derive(Clone, Debug)]
pub struct FoamPart {
    pub mesh: MeshPart,
    pub flow: Vec<Vec2>,
}

/// Sunken bottom; `depth` per vertex drives fog, `fog` is the tile's deepest point.
#[derive(Clone, Debug)]
pub struct BottomPart {
    pub mesh: MeshPart,
    pub depth: Vec<f32>,
    pub fog: f32,
}

#[derive(Clone, Debug)]
pub struct WaterTile {
    pub local: GridCoord,
    pub world: GridCoord,
    pub surface: MeshPart,
    pub foam: Option<FoamPart>,
    pub bottom: BottomPart,
    pub transitions: Vec<TransitionFace>,
}

/// Immutable water output of one cut.
#[derive(Clone, Debug)]
pub struct WaterCut {
    pub cut: CutCoord,
    pub origin: GridCoord,
    pub size: usize,
    pub tiles: Vec<WaterTile>,
    pub flow: FlowSummary,
    pub depth: DepthSummary,
}

impl WaterCut {
    pub fn build<F: HeightField + ?Sized>(
        field: &F,
        cut: CutCoord,
        cfg: &MeshConfig,
    ) -> Result<Self, BuildError> {
        let t0 = Instant::now();
        let size = cfg.grid.cut_size;
        let origin = cut.origin(size);
        let ts = cfg.grid.tile_size;

        // corners of the cut only see water within one tile of it
        let mut wet = false;
        'scan: for j in -1..=size as i32 {
            for i in -1..=size as i32 {
                if field.tile_kind(origin.offset(i, j))?.is_water() {
                    wet = true;
                    break 'scan;
                }
            }
        }
        if !wet {
            return Ok(Self {
                cut,
                origin,
                size,
                tiles: Vec::new(),
                flow: FlowSummary::still(origin, size),
                depth: DepthSummary::dry(origin, size),
            });
        }

        let flow = FlowField::solve(field, origin, size, &cfg.flow)?;
        let depth = DepthField::compute(field, origin, size, &cfg.bottom)?;
        let handler = select_handler(&cfg.materials);
        let mut tiles = Vec::new();

        for j in 0..size as i32 {
            for i in 0..size as i32 {
                let local = GridCoord::new(i, j);
                let world = origin.offset(i, j);
                if !field.tile_kind(world)?.is_water() {
                    continue;
                }
                let corners = world.tile_corners();
                let mut heights = [0i32; 4];
                for (h, c) in heights.iter_mut().zip(corners) {
                    *h = field.elevation(c)?;
                }
                let pos = corner_positions(world, heights, ts);
                let surface = flat_tile(local, world, pos, ts);

                let vel = corners.map(|c| flow.velocity(c));
                let foam = vel
                    .iter()
                    .any(|v| v.length() > cfg.flow.foam_epsilon)
                    .then(|| FoamPart {
                        mesh: flat_tile(local, world, pos, ts),
                        flow: vel.to_vec(),
                    });

                let depths = corners.map(|c| depth.depth(c).unwrap_or(0.0));
                let mut sunk = pos;
                for (p, d) in sunk.iter_mut().zip(depths) {
                    p.z -= d;
                }
                let bottom = BottomPart {
                    mesh: flat_tile(local, world, sunk, ts),
                    depth: depths.to_vec(),
                    fog: depths.iter().fold(0.0f32, |m, &d| m.max(d)),
                };

                let mut transitions = Vec::new();
                for d in Dir::ALL {
                    if field.tile_kind(world.step(d))?.is_water() {
                        continue;
                    }
                    let (a, b) = (d.index(), (d.index() + 1) % 4);
                    // corners across the tile from each shore end
                    let (fa, fb) = ((a + 3) % 4, (b + 1) % 4);
                    let edge = ShoreEdge {
                        local,
                        world,
                        dir: d,
                        ends: [pos[a], pos[b]],
                        inner_depth: inner_depths(depths[a], depths[b], depths[fa], depths[fb]),
                        tile_size: ts,
                    };
                    transitions.push(handler.build(&edge));
                }

                tiles.push(WaterTile {
                    local,
                    world,
                    surface,
                    foam,
                    bottom,
                    transitions,
                });
            }
        }

        let out = Self {
            cut,
            origin,
            size,
            tiles,
            flow: flow.freeze(origin, size),
            depth: depth.freeze(origin, size),
        };
        log::debug!(
            target: "perf",
            "ms={} water_cut cut=({}, {}) tiles={} foam={} max_speed={:.3}",
            t0.elapsed().as_millis(),
            cut.cx,
            cut.cy,
            out.tiles.len(),
            out.foam_tiles(),
            out.flow.max_speed()
        );
        Ok(out)
    }

    pub fn tile(&self, local: GridCoord) -> Option<&WaterTile> {
        self.tiles.iter().find(|t| t.local == local)
    }

    pub fn foam_tiles(&self) -> usize {
        self.tiles.iter().filter(|t| t.foam.is_some()).count()
    }

    pub fn emit<S: MeshSink + ?Sized>(&self, sink: &mut S, cfg: &MeshConfig) {
        let mats = &cfg.materials;
        for t in &self.tiles {
            emit_with(sink, mats.water, &t.surface, |_| Vec2::ZERO);
            if let Some(f) = &t.foam {
                emit_with(sink, mats.foam, &f.mesh, |i| f.flow[i]);
            }
            let b = &t.bottom;
            emit_with(sink, mats.bottom, &b.mesh, |i| Vec2::new(b.depth[i], b.fog));
            for tr in &t.transitions {
                emit_with(sink, tr.material, &tr.mesh, |i| Vec2::new(tr.alpha[i], 0.0));
            }
        }
    }
}

fn emit_with<S: MeshSink + ?Sized>(
    sink: &mut S,
    material: MaterialTag,
    part: &MeshPart,
    aux: impl Fn(usize) -> Vec2,
) {
    let verts: Vec<MeshVertex> = part
        .verts
        .iter()
        .zip(&part.uvs)
        .enumerate()
        .map(|(i, (&p, &uv))| MeshVertex::new(p, uv, aux(i)))
        .collect();
    sink.add_triangles(material, &verts, &part.faces);
}
