use terrace_map::{CutCoord, Dir, EdgeId, GridCoord, HeightGrid, MeshConfig, TileKind, WorldSeed};
use terrace_mesh_cpu::{CountingSink, Diagonal, RidgeCut, TileClass};

fn ridge(t: i32) -> TileKind {
    TileKind::Ridge { break_threshold: t }
}

fn config(extra: &str) -> MeshConfig {
    MeshConfig::from_toml_str(extra).unwrap()
}

#[test]
fn single_drop_builds_one_end_ridge() {
    // corner (0,1) stands 50 above the rest; only the S edge of tile (0,0) breaks
    let g = HeightGrid::from_fn(
        GridCoord::new(0, 0),
        2,
        2,
        |c| if c == GridCoord::new(0, 1) { 50 } else { 0 },
        |_| ridge(10),
    );
    let cfg = config("[grid]\ncut_size = 2");
    let cut = RidgeCut::build(&g, CutCoord::new(0, 0), &cfg, &WorldSeed(1)).unwrap();

    let t = GridCoord::new(0, 0);
    let rec = cut.parts.record(t).unwrap();
    assert_eq!(rec.class, TileClass::End(Dir::South));
    assert!(!rec.fallback);
    assert_eq!(cut.chains.len(), 1);
    let chain = cut.chains.iter().next().unwrap();
    assert!(chain.segments() >= 2);

    let r = cut.parts.ridge(t).unwrap();
    let vs: Vec<f32> = (0..r.mesh.vertex_count()).map(|i| r.normalized_v(i)).collect();
    assert_eq!(vs.iter().cloned().fold(f32::INFINITY, f32::min), 0.0);
    assert_eq!(vs.iter().cloned().fold(f32::NEG_INFINITY, f32::max), 1.0);
    let low = (0..vs.len())
        .find(|&i| r.mesh.verts[i] == chain.low())
        .unwrap();
    assert_eq!(r.ridge_u[low], 0.0);
    assert_eq!(vs[low], 0.0);
    assert_eq!(r.mesh.triangle_count(), chain.points.len() - 1);
    assert!(cut.is_broken(t));
    assert!(!cut.is_broken(GridCoord::new(1, 0)));
}

#[test]
fn rebuild_is_bit_identical() {
    let g = HeightGrid::from_fn(
        GridCoord::new(-4, -4),
        16,
        16,
        |c| ((c.x * 7919 + c.y * 104_729).rem_euclid(97) / 8) * 9,
        |t| if (t.x + t.y) % 5 == 0 { TileKind::Plain } else { ridge(12) },
    );
    let cfg = config("[grid]\ncut_size = 8");
    let a = RidgeCut::build(&g, CutCoord::new(0, 0), &cfg, &WorldSeed(3)).unwrap();
    let b = RidgeCut::build(&g, CutCoord::new(0, 0), &cfg, &WorldSeed(3)).unwrap();
    assert_eq!(a.counts, b.counts);
    assert!(a.counts.ridged() > 0);
    assert_eq!(a.parts.ground_parts(), b.parts.ground_parts());
    assert_eq!(a.parts.ridge_parts(), b.parts.ridge_parts());
    for (c1, c2) in a.chains.iter().zip(b.chains.iter()) {
        assert_eq!(c1, c2);
    }
}

#[test]
fn border_edge_matches_across_cuts() {
    // a step running east-west: every tile in row 1 is a straight ridge
    let g = HeightGrid::from_fn(
        GridCoord::new(-8, -8),
        24,
        24,
        |c| if c.y >= 2 { 60 } else { 0 },
        |_| ridge(10),
    );
    let cfg = config("[grid]\ncut_size = 4");
    let west = RidgeCut::build(&g, CutCoord::new(0, 0), &cfg, &WorldSeed(11)).unwrap();
    let east = RidgeCut::build(&g, CutCoord::new(1, 0), &cfg, &WorldSeed(11)).unwrap();

    let e = EdgeId::of_tile(GridCoord::new(3, 1), Dir::East);
    assert_eq!(e, EdgeId::of_tile(GridCoord::new(4, 1), Dir::West));
    let a = west.chains.lookup(e).unwrap();
    let b = east.chains.lookup(e).unwrap();
    assert_eq!(a, b);
    for high in [false, true] {
        assert_eq!(
            west.edge_offset(GridCoord::new(3, 1), Dir::East, high),
            east.edge_offset(GridCoord::new(4, 1), Dir::West, high)
        );
    }
    assert_eq!(west.edge_offset(GridCoord::new(3, 0), Dir::East, true), 0.0);
    assert_eq!(
        west.parts.record(GridCoord::new(1, 1)).unwrap().class,
        TileClass::Straight(Dir::East)
    );
    assert_eq!(west.counts.fallback, 0);
}

#[test]
fn degenerate_tiles_fall_back_to_flat_quads() {
    // negative threshold breaks every interior edge, zero jitter collapses the chains
    let g = HeightGrid::filled(GridCoord::new(0, 0), 4, 4, 0, ridge(-1));
    let cfg = config(
        "[grid]\ncut_size = 4\n[ridge]\nlateral_jitter = 0.0\nbelly = 0.0\nheight_jitter = 0.0",
    );
    let cut = RidgeCut::build(&g, CutCoord::new(0, 0), &cfg, &WorldSeed(5)).unwrap();
    assert_eq!(cut.counts.fallback, 16);
    for (local, rec) in cut.parts.tiles() {
        assert!(rec.fallback);
        assert!(rec.ridge.is_none());
        assert_eq!(cut.parts.ground(local).unwrap().triangle_count(), 2);
    }
}

#[test]
fn emit_routes_materials() {
    let g = HeightGrid::from_fn(
        GridCoord::new(0, 0),
        8,
        8,
        |c| if c.x >= 4 { 40 } else { 0 },
        |_| ridge(10),
    );
    let cfg = config("[grid]\ncut_size = 8");
    let cut = RidgeCut::build(&g, CutCoord::new(0, 0), &cfg, &WorldSeed(2)).unwrap();
    let mut sink = CountingSink::default();
    cut.emit(&mut sink, &cfg);
    assert!(sink.per_material[&cfg.materials.ground] > 0);
    assert!(sink.per_material[&cfg.materials.ridge] > 0);
    let mesh = cut.to_cpu_mesh(&cfg);
    assert_eq!(
        mesh.parts[&cfg.materials.ridge].triangle_count(),
        sink.per_material[&cfg.materials.ridge]
    );
    assert!(mesh.bbox.unwrap().max.z >= 40.0);
}

/// Builds a 3x3 ridge map whose centre tile (1,1) has the given NW, NE, SE, SW
/// corner heights; every other corner sits at 0.
fn centre_tile(corners: [i32; 4]) -> RidgeCut {
    let centre = GridCoord::new(1, 1).tile_corners();
    let g = HeightGrid::from_fn(
        GridCoord::new(0, 0),
        3,
        3,
        |c| centre.iter().position(|&k| k == c).map_or(0, |i| corners[i]),
        |_| ridge(10),
    );
    let cfg = config("[grid]\ncut_size = 3");
    RidgeCut::build(&g, CutCoord::new(0, 0), &cfg, &WorldSeed(17)).unwrap()
}

#[test]
fn raised_corner_builds_diagonal_adjacent_ridge() {
    let cut = centre_tile([0, 0, 50, 0]);
    let t = GridCoord::new(1, 1);
    let rec = cut.parts.record(t).unwrap();
    assert_eq!(rec.class, TileClass::DiagonalAdjacent(Dir::East));
    assert!(!rec.fallback);
    let r = cut.parts.ridge(t).unwrap();
    assert_eq!(r.ridge_count(), 1);
    assert!(r.validate().is_ok());
    assert_eq!(cut.counts.fallback, 0);
}

#[test]
fn four_breaks_with_one_flat_diagonal_build_two_ridges() {
    // NW-SE stays level, NE and SW stand well apart
    let cut = centre_tile([0, 40, 0, 80]);
    let t = GridCoord::new(1, 1);
    let rec = cut.parts.record(t).unwrap();
    assert_eq!(rec.class, TileClass::DiagonalThrough(Diagonal::NwSe));
    assert!(!rec.fallback);
    let r = cut.parts.ridge(t).unwrap();
    assert_eq!(r.ridge_count(), 2);
    assert!(r.validate().is_ok());
    assert!(cut.parts.ground(t).unwrap().validate().is_ok());
}

#[test]
fn three_breaks_build_complex_tile_with_three_ridges() {
    // N, E and S edges drop; W stays level
    let cut = centre_tile([0, 50, 100, 0]);
    let t = GridCoord::new(1, 1);
    let rec = cut.parts.record(t).unwrap();
    assert_eq!(rec.class, TileClass::Complex);
    assert!(!rec.fallback);
    let r = cut.parts.ridge(t).unwrap();
    assert_eq!(r.ridge_count(), 3);
    assert!(r.validate().is_ok());
    assert!(cut.parts.ground(t).unwrap().validate().is_ok());
}
