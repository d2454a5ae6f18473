use terrace_geom::Vec2;
use terrace_map::{CutCoord, GridCoord, HeightGrid, MaterialTag, MeshConfig, TileKind};
use terrace_mesh_cpu::CountingSink;
use terrace_water::WaterCut;

fn cfg(extra: &str) -> MeshConfig {
    MeshConfig::from_toml_str(extra).unwrap()
}

fn lake() -> HeightGrid {
    HeightGrid::from_fn(
        GridCoord::new(0, 0),
        8,
        8,
        |c| if c.x >= 4 { 0 } else { 3 },
        |t| {
            if (2..6).contains(&t.x) && (2..6).contains(&t.y) {
                TileKind::Water { depth: 10 }
            } else {
                TileKind::Plain
            }
        },
    )
}

#[test]
fn still_flat_water_has_no_foam() {
    let g = HeightGrid::filled(GridCoord::new(0, 0), 4, 4, 0, TileKind::Water { depth: 6 });
    let cfg = cfg("[grid]\ncut_size = 4");
    let w = WaterCut::build(&g, CutCoord::new(0, 0), &cfg).unwrap();
    assert_eq!(w.tiles.len(), 16);
    assert_eq!(w.foam_tiles(), 0);
    for j in 0..=4 {
        for i in 0..=4 {
            assert_eq!(w.flow.at(GridCoord::new(i, j)), Some(Vec2::ZERO));
        }
    }
}

#[test]
fn dry_cut_short_circuits() {
    let g = HeightGrid::filled(GridCoord::new(0, 0), 16, 16, 5, TileKind::Plain);
    let w = WaterCut::build(&g, CutCoord::new(0, 0), &cfg("[grid]\ncut_size = 4")).unwrap();
    assert!(w.tiles.is_empty());
    assert_eq!(w.depth.at(GridCoord::new(2, 2)), Some(0.0));
}

#[test]
fn sloped_lake_builds_foam_and_sunken_bottom() {
    let cfg = cfg("[grid]\ncut_size = 8");
    let w = WaterCut::build(&lake(), CutCoord::new(0, 0), &cfg).unwrap();
    assert_eq!(w.tiles.len(), 16);
    assert!(w.foam_tiles() > 0);
    let t = w.tile(GridCoord::new(3, 3)).unwrap();
    for (s, b) in t.surface.verts.iter().zip(&t.bottom.mesh.verts) {
        assert!(b.z <= s.z);
    }
    // corner (2,2) touches land
    assert_eq!(w.depth.at(GridCoord::new(2, 2)), Some(0.0));
    assert!(w.depth.at(GridCoord::new(4, 4)).unwrap() > 0.0);
    assert!(t.transitions.is_empty());
    let shore = w.tile(GridCoord::new(2, 3)).unwrap();
    assert_eq!(shore.transitions.len(), 1);
    assert_eq!(shore.transitions[0].material, cfg.materials.ground_transition);
}

#[test]
fn bottom_material_handler_takes_transitions() {
    let cfg = cfg("[grid]\ncut_size = 8\n[materials]\nbottom_transition = 12");
    let w = WaterCut::build(&lake(), CutCoord::new(0, 0), &cfg).unwrap();
    let corner = w.tile(GridCoord::new(2, 2)).unwrap();
    assert_eq!(corner.transitions.len(), 2);
    assert!(corner.transitions.iter().all(|t| t.material == MaterialTag(12)));
    let mut sink = CountingSink::default();
    w.emit(&mut sink, &cfg);
    assert!(sink.per_material[&MaterialTag(12)] > 0);
    assert_eq!(sink.per_material[&cfg.materials.water], 32);
    assert!(!sink.per_material.contains_key(&cfg.materials.ground_transition));
}
