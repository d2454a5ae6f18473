use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use terrace_map::{CutCoord, GridCoord, GridRect, HeightField, HeightGrid, MeshConfig, TileKind, WorldSeed};
use terrace_runtime::{JobOut, Runtime};

fn config() -> Arc<MeshConfig> {
    Arc::new(
        MeshConfig::from_toml_str(
            "[grid]\ncut_size = 4\n[flow]\nmargin = 2\n[bottom]\nmargin = 2\n",
        )
        .unwrap(),
    )
}

fn ridge(t: i32) -> TileKind {
    TileKind::Ridge { break_threshold: t }
}

fn runtime(grid: &Arc<HeightGrid>) -> Runtime {
    let field: Arc<dyn HeightField> = grid.clone();
    Runtime::with_workers(field, config(), Arc::new(WorldSeed(9)), 3).unwrap()
}

fn settle(rt: &Runtime) -> Vec<JobOut> {
    let deadline = Instant::now() + Duration::from_secs(20);
    let mut out = Vec::new();
    loop {
        out.extend(rt.drain());
        if rt.is_settled() || Instant::now() > deadline {
            return out;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

fn all_cuts() -> Vec<CutCoord> {
    (0..2)
        .flat_map(|cy| (0..2).map(move |cx| CutCoord::new(cx, cy)))
        .collect()
}

#[test]
fn requested_cuts_commit_and_answer_queries() {
    // a 50-unit step along x = 4 makes tiles at x = 3 straight ridges
    let grid = Arc::new(HeightGrid::from_fn(
        GridCoord::new(0, 0),
        8,
        8,
        |c| if c.x >= 4 { 50 } else { 0 },
        |_| ridge(10),
    ));
    let rt = runtime(&grid);
    for cut in all_cuts() {
        assert!(rt.request(cut));
        assert!(!rt.request(cut));
    }
    let done = settle(&rt);
    assert_eq!(done.len(), 4);
    assert!(done.iter().all(|o| o.result.is_ok()));

    assert_eq!(rt.is_broken(GridCoord::new(3, 1)), Some(true));
    assert_eq!(rt.is_broken(GridCoord::new(6, 1)), Some(false));
    assert_eq!(rt.bottom_depth(GridCoord::new(5, 5)), Some(0.0));
    assert_eq!(rt.flow_at(GridCoord::new(5, 5)).map(|v| v.length()), Some(0.0));
    assert!(rt.edge_offset(GridCoord::new(3, 1), terrace_map::Dir::North, true).is_some());
    assert_eq!(rt.is_broken(GridCoord::new(20, 20)), None);

    // committed outputs are not rebuilt on a repeat request
    assert!(!rt.request(CutCoord::new(0, 0)));
}

#[test]
fn deferred_builds_retry_until_data_arrives() {
    let grid = Arc::new(HeightGrid::filled(GridCoord::new(0, 0), 8, 8, 0, ridge(10)));
    grid.set_resident(Some(GridRect::new(GridCoord::new(10, 10), GridCoord::new(11, 11))));
    let rt = runtime(&grid);
    let cut = CutCoord::new(0, 0);
    rt.request(cut);

    let until = Instant::now() + Duration::from_millis(50);
    while Instant::now() < until {
        assert!(rt.drain().is_empty());
        thread::sleep(Duration::from_millis(2));
    }
    assert!(rt.meshes(cut).is_none());
    assert!(!rt.is_settled());

    grid.set_resident(None);
    let done = settle(&rt);
    assert_eq!(done.len(), 1);
    assert!(done[0].attempt > 0);
    assert!(rt.meshes(cut).is_some());
}

#[test]
fn invalidation_rebuilds_with_new_heights() {
    let grid = Arc::new(HeightGrid::filled(GridCoord::new(0, 0), 8, 8, 0, ridge(10)));
    let rt = runtime(&grid);
    for cut in all_cuts() {
        rt.request(cut);
    }
    settle(&rt);
    let t = GridCoord::new(1, 1);
    assert_eq!(rt.is_broken(t), Some(false));

    grid.set_elevation(GridCoord::new(2, 2), 40);
    rt.invalidate_corner(GridCoord::new(2, 2));
    assert_eq!(rt.is_broken(t), None);
    settle(&rt);

    assert_eq!(rt.is_broken(t), Some(true));
    assert_eq!(rt.meshes(CutCoord::new(0, 0)).map(|m| m.rev), Some(1));
}

#[test]
fn unloaded_cuts_discard_late_results() {
    let grid = Arc::new(HeightGrid::filled(GridCoord::new(0, 0), 8, 8, 0, ridge(10)));
    let rt = runtime(&grid);
    let cut = CutCoord::new(1, 1);
    rt.request(cut);
    rt.unload(cut);
    assert!(!rt.is_loaded(cut));

    let deadline = Instant::now() + Duration::from_secs(20);
    while rt.queue_debug_counts() != (0, 0, 0, 0) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    for _ in 0..20 {
        assert!(rt.drain().is_empty());
        thread::sleep(Duration::from_millis(2));
    }
    assert!(rt.cache().peek(cut).is_none());
    assert_eq!(rt.cache().stats().entries, 0);
}

#[test]
fn every_loaded_cut_keeps_its_output() {
    // more cuts than any fixed cache bound would hold
    let cfg = Arc::new(
        MeshConfig::from_toml_str("[grid]\ncut_size = 1\n[flow]\nmargin = 0\n[bottom]\nmargin = 0\n")
            .unwrap(),
    );
    let grid = Arc::new(HeightGrid::from_fn(
        GridCoord::new(0, 0),
        36,
        36,
        |c| if c.x >= 18 { 40 } else { 0 },
        |_| ridge(10),
    ));
    let field: Arc<dyn HeightField> = grid.clone();
    let rt = Runtime::with_workers(field, cfg, Arc::new(WorldSeed(3)), 3).unwrap();
    let cuts: Vec<CutCoord> = (0..36)
        .flat_map(|cy| (0..36).map(move |cx| CutCoord::new(cx, cy)))
        .collect();
    for &cut in &cuts {
        rt.request(cut);
    }
    settle(&rt);
    assert!(rt.is_settled());

    for &cut in &cuts {
        assert!(rt.meshes(cut).is_some(), "cut ({}, {}) lost its output", cut.cx, cut.cy);
    }
    assert_eq!(rt.is_broken(GridCoord::new(0, 0)), Some(false));
    assert_eq!(rt.is_broken(GridCoord::new(17, 5)), Some(true));
    assert_eq!(rt.cache().stats().entries, cuts.len());
    assert_eq!(rt.cache().stats().removals, 0);
}
