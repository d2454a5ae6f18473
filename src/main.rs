mod worldgen;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use hashbrown::HashMap;
use serde::Serialize;
use terrace_map::{CutCoord, HeightField, MeshConfig, WorldSeed};
use terrace_mesh_cpu::{ClassCounts, CountingSink};
use terrace_runtime::Runtime;

use worldgen::{TerraceParams, terrace_map};

#[derive(Parser, Debug)]
#[command(name = "terrace")]
#[command(about = "Builds ridge and water meshes for a synthetic terrace map", long_about = None)]
struct Args {
    /// Mesher configuration (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Cuts per side of the square map
    #[arg(long, default_value_t = 4)]
    cuts: usize,
    /// Overrides the configured world seed
    #[arg(long)]
    seed: Option<u64>,
    /// Corners at or below this elevation are submerged
    #[arg(long, default_value_t = 0)]
    water_level: i32,
    /// Terrace step height
    #[arg(long, default_value_t = 24)]
    step: i32,
    /// Worker threads; all cores when omitted
    #[arg(long)]
    workers: Option<usize>,
    /// Writes a TOML summary of the build here
    #[arg(long)]
    report: Option<PathBuf>,
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

#[derive(Serialize, Default)]
struct Report {
    seed: u64,
    cuts: usize,
    failed: usize,
    build_ms: u64,
    foam_tiles: usize,
    triangles: usize,
    triangles_per_material: Vec<(u16, usize)>,
    classes: ClassReport,
}

#[derive(Serialize, Default)]
struct ClassReport {
    flat: usize,
    end: usize,
    straight: usize,
    diagonal_adjacent: usize,
    diagonal_through: usize,
    complex: usize,
    fallback: usize,
}

impl From<ClassCounts> for ClassReport {
    fn from(c: ClassCounts) -> Self {
        Self {
            flat: c.flat,
            end: c.end,
            straight: c.straight,
            diagonal_adjacent: c.diagonal_adjacent,
            diagonal_through: c.diagonal_through,
            complex: c.complex,
            fallback: c.fallback,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => MeshConfig::from_path(path)?,
        None => MeshConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    let cut_size = cfg.grid.cut_size;
    let tiles = args.cuts * cut_size;
    log::info!(
        "terrace map {}x{} tiles, cut_size={} seed={}",
        tiles,
        tiles,
        cut_size,
        cfg.seed
    );

    let params = TerraceParams {
        seed: cfg.seed as i32,
        step: args.step,
        water_level: args.water_level,
        ..TerraceParams::default()
    };
    let field: Arc<dyn HeightField> = Arc::new(terrace_map(tiles, &params));
    let seeds = Arc::new(WorldSeed(cfg.seed));
    let cfg = Arc::new(cfg);
    let rt = match args.workers {
        Some(n) => Runtime::with_workers(field, cfg.clone(), seeds, n.max(1))?,
        None => Runtime::new(field, cfg.clone(), seeds)?,
    };

    let t0 = Instant::now();
    let cuts: Vec<CutCoord> = (0..args.cuts as i32)
        .flat_map(|cy| (0..args.cuts as i32).map(move |cx| CutCoord::new(cx, cy)))
        .collect();
    for &cut in &cuts {
        rt.request(cut);
    }

    let deadline = t0 + Duration::from_secs(args.timeout_secs);
    let mut failed = 0usize;
    loop {
        for out in rt.drain() {
            if out.result.is_err() {
                failed += 1;
            }
        }
        if rt.is_settled() {
            break;
        }
        if Instant::now() > deadline {
            let (qe, ie, qb, ib) = rt.queue_debug_counts();
            log::warn!("timed out; edit q={} inflight={} bg q={} inflight={}", qe, ie, qb, ib);
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    let build_ms = t0.elapsed().as_millis() as u64;

    let mut classes = ClassCounts::default();
    let mut sink = CountingSink::default();
    let mut foam_tiles = 0usize;
    for &cut in &cuts {
        let Some(meshes) = rt.meshes(cut) else {
            continue;
        };
        classes.merge(&meshes.ridges.counts);
        foam_tiles += meshes.water.foam_tiles();
        meshes.emit(&mut sink, &cfg);
    }

    let mut per_material: HashMap<u16, usize> = HashMap::new();
    for (tag, n) in &sink.per_material {
        *per_material.entry(tag.0).or_default() += n;
    }
    let mut per_material: Vec<(u16, usize)> = per_material.into_iter().collect();
    per_material.sort_unstable();

    log::info!(
        "built {} cuts in {} ms ({} failed)",
        cuts.len(),
        build_ms,
        failed
    );
    log::info!(
        "classes flat={} end={} straight={} diag_adj={} diag_through={} complex={} fallback={}",
        classes.flat,
        classes.end,
        classes.straight,
        classes.diagonal_adjacent,
        classes.diagonal_through,
        classes.complex,
        classes.fallback
    );
    log::info!(
        "mesh vertices={} triangles={} foam_tiles={}",
        sink.vertices,
        sink.triangles,
        foam_tiles
    );
    for (tag, n) in &per_material {
        log::info!("  material {} -> {} triangles", tag, n);
    }
    let stats = rt.cache().stats();
    log::debug!(
        target: "runtime",
        "cache entries={} hits={} misses={} removals={}",
        stats.entries,
        stats.hits,
        stats.misses,
        stats.removals
    );

    if let Some(path) = &args.report {
        let report = Report {
            seed: cfg.seed,
            cuts: cuts.len(),
            failed,
            build_ms,
            foam_tiles,
            triangles: sink.triangles,
            triangles_per_material: per_material,
            classes: classes.into(),
        };
        std::fs::write(path, toml::to_string(&report)?)?;
        log::info!("report written to {}", path.display());
    }
    Ok(())
}
