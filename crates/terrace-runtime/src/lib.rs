//! Background cut builds: worker lanes, revision tracking and the committed-output cache.
#![forbid(unsafe_code)]

mod chunk;
mod cut_cache;

pub use chunk::{BuildTimings, ChunkMeshes, build_chunk};
pub use cut_cache::{CutCache, CutCacheStats};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError, select, unbounded};
use hashbrown::HashMap;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use terrace_geom::Vec2;
use terrace_map::{CutCoord, CutRandom, Dir, GridCoord, HeightField, MeshConfig};
use terrace_mesh_cpu::BuildError;

#[derive(Clone, Copy, Debug)]
pub struct BuildJob {
    pub cut: CutCoord,
    pub rev: u64,
    pub job_id: u64,
    /// Number of earlier attempts that came back `Deferred`.
    pub attempt: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lane {
    Edit,
    Bg,
}

#[derive(Debug)]
pub struct JobOut {
    pub cut: CutCoord,
    pub rev: u64,
    pub job_id: u64,
    pub attempt: u32,
    pub lane: Lane,
    pub result: Result<Arc<ChunkMeshes>, BuildError>,
    pub t_total_ms: u32,
    pub timings: BuildTimings,
}

#[derive(Clone, Copy, Debug, Default)]
struct CutState {
    rev: u64,
    pending: bool,
}

fn process_build_job(
    job: BuildJob,
    lane: Lane,
    field: &dyn HeightField,
    cfg: &MeshConfig,
    seeds: &dyn CutRandom,
    tx: &Sender<JobOut>,
) {
    let t0 = Instant::now();
    let (result, timings) = match build_chunk(field, job.cut, job.rev, cfg, seeds) {
        Ok((meshes, timings)) => (Ok(Arc::new(meshes)), timings),
        Err(e) => (Err(e), BuildTimings::default()),
    };
    let t_total_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;
    let _ = tx.send(JobOut {
        cut: job.cut,
        rev: job.rev,
        job_id: job.job_id,
        attempt: job.attempt,
        lane,
        result,
        t_total_ms,
        timings,
    });
}

#[derive(Clone)]
struct WorkerCtx {
    field: Arc<dyn HeightField>,
    cfg: Arc<MeshConfig>,
    seeds: Arc<dyn CutRandom>,
    tx: Sender<JobOut>,
}

impl WorkerCtx {
    fn run(&self, job: BuildJob, lane: Lane, queued: &AtomicUsize, inflight: &AtomicUsize) {
        inflight.fetch_add(1, Ordering::Relaxed);
        queued.fetch_sub(1, Ordering::Relaxed);
        process_build_job(
            job,
            lane,
            self.field.as_ref(),
            self.cfg.as_ref(),
            self.seeds.as_ref(),
            &self.tx,
        );
        inflight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Schedules cut builds on background workers and commits finished outputs.
///
/// Every loaded cut carries a revision. A result is committed only if its
/// revision is still current and the cut is still loaded; `Deferred` builds are
/// queued again on the next [`Runtime::drain`].
pub struct Runtime {
    job_tx_edit: Sender<BuildJob>,
    job_tx_bg: Sender<BuildJob>,
    res_rx: Receiver<JobOut>,
    _edit_pool: Option<Arc<ThreadPool>>,
    bg_pool: Option<Arc<ThreadPool>>,
    q_edit: Arc<AtomicUsize>,
    q_bg: Arc<AtomicUsize>,
    inflight_edit: Arc<AtomicUsize>,
    inflight_bg: Arc<AtomicUsize>,
    pub w_edit: usize,
    pub w_bg: usize,
    cfg: Arc<MeshConfig>,
    cache: Arc<CutCache>,
    states: Mutex<HashMap<CutCoord, CutState>>,
    next_job_id: AtomicU64,
}

impl Runtime {
    pub fn new(
        field: Arc<dyn HeightField>,
        cfg: Arc<MeshConfig>,
        seeds: Arc<dyn CutRandom>,
    ) -> Result<Self, ThreadPoolBuildError> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        Self::with_workers(field, cfg, seeds, workers)
    }

    /// One worker serves the edit lane; the rest serve background builds and
    /// help with edits when idle.
    pub fn with_workers(
        field: Arc<dyn HeightField>,
        cfg: Arc<MeshConfig>,
        seeds: Arc<dyn CutRandom>,
        workers: usize,
    ) -> Result<Self, ThreadPoolBuildError> {
        let (job_tx_edit, job_rx_edit) = unbounded::<BuildJob>();
        let (job_tx_bg, job_rx_bg) = unbounded::<BuildJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();

        let w_edit = 1usize;
        let w_bg = workers.saturating_sub(w_edit);
        let cache = Arc::new(CutCache::new());

        let q_edit_ctr = Arc::new(AtomicUsize::new(0));
        let q_bg_ctr = Arc::new(AtomicUsize::new(0));
        let inflight_edit_ctr = Arc::new(AtomicUsize::new(0));
        let inflight_bg_ctr = Arc::new(AtomicUsize::new(0));

        let ctx = WorkerCtx {
            field,
            cfg: cfg.clone(),
            seeds,
            tx: res_tx,
        };

        let edit_pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(w_edit)
                .thread_name(|i| format!("terrace-edit-{i}"))
                .build()?,
        );
        for _ in 0..w_edit {
            let rx = job_rx_edit.clone();
            let ctx = ctx.clone();
            let q_edit = q_edit_ctr.clone();
            let inflight_edit = inflight_edit_ctr.clone();
            edit_pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    ctx.run(job, Lane::Edit, &q_edit, &inflight_edit);
                }
            });
        }

        let bg_pool = if w_bg > 0 {
            let pool = Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(w_bg)
                    .thread_name(|i| format!("terrace-bg-{i}"))
                    .build()?,
            );
            for _ in 0..w_bg {
                let bg_rx = job_rx_bg.clone();
                let edit_rx = job_rx_edit.clone();
                let ctx = ctx.clone();
                let q_bg = q_bg_ctr.clone();
                let q_edit = q_edit_ctr.clone();
                let inflight_bg = inflight_bg_ctr.clone();
                let inflight_edit = inflight_edit_ctr.clone();
                pool.spawn(move || {
                    loop {
                        // edits first, so invalidated cuts are rebuilt ahead of fresh loads
                        match edit_rx.try_recv() {
                            Ok(job) => {
                                ctx.run(job, Lane::Edit, &q_edit, &inflight_edit);
                                continue;
                            }
                            Err(TryRecvError::Disconnected) => break,
                            Err(TryRecvError::Empty) => {}
                        }
                        select! {
                            recv(bg_rx) -> res => match res {
                                Ok(job) => ctx.run(job, Lane::Bg, &q_bg, &inflight_bg),
                                Err(_) => break,
                            },
                            recv(edit_rx) -> res => match res {
                                Ok(job) => ctx.run(job, Lane::Edit, &q_edit, &inflight_edit),
                                Err(_) => break,
                            },
                        }
                    }
                });
            }
            Some(pool)
        } else {
            None
        };

        log::info!(
            target: "runtime",
            "runtime workers edit={} bg={} cut_size={}",
            w_edit,
            w_bg,
            cfg.grid.cut_size
        );

        Ok(Self {
            job_tx_edit,
            job_tx_bg,
            res_rx,
            _edit_pool: Some(edit_pool),
            bg_pool,
            q_edit: q_edit_ctr,
            q_bg: q_bg_ctr,
            inflight_edit: inflight_edit_ctr,
            inflight_bg: inflight_bg_ctr,
            w_edit,
            w_bg,
            cfg,
            cache,
            states: Mutex::new(HashMap::new()),
            next_job_id: AtomicU64::new(1),
        })
    }

    #[inline]
    pub fn config(&self) -> &MeshConfig {
        &self.cfg
    }

    pub fn cache(&self) -> Arc<CutCache> {
        Arc::clone(&self.cache)
    }

    fn submit_build_job_edit(&self, job: BuildJob) {
        self.q_edit.fetch_add(1, Ordering::Relaxed);
        if self.job_tx_edit.send(job).is_err() {
            self.q_edit.fetch_sub(1, Ordering::Relaxed);
        }
    }

    fn submit_build_job_bg(&self, job: BuildJob) {
        if self.bg_pool.is_some() {
            self.q_bg.fetch_add(1, Ordering::Relaxed);
            if self.job_tx_bg.send(job).is_err() {
                self.q_bg.fetch_sub(1, Ordering::Relaxed);
            }
        } else {
            self.submit_build_job_edit(job);
        }
    }

    fn new_job(&self, cut: CutCoord, rev: u64) -> BuildJob {
        BuildJob {
            cut,
            rev,
            job_id: self.next_job_id.fetch_add(1, Ordering::Relaxed),
            attempt: 0,
        }
    }

    /// Loads `cut` and queues a background build unless one is pending or its
    /// output is already committed. Returns whether a job was queued.
    pub fn request(&self, cut: CutCoord) -> bool {
        let job = {
            let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
            let st = states.entry(cut).or_default();
            if st.pending || self.cache.peek(cut).is_some_and(|m| m.rev == st.rev) {
                return false;
            }
            st.pending = true;
            self.new_job(cut, st.rev)
        };
        self.submit_build_job_bg(job);
        true
    }

    /// Marks the cut's map data as changed. Any in-flight build becomes stale
    /// and a rebuild is queued on the edit lane if the cut is loaded.
    pub fn invalidate(&self, cut: CutCoord) {
        let job = {
            let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
            let Some(st) = states.get_mut(&cut) else {
                return;
            };
            st.rev += 1;
            st.pending = true;
            self.new_job(cut, st.rev)
        };
        log::debug!(target: "events", "invalidate cut=({}, {}) rev={}", cut.cx, cut.cy, job.rev);
        self.submit_build_job_edit(job);
    }

    /// Invalidates every loaded cut whose build reads `corner`. Builds read
    /// heights beyond their own cut, so neighbours within the flow margin are
    /// affected too.
    pub fn invalidate_corner(&self, corner: GridCoord) {
        let size = self.cfg.grid.cut_size;
        let reach = (self.cfg.flow.margin.max(self.cfg.bottom.margin) + 2) as i32;
        let lo = CutCoord::containing(corner.offset(-reach, -reach), size);
        let hi = CutCoord::containing(corner.offset(reach, reach), size);
        for cy in lo.cy..=hi.cy {
            for cx in lo.cx..=hi.cx {
                self.invalidate(CutCoord::new(cx, cy));
            }
        }
    }

    /// Forgets the cut. Late results for it are discarded.
    pub fn unload(&self, cut: CutCoord) {
        let removed = {
            let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
            states.remove(&cut).is_some()
        };
        if removed {
            self.cache.remove(&cut);
        }
    }

    pub fn is_loaded(&self, cut: CutCoord) -> bool {
        self.states
            .lock()
            .map(|s| s.contains_key(&cut))
            .unwrap_or(false)
    }

    /// The committed output for the cut's current revision.
    pub fn meshes(&self, cut: CutCoord) -> Option<Arc<ChunkMeshes>> {
        let rev = self.states.lock().ok()?.get(&cut)?.rev;
        self.cache.get(cut, rev)
    }

    /// Collects finished builds. Current results are committed to the cache;
    /// stale or unloaded ones are dropped; deferred ones are queued again.
    /// Returns the outputs that reached a final state on this pass.
    pub fn drain(&self) -> Vec<JobOut> {
        let mut finished = Vec::new();
        let mut retry = Vec::new();
        {
            let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
            for out in self.res_rx.try_iter() {
                let Some(st) = states.get_mut(&out.cut) else {
                    log::debug!(
                        target: "events",
                        "drop result cut=({}, {}) job={} reason=unloaded",
                        out.cut.cx,
                        out.cut.cy,
                        out.job_id
                    );
                    continue;
                };
                if st.rev != out.rev {
                    log::debug!(
                        target: "events",
                        "drop result cut=({}, {}) job={} rev={} current={} reason=stale",
                        out.cut.cx,
                        out.cut.cy,
                        out.job_id,
                        out.rev,
                        st.rev
                    );
                    continue;
                }
                match &out.result {
                    Ok(meshes) => {
                        st.pending = false;
                        self.cache.insert(Arc::clone(meshes));
                        log::debug!(
                            target: "perf",
                            "ms={} cut_build cut=({}, {}) fetch={} ridge={} water={} lane={:?}",
                            out.t_total_ms,
                            out.cut.cx,
                            out.cut.cy,
                            out.timings.fetch_ms,
                            out.timings.ridge_ms,
                            out.timings.water_ms,
                            out.lane
                        );
                        finished.push(out);
                    }
                    Err(BuildError::Deferred(d)) => {
                        log::debug!(
                            target: "events",
                            "deferred cut=({}, {}) at=({}, {}) attempt={}",
                            out.cut.cx,
                            out.cut.cy,
                            d.at.x,
                            d.at.y,
                            out.attempt
                        );
                        retry.push(BuildJob {
                            cut: out.cut,
                            rev: out.rev,
                            job_id: self.next_job_id.fetch_add(1, Ordering::Relaxed),
                            attempt: out.attempt + 1,
                        });
                    }
                    Err(e) => {
                        st.pending = false;
                        log::error!(
                            target: "runtime",
                            "cut ({}, {}) rev={} failed: {}",
                            out.cut.cx,
                            out.cut.cy,
                            out.rev,
                            e
                        );
                        finished.push(out);
                    }
                }
            }
        }
        for job in retry {
            self.submit_build_job_bg(job);
        }
        finished
    }

    /// Queued and in-flight counts for the edit and background lanes.
    pub fn queue_debug_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.q_edit.load(Ordering::Relaxed),
            self.inflight_edit.load(Ordering::Relaxed),
            self.q_bg.load(Ordering::Relaxed),
            self.inflight_bg.load(Ordering::Relaxed),
        )
    }

    /// True when no loaded cut is waiting on a build.
    pub fn is_settled(&self) -> bool {
        self.states
            .lock()
            .map(|s| s.values().all(|st| !st.pending))
            .unwrap_or(false)
    }

    fn owning(&self, g: GridCoord) -> Option<Arc<ChunkMeshes>> {
        self.meshes(CutCoord::containing(g, self.cfg.grid.cut_size))
    }

    /// Whether `tile` has any broken edge. `None` until its cut has committed.
    pub fn is_broken(&self, tile: GridCoord) -> Option<bool> {
        self.owning(tile).map(|m| m.is_broken(tile))
    }

    /// Lateral offset of the chain end on `tile`'s `dir` edge.
    pub fn edge_offset(&self, tile: GridCoord, dir: Dir, high: bool) -> Option<f32> {
        self.owning(tile).map(|m| m.edge_offset(tile, dir, high))
    }

    pub fn bottom_depth(&self, corner: GridCoord) -> Option<f32> {
        self.owning(corner).and_then(|m| m.bottom_depth(corner))
    }

    pub fn flow_at(&self, corner: GridCoord) -> Option<Vec2> {
        self.owning(corner).and_then(|m| m.flow_at(corner))
    }
}
