//! Surface-current relaxation over corners touching water.

use std::time::Instant;

use terrace_geom::Vec2;
use terrace_map::config::Flow;
use terrace_map::{Deferred, Dir, GridCoord, HeightField};

const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Unit directions toward the eight neighbours, with their grid offsets.
const COMPASS: [(i32, i32, Vec2); 8] = [
    (0, -1, Vec2 { x: 0.0, y: -1.0 }),
    (1, -1, Vec2 { x: DIAG, y: -DIAG }),
    (1, 0, Vec2 { x: 1.0, y: 0.0 }),
    (1, 1, Vec2 { x: DIAG, y: DIAG }),
    (0, 1, Vec2 { x: 0.0, y: 1.0 }),
    (-1, 1, Vec2 { x: -DIAG, y: DIAG }),
    (-1, 0, Vec2 { x: -1.0, y: 0.0 }),
    (-1, -1, Vec2 { x: -DIAG, y: -DIAG }),
];

/// Velocity per corner over a cut plus margin. Corners that touch no water tile
/// stay exactly zero.
#[derive(Clone, Debug)]
pub struct FlowField {
    min: GridCoord,
    w: usize,
    h: usize,
    domain: Vec<bool>,
    heights: Vec<i32>,
    slope: Vec<Vec2>,
    vel: Vec<Vec2>,
    seed_max: f32,
}

impl FlowField {
    /// Seeds and relaxes the field over the corners of `size * size` tiles at
    /// `origin`, grown by `cfg.margin` corners per side.
    pub fn solve<F: HeightField + ?Sized>(
        field: &F,
        origin: GridCoord,
        size: usize,
        cfg: &Flow,
    ) -> Result<Self, Deferred> {
        let t0 = Instant::now();
        let m = cfg.margin as i32;
        let min = origin.offset(-m, -m);
        let w = size + 1 + 2 * cfg.margin;
        let h = w;
        let mut domain = vec![false; w * h];
        let mut heights = vec![0i32; w * h];
        for j in 0..h {
            for i in 0..w {
                let c = min.offset(i as i32, j as i32);
                let mut wet = false;
                for t in c.corner_tiles() {
                    if field.tile_kind(t)?.is_water() {
                        wet = true;
                        break;
                    }
                }
                domain[j * w + i] = wet;
                if wet {
                    heights[j * w + i] = field.elevation(c)?;
                }
            }
        }
        let mut ff = Self {
            min,
            w,
            h,
            domain,
            heights,
            slope: vec![Vec2::ZERO; w * h],
            vel: vec![Vec2::ZERO; w * h],
            seed_max: 0.0,
        };
        ff.seed(cfg.slope_max);
        for _ in 0..cfg.passes {
            ff.advect();
            ff.project(cfg.pressure_fraction);
        }
        log::debug!(
            target: "perf",
            "ms={} flow_solve origin=({}, {}) corners={} wet={} seed_max={:.3}",
            t0.elapsed().as_millis(),
            origin.x,
            origin.y,
            w * h,
            ff.domain.iter().filter(|&&d| d).count(),
            ff.seed_max
        );
        Ok(ff)
    }

    #[inline]
    fn index(&self, i: i32, j: i32) -> Option<usize> {
        if i < 0 || j < 0 || i as usize >= self.w || j as usize >= self.h {
            return None;
        }
        let k = j as usize * self.w + i as usize;
        self.domain[k].then_some(k)
    }

    fn seed(&mut self, slope_max: f32) {
        let mut max = 0.0f32;
        for j in 0..self.h as i32 {
            for i in 0..self.w as i32 {
                let Some(k) = self.index(i, j) else { continue };
                let mut s = Vec2::ZERO;
                for d in Dir::ALL {
                    let (dx, dy) = d.delta();
                    if let Some(n) = self.index(i + dx, j + dy) {
                        // points downhill, toward the lower neighbour
                        let drop = (i64::from(self.heights[k]) - i64::from(self.heights[n])) as f32;
                        s += Vec2::new(dx as f32, dy as f32) * drop;
                    }
                }
                let s = s.clamp_length(slope_max);
                max = max.max(s.length());
                self.slope[k] = s;
            }
        }
        self.seed_max = max;
    }

    fn advect(&mut self) {
        for k in 0..self.vel.len() {
            if !self.domain[k] {
                continue;
            }
            let (v, s) = (self.vel[k], self.slope[k]);
            let cap = s.length().max(v.length());
            self.vel[k] = (v + s).clamp_length(cap);
        }
    }

    fn project(&mut self, fraction: f32) {
        let mut delta = vec![Vec2::ZERO; self.vel.len()];
        for j in 0..self.h as i32 {
            for i in 0..self.w as i32 {
                let Some(k) = self.index(i, j) else { continue };
                let v = self.vel[k];
                let mut pressure = 0.0f32;
                let mut count = 0usize;
                for &(dx, dy, dir) in &COMPASS {
                    if self.index(i + dx, j + dy).is_some() {
                        pressure += v.dot(dir);
                        count += 1;
                    }
                }
                if count == 0 {
                    continue;
                }
                let share = fraction * pressure / count as f32;
                for &(dx, dy, dir) in &COMPASS {
                    if let Some(n) = self.index(i + dx, j + dy) {
                        delta[n] += dir * share;
                    }
                }
            }
        }
        for k in 0..self.vel.len() {
            if self.domain[k] {
                self.vel[k] = (self.vel[k] + delta[k]).clamp_length(self.seed_max);
            }
        }
    }

    /// Velocity at `corner`; zero outside the wet domain or the solved region.
    pub fn velocity(&self, corner: GridCoord) -> Vec2 {
        self.index(corner.x - self.min.x, corner.y - self.min.y)
            .map_or(Vec2::ZERO, |k| self.vel[k])
    }

    #[inline]
    pub fn in_domain(&self, corner: GridCoord) -> bool {
        self.index(corner.x - self.min.x, corner.y - self.min.y).is_some()
    }

    /// Largest slope magnitude after seeding; no velocity ever exceeds it.
    #[inline]
    pub fn seed_max(&self) -> f32 {
        self.seed_max
    }

    pub fn max_speed(&self) -> f32 {
        self.vel.iter().fold(0.0, |m, v| m.max(v.length()))
    }

    /// Keeps only the corners of `size * size` tiles at `origin`.
    pub fn freeze(&self, origin: GridCoord, size: usize) -> FlowSummary {
        let mut vel = Vec::with_capacity((size + 1) * (size + 1));
        for j in 0..=size as i32 {
            for i in 0..=size as i32 {
                vel.push(self.velocity(origin.offset(i, j)));
            }
        }
        FlowSummary { origin, size, vel }
    }
}

/// Frozen velocities of a cut's corners.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowSummary {
    origin: GridCoord,
    size: usize,
    vel: Vec<Vec2>,
}

impl FlowSummary {
    /// A summary of still water everywhere.
    pub fn still(origin: GridCoord, size: usize) -> Self {
        Self {
            origin,
            size,
            vel: vec![Vec2::ZERO; (size + 1) * (size + 1)],
        }
    }

    /// Velocity at a corner of the cut; `None` for corners it does not own.
    pub fn at(&self, corner: GridCoord) -> Option<Vec2> {
        let i = corner.x - self.origin.x;
        let j = corner.y - self.origin.y;
        let n = self.size as i32;
        if i < 0 || j < 0 || i > n || j > n {
            return None;
        }
        Some(self.vel[(j * (n + 1) + i) as usize])
    }

    pub fn max_speed(&self) -> f32 {
        self.vel.iter().fold(0.0, |m, v| m.max(v.length()))
    }
}
