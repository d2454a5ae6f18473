//! Smoothed water depth per corner.

use terrace_map::config::Bottom;
use terrace_map::{Deferred, Dir, GridCoord, HeightField};

/// Depth of every corner over a cut plus margin. Corners touching a non-water
/// tile are pinned at zero through every blur pass.
#[derive(Clone, Debug)]
pub struct DepthField {
    min: GridCoord,
    w: usize,
    depth: Vec<f32>,
}

impl DepthField {
    pub fn compute<F: HeightField + ?Sized>(
        field: &F,
        origin: GridCoord,
        size: usize,
        cfg: &Bottom,
    ) -> Result<Self, Deferred> {
        let m = cfg.margin as i32;
        let min = origin.offset(-m, -m);
        let w = size + 1 + 2 * cfg.margin;
        let mut raw = vec![0.0f32; w * w];
        for j in 0..w {
            for i in 0..w {
                let c = min.offset(i as i32, j as i32);
                let mut d = i32::MAX;
                for t in c.corner_tiles() {
                    match field.tile_kind(t)?.water_depth() {
                        Some(td) => d = d.min(td),
                        None => {
                            d = 0;
                            break;
                        }
                    }
                }
                raw[j * w + i] = d.max(0) as f32;
            }
        }
        let pinned: Vec<bool> = raw.iter().map(|&d| d == 0.0).collect();
        let mut depth = raw;
        let mut next = depth.clone();
        for _ in 0..cfg.passes {
            for j in 0..w {
                for i in 0..w {
                    let k = j * w + i;
                    if pinned[k] {
                        continue;
                    }
                    let mut sum = depth[k];
                    let mut n = 1.0f32;
                    for d in Dir::ALL {
                        let (dx, dy) = d.delta();
                        let (ni, nj) = (i as i32 + dx, j as i32 + dy);
                        if ni >= 0 && nj >= 0 && (ni as usize) < w && (nj as usize) < w {
                            sum += depth[nj as usize * w + ni as usize];
                            n += 1.0;
                        }
                    }
                    next[k] = sum / n;
                }
            }
            std::mem::swap(&mut depth, &mut next);
        }
        Ok(Self { min, w, depth })
    }

    pub fn depth(&self, corner: GridCoord) -> Option<f32> {
        let i = corner.x - self.min.x;
        let j = corner.y - self.min.y;
        if i < 0 || j < 0 || i as usize >= self.w || j as usize >= self.w {
            return None;
        }
        Some(self.depth[j as usize * self.w + i as usize])
    }

    /// Keeps only the corners of `size * size` tiles at `origin`.
    pub fn freeze(&self, origin: GridCoord, size: usize) -> DepthSummary {
        let mut depth = Vec::with_capacity((size + 1) * (size + 1));
        for j in 0..=size as i32 {
            for i in 0..=size as i32 {
                depth.push(self.depth(origin.offset(i, j)).unwrap_or(0.0));
            }
        }
        DepthSummary {
            origin,
            size,
            depth,
        }
    }
}

/// Frozen depths of a cut's corners.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthSummary {
    origin: GridCoord,
    size: usize,
    depth: Vec<f32>,
}

impl DepthSummary {
    pub fn dry(origin: GridCoord, size: usize) -> Self {
        Self {
            origin,
            size,
            depth: vec![0.0; (size + 1) * (size + 1)],
        }
    }

    pub fn at(&self, corner: GridCoord) -> Option<f32> {
        let i = corner.x - self.origin.x;
        let j = corner.y - self.origin.y;
        let n = self.size as i32;
        if i < 0 || j < 0 || i > n || j > n {
            return None;
        }
        Some(self.depth[(j * (n + 1) + i) as usize])
    }
}
