use fastnoise_lite::{FastNoiseLite, NoiseType};
use terrace_map::{GridCoord, HeightGrid, TileKind};

#[derive(Clone, Debug)]
pub struct TerraceParams {
    pub seed: i32,
    /// Height of one terrace step; ridges appear where steps meet.
    pub step: i32,
    pub amplitude: f32,
    pub frequency: f32,
    /// Tiles whose corners all sit at or below this elevation become water.
    pub water_level: i32,
}

impl Default for TerraceParams {
    fn default() -> Self {
        Self {
            seed: 1337,
            step: 24,
            amplitude: 120.0,
            frequency: 0.035,
            water_level: 0,
        }
    }
}

struct Sampler {
    terrain: FastNoiseLite,
    rough: FastNoiseLite,
    depth: FastNoiseLite,
    p: TerraceParams,
}

impl Sampler {
    fn new(p: &TerraceParams) -> Self {
        let mut terrain = FastNoiseLite::with_seed(p.seed);
        terrain.set_noise_type(Some(NoiseType::OpenSimplex2));
        terrain.set_frequency(Some(p.frequency));
        let mut rough = FastNoiseLite::with_seed(p.seed ^ 99_173);
        rough.set_noise_type(Some(NoiseType::OpenSimplex2));
        rough.set_frequency(Some(p.frequency * 3.0));
        let mut depth = FastNoiseLite::with_seed(p.seed ^ 41_337);
        depth.set_noise_type(Some(NoiseType::OpenSimplex2));
        depth.set_frequency(Some(0.07));
        Self {
            terrain,
            rough,
            depth,
            p: p.clone(),
        }
    }

    fn height(&self, c: GridCoord) -> i32 {
        let n = self.terrain.get_noise_2d(c.x as f32, c.y as f32);
        let raw = n * self.p.amplitude;
        let step = self.p.step.max(1) as f32;
        // quantised into steps; below the water line the bed stays smooth
        if (raw as i32) <= self.p.water_level {
            raw.min(self.p.water_level as f32) as i32
        } else {
            ((raw / step).round() * step) as i32
        }
    }

    fn kind(&self, t: GridCoord) -> TileKind {
        let corners = t.tile_corners();
        if corners.iter().all(|&c| self.height(c) <= self.p.water_level) {
            let d = (self.depth.get_noise_2d(t.x as f32, t.y as f32) + 1.0) * 0.5;
            return TileKind::Water {
                depth: 2 + (d * 10.0) as i32,
            };
        }
        let r = self.rough.get_noise_2d(t.x as f32, t.y as f32);
        if r < -0.55 {
            TileKind::Plain
        } else {
            TileKind::Ridge {
                break_threshold: self.p.step / 2,
            }
        }
    }
}

/// Noise-driven terrace map of `tiles x tiles` tiles starting at the origin.
pub fn terrace_map(tiles: usize, p: &TerraceParams) -> HeightGrid {
    let s = Sampler::new(p);
    HeightGrid::from_fn(
        GridCoord::new(0, 0),
        tiles,
        tiles,
        |c| s.height(c),
        |t| s.kind(t),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrace_map::HeightField;

    #[test]
    fn land_heights_sit_on_terrace_steps() {
        let p = TerraceParams::default();
        let g = terrace_map(24, &p);
        for y in 0..=24 {
            for x in 0..=24 {
                let h = g.elevation(GridCoord::new(x, y)).unwrap();
                if h > p.water_level {
                    assert_eq!(h % p.step, 0);
                }
            }
        }
    }

    #[test]
    fn same_seed_same_map() {
        let p = TerraceParams::default();
        let (a, b) = (terrace_map(8, &p), terrace_map(8, &p));
        for y in 0..8 {
            for x in 0..8 {
                let t = GridCoord::new(x, y);
                assert_eq!(a.tile_kind(t).unwrap(), b.tile_kind(t).unwrap());
            }
        }
    }
}
