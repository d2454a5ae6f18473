use proptest::prelude::*;
use terrace_geom::Vec3;
use terrace_map::{CutCoord, Dir, GridCoord, HeightGrid, MeshConfig, TileKind, WorldSeed};
use terrace_mesh_cpu::connect::arc_params;
use terrace_mesh_cpu::{BreakField, RidgeCut, classify, stitch};

const N: usize = 6;

fn grid(heights: &[i32], thresholds: &[i32]) -> HeightGrid {
    HeightGrid::from_fn(
        GridCoord::new(0, 0),
        N,
        N,
        |c| heights[c.y as usize * (N + 1) + c.x as usize],
        |t| {
            let thr = thresholds[t.y as usize * N + t.x as usize];
            if thr < 0 {
                TileKind::Plain
            } else {
                TileKind::Ridge { break_threshold: thr }
            }
        },
    )
}

fn polyline(n: usize, seed: u32) -> Vec<Vec3> {
    (0..n)
        .map(|k| {
            let j = ((seed.wrapping_mul(2_654_435_761).wrapping_add(k as u32 * 97)) % 13) as f32;
            Vec3::new(0.0, j * 0.1, k as f32 * 3.0 + j * 0.05)
        })
        .collect()
}

proptest! {
    #[test]
    fn stitch_emits_n_plus_m_minus_two(n in 1usize..24, m in 1usize..24, s in any::<u32>()) {
        prop_assume!(n + m >= 3);
        let faces = stitch(&arc_params(&polyline(n, s)), &arc_params(&polyline(m, s ^ 0xabcd)));
        prop_assert_eq!(faces.len(), n + m - 2);
        let mut used = vec![false; n + m];
        for f in &faces {
            for &i in f {
                prop_assert!((i as usize) < n + m);
                used[i as usize] = true;
            }
        }
        prop_assert!(used.into_iter().all(|u| u));
    }

    #[test]
    fn shared_edges_agree(
        heights in prop::collection::vec(0i32..80, (N + 1) * (N + 1)),
        thresholds in prop::collection::vec(-2i32..30, N * N),
    ) {
        let g = grid(&heights, &thresholds);
        let bf = BreakField::compute(&g, GridCoord::new(0, 0), N).unwrap();
        for y in 0..N as i32 {
            for x in 0..N as i32 {
                let t = GridCoord::new(x, y);
                let f = bf.flags(t).unwrap();
                for d in Dir::ALL {
                    let n = t.step(d);
                    if let Some(nf) = bf.flags(n) {
                        prop_assert_eq!(f.has(d), nf.has(d.opposite()));
                    }
                }
                let corners = t.tile_corners().map(|c| heights[c.y as usize * (N + 1) + c.x as usize]);
                prop_assert_eq!(classify(f, corners, 10), classify(f, corners, 10));
            }
        }
    }

    #[test]
    fn every_stored_part_is_valid(
        heights in prop::collection::vec(0i32..80, (N + 1) * (N + 1)),
        thresholds in prop::collection::vec(-2i32..30, N * N),
        seed in any::<u64>(),
    ) {
        let g = grid(&heights, &thresholds);
        let cfg = MeshConfig::from_toml_str("[grid]\ncut_size = 6").unwrap();
        let cut = RidgeCut::build(&g, CutCoord::new(0, 0), &cfg, &WorldSeed(seed)).unwrap();
        for (local, rec) in cut.parts.tiles() {
            prop_assert!(cut.parts.ground(local).unwrap().validate().is_ok());
            if let Some(r) = cut.parts.ridge(local) {
                prop_assert!(rec.ridge.is_some());
                prop_assert!(r.validate().is_ok());
            }
        }
        // default jitter keeps every seam apart, so no tile needs the flat fallback
        prop_assert_eq!(cut.counts.fallback, 0);
        let again = RidgeCut::build(&g, CutCoord::new(0, 0), &cfg, &WorldSeed(seed)).unwrap();
        prop_assert_eq!(cut.parts.ridge_parts(), again.parts.ridge_parts());
    }
}
