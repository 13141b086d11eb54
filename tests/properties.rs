// Property tests for the procedural effects: any seed, any strike position.
#![cfg(not(target_arch = "wasm32"))]

use iron_house::config::{ParticleConfig, ShardConfig};
use iron_house::rng::{Lcg, RandomSource};
use iron_house::surface::geometry::generate_shard;
use iron_house::surface::narrative::stage_for_hits;
use iron_house::surface::particles::ParticleField;
use iron_house::{FractureSurface, SurfaceConfig};
use proptest::prelude::*;

proptest! {
    #[test]
    fn shard_vertices_stay_inside_surface(
        seed in any::<u32>(),
        width in 1.0f64..2_000.0,
        height in 1.0f64..2_000.0,
        fx in -0.2f64..1.2,
        fy in -0.2f64..1.2,
    ) {
        let mut rng = Lcg::new(seed);
        let cfg = ShardConfig::default();
        let shard = generate_shard(&mut rng, 1, fx * width, fy * height, width, height, &cfg);
        prop_assert!((3..=5).contains(&shard.vertices.len()));
        for (x, y) in shard.vertex_px(width, height) {
            prop_assert!(x >= -1e-9 && x <= width + 1e-9, "x {} outside 0..{}", x, width);
            prop_assert!(y >= -1e-9 && y <= height + 1e-9, "y {} outside 0..{}", y, height);
        }
        prop_assert!(shard.fly_x.abs() <= cfg.fly_range);
        prop_assert!(shard.fly_y.abs() <= cfg.fly_range);
        prop_assert!(shard.rotation.abs() <= cfg.rotation_range);
    }

    #[test]
    fn particle_life_strictly_decreases_until_removal(seed in any::<u32>(), frames in 1usize..120) {
        let cfg = ParticleConfig::default();
        let mut rng = Lcg::new(seed);
        let mut field = ParticleField::new();
        field.burst(&mut rng, 100.0, 100.0, &cfg);
        let mut prev_life = 1.0;
        for _ in 0..frames {
            field.step(&cfg);
            for p in field.iter() {
                prop_assert!(p.life > 0.0);
                prop_assert!(p.life < prev_life);
            }
            if let Some(p) = field.iter().next() {
                prev_life = p.life;
            }
        }
    }

    #[test]
    fn stage_is_pure_function_of_hits(hits in 0u32..1_000, per in 1u32..10, len in 1usize..10) {
        let stage = stage_for_hits(hits, per, len);
        prop_assert_eq!(stage, ((hits / per) as usize).min(len - 1));
        prop_assert_eq!(stage, stage_for_hits(hits, per, len));
    }

    #[test]
    fn hit_count_never_exceeds_threshold(seed in any::<u32>(), threshold in 1u32..40, clicks in 0u32..80) {
        let cfg = SurfaceConfig { threshold, ..SurfaceConfig::default() };
        let mut s = FractureSurface::new(cfg, Lcg::new(seed), 640.0, 360.0).unwrap();
        let mut rng = Lcg::new(seed ^ 0x5eed);
        let mut broke = 0;
        for i in 0..clicks {
            let x = rng.range(0.0, 640.0);
            let y = rng.range(0.0, 360.0);
            if let Some(strike) = s.strike(x, y, i as f64 * 50.0) {
                if strike.broke {
                    broke += 1;
                }
            }
        }
        prop_assert_eq!(s.hits(), clicks.min(threshold));
        prop_assert_eq!(broke, u32::from(clicks >= threshold));
    }
}
