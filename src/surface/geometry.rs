// Procedural shards.
// A shard is a small random polygon around the strike point. Vertices are kept
// as percentages of the surface so the CSS clip-path survives a resize.

use std::f64::consts::TAU;
use std::fmt::Write as _;

use crate::config::{MAX_VERTICES, ShardConfig};
use crate::rng::RandomSource;

#[derive(Clone, Debug, PartialEq)]
pub struct Shard {
    pub id: u64,
    /// `(x%, y%)` pairs in `[0, 100]`.
    pub vertices: Vec<(f64, f64)>,
    pub fly_x: f64,
    pub fly_y: f64,
    /// Degrees.
    pub rotation: f64,
}

impl Shard {
    /// CSS `clip-path` value, e.g. `polygon(10.00% 20.00%, ...)`.
    pub fn clip_path(&self) -> String {
        let mut out = String::from("polygon(");
        for (i, (x, y)) in self.vertices.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{x:.2}% {y:.2}%");
        }
        out.push(')');
        out
    }

    /// CSS transform for the end of the exit animation.
    pub fn exit_transform(&self) -> String {
        format!(
            "translate({:.1}px, {:.1}px) rotate({:.1}deg)",
            self.fly_x, self.fly_y, self.rotation
        )
    }

    /// Vertices mapped back to pixels for a surface of the given size.
    pub fn vertex_px(&self, width: f64, height: f64) -> Vec<(f64, f64)> {
        self.vertices
            .iter()
            .map(|&(x, y)| (x / 100.0 * width, y / 100.0 * height))
            .collect()
    }
}

fn percent(v: f64, extent: f64) -> f64 {
    if extent > 0.0 { v / extent * 100.0 } else { 0.0 }
}

pub fn generate_shard<R: RandomSource + ?Sized>(
    rng: &mut R,
    id: u64,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    cfg: &ShardConfig,
) -> Shard {
    let width = width.max(0.0);
    let height = height.max(0.0);
    let min = cfg.min_vertices.clamp(3, MAX_VERTICES);
    let max = cfg.max_vertices.clamp(min, MAX_VERTICES);
    let count = (min + rng.pick((max - min + 1) as usize) as u32) as usize;
    let radius = rng.range(cfg.min_radius, cfg.max_radius);

    let vertices = (0..count)
        .map(|i| {
            let angle = i as f64 / count as f64 * TAU + rng.symmetric(cfg.angle_jitter);
            let vx = (x + angle.cos() * radius).clamp(0.0, width);
            let vy = (y + angle.sin() * radius).clamp(0.0, height);
            (percent(vx, width), percent(vy, height))
        })
        .collect();

    Shard {
        id,
        vertices,
        fly_x: rng.symmetric(cfg.fly_range),
        fly_y: rng.symmetric(cfg.fly_range),
        rotation: rng.symmetric(cfg.rotation_range),
    }
}
