//! Lightning-style cracks radiating from a strike point.
//!
//! Each crack is a straight line refined by midpoint displacement: the
//! midpoint is nudged by a random offset, both halves are refined again with
//! the offset divided by `roughness`, until the offset falls below `detail`
//! or the path has been split `MAX_DEPTH` times.

use std::f64::consts::TAU;

use crate::config::CrackConfig;
use crate::rng::RandomSource;

/// Line segment `(x1, y1, x2, y2)` in surface pixels.
pub type Segment = [f64; 4];

/// At most `2^MAX_DEPTH` segments per crack.
pub const MAX_DEPTH: u32 = 10;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Crack {
    pub segments: Vec<Segment>,
}

pub fn generate_crack<R: RandomSource + ?Sized>(
    rng: &mut R,
    x: f64,
    y: f64,
    cfg: &CrackConfig,
) -> Crack {
    let angle = rng.next_unit() * TAU;
    let length = rng.range(cfg.min_length, cfg.max_length);
    let end_x = x + angle.cos() * length;
    let end_y = y + angle.sin() * length;
    let mut segments = Vec::new();
    subdivide(rng, [x, y, end_x, end_y], cfg.displacement, 0, cfg, &mut segments);
    Crack { segments }
}

fn subdivide<R: RandomSource + ?Sized>(
    rng: &mut R,
    seg: Segment,
    displacement: f64,
    depth: u32,
    cfg: &CrackConfig,
    out: &mut Vec<Segment>,
) {
    let [x1, y1, x2, y2] = seg;
    if displacement < cfg.detail || depth >= MAX_DEPTH {
        out.push(seg);
        return;
    }
    let mid_x = (x1 + x2) / 2.0 + rng.symmetric(displacement / 2.0);
    let mid_y = (y1 + y2) / 2.0 + rng.symmetric(displacement / 2.0);
    let next = displacement / cfg.roughness;
    subdivide(rng, [x1, y1, mid_x, mid_y], next, depth + 1, cfg, out);
    subdivide(rng, [mid_x, mid_y, x2, y2], next, depth + 1, cfg, out);
}
