//! Spark particles spawned on every strike.

use crate::config::ParticleConfig;
use crate::rng::RandomSource;

/// Spark colours: white, ash, ember red, ember orange.
pub const PALETTE: [&str; 4] = ["#ffffff", "#d4d4d4", "#ef4444", "#f97316"];

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// 1.0 at spawn, removed at or below 0.
    pub life: f64,
    pub size: f64,
    pub color: &'static str,
}

impl Particle {
    /// Advance one frame. Returns false once the particle has expired.
    pub fn step(&mut self, gravity: f64, decay: f64) -> bool {
        self.x += self.vx;
        self.y += self.vy;
        self.vy += gravity;
        self.life -= decay;
        self.life > 0.0
    }

    pub fn radius(&self) -> f64 {
        self.size * self.life.max(0.0)
    }

    pub fn alpha(&self) -> f64 {
        self.life.clamp(0.0, 1.0)
    }
}

/// Owned particle collection, in spawn order.
#[derive(Clone, Debug, Default)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn burst<R: RandomSource + ?Sized>(
        &mut self,
        rng: &mut R,
        x: f64,
        y: f64,
        cfg: &ParticleConfig,
    ) {
        self.particles.reserve(cfg.per_strike as usize);
        for _ in 0..cfg.per_strike {
            let vx = rng.symmetric(cfg.speed);
            let vy = rng.symmetric(cfg.speed) - cfg.lift;
            let size = rng.range(cfg.min_size, cfg.max_size);
            let color = PALETTE[rng.pick(PALETTE.len())];
            self.particles.push(Particle { x, y, vx, vy, life: 1.0, size, color });
        }
    }

    /// Advance every particle one frame and drop the expired ones.
    pub fn step(&mut self, cfg: &ParticleConfig) {
        self.particles.retain_mut(|p| p.step(cfg.gravity, cfg.decay));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}
