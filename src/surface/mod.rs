//! The iron house: a breakable surface driven by clicks and animation frames.
//!
//! [`FractureSurface`] holds all per-mount state (hit counter, shards, cracks,
//! particles, staged dialogue) and never touches the DOM. The browser glue in
//! `web` feeds it click coordinates and `requestAnimationFrame` timestamps and
//! renders whatever it reports.
//!
//! Lifecycle: `Idle` (no hits) -> `Accumulating` -> `Breaking` (threshold hit,
//! exit animation playing) -> `Revealed` (terminal). Input is ignored once
//! `Breaking` starts, so the hit count never exceeds the threshold and the
//! reveal fires exactly once. Once `Breaking` begins the completion is owed:
//! tearing down reports the pending due time instead of dropping it.

use std::collections::VecDeque;

use crate::config::{ConfigError, SurfaceConfig};
use crate::rng::{Lcg, RandomSource};

pub mod crack;
pub mod geometry;
pub mod narrative;
pub mod particles;
mod web;

pub use crack::Crack;
pub use geometry::Shard;
pub use narrative::{DIALOGUES, Dialogue};
pub use particles::{Particle, ParticleField};
pub use web::{IronHouseHandle, mount_iron_house};

/// Strikes count only in `Idle` and `Accumulating`. A click that lands during
/// the break animation is dropped as well as one after the reveal, so the
/// threshold-crossing strike is the last one ever counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Accumulating,
    Breaking,
    Revealed,
}

impl InteractionState {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Accumulating => "accumulating",
            InteractionState::Breaking => "breaking",
            InteractionState::Revealed => "revealed",
        }
    }

    /// True while strikes are still accepted; false from `Breaking` on.
    pub fn accepts_input(self) -> bool {
        matches!(self, InteractionState::Idle | InteractionState::Accumulating)
    }
}

/// What a single accepted strike changed.
#[derive(Clone, Debug, PartialEq)]
pub struct Strike {
    pub hits: u32,
    pub stage: usize,
    /// The dialogue overlay must be (re)mounted with `stage`.
    pub stage_changed: bool,
    /// First strike of this mount.
    pub engaged: bool,
    /// This strike reached the threshold; the surface is now `Breaking`.
    pub broke: bool,
    pub shard_id: u64,
    /// Oldest shard dropped to keep the ring bounded.
    pub evicted_shard: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame {
    /// `revealed` is true on the one frame that completes the break.
    Running { revealed: bool },
    /// Torn down; the caller must not schedule another frame.
    Stopped,
}

pub struct FractureSurface<R = Lcg> {
    config: SurfaceConfig,
    rng: R,
    width: f64,
    height: f64,
    hits: u32,
    state: InteractionState,
    shards: VecDeque<Shard>,
    next_shard_id: u64,
    cracks: VecDeque<Crack>,
    particles: ParticleField,
    shown_stage: Option<usize>,
    shake_until: f64,
    reveal_at: Option<f64>,
    completion_fired: bool,
    torn_down: bool,
}

impl<R: RandomSource> FractureSurface<R> {
    /// Rejects configs that fail [`SurfaceConfig::validate`].
    pub fn new(
        config: SurfaceConfig,
        rng: R,
        width: f64,
        height: f64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            shards: VecDeque::with_capacity(config.max_shards.min(64)),
            cracks: VecDeque::with_capacity(config.max_cracks.min(64)),
            config,
            rng,
            width: width.max(0.0),
            height: height.max(0.0),
            hits: 0,
            state: InteractionState::Idle,
            next_shard_id: 1,
            particles: ParticleField::new(),
            shown_stage: None,
            shake_until: f64::NEG_INFINITY,
            reveal_at: None,
            completion_fired: false,
            torn_down: false,
        })
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn threshold(&self) -> u32 {
        self.config.threshold
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn shards(&self) -> impl Iterator<Item = &Shard> {
        self.shards.iter()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn cracks(&self) -> impl Iterator<Item = &Crack> {
        self.cracks.iter()
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    /// Hits over threshold, capped at 1.
    pub fn progress(&self) -> f64 {
        (self.hits as f64 / self.config.threshold.max(1) as f64).min(1.0)
    }

    /// Dialogue pair currently on screen, if the overlay is visible.
    pub fn dialogue(&self) -> Option<&'static Dialogue> {
        match (self.state, self.shown_stage) {
            (InteractionState::Accumulating, Some(stage)) => DIALOGUES.get(stage),
            _ => None,
        }
    }

    pub fn is_shaking(&self, now: f64) -> bool {
        now < self.shake_until
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Register a strike at surface-local `(x, y)`.
    /// Returns `None` when the surface no longer accepts input.
    pub fn strike(&mut self, x: f64, y: f64, now: f64) -> Option<Strike> {
        if self.torn_down || !self.state.accepts_input() {
            return None;
        }

        self.hits += 1;
        let engaged = self.state == InteractionState::Idle;
        self.state = InteractionState::Accumulating;

        let shard_id = self.next_shard_id;
        self.next_shard_id += 1;
        let shard = geometry::generate_shard(
            &mut self.rng,
            shard_id,
            x,
            y,
            self.width,
            self.height,
            &self.config.shard,
        );
        let evicted_shard = push_bounded(&mut self.shards, shard, self.config.max_shards)
            .map(|old| old.id);

        for _ in 0..self.config.cracks.per_strike {
            let crack = crack::generate_crack(&mut self.rng, x, y, &self.config.cracks);
            push_bounded(&mut self.cracks, crack, self.config.max_cracks);
        }

        self.particles
            .burst(&mut self.rng, x, y, &self.config.particles);
        self.shake_until = now + self.config.shake_ms;

        let stage =
            narrative::stage_for_hits(self.hits, self.config.hits_per_stage, DIALOGUES.len());
        let stage_changed = self.shown_stage != Some(stage);
        self.shown_stage = Some(stage);

        let broke = self.hits >= self.config.threshold;
        if broke {
            self.state = InteractionState::Breaking;
            self.reveal_at = Some(now + self.config.break_delay_ms);
            tracing::info!(hits = self.hits, "iron house breaking");
        } else {
            tracing::debug!(hits = self.hits, stage, "strike");
        }

        Some(Strike {
            hits: self.hits,
            stage,
            stage_changed,
            engaged,
            broke,
            shard_id,
            evicted_shard,
        })
    }

    /// One animation frame: step the particles and finish a pending break.
    pub fn tick(&mut self, now: f64) -> Frame {
        if self.torn_down {
            return Frame::Stopped;
        }
        self.particles.step(&self.config.particles);

        let mut revealed = false;
        if self.state == InteractionState::Breaking
            && self.reveal_at.is_some_and(|at| now >= at)
        {
            self.state = InteractionState::Revealed;
            self.reveal_at = None;
            if !self.completion_fired {
                self.completion_fired = true;
                revealed = true;
                tracing::info!("iron house revealed");
            }
        }
        Frame::Running { revealed }
    }

    /// Jitter for the shake animation; `(0, 0)` when not shaking.
    pub fn shake_offset(&mut self, now: f64) -> (f64, f64) {
        if !self.is_shaking(now) {
            return (0.0, 0.0);
        }
        let amp = self.config.shake_amplitude;
        (self.rng.symmetric(amp), self.rng.symmetric(amp))
    }

    /// Stop the surface for good. Later strikes and ticks are no-ops.
    ///
    /// If a break is pending, returns the time its completion is due. The
    /// caller now owns that completion; the surface will never report it.
    pub fn teardown(&mut self) -> Option<f64> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;
        self.particles.clear();
        let owed = match self.reveal_at.take() {
            Some(at) if !self.completion_fired => at,
            _ => return None,
        };
        self.completion_fired = true;
        tracing::debug!(due = owed, "teardown during break; completion handed off");
        Some(owed)
    }
}

fn push_bounded<T>(ring: &mut VecDeque<T>, item: T, cap: usize) -> Option<T> {
    let evicted = if ring.len() >= cap.max(1) {
        ring.pop_front()
    } else {
        None
    };
    ring.push_back(item);
    evicted
}
