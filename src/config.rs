//! Surface tuning.
//!
//! Every constant the surface uses lives here so a host page can override
//! any of them with a partial JSON object passed to `mount_iron_house`.
//! Missing keys fall back to the defaults below.

use std::fmt;

use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SurfaceConfig {
    /// Strikes needed to break the house.
    pub threshold: u32,
    /// Strikes per dialogue stage.
    pub hits_per_stage: u32,
    /// Delay between the final strike and the reveal, leaving time for the exit animation.
    pub break_delay_ms: f64,
    pub shake_ms: f64,
    /// Maximum jitter (px) applied to the box while shaking.
    pub shake_amplitude: f64,
    /// Ring-buffer sizes for shards / cracks.
    pub max_shards: usize,
    pub max_cracks: usize,
    /// Passed to `navigator.vibrate` on every strike.
    pub vibrate_pattern: Vec<u32>,
    pub shard: ShardConfig,
    pub particles: ParticleConfig,
    pub cracks: CrackConfig,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            threshold: 15,
            hits_per_stage: 3,
            break_delay_ms: 500.0,
            shake_ms: 100.0,
            shake_amplitude: 6.0,
            max_shards: 32,
            max_cracks: 64,
            vibrate_pattern: vec![50, 30, 50],
            shard: ShardConfig::default(),
            particles: ParticleConfig::default(),
            cracks: CrackConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ShardConfig {
    pub min_vertices: u32,
    pub max_vertices: u32,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Max angular jitter per vertex, radians.
    pub angle_jitter: f64,
    /// Half-width of the uniform exit translation range, px.
    pub fly_range: f64,
    /// Half-width of the uniform exit rotation range, degrees.
    pub rotation_range: f64,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            min_vertices: 3,
            max_vertices: 5,
            min_radius: 40.0,
            max_radius: 100.0,
            angle_jitter: 0.5,
            fly_range: 400.0,
            rotation_range: 90.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ParticleConfig {
    pub per_strike: u32,
    /// Half-width of the uniform velocity range per axis, px/frame.
    pub speed: f64,
    /// Upward bias subtracted from the initial vertical velocity.
    pub lift: f64,
    /// Added to `vy` every frame.
    pub gravity: f64,
    /// Subtracted from `life` every frame.
    pub decay: f64,
    pub min_size: f64,
    pub max_size: f64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            per_strike: 15,
            speed: 8.0,
            lift: 3.0,
            gravity: 0.4,
            decay: 0.02,
            min_size: 2.0,
            max_size: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CrackConfig {
    pub per_strike: u32,
    pub min_length: f64,
    pub max_length: f64,
    /// Initial midpoint displacement, px.
    pub displacement: f64,
    /// Displacement divisor per subdivision level (> 1).
    pub roughness: f64,
    /// Subdivision stops once displacement drops below this.
    pub detail: f64,
}

impl Default for CrackConfig {
    fn default() -> Self {
        Self {
            per_strike: 3,
            min_length: 100.0,
            max_length: 300.0,
            displacement: 60.0,
            roughness: 1.8,
            detail: 2.0,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    /// A field holds a value the surface cannot work with.
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "invalid surface config JSON: {e}"),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid surface config: `{field}` {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Upper bound on polygon corners per shard.
pub const MAX_VERTICES: u32 = 6;
/// Upper bound on sparks or cracks spawned by one strike.
pub const MAX_PER_STRIKE: u32 = 256;
/// Upper bound on retained shards or cracks.
pub const MAX_RETAINED: usize = 1024;

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn check_range(field: &'static str, lo: f64, hi: f64) -> Result<(), ConfigError> {
    if !(lo.is_finite() && hi.is_finite()) {
        return Err(invalid(field, "must be finite"));
    }
    if lo < 0.0 {
        return Err(invalid(field, "must not be negative"));
    }
    if lo > hi {
        return Err(invalid(field, "has min greater than max"));
    }
    Ok(())
}

impl SurfaceConfig {
    /// Parse a (possibly partial) JSON object and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: SurfaceConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(invalid("threshold", "must be at least 1"));
        }
        if self.hits_per_stage == 0 {
            return Err(invalid("hitsPerStage", "must be at least 1"));
        }
        if !(self.break_delay_ms >= 0.0) {
            return Err(invalid("breakDelayMs", "must not be negative"));
        }
        if !(self.shake_ms >= 0.0) {
            return Err(invalid("shakeMs", "must not be negative"));
        }
        if !(self.shake_amplitude >= 0.0) {
            return Err(invalid("shakeAmplitude", "must not be negative"));
        }
        if !(1..=MAX_RETAINED).contains(&self.max_shards) {
            return Err(invalid("maxShards", "must be between 1 and 1024"));
        }
        if !(1..=MAX_RETAINED).contains(&self.max_cracks) {
            return Err(invalid("maxCracks", "must be between 1 and 1024"));
        }

        let s = &self.shard;
        if s.min_vertices < 3 {
            return Err(invalid("shard.minVertices", "must be at least 3"));
        }
        if s.min_vertices > s.max_vertices {
            return Err(invalid("shard.minVertices", "has min greater than max"));
        }
        if s.max_vertices > MAX_VERTICES {
            return Err(invalid("shard.maxVertices", "must be at most 6"));
        }
        check_range("shard.radius", s.min_radius, s.max_radius)?;
        check_range("shard.flyRange", 0.0, s.fly_range)?;
        check_range("shard.rotationRange", 0.0, s.rotation_range)?;
        check_range("shard.angleJitter", 0.0, s.angle_jitter)?;

        let p = &self.particles;
        if p.per_strike > MAX_PER_STRIKE {
            return Err(invalid("particles.perStrike", "must be at most 256"));
        }
        check_range("particles.size", p.min_size, p.max_size)?;
        check_range("particles.speed", 0.0, p.speed)?;
        if !(p.decay > 0.0) {
            return Err(invalid("particles.decay", "must be positive"));
        }
        if !p.gravity.is_finite() || !p.lift.is_finite() {
            return Err(invalid("particles.gravity", "must be finite"));
        }

        let c = &self.cracks;
        if c.per_strike > MAX_PER_STRIKE {
            return Err(invalid("cracks.perStrike", "must be at most 256"));
        }
        check_range("cracks.length", c.min_length, c.max_length)?;
        if !(c.roughness > 1.0) {
            return Err(invalid("cracks.roughness", "must be greater than 1"));
        }
        if !(c.detail > 0.0) {
            return Err(invalid("cracks.detail", "must be positive"));
        }
        check_range("cracks.displacement", 0.0, c.displacement)?;
        Ok(())
    }
}
