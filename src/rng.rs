//! Random sources for the procedural effects.
//!
//! Every random draw made by the surface (shard shape, crack paths, particle
//! velocities, shake jitter) goes through [`RandomSource`], so tests can swap
//! in a [`Sequence`] and assert exact geometry.

/// Uniform random numbers in `[0, 1)` plus a few derived helpers.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_unit()
    }

    /// Uniform in `[-half, half)`.
    fn symmetric(&mut self, half: f64) -> f64 {
        (self.next_unit() - 0.5) * 2.0 * half
    }

    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next_unit() * len as f64) as usize).min(len - 1)
    }
}

/// 32-bit linear congruential generator (Numerical Recipes constants).
/// Not cryptographically secure; plenty for cosmetic effects.
#[derive(Clone, Debug)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed from platform entropy (`rng` feature) or the page clock.
    pub fn from_entropy() -> Self {
        #[cfg(feature = "rng")]
        {
            let mut buf = [0u8; 4];
            if getrandom::getrandom(&mut buf).is_ok() {
                return Self::new(u32::from_le_bytes(buf));
            }
        }
        let now = web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0);
        Self::new((now * 1000.0) as u64 as u32)
    }
}

impl RandomSource for Lcg {
    fn next_unit(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state as f64 / (u32::MAX as f64 + 1.0)
    }
}

/// Replays a fixed list of unit values, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct Sequence {
    values: Vec<f64>,
    cursor: usize,
}

impl Sequence {
    /// Values are clamped into `[0, 1)`; an empty list behaves like `[0.0]`.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let mut values: Vec<f64> = values
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        if values.is_empty() {
            values.push(0.0);
        }
        Self { values, cursor: 0 }
    }

    /// A source that always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new([value])
    }
}

impl RandomSource for Sequence {
    fn next_unit(&mut self) -> f64 {
        let v = self.values[self.cursor];
        self.cursor = (self.cursor + 1) % self.values.len();
        v
    }
}
