//! Reproducible per-stitch randomness.
//!
//! Counter-mode generation: every draw is keyed by `(seed, stream, index)`
//! instead of advancing shared state, so one stitch's jitter never depends on
//! how many stitches were drawn before it. Edits to one part of a path leave
//! the rest of its colors untouched, and recomposition is deterministic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Named streams so independent properties do not share draws.
pub mod stream {
    pub const BRIGHTNESS: u64 = 1;
}

fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// A generator positioned at one key.
fn keyed(seed: u64, stream: u64, index: u64) -> StdRng {
    StdRng::seed_from_u64(mix(mix(mix(seed) ^ stream) ^ index))
}

/// Symmetric jitter source for per-stitch variation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StitchJitter {
    seed: u64,
    amplitude: f64,
}

impl StitchJitter {
    pub fn new(seed: u64, amplitude: f64) -> Self {
        let amplitude = if amplitude.is_finite() {
            amplitude.abs()
        } else {
            0.0
        };
        Self { seed, amplitude }
    }

    pub fn is_enabled(&self) -> bool {
        self.amplitude > 0.0
    }

    /// Jitter in `[-amplitude, amplitude]` for one stitch.
    pub fn amount(&self, stream: u64, index: u64) -> f64 {
        if !self.is_enabled() {
            return 0.0;
        }
        keyed(self.seed, stream, index).random_range(-self.amplitude..=self.amplitude)
    }
}
