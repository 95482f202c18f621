//! Per-thread deterministic random streams.
//!
//! # Determinism strategy
//!
//! Each worker thread owns an independent stream seeded by:
//!
//!   seed = global_seed XOR (stream_index * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive stream indices uniformly across the seed space.
//! This means:
//!
//! - Streams never share generator state (no contention, no ordering
//!   dependency between threads).
//! - A run with the same seed and the same worker count replays identically.
//! - All draws are local to the owning thread; synchronisation is a
//!   per-stream mutex that only its own thread ever locks.
//!
//! The generator is ChaCha8 rather than a small non-cryptographic PRNG
//! because checkpointing requires the full generator state to round-trip
//! through serde.

use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::math::Real3;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── SimStream ─────────────────────────────────────────────────────────────────

/// One thread's random stream.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SimStream(ChaCha8Rng);

impl SimStream {
    /// Seed deterministically from the run's global seed and a stream index.
    pub fn new(global_seed: u64, stream: u64) -> SimStream {
        let seed = global_seed ^ stream.wrapping_mul(MIXING_CONSTANT);
        SimStream(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Uniform draw in `[0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }

    /// Uniform draw in `[min, max)`.
    #[inline]
    pub fn uniform_in(&mut self, min: f64, max: f64) -> f64 {
        self.0.gen_range(min..max)
    }

    /// Normally distributed draw.
    pub fn gaussian(&mut self, mean: f64, sigma: f64) -> f64 {
        // Normal::new only fails on non-finite / negative sigma.
        Normal::new(mean, sigma)
            .expect("SimStream: invalid gaussian parameters")
            .sample(&mut self.0)
    }

    /// Random jitter vector with each component uniform in `[-k, k]`.
    ///
    /// Used by the pairwise force when two centers coincide.
    pub fn noise3(&mut self, k: f64) -> Real3 {
        Real3::new(
            self.uniform_in(-k, k),
            self.uniform_in(-k, k),
            self.uniform_in(-k, k),
        )
    }

    /// Expose the generator for `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut ChaCha8Rng {
        &mut self.0
    }
}

// ── RandomStreams ─────────────────────────────────────────────────────────────

/// One [`SimStream`] per worker thread.
///
/// Slots are indexed by `rayon::current_thread_index()`; each mutex is only
/// ever locked by the thread that owns the slot, so the locks never contend.
/// Index 0 doubles as the scheduler thread's stream.
pub struct RandomStreams {
    seed: u64,
    streams: Vec<Mutex<SimStream>>,
}

impl RandomStreams {
    /// Allocate `count` streams from `global_seed` (one per worker thread).
    pub fn new(global_seed: u64, count: usize) -> RandomStreams {
        let streams = (0..count.max(1) as u64)
            .map(|i| Mutex::new(SimStream::new(global_seed, i)))
            .collect();
        RandomStreams {
            seed: global_seed,
            streams,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Run `f` with the calling thread's stream.
    ///
    /// Outside the rayon pool (scheduler thread, tests) slot 0 is used.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut SimStream) -> R) -> R {
        let slot = rayon::current_thread_index().unwrap_or(0) % self.streams.len();
        let mut stream = self.streams[slot]
            .lock()
            .expect("RandomStreams: poisoned stream slot");
        f(&mut stream)
    }

    /// Clone out every stream's state for checkpointing.
    pub fn snapshot(&self) -> Vec<SimStream> {
        self.streams
            .iter()
            .map(|s| s.lock().expect("RandomStreams: poisoned stream slot").clone())
            .collect()
    }

    /// Restore stream states from a checkpoint.
    ///
    /// A count mismatch (e.g. restoring on a machine with a different worker
    /// count) is accepted with a warning: common streams are restored, extra
    /// slots keep their fresh seeding.
    pub fn restore(&mut self, saved: Vec<SimStream>) {
        if saved.len() != self.streams.len() {
            log::warn!(
                "RandomStreams: restoring {} streams into {} slots; \
                 extra slots keep fresh seeds",
                saved.len(),
                self.streams.len()
            );
        }
        for (slot, stream) in self.streams.iter_mut().zip(saved) {
            *slot.get_mut().expect("RandomStreams: poisoned stream slot") = stream;
        }
    }
}
