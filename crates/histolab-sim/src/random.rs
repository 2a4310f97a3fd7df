//! Seeded random source.
//!
//! One root seed per job; named streams and per-replication sub-sources are
//! derived deterministically from it, so every replication is reproducible
//! and independent of its siblings. Derivation mixes the root with an
//! FNV-1a hash of the stream name through a splitmix64 finalizer.

use rand::SeedableRng;
use rand::rngs::SmallRng;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    for &b in bytes {
        h ^= u64::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Deterministic factory for named random streams.
#[derive(Debug, Clone, Copy)]
pub struct RandomSource {
    root: u64,
}

impl RandomSource {
    /// Creates a source from a root seed.
    pub fn new(root: u64) -> Self {
        Self { root }
    }

    /// The root seed.
    pub fn seed(&self) -> u64 {
        self.root
    }

    /// Derives the sub-source for one replication.
    pub fn replication(&self, rep: u64) -> Self {
        Self {
            root: splitmix64(self.root ^ splitmix64(rep)),
        }
    }

    /// Derives a named stream.
    pub fn stream(&self, name: &str) -> SmallRng {
        SmallRng::seed_from_u64(splitmix64(self.root ^ fnv1a(name.as_bytes())))
    }
}
