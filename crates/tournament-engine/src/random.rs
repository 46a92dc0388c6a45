//! Seeded pseudo-random streams
//!
//! Every stochastic decision in a tournament draws from a stream derived from
//! the tournament seed and the pair index, so a run is reproducible for a
//! fixed seed no matter in which order (or on which thread) matches execute.

use crate::game::Side;

/// Deterministic xorshift64* generator.
///
/// Same seed + stream index = same sequence.
#[derive(Clone, Debug)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a stream from a 32-byte seed and a stream index (the pair index
    /// for matches run by a tournament).
    pub fn new(seed: &[u8; 32], stream: u64) -> Self {
        let mut state = 0u64;
        for (i, chunk) in seed.chunks(8).enumerate() {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            state ^= u64::from_le_bytes(bytes).wrapping_add(i as u64);
        }

        state ^= stream.wrapping_mul(0x517cc1b727220a95);

        // xorshift never leaves the all-zero state
        if state == 0 {
            state = 0x9e3779b97f4a7c15;
        }

        let mut rng = Self { state };
        for _ in 0..8 {
            rng.next_u64();
        }
        rng
    }

    /// Private stream handed to one side's decide call in one round.
    ///
    /// Derived from this match stream without advancing it, so the two sides
    /// never share draws and the order of the two calls is immaterial.
    pub fn for_decision(&self, round: u32, side: Side) -> Self {
        let lane = ((round as u64) << 1) | side.lane();
        let mut state = self.state ^ lane.wrapping_mul(0x9e3779b97f4a7c15);
        if state == 0 {
            state = 0x2545f4914f6cdd1d;
        }

        let mut rng = Self { state };
        rng.next_u64();
        rng
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545f4914f6cdd1d)
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Value in 0..100 for percentage checks
    pub fn next_percent(&mut self) -> u8 {
        (self.next_u32() % 100) as u8
    }

    /// True with probability `percent` / 100.
    pub fn chance(&mut self, percent: u8) -> bool {
        self.next_percent() < percent
    }

    /// Value in the inclusive range [min, max]; returns `min` when the range is empty.
    pub fn next_in_range(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        let span = (max - min) as u64 + 1;
        min + (self.next_u64() % span) as u32
    }
}
