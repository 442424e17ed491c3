//! Park-Miller "minimal standard" multiplicative congruential generator.
//!
//! Modulus 2^31 - 1, multiplier 16807, Schrage decomposition so the state
//! never overflows 32 bits. The replica annealer depends on this exact
//! sequence for reproducible trajectories.

const MODULUS: i32 = 2_147_483_647;
const MULTIPLIER: i32 = 16_807;
const QUOTIENT: i32 = 127_773; // MODULUS / MULTIPLIER
const REMAINDER: i32 = 2_836; // MODULUS % MULTIPLIER
const SCALE: f32 = 4.656_612_875e-10; // 1 / MODULUS

/// Deterministic uniform generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinStdRng {
    state: i32,
}

impl MinStdRng {
    /// Create a generator. A zero seed would lock the state at zero, so it is
    /// mapped to 1.
    pub fn new(seed: i32) -> Self {
        let state = seed.rem_euclid(MODULUS);
        Self {
            state: if state == 0 { 1 } else { state },
        }
    }

    /// Advance and return the raw state in `1..MODULUS`.
    pub fn next_raw(&mut self) -> i32 {
        let k = self.state / QUOTIENT;
        let mut next = MULTIPLIER * (self.state - k * QUOTIENT) - k * REMAINDER;
        if next < 0 {
            next += MODULUS;
        }
        self.state = next;
        next
    }

    /// Uniform deviate in `(0, 1)`.
    pub fn next_uniform(&mut self) -> f32 {
        self.next_raw() as f32 * SCALE
    }

    /// Uniform deviate in `[low, high)`.
    pub fn next_range(&mut self, low: f64, high: f64) -> f64 {
        let u = self.next_raw() as f64 / MODULUS as f64;
        low + (high - low) * u
    }

    pub fn state(&self) -> i32 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_sequence() {
        let mut rng = MinStdRng::new(1);
        assert_eq!(rng.next_raw(), 16_807);
        assert_eq!(rng.next_raw(), 282_475_249);
        assert_eq!(rng.next_raw(), 1_622_650_073);
    }

    #[test]
    fn test_ten_thousandth_value() {
        // Park & Miller's published check value.
        let mut rng = MinStdRng::new(1);
        let mut last = 0;
        for _ in 0..10_000 {
            last = rng.next_raw();
        }
        assert_eq!(last, 1_043_618_065);
    }

    #[test]
    fn test_uniform_in_open_interval() {
        let mut rng = MinStdRng::new(42);
        for _ in 0..1000 {
            let u = rng.next_uniform();
            assert!(u > 0.0 && u <= 1.0);
        }
    }

    #[test]
    fn test_zero_seed_does_not_stick() {
        let mut rng = MinStdRng::new(0);
        assert_ne!(rng.next_raw(), 0);
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = MinStdRng::new(7);
        let mut b = MinStdRng::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_raw(), b.next_raw());
        }
    }
}
