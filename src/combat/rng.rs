//! Fast PRNG for combat simulation and the genetic operators. A lagged additive
//! generator over 45 words (lag 24), seeded through SplitMix64.
//! Deterministic: same seed produces the same sequence. Not cryptographically secure.
//! Not shared between threads: every worker forks its own stream.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

const STATE_LEN: usize = 45;
const LAG: usize = 24;

#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(SPLITMIX64_GOLDEN);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
    z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
    z ^ (z >> 31)
}

#[derive(Debug, Clone)]
pub struct Rng {
    state: [u32; STATE_LEN],
    cursor: usize,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        let mut mix = seed;
        let mut state = [0u32; STATE_LEN];
        for word in state.iter_mut() {
            *word = (splitmix64(&mut mix) >> 32) as u32;
        }
        let mut rng = Self { state, cursor: 0 };
        rng.refill();
        rng
    }

    /// Seed from OS entropy. Falls back to the clock if the OS source fails.
    pub fn from_entropy() -> Self {
        Self::new(entropy_seed())
    }

    /// Independent stream number `stream` derived from `seed`.
    pub fn fork(seed: u64, stream: u64) -> Self {
        let mut mix = seed ^ stream.wrapping_mul(SPLITMIX64_M2);
        Self::new(splitmix64(&mut mix))
    }

    fn refill(&mut self) {
        for i in 0..STATE_LEN {
            let lagged = self.state[(i + LAG) % STATE_LEN];
            self.state[i] = self.state[i].wrapping_add(lagged);
        }
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.cursor += 1;
        if self.cursor >= STATE_LEN {
            self.refill();
            self.cursor = 0;
        }
        self.state[self.cursor]
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        (u64::from(self.next_u32()) << 32) | u64::from(self.next_u32())
    }

    /// Uniform integer in `[0, limit)`. Returns 0 when `limit` is 0.
    #[inline]
    pub fn below(&mut self, limit: u32) -> u32 {
        if limit == 0 {
            return 0;
        }
        ((u64::from(self.next_u32()) * u64::from(limit)) >> 32) as u32
    }

    /// Uniform float in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
    }
}

pub fn entropy_seed() -> u64 {
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(err) => {
            tracing::warn!(error = %err, "OS entropy unavailable, seeding from the clock");
            chrono::Utc::now()
                .timestamp_nanos_opt()
                .map_or(SPLITMIX64_GOLDEN, |nanos| nanos as u64)
        }
    }
}
