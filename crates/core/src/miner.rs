//! Leading-zero proof-of-work search
//!
//! The search is strictly sequential over `0, 1, 2, ...`, so the counter it
//! returns is the smallest one whose message digest meets the difficulty.
//! Every entry point (unbounded, bounded, cursor, parallel) returns the same
//! result for the same seed and difficulty.

use std::fmt::{self, Write};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MineError;
use crate::params::{DIGEST_SIZE, MAX_DIFFICULTY};

/// Required number of leading `'0'` hex digits, in `0..=64`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Difficulty(u32);

impl Difficulty {
    pub fn new(difficulty: u32) -> Result<Self, MineError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(MineError::DifficultyOutOfRange { difficulty });
        }
        Ok(Self(difficulty))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The hex prefix a qualifying digest starts with.
    pub fn prefix(self) -> String {
        "0".repeat(self.0 as usize)
    }
}

impl TryFrom<u32> for Difficulty {
    type Error = MineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Difficulty> for u32 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A successful search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningResult {
    pub seed: String,
    pub difficulty: Difficulty,
    /// Smallest qualifying counter
    pub counter: u64,
    /// `seed` followed by the decimal `counter`
    pub message: String,
    /// Lowercase hex SHA-256 of `message`
    pub digest_hex: String,
    /// Wall-clock time spent searching
    pub elapsed: Duration,
}

impl MiningResult {
    /// Number of digests computed, counting the winning one.
    pub fn attempts(&self) -> u64 {
        self.counter.saturating_add(1)
    }

    /// Digests per second over the whole search.
    pub fn hashrate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempts() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Build the hashed message for a counter.
pub fn format_message(seed: &str, counter: u64) -> String {
    format!("{seed}{counter}")
}

fn digest(message: &str) -> [u8; DIGEST_SIZE] {
    Sha256::digest(message.as_bytes()).into()
}

/// Lowercase hex SHA-256 of the UTF-8 bytes of `message`.
pub fn digest_hex(message: &str) -> String {
    hex::encode(digest(message))
}

/// Count the leading `'0'` characters of the digest's hex rendering.
pub fn leading_zero_digits(hash: &[u8; DIGEST_SIZE]) -> u32 {
    let mut digits = 0u32;

    for byte in hash.iter() {
        if *byte == 0 {
            digits += 2;
        } else {
            if *byte >> 4 == 0 {
                digits += 1;
            }
            break;
        }
    }

    digits
}

pub fn meets_difficulty(hash: &[u8; DIGEST_SIZE], difficulty: Difficulty) -> bool {
    leading_zero_digits(hash) >= difficulty.get()
}

/// Reusable message buffer: the seed stays in place and only the decimal
/// counter is rewritten on each attempt.
struct Candidate {
    buf: String,
    seed_len: usize,
}

impl Candidate {
    fn new(seed: &str) -> Self {
        let mut buf = String::with_capacity(seed.len() + 20);
        buf.push_str(seed);
        Self {
            buf,
            seed_len: seed.len(),
        }
    }

    fn set(&mut self, counter: u64) -> &str {
        self.buf.truncate(self.seed_len);
        // Writing into a String cannot fail
        let _ = write!(self.buf, "{counter}");
        &self.buf
    }
}

/// Outcome of advancing a [`MiningCursor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Found(MiningResult),
    /// Budget spent without a match; the cursor points at the next untried
    /// counter.
    Pending(MiningCursor),
}

/// Resumable search position.
///
/// A cursor can be serialized between calls to [`MiningCursor::advance`] to
/// checkpoint a long search. Elapsed time accumulates across resumptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningCursor {
    seed: String,
    difficulty: Difficulty,
    next_counter: u64,
    elapsed: Duration,
    /// Set once `u64::MAX` has been tried without a match
    #[serde(default)]
    exhausted: bool,
}

impl MiningCursor {
    pub fn new(seed: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            seed: seed.into(),
            difficulty,
            next_counter: 0,
            elapsed: Duration::ZERO,
            exhausted: false,
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// First untried counter. Stays at `u64::MAX` once the cursor is
    /// exhausted.
    pub fn next_counter(&self) -> u64 {
        self.next_counter
    }

    /// Counters tried so far. The search starts at 0, so this equals the
    /// next counter, saturating at `u64::MAX`.
    pub fn attempts(&self) -> u64 {
        self.next_counter
    }

    /// Every counter up to and including `u64::MAX` has been tried.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Try at most `budget` further counters.
    ///
    /// Consumes the cursor so a finished search cannot be continued past its
    /// minimal counter. An exhausted cursor comes back unchanged.
    pub fn advance(mut self, budget: u64) -> Progress {
        if budget == 0 || self.exhausted {
            return Progress::Pending(self);
        }

        let start = Instant::now();
        let last = self.next_counter.saturating_add(budget - 1);
        let mut candidate = Candidate::new(&self.seed);

        for counter in self.next_counter..=last {
            let hash = digest(candidate.set(counter));

            if meets_difficulty(&hash, self.difficulty) {
                let elapsed = self.elapsed + start.elapsed();
                tracing::debug!(
                    seed = %self.seed,
                    difficulty = %self.difficulty,
                    counter,
                    ?elapsed,
                    "found qualifying counter"
                );
                return Progress::Found(MiningResult {
                    message: candidate.buf,
                    digest_hex: hex::encode(hash),
                    seed: self.seed,
                    difficulty: self.difficulty,
                    counter,
                    elapsed,
                });
            }
        }

        self.elapsed += start.elapsed();
        match last.checked_add(1) {
            Some(next) => self.next_counter = next,
            None => {
                self.next_counter = last;
                self.exhausted = true;
                tracing::warn!(seed = %self.seed, "counter space exhausted");
            }
        }
        tracing::trace!(
            seed = %self.seed,
            next_counter = self.next_counter,
            "search budget spent"
        );
        Progress::Pending(self)
    }
}

/// Search without an iteration cap.
///
/// Runs until a qualifying counter is found. Every valid [`Difficulty`] is
/// met in expectation, but the cost grows 16x per digit; callers bound the
/// difficulty, or use [`mine_bounded`].
///
/// The counter is a `u64`. Should every counter through `u64::MAX` fail,
/// this function does not return; [`mine_bounded`] and [`MiningCursor`]
/// report that case as exhaustion instead.
pub fn mine(seed: &str, difficulty: Difficulty) -> MiningResult {
    tracing::debug!(seed, %difficulty, "mining");
    let mut cursor = MiningCursor::new(seed, difficulty);

    loop {
        match cursor.advance(u64::MAX) {
            Progress::Found(result) => return result,
            Progress::Pending(next) => cursor = next,
        }
    }
}

/// Search at most `max_attempts` counters.
///
/// Fails with [`MineError::SearchExhausted`] rather than returning a
/// non-qualifying counter.
pub fn mine_bounded(
    seed: &str,
    difficulty: Difficulty,
    max_attempts: u64,
) -> Result<MiningResult, MineError> {
    tracing::debug!(seed, %difficulty, max_attempts, "mining (bounded)");

    match MiningCursor::new(seed, difficulty).advance(max_attempts) {
        Progress::Found(result) => Ok(result),
        Progress::Pending(cursor) => Err(MineError::SearchExhausted {
            attempts: cursor.attempts(),
            next_counter: cursor.next_counter(),
        }),
    }
}

/// Search consecutive batches of counters on a rayon pool.
///
/// Within a batch the first match in counter order wins, and batches are
/// searched in order, so the result is the same as [`mine`]. `threads == 0`
/// uses rayon's default thread count.
#[cfg(feature = "parallel")]
pub fn mine_parallel(
    seed: &str,
    difficulty: Difficulty,
    threads: usize,
) -> Result<MiningResult, MineError> {
    use rayon::prelude::*;

    use crate::params::PARALLEL_BATCH;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| MineError::ThreadPool(e.to_string()))?;

    tracing::debug!(seed, %difficulty, threads = pool.current_num_threads(), "mining (parallel)");
    let start = Instant::now();

    pool.install(|| {
        let mut base = 0u64;

        loop {
            let last = base.saturating_add(PARALLEL_BATCH - 1);
            let found = (base..=last)
                .into_par_iter()
                .find_first(|&counter| {
                    meets_difficulty(&digest(&format_message(seed, counter)), difficulty)
                });

            if let Some(counter) = found {
                let message = format_message(seed, counter);
                return Ok(MiningResult {
                    seed: seed.to_string(),
                    difficulty,
                    counter,
                    digest_hex: digest_hex(&message),
                    message,
                    elapsed: start.elapsed(),
                });
            }

            match last.checked_add(1) {
                Some(next) => base = next,
                None => {
                    return Err(MineError::SearchExhausted {
                        attempts: u64::MAX,
                        next_counter: u64::MAX,
                    })
                }
            }
        }
    })
}
