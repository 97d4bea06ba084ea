use thiserror::Error;

/// Failures of the key material handed to the signer.
///
/// Verification never produces one of these: a signature that does not match
/// is reported as `false` by [`crate::verify`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Unsupported RSA key size: {bits} bits (expected {min}..={max})", min = crate::MIN_KEY_BITS, max = crate::MAX_KEY_BITS)]
    UnsupportedSize { bits: usize },

    #[error("Malformed RSA key: {0}")]
    Malformed(String),

    #[error("Key generation failed: {0}")]
    Generation(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MineError {
    #[error("Difficulty {difficulty} out of range (max {max})", max = crate::MAX_DIFFICULTY)]
    DifficultyOutOfRange { difficulty: u32 },

    /// The bounded search ran out of budget. `next_counter` is the first
    /// counter that was not tried.
    #[error("Search exhausted after {attempts} attempts (next counter {next_counter})")]
    SearchExhausted { attempts: u64, next_counter: u64 },

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),
}
