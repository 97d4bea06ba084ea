//! Search and key parameters
//!
//! Difficulty is counted in hex digits of the SHA-256 digest, so each unit
//! multiplies the expected search cost by 16.

/// SHA-256 output size in bytes
pub const DIGEST_SIZE: usize = 32;

/// Length of a lowercase hex digest
pub const DIGEST_HEX_LEN: usize = DIGEST_SIZE * 2;

/// Largest satisfiable difficulty (every hex digit zero)
pub const MAX_DIFFICULTY: u32 = DIGEST_HEX_LEN as u32;

/// Default RSA modulus size in bits
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Smallest RSA modulus accepted for signing
pub const MIN_KEY_BITS: usize = 1024;

/// Largest RSA modulus accepted for signing
pub const MAX_KEY_BITS: usize = 4096;

/// Counters tried per batch by the parallel search
pub const PARALLEL_BATCH: u64 = 1 << 14;
