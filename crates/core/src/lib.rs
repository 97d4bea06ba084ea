//! # powsig Core
//!
//! Two composable primitives:
//!
//! - **Miner**: find the smallest counter whose concatenation with a seed
//!   hashes (SHA-256) to a digest with a required number of leading zero
//!   hex digits.
//! - **Signer/Verifier**: RSA PKCS#1 v1.5 signatures over the SHA-256 digest
//!   of a message, so a mined message can be bound to a key holder.
//!
//! ## Message Format
//!
//! ```text
//! message = seed || decimal(counter)
//! digest  = hex(SHA-256(utf8(message)))
//! ```
//!
//! A result with difficulty `d` has `digest[..d] == "0" * d`.
//!
//! ## Example
//!
//! ```rust
//! use powsig_core::{mine, Difficulty};
//!
//! let difficulty = Difficulty::new(2).unwrap();
//! let result = mine("Alice", difficulty);
//!
//! assert!(result.digest_hex.starts_with("00"));
//! assert_eq!(result.message, format!("Alice{}", result.counter));
//! ```
//!
//! Signing needs key material:
//!
//! ```rust,no_run
//! use powsig_core::{sign, verify, KeyPair};
//!
//! let keys = KeyPair::generate(2048)?;
//! let signature = sign("Alice42", keys.private_key())?;
//!
//! assert!(verify("Alice42", keys.public_key(), &signature));
//! assert!(!verify("Alice42!", keys.public_key(), &signature));
//! # Ok::<(), powsig_core::KeyError>(())
//! ```

mod error;
mod miner;
mod params;
mod signer;

pub use error::{KeyError, MineError};
pub use miner::{
    digest_hex, format_message, leading_zero_digits, meets_difficulty, mine, mine_bounded,
    Difficulty, MiningCursor, MiningResult, Progress,
};
pub use params::*;
pub use signer::{
    message_digest, sign, verify, BigUint, KeyPair, PrivateKey, PublicKey, Signature,
};

#[cfg(feature = "parallel")]
pub use miner::mine_parallel;
