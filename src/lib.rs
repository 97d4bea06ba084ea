//! powsig Library
//!
//! Proof-of-work mining over SHA-256 with RSA-signed proofs.
//!
//! # Overview
//!
//! A miner searches for the smallest counter whose concatenation with a seed
//! hashes to a digest with a required number of leading zero hex digits.
//! The mined message is then signed with an RSA key (PKCS#1 v1.5 over
//! SHA-256), so anyone holding the public key can detect tampering.
//!
//! The algorithms live in [`algorithm`] (`powsig-core`). This crate adds the
//! collaborators around them: PEM key files, configuration, search
//! checkpoints and the mine → sign → verify workflow.
//!
//! # Example
//!
//! ```rust
//! use powsig::algorithm::{mine, Difficulty};
//!
//! let result = mine("Alice", Difficulty::new(1).unwrap());
//!
//! assert!(result.digest_hex.starts_with('0'));
//! println!("{} -> {}", result.message, result.digest_hex);
//! ```

// Re-export the core algorithm
pub use powsig_core as algorithm;

pub mod checkpoint;
pub mod config;
pub mod keystore;
pub mod workflow;

// Convenience re-exports
pub use algorithm::{mine, sign, verify, Difficulty, KeyPair, MiningResult, Signature};
