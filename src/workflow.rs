//! Mine → sign → verify, with a tamper check
//!
//! The linear session the CLI `demo` command runs, returned as a typed
//! report so callers decide how to present it.

use crate::algorithm::{
    mine, mine_bounded, sign, verify, Difficulty, KeyError, KeyPair, MineError, MiningResult,
    Signature,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Mine(#[from] MineError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Outcome of one session.
#[derive(Debug, Clone)]
pub struct SignedProof {
    pub result: MiningResult,
    pub signature: Signature,
    /// Verification of the signature against the mined message
    pub verified: bool,
    /// The mined message with the tamper suffix appended
    pub tampered_message: String,
    /// Verification of the same signature against the tampered message
    pub tampered_verified: bool,
}

impl SignedProof {
    /// The signature held for the real message and was rejected for the
    /// tampered one.
    pub fn tamper_evident(&self) -> bool {
        self.verified && !self.tampered_verified
    }
}

/// Mine `seed` at `difficulty`, sign the mined message, verify it, then
/// verify the same signature against the message plus `tamper_suffix`.
///
/// With `max_attempts` set the search is bounded and may fail with
/// [`MineError::SearchExhausted`].
pub fn run(
    seed: &str,
    difficulty: Difficulty,
    keys: &KeyPair,
    tamper_suffix: &str,
    max_attempts: Option<u64>,
) -> Result<SignedProof, WorkflowError> {
    let result = match max_attempts {
        Some(max) => mine_bounded(seed, difficulty, max)?,
        None => mine(seed, difficulty),
    };

    sign_result(result, keys, tamper_suffix)
}

/// Sign and check an already mined result.
pub fn sign_result(
    result: MiningResult,
    keys: &KeyPair,
    tamper_suffix: &str,
) -> Result<SignedProof, WorkflowError> {
    let signature = sign(&result.message, keys.private_key())?;
    let verified = verify(&result.message, keys.public_key(), &signature);

    let tampered_message = format!("{}{}", result.message, tamper_suffix);
    let tampered_verified = verify(&tampered_message, keys.public_key(), &signature);

    tracing::debug!(
        message = %result.message,
        verified,
        tampered_verified,
        "signed mined message"
    );

    Ok(SignedProof {
        result,
        signature,
        verified,
        tampered_message,
        tampered_verified,
    })
}
