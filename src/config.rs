//! Miner and signer configuration
//!
//! Loaded from an optional JSON file; every field has a default, and CLI
//! flags override whatever the file sets.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algorithm::{Difficulty, DEFAULT_KEY_BITS, MAX_KEY_BITS, MIN_KEY_BITS};

/// Seed mined when none is configured
pub const DEFAULT_SEED: &str = "Alice";

/// Suffix appended to the mined message for the tamper check
pub const DEFAULT_TAMPER_SUFFIX: &str = "tampered";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// String the counter is appended to
    pub seed: String,
    /// Difficulties mined in turn by `powsig mine`
    pub difficulties: Vec<Difficulty>,
    /// Difficulty of the proof signed by `powsig demo`
    pub sign_difficulty: Difficulty,
    /// RSA modulus size for generated keys
    pub key_bits: usize,
    /// Directory holding `private_key.pem` and `public_key.pem`
    pub key_dir: Option<PathBuf>,
    /// Upper bound on counters tried per search (unbounded if unset)
    pub max_attempts: Option<u64>,
    /// Mining threads (sequential search if unset)
    pub threads: Option<usize>,
    /// Appended to the mined message to check tamper detection
    pub tamper_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED.to_string(),
            difficulties: vec![difficulty(4), difficulty(5)],
            sign_difficulty: difficulty(4),
            key_bits: DEFAULT_KEY_BITS,
            key_dir: None,
            max_attempts: None,
            threads: None,
            tamper_suffix: DEFAULT_TAMPER_SUFFIX.to_string(),
        }
    }
}

// Only called with literals well inside the valid range
fn difficulty(d: u32) -> Difficulty {
    Difficulty::new(d).unwrap_or_default()
}

impl Config {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Default config, or the file's when a path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulties.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one difficulty is required".to_string(),
            ));
        }
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&self.key_bits) {
            return Err(ConfigError::Invalid(format!(
                "key_bits must be in {MIN_KEY_BITS}..={MAX_KEY_BITS}, got {}",
                self.key_bits
            )));
        }
        if self.tamper_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "tamper_suffix must not be empty".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid(
                "threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
