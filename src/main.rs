//! powsig CLI
//!
//! A command-line tool for leading-zero proof-of-work mining with
//! RSA-signed proofs.
//!
//! # Commands
//!
//! - `mine` - Mine one or more difficulties and compare their cost
//! - `demo` - Generate keys, mine, sign, verify and check tampering
//! - `keygen` - Generate and save a key pair
//! - `sign` - Sign a message with the saved private key
//! - `verify` - Verify a signature with a public key
//! - `benchmark` - Measure the digest rate

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use rsa::traits::PublicKeyParts;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use powsig::algorithm::{
    digest_hex, format_message, message_digest, Difficulty, MineError, MiningCursor, Progress,
};
use powsig::checkpoint::CheckpointFile;
use powsig::config::Config;
use powsig::keystore::{
    default_key_dir, load_key_pair, load_public_key, public_key_pem, save_key_pair, KeyFiles,
};
use powsig::{sign, verify, workflow, KeyPair, MiningResult, Signature};

/// Counters tried between progress reports and checkpoints
const PROGRESS_CHUNK: u64 = 50_000;

/// Minimum time between progress lines
const REPORT_INTERVAL: Duration = Duration::from_secs(2);

const RULE: &str =
    "================================================================================";
const THIN_RULE: &str =
    "--------------------------------------------------------------------------------";

#[derive(Parser)]
#[command(name = "powsig")]
#[command(version = "0.1.0")]
#[command(about = "Leading-zero proof-of-work miner with RSA-signed proofs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding private_key.pem and public_key.pem (default: ~/.powsig/keys)
    #[arg(long, global = true)]
    key_dir: Option<PathBuf>,

    /// Log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine each difficulty in turn and compare the cost
    Mine {
        /// String the counter is appended to
        #[arg(long)]
        seed: Option<String>,

        /// Leading zero hex digits required (repeatable; default: 4 then 5)
        #[arg(short, long)]
        difficulty: Vec<u32>,

        /// Give up after this many counters per difficulty
        #[arg(long)]
        max_attempts: Option<u64>,

        /// Mining threads (0 = all cores; default: sequential)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Save search progress here, one entry per seed and difficulty, and
        /// resume from it on the next run
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Print results as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Generate a key pair, mine, sign the result and check tamper detection
    Demo {
        /// String the counter is appended to
        #[arg(long)]
        seed: Option<String>,

        /// Leading zero hex digits required (default: 4)
        #[arg(short, long)]
        difficulty: Option<u32>,

        /// RSA modulus size in bits (default: 2048)
        #[arg(long)]
        bits: Option<usize>,

        /// Replace existing key files
        #[arg(long)]
        force: bool,
    },

    /// Generate and save a key pair
    Keygen {
        /// RSA modulus size in bits (default: 2048)
        #[arg(long)]
        bits: Option<usize>,

        /// Replace existing key files
        #[arg(long)]
        force: bool,
    },

    /// Sign a message with the saved private key
    Sign {
        /// Message to sign, e.g. a mined seed + counter
        #[arg(long)]
        message: String,
    },

    /// Verify a signature against a message
    Verify {
        /// Message that was signed
        #[arg(long)]
        message: String,

        /// Signature as hex
        #[arg(long)]
        signature: String,

        /// Public key file (default: public_key.pem in the key directory)
        #[arg(long)]
        public_key: Option<PathBuf>,
    },

    /// Measure the digest rate
    Benchmark {
        /// Number of digests to compute
        #[arg(short, long, default_value = "1000000")]
        count: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = build_config(cli.config.as_deref(), cli.key_dir).and_then(|config| {
        match cli.command {
            Commands::Mine {
                seed,
                difficulty,
                max_attempts,
                threads,
                checkpoint,
                json,
            } => cmd_mine(
                config,
                seed,
                difficulty,
                max_attempts,
                threads,
                checkpoint,
                json,
            ),
            Commands::Demo {
                seed,
                difficulty,
                bits,
                force,
            } => cmd_demo(config, seed, difficulty, bits, force),
            Commands::Keygen { bits, force } => cmd_keygen(config, bits, force),
            Commands::Sign { message } => cmd_sign(&config, &message),
            Commands::Verify {
                message,
                signature,
                public_key,
            } => cmd_verify(&config, &message, &signature, public_key),
            Commands::Benchmark { count } => cmd_benchmark(count),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "powsig=debug,powsig_core=debug",
        _ => "powsig=trace,powsig_core=trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build the config from the optional file and global CLI args
fn build_config(path: Option<&Path>, key_dir: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = Config::load_or_default(path)?;
    if let Some(dir) = key_dir {
        config.key_dir = Some(dir);
    }
    Ok(config)
}

fn key_dir(config: &Config) -> PathBuf {
    config.key_dir.clone().unwrap_or_else(default_key_dir)
}

fn parse_difficulty(d: u32) -> anyhow::Result<Difficulty> {
    Ok(Difficulty::new(d)?)
}

fn cmd_mine(
    mut config: Config,
    seed: Option<String>,
    difficulties: Vec<u32>,
    max_attempts: Option<u64>,
    threads: Option<usize>,
    checkpoint: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if !difficulties.is_empty() {
        config.difficulties = difficulties
            .into_iter()
            .map(parse_difficulty)
            .collect::<anyhow::Result<_>>()?;
    }
    if max_attempts.is_some() {
        config.max_attempts = max_attempts;
    }
    let checkpoint = checkpoint.map(CheckpointFile::new);
    if let Some(threads) = threads {
        config.threads = Some(if threads == 0 { num_cpus::get() } else { threads });
    }
    config.validate()?;

    if !json {
        println!("{RULE}");
        println!("Proof of Work");
        println!("{RULE}");
        println!("Seed: {}\n", config.seed);
    }

    let mut results = Vec::with_capacity(config.difficulties.len());
    for (i, &difficulty) in config.difficulties.iter().enumerate() {
        if !json {
            println!(
                "[Challenge {}] Looking for a hash with {} leading zeros...",
                i + 1,
                difficulty
            );
            println!("{THIN_RULE}");
        }

        let result = search(&config, difficulty, checkpoint.as_ref(), !json)?;

        if !json {
            print_mining_result(&result);
            println!();
        }
        results.push(result);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.len() > 1 {
        print_comparison(&results);
    }

    Ok(())
}

/// Run one search with the configured threads, budget and checkpoint.
///
/// With `show_progress` unset nothing is written to stdout, so `--json`
/// output stays parseable.
fn search(
    config: &Config,
    difficulty: Difficulty,
    checkpoint: Option<&CheckpointFile>,
    show_progress: bool,
) -> anyhow::Result<MiningResult> {
    if let Some(threads) = config.threads.filter(|&t| t > 1) {
        if config.max_attempts.is_some() || checkpoint.is_some() {
            anyhow::bail!("--threads cannot be combined with --max-attempts or --checkpoint");
        }
        return search_parallel(&config.seed, difficulty, threads, show_progress);
    }

    let resumed = match checkpoint {
        Some(checkpoint) => checkpoint.resume(&config.seed, difficulty)?,
        None => None,
    };
    if show_progress {
        if let Some(cursor) = &resumed {
            println!("Resuming from counter {}", cursor.next_counter());
        }
    }
    let mut cursor =
        resumed.unwrap_or_else(|| MiningCursor::new(config.seed.as_str(), difficulty));
    let mut last_report = Instant::now();
    let mut reported = false;

    loop {
        let budget = match config.max_attempts {
            Some(max) => max.saturating_sub(cursor.attempts()).min(PROGRESS_CHUNK),
            None => PROGRESS_CHUNK,
        };

        if budget == 0 || cursor.is_exhausted() {
            if reported {
                println!();
            }
            return Err(MineError::SearchExhausted {
                attempts: cursor.attempts(),
                next_counter: cursor.next_counter(),
            }
            .into());
        }

        match cursor.advance(budget) {
            Progress::Found(result) => {
                if let Some(checkpoint) = checkpoint {
                    checkpoint.clear(&result.seed, result.difficulty)?;
                }
                if reported {
                    println!();
                }
                return Ok(result);
            }
            Progress::Pending(next) => {
                if let Some(checkpoint) = checkpoint {
                    checkpoint.save(&next)?;
                }
                if show_progress && last_report.elapsed() >= REPORT_INTERVAL {
                    let secs = next.elapsed().as_secs_f64();
                    print!(
                        "\rAttempts: {} | Hashrate: {:.0} H/s | Time: {:.1}s",
                        next.attempts(),
                        next.attempts() as f64 / secs.max(f64::EPSILON),
                        secs
                    );
                    std::io::stdout().flush().ok();
                    last_report = Instant::now();
                    reported = true;
                }
                cursor = next;
            }
        }
    }
}

#[cfg(feature = "parallel")]
fn search_parallel(
    seed: &str,
    difficulty: Difficulty,
    threads: usize,
    show_progress: bool,
) -> anyhow::Result<MiningResult> {
    if show_progress {
        println!("Threads: {}", threads);
    }
    Ok(powsig::algorithm::mine_parallel(seed, difficulty, threads)?)
}

#[cfg(not(feature = "parallel"))]
fn search_parallel(
    _seed: &str,
    _difficulty: Difficulty,
    _threads: usize,
    _show_progress: bool,
) -> anyhow::Result<MiningResult> {
    anyhow::bail!("built without the `parallel` feature; run without --threads")
}

fn print_mining_result(result: &MiningResult) {
    println!("Found!");
    println!("Time:     {:.4} s", result.elapsed.as_secs_f64());
    println!("Nonce:    {}", result.counter);
    println!("Message:  {}", result.message);
    println!("Hash:     {}", result.digest_hex);
    println!("Attempts: {}", result.attempts());
}

fn print_comparison(results: &[MiningResult]) {
    println!("{RULE}");
    println!("Difficulty comparison");
    println!("{THIN_RULE}");

    for result in results {
        println!(
            "{} zeros: {} attempts, {:.4} s",
            result.difficulty,
            result.attempts(),
            result.elapsed.as_secs_f64()
        );
    }

    let first = &results[0];
    for result in &results[1..] {
        let attempt_ratio = result.attempts() as f64 / first.attempts() as f64;
        println!(
            "{} -> {} zeros: {:.2}x attempts",
            first.difficulty, result.difficulty, attempt_ratio
        );

        let base_secs = first.elapsed.as_secs_f64();
        if base_secs > 0.0 {
            println!(
                "{} -> {} zeros: {:.2}x time",
                first.difficulty,
                result.difficulty,
                result.elapsed.as_secs_f64() / base_secs
            );
        }
    }
    println!("{RULE}");
}

fn print_key_pair(keys: &KeyPair) -> anyhow::Result<()> {
    let public = keys.public_key();

    println!("Generated {}-bit RSA key pair", keys.bits());
    println!("  Modulus n:         {}", public.n());
    println!("  Public exponent e: {}", public.e());
    println!("\nPublic key (PEM):");
    print!("{}", public_key_pem(public)?);
    Ok(())
}

fn print_key_files(files: &KeyFiles) {
    println!("\nKeys saved:");
    println!("  Private key: {}", files.private_key.display());
    println!("  Public key:  {}", files.public_key.display());
}

fn cmd_demo(
    mut config: Config,
    seed: Option<String>,
    difficulty: Option<u32>,
    bits: Option<usize>,
    force: bool,
) -> anyhow::Result<()> {
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(d) = difficulty {
        config.sign_difficulty = parse_difficulty(d)?;
    }
    if let Some(bits) = bits {
        config.key_bits = bits;
    }
    config.validate()?;

    let dir = key_dir(&config);
    let files = KeyFiles::in_dir(&dir);
    if !force && files.any_exist() {
        anyhow::bail!(
            "Key files already exist in {}. Pass --force to replace them, or --key-dir to use another directory.",
            dir.display()
        );
    }

    println!("{RULE}");
    println!("Proof of Work + RSA signatures");
    println!("{RULE}");
    println!("Seed: {}\n", config.seed);

    println!("{RULE}");
    println!("[Step 1] Generate RSA key pair");
    println!("{THIN_RULE}");
    let keys = KeyPair::generate(config.key_bits)?;
    print_key_pair(&keys)?;

    let files = save_key_pair(&keys, &dir, force)?;
    print_key_files(&files);

    println!("\n{RULE}");
    println!(
        "[Step 2] Mine a hash with {} leading zeros",
        config.sign_difficulty
    );
    println!("{THIN_RULE}");
    let result = search(&config, config.sign_difficulty, None, true)?;
    print_mining_result(&result);

    let proof = workflow::sign_result(result, &keys, &config.tamper_suffix)?;

    println!("\n{RULE}");
    println!("[Step 3] Sign the mined message with the private key");
    println!("{THIN_RULE}");
    println!("Message:        {}", proof.result.message);
    println!(
        "Message digest: {}",
        hex::encode(message_digest(&proof.result.message))
    );
    println!("Signature:      {}", proof.signature);
    println!("Length:         {} bytes", proof.signature.len());

    println!("\n{RULE}");
    println!("[Step 4] Verify the signature with the public key");
    println!("{THIN_RULE}");
    print_verification(&proof.result.message, proof.verified);

    println!("\n{RULE}");
    println!("[Tamper check] Verify the signature against an altered message");
    println!("{THIN_RULE}");
    print_verification(&proof.tampered_message, proof.tampered_verified);

    println!("\n{RULE}");
    println!("Summary");
    println!("{RULE}");
    println!("1. Generated a {}-bit RSA key pair", keys.bits());
    println!("2. Mined hash {}", proof.result.digest_hex);
    println!("3. Signed '{}' with the private key", proof.result.message);
    println!(
        "4. Signature verification: {}",
        if proof.verified { "passed" } else { "FAILED" }
    );
    println!(
        "5. Tampered message rejected: {}",
        if proof.tamper_evident() { "yes" } else { "NO" }
    );
    println!("{RULE}");

    Ok(())
}

fn print_verification(message: &str, valid: bool) {
    println!("Message: {}", message);
    if valid {
        println!("Signature valid: signed by the private key holder, not tampered with.");
    } else {
        println!("Signature INVALID: the message was altered or the signature does not match.");
    }
}

fn cmd_keygen(mut config: Config, bits: Option<usize>, force: bool) -> anyhow::Result<()> {
    if let Some(bits) = bits {
        config.key_bits = bits;
    }
    config.validate()?;

    let dir = key_dir(&config);
    let keys = KeyPair::generate(config.key_bits)?;
    let files = save_key_pair(&keys, &dir, force)?;

    print_key_pair(&keys)?;
    print_key_files(&files);

    Ok(())
}

fn cmd_sign(config: &Config, message: &str) -> anyhow::Result<()> {
    let dir = key_dir(config);
    let keys = load_key_pair(&dir)
        .with_context(|| format!("loading keys from {}", dir.display()))?;

    let signature = sign(message, keys.private_key())?;
    println!("{}", signature);

    Ok(())
}

fn cmd_verify(
    config: &Config,
    message: &str,
    signature_hex: &str,
    public_key: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = public_key.unwrap_or_else(|| KeyFiles::in_dir(&key_dir(config)).public_key);
    let key = load_public_key(&path)
        .with_context(|| format!("loading public key {}", path.display()))?;

    // Undecodable hex is a failed verification, not an error
    let valid = match Signature::from_hex(signature_hex) {
        Ok(signature) => verify(message, &key, &signature),
        Err(e) => {
            tracing::debug!(error = %e, "signature is not valid hex");
            false
        }
    };

    print_verification(message, valid);
    Ok(())
}

fn cmd_benchmark(count: u64) -> anyhow::Result<()> {
    println!("Running benchmark with {} digests...", count);

    let start = Instant::now();
    for counter in 0..count {
        let _ = digest_hex(&format_message("benchmark", counter));
    }
    let elapsed = start.elapsed();
    let hashrate = count as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!("\nResults:");
    println!("  Total digests: {}", count);
    println!("  Time elapsed:  {:.2}s", elapsed.as_secs_f64());
    println!("  Hashrate:      {:.0} H/s", hashrate);

    // Each extra leading zero digit costs 16x
    println!("\nExpected search time:");
    for difficulty in 1..=8u32 {
        let expected_attempts = 16f64.powi(difficulty as i32);
        println!(
            "  {} zeros: {:>14.0} attempts, ~{:.2}s",
            difficulty,
            expected_attempts,
            expected_attempts / hashrate
        );
    }

    Ok(())
}
