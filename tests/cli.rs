//! End-to-end checks of the `powsig` binary

#![cfg(feature = "cli")]

use std::path::Path;
use std::process::{Command, Output};

use powsig::algorithm::{MiningCursor, Progress};
use powsig::checkpoint::CheckpointFile;
use powsig::{Difficulty, MiningResult};

fn powsig(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_powsig"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn json_results(output: &Output) -> Vec<MiningResult> {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn save_pending(checkpoint: &Path, seed: &str, difficulty: u32, budget: u64) -> MiningCursor {
    let cursor = match MiningCursor::new(seed, Difficulty::new(difficulty).unwrap()).advance(budget)
    {
        Progress::Pending(cursor) => cursor,
        Progress::Found(result) => panic!("found too early: {result:?}"),
    };
    CheckpointFile::new(checkpoint).save(&cursor).unwrap();
    cursor
}

#[test]
fn test_mine_json_output() {
    let output = powsig(&["mine", "--seed", "Alice", "-d", "1", "-d", "2", "--json"]);
    let results = json_results(&output);

    let counters: Vec<u64> = results.iter().map(|r| r.counter).collect();
    assert_eq!(counters, vec![7, 133]);
}

#[cfg(feature = "parallel")]
#[test]
fn test_mine_json_output_with_threads() {
    let output = powsig(&[
        "mine", "--seed", "Alice", "-d", "2", "--threads", "2", "--json",
    ]);
    let results = json_results(&output);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].counter, 133);
}

#[test]
fn test_mine_json_output_when_resuming() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("search.json");
    save_pending(&checkpoint, "Alice", 2, 100);

    let output = powsig(&[
        "mine",
        "--seed",
        "Alice",
        "-d",
        "2",
        "--checkpoint",
        checkpoint.to_str().unwrap(),
        "--json",
    ]);
    let results = json_results(&output);

    assert_eq!(results[0].counter, 133);
    assert!(!checkpoint.exists());
}

#[test]
fn test_checkpoint_for_other_difficulty_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("search.json");
    let interrupted = save_pending(&checkpoint, "Alice", 6, 2_000);

    let output = powsig(&[
        "mine",
        "--seed",
        "Alice",
        "-d",
        "3",
        "--checkpoint",
        checkpoint.to_str().unwrap(),
        "--json",
    ]);
    let results = json_results(&output);
    assert_eq!(results[0].counter, 2831);

    let saved = CheckpointFile::new(&checkpoint)
        .resume("Alice", Difficulty::new(6).unwrap())
        .unwrap();
    assert_eq!(saved, Some(interrupted));
}

#[test]
fn test_checkpoint_resumes_after_exhausted_run() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("search.json");
    let path = checkpoint.to_str().unwrap();

    let first = powsig(&[
        "mine", "--seed", "Alice", "-d", "3", "--max-attempts", "1000", "--checkpoint", path,
        "--json",
    ]);
    assert!(!first.status.success());
    assert!(String::from_utf8_lossy(&first.stderr).contains("Error:"));

    let saved = CheckpointFile::new(&checkpoint)
        .resume("Alice", Difficulty::new(3).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(saved.next_counter(), 1000);

    let second = powsig(&["mine", "--seed", "Alice", "-d", "3", "--checkpoint", path, "--json"]);
    let results = json_results(&second);
    assert_eq!(results[0].counter, 2831);
    assert!(!checkpoint.exists());
}
