//! Search checkpoints on disk
//!
//! One checkpoint file holds a [`MiningCursor`] per seed and difficulty, so a
//! run over several difficulties can share a file without one search
//! replacing another's progress.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::algorithm::{Difficulty, MiningCursor};

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Invalid checkpoint {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved position for this search, if any.
    pub fn resume(
        &self,
        seed: &str,
        difficulty: Difficulty,
    ) -> Result<Option<MiningCursor>, CheckpointError> {
        let cursor = self
            .read()?
            .into_iter()
            .find(|cursor| is_search(cursor, seed, difficulty));

        if let Some(cursor) = &cursor {
            tracing::info!(
                path = %self.path.display(),
                seed,
                %difficulty,
                next_counter = cursor.next_counter(),
                "resuming from checkpoint"
            );
        }
        Ok(cursor)
    }

    /// Store `cursor`, replacing only the entry for its own search.
    pub fn save(&self, cursor: &MiningCursor) -> Result<(), CheckpointError> {
        let mut cursors = self.read()?;
        match cursors
            .iter_mut()
            .find(|saved| is_search(saved, cursor.seed(), cursor.difficulty()))
        {
            Some(saved) => *saved = cursor.clone(),
            None => cursors.push(cursor.clone()),
        }

        self.write(&cursors)?;
        tracing::trace!(
            path = %self.path.display(),
            next_counter = cursor.next_counter(),
            "checkpoint saved"
        );
        Ok(())
    }

    /// Drop the entry for a finished search. The file is removed once no
    /// entries remain.
    pub fn clear(&self, seed: &str, difficulty: Difficulty) -> Result<(), CheckpointError> {
        if !self.path.exists() {
            return Ok(());
        }

        let mut cursors = self.read()?;
        cursors.retain(|cursor| !is_search(cursor, seed, difficulty));

        if cursors.is_empty() {
            fs::remove_file(&self.path)?;
        } else {
            self.write(&cursors)?;
        }
        Ok(())
    }

    fn read(&self) -> Result<Vec<MiningCursor>, CheckpointError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|source| CheckpointError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, cursors: &[MiningCursor]) -> Result<(), CheckpointError> {
        let content = serde_json::to_string_pretty(cursors).map_err(|source| {
            CheckpointError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

fn is_search(cursor: &MiningCursor, seed: &str, difficulty: Difficulty) -> bool {
    cursor.seed() == seed && cursor.difficulty() == difficulty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Progress;

    fn difficulty(d: u32) -> Difficulty {
        Difficulty::new(d).unwrap()
    }

    fn pending(seed: &str, d: u32, budget: u64) -> MiningCursor {
        match MiningCursor::new(seed, difficulty(d)).advance(budget) {
            Progress::Pending(cursor) => cursor,
            Progress::Found(result) => panic!("found too early: {result:?}"),
        }
    }

    #[test]
    fn test_resume_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join("search.json"));

        assert_eq!(checkpoint.resume("Alice", difficulty(4)).unwrap(), None);
    }

    #[test]
    fn test_save_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join("search.json"));
        let cursor = pending("Alice", 6, 500);

        checkpoint.save(&cursor).unwrap();
        let resumed = checkpoint.resume("Alice", difficulty(6)).unwrap().unwrap();

        assert_eq!(resumed, cursor);
        assert_eq!(resumed.next_counter(), 500);
    }

    #[test]
    fn test_other_search_is_not_resumed() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join("search.json"));
        checkpoint.save(&pending("Alice", 6, 500)).unwrap();

        assert_eq!(checkpoint.resume("Alice", difficulty(4)).unwrap(), None);
        assert_eq!(checkpoint.resume("Bob", difficulty(6)).unwrap(), None);
    }

    #[test]
    fn test_other_difficulty_survives_save_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        let checkpoint = CheckpointFile::new(&path);
        let interrupted = pending("Alice", 6, 2_000);

        checkpoint.save(&interrupted).unwrap();

        // A difficulty 4 search runs to completion on the same file
        checkpoint.save(&pending("Alice", 4, 100)).unwrap();
        checkpoint.save(&pending("Alice", 4, 200)).unwrap();
        checkpoint.clear("Alice", difficulty(4)).unwrap();

        assert!(path.exists());
        assert_eq!(checkpoint.resume("Alice", difficulty(4)).unwrap(), None);
        assert_eq!(
            checkpoint.resume("Alice", difficulty(6)).unwrap(),
            Some(interrupted)
        );
    }

    #[test]
    fn test_save_replaces_own_entry() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = CheckpointFile::new(dir.path().join("search.json"));

        checkpoint.save(&pending("Alice", 6, 100)).unwrap();
        checkpoint.save(&pending("Alice", 6, 300)).unwrap();

        assert_eq!(checkpoint.read().unwrap().len(), 1);
        let resumed = checkpoint.resume("Alice", difficulty(6)).unwrap().unwrap();
        assert_eq!(resumed.next_counter(), 300);
    }

    #[test]
    fn test_clear_last_entry_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        let checkpoint = CheckpointFile::new(&path);

        checkpoint.save(&pending("Alice", 6, 100)).unwrap();
        checkpoint.clear("Alice", difficulty(6)).unwrap();

        assert!(!path.exists());
        checkpoint.clear("Alice", difficulty(6)).unwrap();
    }

    #[test]
    fn test_invalid_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        fs::write(&path, "not json").unwrap();

        let err = CheckpointFile::new(&path)
            .resume("Alice", difficulty(4))
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Parse { .. }), "{err:?}");

        // Left in place for the user to inspect
        assert!(path.exists());
    }
}
