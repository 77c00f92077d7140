//! Instruction source file: reading batches and noticing edits.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::debug;

/// Read the instruction file as a batch: trimmed lines, blanks dropped.
pub fn read_instructions(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read instructions {}", path.display()))?;
    Ok(split_instructions(&contents))
}

pub fn split_instructions(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// What a poll of the instruction source observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Modification time differs from the last poll (or first sighting).
    Changed,
    Unchanged,
    Missing,
}

/// Modification-time watcher for one file.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl ChangeDetector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_seen: None,
        }
    }

    pub fn poll(&mut self) -> Result<SourceState> {
        let modified = match fs::metadata(&self.path) {
            Ok(meta) => meta
                .modified()
                .with_context(|| format!("read mtime {}", self.path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SourceState::Missing),
            Err(err) => {
                return Err(err).with_context(|| format!("stat {}", self.path.display()));
            }
        };
        if self.last_seen == Some(modified) {
            return Ok(SourceState::Unchanged);
        }
        debug!(path = %self.path.display(), "instruction source changed");
        self.last_seen = Some(modified);
        Ok(SourceState::Changed)
    }
}
