// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log of registry operations
//!
//! One JSON object per line, each carrying a sequence number. Every append is
//! synced before it returns. An open WAL holds an exclusive lock on its file,
//! so only one writer per path exists at a time.

use crate::operation::RegistryOp;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WAL {path} is locked by another writer")]
    Locked {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt WAL entry at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Append-only registry log
pub struct Wal {
    file: File,
    sequence: u64,
}

impl Wal {
    /// Open or create a WAL at the given path, taking its writer lock
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        file.try_lock_exclusive().map_err(|source| WalError::Locked {
            path: path.to_path_buf(),
            source,
        })?;

        let reader = BufReader::new(File::open(path)?);
        let mut sequence = 0;
        for line in reader.lines() {
            if !line?.trim().is_empty() {
                sequence += 1;
            }
        }

        Ok(Self { file, sequence })
    }

    /// Append an operation and sync it to disk
    pub fn append(&mut self, op: &RegistryOp) -> Result<u64, WalError> {
        let entry = WalEntry {
            seq: self.sequence + 1,
            op: op.clone(),
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{line}")?;
        self.file.sync_all()?;
        self.sequence = entry.seq;
        Ok(self.sequence)
    }

    /// Number of entries written so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Read every operation from the log, oldest first
    pub fn replay(path: &Path) -> Result<Vec<RegistryOp>, WalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ops = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: WalEntry = serde_json::from_str(&line).map_err(|source| {
                WalError::Corrupt {
                    line: index + 1,
                    source,
                }
            })?;
            ops.push(entry.op);
        }

        Ok(ops)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WalEntry {
    seq: u64,
    op: RegistryOp,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
