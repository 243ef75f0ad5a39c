//! Append-only ledgers of processed identifiers, one identifier per line.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::persist::{ensure_storage_dir, PersistError};
use crate::store::lock;

pub trait AppendLog: Send + Sync {
    /// Appends one line to the ledger `log`, creating it on first use.
    fn append_line(&self, log: &str, value: &str) -> Result<(), PersistError>;

    /// All lines of `log` from the start. A missing ledger reads as empty.
    fn read_lines(&self, log: &str) -> Result<Vec<String>, PersistError>;
}

pub struct FsAppendLog {
    dir: PathBuf,
}

impl FsAppendLog {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl AppendLog for FsAppendLog {
    fn append_line(&self, log: &str, value: &str) -> Result<(), PersistError> {
        ensure_storage_dir(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(log))?;
        file.write_all(format!("{value}\n").as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    fn read_lines(&self, log: &str) -> Result<Vec<String>, PersistError> {
        let text = match fs::read_to_string(self.dir.join(log)) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(PersistError::Io(err)),
        };
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryAppendLog {
    logs: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryAppendLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AppendLog for MemoryAppendLog {
    fn append_line(&self, log: &str, value: &str) -> Result<(), PersistError> {
        lock(&self.logs)
            .entry(log.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    fn read_lines(&self, log: &str) -> Result<Vec<String>, PersistError> {
        Ok(lock(&self.logs).get(log).cloned().unwrap_or_default())
    }
}
