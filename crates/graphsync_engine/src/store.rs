//! Durable page store: numbered append-once records plus single-slot audit records.
//!
//! Records are keyed by `(collection, sequence)` and live on disk as
//! `<collection>.<sequence>.json`. Sequences are dense from 0, so the number
//! of records in a collection is the length of its unbroken prefix.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub collection: String,
    pub sequence: u64,
}

impl PageKey {
    pub fn new(collection: impl Into<String>, sequence: u64) -> Self {
        Self {
            collection: collection.into(),
            sequence,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}.json", self.collection, self.sequence)
    }
}

pub trait PageStore: Send + Sync {
    fn exists(&self, key: &PageKey) -> bool;

    /// Writes a new record. Fails with `AlreadyExists` if the key is taken.
    fn write(&self, key: &PageKey, payload: &Value) -> Result<(), PersistError>;

    /// Reads a record. Fails with `NotFound` if the key was never written.
    fn read(&self, key: &PageKey) -> Result<Value, PersistError>;

    /// Deletes a record, returning whether it existed.
    fn remove(&self, key: &PageKey) -> Result<bool, PersistError>;

    /// Overwrites the single-slot record `name`.
    fn write_slot(&self, name: &str, payload: &Value) -> Result<(), PersistError>;

    /// Reads the single-slot record `name`, if present.
    fn read_slot(&self, name: &str) -> Result<Option<Value>, PersistError>;

    /// Number of records in the dense prefix `0..n` of `collection`.
    fn count(&self, collection: &str) -> u64 {
        let mut sequence = 0;
        while self.exists(&PageKey::new(collection, sequence)) {
            sequence += 1;
        }
        sequence
    }

    /// Key the next record of `collection` will be written under.
    fn next_key(&self, collection: &str) -> PageKey {
        PageKey::new(collection, self.count(collection))
    }

    /// Deletes the dense prefix of `collection`. Returns how many records were removed.
    fn purge(&self, collection: &str) -> Result<u64, PersistError> {
        let mut sequence = 0;
        while self.remove(&PageKey::new(collection, sequence))? {
            sequence += 1;
        }
        Ok(sequence)
    }
}

/// One directory per account.
pub struct FsPageStore {
    dir: PathBuf,
    writer: AtomicFileWriter,
}

impl FsPageStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
        }
    }

    fn read_file(&self, file_name: &str) -> Result<Option<Value>, PersistError> {
        let path = self.dir.join(file_name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PersistError::Io(err)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| PersistError::Malformed {
                name: file_name.to_string(),
                source,
            })
    }
}

impl PageStore for FsPageStore {
    fn exists(&self, key: &PageKey) -> bool {
        self.dir.join(key.file_name()).is_file()
    }

    fn write(&self, key: &PageKey, payload: &Value) -> Result<(), PersistError> {
        let content = to_pretty(&key.file_name(), payload)?;
        self.writer.write_new(&key.file_name(), &content)?;
        Ok(())
    }

    fn read(&self, key: &PageKey) -> Result<Value, PersistError> {
        let file_name = key.file_name();
        self.read_file(&file_name)?
            .ok_or(PersistError::NotFound(file_name))
    }

    fn remove(&self, key: &PageKey) -> Result<bool, PersistError> {
        match fs::remove_file(self.dir.join(key.file_name())) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(PersistError::Io(err)),
        }
    }

    fn write_slot(&self, name: &str, payload: &Value) -> Result<(), PersistError> {
        let file_name = slot_file_name(name);
        let content = to_pretty(&file_name, payload)?;
        self.writer.write(&file_name, &content)?;
        Ok(())
    }

    fn read_slot(&self, name: &str) -> Result<Option<Value>, PersistError> {
        self.read_file(&slot_file_name(name))
    }
}

fn slot_file_name(name: &str) -> String {
    format!("{name}.json")
}

fn to_pretty(name: &str, payload: &Value) -> Result<String, PersistError> {
    serde_json::to_string_pretty(payload).map_err(|source| PersistError::Malformed {
        name: name.to_string(),
        source,
    })
}

/// In-process store with the same contract as [`FsPageStore`].
#[derive(Default)]
pub struct MemoryPageStore {
    pages: Mutex<HashMap<PageKey, Value>>,
    slots: Mutex<HashMap<String, Value>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageStore for MemoryPageStore {
    fn exists(&self, key: &PageKey) -> bool {
        lock(&self.pages).contains_key(key)
    }

    fn write(&self, key: &PageKey, payload: &Value) -> Result<(), PersistError> {
        let mut pages = lock(&self.pages);
        if pages.contains_key(key) {
            return Err(PersistError::AlreadyExists(key.file_name()));
        }
        pages.insert(key.clone(), payload.clone());
        Ok(())
    }

    fn read(&self, key: &PageKey) -> Result<Value, PersistError> {
        lock(&self.pages)
            .get(key)
            .cloned()
            .ok_or_else(|| PersistError::NotFound(key.file_name()))
    }

    fn remove(&self, key: &PageKey) -> Result<bool, PersistError> {
        Ok(lock(&self.pages).remove(key).is_some())
    }

    fn write_slot(&self, name: &str, payload: &Value) -> Result<(), PersistError> {
        lock(&self.slots).insert(name.to_string(), payload.clone());
        Ok(())
    }

    fn read_slot(&self, name: &str) -> Result<Option<Value>, PersistError> {
        Ok(lock(&self.slots).get(name).cloned())
    }
}

// A poisoned lock only means another test thread panicked mid-write; the map is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
