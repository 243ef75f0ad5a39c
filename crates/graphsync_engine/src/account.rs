//! Per-account context: storage directory, settings, credentials.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::FsAppendLog;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::settings::{SettingsError, SyncSettings};
use crate::store::FsPageStore;

pub const CREDENTIALS_FILENAME: &str = "oauth-access-tokens.json";
pub const SETTINGS_FILENAME: &str = "settings.ron";
pub const LOG_FILENAME: &str = "graphsync.log";

/// User-context API credentials, obtained out of band.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token_key: String,
    pub access_token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token_key", &self.access_token_key)
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("no credentials at {path}; run `graphsync {account} authorize` first")]
    Missing { path: String, account: String },
    #[error("credentials file {path} is malformed")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not read credentials file {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("could not store credentials")]
    Persist(#[from] PersistError),
}

/// Everything a run needs to know about the account it acts for.
#[derive(Debug, Clone)]
pub struct AccountContext {
    pub account: String,
    pub dir: PathBuf,
    pub settings: SyncSettings,
}

impl AccountContext {
    /// Resolves `<root>/<account>` and loads its optional settings file.
    pub fn open(root: &Path, account: &str) -> Result<Self, SettingsError> {
        let dir = root.join(account);
        let settings = SyncSettings::load(&dir.join(SETTINGS_FILENAME))?;
        Ok(Self {
            account: account.to_string(),
            dir,
            settings,
        })
    }

    pub fn page_store(&self) -> FsPageStore {
        FsPageStore::new(self.dir.clone())
    }

    pub fn append_log(&self) -> FsAppendLog {
        FsAppendLog::new(self.dir.clone())
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILENAME)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILENAME)
    }

    pub fn load_credentials(&self) -> Result<Credentials, CredentialsError> {
        let path = self.credentials_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(CredentialsError::Missing {
                    path: path.display().to_string(),
                    account: self.account.clone(),
                })
            }
            Err(source) => {
                return Err(CredentialsError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| CredentialsError::Malformed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save_credentials(&self, credentials: &Credentials) -> Result<PathBuf, CredentialsError> {
        let content = serde_json::to_string_pretty(credentials).map_err(|source| {
            CredentialsError::Malformed {
                path: self.credentials_path().display().to_string(),
                source,
            }
        })?;
        let writer = AtomicFileWriter::new(self.dir.clone());
        Ok(writer.write(CREDENTIALS_FILENAME, &content)?)
    }
}
