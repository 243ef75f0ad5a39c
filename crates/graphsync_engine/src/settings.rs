use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use graphsync_core::MAX_LOOKUP_BATCH;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tuning for one account's runs. Delays are sized to stay under each
/// endpoint's published per-window quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub api_base_url: String,
    #[serde(with = "seconds")]
    pub request_timeout: Duration,
    pub friends_page_size: u32,
    /// 15 requests per 15 minutes.
    #[serde(with = "seconds")]
    pub friends_page_delay: Duration,
    pub search_page_size: u32,
    /// 180 requests per 15 minutes.
    #[serde(with = "seconds")]
    pub search_page_delay: Duration,
    pub search_max_pages: u64,
    pub lookup_batch_size: usize,
    /// 15 requests per 15 minutes.
    #[serde(with = "seconds")]
    pub lookup_delay: Duration,
    #[serde(with = "seconds")]
    pub mutation_delay: Duration,
    pub protect_recent: usize,
    /// Remote error codes after which a mutation counts as processed instead of aborting the run.
    pub recoverable_error_codes: Vec<u32>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.twitter.com/1.1".to_string(),
            request_timeout: Duration::from_secs(30),
            friends_page_size: 200,
            friends_page_delay: Duration::from_secs(60),
            search_page_size: 100,
            search_page_delay: Duration::from_secs(5),
            search_max_pages: 10,
            lookup_batch_size: MAX_LOOKUP_BATCH,
            lookup_delay: Duration::from_secs(60),
            mutation_delay: Duration::from_secs(10),
            protect_recent: 60,
            // 162: blocked from following this account at the request of the user.
            recoverable_error_codes: vec![162],
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings file {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("settings file {path} is invalid")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
}

impl SyncSettings {
    /// Loads overrides from a RON file; missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let mut settings: Self = ron::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        settings.lookup_batch_size = settings.lookup_batch_size.clamp(1, MAX_LOOKUP_BATCH);
        Ok(settings)
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = SyncSettings::load(&temp.path().join("settings.ron")).unwrap();
        assert_eq!(settings, SyncSettings::default());
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.ron");
        fs::write(
            &path,
            "(mutation_delay: 30, protect_recent: 10, lookup_batch_size: 250, recoverable_error_codes: [162, 160])",
        )
        .unwrap();

        let settings = SyncSettings::load(&path).unwrap();
        assert_eq!(settings.mutation_delay, Duration::from_secs(30));
        assert_eq!(settings.protect_recent, 10);
        assert_eq!(settings.lookup_batch_size, MAX_LOOKUP_BATCH);
        assert_eq!(settings.recoverable_error_codes, vec![162, 160]);
        assert_eq!(settings.friends_page_size, 200);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.ron");
        fs::write(&path, "(mutation_delay: \"soon\")").unwrap();
        assert!(matches!(
            SyncSettings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
    }
}
