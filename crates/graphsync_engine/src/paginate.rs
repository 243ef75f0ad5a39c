//! Resumable draining of cursor-paginated collections into the page store.
//!
//! Every fetched page is written as a [`PageRecord`] before the next request is
//! issued. A later run counts the records already on disk, replays their
//! identifiers, and continues from the last stored `next_cursor`, so completed
//! requests are never re-issued.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use graphsync_core::Identifier;
use graphsync_logging::{sync_debug, sync_info, sync_warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api::{ApiError, Cursor, GraphApi};
use crate::persist::PersistError;
use crate::store::{PageKey, PageStore};
use crate::wire::{decode_following, decode_search, DecodedPage};

/// Durable envelope around one raw page response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub sequence: u64,
    pub request_cursor: Cursor,
    pub next_cursor: Cursor,
    pub fetched_at: String,
    pub payload: Value,
}

impl PageRecord {
    pub fn new(sequence: u64, request_cursor: Cursor, next_cursor: Cursor, payload: Value) -> Self {
        Self {
            sequence,
            request_cursor,
            next_cursor,
            fetched_at: Utc::now().to_rfc3339(),
            payload,
        }
    }

    pub fn to_value(&self) -> Result<Value, PersistError> {
        serde_json::to_value(self).map_err(|source| PersistError::Malformed {
            name: format!("page {}", self.sequence),
            source,
        })
    }

    pub fn from_value(key: &PageKey, value: Value) -> Result<Self, PersistError> {
        serde_json::from_value(value).map_err(|source| PersistError::Malformed {
            name: key.file_name(),
            source,
        })
    }
}

/// A remote collection the paginator can drain.
#[async_trait::async_trait]
pub trait PagedCollection: Send + Sync {
    /// Record prefix in the page store.
    fn name(&self) -> &str;

    /// Pause between two requests.
    fn delay(&self) -> Duration;

    /// Hard cap on stored pages, for collections without a reliable terminal cursor.
    fn page_limit(&self) -> Option<u64> {
        None
    }

    /// Whether a page with no previously unseen items ends the drain.
    fn stops_when_dry(&self) -> bool {
        false
    }

    async fn fetch(&self, api: &dyn GraphApi, cursor: &Cursor) -> Result<Value, ApiError>;

    fn decode(&self, payload: &Value) -> Result<DecodedPage, ApiError>;
}

/// Accounts followed by `account`, newest first.
pub struct FollowingCollection {
    pub account: String,
    pub page_size: u32,
    pub delay: Duration,
}

pub const FOLLOWING: &str = "friends";
pub const SEARCH: &str = "search";

#[async_trait::async_trait]
impl PagedCollection for FollowingCollection {
    fn name(&self) -> &str {
        FOLLOWING
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    async fn fetch(&self, api: &dyn GraphApi, cursor: &Cursor) -> Result<Value, ApiError> {
        api.list_following(&self.account, cursor, self.page_size).await
    }

    fn decode(&self, payload: &Value) -> Result<DecodedPage, ApiError> {
        decode_following(payload)
    }
}

/// Authors of recent posts matching a query.
pub struct SearchCollection {
    pub query: String,
    pub page_size: u32,
    pub max_pages: u64,
    pub delay: Duration,
}

#[async_trait::async_trait]
impl PagedCollection for SearchCollection {
    fn name(&self) -> &str {
        SEARCH
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn page_limit(&self) -> Option<u64> {
        Some(self.max_pages)
    }

    fn stops_when_dry(&self) -> bool {
        true
    }

    async fn fetch(&self, api: &dyn GraphApi, cursor: &Cursor) -> Result<Value, ApiError> {
        api.search_recent(&self.query, cursor, self.page_size).await
    }

    fn decode(&self, payload: &Value) -> Result<DecodedPage, ApiError> {
        decode_search(payload)
    }
}

#[derive(Debug, Error)]
pub enum PaginateError {
    #[error("request for {collection} page {sequence} failed")]
    Remote {
        collection: String,
        sequence: u64,
        #[source]
        source: ApiError,
    },
    #[error("could not store {collection} page {sequence}")]
    Persist {
        collection: String,
        sequence: u64,
        #[source]
        source: PersistError,
    },
    #[error("{collection} page {sequence} could not be decoded")]
    Decode {
        collection: String,
        sequence: u64,
        #[source]
        source: ApiError,
    },
}

impl PaginateError {
    /// The remote failure, when the drain stopped on one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            PaginateError::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Outcome of one drain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Harvest {
    /// Unique identifiers over all stored pages, in discovery order.
    pub identifiers: Vec<Identifier>,
    /// Pages replayed from the store.
    pub pages_resumed: u64,
    /// Pages requested in this drain.
    pub pages_fetched: u64,
}

pub struct Paginator<'a> {
    api: &'a dyn GraphApi,
    pages: &'a dyn PageStore,
}

struct Accumulator {
    seen: HashSet<Identifier>,
    scanned: HashSet<Identifier>,
    harvest: Harvest,
}

impl Accumulator {
    /// Adds unseen candidates to the harvest. Returns how many page items,
    /// candidates or not, had not been seen before.
    fn absorb(&mut self, page: DecodedPage) -> usize {
        let mut fresh = 0;
        for identifier in page.ineligible {
            if self.scanned.insert(identifier) {
                fresh += 1;
            }
        }
        for identifier in page.identifiers {
            if self.scanned.insert(identifier.clone()) {
                fresh += 1;
            }
            if self.seen.insert(identifier.clone()) {
                self.harvest.identifiers.push(identifier);
            }
        }
        fresh
    }
}

impl<'a> Paginator<'a> {
    pub fn new(api: &'a dyn GraphApi, pages: &'a dyn PageStore) -> Self {
        Self { api, pages }
    }

    /// Drains `collection` until its terminal cursor or page limit.
    pub async fn drain(&self, collection: &dyn PagedCollection) -> Result<Harvest, PaginateError> {
        self.drain_until(collection, |_| false).await
    }

    /// Like [`Paginator::drain`], also stopping once `enough` holds for the
    /// identifiers gathered so far.
    pub async fn drain_until<F>(
        &self,
        collection: &dyn PagedCollection,
        enough: F,
    ) -> Result<Harvest, PaginateError>
    where
        F: Fn(&[Identifier]) -> bool,
    {
        let name = collection.name().to_string();
        let mut acc = Accumulator {
            seen: HashSet::new(),
            scanned: HashSet::new(),
            harvest: Harvest::default(),
        };

        let mut sequence = self.pages.count(&name);
        let mut cursor = Cursor::Start;
        for resumed in 0..sequence {
            let record = self.load(&name, resumed)?;
            let decoded = decode_page(collection, &name, resumed, &record.payload)?;
            acc.absorb(decoded);
            cursor = record.next_cursor;
        }
        acc.harvest.pages_resumed = sequence;
        if sequence > 0 {
            sync_info!(
                "Resuming {} at page {} with {} identifiers already stored",
                name,
                sequence,
                acc.harvest.identifiers.len()
            );
        }

        loop {
            if cursor.is_exhausted()
                || limit_reached(collection, sequence)
                || enough(&acc.harvest.identifiers)
            {
                break;
            }
            if acc.harvest.pages_fetched > 0 && !collection.delay().is_zero() {
                sync_debug!("Waiting {:?} before next {} request", collection.delay(), name);
                tokio::time::sleep(collection.delay()).await;
            }

            let payload = collection
                .fetch(self.api, &cursor)
                .await
                .map_err(|source| PaginateError::Remote {
                    collection: name.clone(),
                    sequence,
                    source,
                })?;
            let decoded = decode_page(collection, &name, sequence, &payload)?;
            let next_cursor = decoded.next_cursor.clone();
            let record = PageRecord::new(sequence, cursor, next_cursor.clone(), payload);
            self.store(&name, &record)?;
            acc.harvest.pages_fetched += 1;

            let added = acc.absorb(decoded);
            sync_info!(
                "Stored {} page {} ({} new, {} total)",
                name,
                sequence,
                added,
                acc.harvest.identifiers.len()
            );
            sequence += 1;
            cursor = next_cursor;

            if added == 0 && collection.stops_when_dry() {
                break;
            }
        }

        Ok(acc.harvest)
    }

    fn load(&self, name: &str, sequence: u64) -> Result<PageRecord, PaginateError> {
        let key = PageKey::new(name, sequence);
        let persist_err = |source| PaginateError::Persist {
            collection: name.to_string(),
            sequence,
            source,
        };
        let value = self.pages.read(&key).map_err(persist_err)?;
        PageRecord::from_value(&key, value).map_err(persist_err)
    }

    fn store(&self, name: &str, record: &PageRecord) -> Result<(), PaginateError> {
        let persist_err = |source| PaginateError::Persist {
            collection: name.to_string(),
            sequence: record.sequence,
            source,
        };
        let value = record.to_value().map_err(persist_err)?;
        self.pages
            .write(&PageKey::new(name, record.sequence), &value)
            .map_err(persist_err)
    }
}

fn limit_reached(collection: &dyn PagedCollection, stored: u64) -> bool {
    collection.page_limit().is_some_and(|limit| stored >= limit)
}

fn decode_page(
    collection: &dyn PagedCollection,
    name: &str,
    sequence: u64,
    payload: &Value,
) -> Result<DecodedPage, PaginateError> {
    collection
        .decode(payload)
        .map_err(|source| PaginateError::Decode {
            collection: name.to_string(),
            sequence,
            source,
        })
}

/// Identifiers from every stored page of a collection, without touching the remote.
///
/// Used for exclusion sources: a page that cannot be read or decoded is
/// skipped with a warning and the remaining pages still count.
pub fn stored_identifiers(
    pages: &dyn PageStore,
    collection: &dyn PagedCollection,
) -> Vec<Identifier> {
    let name = collection.name();
    let mut identifiers = Vec::new();
    for sequence in 0..pages.count(name) {
        let key = PageKey::new(name, sequence);
        let decoded = pages
            .read(&key)
            .and_then(|value| PageRecord::from_value(&key, value))
            .map_err(|err| err.to_string())
            .and_then(|record| {
                collection
                    .decode(&record.payload)
                    .map_err(|err| err.to_string())
            });
        match decoded {
            Ok(page) => identifiers.extend(page.identifiers),
            Err(err) => sync_warn!("Ignoring {}: {}", key.file_name(), err),
        }
    }
    graphsync_core::unique_in_order(identifiers)
}
