use std::time::Duration;

use graphsync_core::{plan_batches, Identifier, Relationship};
use graphsync_logging::{sync_debug, sync_info};

use crate::api::{Cursor, GraphApi};
use crate::paginate::{PageRecord, PaginateError};
use crate::store::{PageKey, PageStore};
use crate::wire::decode_relationships;

pub const RELATIONSHIPS: &str = "friendships";

/// Relationship status lookups in fixed-size chunks, one stored record per chunk.
pub struct BatchLookup<'a> {
    api: &'a dyn GraphApi,
    pages: &'a dyn PageStore,
    batch_size: usize,
    delay: Duration,
}

impl<'a> BatchLookup<'a> {
    pub fn new(
        api: &'a dyn GraphApi,
        pages: &'a dyn PageStore,
        batch_size: usize,
        delay: Duration,
    ) -> Self {
        Self {
            api,
            pages,
            batch_size,
            delay,
        }
    }

    /// Looks up every identifier, in order. Chunks whose record is already
    /// stored are read back instead of being requested again.
    pub async fn run(&self, identifiers: &[Identifier]) -> Result<Vec<Relationship>, PaginateError> {
        let batches = plan_batches(identifiers.len(), self.batch_size);
        let total = batches.len();
        let mut relationships = Vec::with_capacity(identifiers.len());
        let mut requested = 0u64;

        for (index, range) in batches.into_iter().enumerate() {
            let sequence = index as u64;
            let key = PageKey::new(RELATIONSHIPS, sequence);
            let persist_err = |source| PaginateError::Persist {
                collection: RELATIONSHIPS.to_string(),
                sequence,
                source,
            };
            let decode_err = |source| PaginateError::Decode {
                collection: RELATIONSHIPS.to_string(),
                sequence,
                source,
            };

            let payload = if self.pages.exists(&key) {
                sync_debug!("Reusing stored relationship batch {}", sequence);
                let value = self.pages.read(&key).map_err(persist_err)?;
                PageRecord::from_value(&key, value)
                    .map_err(persist_err)?
                    .payload
            } else {
                if requested > 0 && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                let payload = self
                    .api
                    .lookup_relationships(&identifiers[range.clone()])
                    .await
                    .map_err(|source| PaginateError::Remote {
                        collection: RELATIONSHIPS.to_string(),
                        sequence,
                        source,
                    })?;
                requested += 1;
                let next_cursor = if index + 1 == total {
                    Cursor::Exhausted
                } else {
                    Cursor::Next(range.end.to_string())
                };
                let request_cursor = if index == 0 {
                    Cursor::Start
                } else {
                    Cursor::Next(range.start.to_string())
                };
                let record = PageRecord::new(sequence, request_cursor, next_cursor, payload);
                let value = record.to_value().map_err(persist_err)?;
                self.pages.write(&key, &value).map_err(persist_err)?;
                sync_info!(
                    "Looked up relationships {}..{} of {}",
                    range.start,
                    range.end,
                    identifiers.len()
                );
                record.payload
            };

            relationships.extend(decode_relationships(&payload).map_err(decode_err)?);
        }

        Ok(relationships)
    }
}
