use std::collections::HashSet;
use std::time::Duration;

use graphsync_core::{ActionQueue, Identifier};
use graphsync_logging::{sync_info, sync_warn};
use thiserror::Error;

use crate::api::{ApiError, GraphApi, Mutation};
use crate::ledger::AppendLog;
use crate::persist::PersistError;
use crate::store::PageStore;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("{mutation} {identifier} failed after {completed} completed actions")]
    Remote {
        mutation: Mutation,
        identifier: Identifier,
        completed: usize,
        #[source]
        source: ApiError,
    },
    #[error("could not record {mutation} {identifier}")]
    Persist {
        mutation: Mutation,
        identifier: Identifier,
        #[source]
        source: PersistError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionReport {
    /// Identifiers the remote accepted, in order.
    pub completed: Vec<Identifier>,
    /// Identifiers that failed with a recoverable code and were logged anyway.
    pub skipped_blocked: Vec<Identifier>,
    /// Identifiers already present in the ledger, not sent.
    pub already_logged: Vec<Identifier>,
}

/// Replays an action queue against one mutation, one call at a time.
pub struct Executor<'a> {
    api: &'a dyn GraphApi,
    pages: &'a dyn PageStore,
    ledger: &'a dyn AppendLog,
    delay: Duration,
    recoverable_codes: &'a [u32],
}

impl<'a> Executor<'a> {
    pub fn new(
        api: &'a dyn GraphApi,
        pages: &'a dyn PageStore,
        ledger: &'a dyn AppendLog,
        delay: Duration,
        recoverable_codes: &'a [u32],
    ) -> Self {
        Self {
            api,
            pages,
            ledger,
            delay,
            recoverable_codes,
        }
    }

    /// Runs `queue` in order. A success or a recoverable failure appends the
    /// identifier to the mutation's ledger; any other failure stops the run
    /// with everything before it already logged.
    pub async fn run(
        &self,
        mutation: Mutation,
        queue: &ActionQueue,
    ) -> Result<ExecutionReport, ExecuteError> {
        let log = mutation.ledger();
        let logged: HashSet<String> = match self.ledger.read_lines(log) {
            Ok(lines) => lines.into_iter().collect(),
            Err(err) => {
                sync_warn!("Ignoring unreadable ledger {}: {}", log, err);
                HashSet::new()
            }
        };

        let mut report = ExecutionReport::default();
        let mut issued = 0usize;
        for (position, action) in queue.iter().enumerate() {
            let identifier = action.identifier.as_str();
            if logged.contains(identifier) {
                report.already_logged.push(identifier.to_string());
                continue;
            }
            if issued > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            issued += 1;

            sync_info!(
                "{} {}/{} (ordinal {}): {}",
                mutation,
                position + 1,
                queue.len(),
                action.ordinal,
                identifier
            );
            let persist_err = |source| ExecuteError::Persist {
                mutation,
                identifier: identifier.to_string(),
                source,
            };
            match self.api.mutate(mutation, identifier).await {
                Ok(response) => {
                    self.pages
                        .write_slot(mutation.audit_slot(), &response)
                        .map_err(persist_err)?;
                    self.ledger
                        .append_line(log, identifier)
                        .map_err(persist_err)?;
                    report.completed.push(identifier.to_string());
                }
                Err(err) if err.has_any_code(self.recoverable_codes) => {
                    sync_warn!("{} {} refused ({}); marking as processed", mutation, identifier, err);
                    self.ledger
                        .append_line(log, identifier)
                        .map_err(persist_err)?;
                    report.skipped_blocked.push(identifier.to_string());
                }
                Err(source) => {
                    return Err(ExecuteError::Remote {
                        mutation,
                        identifier: identifier.to_string(),
                        completed: report.completed.len() + report.skipped_blocked.len(),
                        source,
                    });
                }
            }
        }

        Ok(report)
    }
}
