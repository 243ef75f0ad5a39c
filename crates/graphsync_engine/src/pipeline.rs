//! The two top-level operations: follow fresh accounts found by a search, and
//! unfollow accounts that do not follow back.

use std::collections::HashSet;

use graphsync_core::{
    ActionQueue, ExclusionSet, ExclusionSource, Identifier, UnfollowCandidate, UnfollowPolicy,
};
use graphsync_logging::{sync_info, sync_warn};
use serde::Deserialize;
use thiserror::Error;

use crate::api::{GraphApi, Mutation};
use crate::executor::{ExecuteError, ExecutionReport, Executor};
use crate::ledger::AppendLog;
use crate::lookup::{BatchLookup, RELATIONSHIPS};
use crate::paginate::{
    stored_identifiers, FollowingCollection, PaginateError, Paginator, SearchCollection, FOLLOWING,
    SEARCH,
};
use crate::persist::PersistError;
use crate::settings::SyncSettings;
use crate::store::{PageKey, PageStore};

/// Computed unfollow candidate sets, one record per run.
pub const REJECTS: &str = "not-following-back";
/// Operator whitelist slot, read only.
pub const WHITELIST: &str = "whitelist";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("could not reset stored pages")]
    Reset(#[source] PersistError),
    #[error("collecting pages failed")]
    Paginate(#[from] PaginateError),
    #[error("could not store the candidate set")]
    Candidates(#[source] PersistError),
    #[error("applying actions failed")]
    Execute(#[from] ExecuteError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Identifiers that passed filtering and were queued.
    pub queued: usize,
    pub report: ExecutionReport,
}

/// One account's pipelines over a remote API and its durable state.
pub struct Pipeline<'a> {
    pub account: &'a str,
    pub settings: &'a SyncSettings,
    pub api: &'a dyn GraphApi,
    pub pages: &'a dyn PageStore,
    pub ledger: &'a dyn AppendLog,
}

impl<'a> Pipeline<'a> {
    /// Searches recent posts for `query` and follows up to `count` new authors.
    pub async fn follow(&self, count: usize, query: &str) -> Result<RunSummary, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::Validation("search query is empty".into()));
        }
        if count == 0 {
            sync_info!("Nothing to follow for {}", self.account);
            return Ok(RunSummary::default());
        }

        let exclusions = self.follow_exclusions();
        sync_info!(
            "Excluding {} accounts ({} followed, {} processed, {} rejected, {} whitelisted)",
            exclusions.len(),
            exclusions.contributed_by(ExclusionSource::Relationships),
            exclusions.contributed_by(ExclusionSource::Processed),
            exclusions.contributed_by(ExclusionSource::Rejected),
            exclusions.contributed_by(ExclusionSource::Whitelisted),
        );

        self.pages.purge(SEARCH).map_err(PipelineError::Reset)?;
        let search = SearchCollection {
            query: query.to_string(),
            page_size: self.settings.search_page_size,
            max_pages: self.settings.search_max_pages,
            delay: self.settings.search_page_delay,
        };
        let harvest = Paginator::new(self.api, self.pages)
            .drain_until(&search, |found| exclusions.filter(found).len() >= count)
            .await?;

        let mut queue = exclusions.filter(&harvest.identifiers);
        sync_info!(
            "{} of {} discovered accounts are usable",
            queue.len(),
            harvest.identifiers.len()
        );
        queue.truncate(count);

        let report = self.executor().run(Mutation::Follow, &queue).await?;
        Ok(RunSummary {
            queued: queue.len(),
            report,
        })
    }

    /// Unfollows accounts that do not follow back, sparing the most recently
    /// followed and the whitelisted.
    pub async fn unfollow(&self) -> Result<RunSummary, PipelineError> {
        let following = FollowingCollection {
            account: self.account.to_string(),
            page_size: self.settings.friends_page_size,
            delay: self.settings.friends_page_delay,
        };
        self.pages.purge(RELATIONSHIPS).map_err(PipelineError::Reset)?;
        self.pages.purge(FOLLOWING).map_err(PipelineError::Reset)?;

        let harvest = Paginator::new(self.api, self.pages).drain(&following).await?;
        sync_info!("{} follows {} accounts", self.account, harvest.identifiers.len());

        let relationships = BatchLookup::new(
            self.api,
            self.pages,
            self.settings.lookup_batch_size,
            self.settings.lookup_delay,
        )
        .run(&harvest.identifiers)
        .await?;

        let whitelist: HashSet<Identifier> = self.whitelist().into_iter().collect();
        let policy = UnfollowPolicy {
            protect_recent: self.settings.protect_recent,
        };
        let candidates = policy.select(&harvest.identifiers, &relationships, &whitelist);
        sync_info!("{} accounts do not follow back", candidates.len());
        self.record_candidates(&candidates)?;

        let queue: ActionQueue = candidates.into_iter().collect();
        let report = self.executor().run(Mutation::Unfollow, &queue).await?;
        Ok(RunSummary {
            queued: queue.len(),
            report,
        })
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(
            self.api,
            self.pages,
            self.ledger,
            self.settings.mutation_delay,
            &self.settings.recoverable_error_codes,
        )
    }

    /// Everything the follow pipeline must skip, rebuilt from durable state.
    pub fn follow_exclusions(&self) -> ExclusionSet {
        let following = FollowingCollection {
            account: self.account.to_string(),
            page_size: self.settings.friends_page_size,
            delay: self.settings.friends_page_delay,
        };
        let existing = stored_identifiers(self.pages, &following);
        let processed = self
            .ledger
            .read_lines(Mutation::Follow.ledger())
            .unwrap_or_else(|err| {
                sync_warn!("Ignoring follow ledger: {}", err);
                Vec::new()
            });

        ExclusionSet::new()
            .with(ExclusionSource::Relationships, existing)
            .with(ExclusionSource::Processed, processed)
            .with(ExclusionSource::Rejected, self.prior_rejects())
            .with(ExclusionSource::Whitelisted, self.whitelist())
    }

    /// Identifiers from every stored unfollow candidate set.
    pub fn prior_rejects(&self) -> Vec<Identifier> {
        let mut rejects = Vec::new();
        let count = self.pages.count(REJECTS);
        for sequence in 0..count {
            let key = PageKey::new(REJECTS, sequence);
            let parsed = self
                .pages
                .read(&key)
                .map_err(|err| err.to_string())
                .and_then(|value| {
                    serde_json::from_value::<Vec<UnfollowCandidate>>(value)
                        .map_err(|err| err.to_string())
                });
            match parsed {
                Ok(candidates) => rejects.extend(candidates.into_iter().map(|c| c.identifier)),
                Err(err) => sync_warn!("Ignoring {}: {}", key.file_name(), err),
            }
        }
        rejects
    }

    /// Operator whitelist; absent or unreadable means empty.
    pub fn whitelist(&self) -> Vec<Identifier> {
        let value = match self.pages.read_slot(WHITELIST) {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(err) => {
                sync_warn!("Ignoring whitelist: {}", err);
                return Vec::new();
            }
        };
        match serde_json::from_value::<Vec<WhitelistEntry>>(value) {
            Ok(entries) => entries.into_iter().map(WhitelistEntry::into_identifier).collect(),
            Err(err) => {
                sync_warn!("Ignoring whitelist: {}", err);
                Vec::new()
            }
        }
    }

    fn record_candidates(&self, candidates: &[UnfollowCandidate]) -> Result<(), PipelineError> {
        let value = serde_json::to_value(candidates).map_err(|source| {
            PipelineError::Candidates(PersistError::Malformed {
                name: REJECTS.to_string(),
                source,
            })
        })?;
        let key = self.pages.next_key(REJECTS);
        self.pages
            .write(&key, &value)
            .map_err(PipelineError::Candidates)?;
        sync_info!("Stored candidate set {}", key.file_name());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WhitelistEntry {
    Name(Identifier),
    User { screen_name: Identifier },
}

impl WhitelistEntry {
    fn into_identifier(self) -> Identifier {
        match self {
            WhitelistEntry::Name(name) => name,
            WhitelistEntry::User { screen_name } => screen_name,
        }
    }
}
