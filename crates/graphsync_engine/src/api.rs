use std::fmt;

use graphsync_core::Identifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Continuation position within a paged remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "token", rename_all = "snake_case")]
pub enum Cursor {
    Start,
    Next(String),
    Exhausted,
}

impl Cursor {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Cursor::Exhausted)
    }
}

/// Relationship-changing calls the executor can replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Follow,
    Unfollow,
}

impl Mutation {
    /// Single-slot record holding the raw response of the latest call.
    pub fn audit_slot(self) -> &'static str {
        match self {
            Mutation::Follow => "friendships-create",
            Mutation::Unfollow => "friendships-destroy",
        }
    }

    /// Ledger of identifiers this mutation has already been applied to.
    pub fn ledger(self) -> &'static str {
        match self {
            Mutation::Follow => "followed.txt",
            Mutation::Unfollow => "unfollowed.txt",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Follow => write!(f, "follow"),
            Mutation::Unfollow => write!(f, "unfollow"),
        }
    }
}

/// One entry of the remote `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("http status {status}{}", describe(.errors))]
    Remote {
        status: u16,
        errors: Vec<RemoteError>,
    },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("could not sign request: {0}")]
    Signing(String),
    #[error("no page follows an exhausted cursor")]
    CursorExhausted,
}

impl ApiError {
    /// Remote error codes carried by this error, if any.
    pub fn codes(&self) -> Vec<u32> {
        match self {
            ApiError::Remote { errors, .. } => errors.iter().map(|e| e.code).collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_any_code(&self, codes: &[u32]) -> bool {
        self.codes().iter().any(|code| codes.contains(code))
    }
}

fn describe(errors: &[RemoteError]) -> String {
    errors
        .iter()
        .map(|e| format!(" [{}] {}", e.code, e.message))
        .collect()
}

/// The social-graph service, one awaited call per request.
///
/// Every method returns the raw JSON body so callers can persist it verbatim.
#[async_trait::async_trait]
pub trait GraphApi: Send + Sync {
    /// One page of the accounts `account` follows, newest first.
    async fn list_following(
        &self,
        account: &str,
        cursor: &Cursor,
        page_size: u32,
    ) -> Result<Value, ApiError>;

    /// One page of recent posts matching `query`.
    async fn search_recent(
        &self,
        query: &str,
        cursor: &Cursor,
        page_size: u32,
    ) -> Result<Value, ApiError>;

    /// Relationship status for up to 100 accounts.
    async fn lookup_relationships(&self, identifiers: &[Identifier]) -> Result<Value, ApiError>;

    async fn mutate(&self, mutation: Mutation, identifier: &str) -> Result<Value, ApiError>;
}
