#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use graphsync_engine::{ApiError, Cursor, GraphApi, Mutation, RemoteError, SyncSettings};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Following(Cursor),
    Search(Cursor),
    Lookup(Vec<String>),
    Mutate(Mutation, String),
}

/// Scripted remote. Page `k` of a paged endpoint is served for `Cursor::Next("k")`.
#[derive(Default)]
pub struct FakeApi {
    pub following_pages: Vec<Value>,
    pub search_pages: Vec<Value>,
    pub followers: HashSet<String>,
    pub mutation_failures: HashMap<String, ApiError>,
    pub fail_following_page: Option<usize>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutated(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Mutate(_, identifier) => Some(identifier),
                _ => None,
            })
            .collect()
    }

    pub fn lookups(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Lookup(identifiers) => Some(identifiers),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn page_index(cursor: &Cursor) -> usize {
    match cursor {
        Cursor::Start => 0,
        Cursor::Next(token) => token.parse().expect("numeric test cursor"),
        Cursor::Exhausted => panic!("request issued with exhausted cursor"),
    }
}

#[async_trait::async_trait]
impl GraphApi for FakeApi {
    async fn list_following(
        &self,
        _account: &str,
        cursor: &Cursor,
        _page_size: u32,
    ) -> Result<Value, ApiError> {
        self.record(Call::Following(cursor.clone()));
        let index = page_index(cursor);
        if self.fail_following_page == Some(index) {
            return Err(rate_limited());
        }
        self.following_pages
            .get(index)
            .cloned()
            .ok_or_else(|| ApiError::Transport(format!("no following page {index}")))
    }

    async fn search_recent(
        &self,
        _query: &str,
        cursor: &Cursor,
        _page_size: u32,
    ) -> Result<Value, ApiError> {
        self.record(Call::Search(cursor.clone()));
        let index = page_index(cursor);
        self.search_pages
            .get(index)
            .cloned()
            .ok_or_else(|| ApiError::Transport(format!("no search page {index}")))
    }

    async fn lookup_relationships(&self, identifiers: &[String]) -> Result<Value, ApiError> {
        self.record(Call::Lookup(identifiers.to_vec()));
        let entries: Vec<Value> = identifiers
            .iter()
            .map(|identifier| {
                let mut connections = vec!["following"];
                if self.followers.contains(identifier) {
                    connections.push("followed_by");
                }
                json!({"screen_name": identifier, "connections": connections})
            })
            .collect();
        Ok(Value::Array(entries))
    }

    async fn mutate(&self, mutation: Mutation, identifier: &str) -> Result<Value, ApiError> {
        self.record(Call::Mutate(mutation, identifier.to_string()));
        match self.mutation_failures.get(identifier) {
            Some(err) => Err(err.clone()),
            None => Ok(json!({"screen_name": identifier, "following": mutation == Mutation::Follow})),
        }
    }
}

/// Page `index` of the followed list; `last` marks the terminal page.
pub fn following_page(users: &[&str], index: usize, last: bool) -> Value {
    let next = if last { "0".to_string() } else { (index + 1).to_string() };
    json!({
        "users": users.iter().map(|u| json!({"screen_name": u})).collect::<Vec<_>>(),
        "next_cursor": next.parse::<i64>().unwrap(),
        "next_cursor_str": next,
    })
}

/// Page `index` of search results; every author follows more accounts than follow them.
pub fn search_page(authors: &[&str], index: usize, last: bool) -> Value {
    search_page_with_counts(authors, index, last, 300, 100)
}

/// Page `index` of search results whose authors have far more followers than friends.
pub fn popular_search_page(authors: &[&str], index: usize, last: bool) -> Value {
    search_page_with_counts(authors, index, last, 1, 9000)
}

fn search_page_with_counts(
    authors: &[&str],
    index: usize,
    last: bool,
    friends: u64,
    followers: u64,
) -> Value {
    let statuses: Vec<Value> = authors
        .iter()
        .map(|a| {
            json!({"user": {"screen_name": a, "friends_count": friends, "followers_count": followers}})
        })
        .collect();
    let metadata = if last {
        json!({})
    } else {
        json!({"next_results": format!("?max_id={}&q=rust", index + 1)})
    };
    json!({"statuses": statuses, "search_metadata": metadata})
}

pub fn blocked() -> ApiError {
    ApiError::Remote {
        status: 403,
        errors: vec![RemoteError {
            code: 162,
            message: "You have been blocked from following this account at the request of the user."
                .into(),
        }],
    }
}

pub fn rate_limited() -> ApiError {
    ApiError::Remote {
        status: 429,
        errors: vec![RemoteError {
            code: 88,
            message: "Rate limit exceeded".into(),
        }],
    }
}

pub fn immediate_settings() -> SyncSettings {
    SyncSettings {
        friends_page_delay: Duration::ZERO,
        search_page_delay: Duration::ZERO,
        lookup_delay: Duration::ZERO,
        mutation_delay: Duration::ZERO,
        ..SyncSettings::default()
    }
}

pub fn names(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}

pub fn init_logging() {
    graphsync_logging::initialize_for_tests();
}
