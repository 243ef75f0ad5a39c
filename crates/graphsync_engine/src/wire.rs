//! Decoding of the remote JSON payloads the engine relies on.

use graphsync_core::{Identifier, Relationship};
use serde::Deserialize;
use serde_json::Value;

use crate::api::{ApiError, Cursor, RemoteError};

/// The cursor value the remote uses for "no more pages".
const TERMINAL_CURSOR: &str = "0";

#[derive(Debug, Deserialize)]
struct UserRef {
    screen_name: Identifier,
    #[serde(default)]
    friends_count: u64,
    #[serde(default)]
    followers_count: u64,
}

#[derive(Debug, Deserialize)]
struct FriendsPage {
    #[serde(default)]
    users: Vec<UserRef>,
    next_cursor_str: Option<String>,
    next_cursor: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    statuses: Vec<Status>,
    #[serde(default)]
    search_metadata: SearchMetadata,
}

#[derive(Debug, Deserialize)]
struct Status {
    user: UserRef,
}

#[derive(Debug, Default, Deserialize)]
struct SearchMetadata {
    next_results: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupEntry {
    screen_name: Identifier,
    #[serde(default)]
    connections: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<RemoteError>,
}

/// Identifiers and continuation cursor of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub identifiers: Vec<Identifier>,
    /// Items present on the page that are not candidates. They still count
    /// as seen when deciding whether a page brought anything new.
    pub ineligible: Vec<Identifier>,
    pub next_cursor: Cursor,
}

pub fn decode_following(payload: &Value) -> Result<DecodedPage, ApiError> {
    let page: FriendsPage = from_value(payload)?;
    let next = match (page.next_cursor_str, page.next_cursor) {
        (Some(token), _) => token,
        (None, Some(number)) => number.to_string(),
        (None, None) => TERMINAL_CURSOR.to_string(),
    };
    let next_cursor = if next == TERMINAL_CURSOR {
        Cursor::Exhausted
    } else {
        Cursor::Next(next)
    };
    Ok(DecodedPage {
        identifiers: page.users.into_iter().map(|u| u.screen_name).collect(),
        ineligible: Vec::new(),
        next_cursor,
    })
}

/// Authors of matching posts who follow at least as many accounts as follow them.
pub fn decode_search(payload: &Value) -> Result<DecodedPage, ApiError> {
    let page: SearchPage = from_value(payload)?;
    let next_cursor = page
        .search_metadata
        .next_results
        .as_deref()
        .and_then(max_id_from_query)
        .map(Cursor::Next)
        .unwrap_or(Cursor::Exhausted);
    let (eligible, ineligible): (Vec<Status>, Vec<Status>) = page
        .statuses
        .into_iter()
        .partition(|status| status.user.friends_count >= status.user.followers_count);
    Ok(DecodedPage {
        identifiers: eligible.into_iter().map(|s| s.user.screen_name).collect(),
        ineligible: ineligible.into_iter().map(|s| s.user.screen_name).collect(),
        next_cursor,
    })
}

pub fn decode_relationships(payload: &Value) -> Result<Vec<Relationship>, ApiError> {
    let entries: Vec<LookupEntry> = from_value(payload)?;
    Ok(entries
        .into_iter()
        .map(|entry| Relationship {
            identifier: entry.screen_name,
            connections: entry.connections,
        })
        .collect())
}

/// Remote error entries from a failed response body; empty if the body has none.
pub fn decode_errors(body: &str) -> Vec<RemoteError> {
    serde_json::from_str::<ErrorBody>(body)
        .map(|body| body.errors)
        .unwrap_or_default()
}

fn max_id_from_query(next_results: &str) -> Option<String> {
    url::form_urlencoded::parse(next_results.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == "max_id")
        .map(|(_, value)| value.into_owned())
}

fn from_value<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, ApiError> {
    T::deserialize(payload).map_err(|err| ApiError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn following_page_with_zero_cursor_is_terminal() {
        let page = decode_following(&json!({
            "users": [{"screen_name": "a"}, {"screen_name": "b"}],
            "next_cursor": 0,
            "next_cursor_str": "0"
        }))
        .unwrap();
        assert_eq!(page.identifiers, vec!["a", "b"]);
        assert_eq!(page.next_cursor, Cursor::Exhausted);
    }

    #[test]
    fn following_page_keeps_string_cursor() {
        let page = decode_following(&json!({
            "users": [],
            "next_cursor": 1489467234237774933_i64,
            "next_cursor_str": "1489467234237774933"
        }))
        .unwrap();
        assert_eq!(page.next_cursor, Cursor::Next("1489467234237774933".into()));
    }

    #[test]
    fn search_page_filters_authors_and_reads_max_id() {
        let page = decode_search(&json!({
            "statuses": [
                {"user": {"screen_name": "keen", "friends_count": 500, "followers_count": 100}},
                {"user": {"screen_name": "famous", "friends_count": 10, "followers_count": 9000}}
            ],
            "search_metadata": {"next_results": "?max_id=998&q=%23rust&count=100"}
        }))
        .unwrap();
        assert_eq!(page.identifiers, vec!["keen"]);
        assert_eq!(page.ineligible, vec!["famous"]);
        assert_eq!(page.next_cursor, Cursor::Next("998".into()));
    }

    #[test]
    fn search_page_without_next_results_is_terminal() {
        let page = decode_search(&json!({"statuses": [], "search_metadata": {}})).unwrap();
        assert_eq!(page.next_cursor, Cursor::Exhausted);
    }

    #[test]
    fn error_codes_are_extracted() {
        let errors = decode_errors(
            r#"{"errors":[{"code":162,"message":"You have been blocked from following this account at the request of the user."}]}"#,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, 162);
        assert!(decode_errors("<html>").is_empty());
    }
}
