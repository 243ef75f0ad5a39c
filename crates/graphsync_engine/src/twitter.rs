use graphsync_core::Identifier;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::account::Credentials;
use crate::api::{ApiError, Cursor, GraphApi, Mutation};
use crate::oauth::RequestSigner;
use crate::settings::SyncSettings;
use crate::wire::decode_errors;

/// `GraphApi` over the v1.1 REST endpoints with OAuth 1.0a user context.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    base_url: String,
    signer: RequestSigner,
}

impl TwitterClient {
    pub fn new(settings: &SyncSettings, credentials: Credentials) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            signer: RequestSigner::new(credentials),
        })
    }

    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(String, String)>,
    ) -> Result<Value, ApiError> {
        let url = Url::parse(&format!("{}/{endpoint}", self.base_url))
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        let authorization = self.signer.authorization(method.as_str(), &url, &params)?;

        let request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, authorization);
        let request = if method == Method::GET {
            request.query(&params)
        } else {
            request.form(&params)
        };

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(ApiError::Remote {
                status: status.as_u16(),
                errors: decode_errors(&body),
            });
        }
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait::async_trait]
impl GraphApi for TwitterClient {
    async fn list_following(
        &self,
        account: &str,
        cursor: &Cursor,
        page_size: u32,
    ) -> Result<Value, ApiError> {
        let cursor = match cursor {
            Cursor::Start => "-1".to_string(),
            Cursor::Next(token) => token.clone(),
            Cursor::Exhausted => return Err(ApiError::CursorExhausted),
        };
        let params = pairs(&[
            ("count", page_size.to_string()),
            ("cursor", cursor),
            ("include_user_entities", "false".into()),
            ("screen_name", account.to_string()),
            ("skip_status", "true".into()),
        ]);
        self.call(Method::GET, "friends/list.json", params).await
    }

    async fn search_recent(
        &self,
        query: &str,
        cursor: &Cursor,
        page_size: u32,
    ) -> Result<Value, ApiError> {
        let mut params = pairs(&[
            ("count", page_size.to_string()),
            ("include_entities", "false".into()),
            ("q", query.to_string()),
            ("result_type", "recent".into()),
        ]);
        match cursor {
            Cursor::Start => {}
            Cursor::Next(max_id) => params.push(("max_id".into(), max_id.clone())),
            Cursor::Exhausted => return Err(ApiError::CursorExhausted),
        }
        self.call(Method::GET, "search/tweets.json", params).await
    }

    async fn lookup_relationships(&self, identifiers: &[Identifier]) -> Result<Value, ApiError> {
        let params = pairs(&[("screen_name", identifiers.join(","))]);
        self.call(Method::GET, "friendships/lookup.json", params).await
    }

    async fn mutate(&self, mutation: Mutation, identifier: &str) -> Result<Value, ApiError> {
        let (endpoint, params) = match mutation {
            Mutation::Follow => (
                "friendships/create.json",
                pairs(&[("follow", "false".into()), ("screen_name", identifier.to_string())]),
            ),
            Mutation::Unfollow => (
                "friendships/destroy.json",
                pairs(&[("screen_name", identifier.to_string())]),
            ),
        };
        self.call(Method::POST, endpoint, params).await
    }
}

fn pairs(items: &[(&str, String)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    ApiError::Transport(err.to_string())
}
