//! Reddit API bindings for Rust
//! Provides an app-only OAuth client to read subreddit listings, subreddit metadata and posts by id

mod model;

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{redirect, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

pub use model::{GalleryData, GalleryItem, Media, MediaMetadata, MediaSource, Post, RedditVideo, Subreddit};

use model::Listing;

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_URL: &str = "https://oauth.reddit.com";

/// Tokens are refreshed this long before reddit says they expire
const TOKEN_SLACK: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum RedditError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Authentication rejected")]
    Unauthorized,
    #[error("Rate limited by reddit")]
    RateLimited,
    #[error("Unexpected status {0}")]
    Status(u16),
    #[error("Invalid header value")]
    InvalidHeader,
}

impl RedditError {
    /// True when the requested subreddit or post does not exist (or is hidden from us)
    pub fn is_not_found(&self) -> bool {
        matches!(self, RedditError::NotFound(_) | RedditError::Forbidden(_))
    }
}

/// Time window for `top` listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    Day,
    Week,
    Month,
}

impl TimeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
        }
    }
}

/// Listing order of a subreddit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    New,
    Hot,
    Top(TimeFilter),
}

impl Sort {
    fn path(&self) -> &'static str {
        match self {
            Sort::New => "new",
            Sort::Hot => "hot",
            Sort::Top(_) => "top",
        }
    }

    fn time_filter(&self) -> Option<TimeFilter> {
        match self {
            Sort::Top(t) => Some(*t),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_SLACK < self.expires_at
    }
}

pub struct RedditClient {
    client: Client,
    client_id: String,
    client_secret: String,
    auth_url: String,
    api_url: String,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, RedditError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|_| RedditError::InvalidHeader)?,
        );

        // Reddit answers unknown subreddits with a redirect to its search page
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_url: AUTH_URL.to_string(),
            api_url: API_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Point the client at different token and API endpoints
    pub fn with_endpoints(mut self, auth_url: &str, api_url: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch an application-only token with the client credentials grant
    async fn fetch_token(&self) -> Result<AccessToken, RedditError> {
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(RedditError::Unauthorized);
        }

        let body: TokenResponse = response.error_for_status()?.json().await?;
        Ok(AccessToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }

    async fn access_token(&self) -> Result<String, RedditError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RedditError> {
        let mut retried = false;
        loop {
            let token = self.access_token().await?;
            let response = self
                .client
                .get(format!("{}{}", self.api_url, path))
                .bearer_auth(&token)
                .query(&[("raw_json", "1")])
                .query(query)
                .send()
                .await?;

            match check_status(response.status(), path) {
                Ok(()) => return Ok(response.json().await?),
                // Tokens can be revoked before their advertised expiry
                Err(RedditError::Unauthorized) if !retried => {
                    retried = true;
                    self.invalidate_token().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// List posts of a subreddit in the given order
    pub async fn listing(
        &self,
        subreddit: &str,
        sort: Sort,
        limit: u32,
    ) -> Result<Vec<Post>, RedditError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(t) = sort.time_filter() {
            query.push(("t", t.as_str().to_string()));
        }

        let listing: Listing<Post> = self
            .get_json(&format!("/r/{}/{}", subreddit, sort.path()), &query)
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter(|t| t.kind == "t3")
            .map(|t| t.data)
            .collect())
    }

    /// Read subreddit metadata, failing with NotFound if it does not exist
    pub async fn about(&self, subreddit: &str) -> Result<Subreddit, RedditError> {
        let path = format!("/r/{}/about", subreddit);
        let thing: model::Thing<serde_json::Value> = self.get_json(&path, &[]).await?;

        // Banned or unknown names come back as an empty listing instead of a t5
        if thing.kind != "t5" {
            return Err(RedditError::NotFound(path));
        }

        serde_json::from_value(thing.data).map_err(|_| RedditError::NotFound(path))
    }

    /// Look up a single post by its base36 id
    pub async fn post(&self, id: &str) -> Result<Option<Post>, RedditError> {
        let listing: Listing<Post> = self
            .get_json(&format!("/by_id/t3_{}", id), &[])
            .await?;

        Ok(listing.data.children.into_iter().next().map(|t| t.data))
    }
}

/// Map a response status onto the error taxonomy of this crate
fn check_status(status: StatusCode, path: &str) -> Result<(), RedditError> {
    if status.is_success() {
        return Ok(());
    }
    if status.is_redirection() || status == StatusCode::NOT_FOUND {
        return Err(RedditError::NotFound(path.to_string()));
    }

    match status {
        StatusCode::FORBIDDEN => Err(RedditError::Forbidden(path.to_string())),
        StatusCode::UNAUTHORIZED => Err(RedditError::Unauthorized),
        StatusCode::TOO_MANY_REQUESTS => Err(RedditError::RateLimited),
        other => Err(RedditError::Status(other.as_u16())),
    }
}

/// Create a new reddit client with the default endpoints
pub fn create_client(
    client_id: &str,
    client_secret: &str,
    user_agent: &str,
    timeout: Duration,
) -> Result<RedditClient, RedditError> {
    RedditClient::new(client_id, client_secret, user_agent, timeout)
}
