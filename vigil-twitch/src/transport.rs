//! Transport abstraction over the Helix HTTP API.
//!
//! Every Helix response carries `Ratelimit-*` headers describing the
//! token-bucket budget; the transport surfaces them so the connector can
//! fold them into its governor.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use url::Url;

use vigil_core::VigilError;

use crate::dto::{
    FollowersResponse, Page, SearchChannelItem, StreamItem, TokenResponse, UserItem,
};

/// Rate-budget snapshot from one response's headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Points remaining in the current window.
    pub remaining: u64,
    /// When the upstream refills the bucket.
    pub reset: DateTime<Utc>,
}

/// A payload plus whatever rate information rode along with it.
#[derive(Debug, Clone)]
pub struct HelixResponse<T> {
    /// Decoded payload.
    pub body: T,
    /// Rate headers, when the upstream sent them.
    pub rate_limit: Option<RateLimitInfo>,
}

/// Minimal surface of Helix the connector needs.
#[async_trait]
pub trait HelixTransport: Send + Sync {
    /// POST /oauth2/token (client credentials).
    async fn token(&self) -> Result<TokenResponse, VigilError>;

    /// GET /search/channels, live only.
    async fn search_channels(
        &self,
        bearer: &str,
        query: &str,
        first: u32,
    ) -> Result<HelixResponse<Page<SearchChannelItem>>, VigilError>;

    /// GET /streams filtered by category.
    async fn streams_by_category(
        &self,
        bearer: &str,
        game_id: &str,
        first: u32,
    ) -> Result<HelixResponse<Page<StreamItem>>, VigilError>;

    /// GET /streams filtered by up to 100 user ids.
    async fn streams_by_users(
        &self,
        bearer: &str,
        user_ids: &[String],
    ) -> Result<HelixResponse<Page<StreamItem>>, VigilError>;

    /// GET /users for one id.
    async fn user(
        &self,
        bearer: &str,
        user_id: &str,
    ) -> Result<HelixResponse<Page<UserItem>>, VigilError>;

    /// GET /channels/followers total for one broadcaster.
    async fn follower_total(
        &self,
        bearer: &str,
        broadcaster_id: &str,
    ) -> Result<HelixResponse<FollowersResponse>, VigilError>;
}

/// Real transport over reqwest.
pub struct HttpTransport {
    http: reqwest::Client,
    api_base: Url,
    auth_base: Url,
    client_id: String,
    client_secret: String,
}

impl HttpTransport {
    /// Build a transport against the production endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, VigilError> {
        Self::with_bases(
            client_id,
            client_secret,
            "https://api.twitch.tv/helix/",
            "https://id.twitch.tv/",
        )
    }

    /// Build a transport against custom endpoints (tests, proxies).
    pub fn with_bases(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        api_base: &str,
        auth_base: &str,
    ) -> Result<Self, VigilError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| VigilError::upstream("vigil-twitch", e.to_string()))?;
        Ok(Self {
            http,
            api_base: Url::parse(api_base)
                .map_err(|e| VigilError::InvalidArg(format!("bad api base: {e}")))?,
            auth_base: Url::parse(auth_base)
                .map_err(|e| VigilError::InvalidArg(format!("bad auth base: {e}")))?,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, VigilError> {
        self.api_base
            .join(path)
            .map_err(|e| VigilError::InvalidArg(format!("bad endpoint {path}: {e}")))
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        bearer: &str,
    ) -> Result<HelixResponse<T>, VigilError> {
        let response = self
            .http
            .get(url)
            .header("Client-ID", &self.client_id)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        let rate_limit = rate_limit_from_headers(response.headers());
        let status = response.status();
        if status.is_success() {
            let body = response
                .json::<T>()
                .await
                .map_err(|e| VigilError::parse(format!("malformed payload: {e}")))?;
            Ok(HelixResponse { body, rate_limit })
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(VigilError::auth("vigil-twitch", format!("status {status}")))
        } else if status.as_u16() == 429 {
            let reset_in_ms = rate_limit
                .map(|info| (info.reset - Utc::now()).num_milliseconds().max(0) as u64)
                .unwrap_or(0);
            Err(VigilError::RateLimited { reset_in_ms })
        } else if status.is_server_error() {
            Err(VigilError::upstream(
                "vigil-twitch",
                format!("status {status}"),
            ))
        } else {
            Err(VigilError::parse(format!("unexpected status {status}")))
        }
    }
}

fn map_reqwest_err(e: reqwest::Error) -> VigilError {
    VigilError::upstream("vigil-twitch", e.to_string())
}

/// Decode `Ratelimit-Remaining` / `Ratelimit-Reset` (unix epoch seconds).
pub fn rate_limit_from_headers(headers: &reqwest::header::HeaderMap) -> Option<RateLimitInfo> {
    let remaining = headers
        .get("Ratelimit-Remaining")?
        .to_str()
        .ok()?
        .parse()
        .ok()?;
    let reset_epoch: i64 = headers.get("Ratelimit-Reset")?.to_str().ok()?.parse().ok()?;
    let reset = Utc.timestamp_opt(reset_epoch, 0).single()?;
    Some(RateLimitInfo { remaining, reset })
}

#[async_trait]
impl HelixTransport for HttpTransport {
    async fn token(&self) -> Result<TokenResponse, VigilError> {
        let url = self
            .auth_base
            .join("oauth2/token")
            .map_err(|e| VigilError::InvalidArg(format!("bad auth endpoint: {e}")))?;
        let response = self
            .http
            .post(url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(map_reqwest_err)?;
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| VigilError::parse(format!("malformed token payload: {e}")))
        } else {
            Err(VigilError::auth("vigil-twitch", format!("status {status}")))
        }
    }

    async fn search_channels(
        &self,
        bearer: &str,
        query: &str,
        first: u32,
    ) -> Result<HelixResponse<Page<SearchChannelItem>>, VigilError> {
        let mut url = self.endpoint("search/channels")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("live_only", "true")
            .append_pair("first", &first.to_string());
        self.get_page(url, bearer).await
    }

    async fn streams_by_category(
        &self,
        bearer: &str,
        game_id: &str,
        first: u32,
    ) -> Result<HelixResponse<Page<StreamItem>>, VigilError> {
        let mut url = self.endpoint("streams")?;
        url.query_pairs_mut()
            .append_pair("game_id", game_id)
            .append_pair("type", "live")
            .append_pair("first", &first.to_string());
        self.get_page(url, bearer).await
    }

    async fn streams_by_users(
        &self,
        bearer: &str,
        user_ids: &[String],
    ) -> Result<HelixResponse<Page<StreamItem>>, VigilError> {
        let mut url = self.endpoint("streams")?;
        {
            let mut pairs = url.query_pairs_mut();
            for id in user_ids {
                pairs.append_pair("user_id", id);
            }
        }
        self.get_page(url, bearer).await
    }

    async fn user(
        &self,
        bearer: &str,
        user_id: &str,
    ) -> Result<HelixResponse<Page<UserItem>>, VigilError> {
        let mut url = self.endpoint("users")?;
        url.query_pairs_mut().append_pair("id", user_id);
        self.get_page(url, bearer).await
    }

    async fn follower_total(
        &self,
        bearer: &str,
        broadcaster_id: &str,
    ) -> Result<HelixResponse<FollowersResponse>, VigilError> {
        let mut url = self.endpoint("channels/followers")?;
        url.query_pairs_mut()
            .append_pair("broadcaster_id", broadcaster_id);
        self.get_page(url, bearer).await
    }
}
