//! Transport abstraction over the upstream HTTP API.
//!
//! Split out as a trait so tests can inject fakes without a network.

use async_trait::async_trait;
use url::Url;

use vigil_core::VigilError;

use crate::dto::{ChannelListResponse, SearchResponse, VideoListResponse};

/// Minimal surface of the Data API the connector needs.
#[async_trait]
pub trait YtTransport: Send + Sync {
    /// search.list scoped to live video events.
    async fn search_live(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<SearchResponse, VigilError>;

    /// videos.list for up to 50 ids.
    async fn videos(&self, ids: &[String]) -> Result<VideoListResponse, VigilError>;

    /// channels.list for one id.
    async fn channel(&self, channel_id: &str) -> Result<ChannelListResponse, VigilError>;

    /// Raw per-channel Atom feed. Costs no quota.
    async fn fetch_feed(&self, channel_id: &str) -> Result<String, VigilError>;
}

/// Real transport over reqwest.
pub struct HttpTransport {
    http: reqwest::Client,
    api_base: Url,
    feed_base: Url,
    api_key: String,
}

impl HttpTransport {
    /// Build a transport against the production endpoints.
    pub fn new(api_key: impl Into<String>) -> Result<Self, VigilError> {
        Self::with_bases(
            api_key,
            "https://www.googleapis.com/youtube/v3/",
            "https://www.youtube.com/feeds/",
        )
    }

    /// Build a transport against custom endpoints (tests, proxies).
    pub fn with_bases(
        api_key: impl Into<String>,
        api_base: &str,
        feed_base: &str,
    ) -> Result<Self, VigilError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| VigilError::upstream("vigil-youtube", e.to_string()))?;
        Ok(Self {
            http,
            api_base: Url::parse(api_base)
                .map_err(|e| VigilError::InvalidArg(format!("bad api base: {e}")))?,
            feed_base: Url::parse(feed_base)
                .map_err(|e| VigilError::InvalidArg(format!("bad feed base: {e}")))?,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, VigilError> {
        self.api_base
            .join(path)
            .map_err(|e| VigilError::InvalidArg(format!("bad endpoint {path}: {e}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, VigilError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| VigilError::parse(format!("malformed payload: {e}")))
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(VigilError::auth(
                "vigil-youtube",
                format!("status {status}"),
            ))
        } else if status.is_server_error() || status.as_u16() == 429 {
            Err(VigilError::upstream(
                "vigil-youtube",
                format!("status {status}"),
            ))
        } else {
            Err(VigilError::parse(format!("unexpected status {status}")))
        }
    }
}

fn map_reqwest_err(e: reqwest::Error) -> VigilError {
    VigilError::upstream("vigil-youtube", e.to_string())
}

#[async_trait]
impl YtTransport for HttpTransport {
    async fn search_live(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<SearchResponse, VigilError> {
        let mut url = self.endpoint("search")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("eventType", "live")
            .append_pair("q", query)
            .append_pair("maxResults", &max_results.to_string())
            .append_pair("relevanceLanguage", "en")
            .append_pair("safeSearch", "none")
            .append_pair("key", &self.api_key);
        self.get_json(url).await
    }

    async fn videos(&self, ids: &[String]) -> Result<VideoListResponse, VigilError> {
        let mut url = self.endpoint("videos")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet,liveStreamingDetails,statistics")
            .append_pair("id", &ids.join(","))
            .append_pair("key", &self.api_key);
        self.get_json(url).await
    }

    async fn channel(&self, channel_id: &str) -> Result<ChannelListResponse, VigilError> {
        let mut url = self.endpoint("channels")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet,statistics")
            .append_pair("id", channel_id)
            .append_pair("key", &self.api_key);
        self.get_json(url).await
    }

    async fn fetch_feed(&self, channel_id: &str) -> Result<String, VigilError> {
        let mut url = self
            .feed_base
            .join("videos.xml")
            .map_err(|e| VigilError::InvalidArg(format!("bad feed endpoint: {e}")))?;
        url.query_pairs_mut().append_pair("channel_id", channel_id);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(VigilError::upstream(
                "vigil-youtube",
                format!("feed status {status}"),
            ));
        }
        response.text().await.map_err(map_reqwest_err)
    }
}
