//! vigil-mock
//!
//! A scripted connector for orchestrator and scheduler tests: behaviors are
//! queued from the outside through a controller handle, and every call the
//! connector receives is recorded for later assertions.
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use vigil_core::connector::{
    ChannelProvider, DiscoveryProvider, FeedProvider, LivenessProvider, StreamConnector,
};
use vigil_core::{Channel, Governor, Stream, StreamUpdate, VigilError};
use vigil_types::{BreakerConfig, Platform, QuotaConfig, StreamStatus};

/// Instruction for how a scripted call should behave.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(VigilError),
    /// Sleep for the given duration, then return the value.
    Delayed(Duration, T),
    /// Hang until cancelled (simulate a wedged upstream call).
    Hang,
}

#[derive(Default)]
struct InternalState {
    discover_queue: Vec<MockBehavior<Vec<Stream>>>,
    resolve_queue: Vec<MockBehavior<Vec<Stream>>>,
    liveness_queue: Vec<MockBehavior<Vec<StreamUpdate>>>,
    channel_rules: HashMap<String, Channel>,
    feed_rules: HashMap<String, Vec<String>>,
    discover_calls: Vec<Vec<String>>,
    liveness_calls: Vec<Vec<String>>,
    auth_calls: u32,
    discovers_in_flight: u32,
    max_discovers_in_flight: u32,
}

/// Controller handle used by tests to script the mock and read call logs.
pub struct MockController {
    state: Arc<Mutex<InternalState>>,
}

impl MockController {
    /// Queue a behavior for the next unscripted `discover` call.
    pub async fn push_discovery(&self, behavior: MockBehavior<Vec<Stream>>) {
        self.state.lock().await.discover_queue.insert(0, behavior);
    }

    /// Queue a behavior for the next unscripted `check_liveness` call.
    pub async fn push_liveness(&self, behavior: MockBehavior<Vec<StreamUpdate>>) {
        self.state.lock().await.liveness_queue.insert(0, behavior);
    }

    /// Queue a behavior for the next unscripted `resolve` call.
    pub async fn push_resolve(&self, behavior: MockBehavior<Vec<Stream>>) {
        self.state.lock().await.resolve_queue.insert(0, behavior);
    }

    /// Script the channel returned for a platform channel id.
    pub async fn set_channel(&self, channel: Channel) {
        self.state
            .lock()
            .await
            .channel_rules
            .insert(channel.platform_channel_id.clone(), channel);
    }

    /// Script the feed hint ids for a platform channel id.
    pub async fn set_feed(&self, platform_channel_id: &str, ids: Vec<String>) {
        self.state
            .lock()
            .await
            .feed_rules
            .insert(platform_channel_id.to_string(), ids);
    }

    /// Keyword lists passed to `discover` so far.
    pub async fn discover_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().await.discover_calls.clone()
    }

    /// Id batches passed to `check_liveness` so far.
    pub async fn liveness_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().await.liveness_calls.clone()
    }

    /// Number of `authenticate` calls so far.
    pub async fn auth_calls(&self) -> u32 {
        self.state.lock().await.auth_calls
    }

    /// Highest number of concurrently running `discover` calls observed.
    pub async fn max_concurrent_discovers(&self) -> u32 {
        self.state.lock().await.max_discovers_in_flight
    }
}

/// Scripted connector for orchestrator tests.
pub struct MockConnector {
    platform: Platform,
    governor: Governor,
    state: Arc<Mutex<InternalState>>,
    discover_cost: u64,
    liveness_cost: u64,
    batch_limit: usize,
    provide_liveness: bool,
    provide_channels: bool,
}

/// Builder for [`MockConnector`].
pub struct MockBuilder {
    platform: Platform,
    quota: QuotaConfig,
    breaker: BreakerConfig,
    discover_cost: u64,
    liveness_cost: u64,
    batch_limit: usize,
    provide_liveness: bool,
    provide_channels: bool,
}

impl MockBuilder {
    fn new(platform: Platform) -> Self {
        Self {
            platform,
            quota: QuotaConfig {
                limit: u64::MAX,
                pause: Duration::from_secs(300),
            },
            breaker: BreakerConfig::default(),
            discover_cost: 1,
            liveness_cost: 1,
            batch_limit: 50,
            provide_liveness: true,
            provide_channels: true,
        }
    }

    /// Cap the unit budget.
    #[must_use]
    pub fn quota_limit(mut self, limit: u64) -> Self {
        self.quota.limit = limit;
        self
    }

    /// Units debited per `discover` call.
    #[must_use]
    pub const fn discover_cost(mut self, units: u64) -> Self {
        self.discover_cost = units;
        self
    }

    /// Units debited per `check_liveness` batch.
    #[must_use]
    pub const fn liveness_cost(mut self, units: u64) -> Self {
        self.liveness_cost = units;
        self
    }

    /// Declared liveness batch cap.
    #[must_use]
    pub const fn batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Do not advertise the liveness capability.
    #[must_use]
    pub const fn without_liveness(mut self) -> Self {
        self.provide_liveness = false;
        self
    }

    /// Do not advertise the channel-metadata capability.
    #[must_use]
    pub const fn without_channels(mut self) -> Self {
        self.provide_channels = false;
        self
    }

    /// Build the connector and its controller.
    #[must_use]
    pub fn build(self) -> (MockConnector, MockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let connector = MockConnector {
            platform: self.platform,
            governor: Governor::new(self.platform, &self.quota, self.breaker),
            state: state.clone(),
            discover_cost: self.discover_cost,
            liveness_cost: self.liveness_cost,
            batch_limit: self.batch_limit,
            provide_liveness: self.provide_liveness,
            provide_channels: self.provide_channels,
        };
        (connector, MockController { state })
    }
}

impl MockConnector {
    /// Returns a builder for the given platform.
    #[must_use]
    pub fn builder(platform: Platform) -> MockBuilder {
        MockBuilder::new(platform)
    }

    async fn run_behavior<T>(behavior: MockBehavior<T>) -> Result<T, VigilError> {
        match behavior {
            MockBehavior::Return(value) => Ok(value),
            MockBehavior::Fail(err) => Err(err),
            MockBehavior::Delayed(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl StreamConnector for MockConnector {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn name(&self) -> &'static str {
        "vigil-mock"
    }

    fn governor(&self) -> &Governor {
        &self.governor
    }

    async fn authenticate(&self) -> Result<(), VigilError> {
        self.state.lock().await.auth_calls += 1;
        Ok(())
    }

    fn as_discovery_provider(&self) -> Option<&dyn DiscoveryProvider> {
        Some(self)
    }

    fn as_liveness_provider(&self) -> Option<&dyn LivenessProvider> {
        self.provide_liveness.then_some(self as &dyn LivenessProvider)
    }

    fn as_channel_provider(&self) -> Option<&dyn ChannelProvider> {
        self.provide_channels.then_some(self as &dyn ChannelProvider)
    }

    fn as_feed_provider(&self) -> Option<&dyn FeedProvider> {
        Some(self)
    }
}

#[async_trait]
impl DiscoveryProvider for MockConnector {
    async fn discover(&self, keywords: &[String]) -> Result<Vec<Stream>, VigilError> {
        if !self.governor.is_operational() {
            return Ok(Vec::new());
        }
        if !self.governor.consume_quota(self.discover_cost) {
            return Ok(Vec::new());
        }
        let behavior = {
            let mut state = self.state.lock().await;
            state.discover_calls.push(keywords.to_vec());
            state.discovers_in_flight += 1;
            state.max_discovers_in_flight =
                state.max_discovers_in_flight.max(state.discovers_in_flight);
            state
                .discover_queue
                .pop()
                .unwrap_or(MockBehavior::Return(Vec::new()))
        };
        let result = Self::run_behavior(behavior).await;
        self.state.lock().await.discovers_in_flight -= 1;
        result
    }

    async fn resolve(&self, ids: &[String]) -> Result<Vec<Stream>, VigilError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let behavior = self
            .state
            .lock()
            .await
            .resolve_queue
            .pop()
            .unwrap_or(MockBehavior::Return(Vec::new()));
        Self::run_behavior(behavior).await
    }
}

#[async_trait]
impl LivenessProvider for MockConnector {
    async fn check_liveness(&self, ids: &[String]) -> Result<Vec<StreamUpdate>, VigilError> {
        if !self.governor.is_operational() || ids.is_empty() {
            return Ok(Vec::new());
        }
        self.governor.consume_quota(self.liveness_cost);
        let behavior = {
            let mut state = self.state.lock().await;
            state.liveness_calls.push(ids.to_vec());
            state.liveness_queue.pop()
        };
        match behavior {
            Some(behavior) => Self::run_behavior(behavior).await,
            // Unscripted calls echo every id back as still live.
            None => Ok(ids
                .iter()
                .map(|id| StreamUpdate {
                    platform_stream_id: id.clone(),
                    viewer_count: 1,
                    status: StreamStatus::Live,
                    last_checked_at: Utc::now(),
                })
                .collect()),
        }
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }
}

#[async_trait]
impl ChannelProvider for MockConnector {
    async fn channel(&self, platform_channel_id: &str) -> Result<Option<Channel>, VigilError> {
        Ok(self
            .state
            .lock()
            .await
            .channel_rules
            .get(platform_channel_id)
            .cloned())
    }
}

#[async_trait]
impl FeedProvider for MockConnector {
    async fn poll_feed(&self, platform_channel_id: &str) -> Result<Vec<String>, VigilError> {
        Ok(self
            .state
            .lock()
            .await
            .feed_rules
            .get(platform_channel_id)
            .cloned()
            .unwrap_or_default())
    }
}
