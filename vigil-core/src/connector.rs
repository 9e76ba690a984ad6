use async_trait::async_trait;

use vigil_types::{ConnectorKey, ConnectorReport, Platform};

use crate::error::VigilError;
use crate::governor::Governor;
use crate::model::{Channel, Stream, StreamUpdate};

/// Focused role trait for connectors that can discover new streams.
///
/// This is the expensive operation: an implementation may perform several
/// upstream calls, must deduplicate by `platform_stream_id`, and must stop
/// and return what it has when the quota firewall blocks the next call.
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// Search upstream for live streams matching the given keywords.
    async fn discover(&self, keywords: &[String]) -> Result<Vec<Stream>, VigilError>;

    /// Resolve specific stream ids (e.g. feed hints) into full records,
    /// keeping only those with a live or upcoming broadcast attached.
    ///
    /// Rides the cheap batch endpoint where the platform has one. The
    /// default keeps hint validation optional.
    async fn resolve(&self, ids: &[String]) -> Result<Vec<Stream>, VigilError> {
        let _ = ids;
        Ok(Vec::new())
    }
}

/// Focused role trait for connectors that can verify known-live streams.
///
/// This is the cheap operation. For each requested id exactly one update is
/// returned; ids the upstream no longer reports come back as `Ended` with
/// zero viewers and the poll instant.
#[async_trait]
pub trait LivenessProvider: Send + Sync {
    /// Check the given platform stream ids, batching up to [`Self::batch_limit`].
    async fn check_liveness(&self, ids: &[String]) -> Result<Vec<StreamUpdate>, VigilError>;

    /// Maximum ids the upstream accepts per call.
    fn batch_limit(&self) -> usize;
}

/// Focused role trait for connectors that can fetch channel metadata.
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Fetch authoritative channel metadata, trust score already computed.
    ///
    /// Returns `Ok(None)` when the platform does not know the id.
    async fn channel(&self, platform_channel_id: &str) -> Result<Option<Channel>, VigilError>;
}

/// Focused role trait for connectors with a zero-cost per-channel feed.
///
/// Feed entries are early-warning hints only; each returned id still needs
/// validation through the cheap batch API before it enters the catalog.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Poll the channel's feed and return recently published stream ids.
    async fn poll_feed(&self, platform_channel_id: &str) -> Result<Vec<String>, VigilError>;
}

/// Main connector trait implemented by platform adapter crates.
///
/// Capabilities are advertised through the `as_*_provider` accessors; the
/// scheduler only drives capabilities a connector actually exposes.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// The platform this connector serves.
    fn platform(&self) -> Platform;

    /// A stable identifier for registry configuration (e.g. "vigil-youtube").
    fn name(&self) -> &'static str;

    /// Canonical connector key constructed from the static name.
    fn key(&self) -> ConnectorKey {
        ConnectorKey::new(self.name())
    }

    /// The governance state (quota, error tally, breaker) for this connector.
    fn governor(&self) -> &Governor;

    /// Acquire or refresh whatever credential the upstream requires.
    ///
    /// Failures are recorded against the governor before being returned.
    async fn authenticate(&self) -> Result<(), VigilError>;

    /// Advertise discovery capability by returning a usable trait object.
    fn as_discovery_provider(&self) -> Option<&dyn DiscoveryProvider> {
        None
    }

    /// Advertise liveness capability by returning a usable trait object.
    fn as_liveness_provider(&self) -> Option<&dyn LivenessProvider> {
        None
    }

    /// Advertise channel-metadata capability by returning a usable trait object.
    fn as_channel_provider(&self) -> Option<&dyn ChannelProvider> {
        None
    }

    /// Advertise zero-cost feed monitoring by returning a usable trait object.
    fn as_feed_provider(&self) -> Option<&dyn FeedProvider> {
        None
    }

    /// Operator-visible governance snapshot.
    fn report(&self) -> ConnectorReport {
        self.governor().snapshot(self.name())
    }
}
