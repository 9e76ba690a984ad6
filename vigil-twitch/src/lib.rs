//! vigil-twitch
//!
//! Connector that implements `StreamConnector` on top of the Twitch Helix
//! API. Helix budgets requests with a short-window token bucket, so
//! governance is driven by the `Ratelimit-*` response headers rather than a
//! daily unit quota.
#![warn(missing_docs)]

/// Validated DTOs for Helix payloads.
pub mod dto;
/// Transport trait and the production HTTP transport.
pub mod transport;

mod connector;

pub use connector::{TwitchBuilder, TwitchConnector};
pub use transport::{HelixResponse, HelixTransport, HttpTransport, RateLimitInfo};
