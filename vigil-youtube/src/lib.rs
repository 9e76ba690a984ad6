//! vigil-youtube
//!
//! Connector that implements `StreamConnector` on top of the YouTube Data
//! API v3 under its hostile quota economics: search costs 100 units, the
//! batch validation endpoint costs 1 unit per 50 ids, and the per-channel
//! Atom feed costs nothing.
#![warn(missing_docs)]

/// Validated DTOs for upstream payloads.
pub mod dto;
/// Zero-cost Atom feed parsing.
pub mod feed;
/// Transport trait and the production HTTP transport.
pub mod transport;

mod connector;

pub use connector::{YouTubeBuilder, YouTubeConnector};
pub use transport::{HttpTransport, YtTransport};
