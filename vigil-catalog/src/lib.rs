//! vigil-catalog
//!
//! The durable side of the ingestion engine: a transactional,
//! key-addressable catalog of channels and streams over SQLite, plus the
//! follow/report/usage-log/seed tables the rest of the system leans on.
//!
//! The catalog is a passive dependency: tasks borrow a [`CatalogStore`]
//! (cheaply cloneable, pool-backed) and never own connections themselves.
#![warn(missing_docs)]

mod records;
mod store;

pub use records::{ChannelRecord, StreamRecord};
pub use store::CatalogStore;
