use thiserror::Error;

/// Unified error type for the vigil workspace.
///
/// Connectors map transport failures into these variants at their boundary;
/// nothing upstream-shaped leaks past an adapter.
#[derive(Debug, Clone, Error)]
pub enum VigilError {
    /// Credential acquisition or refresh failed.
    #[error("{connector} authentication failed: {msg}")]
    Auth {
        /// Connector name that failed to authenticate.
        connector: String,
        /// Human-readable failure detail.
        msg: String,
    },

    /// The quota firewall blocked a call before it reached upstream.
    #[error("quota exhausted ({remaining} units remaining)")]
    QuotaExhausted {
        /// Units still available, if any.
        remaining: u64,
    },

    /// The upstream signalled its short-window budget is nearly spent.
    #[error("rate limited, resets in {reset_in_ms} ms")]
    RateLimited {
        /// Milliseconds until the upstream's declared reset.
        reset_in_ms: u64,
    },

    /// Transient upstream failure (5xx, reset, timeout). Retryable.
    #[error("{connector} upstream error: {msg}")]
    Upstream {
        /// Connector name that observed the failure.
        connector: String,
        /// Human-readable error message.
        msg: String,
    },

    /// A record failed normalization and was dropped.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A catalog read or write failed.
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl VigilError {
    /// Helper: build an `Auth` error with the connector name and message.
    pub fn auth(connector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Auth {
            connector: connector.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build an `Upstream` error with the connector name and message.
    pub fn upstream(connector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Upstream {
            connector: connector.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `Parse` error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Helper: build a `Catalog` error.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Whether a bounded retry with backoff is worth attempting.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}
