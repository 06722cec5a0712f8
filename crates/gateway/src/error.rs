//! Gateway error taxonomy and failure classification.
//!
//! Remote failures fall into three classes the dispatcher branches on:
//! rate-limit (wait and retry once), permanent (not-found/forbidden,
//! never retried), and transient (everything else, retried with
//! backoff).

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The platform rejected the call with a rate-limit signal.
    /// `retry_after` is in the unit the platform signals; the
    /// dispatcher converts it according to its configuration.
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<f64> },

    /// The remote entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The bot lacks access to the remote entity.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The platform returned a server-side error status.
    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    /// Connection-level failure (DNS, reset, TLS, etc.).
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,
}

impl GatewayError {
    /// Permanent failures are never retried; the dispatcher skips the
    /// intent and suppresses its key.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Forbidden(_))
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Transient failures are eligible for linear-backoff retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Network(_) | Self::Timeout)
    }
}
