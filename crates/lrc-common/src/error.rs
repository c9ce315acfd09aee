//! Error types for the LRC coordinator.

use thiserror::Error;

/// Common result type for coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the coordinator core.
#[derive(Debug, Error)]
pub enum Error {
    // Upload-path errors
    #[error("file not found: {0}")]
    FileNotFound(String),

    // Placement errors
    #[error("insufficient topology for placement: have {available} racks, need {required}")]
    InsufficientTopology { available: usize, required: usize },

    // Upload / write-path errors
    #[error("node write failure for block {block_id}: {reason}")]
    NodeWriteFailure { block_id: String, reason: String },

    // Degraded-read errors
    #[error("block miss for {block_id}")]
    BlockMiss { block_id: String },

    // Transcode errors
    #[error("transcode failure on stripe {stripe_id}: {reason}")]
    TranscodeFailure { stripe_id: String, reason: String },

    // Codec / wire errors
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    // Metadata errors
    #[error("stripe not found: {0}")]
    StripeNotFound(String),

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("reserved shadow missing for block {0}")]
    ReservedShadowMissing(String),

    // Identifier / argument validation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Ambient
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("operation timed out: {0}")]
    Timeout(String),
}

impl Error {
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    #[must_use]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    #[must_use]
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented(feature.into())
    }

    /// Whether this error is safe to retry automatically.
    ///
    /// Always `false` today: the coordinator never retries a command on its
    /// own (see the concurrency model's "no retry" note).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::StripeNotFound(_)
                | Self::BlockNotFound(_)
                | Self::BlockMiss { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(Error::FileNotFound("abcdef".into()).is_not_found());
        assert!(!Error::Configuration("bad".into()).is_not_found());
    }

    #[test]
    fn nothing_is_retryable() {
        assert!(!Error::Timeout("ack".into()).is_retryable());
    }
}
