pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RetentionPolicy;
use crate::dispatch::entry::LogEntry;

/// Opaque ordering handle returned by the sink after each accepted batch
/// and required as input to the next send for the same stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceToken(String);

impl SequenceToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Indexes of entries the sink accepted the call for but refused to
/// store. Surfaced as diagnostics only; rejected entries are not
/// re-queued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RejectedEntries {
    /// First index with a timestamp too far in the future.
    pub too_new_index: Option<usize>,
    /// Last index with a timestamp too far in the past.
    pub too_old_index: Option<usize>,
    /// Last index older than the stream's retention window.
    pub expired_index: Option<usize>,
}

impl RejectedEntries {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.too_new_index.is_none() && self.too_old_index.is_none() && self.expired_index.is_none()
    }
}

/// Result of a batch send the sink accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReceipt {
    pub next_sequence_token: Option<SequenceToken>,
    pub rejected: Option<RejectedEntries>,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The sink answered with a non-success status.
    #[error("sink refused request with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body that came with the refusal
        body: String,
    },

    /// The sequence token sent with the batch is not the one the stream
    /// expects.
    #[error("sequence token rejected by sink")]
    InvalidSequenceToken,

    /// The response arrived but could not be decoded.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

/// Capability interface to the remote append-only log-ingestion
/// destination. The dispatcher is written against this trait only; the
/// wire transport lives in the implementations.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Create the destination if it does not exist and apply the
    /// retention policy. Idempotent: an already-existing destination is
    /// success, not an error.
    async fn ensure_destination(
        &self,
        group: &str,
        stream: &str,
        retention: RetentionPolicy,
    ) -> Result<(), SinkError>;

    /// Ship one ordered batch. `sequence_token` must be the token
    /// returned by the previous accepted send for this stream, or `None`
    /// for the first one.
    async fn send_batch(
        &self,
        entries: &[LogEntry],
        group: &str,
        stream: &str,
        sequence_token: Option<&SequenceToken>,
    ) -> Result<BatchReceipt, SinkError>;
}
