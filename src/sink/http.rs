use std::borrow::Cow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RetentionPolicy;
use crate::dispatch::entry::LogEntry;
use crate::sink::{BatchReceipt, RejectedEntries, SequenceToken, Sink, SinkError};

/// JSON-over-HTTP adapter to a log intake service. Destination creation
/// is idempotent (HTTP 409 counts as success); batch sends return the
/// next sequence token in the response body.
pub struct HttpSink {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGroupRequest<'a> {
    group: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutRetentionRequest<'a> {
    group: &'a str,
    retention_days: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateStreamRequest<'a> {
    group: &'a str,
    stream: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry<'a> {
    timestamp: i64,
    message: Cow<'a, str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBatchRequest<'a> {
    group: &'a str,
    stream: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_token: Option<&'a SequenceToken>,
    entries: Vec<WireEntry<'a>>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SendBatchResponse {
    next_sequence_token: Option<SequenceToken>,
    rejected_entries_info: Option<RejectedEntries>,
}

impl HttpSink {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn post<T: Serialize + Sync>(
        &self,
        route: &str,
        body: &T,
    ) -> Result<reqwest::Response, SinkError> {
        let url = format!("{}/api/v1/{route}", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(api_key) = &self.api_key {
            request = request.header("X-Api-Key", api_key);
        }
        request
            .send()
            .await
            .map_err(|e| SinkError::Transport(Box::new(e)))
    }

    /// Create-style calls succeed when the resource is created or when it
    /// already exists.
    async fn post_idempotent<T: Serialize + Sync>(
        &self,
        route: &str,
        body: &T,
    ) -> Result<(), SinkError> {
        let response = self.post(route, body).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 409 {
            debug!(route, "destination resource already exists");
            return Ok(());
        }
        Err(status_error(status, response).await)
    }
}

async fn status_error(status: reqwest::StatusCode, response: reqwest::Response) -> SinkError {
    let body = response.text().await.unwrap_or_default();
    if body.contains("InvalidSequenceToken") {
        return SinkError::InvalidSequenceToken;
    }
    SinkError::Status {
        status: status.as_u16(),
        body,
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn ensure_destination(
        &self,
        group: &str,
        stream: &str,
        retention: RetentionPolicy,
    ) -> Result<(), SinkError> {
        self.post_idempotent("groups", &CreateGroupRequest { group })
            .await?;
        self.post_idempotent(
            "retention",
            &PutRetentionRequest {
                group,
                retention_days: retention.days(),
            },
        )
        .await?;
        self.post_idempotent("streams", &CreateStreamRequest { group, stream })
            .await
    }

    async fn send_batch(
        &self,
        entries: &[LogEntry],
        group: &str,
        stream: &str,
        sequence_token: Option<&SequenceToken>,
    ) -> Result<BatchReceipt, SinkError> {
        let wire_entries = entries
            .iter()
            .map(|entry| WireEntry {
                timestamp: entry.timestamp_millis(),
                message: String::from_utf8_lossy(entry.message()),
            })
            .collect();
        let request = SendBatchRequest {
            group,
            stream,
            sequence_token,
            entries: wire_entries,
        };

        let response = self.post("logs", &request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| SinkError::Transport(Box::new(e)))?;
        let decoded: SendBatchResponse = serde_json::from_str(&body)?;
        Ok(BatchReceipt {
            next_sequence_token: decoded.next_sequence_token,
            rejected: decoded.rejected_entries_info,
        })
    }
}
