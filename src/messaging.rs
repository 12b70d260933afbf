use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const LOG_PAGE_MESSAGE: &str = "SUPPORT_ASSISTANT_LOG_PAGE";
pub const PENDING_STATUS: &str = "Sending request to content script...";
pub const MAX_HEADINGS: usize = 5;

/// Requests understood by the content script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentRequest {
    #[serde(rename = "SUPPORT_ASSISTANT_LOG_PAGE")]
    LogPage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub title: String,
    pub url: String,
    pub headings: Vec<String>,
    pub meta_description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<PageInfo>,
}

impl ContentResponse {
    pub fn success(info: PageInfo) -> Self {
        Self { ok: true, info: Some(info) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: Option<u32>,
    pub title: String,
    pub url: String,
}

/// Failure to hand a message to a tab, e.g. no content script listening.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("message delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Host messaging layer between the popup and per-tab content scripts.
#[async_trait]
pub trait TabMessenger: Send + Sync {
    /// Active tab of the current window.
    async fn active_tab(&self) -> Option<TabInfo>;
    /// `Ok(None)` means the receiver existed but did not answer.
    async fn send_message(&self, tab_id: u32, message: Value) -> Result<Option<Value>, DeliveryError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("no active tab in the current window")]
    NoActiveTab,
    #[error("content script unreachable: {0}")]
    EndpointUnavailable(String),
    #[error("snapshot rejected: {0}")]
    SnapshotRejected(String),
}

impl SnapshotError {
    pub fn status_message(&self) -> &'static str {
        match self {
            Self::NoActiveTab => "No active tab found.",
            Self::EndpointUnavailable(_) => "Content script not available on this tab.",
            Self::SnapshotRejected(_) => "Unable to log page info.",
        }
    }
}

pub fn status_for(result: &Result<PageInfo, SnapshotError>) -> String {
    match result {
        Ok(info) => {
            let title = if info.title.is_empty() { "current tab" } else { info.title.as_str() };
            format!("Logged page info for {}.", title)
        }
        Err(error) => error.status_message().to_string(),
    }
}

#[derive(Clone)]
pub struct TabMessagingClient {
    messenger: Arc<dyn TabMessenger>,
    timeout: Duration,
}

impl TabMessagingClient {
    pub fn new(messenger: Arc<dyn TabMessenger>, timeout: Duration) -> Self {
        Self { messenger, timeout }
    }

    /// One request, one answer, no retries.
    pub async fn request_page_snapshot(&self) -> Result<PageInfo, SnapshotError> {
        let tab_id = self
            .messenger
            .active_tab()
            .await
            .and_then(|tab| tab.id)
            .ok_or(SnapshotError::NoActiveTab)?;

        let request = serde_json::to_value(ContentRequest::LogPage)
            .map_err(|error| SnapshotError::SnapshotRejected(error.to_string()))?;

        let reply = match tokio::time::timeout(self.timeout, self.messenger.send_message(tab_id, request)).await {
            Err(_) => {
                tracing::warn!(tab_id, timeout_ms = self.timeout.as_millis() as u64, "content script did not answer in time");
                return Err(SnapshotError::EndpointUnavailable(format!(
                    "no reply within {} ms",
                    self.timeout.as_millis()
                )));
            }
            Ok(Err(error)) => {
                tracing::error!(tab_id, error = %error, "failed to reach content script");
                return Err(SnapshotError::EndpointUnavailable(error.0));
            }
            Ok(Ok(reply)) => reply,
        };

        let Some(reply) = reply else {
            return Err(SnapshotError::SnapshotRejected("empty reply".to_string()));
        };

        let response: ContentResponse = serde_json::from_value(reply)
            .map_err(|error| SnapshotError::SnapshotRejected(error.to_string()))?;
        match response {
            ContentResponse { ok: true, info: Some(info) } => {
                tracing::info!(tab_id, title = %info.title, url = %info.url, "page snapshot received");
                Ok(info)
            }
            ContentResponse { ok: true, info: None } => {
                Err(SnapshotError::SnapshotRejected("reply carried no page info".to_string()))
            }
            ContentResponse { ok: false, .. } => {
                Err(SnapshotError::SnapshotRejected("content script reported failure".to_string()))
            }
        }
    }
}
