use reqwest::Client;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::error::WorkbenchError;
use crate::protocol::{ChatReply, SseDecoder};

/// Typed client for the agent backend. One method per endpoint; every
/// call is a single request/response with no retry or sequencing, the
/// way the page issued them.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        BackendClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // -----------------------------------------------------------------------
    // Session endpoints
    // -----------------------------------------------------------------------

    /// `POST /reset` — wipes server-side session state. The body is
    /// discarded; only the status matters.
    pub async fn reset(&self) -> Result<(), WorkbenchError> {
        let empty: [(&str, &str); 0] = [];
        let response = self
            .client
            .post(self.endpoint("/reset"))
            .form(&empty)
            .send()
            .await?;
        debug!(status = response.status().as_u16(), "session reset");
        Ok(())
    }

    /// `GET /get_code` — the server-held code buffer. `Ok(None)` on any
    /// non-200 status so the caller can leave the editor unchanged.
    pub async fn fetch_code(&self) -> Result<Option<String>, WorkbenchError> {
        let response = self.client.get(self.endpoint("/get_code")).send().await?;
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "code fetch skipped");
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }

    /// `POST /execute` — runs the submitted code server-side. The reply
    /// body is only ever logged.
    pub async fn execute(&self, code: &str) -> Result<String, WorkbenchError> {
        self.post_form("/execute", "code", code).await
    }

    /// `POST /post_code` — stores the submitted code in the session.
    pub async fn push_code(&self, code: &str) -> Result<String, WorkbenchError> {
        self.post_form("/post_code", "code", code).await
    }

    /// `POST /handle_user_message` — one chat turn. A non-2xx status is
    /// surfaced with the body text (the backend answers errors in prose).
    pub async fn send_message(&self, message: &str) -> Result<ChatReply, WorkbenchError> {
        let response = self
            .client
            .post(self.endpoint("/handle_user_message"))
            .form(&[("message", message)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WorkbenchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let reply: ChatReply = serde_json::from_str(&body)?;
        Ok(reply)
    }

    async fn post_form(
        &self,
        path: &str,
        field: &str,
        value: &str,
    ) -> Result<String, WorkbenchError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .form(&[(field, value)])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WorkbenchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(path, body = body.as_str(), "form post accepted");
        Ok(body)
    }

    // -----------------------------------------------------------------------
    // Log stream
    // -----------------------------------------------------------------------

    /// `GET /latest_log_stream` — subscribe to the SSE log feed and forward
    /// each event payload through `tx`. Returns when the backend closes
    /// the stream or the receiver is dropped. No reconnect is attempted.
    pub async fn stream_logs(
        &self,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<(), WorkbenchError> {
        let response = self
            .client
            .get(self.endpoint("/latest_log_stream"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkbenchError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.push_chunk(&chunk) {
                if tx.send(event).is_err() {
                    // receiver gone, nobody is watching the logs anymore
                    return Ok(());
                }
            }
        }

        debug!("log stream closed by backend");
        Ok(())
    }
}
