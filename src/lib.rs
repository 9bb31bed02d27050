pub mod backend;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod protocol;
pub mod web;

use tracing::warn;

use backend::BackendClient;
use error::WorkbenchError;
use protocol::{ChatBubble, Role};

// ---------------------------------------------------------------------------
// Widget state
// ---------------------------------------------------------------------------

/// Client-side copy of the code editor content.
#[derive(Debug, Default, Clone)]
pub struct EditorBuffer {
    value: String,
}

impl EditorBuffer {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }
}

/// Read-only log pane. Events always replace the whole content; the
/// backend sends full snapshots, never deltas.
#[derive(Debug, Default, Clone)]
pub struct LogView {
    content: String,
}

impl LogView {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn replace(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }
}

/// Ordered list of chat bubbles, oldest first.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    bubbles: Vec<ChatBubble>,
}

impl Transcript {
    pub fn bubbles(&self) -> &[ChatBubble] {
        &self.bubbles
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.bubbles.push(ChatBubble {
            role: Role::User,
            text: text.into(),
        });
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.bubbles.push(ChatBubble {
            role: Role::Assistant,
            text: text.into(),
        });
    }
}

// ---------------------------------------------------------------------------
// Workbench — session controller
// ---------------------------------------------------------------------------

/// Glue between the three widgets and the backend. Each operation is one
/// linear read-widget / call-backend / write-widget sequence; failures
/// are logged and leave existing widget state as it was.
pub struct Workbench {
    client: BackendClient,
    pub editor: EditorBuffer,
    pub logs: LogView,
    pub chat: Transcript,
}

impl Workbench {
    pub fn new(client: BackendClient) -> Self {
        Workbench {
            client,
            editor: EditorBuffer::default(),
            logs: LogView::default(),
            chat: Transcript::default(),
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Page-load initialization: one session reset, then one code fetch.
    /// The reset is fire-and-forget (a failure is logged and does not
    /// block the fetch); a missing code body leaves the editor unchanged.
    pub async fn on_load(&mut self) -> Result<(), WorkbenchError> {
        if let Err(e) = self.client.reset().await {
            warn!(error = %e, "session reset failed");
        }
        self.reload_code().await?;
        Ok(())
    }

    /// Re-fetch the server-held code into the editor. Returns whether the
    /// editor content was replaced.
    pub async fn reload_code(&mut self) -> Result<bool, WorkbenchError> {
        match self.client.fetch_code().await? {
            Some(code) => {
                self.editor.set_value(code);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Submit the current editor content for execution. The reply body is
    /// returned for logging only.
    pub async fn execute(&self) -> Result<String, WorkbenchError> {
        self.client.execute(self.editor.value()).await
    }

    /// Blank the editor locally and push the empty buffer to the session.
    pub async fn clear_code(&mut self) -> Result<(), WorkbenchError> {
        self.editor.clear();
        self.client.push_code("").await?;
        Ok(())
    }

    /// One chat round-trip. Empty input is dropped before any network
    /// activity. The user bubble is appended before the call; the
    /// assistant bubble, log view, and editor update only on success.
    /// Returns the assistant reply text, or `None` for dropped input.
    pub async fn send_message(&mut self, text: &str) -> Result<Option<String>, WorkbenchError> {
        let message = text.trim();
        if message.is_empty() {
            return Ok(None);
        }

        // The page posts the editor content alongside every chat turn so
        // the agent sees current code. Independent call; its failure must
        // not abort the chat.
        if let Err(e) = self.client.push_code(self.editor.value()).await {
            warn!(error = %e, "code push before chat failed");
        }

        self.chat.push_user(message);

        let reply = match self.client.send_message(message).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "chat message failed");
                return Err(e);
            }
        };

        self.chat.push_assistant(reply.message.clone());
        self.logs.replace(reply.message.clone());
        if let Some(code) = reply.code {
            self.editor.set_value(code);
        }
        Ok(Some(reply.message))
    }

    /// Apply one log-stream event: full replacement of the log view.
    pub fn apply_log_event(&mut self, data: &str) {
        self.logs.replace(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_workbench() -> Workbench {
        // Port 9 is closed; only non-network paths may be exercised.
        Workbench::new(BackendClient::new("http://127.0.0.1:9"))
    }

    #[test]
    fn test_editor_buffer_set_and_clear() {
        let mut editor = EditorBuffer::default();
        editor.set_value("print('hi')");
        assert_eq!(editor.value(), "print('hi')");
        editor.clear();
        assert_eq!(editor.value(), "");
    }

    #[test]
    fn test_log_view_replace_not_append() {
        let mut logs = LogView::default();
        logs.replace("first snapshot");
        logs.replace("second snapshot");
        assert_eq!(logs.content(), "second snapshot");
    }

    #[test]
    fn test_transcript_ordering() {
        let mut chat = Transcript::default();
        chat.push_user("hello");
        chat.push_assistant("hi");
        assert_eq!(chat.len(), 2);
        assert_eq!(chat.bubbles()[0].role, Role::User);
        assert_eq!(chat.bubbles()[1].role, Role::Assistant);
        assert_eq!(chat.bubbles()[1].text, "hi");
    }

    #[test]
    fn test_apply_log_event_replaces_content() {
        let mut bench = make_test_workbench();
        bench.apply_log_event("line one");
        bench.apply_log_event("line two");
        assert_eq!(bench.logs.content(), "line two");
    }

    #[tokio::test]
    async fn test_send_message_empty_input_is_no_op() {
        let mut bench = make_test_workbench();
        let reply = bench.send_message("   ").await.expect("no-op should be Ok");
        assert!(reply.is_none());
        assert!(bench.chat.is_empty());
    }

    #[tokio::test]
    async fn test_send_message_failure_keeps_user_bubble_only() {
        let mut bench = make_test_workbench();
        bench.editor.set_value("x = 1");
        bench.logs.replace("old log");

        let result = bench.send_message("do something").await;
        assert!(result.is_err());

        // user bubble appended before the call, nothing else touched
        assert_eq!(bench.chat.len(), 1);
        assert_eq!(bench.chat.bubbles()[0].role, Role::User);
        assert_eq!(bench.editor.value(), "x = 1");
        assert_eq!(bench.logs.content(), "old log");
    }

    #[tokio::test]
    async fn test_reload_code_failure_leaves_editor() {
        let mut bench = make_test_workbench();
        bench.editor.set_value("untouched");
        assert!(bench.reload_code().await.is_err());
        assert_eq!(bench.editor.value(), "untouched");
    }
}
