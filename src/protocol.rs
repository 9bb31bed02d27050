use serde::{Deserialize, Serialize};

// -- Chat wire types --------------------------------------------------------

/// JSON reply from `POST /handle_user_message`. The backend stores no code
/// right after a reset, so `code` can be null; the caller must then leave
/// the editor untouched rather than blank it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

// -- Transcript types -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Bubble prefix shown in both the page and the terminal transcript.
    pub fn glyph(&self) -> char {
        match self {
            Role::User => '\u{1F464}',
            Role::Assistant => '\u{1F916}',
        }
    }
}

/// One chat bubble as displayed: role glyph plus the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatBubble {
    pub role: Role,
    pub text: String,
}

impl std::fmt::Display for ChatBubble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.role.glyph(), self.text)
    }
}

// -- SSE decoding -----------------------------------------------------------

/// Incremental decoder for a `text/event-stream` body. Chunks may split
/// events anywhere, including inside a multi-byte UTF-8 sequence, so
/// bytes are buffered raw and only complete lines are decoded. `data:`
/// lines accumulate until a blank line dispatches the event; multi-line
/// data joins with `\n` per the SSE framing rules.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, returning every event completed by it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line_bytes[..line_end]);
            let line = line.trim_end_matches('\r');

            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    events.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data_lines.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
            // comment lines (":...") and other fields are ignored
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_chat_reply_deserializes() {
        let json = r#"{"message":"All done.","code":"print('hi')"}"#;
        let reply: ChatReply = serde_json::from_str(json).expect("deser failed");
        assert_eq!(reply.message, "All done.");
        assert_eq!(reply.code.as_deref(), Some("print('hi')"));
    }

    #[test]
    fn test_chat_reply_null_code() {
        let json = r#"{"message":"Ready.","code":null}"#;
        let reply: ChatReply = serde_json::from_str(json).expect("deser failed");
        assert!(reply.code.is_none());
    }

    #[test]
    fn test_chat_reply_missing_code_field() {
        let json = r#"{"message":"Ready."}"#;
        let reply: ChatReply = serde_json::from_str(json).expect("deser failed");
        assert!(reply.code.is_none());
    }

    #[test]
    fn test_chat_reply_round_trips() {
        let reply = ChatReply {
            message: "ok".to_string(),
            code: Some("x = 1".to_string()),
        };
        let json = serde_json::to_string(&reply).expect("serialize failed");
        assert!(json.contains("\"message\":\"ok\""));
        assert!(json.contains("\"code\":\"x = 1\""));
    }

    #[test]
    fn test_bubble_display_user_glyph() {
        let bubble = ChatBubble {
            role: Role::User,
            text: "hello".to_string(),
        };
        assert_eq!(bubble.to_string(), "\u{1F464} hello");
    }

    #[test]
    fn test_bubble_display_assistant_glyph() {
        let bubble = ChatBubble {
            role: Role::Assistant,
            text: "hi there".to_string(),
        };
        assert_eq!(bubble.to_string(), "\u{1F916} hi there");
    }

    #[test]
    fn test_sse_single_event() {
        let mut dec = SseDecoder::new();
        let events = dec.push_chunk(b"data: latest log line\n\n");
        assert_eq!(events, vec!["latest log line".to_string()]);
    }

    #[test]
    fn test_sse_event_split_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.push_chunk(b"data: half a ").is_empty());
        let events = dec.push_chunk(b"line\n\n");
        assert_eq!(events, vec!["half a line".to_string()]);
    }

    #[test]
    fn test_sse_chunk_boundary_inside_multibyte_char() {
        // "data: 🤖\n\n" cut at byte 8, mid-way through the emoji's
        // four-byte sequence; the payload must come through intact
        let raw = "data: \u{1F916}\n\n".as_bytes();
        let mut dec = SseDecoder::new();
        assert!(dec.push_chunk(&raw[..8]).is_empty());
        let events = dec.push_chunk(&raw[8..]);
        assert_eq!(events, vec!["\u{1F916}".to_string()]);
    }

    #[test]
    fn test_sse_multibyte_text_byte_by_byte() {
        let raw = "data: caf\u{E9} \u{1F464}\n\n".as_bytes();
        let mut dec = SseDecoder::new();
        let mut events = Vec::new();
        for byte in raw {
            events.extend(dec.push_chunk(std::slice::from_ref(byte)));
        }
        assert_eq!(events, vec!["caf\u{E9} \u{1F464}".to_string()]);
    }

    #[test]
    fn test_sse_two_events_in_one_chunk() {
        let mut dec = SseDecoder::new();
        let events = dec.push_chunk(b"data: first\n\ndata: second\n\n");
        assert_eq!(events, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_sse_multiline_data_joins_with_newline() {
        let mut dec = SseDecoder::new();
        let events = dec.push_chunk(b"data: line one\ndata: line two\n\n");
        assert_eq!(events, vec!["line one\nline two".to_string()]);
    }

    #[test]
    fn test_sse_comment_lines_ignored() {
        let mut dec = SseDecoder::new();
        let events = dec.push_chunk(b": keep-alive\n\ndata: real\n\n");
        assert_eq!(events, vec!["real".to_string()]);
    }

    #[test]
    fn test_sse_crlf_line_endings() {
        let mut dec = SseDecoder::new();
        let events = dec.push_chunk(b"data: windows\r\n\r\n");
        assert_eq!(events, vec!["windows".to_string()]);
    }

    #[test]
    fn test_sse_blank_lines_without_data_emit_nothing() {
        let mut dec = SseDecoder::new();
        assert!(dec.push_chunk(b"\n\n\n").is_empty());
    }

    #[rstest]
    #[case(b"data:no-space\n\n", "no-space")]
    #[case(b"data: one space\n\n", "one space")]
    #[case(b"data:  extra space\n\n", " extra space")]
    fn test_sse_data_prefix_space_handling(#[case] raw: &[u8], #[case] expected: &str) {
        let mut dec = SseDecoder::new();
        assert_eq!(dec.push_chunk(raw), vec![expected.to_string()]);
    }
}
