use colored::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::warn;

use crate::backend::BackendClient;
use crate::config::WorkbenchConfig;
use crate::error::WorkbenchError;

/// Embedded single-page workbench: code editor, live log pane, and chat
/// panel. Every request the page makes is same-origin and proxied to the
/// agent backend by this server.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Agent Workbench</title>
<style>
*{margin:0;padding:0;box-sizing:border-box}
body{background:#0d1117;color:#c9d1d9;font-family:'Cascadia Code','Fira Code',monospace;height:100vh;display:flex;flex-direction:column}
header{padding:14px 24px;border-bottom:1px solid #21262d;display:flex;align-items:center;justify-content:space-between}
header h1{font-size:1.15rem;color:#58a6ff}
.hdr-right{display:flex;gap:8px}
.btn{border:none;padding:6px 14px;border-radius:6px;font-family:inherit;font-size:.85rem;cursor:pointer;color:#fff}
.btn-run{background:#238636}.btn-run:hover{background:#2ea043}
.btn-mode{background:#30363d}.btn-mode:hover{background:#484f58}
#main{flex:1;display:grid;grid-template-columns:1fr 320px;min-height:0}
#left{display:flex;flex-direction:column;min-width:0;border-right:1px solid #21262d}
.pane-label{font-size:.7rem;color:#8b949e;text-transform:uppercase;letter-spacing:.5px;padding:6px 16px;background:#161b22;border-bottom:1px solid #21262d}
#code{flex:3;background:#0d1117;color:#c9d1d9;border:none;resize:none;padding:12px 16px;font-family:inherit;font-size:.9rem;line-height:1.6;outline:none;white-space:pre;overflow:auto}
#logs{flex:1;background:#0a0e14;color:#8b949e;padding:10px 16px;font-size:.78rem;line-height:1.5;overflow-y:auto;white-space:pre-wrap;word-break:break-word;border-top:1px solid #21262d;margin:0}
#chat{display:flex;flex-direction:column;min-height:0}
#chat-msgs{flex:1;overflow-y:auto;padding:10px;display:flex;flex-direction:column;gap:6px}
.message{display:flex}
.user-message{justify-content:flex-end}
.assistant-message{justify-content:flex-start}
.message-content{max-width:90%;padding:6px 10px;border-radius:8px;font-size:.8rem;line-height:1.5;word-break:break-word;white-space:pre-wrap}
.user-message .message-content{background:#1f6feb;color:#fff}
.assistant-message .message-content{background:#161b22;border:1px solid #21262d}
#chat-wrap{padding:10px;border-top:1px solid #21262d;display:flex;gap:6px}
#chat-in{flex:1;background:#161b22;border:1px solid #30363d;color:#c9d1d9;border-radius:6px;padding:7px 10px;font-family:inherit;font-size:.82rem;outline:none}
#chat-in:focus{border-color:#58a6ff}
#chat-btn{background:#1f6feb;border:none;color:#fff;border-radius:6px;padding:7px 12px;cursor:pointer;font-family:inherit;font-size:.82rem}
#chat-btn:hover{background:#388bfd}
</style>
</head>
<body>
<header>
  <h1>Agent Workbench</h1>
  <div class="hdr-right">
    <button class="btn btn-run" id="btn-run" title="Run the editor content on the backend">Run</button>
    <button class="btn btn-mode" id="btn-reload" title="Reload the server-held code">Reload</button>
    <button class="btn btn-mode" id="btn-clear" title="Clear the editor and the session code">Clear</button>
  </div>
</header>
<div id="main">
  <div id="left">
    <span class="pane-label">Code</span>
    <textarea id="code" spellcheck="false"></textarea>
    <span class="pane-label">Latest Log</span>
    <pre id="logs"></pre>
  </div>
  <div id="chat">
    <span class="pane-label">Chat</span>
    <div id="chat-msgs"></div>
    <div id="chat-wrap">
      <input type="text" id="chat-in" placeholder="Message the agent...">
      <button id="chat-btn">Send</button>
    </div>
  </div>
</div>
<script>
document.addEventListener('DOMContentLoaded', function () {
  const editor = document.getElementById('code');
  const logs = document.getElementById('logs');
  const chatMsgs = document.getElementById('chat-msgs');
  const chatIn = document.getElementById('chat-in');

  const FORM = { 'Content-Type': 'application/x-www-form-urlencoded' };

  // one session reset per page load, fire-and-forget
  fetch('/reset', { method: 'POST', headers: FORM, body: '' })
    .catch(err => console.error('Error resetting session:', err));

  function loadCode() {
    fetch('/get_code')
      .then(res => {
        if (!res.ok) return null;           // non-200: leave the editor alone
        return res.text();
      })
      .then(text => { if (text !== null) editor.value = text; })
      .catch(err => console.error('Error loading code:', err));
  }

  function postCode(code) {
    return fetch('/post_code', { method: 'POST', headers: FORM, body: 'code=' + encodeURIComponent(code) })
      .then(res => res.text())
      .then(body => console.log('Code posted:', body))
      .catch(err => console.error('Error posting code:', err));
  }

  function runCode() {
    fetch('/execute', { method: 'POST', headers: FORM, body: 'code=' + encodeURIComponent(editor.value) })
      .then(res => res.text())
      .then(body => console.log('Code executed:', body))
      .catch(err => console.error('Error executing code:', err));
  }

  function clearCode() {
    editor.value = '';
    postCode('');
  }

  function addMessage(message, isUser) {
    const el = document.createElement('div');
    el.classList.add('message', isUser ? 'user-message' : 'assistant-message');
    const content = document.createElement('div');
    content.classList.add('message-content');
    content.textContent = (isUser ? '\u{1F464} ' : '\u{1F916} ') + message;
    el.appendChild(content);
    chatMsgs.appendChild(el);
    chatMsgs.scrollTop = chatMsgs.scrollHeight;
  }

  function sendMessage() {
    const message = chatIn.value.trim();
    if (message === '') return;

    // push the editor content so the agent sees current code;
    // independent of the chat call, a failure only logs
    postCode(editor.value);

    addMessage(message, true);
    chatIn.value = '';

    fetch('/handle_user_message', { method: 'POST', headers: FORM, body: 'message=' + encodeURIComponent(message) })
      .then(res => {
        if (!res.ok) throw new Error('backend returned ' + res.status);
        return res.json();
      })
      .then(result => {
        addMessage(result.message, false);
        logs.textContent = result.message;
        if (result.code !== null && result.code !== undefined) editor.value = result.code;
      })
      .catch(err => console.error('Error sending user message:', err));
  }

  // each log event replaces the pane wholesale
  const logsSource = new EventSource('/latest_log_stream');
  logsSource.onmessage = function (event) {
    logs.textContent = event.data;
    logs.scrollTop = logs.scrollHeight;
  };

  document.getElementById('btn-run').addEventListener('click', runCode);
  document.getElementById('btn-reload').addEventListener('click', loadCode);
  document.getElementById('btn-clear').addEventListener('click', clearCode);
  document.getElementById('chat-btn').addEventListener('click', sendMessage);
  chatIn.addEventListener('keydown', function (event) {
    if (event.key === 'Enter') {
      event.preventDefault();
      sendMessage();
    }
  });

  loadCode();
});
</script>
</body>
</html>"##;

/// Simple percent-decoding for form bodies. Decodes into bytes first so
/// multi-byte UTF-8 sequences survive.
pub fn url_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '+' => bytes.push(b' '),
            '%' => {
                let hex: String = chars.by_ref().take(2).collect();
                if hex.len() == 2 {
                    if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                        bytes.push(byte);
                    }
                }
            }
            _ => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse a form-encoded body into key-value pairs.
pub fn parse_form(body: &str) -> std::collections::HashMap<String, String> {
    body.split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((key.to_string(), url_decode(val)))
        })
        .collect()
}

fn plain_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

fn status_line(status: u16) -> String {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Error",
    };
    format!("{} {}", status, reason)
}

/// Start the workbench UI server and (optionally) open the browser.
pub async fn serve(cfg: &WorkbenchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", cfg.port)).await?;

    eprintln!(
        "{}",
        format!("  Workbench UI running at http://localhost:{}", cfg.port).bright_green()
    );
    eprintln!(
        "{}",
        format!("  Backend: {}", cfg.backend_url).bright_blue()
    );
    eprintln!("{}", "  Press Ctrl+C to stop.".bright_blue());

    if cfg.open_browser {
        open_browser(cfg.port);
    }

    let client = BackendClient::new(&cfg.backend_url);
    serve_on(listener, client).await
}

/// Accept loop, split out so tests can bind their own listener.
pub async fn serve_on(
    listener: TcpListener,
    client: BackendClient,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let (stream, _addr) = listener.accept().await?;
        let client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client).await {
                eprintln!("  connection error: {}", e);
            }
        });
    }
}

fn open_browser(port: u16) {
    #[cfg(target_os = "windows")]
    {
        let _ = std::process::Command::new("cmd")
            .args(["/C", &format!("start http://localhost:{}", port)])
            .spawn();
    }
    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("open")
            .arg(format!("http://localhost:{}", port))
            .spawn();
    }
    #[cfg(target_os = "linux")]
    {
        let _ = std::process::Command::new("xdg-open")
            .arg(format!("http://localhost:{}", port))
            .spawn();
    }
}

/// Read one HTTP request: request line, headers, and as much of the body
/// as `Content-Length` announces (capped at 1 MiB).
async fn read_request(
    stream: &mut TcpStream,
) -> Result<Option<(String, String, String)>, Box<dyn std::error::Error + Send + Sync>> {
    const MAX_REQUEST: usize = 1 << 20;

    let mut raw: Vec<u8> = Vec::with_capacity(8192);
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = find_header_end(&raw) {
            break pos;
        }
        if raw.len() > MAX_REQUEST {
            return Ok(None);
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let first_line = head.lines().next().unwrap_or("");
    let mut parts = first_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();
    if method.is_empty() || path.is_empty() {
        return Ok(None);
    }

    let content_length = head
        .lines()
        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(str::trim).map(String::from))
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
        .min(MAX_REQUEST);

    let body_start = header_end + 4;
    while raw.len() < body_start + content_length {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
    }

    let body = if raw.len() > body_start {
        String::from_utf8_lossy(&raw[body_start..]).into_owned()
    } else {
        String::new()
    };
    Ok(Some((method, path, body)))
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn handle_connection(
    mut stream: TcpStream,
    client: BackendClient,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some((_method, path_and_query, body)) = read_request(&mut stream).await? else {
        return Ok(());
    };

    let path = path_and_query
        .split('?')
        .next()
        .unwrap_or(path_and_query.as_str());

    match path {
        "/" => {
            let response = plain_response("200 OK", "text/html; charset=utf-8", INDEX_HTML);
            stream.write_all(response.as_bytes()).await?;
        }
        "/reset" => {
            let (status, body) = match client.reset().await {
                Ok(()) => (200, "Ready!".to_string()),
                Err(e) => relay_error(e),
            };
            let response = plain_response(&status_line(status), "text/plain; charset=utf-8", &body);
            stream.write_all(response.as_bytes()).await?;
        }
        "/get_code" => {
            let (status, body) = match client.fetch_code().await {
                Ok(Some(code)) => (200, code),
                // upstream refused; relay as a gateway miss so the page
                // leaves the editor unchanged
                Ok(None) => (502, String::new()),
                Err(e) => relay_error(e),
            };
            let response = plain_response(&status_line(status), "text/plain; charset=utf-8", &body);
            stream.write_all(response.as_bytes()).await?;
        }
        "/execute" => {
            let code = parse_form(&body).remove("code").unwrap_or_default();
            let (status, body) = match client.execute(&code).await {
                Ok(reply) => (200, reply),
                Err(e) => relay_error(e),
            };
            let response = plain_response(&status_line(status), "text/plain; charset=utf-8", &body);
            stream.write_all(response.as_bytes()).await?;
        }
        "/post_code" => {
            let code = parse_form(&body).remove("code").unwrap_or_default();
            let (status, body) = match client.push_code(&code).await {
                Ok(reply) => (200, reply),
                Err(e) => relay_error(e),
            };
            let response = plain_response(&status_line(status), "text/plain; charset=utf-8", &body);
            stream.write_all(response.as_bytes()).await?;
        }
        "/handle_user_message" => {
            let message = parse_form(&body).remove("message").unwrap_or_default();
            let (status, content_type, body) = match client.send_message(&message).await {
                Ok(reply) => (
                    200,
                    "application/json",
                    serde_json::to_string(&reply).unwrap_or_else(|_| "{}".to_string()),
                ),
                Err(e) => {
                    let (status, body) = relay_error(e);
                    (status, "text/plain; charset=utf-8", body)
                }
            };
            let response = plain_response(&status_line(status), content_type, &body);
            stream.write_all(response.as_bytes()).await?;
        }
        "/latest_log_stream" => {
            let headers = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\n\r\n";
            stream.write_all(headers.as_bytes()).await?;

            let (tx, mut rx) = mpsc::unbounded_channel::<String>();
            let upstream = client.clone();
            let relay_task = tokio::spawn(async move {
                if let Err(e) = upstream.stream_logs(tx).await {
                    warn!(error = %e, "log stream relay ended");
                }
            });

            while let Some(event) = rx.recv().await {
                let mut sse = String::new();
                for line in event.split('\n') {
                    sse.push_str("data: ");
                    sse.push_str(line);
                    sse.push('\n');
                }
                sse.push('\n');
                if stream.write_all(sse.as_bytes()).await.is_err() {
                    break;
                }
            }

            relay_task.abort();
        }
        _ => {
            let response = plain_response("404 Not Found", "text/plain; charset=utf-8", "not found");
            stream.write_all(response.as_bytes()).await?;
        }
    }

    Ok(())
}

/// Map a backend error onto the proxied response: upstream status codes
/// pass through, transport failures become a 502.
fn relay_error(e: WorkbenchError) -> (u16, String) {
    match e {
        WorkbenchError::Status { status, body } => (status, body),
        other => {
            warn!(error = %other, "backend call failed");
            (502, other.to_string())
        }
    }
}
