use std::io::Write;

use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::backend::BackendClient;
use crate::config::WorkbenchConfig;
use crate::Workbench;

/// One line of terminal input, classified.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Run,
    Reload,
    Clear,
    Chat(String),
}

/// Classify a trimmed input line. `None` for empty input.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    match line {
        "" => None,
        ":quit" | ":q" => Some(Command::Quit),
        ":run" => Some(Command::Run),
        ":reload" => Some(Command::Reload),
        ":clear" => Some(Command::Clear),
        _ => Some(Command::Chat(line.to_string())),
    }
}

/// Last line of a log snapshot — what the terminal echoes, since it has
/// no pane to repaint.
pub fn latest_line(snapshot: &str) -> &str {
    snapshot.lines().last().unwrap_or("")
}

/// Interactive terminal session: chat with the agent, `:run`, `:reload`,
/// `:clear`, `:quit`. Log events arrive on a background task and are
/// echoed between prompts.
pub async fn run(cfg: &WorkbenchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = BackendClient::new(&cfg.backend_url);
    let mut bench = Workbench::new(client.clone());

    eprintln!("{}", "  Agent Workbench (terminal mode)".bright_green());
    eprintln!(
        "{}",
        format!("  Backend: {}", cfg.backend_url).bright_blue()
    );
    eprintln!(
        "{}",
        "  Chat with the agent; :run :reload :clear :quit".bright_blue()
    );

    if let Err(e) = bench.on_load().await {
        eprintln!("{} {}", "  backend unavailable:".bright_red(), e);
    } else if !bench.editor.value().is_empty() {
        eprintln!("{}", "  loaded server-held code into the editor".bright_blue());
    }

    let (log_tx, mut log_rx) = mpsc::unbounded_channel::<String>();
    let log_client = client.clone();
    tokio::spawn(async move {
        if let Err(e) = log_client.stream_logs(log_tx).await {
            warn!(error = %e, "log stream ended");
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut log_open = true;
    prompt()?;

    loop {
        tokio::select! {
            event = log_rx.recv(), if log_open => {
                match event {
                    Some(data) => {
                        bench.apply_log_event(&data);
                        eprintln!(
                            "{} {}",
                            "[log]".bright_black(),
                            latest_line(bench.logs.content()).bright_black()
                        );
                    }
                    None => log_open = false,
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(command) = parse_command(&line) else {
                    prompt()?;
                    continue;
                };
                match command {
                    Command::Quit => break,
                    Command::Run => match bench.execute().await {
                        Ok(body) => eprintln!("{} {}", "[run]".bright_magenta(), body),
                        Err(e) => eprintln!("{} {}", "[run failed]".bright_red(), e),
                    },
                    Command::Reload => match bench.reload_code().await {
                        Ok(true) => eprintln!("{}", "[editor reloaded]".bright_blue()),
                        Ok(false) => eprintln!("{}", "[no code on the server]".bright_black()),
                        Err(e) => eprintln!("{} {}", "[reload failed]".bright_red(), e),
                    },
                    Command::Clear => match bench.clear_code().await {
                        Ok(()) => eprintln!("{}", "[editor cleared]".bright_blue()),
                        Err(e) => eprintln!("{} {}", "[clear failed]".bright_red(), e),
                    },
                    Command::Chat(message) => match bench.send_message(&message).await {
                        Ok(Some(reply)) => {
                            println!("{} {}", "\u{1F916}".bright_cyan(), reply.bright_cyan());
                        }
                        Ok(None) => {}
                        Err(e) => eprintln!("{} {}", "[chat failed]".bright_red(), e),
                    },
                }
                prompt()?;
            }
        }
    }

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("{} ", "you>".bright_green());
    std::io::stdout().flush()
}
