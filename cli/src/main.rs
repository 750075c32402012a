//! Omnis terminal chat client.
//!
//! A line-oriented REPL over the chat session: user lines go in, assistant
//! deltas stream out as they arrive, and trigger matches reveal a dashboard
//! placeholder after the standard delay. Runs against the configured agent
//! endpoint, or the scripted backend when none is configured.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use omnis_config::OmnisConfig;
use omnis_session::{ChatSession, DASHBOARD_REVEAL_DELAY, STREAM_ERROR_TEXT, SendError, SessionChange};
use omnis_transport::{Backend, HttpTransport, ScriptedTransport};
use omnis_types::{StreamFinishReason, default_trigger_rules};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    if let Some((path, file)) = open_log_file() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();
        tracing::info!(path = %path.display(), "Logging initialized");
        return;
    }

    // No log file means no logs; the terminal belongs to the chat.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> Option<(PathBuf, std::fs::File)> {
    let dir = OmnisConfig::path()?.parent()?.join("logs");
    fs::create_dir_all(&dir).ok()?;
    let path = dir.join("omnis.log");
    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;
    Some((path, file))
}

fn build_backend(config: &OmnisConfig) -> Result<Backend> {
    match config.agent_base_url() {
        Some(url) => {
            println!("Connected to agent endpoint: {url}");
            Ok(Backend::Http(HttpTransport::new(&url)?))
        }
        None => {
            println!("No agent endpoint configured; running the scripted demo agent.");
            Ok(Backend::Scripted(ScriptedTransport::default()))
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn print_delta(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

fn schedule_reveal(dashboard: String) {
    tokio::spawn(async move {
        tokio::time::sleep(DASHBOARD_REVEAL_DELAY).await;
        println!("\n[dashboard revealed: {dashboard}]");
        prompt();
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = OmnisConfig::load();
    let backend = build_backend(&config)?;
    let mut session = ChatSession::new(backend, default_trigger_rules(), config.user_id())
        .with_execute(config.execute());

    println!("Omnis chat. /reset clears the conversation, /quit exits.");
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim();
                match text {
                    "" => prompt(),
                    "/quit" | "/exit" => break,
                    "/reset" => {
                        session.reset();
                        println!("Conversation cleared.");
                        prompt();
                    }
                    _ => match session.send(text) {
                        Ok(_) => {}
                        Err(SendError::StreamActive(_)) => {
                            println!("Still replying - wait for the current response to finish.");
                        }
                        Err(SendError::Empty(_)) => prompt(),
                    },
                }
            }
            Some(change) = session.next_change(), if session.has_pending_work() => {
                match change {
                    SessionChange::AssistantDelta { text, .. } => print_delta(&text),
                    SessionChange::TurnFinished { reason, .. } => {
                        match reason {
                            StreamFinishReason::Done => println!(),
                            StreamFinishReason::Error(msg) => {
                                tracing::warn!(%msg, "Reply failed");
                                println!("\n{STREAM_ERROR_TEXT}");
                            }
                            StreamFinishReason::Cancelled => println!("\n[cancelled]"),
                        }
                        prompt();
                    }
                    SessionChange::TriggerMatched { dashboard, .. } => {
                        schedule_reveal(dashboard);
                    }
                }
            }
        }
    }

    Ok(())
}
