use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use cypher::api::{ApiConfig, HttpBackend};
use cypher::dispatch::Dispatcher;
use cypher::error::{ApiError, CypherError, ErrorCode};
use cypher::monitor::{JobMonitor, MonitorView};
use cypher::render;
use cypher::session::ConversationSession;
use cypher::suggestion::{Activation, activate};
use cypher::types::{View, ViewContext};

#[derive(Debug, thiserror::Error)]
enum ConsoleError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("stdin read failed: {0}")]
    Stdin(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "cypher-console", about = "Cypher command console and job progress monitor")]
struct Cli {
    /// Analysis backend base URL.
    #[arg(long, env = "CYPHER_API_BASE_URL")]
    base_url: Option<String>,

    /// Case whose analysis job to monitor at startup.
    #[arg(long)]
    case: Option<String>,

    /// Last known status of `--case`; an active status polls continuously.
    #[arg(long)]
    status: Option<String>,

    /// Screen the console starts on.
    #[arg(long, default_value = "dashboard")]
    view: View,
}

// =============================================================================
// COMMANDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Say(String),
    Retry,
    Clear,
    Mode,
    Go { view: View, sub_path: Option<String> },
    Pick(usize),
    Watch { case_id: String, status: Option<String> },
    Help,
    Quit,
}

const HELP: &str = "commands: <text> | /retry | /clear | /mode | /go <view> [sub] | /pick <n> | /watch <case> [status] | /quit";

/// Parse one input line. `Ok(None)` for blank lines; `Err` carries a usage hint.
fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(ConsoleCommand::Say(line.to_string())));
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let command = match name {
        "retry" => ConsoleCommand::Retry,
        "clear" => ConsoleCommand::Clear,
        "mode" => ConsoleCommand::Mode,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "go" => {
            let view = words.next().ok_or("usage: /go <view> [sub]")?.parse::<View>()?;
            ConsoleCommand::Go { view, sub_path: words.next().map(str::to_string) }
        }
        "pick" => {
            let n = words
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .ok_or("usage: /pick <n>")?;
            ConsoleCommand::Pick(n)
        }
        "watch" => {
            let case_id = words.next().ok_or("usage: /watch <case> [status]")?.to_string();
            ConsoleCommand::Watch { case_id, status: words.next().map(str::to_string) }
        }
        other => return Err(format!("unknown command: /{other}")),
    };
    Ok(Some(command))
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), ConsoleError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = ApiConfig::from_lookup(|key| match (key, &cli.base_url) {
        ("CYPHER_API_BASE_URL", Some(url)) => Some(url.clone()),
        _ => std::env::var(key).ok(),
    })?;
    let backend = Arc::new(HttpBackend::new(&config)?);
    tracing::info!(base_url = backend.base_url(), "cypher-console starting");

    let session = ConversationSession::new(backend.clone(), config.history_window);
    let dispatcher = Dispatcher::new(backend.clone());
    let mut monitor = JobMonitor::new(backend, config.poll_interval);
    let printer = tokio::spawn(print_progress(monitor.subscribe()));

    let mut view = ViewContext::new(cli.view);
    if let Some(case_id) = cli.case {
        view.case_id = Some(case_id.clone());
        monitor.watch(&case_id, cli.status.as_deref());
    }

    println!("{}", session.empty_state_hint());
    let mut printed = 0;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{usage}");
                continue;
            }
        };

        let result = match command {
            ConsoleCommand::Quit => break,
            ConsoleCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
            ConsoleCommand::Say(text) => session.send_message(&text, &view).await,
            ConsoleCommand::Retry => session.retry_last(&view).await,
            ConsoleCommand::Clear => {
                session.clear_history();
                printed = 0;
                println!("{}", session.empty_state_hint());
                Ok(())
            }
            ConsoleCommand::Mode => {
                let mode = session.toggle_assistant_mode();
                println!("mode: {}", mode.as_str());
                Ok(())
            }
            ConsoleCommand::Go { view: target, sub_path } => {
                view.navigate(target, sub_path);
                println!("view: {}", describe_view(&view));
                Ok(())
            }
            ConsoleCommand::Watch { case_id, status } => {
                view.case_id = Some(case_id.clone());
                monitor.watch(&case_id, status.as_deref());
                Ok(())
            }
            ConsoleCommand::Pick(n) => pick(&session, &dispatcher, n, &mut view).await,
        };

        if let Err(e) = result {
            println!("! {e} [{}]", e.error_code());
        }
        let messages = session.messages();
        for msg in messages.iter().skip(printed) {
            println!("{}", render::message_block(msg));
        }
        printed = messages.len();
    }

    monitor.stop();
    printer.abort();
    Ok(())
}

async fn pick(
    session: &ConversationSession,
    dispatcher: &Dispatcher,
    n: usize,
    view: &mut ViewContext,
) -> Result<(), CypherError> {
    let suggestions = session.latest_suggestions();
    let Some(suggestion) = suggestions.get(n - 1) else {
        println!("no suggestion #{n}");
        return Ok(());
    };
    match activate(session, dispatcher, suggestion, view).await? {
        Activation::Navigated { .. } => println!("view: {}", describe_view(view)),
        Activation::FormOpened { form, .. } => println!("form: {form}"),
        Activation::Sent | Activation::Retried | Activation::Mutated(_) | Activation::Failed => {}
    }
    Ok(())
}

fn describe_view(view: &ViewContext) -> String {
    match &view.sub_path {
        Some(sub) => format!("{}/{sub}", view.view),
        None => view.view.to_string(),
    }
}

/// Print new log lines and the status line after every processed poll.
async fn print_progress(mut rx: watch::Receiver<MonitorView>) {
    let mut job_id = String::new();
    let mut last_seen: Option<String> = None;

    while rx.changed().await.is_ok() {
        let view = rx.borrow_and_update().clone();
        if view.job_id != job_id {
            job_id.clone_from(&view.job_id);
            last_seen = None;
        }

        let start = last_seen
            .as_deref()
            .and_then(|id| view.log.iter().position(|e| e.id == id))
            .map_or(0, |i| i + 1);
        for entry in &view.log[start..] {
            println!("{}", render::log_line(entry));
        }
        if let Some(last) = view.log.last() {
            last_seen = Some(last.id.clone());
        }

        if view.status.is_some() {
            println!("{}", render::status_line(&view));
        }
        if view.terminal.is_some() {
            for line in render::top_insights(&view) {
                println!("{line}");
            }
        }
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
