use anyhow::{Context, Result};
use client_sdk::KvClient;
use controller::{Applied, Operation, Session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ShellCommand {
    Put { key: String, value: String },
    Get { key: String },
    Compact,
    Status,
    Quit,
    Empty,
    Unknown(String),
}

/// `put <key> <value...>`, `get <key>`, `compact`, `status`, `quit`.
/// Missing arguments are passed on as empty input so the controller reports
/// them the same way the web page does.
pub(crate) fn parse_command(line: &str) -> ShellCommand {
    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();

    match command {
        "" => ShellCommand::Empty,
        "put" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, ""));
            ShellCommand::Put {
                key: key.to_string(),
                value: value.trim_start().to_string(),
            }
        }
        "get" => ShellCommand::Get {
            key: rest.to_string(),
        },
        "compact" => ShellCommand::Compact,
        "status" => ShellCommand::Status,
        "quit" | "exit" => ShellCommand::Quit,
        other => ShellCommand::Unknown(other.to_string()),
    }
}

pub(crate) async fn run(session: Session<KvClient>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();

    while let Some(line) = lines.next_line().await.context("failed to read command")? {
        let pending = match parse_command(&line) {
            ShellCommand::Put { key, value } => {
                session
                    .begin(Operation::Put, |fields| {
                        fields.put_key = key;
                        fields.put_value = value;
                    })
                    .await
            }
            ShellCommand::Get { key } => {
                session
                    .begin(Operation::Get, |fields| fields.get_key = key)
                    .await
            }
            ShellCommand::Compact => session.begin(Operation::Compact, |_| {}).await,
            ShellCommand::Status => {
                print_status(&session).await;
                continue;
            }
            ShellCommand::Quit => break,
            ShellCommand::Empty => continue,
            ShellCommand::Unknown(command) => {
                eprintln!("unknown command: {command} (expected put, get, compact, status or quit)");
                continue;
            }
        };

        debug!(
            operation = pending.ticket().operation().as_str(),
            seq = pending.ticket().seq(),
            "request started"
        );
        let session = session.clone();
        tasks.spawn(async move { print_applied(&session.complete(pending).await) });

        while let Some(joined) = tasks.try_join_next() {
            joined.context("shell request task failed")?;
        }
    }

    while let Some(joined) = tasks.join_next().await {
        joined.context("shell request task failed")?;
    }
    Ok(())
}

pub(crate) fn format_applied(applied: &Applied) -> String {
    format!(
        "[{} #{} {}] {}",
        applied.ticket.operation().as_str(),
        applied.ticket.seq(),
        applied.outcome.kind.style(),
        applied.outcome.message
    )
}

fn print_applied(applied: &Applied) {
    if applied.applied {
        println!("{}", format_applied(applied));
    } else {
        debug!(
            operation = applied.ticket.operation().as_str(),
            seq = applied.ticket.seq(),
            "outcome superseded by a newer request"
        );
    }
}

async fn print_status(session: &Session<KvClient>) {
    let board = session.board();
    let board = board.lock().await;
    for operation in [Operation::Put, Operation::Get, Operation::Compact] {
        match board.status(operation) {
            Some(line) => println!(
                "{:<8}{:?} [{}] {}",
                operation.as_str(),
                board.phase(operation),
                line.style(),
                line.text
            ),
            None => println!("{:<8}{:?}", operation.as_str(), board.phase(operation)),
        }
    }
}
