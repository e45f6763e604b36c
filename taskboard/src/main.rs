//! Command-line kanban board.
//!
//! Talks to the task REST API, or to an in-memory demo board with
//! `--offline`. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! # Print the personal board
//! cargo run --bin taskboard -- --base-url http://localhost:5000/api list
//!
//! # Move a task on a team board
//! TASKBOARD_TEAM=core cargo run --bin taskboard -- move 42 review
//!
//! # Try it without a server
//! cargo run --bin taskboard -- --offline list --date 2024-08
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::board::{Board, BoardError, BoardEvent};
use taskboard::config::{CliArgs, ClientConfig, Command, FilterArgs};
use taskboard::gateway::http::HttpGateway;
use taskboard::gateway::memory::MemoryGateway;
use taskboard::gateway::{GatewayError, TaskGateway, TaskScope};
use taskboard::render;
use taskboard::tasks::{TaskDraft, TaskEdit, TaskFilter};
use taskboard_proto::task::{Priority, Status, Task, TaskId, TaskKind, UserId};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file, using flags and defaults: {e}");
            ClientConfig::from_cli(&cli)
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| Command::List(FilterArgs::default()));
    tracing::debug!(?command, scope = %config.scope(), offline = cli.offline, "taskboard starting");

    let result = if cli.offline {
        let gateway = Arc::new(MemoryGateway::new());
        seed_demo(&gateway, &config.scope());
        run(gateway, &config, command).await
    } else {
        match HttpGateway::new(&config.base_url, config.request_timeout) {
            Ok(gateway) => {
                let gateway = match &config.token {
                    Some(token) => gateway.with_token(token.as_str()),
                    None => gateway,
                };
                run(Arc::new(gateway), &config, command).await
            }
            Err(e) => Err(e.into()),
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if let BoardError::Gateway(gw) = &e
                && gw.is_session_expired()
            {
                eprintln!("Your session has expired. Update the configured token and try again.");
            }
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging to stderr, or to `file_path` when given.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (writer, guard) = match file_path {
        Some(path) => {
            let log_dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name()?.to_str()?;
            let file_appender = tracing_appender::rolling::never(log_dir, file_name);
            tracing_appender::non_blocking(file_appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(env_filter)
        .with_ansi(file_path.is_none())
        .init();

    Some(guard)
}

/// Loads the board and executes one command against it.
async fn run<G: TaskGateway + 'static>(
    gateway: Arc<G>,
    config: &ClientConfig,
    command: Command,
) -> Result<(), BoardError> {
    let mut board = Board::new(gateway, config.scope(), config.board_settings());
    board.refresh().await?;

    match command {
        Command::List(args) => {
            let filter = TaskFilter::from(args);
            print!("{}", render::render_board(&board.filtered(&filter)));
        }
        Command::Add {
            title,
            due,
            description,
            priority,
            status,
            assignee,
            members,
        } => {
            let draft = TaskDraft {
                description,
                status,
                priority: priority.unwrap_or_default(),
                assignee,
                assignee_ids: members.into_iter().map(UserId::new).collect(),
                ..TaskDraft::new(title, due)
            };
            let id = board.create_task(draft).await?;
            println!("created {id}");
        }
        Command::Move { id, to } => {
            move_task(&mut board, &TaskId::new(id), to, config.event_buffer).await?;
        }
        Command::Edit {
            id,
            title,
            description,
            due,
            priority,
            assignee,
        } => {
            let edit = TaskEdit {
                title,
                description,
                due_date: due,
                priority,
                assignee,
                assignee_ids: None,
            };
            board.edit_task(&TaskId::new(id.as_str()), &edit).await?;
            println!("updated {id}");
        }
        Command::Rm { id } => {
            board.delete_task(&TaskId::new(id.as_str())).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

/// Applies the move locally, then waits for the background confirmation.
async fn move_task<G: TaskGateway + 'static>(
    board: &mut Board<G>,
    id: &TaskId,
    to: Status,
    event_buffer: usize,
) -> Result<(), BoardError> {
    let Some(drag) = board.drag_to(id, to) else {
        return Err(BoardError::TaskNotFound(id.clone()));
    };
    let (tx, mut rx) = mpsc::channel(event_buffer.max(1));
    let handle = match board.spawn_move(&drag, tx) {
        Ok(handle) => handle,
        Err(reason) => {
            println!("nothing to do ({reason:?})");
            return Ok(());
        }
    };
    println!("moved {id} to {to}, confirming...");

    let event = rx.recv().await;
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "move confirmation task failed");
    }
    match event {
        Some(event) => {
            board.apply_event(&event);
            match event {
                BoardEvent::MoveConfirmed { .. } => println!("confirmed"),
                BoardEvent::MoveUnreconciled { error, .. } => {
                    return Err(error.into());
                }
            }
        }
        None => {
            return Err(GatewayError::Unavailable("confirmation was not reported".to_string()).into());
        }
    }
    Ok(())
}

/// Demo content for `--offline`.
fn seed_demo(gateway: &MemoryGateway, scope: &TaskScope) {
    let demo = [
        ("1", "Sketch board layout", Status::Done, Priority::Low, (2024, 7, 20)),
        ("2", "Wire up task API", Status::InProgress, Priority::High, (2024, 8, 5)),
        ("3", "Review drag and drop", Status::Review, Priority::Medium, (2024, 8, 12)),
        ("4", "Write release notes", Status::Todo, Priority::Medium, (2024, 9, 1)),
    ];
    for (id, title, status, priority, (y, m, d)) in demo {
        let kind = match scope.team() {
            Some(team) => TaskKind::Team {
                team_id: team.clone(),
                assignee_ids: Vec::new(),
            },
            None => TaskKind::Personal {
                assignee: "Me".to_string(),
            },
        };
        gateway.seed_task(
            scope,
            &Task {
                id: TaskId::new(id),
                title: title.to_string(),
                description: None,
                due_date: NaiveDate::from_ymd_opt(y, m, d),
                status,
                priority,
                user_id: None,
                kind,
            },
        );
    }
}
