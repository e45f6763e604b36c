//! Plain-text board rendering.

use std::fmt::Write as _;

use taskboard_proto::task::{Priority, Status, Task, TaskKind};

use crate::tasks::Columns;

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "[ ]",
        Priority::Medium => "[!]",
        Priority::High => "[!!]",
    }
}

fn assignee_label(task: &Task) -> String {
    match &task.kind {
        TaskKind::Personal { assignee } if !assignee.is_empty() => format!("@{assignee}"),
        TaskKind::Personal { .. } => String::new(),
        TaskKind::Team {
            team_id,
            assignee_ids,
        } => {
            let members: Vec<&str> = assignee_ids.iter().map(|m| m.as_str()).collect();
            if members.is_empty() {
                format!("#{team_id}")
            } else {
                format!("#{team_id} @{}", members.join(",@"))
            }
        }
    }
}

/// One task line: `[!] Title  (due 2024-08-01, @Alice)  id=42`.
#[must_use]
pub fn task_line(task: &Task) -> String {
    let mut details = Vec::with_capacity(2);
    if let Some(due) = task.due_date_iso() {
        details.push(format!("due {due}"));
    }
    let who = assignee_label(task);
    if !who.is_empty() {
        details.push(who);
    }
    let mut line = format!("{} {}", priority_marker(task.priority), task.title);
    if !details.is_empty() {
        let _ = write!(line, "  ({})", details.join(", "));
    }
    let _ = write!(line, "  id={}", task.id);
    line
}

/// Renders all four columns in board order. Empty columns are shown.
#[must_use]
pub fn render_board(columns: &Columns) -> String {
    let mut out = String::new();
    for status in Status::ALL {
        let tasks = columns.column(status);
        let _ = writeln!(out, "== {} ({}) ==", status.title(), tasks.len());
        if tasks.is_empty() {
            out.push_str("  (empty)\n");
        }
        for task in tasks {
            let _ = writeln!(out, "  {}", task_line(task));
        }
    }
    out
}
