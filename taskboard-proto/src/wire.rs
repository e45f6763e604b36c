//! JSON records exchanged with the task REST API.
//!
//! The server sends status and priority as free-form strings and due dates
//! as ISO strings (plain dates or full timestamps). Records are converted
//! into [`Task`] at the gateway boundary; anything that does not fit the
//! closed enums is rejected here instead of leaking into the store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Status, Task, TaskId, TaskKind, TeamId, UserId};

/// Errors raised while converting wire records into typed tasks.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// Status string is not one of the four board columns.
    #[error("unknown task status: {0:?}")]
    UnknownStatus(String),
    /// Priority string is not low, medium or high.
    #[error("unknown task priority: {0:?}")]
    UnknownPriority(String),
    /// Due date is not an ISO 8601 date.
    #[error("invalid due date: {0:?}")]
    InvalidDueDate(String),
    /// A field the conversion needs is missing.
    #[error("missing field: {0}")]
    MissingField(&'static str),
    /// The same id appears on more than one record of a list.
    #[error("duplicate task id: {0:?}")]
    DuplicateId(String),
    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(String),
}

/// A task as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Assignee display name (personal tasks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Due date, ISO 8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Free-form status string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Free-form priority string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Owning user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Owning team (team tasks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Assigned user ids (team tasks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<String>>,
}

/// Partial task body for create (`POST`) and update (`PUT`) requests.
///
/// Only the fields that are `Some` are serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New assignee display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// New due date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Owning user, sent on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Owning team, sent on team-task create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Assigned user ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<String>>,
}

impl TaskPatch {
    /// A patch that only changes the status column.
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether the patch carries no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parses a wire due date. Accepts `YYYY-MM-DD` and timestamps whose first
/// ten characters are such a date (`2024-08-01T00:00:00.000Z`).
///
/// # Errors
///
/// Returns [`WireError::InvalidDueDate`] if no date can be read.
pub fn parse_due_date(raw: &str) -> Result<NaiveDate, WireError> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| WireError::InvalidDueDate(raw.to_string()))
}

impl TryFrom<TaskRecord> for Task {
    type Error = WireError;

    /// Normalizes a wire record. A missing status defaults to `todo` and a
    /// missing priority to `medium`; present but unknown values are errors.
    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let id = record.id.ok_or(WireError::MissingField("id"))?;
        let status = match record.status.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => Status::Todo,
        };
        let priority = match record.priority.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => Priority::default(),
        };
        let due_date = match record.due_date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(parse_due_date(raw)?),
            _ => None,
        };
        let kind = match record.team_id {
            Some(team_id) => TaskKind::Team {
                team_id: TeamId::new(team_id),
                assignee_ids: record
                    .assignee_ids
                    .unwrap_or_default()
                    .into_iter()
                    .map(UserId::new)
                    .collect(),
            },
            None => TaskKind::Personal {
                assignee: record.assignee.unwrap_or_default(),
            },
        };

        Ok(Self {
            id: TaskId::new(id),
            title: record.title,
            description: record.description,
            due_date,
            status,
            priority,
            user_id: record.user_id.map(UserId::new),
            kind,
        })
    }
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        let (assignee, team_id, assignee_ids) = match &task.kind {
            TaskKind::Personal { assignee } => (Some(assignee.clone()), None, None),
            TaskKind::Team {
                team_id,
                assignee_ids,
            } => (
                None,
                Some(team_id.to_string()),
                Some(assignee_ids.iter().map(ToString::to_string).collect()),
            ),
        };
        Self {
            id: Some(task.id.to_string()),
            title: task.title.clone(),
            description: task.description.clone(),
            assignee,
            due_date: task.due_date_iso(),
            status: Some(task.status.to_string()),
            priority: Some(task.priority.to_string()),
            user_id: task.user_id.as_ref().map(ToString::to_string),
            team_id,
            assignee_ids,
        }
    }
}
