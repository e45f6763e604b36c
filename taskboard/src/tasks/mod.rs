//! Client-side task state for the board.
//!
//! Holds the status-partitioned [`TaskStore`], the pure filter engine, and
//! the draft/edit types that are validated before any store or network
//! interaction happens.

pub mod filter;
pub mod store;

pub use filter::{TaskFilter, apply_filter};
pub use store::{Columns, TaskStore};

use chrono::NaiveDate;
use taskboard_proto::task::{
    MAX_TASK_TITLE_LENGTH, Priority, Status, Task, TaskKind, TeamId, UserId,
};
use taskboard_proto::wire::TaskPatch;
use thiserror::Error;

/// Validation errors raised before a draft or edit leaves the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// Configured limit in characters.
        max: usize,
    },
    /// A due date is required when creating a task.
    #[error("task due date is required")]
    MissingDueDate,
    /// An edit that changes nothing.
    #[error("edit does not change any field")]
    EmptyEdit,
}

fn validate_title(title: &str, max_len: usize) -> Result<(), TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::TitleEmpty);
    }
    if title.chars().count() > max_len {
        return Err(TaskError::TitleTooLong { max: max_len });
    }
    Ok(())
}

/// Fields collected by the create form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Title, 1..=`max_len` characters.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Required due date.
    pub due_date: Option<NaiveDate>,
    /// Initial column; the server defaults to `todo` when absent.
    pub status: Option<Status>,
    /// Priority.
    pub priority: Priority,
    /// Personal assignee. Defaults to the acting user's name.
    pub assignee: Option<String>,
    /// Team assignees, only sent for team tasks.
    pub assignee_ids: Vec<UserId>,
}

impl TaskDraft {
    /// Starts a draft with the two required fields.
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            due_date: Some(due_date),
            ..Self::default()
        }
    }

    /// Checks the draft against the form rules.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TitleEmpty`], [`TaskError::TitleTooLong`] or
    /// [`TaskError::MissingDueDate`].
    pub fn validate(&self, max_title_len: usize) -> Result<(), TaskError> {
        validate_title(&self.title, max_title_len)?;
        if self.due_date.is_none() {
            return Err(TaskError::MissingDueDate);
        }
        Ok(())
    }

    /// Builds the create body. Personal drafts fall back to `user_name`
    /// as assignee; team drafts carry the team id and assignee ids.
    #[must_use]
    pub fn into_patch(self, team: Option<&TeamId>, user_id: &UserId, user_name: &str) -> TaskPatch {
        let (assignee, team_id, assignee_ids) = match team {
            Some(team) => (
                None,
                Some(team.to_string()),
                Some(self.assignee_ids.iter().map(ToString::to_string).collect()),
            ),
            None => (
                Some(self.assignee.unwrap_or_else(|| user_name.to_string())),
                None,
                None,
            ),
        };
        TaskPatch {
            title: Some(self.title),
            description: self.description,
            assignee,
            due_date: self.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            status: self.status,
            priority: Some(self.priority),
            user_id: Some(user_id.to_string()),
            team_id,
            assignee_ids,
        }
    }
}

/// A partial edit of an existing task.
///
/// Has no status field. Tasks change columns only through the move
/// operation on [`crate::board::Board`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New personal assignee (ignored for team tasks).
    pub assignee: Option<String>,
    /// New team assignees (ignored for personal tasks).
    pub assignee_ids: Option<Vec<UserId>>,
}

impl TaskEdit {
    /// Checks the edit against the form rules.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::EmptyEdit`] if nothing would change, or a title
    /// error if a new title is invalid.
    pub fn validate(&self, max_title_len: usize) -> Result<(), TaskError> {
        if *self == Self::default() {
            return Err(TaskError::EmptyEdit);
        }
        if let Some(title) = &self.title {
            validate_title(title, max_title_len)?;
        }
        Ok(())
    }

    /// Builds the update body for a task of `kind`.
    ///
    /// Only the assignee field that fits the kind is sent, matching what
    /// [`apply_to`](Self::apply_to) changes locally.
    #[must_use]
    pub fn to_patch(&self, kind: &TaskKind) -> TaskPatch {
        let (assignee, assignee_ids) = match kind {
            TaskKind::Personal { .. } => (self.assignee.clone(), None),
            TaskKind::Team { .. } => (
                None,
                self.assignee_ids
                    .as_ref()
                    .map(|ids| ids.iter().map(ToString::to_string).collect()),
            ),
        };
        TaskPatch {
            title: self.title.clone(),
            description: self.description.clone(),
            assignee,
            due_date: self.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            priority: self.priority,
            assignee_ids,
            ..TaskPatch::default()
        }
    }

    /// Applies the edit to a local copy. Never touches `status`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(due) = self.due_date {
            task.due_date = Some(due);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        match &mut task.kind {
            TaskKind::Personal { assignee } => {
                if let Some(name) = &self.assignee {
                    assignee.clone_from(name);
                }
            }
            TaskKind::Team { assignee_ids, .. } => {
                if let Some(ids) = &self.assignee_ids {
                    assignee_ids.clone_from(ids);
                }
            }
        }
    }
}

/// Default title limit, mirrored from the protocol crate.
pub const DEFAULT_MAX_TITLE_LEN: usize = MAX_TASK_TITLE_LENGTH;
