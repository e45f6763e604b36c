//! JSON encode/decode for request and response bodies.
//!
//! Decoding a task list is all-or-nothing: one record with an unknown
//! status, or an id seen twice, fails the whole batch so a fetch never
//! yields a partial or self-contradicting board.

use std::collections::HashSet;

use crate::task::{Task, TeamId};
use crate::wire::{TaskPatch, TaskRecord, WireError};

/// Encodes a [`TaskPatch`] as a JSON request body.
///
/// # Errors
///
/// Returns [`WireError::Json`] if serialization fails.
pub fn encode_patch(patch: &TaskPatch) -> Result<Vec<u8>, WireError> {
    serde_json::to_vec(patch).map_err(|e| WireError::Json(e.to_string()))
}

/// Encodes task records as a JSON array, the shape of a list response.
///
/// # Errors
///
/// Returns [`WireError::Json`] if serialization fails.
pub fn encode_records(records: &[TaskRecord]) -> Result<Vec<u8>, WireError> {
    serde_json::to_vec(records).map_err(|e| WireError::Json(e.to_string()))
}

/// Decodes a single task record body into a typed [`Task`].
///
/// Team endpoints may omit `teamId` on their records; `team` is stamped on
/// such records before conversion.
///
/// # Errors
///
/// Returns [`WireError::Json`] for malformed JSON, or the conversion error
/// for records that do not fit the typed model.
pub fn decode_task(bytes: &[u8], team: Option<&TeamId>) -> Result<Task, WireError> {
    let record: TaskRecord =
        serde_json::from_slice(bytes).map_err(|e| WireError::Json(e.to_string()))?;
    task_from_record(record, team)
}

/// Decodes a JSON array of task records.
///
/// # Errors
///
/// Returns [`WireError::Json`] for malformed JSON, otherwise the first
/// error from [`tasks_from_records`].
pub fn decode_tasks(bytes: &[u8], team: Option<&TeamId>) -> Result<Vec<Task>, WireError> {
    let records: Vec<TaskRecord> =
        serde_json::from_slice(bytes).map_err(|e| WireError::Json(e.to_string()))?;
    tasks_from_records(records, team)
}

/// Converts a list response into typed tasks.
///
/// # Errors
///
/// Returns the first conversion error, or [`WireError::DuplicateId`] when
/// two records share an id.
pub fn tasks_from_records(
    records: Vec<TaskRecord>,
    team: Option<&TeamId>,
) -> Result<Vec<Task>, WireError> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut tasks = Vec::with_capacity(records.len());
    for record in records {
        let task = task_from_record(record, team)?;
        if !seen.insert(task.id.clone()) {
            return Err(WireError::DuplicateId(task.id.to_string()));
        }
        tasks.push(task);
    }
    Ok(tasks)
}

/// Stamps `team` on a record and converts it.
///
/// # Errors
///
/// Returns the conversion error for records that do not fit the typed model.
pub fn task_from_record(mut record: TaskRecord, team: Option<&TeamId>) -> Result<Task, WireError> {
    stamp_team(&mut record, team);
    Task::try_from(record)
}

/// Sets `teamId` on a record that lacks one.
pub fn stamp_team(record: &mut TaskRecord, team: Option<&TeamId>) {
    if record.team_id.is_none()
        && let Some(team) = team
    {
        record.team_id = Some(team.to_string());
    }
}
