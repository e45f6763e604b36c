//! In-process gateway for tests and offline mode.
//!
//! Behaves like the REST API: it keeps wire records per scope, assigns
//! ids on create, merges partial updates and answers `404` for unknown
//! ids. Records go through the same normalization as HTTP responses, so a
//! seeded record with an unknown status or a repeated id fails a fetch
//! exactly like a real server response would. The team-filtered scope
//! shares the personal collection and lists only records of its team.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use taskboard_proto::codec;
use taskboard_proto::task::{Task, TaskId};
use taskboard_proto::wire::{TaskPatch, TaskRecord};
use uuid::Uuid;

use super::{GatewayError, TaskGateway, TaskScope};
use crate::tasks::Columns;

/// One request the gateway received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    /// `fetch_all`.
    FetchAll(TaskScope),
    /// `create`.
    Create(TaskScope),
    /// `update` (including status updates).
    Update(TaskScope, TaskId, TaskPatch),
    /// `remove`.
    Remove(TaskScope, TaskId),
}

#[derive(Debug, Default)]
struct State {
    records: HashMap<TaskScope, Vec<TaskRecord>>,
    calls: Vec<GatewayCall>,
    fail_next: usize,
    offline: bool,
}

/// Server stand-in holding records in memory.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw record as if the server already had it.
    pub fn seed(&self, scope: &TaskScope, record: TaskRecord) {
        self.state
            .lock()
            .records
            .entry(collection_of(scope))
            .or_default()
            .push(record);
    }

    /// Stores a typed task as if the server already had it.
    pub fn seed_task(&self, scope: &TaskScope, task: &Task) {
        self.seed(scope, TaskRecord::from(task));
    }

    /// Makes the next `count` requests fail with a `500`.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().fail_next = count;
    }

    /// While offline, every request fails with [`GatewayError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Delays every response by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Requests received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().calls.clone()
    }

    /// Server-side copy of a task, normalized.
    #[must_use]
    pub fn stored(&self, scope: &TaskScope, id: &TaskId) -> Option<Task> {
        let state = self.state.lock();
        let record = state
            .records
            .get(&collection_of(scope))?
            .iter()
            .find(|r| r.id.as_deref() == Some(id.as_str()))?
            .clone();
        drop(state);
        Task::try_from(record).ok()
    }

    /// Records the call and applies the failure knobs.
    fn admit(&self, call: GatewayCall) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.offline {
            return Err(GatewayError::Unavailable("memory gateway is offline".to_string()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(GatewayError::Status {
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Collection whose records a scope reads and writes.
fn collection_of(scope: &TaskScope) -> TaskScope {
    match scope {
        TaskScope::TeamFiltered(_) => TaskScope::Personal,
        other => other.clone(),
    }
}

fn not_found(id: &TaskId) -> GatewayError {
    GatewayError::Status {
        status: 404,
        message: format!("task {id} not found"),
    }
}

/// Merges the set fields of `patch` into `record`.
fn merge_patch(record: &mut TaskRecord, patch: &TaskPatch) {
    if let Some(title) = &patch.title {
        record.title.clone_from(title);
    }
    if patch.description.is_some() {
        record.description.clone_from(&patch.description);
    }
    if patch.assignee.is_some() {
        record.assignee.clone_from(&patch.assignee);
    }
    if patch.due_date.is_some() {
        record.due_date.clone_from(&patch.due_date);
    }
    if let Some(status) = patch.status {
        record.status = Some(status.to_string());
    }
    if let Some(priority) = patch.priority {
        record.priority = Some(priority.to_string());
    }
    if patch.user_id.is_some() {
        record.user_id.clone_from(&patch.user_id);
    }
    if patch.team_id.is_some() {
        record.team_id.clone_from(&patch.team_id);
    }
    if patch.assignee_ids.is_some() {
        record.assignee_ids.clone_from(&patch.assignee_ids);
    }
}

impl TaskGateway for MemoryGateway {
    async fn fetch_all(&self, scope: &TaskScope) -> Result<Columns, GatewayError> {
        self.delay().await;
        self.admit(GatewayCall::FetchAll(scope.clone()))?;
        let mut records = self
            .state
            .lock()
            .records
            .get(&collection_of(scope))
            .cloned()
            .unwrap_or_default();
        if let Some((_, team)) = scope.list_query() {
            records.retain(|r| r.team_id.as_deref() == Some(team));
        }
        let tasks = codec::tasks_from_records(records, scope.team())?;
        Ok(Columns::from_tasks(tasks))
    }

    async fn create(&self, scope: &TaskScope, patch: &TaskPatch) -> Result<Task, GatewayError> {
        self.delay().await;
        self.admit(GatewayCall::Create(scope.clone()))?;
        let mut record = TaskRecord {
            id: Some(Uuid::now_v7().to_string()),
            ..TaskRecord::default()
        };
        merge_patch(&mut record, patch);
        codec::stamp_team(&mut record, scope.team());
        let task = Task::try_from(record.clone())?;
        self.seed(scope, record);
        Ok(task)
    }

    async fn update(
        &self,
        scope: &TaskScope,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<(), GatewayError> {
        self.delay().await;
        self.admit(GatewayCall::Update(scope.clone(), id.clone(), patch.clone()))?;
        let mut state = self.state.lock();
        let record = state
            .records
            .get_mut(&collection_of(scope))
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| r.id.as_deref() == Some(id.as_str()))
            })
            .ok_or_else(|| not_found(id))?;
        merge_patch(record, patch);
        Ok(())
    }

    async fn remove(&self, scope: &TaskScope, id: &TaskId) -> Result<(), GatewayError> {
        self.delay().await;
        self.admit(GatewayCall::Remove(scope.clone(), id.clone()))?;
        let mut state = self.state.lock();
        let records = state
            .records
            .get_mut(&collection_of(scope))
            .ok_or_else(|| not_found(id))?;
        let before = records.len();
        records.retain(|r| r.id.as_deref() != Some(id.as_str()));
        if records.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}
