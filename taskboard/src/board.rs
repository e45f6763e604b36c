//! Board coordinator: optimistic moves and the create/edit/delete handlers.
//!
//! [`Board`] owns the [`TaskStore`] and is the only place that relocates a
//! task between columns. A move runs in two steps:
//!
//! ```text
//! drag ──► begin_move (sync)  ──► store relocated, UI can redraw
//!               │
//!               └─► PendingMove::confirm (async) ──► Reconciled | Unreconciled
//! ```
//!
//! The optimistic step always completes before any network I/O starts. A
//! failed confirmation leaves the store as moved unless the board was built
//! with `rollback_on_failure`. Only the most recent move of a task is ever
//! rolled back; a failure that a newer move has superseded is ignored.

use std::collections::HashMap;
use std::sync::Arc;

use taskboard_proto::task::{Status, TaskId, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::gateway::{GatewayError, TaskGateway, TaskScope};
use crate::tasks::{
    Columns, DEFAULT_MAX_TITLE_LEN, TaskDraft, TaskEdit, TaskError, TaskFilter, TaskStore,
    apply_filter,
};

/// A column position in a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragLocation {
    /// Column.
    pub status: Status,
    /// Index within the column.
    pub index: usize,
}

impl DragLocation {
    /// Creates a location.
    #[must_use]
    pub const fn new(status: Status, index: usize) -> Self {
        Self { status, index }
    }
}

/// Result of a drag-and-drop gesture, as reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragResult {
    /// Where the drag started.
    pub source: DragLocation,
    /// Where it was dropped; `None` when the drop was cancelled.
    pub destination: Option<DragLocation>,
}

/// Why a move did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The drop was cancelled.
    NoDestination,
    /// Dropped back into the source column.
    SameColumn,
    /// No task at the source position any more.
    Stale,
}

/// Terminal state of a move.
#[derive(Debug)]
pub enum MoveOutcome {
    /// No store mutation and no network call happened.
    Ignored(IgnoreReason),
    /// Store moved and the server accepted the new status.
    Reconciled {
        /// Moved task.
        task_id: TaskId,
        /// Column it now lives in.
        to: Status,
        /// Sequence number of the move.
        seq: u64,
    },
    /// Store moved but the server rejected or never saw the update.
    Unreconciled {
        /// Moved task.
        task_id: TaskId,
        /// Column it came from.
        from: Status,
        /// Column the store put it in.
        to: Status,
        /// Sequence number of the move.
        seq: u64,
        /// Why confirmation failed.
        error: GatewayError,
    },
}

impl MoveOutcome {
    /// Whether the store and server agree after this move.
    #[must_use]
    pub const fn is_reconciled(&self) -> bool {
        matches!(self, Self::Reconciled { .. })
    }

    /// The event a background confirmation reports; `None` for ignored moves.
    #[must_use]
    pub fn into_event(self) -> Option<BoardEvent> {
        match self {
            Self::Ignored(_) => None,
            Self::Reconciled { task_id, to, seq } => {
                Some(BoardEvent::MoveConfirmed { task_id, to, seq })
            }
            Self::Unreconciled {
                task_id,
                from,
                to,
                seq,
                error,
            } => Some(BoardEvent::MoveUnreconciled {
                task_id,
                from,
                to,
                seq,
                error,
            }),
        }
    }
}

/// A move whose optimistic step has been applied and whose confirmation is
/// still outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    /// Moved task.
    pub task_id: TaskId,
    /// Source column.
    pub from: Status,
    /// Destination column.
    pub to: Status,
    /// Board-local sequence number; later moves get larger numbers.
    pub seq: u64,
}

impl PendingMove {
    /// Sends the status update and reports the terminal state.
    pub async fn confirm<G: TaskGateway>(self, gateway: &G, scope: &TaskScope) -> MoveOutcome {
        match gateway.update_status(scope, &self.task_id, self.to).await {
            Ok(()) => {
                tracing::debug!(task_id = %self.task_id, to = %self.to, "move confirmed");
                MoveOutcome::Reconciled {
                    task_id: self.task_id,
                    to: self.to,
                    seq: self.seq,
                }
            }
            Err(error) => {
                tracing::warn!(
                    task_id = %self.task_id,
                    from = %self.from,
                    to = %self.to,
                    error = %error,
                    "move not confirmed by server"
                );
                MoveOutcome::Unreconciled {
                    task_id: self.task_id,
                    from: self.from,
                    to: self.to,
                    seq: self.seq,
                    error,
                }
            }
        }
    }
}

/// Events reported by background confirmations.
#[derive(Debug)]
pub enum BoardEvent {
    /// The server accepted a move.
    MoveConfirmed {
        /// Moved task.
        task_id: TaskId,
        /// New column.
        to: Status,
        /// Sequence number of the move.
        seq: u64,
    },
    /// The server did not accept a move.
    MoveUnreconciled {
        /// Moved task.
        task_id: TaskId,
        /// Column it came from.
        from: Status,
        /// Column the store put it in.
        to: Status,
        /// Sequence number of the move.
        seq: u64,
        /// Failure reported by the gateway.
        error: GatewayError,
    },
}

/// Errors from the board's create/edit/delete/refresh handlers.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The draft or edit failed validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] TaskError),
    /// The gateway call failed; the store is unchanged.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The task is not on the board.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
}

/// Who is acting and how the board reacts to failures.
#[derive(Debug, Clone)]
pub struct BoardSettings {
    /// Acting user, sent as owner on create.
    pub user_id: UserId,
    /// Acting user's display name, the default personal assignee.
    pub user_name: String,
    /// Maximum title length in characters.
    pub max_title_len: usize,
    /// Move a task back when its confirmation fails.
    pub rollback_on_failure: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            user_id: UserId::new("local"),
            user_name: "Me".to_string(),
            max_title_len: DEFAULT_MAX_TITLE_LEN,
            rollback_on_failure: false,
        }
    }
}

/// The task board: a store, the gateway it mirrors, and one scope.
pub struct Board<G> {
    store: TaskStore,
    gateway: Arc<G>,
    scope: TaskScope,
    settings: BoardSettings,
    next_seq: u64,
    /// Sequence number of the newest unsettled move per task.
    latest_moves: HashMap<TaskId, u64>,
}

impl<G: TaskGateway + 'static> Board<G> {
    /// Creates an empty board. Call [`refresh`](Self::refresh) to load it.
    #[must_use]
    pub fn new(gateway: Arc<G>, scope: TaskScope, settings: BoardSettings) -> Self {
        Self {
            store: TaskStore::new(),
            gateway,
            scope,
            settings,
            next_seq: 0,
            latest_moves: HashMap::new(),
        }
    }

    /// Read access to the store.
    #[must_use]
    pub const fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Collection this board mirrors.
    #[must_use]
    pub const fn scope(&self) -> &TaskScope {
        &self.scope
    }

    /// Gateway handle.
    #[must_use]
    pub const fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Columns narrowed by `filter`. The store is not modified.
    #[must_use]
    pub fn filtered(&self, filter: &TaskFilter) -> Columns {
        apply_filter(self.store.columns(), filter)
    }

    /// Reloads the whole board from the server.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the store keeps its previous contents.
    pub async fn refresh(&mut self) -> Result<usize, BoardError> {
        match self.gateway.fetch_all(&self.scope).await {
            Ok(columns) => {
                let count = columns.len();
                self.store.replace_all(columns);
                tracing::info!(scope = %self.scope, tasks = count, "board refreshed");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(scope = %self.scope, error = %e, "board refresh failed");
                Err(e.into())
            }
        }
    }

    /// Applies the optimistic half of a move.
    ///
    /// # Errors
    ///
    /// Returns the [`IgnoreReason`] when the gesture is a no-op; the store
    /// is untouched in that case.
    pub fn begin_move(&mut self, drag: &DragResult) -> Result<PendingMove, IgnoreReason> {
        let Some(destination) = drag.destination else {
            return Err(IgnoreReason::NoDestination);
        };
        let from = drag.source.status;
        let to = destination.status;
        if from == to {
            return Err(IgnoreReason::SameColumn);
        }
        let Some(task_id) = self
            .store
            .task_at(from, drag.source.index)
            .map(|t| t.id.clone())
        else {
            tracing::debug!(%from, index = drag.source.index, "stale drag ignored");
            return Err(IgnoreReason::Stale);
        };
        if !self.store.relocate(&task_id, from, to) {
            return Err(IgnoreReason::Stale);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.latest_moves.insert(task_id.clone(), seq);
        tracing::info!(%task_id, %from, %to, seq, "task moved");
        Ok(PendingMove {
            task_id,
            from,
            to,
            seq,
        })
    }

    /// Moves a task and waits for the server to confirm.
    pub async fn move_task(&mut self, drag: &DragResult) -> MoveOutcome {
        let pending = match self.begin_move(drag) {
            Ok(pending) => pending,
            Err(reason) => return MoveOutcome::Ignored(reason),
        };
        let outcome = pending.confirm(self.gateway.as_ref(), &self.scope).await;
        match &outcome {
            MoveOutcome::Reconciled { task_id, seq, .. } => {
                self.settle(task_id, *seq);
            }
            MoveOutcome::Unreconciled {
                task_id,
                from,
                to,
                seq,
                ..
            } => self.maybe_roll_back(task_id, *from, *to, *seq),
            MoveOutcome::Ignored(_) => {}
        }
        outcome
    }

    /// The drag gesture that drops task `id` at the end of column `to`.
    #[must_use]
    pub fn drag_to(&self, id: &TaskId, to: Status) -> Option<DragResult> {
        let (status, index) = self.store.columns().find(id)?;
        Some(DragResult {
            source: DragLocation::new(status, index),
            destination: Some(DragLocation::new(to, self.store.column(to).len())),
        })
    }

    /// Moves the task with `id` to the end of `to`.
    pub async fn move_by_id(&mut self, id: &TaskId, to: Status) -> MoveOutcome {
        match self.drag_to(id, to) {
            Some(drag) => self.move_task(&drag).await,
            None => MoveOutcome::Ignored(IgnoreReason::Stale),
        }
    }

    /// Applies a move and confirms it on a background task.
    ///
    /// The outcome arrives on `events`; feed it back through
    /// [`apply_event`](Self::apply_event).
    ///
    /// # Errors
    ///
    /// Returns the [`IgnoreReason`] when the gesture is a no-op; nothing is
    /// spawned in that case.
    pub fn spawn_move(
        &mut self,
        drag: &DragResult,
        events: mpsc::Sender<BoardEvent>,
    ) -> Result<JoinHandle<()>, IgnoreReason> {
        let pending = self.begin_move(drag)?;
        let gateway = Arc::clone(&self.gateway);
        let scope = self.scope.clone();
        Ok(tokio::spawn(async move {
            let outcome = pending.confirm(gateway.as_ref(), &scope).await;
            if let Some(event) = outcome.into_event()
                && events.send(event).await.is_err()
            {
                tracing::debug!("board event receiver dropped");
            }
        }))
    }

    /// Consumes a background confirmation event.
    pub fn apply_event(&mut self, event: &BoardEvent) {
        match event {
            BoardEvent::MoveConfirmed { task_id, to, seq } => {
                self.settle(task_id, *seq);
                tracing::debug!(%task_id, %to, "background move confirmed");
            }
            BoardEvent::MoveUnreconciled {
                task_id,
                from,
                to,
                seq,
                ..
            } => self.maybe_roll_back(task_id, *from, *to, *seq),
        }
    }

    /// Whether `seq` is the newest outstanding move of `task_id`.
    #[must_use]
    pub fn is_latest_move(&self, task_id: &TaskId, seq: u64) -> bool {
        self.latest_moves.get(task_id) == Some(&seq)
    }

    /// Forgets a finished move. Returns whether it was the task's newest.
    fn settle(&mut self, task_id: &TaskId, seq: u64) -> bool {
        if !self.is_latest_move(task_id, seq) {
            return false;
        }
        self.latest_moves.remove(task_id);
        true
    }

    fn maybe_roll_back(&mut self, task_id: &TaskId, from: Status, to: Status, seq: u64) {
        let latest = self.settle(task_id, seq);
        if !self.settings.rollback_on_failure {
            return;
        }
        if !latest {
            tracing::debug!(%task_id, seq, "failed move superseded, not rolled back");
            return;
        }
        if self.store.relocate(task_id, to, from) {
            tracing::info!(%task_id, %from, "move rolled back");
        }
    }

    /// Validates a draft, creates it on the server and inserts the result.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] before any network call, or
    /// [`BoardError::Gateway`] if the server rejects the task.
    pub async fn create_task(&mut self, draft: TaskDraft) -> Result<TaskId, BoardError> {
        draft.validate(self.settings.max_title_len)?;
        let patch = draft.into_patch(
            self.scope.team(),
            &self.settings.user_id,
            &self.settings.user_name,
        );
        let task = self.gateway.create(&self.scope, &patch).await?;
        let id = task.id.clone();
        tracing::info!(task_id = %id, status = %task.status, "task created");
        self.store.insert(task);
        Ok(id)
    }

    /// Validates an edit, sends it, and updates the local copy.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] (including an edit whose only
    /// change does not apply to the task's kind) or
    /// [`BoardError::TaskNotFound`] before any network call, or
    /// [`BoardError::Gateway`] if the update fails (the local copy is left
    /// as it was).
    pub async fn edit_task(&mut self, id: &TaskId, edit: &TaskEdit) -> Result<(), BoardError> {
        edit.validate(self.settings.max_title_len)?;
        let Some(task) = self.store.get(id) else {
            return Err(BoardError::TaskNotFound(id.clone()));
        };
        let patch = edit.to_patch(&task.kind);
        if patch.is_empty() {
            return Err(TaskError::EmptyEdit.into());
        }
        self.gateway.update(&self.scope, id, &patch).await?;
        self.store.apply_edit(id, edit);
        tracing::info!(task_id = %id, "task edited");
        Ok(())
    }

    /// Deletes a task on the server, then from the store.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Gateway`] if the delete fails; the task stays.
    pub async fn delete_task(&mut self, id: &TaskId) -> Result<(), BoardError> {
        self.gateway.remove(&self.scope, id).await?;
        self.store.remove_by_id(id);
        tracing::info!(task_id = %id, "task deleted");
        Ok(())
    }
}
