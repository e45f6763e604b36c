//! Status-partitioned task store.
//!
//! `TaskStore` is the single owner of the board's in-memory task lists.
//! Every mutation is synchronous and leaves each task in exactly one
//! column, the one named by its own `status` field.

use std::collections::HashSet;

use taskboard_proto::task::{Status, Task, TaskId};

use super::TaskEdit;

/// Tasks grouped by column. Always has all four columns, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    lists: [Vec<Task>; 4],
}

impl Columns {
    /// Creates four empty columns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Partitions tasks by their `status`, keeping input order per column.
    ///
    /// When an id repeats, only its last occurrence is kept.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let tasks: Vec<Task> = tasks.into_iter().collect();
        let mut seen = HashSet::with_capacity(tasks.len());
        let mut columns = Self::new();
        for task in tasks.into_iter().rev() {
            if seen.insert(task.id.clone()) {
                columns.lists[task.status.index()].push(task);
            }
        }
        for list in &mut columns.lists {
            list.reverse();
        }
        columns
    }

    /// Tasks in one column.
    #[must_use]
    pub fn column(&self, status: Status) -> &[Task] {
        &self.lists[status.index()]
    }

    /// Columns in board order.
    pub fn iter(&self) -> impl Iterator<Item = (Status, &[Task])> {
        Status::ALL.into_iter().map(|s| (s, self.column(s)))
    }

    /// Total number of tasks across all columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    /// Whether every column is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }

    /// Column and index of the task with `id`.
    #[must_use]
    pub fn find(&self, id: &TaskId) -> Option<(Status, usize)> {
        self.iter().find_map(|(status, tasks)| {
            tasks
                .iter()
                .position(|t| t.id == *id)
                .map(|index| (status, index))
        })
    }

    /// The task with `id`, wherever it is.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.lists.iter().flatten().find(|t| t.id == *id)
    }

    /// Keeps only the tasks matching `keep`, returning a new set of columns.
    #[must_use]
    pub fn retain_cloned(&self, mut keep: impl FnMut(Status, &Task) -> bool) -> Self {
        let mut out = Self::new();
        for (status, tasks) in self.iter() {
            out.lists[status.index()] = tasks.iter().filter(|&t| keep(status, t)).cloned().collect();
        }
        out
    }

    fn column_mut(&mut self, status: Status) -> &mut Vec<Task> {
        &mut self.lists[status.index()]
    }
}

/// Canonical client-side view of the board.
#[derive(Debug, Default)]
pub struct TaskStore {
    columns: Columns,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to all columns.
    #[must_use]
    pub const fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Tasks in one column.
    #[must_use]
    pub fn column(&self, status: Status) -> &[Task] {
        self.columns.column(status)
    }

    /// The task at `index` in `status`, if any.
    #[must_use]
    pub fn task_at(&self, status: Status, index: usize) -> Option<&Task> {
        self.columns.column(status).get(index)
    }

    /// The task with `id`, wherever it is.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.columns.get(id)
    }

    /// Replaces the whole board, as after a full fetch.
    pub fn replace_all(&mut self, columns: Columns) {
        tracing::debug!(tasks = columns.len(), "replacing board contents");
        self.columns = columns;
    }

    /// Appends a task to the column named by its `status`.
    ///
    /// A task already present under the same id is removed first, so an
    /// insert can never duplicate a task across columns.
    pub fn insert(&mut self, task: Task) {
        if self.remove_by_id(&task.id).is_some() {
            tracing::debug!(task_id = %task.id, "insert replaced existing task");
        }
        self.columns.column_mut(task.status).push(task);
    }

    /// Removes the task with `id` from whichever column holds it.
    ///
    /// Returns the removed task, or `None` if no column held it.
    pub fn remove_by_id(&mut self, id: &TaskId) -> Option<Task> {
        let mut removed = None;
        for list in &mut self.columns.lists {
            if let Some(pos) = list.iter().position(|t| t.id == *id) {
                removed = Some(list.remove(pos));
            }
            list.retain(|t| t.id != *id);
        }
        removed
    }

    /// Moves a task from `from` to the end of `to`, updating its `status`.
    ///
    /// Returns `false` without touching anything if `id` is not in `from`.
    pub fn relocate(&mut self, id: &TaskId, from: Status, to: Status) -> bool {
        let source = self.columns.column_mut(from);
        let Some(pos) = source.iter().position(|t| t.id == *id) else {
            return false;
        };
        let mut task = source.remove(pos);
        task.status = to;
        self.columns.column_mut(to).push(task);
        true
    }

    /// Applies a validated edit to the local copy of a task.
    ///
    /// Returns `false` if the task is not in the store.
    pub fn apply_edit(&mut self, id: &TaskId, edit: &TaskEdit) -> bool {
        let Some(task) = self.columns.lists.iter_mut().flatten().find(|t| t.id == *id) else {
            return false;
        };
        edit.apply_to(task);
        true
    }

    /// Checks that every task sits in the column named by its status and
    /// that no id appears twice.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .all(|(status, tasks)| tasks.iter().all(|t| t.status == status && seen.insert(&t.id)))
    }
}
