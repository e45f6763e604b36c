//! Pure filter engine over status-partitioned tasks.

use taskboard_proto::task::Task;

use super::store::Columns;

/// Filter options. An empty string means "no constraint from this field";
/// all set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Prefix of the ISO due date: `2024`, `2024-08` or `2024-08-01`.
    pub date: String,
    /// Personal assignee name, or a user id contained in a team task's
    /// `assignee_ids`.
    pub assignee: String,
    /// Canonical status spelling (`todo`, `in-progress`, `review`, `done`).
    pub status: String,
    /// Owning team. Personal tasks never match a team constraint.
    pub team_id: String,
}

impl TaskFilter {
    /// Whether no field constrains anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
            && self.assignee.is_empty()
            && self.status.is_empty()
            && self.team_id.is_empty()
    }

    /// Whether `task` passes every set field.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if !self.date.is_empty()
            && !task
                .due_date_iso()
                .is_some_and(|iso| iso.starts_with(&self.date))
        {
            return false;
        }
        if !self.assignee.is_empty() && !task.is_assigned_to(&self.assignee) {
            return false;
        }
        if !self.status.is_empty() && self.status != task.status.as_str() {
            return false;
        }
        if !self.team_id.is_empty()
            && task.team_id().is_none_or(|team| team.as_str() != self.team_id)
        {
            return false;
        }
        true
    }
}

/// Narrows every column by `filter`, returning a new structure and leaving
/// `columns` untouched.
#[must_use]
pub fn apply_filter(columns: &Columns, filter: &TaskFilter) -> Columns {
    if filter.is_empty() {
        return columns.clone();
    }
    columns.retain_cloned(|_, task| filter.matches(task))
}
