//! Property-based tests for the task store and filter engine.
//!
//! Uses proptest to verify:
//! 1. Any sequence of insert/remove/relocate keeps every task in the column
//!    named by its status, with no id in two places.
//! 2. Removing by id is idempotent.
//! 3. Filtering never mutates its input and is deterministic.
//! 4. Filtered output only ever narrows: every kept task was in the same
//!    column of the input.

use chrono::NaiveDate;
use proptest::prelude::*;
use taskboard::tasks::{Columns, TaskFilter, TaskStore, apply_filter};
use taskboard_proto::task::{Priority, Status, Task, TaskId, TaskKind, TeamId, UserId};

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

/// Small id space so operations frequently collide.
fn arb_id() -> impl Strategy<Value = TaskId> {
    (0u8..12).prop_map(|n| TaskId::new(format!("t{n}")))
}

fn arb_due_date() -> impl Strategy<Value = Option<NaiveDate>> {
    prop::option::weighted(0.9, (2023i32..=2025, 1u32..=12, 1u32..=28))
        .prop_map(|d| d.and_then(|(y, m, day)| NaiveDate::from_ymd_opt(y, m, day)))
}

fn arb_kind() -> impl Strategy<Value = TaskKind> {
    prop_oneof![
        prop::sample::select(vec!["Alice", "Bob", ""]).prop_map(|a| TaskKind::Personal {
            assignee: a.to_string(),
        }),
        (
            prop::sample::select(vec!["core", "ops"]),
            prop::collection::vec(prop::sample::select(vec!["u-1", "u-2", "u-3"]), 0..3),
        )
            .prop_map(|(team, members)| TaskKind::Team {
                team_id: TeamId::new(team),
                assignee_ids: members.into_iter().map(UserId::new).collect(),
            }),
    ]
}

fn arb_task() -> impl Strategy<Value = Task> {
    (arb_id(), arb_status(), arb_priority(), arb_due_date(), arb_kind()).prop_map(
        |(id, status, priority, due_date, kind)| Task {
            title: format!("Task {id}"),
            id,
            description: None,
            due_date,
            status,
            priority,
            user_id: None,
            kind,
        },
    )
}

fn arb_filter() -> impl Strategy<Value = TaskFilter> {
    (
        prop::sample::select(vec!["", "2024", "2024-08", "2025-01-15", "20"]),
        prop::sample::select(vec!["", "Alice", "u-2", "nobody"]),
        prop::sample::select(vec!["", "todo", "in-progress", "review", "done"]),
        prop::sample::select(vec!["", "core", "ops"]),
    )
        .prop_map(|(date, assignee, status, team)| TaskFilter {
            date: date.to_string(),
            assignee: assignee.to_string(),
            status: status.to_string(),
            team_id: team.to_string(),
        })
}

#[derive(Debug, Clone)]
enum Op {
    Insert(Task),
    Remove(TaskId),
    Relocate(TaskId, Status, Status),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_task().prop_map(Op::Insert),
        1 => arb_id().prop_map(Op::Remove),
        2 => (arb_id(), arb_status(), arb_status()).prop_map(|(id, from, to)| Op::Relocate(id, from, to)),
    ]
}

fn apply(store: &mut TaskStore, op: Op) {
    match op {
        Op::Insert(task) => store.insert(task),
        Op::Remove(id) => {
            store.remove_by_id(&id);
        }
        Op::Relocate(id, from, to) => {
            store.relocate(&id, from, to);
        }
    }
}

// --- Properties ---

proptest! {
    #[test]
    fn partition_invariant_holds(ops in prop::collection::vec(arb_op(), 0..64)) {
        let mut store = TaskStore::new();
        for op in ops {
            apply(&mut store, op);
            prop_assert!(store.is_consistent());
        }
    }

    #[test]
    fn relocate_reports_whether_it_moved(
        tasks in prop::collection::vec(arb_task(), 0..16),
        id in arb_id(),
        from in arb_status(),
        to in arb_status(),
    ) {
        let mut store = TaskStore::new();
        for task in tasks {
            store.insert(task);
        }
        let was_in_from = store.column(from).iter().any(|t| t.id == id);
        let total = store.columns().len();

        let moved = store.relocate(&id, from, to);

        prop_assert_eq!(moved, was_in_from);
        prop_assert_eq!(store.columns().len(), total);
        if moved {
            prop_assert_eq!(store.get(&id).map(|t| t.status), Some(to));
        }
        prop_assert!(store.is_consistent());
    }

    #[test]
    fn remove_by_id_is_idempotent(
        tasks in prop::collection::vec(arb_task(), 0..16),
        id in arb_id(),
    ) {
        let mut store = TaskStore::new();
        for task in tasks {
            store.insert(task);
        }
        store.remove_by_id(&id);
        let once = store.columns().clone();

        prop_assert!(store.remove_by_id(&id).is_none());
        prop_assert_eq!(store.columns(), &once);
        prop_assert!(store.get(&id).is_none());
    }

    #[test]
    fn filter_is_pure_and_deterministic(
        tasks in prop::collection::vec(arb_task(), 0..24),
        filter in arb_filter(),
    ) {
        let columns = Columns::from_tasks(tasks);
        let snapshot = columns.clone();

        let first = apply_filter(&columns, &filter);
        let second = apply_filter(&columns, &filter);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&columns, &snapshot);
    }

    #[test]
    fn filter_only_narrows(
        tasks in prop::collection::vec(arb_task(), 0..24),
        filter in arb_filter(),
    ) {
        let columns = Columns::from_tasks(tasks);
        let filtered = apply_filter(&columns, &filter);

        for (status, kept) in filtered.iter() {
            let source = columns.column(status);
            prop_assert!(kept.len() <= source.len());
            for task in kept {
                prop_assert!(source.contains(task));
                prop_assert!(filter.matches(task));
            }
        }
        for (status, source) in columns.iter() {
            let expected = source.iter().filter(|t| filter.matches(t)).count();
            prop_assert_eq!(filtered.column(status).len(), expected);
        }
    }
}
