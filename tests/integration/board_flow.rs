//! Integration tests for board flows over the in-memory gateway.
//!
//! Covers the optimistic move lifecycle, create/edit/delete handlers,
//! filtering of a live board, and recovery through refresh.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc;

use taskboard::board::{
    Board, BoardError, BoardEvent, BoardSettings, DragLocation, DragResult, IgnoreReason,
    MoveOutcome,
};
use taskboard::gateway::{GatewayError, TaskScope};
use taskboard::gateway::memory::{GatewayCall, MemoryGateway};
use taskboard::tasks::{TaskDraft, TaskEdit, TaskError, TaskFilter};
use taskboard_proto::task::{Priority, Status, Task, TaskId, TaskKind, TeamId, UserId};
use taskboard_proto::wire::WireError;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn personal_task(id: &str, status: Status, due: NaiveDate, assignee: &str) -> Task {
    Task {
        id: TaskId::new(id),
        title: format!("Task {id}"),
        description: None,
        due_date: Some(due),
        status,
        priority: Priority::Medium,
        user_id: Some(UserId::new("u-1")),
        kind: TaskKind::Personal {
            assignee: assignee.to_string(),
        },
    }
}

fn settings() -> BoardSettings {
    BoardSettings {
        user_id: UserId::new("u-1"),
        user_name: "Alice".to_string(),
        ..BoardSettings::default()
    }
}

async fn board_with(
    scope: TaskScope,
    tasks: &[Task],
    settings: BoardSettings,
) -> Board<MemoryGateway> {
    let gateway = Arc::new(MemoryGateway::new());
    for task in tasks {
        gateway.seed_task(&scope, task);
    }
    let mut board = Board::new(gateway, scope, settings);
    board.refresh().await.unwrap();
    board
}

fn drop_into(from: Status, index: usize, to: Status) -> DragResult {
    DragResult {
        source: DragLocation::new(from, index),
        destination: Some(DragLocation::new(to, 0)),
    }
}

fn column_ids(board: &Board<MemoryGateway>, status: Status) -> Vec<String> {
    board
        .store()
        .column(status)
        .iter()
        .map(|t| t.id.to_string())
        .collect()
}

// ===========================================================================
// Optimistic moves
// ===========================================================================

#[tokio::test]
async fn move_is_visible_while_confirmation_is_in_flight() {
    let mut board = board_with(
        TaskScope::Personal,
        &[personal_task("t1", Status::Todo, date(2024, 8, 1), "Alice")],
        settings(),
    )
    .await;
    board.gateway().set_latency(Some(Duration::from_millis(50)));

    let (tx, mut rx) = mpsc::channel(8);
    let handle = board
        .spawn_move(&drop_into(Status::Todo, 0, Status::Done), tx)
        .unwrap();

    // Confirmation is still sleeping: the store already shows the move and
    // the server has not seen the update.
    assert!(board.store().column(Status::Todo).is_empty());
    assert_eq!(column_ids(&board, Status::Done), vec!["t1"]);
    assert_eq!(board.gateway().calls().len(), 1);

    handle.await.unwrap();
    let event = rx.recv().await.unwrap();
    assert!(matches!(event, BoardEvent::MoveConfirmed { to: Status::Done, .. }));
    board.apply_event(&event);
    assert_eq!(column_ids(&board, Status::Done), vec!["t1"]);
}

#[tokio::test]
async fn failed_confirmation_is_unreconciled_until_refresh() {
    let mut board = board_with(
        TaskScope::Personal,
        &[personal_task("t1", Status::Todo, date(2024, 8, 1), "Alice")],
        settings(),
    )
    .await;
    board.gateway().fail_next(1);

    let outcome = board
        .move_task(&drop_into(Status::Todo, 0, Status::Review))
        .await;
    let MoveOutcome::Unreconciled {
        task_id, from, to, ..
    } = outcome
    else {
        panic!("expected unreconciled");
    };
    assert_eq!(task_id.as_str(), "t1");
    assert_eq!((from, to), (Status::Todo, Status::Review));

    // Local state diverges from the server...
    assert_eq!(column_ids(&board, Status::Review), vec!["t1"]);
    let server = board
        .gateway()
        .stored(&TaskScope::Personal, &TaskId::new("t1"))
        .unwrap();
    assert_eq!(server.status, Status::Todo);

    // ...until the next refresh brings the server's view back.
    board.refresh().await.unwrap();
    assert_eq!(column_ids(&board, Status::Todo), vec!["t1"]);
    assert!(board.store().column(Status::Review).is_empty());
}

#[tokio::test]
async fn rollback_policy_applies_to_background_events() {
    let settings = BoardSettings {
        rollback_on_failure: true,
        ..settings()
    };
    let mut board = board_with(
        TaskScope::Personal,
        &[personal_task("t1", Status::InProgress, date(2024, 8, 1), "Alice")],
        settings,
    )
    .await;
    board.gateway().set_offline(true);

    let (tx, mut rx) = mpsc::channel(1);
    board
        .spawn_move(&drop_into(Status::InProgress, 0, Status::Done), tx)
        .unwrap();
    assert_eq!(column_ids(&board, Status::Done), vec!["t1"]);

    let event = rx.recv().await.unwrap();
    assert!(matches!(event, BoardEvent::MoveUnreconciled { .. }));
    board.apply_event(&event);

    assert_eq!(column_ids(&board, Status::InProgress), vec!["t1"]);
    assert_eq!(
        board.store().column(Status::InProgress)[0].status,
        Status::InProgress
    );
    assert!(board.store().is_consistent());
}

#[tokio::test]
async fn noop_gestures_never_reach_the_gateway() {
    let mut board = board_with(
        TaskScope::Personal,
        &[personal_task("t1", Status::Review, date(2024, 8, 1), "Alice")],
        settings(),
    )
    .await;

    let same = drop_into(Status::Review, 0, Status::Review);
    let cancelled = DragResult {
        source: DragLocation::new(Status::Review, 0),
        destination: None,
    };
    let stale = drop_into(Status::Review, 5, Status::Done);

    assert!(matches!(
        board.move_task(&same).await,
        MoveOutcome::Ignored(IgnoreReason::SameColumn)
    ));
    assert!(matches!(
        board.move_task(&cancelled).await,
        MoveOutcome::Ignored(IgnoreReason::NoDestination)
    ));
    assert!(matches!(
        board.move_task(&stale).await,
        MoveOutcome::Ignored(IgnoreReason::Stale)
    ));

    assert_eq!(
        board.gateway().calls(),
        vec![GatewayCall::FetchAll(TaskScope::Personal)]
    );
    assert_eq!(column_ids(&board, Status::Review), vec!["t1"]);
}

#[tokio::test]
async fn consecutive_moves_keep_partition() {
    let tasks = [
        personal_task("a", Status::Todo, date(2024, 8, 1), "Alice"),
        personal_task("b", Status::Todo, date(2024, 8, 2), "Alice"),
        personal_task("c", Status::Todo, date(2024, 8, 3), "Alice"),
    ];
    let mut board = board_with(TaskScope::Personal, &tasks, settings()).await;

    // Move "b" twice before anyone looks at the result.
    let (tx, mut rx) = mpsc::channel(4);
    board
        .spawn_move(&drop_into(Status::Todo, 1, Status::InProgress), tx.clone())
        .unwrap();
    board
        .spawn_move(&drop_into(Status::InProgress, 0, Status::Done), tx)
        .unwrap();

    for _ in 0..2 {
        let event = rx.recv().await.unwrap();
        board.apply_event(&event);
    }

    assert_eq!(column_ids(&board, Status::Todo), vec!["a", "c"]);
    assert_eq!(column_ids(&board, Status::Done), vec!["b"]);
    assert!(board.store().column(Status::InProgress).is_empty());
    assert!(board.store().is_consistent());
}

// ===========================================================================
// Create / edit / delete
// ===========================================================================

#[tokio::test]
async fn task_lifecycle_on_personal_board() {
    let mut board = board_with(TaskScope::Personal, &[], settings()).await;

    let draft = TaskDraft {
        description: Some("API reference".to_string()),
        priority: Priority::High,
        ..TaskDraft::new("Write docs", date(2024, 8, 15))
    };
    let id = board.create_task(draft).await.unwrap();
    assert_eq!(column_ids(&board, Status::Todo), vec![id.to_string()]);
    let created = board.store().get(&id).unwrap();
    assert!(created.is_assigned_to("Alice"));
    assert_eq!(created.user_id, Some(UserId::new("u-1")));

    assert!(board.move_by_id(&id, Status::Review).await.is_reconciled());

    let edit = TaskEdit {
        title: Some("Write API docs".to_string()),
        ..TaskEdit::default()
    };
    board.edit_task(&id, &edit).await.unwrap();
    let edited = board.store().get(&id).unwrap();
    assert_eq!(edited.title, "Write API docs");
    assert_eq!(edited.status, Status::Review);

    let server = board.gateway().stored(&TaskScope::Personal, &id).unwrap();
    assert_eq!(server.title, "Write API docs");
    assert_eq!(server.status, Status::Review);

    board.delete_task(&id).await.unwrap();
    assert!(board.store().columns().is_empty());
    assert!(board.gateway().stored(&TaskScope::Personal, &id).is_none());
}

#[tokio::test]
async fn team_board_creates_team_tasks() {
    let scope = TaskScope::Team(TeamId::new("core"));
    let mut board = board_with(scope.clone(), &[], settings()).await;

    let draft = TaskDraft {
        assignee_ids: vec![UserId::new("u-2"), UserId::new("u-3")],
        status: Some(Status::InProgress),
        ..TaskDraft::new("Plan sprint", date(2024, 8, 20))
    };
    let id = board.create_task(draft).await.unwrap();

    let task = board.store().get(&id).unwrap();
    assert_eq!(task.status, Status::InProgress);
    assert_eq!(task.team_id(), Some(&TeamId::new("core")));
    assert!(task.is_assigned_to("u-3"));
    assert!(!task.is_assigned_to("Alice"));
    assert!(board.gateway().stored(&TaskScope::Personal, &id).is_none());
}

#[tokio::test]
async fn team_edit_sends_only_team_assignees() {
    let scope = TaskScope::Team(TeamId::new("core"));
    let mut board = board_with(scope.clone(), &[], settings()).await;
    let draft = TaskDraft {
        assignee_ids: vec![UserId::new("u-2")],
        ..TaskDraft::new("Plan sprint", date(2024, 8, 20))
    };
    let id = board.create_task(draft).await.unwrap();
    let calls_before = board.gateway().calls().len();

    let personal_only = TaskEdit {
        assignee: Some("Bob".to_string()),
        ..TaskEdit::default()
    };
    assert!(matches!(
        board.edit_task(&id, &personal_only).await,
        Err(BoardError::Validation(TaskError::EmptyEdit))
    ));
    assert_eq!(board.gateway().calls().len(), calls_before);

    let edit = TaskEdit {
        assignee: Some("Bob".to_string()),
        assignee_ids: Some(vec![UserId::new("u-3")]),
        ..TaskEdit::default()
    };
    board.edit_task(&id, &edit).await.unwrap();
    let Some(GatewayCall::Update(_, _, patch)) = board.gateway().calls().pop() else {
        panic!("expected update");
    };
    assert!(patch.assignee.is_none());
    assert_eq!(patch.assignee_ids, Some(vec!["u-3".to_string()]));

    let local = board.store().get(&id).unwrap().clone();
    let server = board.gateway().stored(&scope, &id).unwrap();
    assert_eq!(local, server);
    assert!(local.is_assigned_to("u-3"));
}

#[tokio::test]
async fn invalid_drafts_fail_before_network() {
    let mut board = board_with(TaskScope::Personal, &[], settings()).await;

    let blank = TaskDraft::new("   ", date(2024, 8, 1));
    assert!(matches!(
        board.create_task(blank).await,
        Err(BoardError::Validation(TaskError::TitleEmpty))
    ));

    let undated = TaskDraft {
        title: "No date".to_string(),
        ..TaskDraft::default()
    };
    assert!(matches!(
        board.create_task(undated).await,
        Err(BoardError::Validation(TaskError::MissingDueDate))
    ));

    let exact = TaskDraft::new("x".repeat(100), date(2024, 8, 1));
    assert!(board.create_task(exact).await.is_ok());

    let calls = board.gateway().calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[1], GatewayCall::Create(_)));
}

#[tokio::test]
async fn failed_create_leaves_store_unchanged() {
    let mut board = board_with(
        TaskScope::Personal,
        &[personal_task("t1", Status::Todo, date(2024, 8, 1), "Alice")],
        settings(),
    )
    .await;
    let before = board.store().columns().clone();
    board.gateway().fail_next(1);

    let result = board
        .create_task(TaskDraft::new("Will fail", date(2024, 8, 2)))
        .await;

    assert!(matches!(result, Err(BoardError::Gateway(_))));
    assert_eq!(*board.store().columns(), before);
}

#[tokio::test]
async fn delete_of_unknown_task_propagates_not_found() {
    let mut board = board_with(TaskScope::Personal, &[], settings()).await;
    let err = board.delete_task(&TaskId::new("ghost")).await.unwrap_err();
    let BoardError::Gateway(gw) = err else {
        panic!("expected gateway error");
    };
    assert!(!gw.is_session_expired());
    assert!(board.store().columns().is_empty());
}

// ===========================================================================
// Filtering a live board
// ===========================================================================

#[tokio::test]
async fn month_filter_after_moves() {
    let tasks = [
        personal_task("aug", Status::Todo, date(2024, 8, 1), "Alice"),
        personal_task("sep", Status::Todo, date(2024, 9, 1), "Bob"),
    ];
    let mut board = board_with(TaskScope::Personal, &tasks, settings()).await;
    assert!(board.move_by_id(&TaskId::new("aug"), Status::Done).await.is_reconciled());

    let filter = TaskFilter {
        date: "2024-08".to_string(),
        ..TaskFilter::default()
    };
    let view = board.filtered(&filter);

    assert!(view.column(Status::Todo).is_empty());
    assert_eq!(view.column(Status::Done)[0].id.as_str(), "aug");
    assert_eq!(view.len(), 1);
    // The store itself is untouched by filtering.
    assert_eq!(board.store().columns().len(), 2);
}

#[tokio::test]
async fn refresh_failure_keeps_last_good_board() {
    let mut board = board_with(
        TaskScope::Personal,
        &[personal_task("t1", Status::Done, date(2024, 8, 1), "Alice")],
        settings(),
    )
    .await;
    board.gateway().set_offline(true);

    assert!(board.refresh().await.is_err());
    assert_eq!(column_ids(&board, Status::Done), vec!["t1"]);
}

#[tokio::test]
async fn refresh_with_repeated_id_is_rejected() {
    let mut board = board_with(
        TaskScope::Personal,
        &[personal_task("t0", Status::Review, date(2024, 8, 1), "Alice")],
        settings(),
    )
    .await;
    let before = board.store().columns().clone();

    let gateway = board.gateway();
    gateway.seed_task(
        &TaskScope::Personal,
        &personal_task("t1", Status::Todo, date(2024, 8, 2), "Alice"),
    );
    gateway.seed_task(
        &TaskScope::Personal,
        &personal_task("t1", Status::Done, date(2024, 8, 2), "Alice"),
    );

    let err = board.refresh().await.unwrap_err();
    assert!(matches!(
        err,
        BoardError::Gateway(GatewayError::Decode(WireError::DuplicateId(ref id))) if id == "t1"
    ));
    assert_eq!(*board.store().columns(), before);

    // The next gesture still moves exactly one task.
    assert!(board.move_by_id(&TaskId::new("t0"), Status::Done).await.is_reconciled());
    assert_eq!(column_ids(&board, Status::Done), vec!["t0"]);
    assert!(board.store().is_consistent());
}
