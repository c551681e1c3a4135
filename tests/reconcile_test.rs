mod helpers;

use habitus::error::Entity;
use habitus::store::RecordStore;
use habitus::EngineError;
use helpers::{day_n, days_ago, harness};
use std::sync::Arc;

#[tokio::test]
async fn stale_habit_is_reset_on_read_and_persisted() {
    let h = harness();
    let user = h.user("ana").await;
    let habit = h.habit_with_history(&user.id, "Read", &[days_ago(3)], 4).await;

    let listed = h.reconciler.list_habits(&user.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].current_streak, 0);

    let stored = h.store.get_habit(&habit.id).await.unwrap().unwrap();
    assert_eq!(stored.current_streak, 0);
    // The completion log is history and survives the reset.
    assert_eq!(stored.completion_dates.len(), 1);

    let db = h.store.connection();
    let conn = db.lock().unwrap();
    let resets: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM streak_log WHERE operation = 'reset' AND subject_id = ?1",
            [&habit.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(resets, 1);
}

#[tokio::test]
async fn habit_completed_yesterday_keeps_its_streak() {
    let h = harness();
    let user = h.user("ana").await;
    h.habit_with_history(&user.id, "Read", &[days_ago(2), days_ago(1)], 2).await;

    let listed = h.reconciler.list_habits(&user.id).await.unwrap();
    assert_eq!(listed[0].current_streak, 2);
}

#[tokio::test]
async fn second_completion_same_day_is_rejected() {
    let h = harness();
    let user = h.user("ana").await;
    let habit = h.reconciler.create_habit(&user.id, "Read", None).await.unwrap();

    let done = h.reconciler.complete_habit(&habit.id, &user.id).await.unwrap();
    assert_eq!(done.current_streak, 1);

    let err = h
        .reconciler
        .complete_habit(&habit.id, &user.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyCompletedToday { .. }));

    let stored = h.store.get_habit(&habit.id).await.unwrap().unwrap();
    assert_eq!(stored.completion_dates.len(), 1);
    assert_eq!(stored.current_streak, 1);
}

#[tokio::test]
async fn completing_a_lapsed_habit_restarts_at_one() {
    let h = harness();
    let user = h.user("ana").await;
    let habit = h.habit_with_history(&user.id, "Read", &[days_ago(5)], 7).await;

    let done = h.reconciler.complete_habit(&habit.id, &user.id).await.unwrap();
    assert_eq!(done.current_streak, 1);
    assert_eq!(done.last_completed, Some(day_n()));
    assert_eq!(done.completion_dates.len(), 2);
}

#[tokio::test]
async fn fail_resets_streak_but_keeps_history() {
    let h = harness();
    let user = h.user("ana").await;
    let habit = h
        .habit_with_history(&user.id, "Read", &[days_ago(1), day_n()], 2)
        .await;

    let failed = h.reconciler.fail_habit(&habit.id, &user.id).await.unwrap();
    assert_eq!(failed.current_streak, 0);
    assert_eq!(failed.last_completed, Some(day_n()));

    let stored = h.store.get_habit(&habit.id).await.unwrap().unwrap();
    assert_eq!(stored.current_streak, 0);
    assert_eq!(stored.completion_dates.len(), 2);

    // An owner's "not done" is an edit, not a lapse.
    let db = h.store.connection();
    let conn = db.lock().unwrap();
    let ops: Vec<String> = conn
        .prepare("SELECT operation FROM streak_log WHERE subject_id = ?1 ORDER BY id")
        .unwrap()
        .query_map([&habit.id], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(ops, vec!["create", "update"]);
}

#[tokio::test]
async fn fail_does_not_remove_todays_contribution() {
    let h = harness();
    let user = h.user("ana").await;
    let mut ids = Vec::new();
    for title in ["Read", "Walk", "Stretch"] {
        ids.push(h.habit_with_history(&user.id, title, &[day_n()], 1).await.id);
    }

    h.reconciler.fail_habit(&ids[0], &user.id).await.unwrap();
    assert_eq!(h.total_streaks(&user.id).await, 1);
}

#[tokio::test]
async fn operations_on_another_users_habit_are_forbidden() {
    let h = harness();
    let owner = h.user("ana").await;
    let intruder = h.user("ben").await;
    let habit = h.reconciler.create_habit(&owner.id, "Read", None).await.unwrap();

    let complete = h.reconciler.complete_habit(&habit.id, &intruder.id).await;
    assert!(matches!(complete, Err(EngineError::OwnershipViolation { .. })));
    let fail = h.reconciler.fail_habit(&habit.id, &intruder.id).await;
    assert!(matches!(fail, Err(EngineError::OwnershipViolation { .. })));
    let delete = h.reconciler.delete_habit(&habit.id, &intruder.id).await;
    assert!(matches!(delete, Err(EngineError::OwnershipViolation { .. })));

    // Nothing changed for the owner.
    let stored = h.store.get_habit(&habit.id).await.unwrap().unwrap();
    assert!(stored.completion_dates.is_empty());
}

#[tokio::test]
async fn unknown_habit_is_not_found() {
    let h = harness();
    let user = h.user("ana").await;

    let err = h.reconciler.complete_habit("missing", &user.id).await.unwrap_err();
    match err {
        EngineError::NotFound { entity, id } => {
            assert_eq!(entity, Entity::Habit);
            assert_eq!(id, "missing");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn deleting_a_habit_recomputes_from_remaining_habits() {
    let h = harness();
    let user = h.user("ana").await;
    let mut ids = Vec::new();
    for title in ["Read", "Walk", "Stretch"] {
        let habit = h
            .habit_with_history(&user.id, title, &[days_ago(1), day_n()], 2)
            .await;
        ids.push(habit.id);
    }
    assert_eq!(h.reconciler.reconcile_user(&user.id).await.unwrap(), 2);

    h.reconciler.delete_habit(&ids[2], &user.id).await.unwrap();
    assert_eq!(h.total_streaks(&user.id).await, 0);
    assert_eq!(h.reconciler.list_habits(&user.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn removing_a_user_removes_their_habits() {
    let h = harness();
    let user = h.user("ana").await;
    let habit = h.reconciler.create_habit(&user.id, "Read", None).await.unwrap();

    h.reconciler.remove_user(&user.id).await.unwrap();
    assert!(h.store.get_habit(&habit.id).await.unwrap().is_none());
    assert!(matches!(
        h.reconciler.get_user(&user.id).await,
        Err(EngineError::NotFound { entity: Entity::User, .. })
    ));
}

#[tokio::test]
async fn concurrent_completions_for_one_user_converge() {
    let h = harness();
    let user = h.user("ana").await;
    let mut ids = Vec::new();
    for title in ["Read", "Walk", "Stretch"] {
        ids.push(h.reconciler.create_habit(&user.id, title, None).await.unwrap().id);
    }

    let reconciler = Arc::new(h.reconciler);
    let tasks: Vec<_> = ids
        .iter()
        .map(|id| {
            let reconciler = Arc::clone(&reconciler);
            let id = id.clone();
            let user_id = user.id.clone();
            tokio::spawn(async move { reconciler.complete_habit(&id, &user_id).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stored = h.store.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.total_streaks, 1);
}

#[tokio::test]
async fn leaderboard_reads_cached_values_in_order() {
    let h = harness();
    let ana = h.user("ana").await;
    let ben = h.user("ben").await;
    let cy = h.user("cy").await;
    h.store.update_user_aggregate(&ana.id, 2).await.unwrap();
    h.store.update_user_aggregate(&ben.id, 5).await.unwrap();
    h.store.update_user_aggregate(&cy.id, 2).await.unwrap();

    let board = h.reconciler.leaderboard(2).await.unwrap();
    let names: Vec<_> = board.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(names, ["ben", "ana"]);
    assert_eq!(board[1].rank, 2);
}

#[tokio::test]
async fn blank_username_is_invalid() {
    let h = harness();
    let err = h.reconciler.register_user("  ", None).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}
