mod helpers;

use chrono::Duration;
use helpers::{days_ago, day_n, harness};

#[tokio::test]
async fn three_habits_on_three_consecutive_days_is_three() {
    let h = harness();
    let user = h.user("ana").await;
    for title in ["Read", "Walk", "Stretch"] {
        h.habit_with_history(&user.id, title, &[days_ago(2), days_ago(1), day_n()], 3)
            .await;
    }

    assert_eq!(h.reconciler.reconcile_user(&user.id).await.unwrap(), 3);
    assert_eq!(h.total_streaks(&user.id).await, 3);
}

#[tokio::test]
async fn missing_third_habit_yesterday_breaks_the_run() {
    let h = harness();
    let user = h.user("ana").await;
    h.habit_with_history(&user.id, "Read", &[days_ago(2), days_ago(1), day_n()], 3)
        .await;
    h.habit_with_history(&user.id, "Walk", &[days_ago(2), days_ago(1), day_n()], 3)
        .await;
    h.habit_with_history(&user.id, "Stretch", &[days_ago(2), day_n()], 1)
        .await;

    assert_eq!(h.reconciler.reconcile_user(&user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn no_completions_is_zero() {
    let h = harness();
    let user = h.user("ana").await;
    h.habit_with_history(&user.id, "Read", &[], 0).await;

    h.reconciler.list_habits(&user.id).await.unwrap();
    assert_eq!(h.total_streaks(&user.id).await, 0);
}

#[tokio::test]
async fn two_distinct_habits_never_make_a_valid_day() {
    let h = harness();
    let user = h.user("ana").await;
    // Same habit twice today plus one other: still only two distinct habits.
    h.habit_with_history(&user.id, "Read", &[day_n() - Duration::hours(3), day_n()], 1)
        .await;
    h.habit_with_history(&user.id, "Walk", &[day_n()], 1).await;
    assert_eq!(h.reconciler.reconcile_user(&user.id).await.unwrap(), 0);

    h.habit_with_history(&user.id, "Stretch", &[day_n()], 1).await;
    assert_eq!(h.reconciler.reconcile_user(&user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn valid_run_ending_two_days_ago_is_broken() {
    let h = harness();
    let user = h.user("ana").await;
    for title in ["Read", "Walk", "Stretch"] {
        h.habit_with_history(&user.id, title, &[days_ago(4), days_ago(3), days_ago(2)], 3)
            .await;
    }
    assert_eq!(h.reconciler.reconcile_user(&user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn run_anchored_at_yesterday_still_counts() {
    let h = harness();
    let user = h.user("ana").await;
    for title in ["Read", "Walk", "Stretch"] {
        h.habit_with_history(&user.id, title, &[days_ago(2), days_ago(1)], 2)
            .await;
    }
    assert_eq!(h.reconciler.reconcile_user(&user.id).await.unwrap(), 2);

    // A day later the same history has lapsed.
    h.clock.advance(Duration::days(1));
    assert_eq!(h.reconciler.reconcile_user(&user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn completions_stamped_tomorrow_break_the_streak() {
    let h = harness();
    let user = h.user("ana").await;
    for title in ["Read", "Walk", "Stretch"] {
        h.habit_with_history(&user.id, title, &[day_n(), day_n() + Duration::days(1)], 2)
            .await;
    }
    assert_eq!(h.reconciler.reconcile_user(&user.id).await.unwrap(), 0);
    assert_eq!(h.total_streaks(&user.id).await, 0);
}

#[tokio::test]
async fn recomputation_is_idempotent() {
    let h = harness();
    let user = h.user("ana").await;
    for title in ["Read", "Walk", "Stretch", "Sleep"] {
        h.habit_with_history(&user.id, title, &[days_ago(5), days_ago(1), day_n()], 2)
            .await;
    }

    let first = h.reconciler.reconcile_user(&user.id).await.unwrap();
    let second = h.reconciler.reconcile_user(&user.id).await.unwrap();
    assert_eq!(first, 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn stale_cached_value_is_overwritten_not_adjusted() {
    use habitus::store::RecordStore;

    let h = harness();
    let user = h.user("ana").await;
    h.store.update_user_aggregate(&user.id, 40).await.unwrap();
    for title in ["Read", "Walk", "Stretch"] {
        h.habit_with_history(&user.id, title, &[day_n()], 1).await;
    }

    h.reconciler.list_habits(&user.id).await.unwrap();
    assert_eq!(h.total_streaks(&user.id).await, 1);
}

#[tokio::test]
async fn completing_through_the_reconciler_builds_the_streak() {
    let h = harness();
    let user = h.user("ana").await;
    let mut ids = Vec::new();
    for title in ["Read", "Walk", "Stretch"] {
        let habit = h.reconciler.create_habit(&user.id, title, None).await.unwrap();
        ids.push(habit.id);
    }

    h.clock.set(days_ago(2));
    for day in 0..3 {
        for id in &ids {
            h.reconciler.complete_habit(id, &user.id).await.unwrap();
        }
        if day < 2 {
            h.clock.advance(Duration::days(1));
        }
    }

    assert_eq!(h.total_streaks(&user.id).await, 3);
    let habits = h.reconciler.list_habits(&user.id).await.unwrap();
    assert!(habits.iter().all(|habit| habit.current_streak == 3));
}
