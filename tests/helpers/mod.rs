#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use habitus::db;
use habitus::store::{RecordStore, SqliteStore};
use habitus::streak::{Calendar, FixedClock, Habit, User};
use habitus::Reconciler;
use rusqlite::Connection;
use std::sync::Arc;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Day N of every scenario: 2026-03-15, noon UTC.
pub fn day_n() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
}

/// Noon `n` days before Day N.
pub fn days_ago(n: i64) -> DateTime<Utc> {
    day_n() - Duration::days(n)
}

/// A reconciler over an in-memory SQLite store with a clock pinned to Day N.
pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub clock: Arc<FixedClock>,
    pub reconciler: Reconciler,
}

pub fn harness() -> Harness {
    let store = Arc::new(SqliteStore::from_connection(test_db()));
    let clock = Arc::new(FixedClock::new(day_n()));
    let reconciler = Reconciler::new(store.clone(), Calendar::utc(), clock.clone());
    Harness {
        store,
        clock,
        reconciler,
    }
}

impl Harness {
    pub async fn user(&self, username: &str) -> User {
        self.reconciler.register_user(username, None).await.unwrap()
    }

    /// Insert a habit with a prepared completion history, bypassing the rules.
    pub async fn habit_with_history(
        &self,
        user_id: &str,
        title: &str,
        completions: &[DateTime<Utc>],
        current_streak: u32,
    ) -> Habit {
        let mut habit = Habit::new(user_id, title, None, days_ago(30));
        habit.completion_dates = completions.to_vec();
        habit.last_completed = completions.iter().max().copied();
        habit.current_streak = current_streak;
        self.store.put_habit(&habit).await.unwrap();
        habit
    }

    pub async fn total_streaks(&self, user_id: &str) -> u32 {
        self.store.get_user(user_id).await.unwrap().unwrap().total_streaks
    }

    /// Overwrite one habit's completion log with text that is not JSON.
    pub async fn corrupt_habit(&self, habit_id: &str) {
        let db = self.store.connection();
        let conn = db.lock().unwrap();
        conn.execute(
            "UPDATE habits SET completion_dates = 'not json' WHERE id = ?1",
            [habit_id],
        )
        .unwrap();
    }

    /// Overwrite one user's creation instant with text that is not a timestamp.
    pub async fn corrupt_user(&self, user_id: &str) {
        let db = self.store.connection();
        let conn = db.lock().unwrap();
        conn.execute(
            "UPDATE users SET created_at = 'garbage' WHERE id = ?1",
            [user_id],
        )
        .unwrap();
    }
}
