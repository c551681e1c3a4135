//! SQLite-backed [`RecordStore`].
//!
//! The connection lives behind `Arc<Mutex<_>>`; every call runs on
//! `tokio::task::spawn_blocking` so async callers never block a runtime thread.
//! Each mutating call commits its change and its `streak_log` audit row in one
//! transaction.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::{RecordStore, StoreError, StoreResult};
use crate::streak::{Habit, StreakUpdate, UpdateCause, User};

const HABIT_COLUMNS: &str =
    "id, user_id, title, description, current_streak, last_completed, completion_dates, created_at";

const USER_COLUMNS: &str = "id, username, email, total_streaks, created_at";

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self::new(Arc::new(Mutex::new(conn)))
    }

    /// Shared handle to the underlying connection.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.db)
    }

    /// Stamp the engagement threshold that every stored aggregate now reflects.
    pub async fn record_engagement_threshold(&self, threshold: usize) -> StoreResult<()> {
        self.with_conn(move |conn| {
            crate::db::migrations::set_engagement_threshold(conn, threshold)?;
            Ok(())
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("db lock poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("db task failed: {e}")))?
    }
}

// ── Row decoding ─────────────────────────────────────────────────────────────

struct HabitRow {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    current_streak: i64,
    last_completed: Option<String>,
    completion_dates: String,
    created_at: String,
}

impl HabitRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            current_streak: row.get(4)?,
            last_completed: row.get(5)?,
            completion_dates: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn decode(self) -> StoreResult<Habit> {
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "habit",
            id: self.id.clone(),
            reason,
        };

        let current_streak = u32::try_from(self.current_streak)
            .map_err(|_| corrupt(format!("current_streak out of range: {}", self.current_streak)))?;
        let last_completed = self
            .last_completed
            .as_deref()
            .map(parse_instant)
            .transpose()
            .map_err(|e| corrupt(format!("last_completed: {e}")))?;
        let completion_dates: Vec<DateTime<Utc>> = serde_json::from_str(&self.completion_dates)
            .map_err(|e| corrupt(format!("completion_dates: {e}")))?;
        let created_at =
            parse_instant(&self.created_at).map_err(|e| corrupt(format!("created_at: {e}")))?;

        Ok(Habit {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            current_streak,
            last_completed,
            completion_dates,
            created_at,
        })
    }
}

struct UserRow {
    id: String,
    username: String,
    email: Option<String>,
    total_streaks: i64,
    created_at: String,
}

impl UserRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            total_streaks: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn decode(self) -> StoreResult<User> {
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "user",
            id: self.id.clone(),
            reason,
        };
        let total_streaks = u32::try_from(self.total_streaks)
            .map_err(|_| corrupt(format!("total_streaks out of range: {}", self.total_streaks)))?;
        let created_at =
            parse_instant(&self.created_at).map_err(|e| corrupt(format!("created_at: {e}")))?;

        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            total_streaks,
            created_at,
        })
    }
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// Surface uniqueness and foreign-key violations as conflicts.
fn map_constraint(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, ref msg)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(msg.clone().unwrap_or_else(|| failure.to_string()))
        }
        other => StoreError::Sqlite(other),
    }
}

fn query_habits(conn: &Connection, sql: &str, param: &str) -> StoreResult<Vec<Habit>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![param], HabitRow::read)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(HabitRow::decode).collect()
}

fn query_users(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> StoreResult<Vec<User>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, UserRow::read)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(UserRow::decode).collect()
}

/// Write an entry to the streak_log audit table.
pub(crate) fn write_audit_log(
    conn: &Connection,
    operation: &str,
    subject_id: &str,
    details: Option<&serde_json::Value>,
) -> rusqlite::Result<()> {
    let now = Utc::now().to_rfc3339();
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO streak_log (operation, subject_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, subject_id, details_json, now],
    )?;
    Ok(())
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get_habits_by_user(&self, user_id: &str) -> StoreResult<Vec<Habit>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            query_habits(
                conn,
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE user_id = ?1 ORDER BY created_at, id"),
                &user_id,
            )
        })
        .await
    }

    async fn get_habit(&self, habit_id: &str) -> StoreResult<Option<Habit>> {
        let habit_id = habit_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1"),
                params![habit_id],
                HabitRow::read,
            )
            .optional()?
            .map(HabitRow::decode)
            .transpose()
        })
        .await
    }

    async fn put_habit(&self, habit: &Habit) -> StoreResult<()> {
        let habit = habit.clone();
        self.with_conn(move |conn| {
            let completion_dates = serde_json::to_string(&habit.completion_dates)?;
            let now = Utc::now().to_rfc3339();

            let tx = conn.transaction()?;
            let existed: bool = tx.query_row(
                "SELECT COUNT(*) > 0 FROM habits WHERE id = ?1",
                params![habit.id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO habits (id, user_id, title, description, current_streak, last_completed, \
                 completion_dates, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                 ON CONFLICT(id) DO UPDATE SET \
                   user_id = excluded.user_id, title = excluded.title, \
                   description = excluded.description, current_streak = excluded.current_streak, \
                   last_completed = excluded.last_completed, \
                   completion_dates = excluded.completion_dates, updated_at = excluded.updated_at",
                params![
                    habit.id,
                    habit.user_id,
                    habit.title,
                    habit.description,
                    habit.current_streak,
                    habit.last_completed.map(|t| t.to_rfc3339()),
                    completion_dates,
                    habit.created_at.to_rfc3339(),
                    now,
                ],
            )
            .map_err(map_constraint)?;
            write_audit_log(
                &tx,
                if existed { "update" } else { "create" },
                &habit.id,
                Some(&serde_json::json!({
                    "current_streak": habit.current_streak,
                    "completions": habit.completion_dates.len(),
                })),
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn batch_update_habits(&self, updates: &[StreakUpdate]) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let updates = updates.to_vec();
        self.with_conn(move |conn| {
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            for update in &updates {
                let rows = tx.execute(
                    "UPDATE habits SET current_streak = ?1, updated_at = ?2 WHERE id = ?3",
                    params![update.current_streak, now, update.habit_id],
                )?;
                if rows == 0 {
                    continue;
                }
                // A lapse is a lazy reset; a failure is an owner-initiated edit.
                let operation = match update.cause {
                    UpdateCause::Lapsed => "reset",
                    UpdateCause::Failed => "update",
                };
                write_audit_log(
                    &tx,
                    operation,
                    &update.habit_id,
                    Some(&serde_json::json!({
                        "current_streak": update.current_streak,
                        "cause": update.cause,
                    })),
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_habit(&self, habit_id: &str) -> StoreResult<bool> {
        let habit_id = habit_id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let rows = tx.execute("DELETE FROM habits WHERE id = ?1", params![habit_id])?;
            if rows > 0 {
                write_audit_log(&tx, "delete", &habit_id, None)?;
            }
            tx.commit()?;
            Ok(rows > 0)
        })
        .await
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![user_id],
                UserRow::read,
            )
            .optional()?
            .map(UserRow::decode)
            .transpose()
        })
        .await
    }

    async fn put_user(&self, user: &User) -> StoreResult<()> {
        let user = user.clone();
        self.with_conn(move |conn| {
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (id, username, email, total_streaks, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id,
                    user.username,
                    user.email,
                    user.total_streaks,
                    user.created_at.to_rfc3339(),
                    now,
                ],
            )
            .map_err(map_constraint)?;
            write_audit_log(
                &tx,
                "create",
                &user.id,
                Some(&serde_json::json!({"username": user.username})),
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let habits: i64 = tx.query_row(
                "SELECT COUNT(*) FROM habits WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            // habits cascade via the foreign key
            let rows = tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
            if rows > 0 {
                write_audit_log(
                    &tx,
                    "delete",
                    &user_id,
                    Some(&serde_json::json!({"habits_removed": habits})),
                )?;
            }
            tx.commit()?;
            Ok(rows > 0)
        })
        .await
    }

    async fn update_user_aggregate(&self, user_id: &str, total_streaks: u32) -> StoreResult<Option<u32>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let previous: Option<i64> = tx
                .query_row(
                    "SELECT total_streaks FROM users WHERE id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(previous) = previous else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE users SET total_streaks = ?1, updated_at = ?2 WHERE id = ?3",
                params![total_streaks, Utc::now().to_rfc3339(), user_id],
            )?;
            if previous != i64::from(total_streaks) {
                write_audit_log(
                    &tx,
                    "aggregate",
                    &user_id,
                    Some(&serde_json::json!({"from": previous, "to": total_streaks})),
                )?;
            }
            tx.commit()?;

            Ok(Some(u32::try_from(previous).unwrap_or(0)))
        })
        .await
    }

    async fn list_user_ids(&self) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM users ORDER BY created_at, id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(ids)
        })
        .await
    }

    async fn top_users(&self, limit: usize) -> StoreResult<Vec<User>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            query_users(
                conn,
                &format!(
                    "SELECT {USER_COLUMNS} FROM users ORDER BY total_streaks DESC, username LIMIT ?1"
                ),
                params![limit],
            )
        })
        .await
    }
}
