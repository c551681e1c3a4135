//! Record store contract consumed by the reconciler.
//!
//! [`RecordStore`] is the only way the engine touches durable state. Every call
//! may fail with a [`StoreError`]; the engine never retries and never swallows
//! one, so timeout and retry policy belong to the implementation.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::streak::{Habit, StreakUpdate, User};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt {entity} record {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_habits_by_user(&self, user_id: &str) -> StoreResult<Vec<Habit>>;

    async fn get_habit(&self, habit_id: &str) -> StoreResult<Option<Habit>>;

    /// Insert or fully replace a habit.
    async fn put_habit(&self, habit: &Habit) -> StoreResult<()>;

    /// Apply all counter overwrites atomically.
    async fn batch_update_habits(&self, updates: &[StreakUpdate]) -> StoreResult<()>;

    /// Returns `false` if no such habit existed.
    async fn delete_habit(&self, habit_id: &str) -> StoreResult<bool>;

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>>;

    /// Insert a new user. Fails with [`StoreError::Conflict`] on a duplicate id, username, or email.
    async fn put_user(&self, user: &User) -> StoreResult<()>;

    /// Delete a user together with their habits. Returns `false` if no such user existed.
    async fn delete_user(&self, user_id: &str) -> StoreResult<bool>;

    /// Overwrite the cached engagement streak.
    /// Returns the previous value, or `None` if the user does not exist.
    async fn update_user_aggregate(&self, user_id: &str, total_streaks: u32) -> StoreResult<Option<u32>>;

    /// Every user id, oldest account first. Reads no other column, so one
    /// undecodable user record cannot hide the rest.
    async fn list_user_ids(&self) -> StoreResult<Vec<String>>;

    /// Users ordered by cached `total_streaks` descending, then username.
    async fn top_users(&self, limit: usize) -> StoreResult<Vec<User>>;
}
