//! In-process [`RecordStore`] for tests and throwaway runs.
//!
//! Supports injecting an outage for a single user's habit reads, which is how
//! partial-failure paths are exercised without a real backend going down.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{RecordStore, StoreError, StoreResult};
use crate::streak::{Habit, StreakUpdate, User};

#[derive(Default)]
struct State {
    users: BTreeMap<String, User>,
    habits: BTreeMap<String, Habit>,
    failing_users: HashSet<String>,
    writes: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every habit read for `user_id` fail until [`MemoryStore::heal_user`] is called.
    pub fn fail_user(&self, user_id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_users.insert(user_id.to_string());
        }
    }

    pub fn heal_user(&self, user_id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_users.remove(user_id);
        }
    }

    /// Number of mutating calls served so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().map(|s| s.writes).unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("memory store lock poisoned: {e}")))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_habits_by_user(&self, user_id: &str) -> StoreResult<Vec<Habit>> {
        let state = self.lock()?;
        if state.failing_users.contains(user_id) {
            return Err(StoreError::Unavailable(format!(
                "injected outage for user {user_id}"
            )));
        }
        let mut habits: Vec<Habit> = state
            .habits
            .values()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(habits)
    }

    async fn get_habit(&self, habit_id: &str) -> StoreResult<Option<Habit>> {
        Ok(self.lock()?.habits.get(habit_id).cloned())
    }

    async fn put_habit(&self, habit: &Habit) -> StoreResult<()> {
        let mut state = self.lock()?;
        if !state.users.contains_key(&habit.user_id) {
            return Err(StoreError::Conflict(format!(
                "habit {} references unknown user {}",
                habit.id, habit.user_id
            )));
        }
        state.habits.insert(habit.id.clone(), habit.clone());
        state.writes += 1;
        Ok(())
    }

    async fn batch_update_habits(&self, updates: &[StreakUpdate]) -> StoreResult<()> {
        let mut state = self.lock()?;
        for update in updates {
            if let Some(habit) = state.habits.get_mut(&update.habit_id) {
                habit.current_streak = update.current_streak;
            }
        }
        if !updates.is_empty() {
            state.writes += 1;
        }
        Ok(())
    }

    async fn delete_habit(&self, habit_id: &str) -> StoreResult<bool> {
        let mut state = self.lock()?;
        state.writes += 1;
        Ok(state.habits.remove(habit_id).is_some())
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(user_id).cloned())
    }

    async fn put_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.lock()?;
        let duplicate = state.users.values().any(|u| {
            u.id == user.id
                || u.username == user.username
                || (u.email.is_some() && u.email == user.email)
        });
        if duplicate {
            return Err(StoreError::Conflict(format!("user {} already exists", user.username)));
        }
        state.users.insert(user.id.clone(), user.clone());
        state.writes += 1;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let mut state = self.lock()?;
        state.writes += 1;
        let existed = state.users.remove(user_id).is_some();
        if existed {
            state.habits.retain(|_, h| h.user_id != user_id);
        }
        Ok(existed)
    }

    async fn update_user_aggregate(&self, user_id: &str, total_streaks: u32) -> StoreResult<Option<u32>> {
        let mut state = self.lock()?;
        state.writes += 1;
        Ok(state.users.get_mut(user_id).map(|user| {
            std::mem::replace(&mut user.total_streaks, total_streaks)
        }))
    }

    async fn list_user_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock()?.users.keys().cloned().collect())
    }

    async fn top_users(&self, limit: usize) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.lock()?.users.values().cloned().collect();
        users.sort_by(|a, b| {
            b.total_streaks
                .cmp(&a.total_streaks)
                .then_with(|| a.username.cmp(&b.username))
        });
        users.truncate(limit);
        Ok(users)
    }
}
