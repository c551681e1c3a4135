//! Reconciliation coordinator.
//!
//! Decides when streak rules run and commits their results:
//!
//! | Trigger | Habit lapse check | Engagement recompute |
//! |---------|-------------------|----------------------|
//! | [`Reconciler::list_habits`] | every listed habit, resets batch-committed | always |
//! | [`Reconciler::complete_habit`] | the completed habit | always, unless rejected |
//! | [`Reconciler::fail_habit`] | n/a (counter zeroed) | always |
//! | [`Reconciler::delete_habit`] | n/a | always, over remaining habits |
//! | [`Reconciler::reconcile_user`] | no | always |
//! | [`Reconciler::repair_all_streaks`] | no | every user, failures isolated |
//!
//! Creating or editing a habit and reading the leaderboard trigger nothing.
//! `total_streaks` is written only here and always as a full recomputation.

pub mod locks;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::store::RecordStore;
use crate::streak::{
    engagement, evaluator, Calendar, Clock, DayKey, Habit, HabitEdit, StreakUpdate, User,
};
use locks::UserLocks;

/// Default fan-out for bulk repair.
pub const DEFAULT_REPAIR_CONCURRENCY: usize = 8;

/// Outcome of [`Reconciler::repair_all_streaks`].
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub total_users: usize,
    pub reconciled: usize,
    pub failures: Vec<RepairFailure>,
}

impl RepairReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairFailure {
    pub user_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub username: String,
    pub total_streaks: u32,
}

pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    calendar: Calendar,
    clock: Arc<dyn Clock>,
    locks: UserLocks,
    repair_concurrency: usize,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, calendar: Calendar, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            calendar,
            clock,
            locks: UserLocks::new(true),
            repair_concurrency: DEFAULT_REPAIR_CONCURRENCY,
        }
    }

    pub fn with_repair_concurrency(mut self, concurrency: usize) -> Self {
        self.repair_concurrency = concurrency.max(1);
        self
    }

    /// Turn per-user serialization on or off. Off means concurrent writers for one
    /// user race and the last aggregate commit wins until the next reconciliation.
    pub fn with_user_serialization(mut self, enabled: bool) -> Self {
        self.locks = UserLocks::new(enabled);
        self
    }

    pub fn today(&self) -> DayKey {
        self.calendar.day_key(self.clock.now())
    }

    // ── Users ────────────────────────────────────────────────────────────────

    pub async fn register_user(&self, username: &str, email: Option<String>) -> EngineResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EngineError::InvalidInput("username must not be empty".into()));
        }
        let user = User::new(username, email, self.clock.now());
        self.store.put_user(&user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> EngineResult<User> {
        self.require_user(user_id).await
    }

    /// Delete a user. Their habits go with them.
    pub async fn remove_user(&self, user_id: &str) -> EngineResult<()> {
        let _guard = self.locks.acquire(user_id).await;
        if !self.store.delete_user(user_id).await? {
            return Err(EngineError::user_not_found(user_id));
        }
        tracing::info!(user_id = %user_id, "user removed");
        Ok(())
    }

    // ── Read path ────────────────────────────────────────────────────────────

    /// List a user's habits, repairing lapsed counters and the engagement streak.
    pub async fn list_habits(&self, user_id: &str) -> EngineResult<Vec<Habit>> {
        let _guard = self.locks.acquire(user_id).await;
        self.require_user(user_id).await?;

        let today = self.today();
        let mut habits = self.store.get_habits_by_user(user_id).await?;

        let resets: Vec<_> = habits
            .iter()
            .filter_map(|habit| evaluator::needs_reset(&self.calendar, habit, today))
            .collect();
        if !resets.is_empty() {
            self.store.batch_update_habits(&resets).await?;
            for reset in &resets {
                if let Some(habit) = habits.iter_mut().find(|h| h.id == reset.habit_id) {
                    habit.current_streak = reset.current_streak;
                }
            }
            tracing::info!(user_id = %user_id, resets = resets.len(), "lapsed habit streaks reset");
        }

        // Resets never touch completion logs, so this snapshot is still the full history.
        self.persist_engagement(user_id, &habits, today).await?;
        Ok(habits)
    }

    // ── Write paths ──────────────────────────────────────────────────────────

    pub async fn create_habit(
        &self,
        user_id: &str,
        title: &str,
        description: Option<String>,
    ) -> EngineResult<Habit> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EngineError::InvalidInput("habit title must not be empty".into()));
        }
        self.require_user(user_id).await?;

        let habit = Habit::new(user_id, title, description, self.clock.now());
        self.store.put_habit(&habit).await?;
        tracing::info!(user_id = %user_id, habit_id = %habit.id, "habit created");
        Ok(habit)
    }

    /// Edit title/description. Streak state is never touched.
    pub async fn update_habit(
        &self,
        habit_id: &str,
        user_id: &str,
        edit: HabitEdit,
    ) -> EngineResult<Habit> {
        if matches!(&edit.title, Some(t) if t.trim().is_empty()) {
            return Err(EngineError::InvalidInput("habit title must not be empty".into()));
        }
        let _guard = self.locks.acquire(user_id).await;
        let mut habit = self.owned_habit(habit_id, user_id).await?;
        if edit.is_empty() {
            return Ok(habit);
        }
        edit.apply(&mut habit);
        self.store.put_habit(&habit).await?;
        Ok(habit)
    }

    /// Record today's completion, then recompute the owner's engagement streak.
    pub async fn complete_habit(&self, habit_id: &str, user_id: &str) -> EngineResult<Habit> {
        let _guard = self.locks.acquire(user_id).await;
        let mut habit = self.owned_habit(habit_id, user_id).await?;

        let now = self.clock.now();
        let streak = evaluator::complete(&self.calendar, &mut habit, now).map_err(|rejected| {
            EngineError::AlreadyCompletedToday {
                habit_id: habit_id.to_string(),
                day: rejected.day,
            }
        })?;
        self.store.put_habit(&habit).await?;
        tracing::info!(user_id = %user_id, habit_id = %habit_id, current_streak = streak, "habit completed");

        self.reconcile_locked(user_id).await?;
        Ok(habit)
    }

    /// "Did not do": zero the habit's counter, then recompute the engagement streak.
    pub async fn fail_habit(&self, habit_id: &str, user_id: &str) -> EngineResult<Habit> {
        let _guard = self.locks.acquire(user_id).await;
        let mut habit = self.owned_habit(habit_id, user_id).await?;

        let previous = habit.current_streak;
        evaluator::fail(&mut habit);
        self.store
            .batch_update_habits(&[StreakUpdate::failed(habit.id.as_str())])
            .await?;
        tracing::info!(user_id = %user_id, habit_id = %habit_id, previous, "habit failed");

        self.reconcile_locked(user_id).await?;
        Ok(habit)
    }

    /// Delete a habit. Its completions stop counting toward any day, past or present.
    pub async fn delete_habit(&self, habit_id: &str, user_id: &str) -> EngineResult<()> {
        let _guard = self.locks.acquire(user_id).await;
        self.owned_habit(habit_id, user_id).await?;

        if !self.store.delete_habit(habit_id).await? {
            return Err(EngineError::habit_not_found(habit_id));
        }
        tracing::info!(user_id = %user_id, habit_id = %habit_id, "habit deleted");

        self.reconcile_locked(user_id).await?;
        Ok(())
    }

    // ── Engagement ───────────────────────────────────────────────────────────

    /// Recompute and persist one user's engagement streak.
    ///
    /// Loads the user record first, so a user that cannot be read fails here
    /// rather than being silently skipped.
    pub async fn reconcile_user(&self, user_id: &str) -> EngineResult<u32> {
        let _guard = self.locks.acquire(user_id).await;
        self.require_user(user_id).await?;
        self.reconcile_locked(user_id).await
    }

    /// Recompute every user's engagement streak.
    ///
    /// Only a failure to enumerate users is an error. A failure for one user is
    /// logged and recorded in the report; the other users still reconcile.
    pub async fn repair_all_streaks(&self) -> EngineResult<RepairReport> {
        let user_ids = self.store.list_user_ids().await?;
        let total_users = user_ids.len();
        tracing::info!(users = total_users, concurrency = self.repair_concurrency, "bulk streak repair started");

        let outcomes: Vec<(String, EngineResult<u32>)> = stream::iter(user_ids.into_iter().map(|user_id| async move {
            let outcome = self.reconcile_user(&user_id).await;
            (user_id, outcome)
        }))
        .buffer_unordered(self.repair_concurrency)
        .collect()
        .await;

        let mut report = RepairReport {
            total_users,
            reconciled: 0,
            failures: Vec::new(),
        };
        for (user_id, outcome) in outcomes {
            match outcome {
                Ok(_) => report.reconciled += 1,
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "streak repair failed for user");
                    report.failures.push(RepairFailure {
                        user_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        report.failures.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        tracing::info!(
            reconciled = report.reconciled,
            failed = report.failures.len(),
            "bulk streak repair finished"
        );
        Ok(report)
    }

    /// Top users by cached engagement streak. Reads the cache as-is.
    pub async fn leaderboard(&self, limit: usize) -> EngineResult<Vec<LeaderboardEntry>> {
        let users = self.store.top_users(limit).await?;
        Ok(users
            .into_iter()
            .enumerate()
            .map(|(i, user)| LeaderboardEntry {
                rank: i + 1,
                user_id: user.id,
                username: user.username,
                total_streaks: user.total_streaks,
            })
            .collect())
    }

    // ── Internals ────────────────────────────────────────────────────────────

    /// Caller must hold the user's guard.
    async fn reconcile_locked(&self, user_id: &str) -> EngineResult<u32> {
        let today = self.today();
        let habits = self.store.get_habits_by_user(user_id).await?;
        self.persist_engagement(user_id, &habits, today).await
    }

    async fn persist_engagement(&self, user_id: &str, habits: &[Habit], today: DayKey) -> EngineResult<u32> {
        let streak = engagement::compute(&self.calendar, habits, today);
        let previous = self
            .store
            .update_user_aggregate(user_id, streak.days)
            .await?
            .ok_or_else(|| EngineError::user_not_found(user_id))?;

        tracing::debug!(
            user_id = %user_id,
            total_streaks = streak.days,
            valid_days = streak.valid_days,
            anchor = ?streak.anchor.map(|d| d.to_string()),
            "engagement streak recomputed"
        );
        if previous != streak.days {
            tracing::info!(user_id = %user_id, from = previous, to = streak.days, "engagement streak changed");
        }
        Ok(streak.days)
    }

    async fn require_user(&self, user_id: &str) -> EngineResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| EngineError::user_not_found(user_id))
    }

    async fn owned_habit(&self, habit_id: &str, user_id: &str) -> EngineResult<Habit> {
        let habit = self
            .store
            .get_habit(habit_id)
            .await?
            .ok_or_else(|| EngineError::habit_not_found(habit_id))?;
        if !habit.is_owned_by(user_id) {
            tracing::warn!(habit_id = %habit_id, user_id = %user_id, "ownership violation");
            return Err(EngineError::OwnershipViolation {
                habit_id: habit_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        Ok(habit)
    }
}
