//! Habit and user records.
//!
//! [`Habit`] carries the per-habit streak counter and its append-only completion
//! log. [`User`] carries `total_streaks`, a cached aggregate that is always
//! recomputable from the completion logs of that user's habits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recurring habit owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Consecutive days completed, as of the last reconciliation.
    pub current_streak: u32,
    /// Instant of the most recent successful completion.
    pub last_completed: Option<DateTime<Utc>>,
    /// One entry per successful completion, in append order. Never rewritten.
    pub completion_dates: Vec<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            description,
            current_streak: 0,
            last_completed: None,
            completion_dates: Vec::new(),
            created_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// A user of the tracker. Credentials live elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    /// Cached engagement streak. Written only by reconciliation.
    pub total_streaks: u32,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            username: username.into(),
            email,
            total_streaks: 0,
            created_at: now,
        }
    }
}

/// Why a habit's counter is being overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateCause {
    /// The lazy lapse check found the last completion before yesterday.
    Lapsed,
    /// The owner marked the habit as not done.
    Failed,
}

/// Partial update: overwrite one habit's counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakUpdate {
    pub habit_id: String,
    pub current_streak: u32,
    pub cause: UpdateCause,
}

impl StreakUpdate {
    pub fn lapsed(habit_id: impl Into<String>) -> Self {
        Self {
            habit_id: habit_id.into(),
            current_streak: 0,
            cause: UpdateCause::Lapsed,
        }
    }

    pub fn failed(habit_id: impl Into<String>) -> Self {
        Self {
            habit_id: habit_id.into(),
            current_streak: 0,
            cause: UpdateCause::Failed,
        }
    }
}

/// Title/description edit. `None` leaves a field as is; `Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitEdit {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

impl HabitEdit {
    /// Build an edit from optional surface inputs. An empty description clears it.
    pub fn from_patch(title: Option<String>, description: Option<String>) -> Self {
        Self {
            title: title.map(|t| t.trim().to_string()),
            description: description.map(|d| {
                let d = d.trim();
                (!d.is_empty()).then(|| d.to_string())
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    pub fn apply(self, habit: &mut Habit) {
        if let Some(title) = self.title {
            habit.title = title;
        }
        if let Some(description) = self.description {
            habit.description = description;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn patch_with_empty_description_clears_it() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut habit = Habit::new("u1", "Walk", Some("daily".into()), now);

        HabitEdit::from_patch(None, Some("  ".into())).apply(&mut habit);
        assert_eq!(habit.title, "Walk");
        assert_eq!(habit.description, None);
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(HabitEdit::from_patch(None, None).is_empty());
        assert!(!HabitEdit::from_patch(Some(" Run ".into()), None).is_empty());
        assert_eq!(
            HabitEdit::from_patch(Some(" Run ".into()), None).title.as_deref(),
            Some("Run")
        );
    }
}
