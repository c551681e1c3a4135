//! Streak rules: day bucketing, per-habit lapse/complete/fail, and the
//! cross-habit engagement streak. Pure functions over in-memory records; all
//! storage and scheduling lives in [`crate::reconcile`].

pub mod calendar;
pub mod engagement;
pub mod evaluator;
pub mod types;

pub use calendar::{Calendar, Clock, DayKey, FixedClock, SystemClock};
pub use engagement::{EngagementStreak, ANCHOR_GRACE_DAYS, ENGAGEMENT_THRESHOLD};
pub use types::{Habit, HabitEdit, StreakUpdate, UpdateCause, User};
