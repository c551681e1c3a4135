//! Per-habit streak rules: lapse detection, completion, and failure.
//!
//! The lapse rule is lazy. Nothing here runs on a timer; the reconciler calls
//! [`needs_reset`] whenever it reads or mutates a habit, so a habit nobody
//! touches keeps its stale counter in storage until the next access.

use chrono::{DateTime, Utc};

use super::calendar::{Calendar, DayKey};
use super::types::{Habit, StreakUpdate};

/// Days a habit may go without completion before its streak lapses.
/// Completing on "yesterday" keeps the streak alive through today.
pub const HABIT_GRACE_DAYS: u32 = 1;

/// Outcome of checking one habit against today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LapseVerdict {
    /// Never completed; the counter is already zero.
    NeverCompleted,
    /// Last completion was today or yesterday.
    Active,
    /// Last completion was before yesterday.
    Lapsed,
}

pub fn evaluate(
    calendar: &Calendar,
    last_completed: Option<DateTime<Utc>>,
    today: DayKey,
) -> LapseVerdict {
    let Some(last) = last_completed else {
        return LapseVerdict::NeverCompleted;
    };
    if calendar.day_key(last) < today.days_before(HABIT_GRACE_DAYS) {
        LapseVerdict::Lapsed
    } else {
        LapseVerdict::Active
    }
}

/// The reset to persist for `habit`, if its streak has lapsed and is still nonzero.
pub fn needs_reset(calendar: &Calendar, habit: &Habit, today: DayKey) -> Option<StreakUpdate> {
    if habit.current_streak == 0 {
        return None;
    }
    match evaluate(calendar, habit.last_completed, today) {
        LapseVerdict::Lapsed => Some(StreakUpdate::lapsed(habit.id.as_str())),
        LapseVerdict::NeverCompleted | LapseVerdict::Active => None,
    }
}

/// Rejection of a second completion on the same calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyCompleted {
    pub day: DayKey,
}

/// Record a completion at `now`.
///
/// A lapsed counter is zeroed first, so completing a stale habit starts a new
/// streak at 1. On rejection the habit is left untouched.
pub fn complete(
    calendar: &Calendar,
    habit: &mut Habit,
    now: DateTime<Utc>,
) -> Result<u32, AlreadyCompleted> {
    let today = calendar.day_key(now);
    if habit.last_completed.map(|last| calendar.day_key(last)) == Some(today) {
        return Err(AlreadyCompleted { day: today });
    }

    if needs_reset(calendar, habit, today).is_some() {
        habit.current_streak = 0;
    }

    habit.current_streak = habit.current_streak.saturating_add(1);
    habit.last_completed = Some(now);
    habit.completion_dates.push(now);
    Ok(habit.current_streak)
}

/// "Did not do": zero the counter. The completion log is never touched.
pub fn fail(habit: &mut Habit) {
    habit.current_streak = 0;
}
