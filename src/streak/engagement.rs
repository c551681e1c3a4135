//! Cross-habit engagement streak.
//!
//! A day is *valid* when at least [`ENGAGEMENT_THRESHOLD`] distinct habits have
//! a completion on it. The engagement streak is the length of the run of
//! consecutive valid days ending at the anchor, where the anchor is the most
//! recent valid day if it falls within [`ANCHOR_GRACE_DAYS`] of today.
//!
//! The result is always recomputed from the full completion logs. No cached
//! value is read, so running it twice over the same logs gives the same answer.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use super::calendar::{Calendar, DayKey};
use super::types::Habit;

/// Distinct habits that must be completed on a day for it to count.
pub const ENGAGEMENT_THRESHOLD: usize = 3;

/// How far before today the most recent valid day may sit and still anchor a streak.
pub const ANCHOR_GRACE_DAYS: u32 = 1;

/// Result of one recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngagementStreak {
    /// Consecutive valid days ending at `anchor`. Zero when there is no anchor.
    pub days: u32,
    pub anchor: Option<DayKey>,
    /// Valid days found anywhere in the history.
    pub valid_days: usize,
}

/// Day key → distinct habit ids completed that day.
///
/// Repeated completions of one habit on the same day collapse to one contribution.
pub fn daily_contributions<'a, I>(calendar: &Calendar, habits: I) -> BTreeMap<DayKey, HashSet<&'a str>>
where
    I: IntoIterator<Item = &'a Habit>,
{
    let mut by_day: BTreeMap<DayKey, HashSet<&'a str>> = BTreeMap::new();
    for habit in habits {
        for completed_at in &habit.completion_dates {
            by_day
                .entry(calendar.day_key(*completed_at))
                .or_default()
                .insert(habit.id.as_str());
        }
    }
    by_day
}

pub fn valid_days(contributions: &BTreeMap<DayKey, HashSet<&str>>) -> BTreeSet<DayKey> {
    contributions
        .iter()
        .filter(|(_, habits)| habits.len() >= ENGAGEMENT_THRESHOLD)
        .map(|(day, _)| *day)
        .collect()
}

/// Pick the anchor: the most recent valid day, if it is today or within the
/// grace window before it. Any other most recent day (older, or after today)
/// means the streak is broken.
pub fn anchor(valid: &BTreeSet<DayKey>, today: DayKey) -> Option<DayKey> {
    let latest = *valid.iter().next_back()?;
    (latest <= today && latest >= today.days_before(ANCHOR_GRACE_DAYS)).then_some(latest)
}

/// Recompute a user's engagement streak from all of their habits.
pub fn compute(calendar: &Calendar, habits: &[Habit], today: DayKey) -> EngagementStreak {
    let contributions = daily_contributions(calendar, habits);
    let valid = valid_days(&contributions);

    let Some(anchor_day) = anchor(&valid, today) else {
        return EngagementStreak {
            days: 0,
            anchor: None,
            valid_days: valid.len(),
        };
    };

    let mut days = 0u32;
    let mut cursor = anchor_day;
    while valid.contains(&cursor) {
        days += 1;
        let previous = cursor.predecessor();
        if previous == cursor {
            break;
        }
        cursor = previous;
    }

    EngagementStreak {
        days,
        anchor: Some(anchor_day),
        valid_days: valid.len(),
    }
}
