//! Calendar day bucketing.
//!
//! Every streak rule works on whole days of a single reference calendar. The
//! [`Calendar`] maps instants to [`DayKey`]s using one fixed UTC offset for the
//! whole deployment; there is no per-user timezone.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A single day in the reference calendar.
///
/// Ordering matches chronological ordering of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// The day `n` days earlier. Saturates at the earliest representable date.
    pub fn days_before(self, n: u32) -> Self {
        Self(
            self.0
                .checked_sub_days(Days::new(u64::from(n)))
                .unwrap_or(NaiveDate::MIN),
        )
    }

    pub fn predecessor(self) -> Self {
        self.days_before(1)
    }

    /// `true` if `self` is exactly one day before `other`.
    pub fn is_predecessor_of(self, other: DayKey) -> bool {
        self.0.succ_opt() == Some(other.0)
    }
}

impl std::fmt::Display for DayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// The reference calendar used to bucket completion instants into days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Build a calendar from an offset in minutes east of UTC.
    /// Returns `None` when the offset is not strictly within ±24h.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn day_key(&self, instant: DateTime<Utc>) -> DayKey {
        DayKey(instant.with_timezone(&self.offset).date_naive())
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

/// Source of "now" for every reconciliation. Injected so tests can pin today.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
