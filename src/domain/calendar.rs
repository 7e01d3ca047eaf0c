//! Calendar that dated tracking numbers are written in
//!
//! A pinned offset behaves the same all year. The host calendar is resolved
//! through `chrono::Local` for every conversion, so a DST change between
//! allocation and lookup moves local midnight with it.

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Utc,
};
use std::fmt;

/// Step used to walk past a DST gap at midnight
const GAP_STEP_MINUTES: i64 = 15;
/// Widest gap searched (six hours)
const GAP_MAX_STEPS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// Fixed UTC offset from configuration
    Fixed(FixedOffset),
    /// Host time zone, DST included
    Local,
}

impl Calendar {
    pub fn utc() -> Self {
        Calendar::Fixed(Utc.fix())
    }

    /// Calendar date that `now` falls on
    pub fn date_of(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            Calendar::Fixed(offset) => now.with_timezone(offset).date_naive(),
            Calendar::Local => now.with_timezone(&Local).date_naive(),
        }
    }

    /// First instant of `date`. Midnight inside a DST gap rolls forward to the
    /// first local time that exists; an ambiguous midnight takes the earlier one.
    pub fn start_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let midnight = date.and_time(NaiveTime::MIN);
        match self {
            Calendar::Fixed(offset) => first_valid_instant(offset, midnight),
            Calendar::Local => first_valid_instant(&Local, midnight),
        }
    }
}

fn first_valid_instant<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    (0..=GAP_MAX_STEPS)
        .find_map(|step| {
            tz.from_local_datetime(&(local + Duration::minutes(step * GAP_STEP_MINUTES)))
                .earliest()
        })
        .map(|t| t.with_timezone(&Utc))
}

impl From<FixedOffset> for Calendar {
    fn from(offset: FixedOffset) -> Self {
        Calendar::Fixed(offset)
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Calendar::Fixed(offset) => write!(f, "{offset}"),
            Calendar::Local => f.write_str("local"),
        }
    }
}
