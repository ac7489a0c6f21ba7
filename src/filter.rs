// 📅 Date-Range Filter
//
// Every report narrows its records with the same predicate:
//   created_at >= start                   (start given)
//   created_at <  end + 1 day, 00:00:00   (end given)
//
// The end date therefore covers its whole calendar day. All values are naive
// store-local timestamps; no timezone conversion happens anywhere.

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange { start, end }
    }

    /// No bounds on either side
    pub fn all_time() -> Self {
        DateRange::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Inclusive lower bound (midnight of the start date)
    pub fn lower_bound(&self) -> Option<NaiveDateTime> {
        self.start.and_then(|date| date.and_hms_opt(0, 0, 0))
    }

    /// Exclusive upper bound (midnight of the day after the end date)
    ///
    /// `None` for an unbounded end, and also when `end` is `NaiveDate::MAX`,
    /// since nothing can be later than that day anyway.
    pub fn upper_bound(&self) -> Option<NaiveDateTime> {
        self.end
            .and_then(|date| date.checked_add_days(Days::new(1)))
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        if let Some(lower) = self.lower_bound() {
            if timestamp < lower {
                return false;
            }
        }

        if let Some(upper) = self.upper_bound() {
            if timestamp >= upper {
                return false;
            }
        }

        true
    }

    /// Keep only the records whose timestamp falls inside the range
    pub fn filter<T, F>(&self, records: impl IntoIterator<Item = T>, timestamp: F) -> Vec<T>
    where
        F: Fn(&T) -> NaiveDateTime,
    {
        records
            .into_iter()
            .filter(|record| self.contains(timestamp(record)))
            .collect()
    }
}
