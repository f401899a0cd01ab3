use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

/// Inclusive `[start, end]` window a calendar view displays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CalendarRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl CalendarRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> ScheduleResult<Self> {
        if start > end {
            return Err(ScheduleError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whole days from the start of `first` through the last second of `last`.
    pub fn from_days(first: NaiveDate, last: NaiveDate) -> ScheduleResult<Self> {
        Self::new(first.and_time(NaiveTime::MIN), end_of_day(last))
    }

    pub fn week_containing(date: NaiveDate, week_start: WeekStart) -> Self {
        let offset = match week_start {
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
            WeekStart::Monday => date.weekday().num_days_from_monday(),
        };
        let first = date - Duration::days(i64::from(offset));
        let last = first + Duration::days(6);
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: end_of_day(last),
        }
    }

    pub fn month_containing(date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let next_month = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        };
        let last = next_month
            .and_then(|next| next.pred_opt())
            .unwrap_or(first);
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: end_of_day(last),
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Number of calendar days touched by the range, rounded up.
    pub fn span_days(&self) -> i64 {
        let seconds = (self.end - self.start).num_seconds();
        seconds / 86_400 + 1
    }

    /// Same range with the start moved forward to `from`, or `None` if that
    /// leaves nothing.
    pub fn starting_at(&self, from: NaiveDateTime) -> Option<Self> {
        let start = self.start.max(from);
        (start <= self.end).then_some(Self {
            start,
            end: self.end,
        })
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.end.date();
        self.start
            .date()
            .iter_days()
            .take_while(move |day| *day <= last)
    }
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        let later = date(2024, 1, 2).and_hms_opt(0, 0, 0).unwrap();
        let earlier = date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        assert!(matches!(
            CalendarRange::new(later, earlier),
            Err(ScheduleError::EmptyRange { .. })
        ));
        assert!(CalendarRange::new(earlier, earlier).is_ok());
    }

    #[test]
    fn week_respects_first_weekday() {
        // 2024-01-03 is a Wednesday.
        let sunday = CalendarRange::week_containing(date(2024, 1, 3), WeekStart::Sunday);
        assert_eq!(sunday.start(), date(2023, 12, 31).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(sunday.end(), date(2024, 1, 6).and_hms_opt(23, 59, 59).unwrap());

        let monday = CalendarRange::week_containing(date(2024, 1, 3), WeekStart::Monday);
        assert_eq!(monday.start().date(), date(2024, 1, 1));
        assert_eq!(monday.end().date(), date(2024, 1, 7));
        assert_eq!(monday.days().count(), 7);
    }

    #[test]
    fn month_covers_leap_february_and_december() {
        let feb = CalendarRange::month_containing(date(2024, 2, 14));
        assert_eq!(feb.start().date(), date(2024, 2, 1));
        assert_eq!(feb.end().date(), date(2024, 2, 29));
        assert_eq!(feb.span_days(), 29);

        let dec = CalendarRange::month_containing(date(2023, 12, 31));
        assert_eq!(dec.end().date(), date(2023, 12, 31));
        assert_eq!(dec.days().count(), 31);
    }

    #[test]
    fn starting_at_narrows_or_empties() {
        let range = CalendarRange::from_days(date(2024, 1, 1), date(2024, 1, 10)).unwrap();
        let narrowed = range
            .starting_at(date(2024, 1, 5).and_hms_opt(0, 0, 0).unwrap())
            .unwrap();
        assert_eq!(narrowed.start().date(), date(2024, 1, 5));
        assert_eq!(range.starting_at(range.start() - Duration::days(3)), Some(range));
        assert!(range
            .starting_at(date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap())
            .is_none());
    }
}
