use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// When during the day a task is due.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeOfDay {
    AllDay,
    At(NaiveTime),
}

impl TimeOfDay {
    /// Interprets an optional stored value. Absent, blank and unreadable values
    /// all normalise to [`TimeOfDay::AllDay`]; the unreadable case is logged.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return TimeOfDay::AllDay;
        };
        match raw.parse() {
            Ok(time) => time,
            Err(err) => {
                tracing::warn!(time_of_day = %raw, %err, "falling back to all-day");
                TimeOfDay::AllDay
            }
        }
    }

    pub fn time(&self) -> NaiveTime {
        match self {
            TimeOfDay::AllDay => NaiveTime::MIN,
            TimeOfDay::At(time) => *time,
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, TimeOfDay::AllDay)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(raw: &str) -> ScheduleResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(TimeOfDay::AllDay);
        }
        let words: Vec<String> = trimmed
            .split_whitespace()
            .map(|word| word.to_ascii_lowercase())
            .collect();
        if words == ["all", "day"] {
            return Ok(TimeOfDay::AllDay);
        }
        let parsed = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|_| ScheduleError::InvalidTimeOfDay(raw.to_string()))?;
        let minute_precision = parsed
            .with_second(0)
            .and_then(|time| time.with_nanosecond(0))
            .ok_or_else(|| ScheduleError::InvalidTimeOfDay(raw.to_string()))?;
        Ok(TimeOfDay::At(minute_precision))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeOfDay::AllDay => f.write_str("all day"),
            TimeOfDay::At(time) => write!(f, "{}", time.format("%H:%M")),
        }
    }
}

/// Combines a calendar day with a task's time of day.
pub fn anchor_time(date: NaiveDate, time_of_day: TimeOfDay) -> NaiveDateTime {
    date.and_time(time_of_day.time())
}

/// Reads an ISO-8601 timestamp as local wall-clock time.
///
/// Accepted shapes are RFC 3339 (`2024-01-01T09:00:00Z`, `...+02:00`), a naive
/// date-time with or without seconds, and a bare `YYYY-MM-DD`. Any offset is
/// dropped and the written digits are kept.
pub fn parse_timestamp(raw: &str) -> ScheduleResult<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(value);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| ScheduleError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn all_day_variants_normalise_to_midnight() {
        assert_eq!("all day".parse(), Ok(TimeOfDay::AllDay));
        assert_eq!("All Day".parse(), Ok(TimeOfDay::AllDay));
        assert_eq!("".parse(), Ok(TimeOfDay::AllDay));
        assert_eq!(TimeOfDay::parse_lenient(None), TimeOfDay::AllDay);
        assert_eq!(
            anchor_time(date(2024, 3, 5), TimeOfDay::AllDay),
            date(2024, 3, 5).and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn explicit_time_zeroes_seconds() {
        let parsed: TimeOfDay = "18:45:30".parse().unwrap();
        assert_eq!(parsed, TimeOfDay::At(NaiveTime::from_hms_opt(18, 45, 0).unwrap()));
        assert_eq!(
            anchor_time(date(2024, 3, 5), "09:00".parse().unwrap()),
            date(2024, 3, 5).and_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(parsed.to_string(), "18:45");
    }

    #[test]
    fn unreadable_time_falls_back_to_all_day() {
        assert!(matches!(
            "noonish".parse::<TimeOfDay>(),
            Err(ScheduleError::InvalidTimeOfDay(_))
        ));
        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert_eq!(TimeOfDay::parse_lenient(Some("noonish")), TimeOfDay::AllDay);
    }

    #[test]
    fn timestamps_keep_wall_clock_digits() {
        let expected = date(2024, 1, 1).and_hms_opt(9, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01T09:00:00.000Z"), Ok(expected));
        assert_eq!(parse_timestamp("2024-01-01T09:00:00+05:30"), Ok(expected));
        assert_eq!(parse_timestamp("2024-01-01T09:00"), Ok(expected));
        assert_eq!(
            parse_timestamp("2024-01-01"),
            Ok(date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(matches!(
            parse_timestamp("next tuesday"),
            Err(ScheduleError::InvalidTimestamp(_))
        ));
        assert!(parse_timestamp("2024-02-30").is_err());
    }
}
