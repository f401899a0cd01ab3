use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RepeatUnit {
    Day,
    Week,
    Month,
    Year,
}

/// One application of a recurrence: `amount` whole `unit`s.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Step {
    pub amount: u32,
    pub unit: RepeatUnit,
}

impl Step {
    /// Shortest span, in days, this step can ever cover.
    pub fn min_days(&self) -> i64 {
        let per_unit = match self.unit {
            RepeatUnit::Day => 1,
            RepeatUnit::Week => 7,
            RepeatUnit::Month => 28,
            RepeatUnit::Year => 365,
        };
        per_unit * i64::from(self.amount)
    }
}

/// Closed set of recurrence patterns a care task can carry.
///
/// Intervals are always positive; zero or negative counts are rejected while
/// parsing so the expander never sees a step that fails to advance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FrequencyRule {
    AdHoc,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    EveryNDays(u32),
    EveryNWeeks(u32),
    EveryNMonths(u32),
}

impl FrequencyRule {
    /// Parses `raw`, falling back to [`FrequencyRule::AdHoc`] when the text
    /// cannot be interpreted. The fallback is logged, never raised.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.parse() {
            Ok(rule) => rule,
            Err(err) => {
                tracing::warn!(frequency = %raw, %err, "treating frequency as non-recurring");
                FrequencyRule::AdHoc
            }
        }
    }

    pub fn step(&self) -> Option<Step> {
        let (amount, unit) = match *self {
            FrequencyRule::AdHoc => return None,
            FrequencyRule::Daily => (1, RepeatUnit::Day),
            FrequencyRule::Weekly => (1, RepeatUnit::Week),
            FrequencyRule::Monthly => (1, RepeatUnit::Month),
            FrequencyRule::Yearly => (1, RepeatUnit::Year),
            FrequencyRule::EveryNDays(n) => (n, RepeatUnit::Day),
            FrequencyRule::EveryNWeeks(n) => (n, RepeatUnit::Week),
            FrequencyRule::EveryNMonths(n) => (n, RepeatUnit::Month),
        };
        Some(Step { amount, unit })
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, FrequencyRule::AdHoc)
    }
}

impl FromStr for FrequencyRule {
    type Err = ScheduleError;

    fn from_str(raw: &str) -> ScheduleResult<Self> {
        let normalized = raw
            .split_whitespace()
            .map(|word| word.to_ascii_lowercase())
            .collect::<Vec<_>>();
        let words: Vec<&str> = normalized.iter().map(String::as_str).collect();

        match words.as_slice() {
            ["daily"] => Ok(FrequencyRule::Daily),
            ["weekly"] => Ok(FrequencyRule::Weekly),
            ["monthly"] => Ok(FrequencyRule::Monthly),
            ["yearly"] => Ok(FrequencyRule::Yearly),
            ["ad-hoc"] | ["as", "needed"] => Ok(FrequencyRule::AdHoc),
            ["every", count, unit] => {
                let amount = parse_interval(raw, count)?;
                match *unit {
                    "day" | "days" => Ok(FrequencyRule::EveryNDays(amount)),
                    "week" | "weeks" => Ok(FrequencyRule::EveryNWeeks(amount)),
                    "month" | "months" => Ok(FrequencyRule::EveryNMonths(amount)),
                    _ => Err(ScheduleError::UnknownFrequency(raw.to_string())),
                }
            }
            _ => Err(ScheduleError::UnknownFrequency(raw.to_string())),
        }
    }
}

fn parse_interval(raw: &str, count: &str) -> ScheduleResult<u32> {
    let value = count
        .parse::<i64>()
        .map_err(|_| ScheduleError::UnknownFrequency(raw.to_string()))?;
    if value <= 0 {
        return Err(ScheduleError::InvalidInterval {
            raw: raw.to_string(),
        });
    }
    u32::try_from(value).map_err(|_| ScheduleError::InvalidInterval {
        raw: raw.to_string(),
    })
}

impl fmt::Display for FrequencyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyRule::AdHoc => f.write_str("Ad-hoc"),
            FrequencyRule::Daily => f.write_str("Daily"),
            FrequencyRule::Weekly => f.write_str("Weekly"),
            FrequencyRule::Monthly => f.write_str("Monthly"),
            FrequencyRule::Yearly => f.write_str("Yearly"),
            FrequencyRule::EveryNDays(n) => write!(f, "Every {} Days", n),
            FrequencyRule::EveryNWeeks(n) => write!(f, "Every {} Weeks", n),
            FrequencyRule::EveryNMonths(n) => write!(f, "Every {} Months", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_tokens_case_insensitively() {
        assert_eq!("Daily".parse(), Ok(FrequencyRule::Daily));
        assert_eq!("WEEKLY".parse(), Ok(FrequencyRule::Weekly));
        assert_eq!(" monthly ".parse(), Ok(FrequencyRule::Monthly));
        assert_eq!("yearly".parse(), Ok(FrequencyRule::Yearly));
        assert_eq!("Ad-hoc".parse(), Ok(FrequencyRule::AdHoc));
        assert_eq!("As needed".parse(), Ok(FrequencyRule::AdHoc));
        assert_eq!("as  NEEDED".parse(), Ok(FrequencyRule::AdHoc));
    }

    #[test]
    fn parses_every_n_patterns() {
        assert_eq!("Every 3 Days".parse(), Ok(FrequencyRule::EveryNDays(3)));
        assert_eq!("every 2 weeks".parse(), Ok(FrequencyRule::EveryNWeeks(2)));
        assert_eq!("Every 6 Months".parse(), Ok(FrequencyRule::EveryNMonths(6)));
        assert_eq!("Every 1 Day".parse(), Ok(FrequencyRule::EveryNDays(1)));
    }

    #[test]
    fn rejects_non_positive_intervals() {
        assert!(matches!(
            "Every 0 Days".parse::<FrequencyRule>(),
            Err(ScheduleError::InvalidInterval { .. })
        ));
        assert!(matches!(
            "Every -2 Weeks".parse::<FrequencyRule>(),
            Err(ScheduleError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn rejects_unknown_text() {
        assert!(matches!(
            "Fortnightly".parse::<FrequencyRule>(),
            Err(ScheduleError::UnknownFrequency(_))
        ));
        assert!(matches!(
            "Every few Days".parse::<FrequencyRule>(),
            Err(ScheduleError::UnknownFrequency(_))
        ));
        assert!(matches!(
            "Every 2 Years".parse::<FrequencyRule>(),
            Err(ScheduleError::UnknownFrequency(_))
        ));
        assert!("".parse::<FrequencyRule>().is_err());
    }

    #[test]
    fn lenient_parse_degrades_to_ad_hoc() {
        assert_eq!(FrequencyRule::parse_lenient("whenever"), FrequencyRule::AdHoc);
        assert_eq!(FrequencyRule::parse_lenient("Every 0 Days"), FrequencyRule::AdHoc);
        assert_eq!(FrequencyRule::parse_lenient("Daily"), FrequencyRule::Daily);
    }

    #[test]
    fn step_reflects_rule() {
        assert_eq!(FrequencyRule::AdHoc.step(), None);
        assert_eq!(
            FrequencyRule::EveryNWeeks(2).step(),
            Some(Step {
                amount: 2,
                unit: RepeatUnit::Week
            })
        );
        assert_eq!(FrequencyRule::Yearly.step().map(|s| s.min_days()), Some(365));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for rule in [
            FrequencyRule::AdHoc,
            FrequencyRule::Monthly,
            FrequencyRule::EveryNDays(3),
            FrequencyRule::EveryNMonths(4),
        ] {
            assert_eq!(rule.to_string().parse(), Ok(rule));
        }
    }
}
