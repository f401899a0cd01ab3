use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::anchor::parse_timestamp;
use crate::task::CareTaskRule;
use crate::window::CalendarRange;

/// Pause state of a task, resolved once from its stored flags.
///
/// A paused task with a resume date counts as live from that instant onward
/// even though `is_paused` is still set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Activity {
    Active,
    Suspended,
    ResumesAt(NaiveDateTime),
}

impl Activity {
    pub fn of(rule: &CareTaskRule) -> Self {
        if !rule.is_paused {
            return Activity::Active;
        }
        let Some(raw) = rule.resume_date.as_deref() else {
            return Activity::Suspended;
        };
        match parse_timestamp(raw) {
            Ok(resume) => Activity::ResumesAt(resume),
            Err(err) => {
                warn!(task_id = %rule.id, %err, "unreadable resume date; task stays paused");
                Activity::Suspended
            }
        }
    }

    pub fn permits(&self, occurrence: NaiveDateTime) -> bool {
        match self {
            Activity::Active => true,
            Activity::Suspended => false,
            Activity::ResumesAt(resume) => occurrence >= *resume,
        }
    }

    /// The part of `range` in which occurrences are live, or `None` when the
    /// task contributes nothing to it.
    pub fn live_range(&self, range: &CalendarRange) -> Option<CalendarRange> {
        match self {
            Activity::Active => Some(*range),
            Activity::Suspended => None,
            Activity::ResumesAt(resume) => range.starting_at(*resume),
        }
    }
}

pub fn is_active(rule: &CareTaskRule, occurrence: NaiveDateTime) -> bool {
    Activity::of(rule).permits(occurrence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rule(is_paused: bool, resume_date: Option<&str>) -> CareTaskRule {
        CareTaskRule {
            id: "task".into(),
            plant_id: "plant".into(),
            title: None,
            frequency: "Weekly".into(),
            time_of_day: None,
            anchor_due_date: Some("2024-01-01".into()),
            is_paused,
            resume_date: resume_date.map(str::to_string),
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn unpaused_is_always_active() {
        let task = rule(false, Some("2030-01-01"));
        assert!(is_active(&task, at(2024, 1, 1, 0)));
        assert_eq!(Activity::of(&task), Activity::Active);
    }

    #[test]
    fn paused_without_resume_is_never_active() {
        let task = rule(true, None);
        assert!(!is_active(&task, at(1999, 1, 1, 0)));
        assert!(!is_active(&task, at(2099, 1, 1, 0)));
    }

    #[test]
    fn resume_date_opens_at_its_own_time() {
        let task = rule(true, Some("2024-03-10T15:00:00Z"));
        assert!(!is_active(&task, at(2024, 3, 9, 23)));
        assert!(!is_active(&task, at(2024, 3, 10, 9)));
        assert!(is_active(&task, at(2024, 3, 10, 15)));
        assert!(is_active(&task, at(2024, 4, 1, 0)));
    }

    #[test]
    fn unreadable_resume_keeps_task_paused() {
        let task = rule(true, Some("soon"));
        assert_eq!(Activity::of(&task), Activity::Suspended);
    }

    #[test]
    fn live_range_narrows_to_resume() {
        let range = CalendarRange::from_days(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
        .unwrap();
        let resumed = Activity::of(&rule(true, Some("2024-03-10")));
        assert_eq!(resumed.live_range(&range).unwrap().start(), at(2024, 3, 10, 0));
        let later = Activity::of(&rule(true, Some("2024-04-10")));
        assert!(later.live_range(&range).is_none());
        assert!(Activity::Suspended.live_range(&range).is_none());

        let afternoon = Activity::of(&rule(true, Some("2024-03-10T15:00:00")));
        assert_eq!(afternoon.live_range(&range).unwrap().start(), at(2024, 3, 10, 15));
    }
}
