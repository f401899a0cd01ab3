use std::collections::BTreeSet;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ScheduleConfig;
use crate::frequency::{FrequencyRule, RepeatUnit, Step};
use crate::window::CalendarRange;

/// Points a rule produces inside one range.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Expansion {
    pub occurrences: BTreeSet<NaiveDateTime>,
    /// Set when a walk stopped at its iteration cap rather than at the range
    /// boundary, meaning `occurrences` may be incomplete.
    pub truncated: bool,
}

/// Iterations a walk spends outside the range: up to two steps of run-up
/// from the index estimate plus the one that detects the far edge.
const WALK_SLACK: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct OccurrenceExpander {
    iteration_margin: u32,
    iteration_limit: Option<usize>,
}

impl OccurrenceExpander {
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            iteration_margin: config.iteration_margin,
            iteration_limit: config.iteration_limit,
        }
    }

    /// Enumerates every point reachable from `anchor` by whole steps of
    /// `rule`, in either direction, that lies inside `range`.
    pub fn expand(
        &self,
        rule: FrequencyRule,
        anchor: NaiveDateTime,
        range: &CalendarRange,
    ) -> Expansion {
        let mut expansion = Expansion::default();
        if range.contains(anchor) {
            expansion.occurrences.insert(anchor);
        }
        let Some(step) = rule.step() else {
            return expansion;
        };

        let cap = self.walk_cap(range);
        let first = first_index_at_or_before(anchor, step, range.start()).max(1);
        let last = last_index_at_or_after(anchor, step, range.end()).min(-1);

        let forward = walk(anchor, step, range, first, 1, cap, &mut expansion.occurrences);
        let backward = walk(anchor, step, range, last, -1, cap, &mut expansion.occurrences);
        if forward == WalkEnd::Capped || backward == WalkEnd::Capped {
            warn!(
                %rule,
                %anchor,
                start = %range.start(),
                end = %range.end(),
                cap,
                "occurrence walk hit its iteration cap; results truncated"
            );
            expansion.truncated = true;
        }
        expansion
    }

    fn walk_cap(&self, range: &CalendarRange) -> usize {
        let derived = usize::try_from(range.span_days())
            .unwrap_or(usize::MAX)
            .saturating_add(WALK_SLACK)
            .saturating_add(self.iteration_margin as usize);
        match self.iteration_limit {
            Some(limit) => derived.min(limit),
            None => derived,
        }
    }
}

impl Default for OccurrenceExpander {
    fn default() -> Self {
        Self::new(&ScheduleConfig::default())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum WalkEnd {
    LeftRange,
    Overflow,
    Capped,
}

/// Steps `index` by `direction` until the point leaves `range` on the far
/// side. Points still short of the range are skipped, not emitted.
fn walk(
    anchor: NaiveDateTime,
    step: Step,
    range: &CalendarRange,
    mut index: i64,
    direction: i64,
    cap: usize,
    out: &mut BTreeSet<NaiveDateTime>,
) -> WalkEnd {
    for _ in 0..cap {
        let Some(point) = shift(anchor, step, index) else {
            return WalkEnd::Overflow;
        };
        let past_far_edge = if direction > 0 {
            point > range.end()
        } else {
            point < range.start()
        };
        if past_far_edge {
            return WalkEnd::LeftRange;
        }
        if range.contains(point) {
            out.insert(point);
        }
        index += direction;
    }
    WalkEnd::Capped
}

/// The `index`-th point of the series; negative indices step backward.
///
/// Month and year offsets are taken from the anchor itself, so clamping to a
/// short month never drifts the day of later points.
pub fn shift(anchor: NaiveDateTime, step: Step, index: i64) -> Option<NaiveDateTime> {
    let count = i64::from(step.amount).checked_mul(index)?;
    match step.unit {
        RepeatUnit::Day => anchor.checked_add_signed(Duration::days(count)),
        RepeatUnit::Week => anchor.checked_add_signed(Duration::weeks(count)),
        RepeatUnit::Month => shift_months(anchor.date(), count).map(|d| d.and_time(anchor.time())),
        RepeatUnit::Year => {
            let months = count.checked_mul(12)?;
            shift_months(anchor.date(), months).map(|d| d.and_time(anchor.time()))
        }
    }
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let span = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(span)
    } else {
        date.checked_sub_months(span)
    }
}

fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (i64::from(end.year()) - i64::from(start.year())) * 12
        + (i64::from(end.month()) - i64::from(start.month()))
}

fn step_months(step: Step) -> i64 {
    match step.unit {
        RepeatUnit::Year => i64::from(step.amount) * 12,
        _ => i64::from(step.amount),
    }
}

/// An index whose point is no later than `target`, at most two steps early.
fn first_index_at_or_before(anchor: NaiveDateTime, step: Step, target: NaiveDateTime) -> i64 {
    match step.unit {
        RepeatUnit::Day | RepeatUnit::Week => {
            let step_seconds = step.min_days() * 86_400;
            (target - anchor).num_seconds().div_euclid(step_seconds)
        }
        RepeatUnit::Month | RepeatUnit::Year => {
            months_between(anchor.date(), target.date()).div_euclid(step_months(step)) - 1
        }
    }
}

/// An index whose point is no earlier than `target`, at most two steps late.
fn last_index_at_or_after(anchor: NaiveDateTime, step: Step, target: NaiveDateTime) -> i64 {
    match step.unit {
        RepeatUnit::Day | RepeatUnit::Week => {
            let step_seconds = step.min_days() * 86_400;
            let seconds = (target - anchor).num_seconds();
            -((-seconds).div_euclid(step_seconds))
        }
        RepeatUnit::Month | RepeatUnit::Year => {
            let months = months_between(anchor.date(), target.date());
            -((-months).div_euclid(step_months(step))) + 1
        }
    }
}
