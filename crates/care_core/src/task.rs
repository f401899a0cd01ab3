use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::activity::Activity;
use crate::anchor::{anchor_time, parse_timestamp, TimeOfDay};
use crate::frequency::FrequencyRule;

/// A care task as stored by the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CareTaskRule {
    pub id: String,
    pub plant_id: String,
    /// Display label such as "Water" or "Fertilize".
    #[serde(default)]
    pub title: Option<String>,
    pub frequency: String,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub anchor_due_date: Option<String>,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub resume_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlantMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// The parts of a [`CareTaskRule`] the engine works with, parsed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSchedule {
    pub frequency: FrequencyRule,
    pub time_of_day: TimeOfDay,
    /// Seed occurrence with the time of day already applied.
    pub anchor: NaiveDateTime,
    pub activity: Activity,
}

impl CareTaskRule {
    /// Parses the stored strings. Returns `None`, after logging, when the task
    /// has no usable anchor and therefore cannot produce occurrences.
    pub fn schedule(&self) -> Option<TaskSchedule> {
        let Some(raw_anchor) = self.anchor_due_date.as_deref() else {
            warn!(task_id = %self.id, "task has no anchor due date; skipping");
            return None;
        };
        let due = match parse_timestamp(raw_anchor) {
            Ok(due) => due,
            Err(err) => {
                warn!(task_id = %self.id, %err, "unreadable anchor due date; skipping");
                return None;
            }
        };
        let time_of_day = TimeOfDay::parse_lenient(self.time_of_day.as_deref());
        Some(TaskSchedule {
            frequency: FrequencyRule::parse_lenient(&self.frequency),
            time_of_day,
            anchor: anchor_time(due.date(), time_of_day),
            activity: Activity::of(self),
        })
    }
}
