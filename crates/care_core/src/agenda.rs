use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::anchor::TimeOfDay;
use crate::config::ScheduleConfig;
use crate::error::ScheduleError;
use crate::expander::OccurrenceExpander;
use crate::task::{CareTaskRule, PlantMeta};
use crate::window::CalendarRange;

/// One concrete instance of a care task, decorated for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub task_id: String,
    pub plant_id: String,
    pub task_title: Option<String>,
    pub plant_name: String,
    pub plant_photo_url: Option<String>,
    pub occurrence_date_time: NaiveDateTime,
    pub time_of_day: TimeOfDay,
}

impl Occurrence {
    pub fn key(&self) -> (&str, &str, NaiveDateTime) {
        (&self.task_id, &self.plant_id, self.occurrence_date_time)
    }

    pub fn day(&self) -> NaiveDate {
        self.occurrence_date_time.date()
    }
}

impl PartialOrd for Occurrence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Occurrence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.occurrence_date_time
            .cmp(&other.occurrence_date_time)
            .then_with(|| self.plant_id.cmp(&other.plant_id))
            .then_with(|| self.task_id.cmp(&other.task_id))
            .then_with(|| self.task_title.cmp(&other.task_title))
            .then_with(|| self.plant_name.cmp(&other.plant_name))
            .then_with(|| self.plant_photo_url.cmp(&other.plant_photo_url))
            .then_with(|| self.time_of_day.cmp(&other.time_of_day))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeSlot {
    AllDay,
    Daytime,
    Nighttime,
}

impl TimeSlot {
    pub fn classify(
        time_of_day: TimeOfDay,
        at: NaiveDateTime,
        daytime_start_hour: u32,
        nighttime_start_hour: u32,
    ) -> Self {
        if time_of_day.is_all_day() {
            return TimeSlot::AllDay;
        }
        let hour = at.hour();
        if (daytime_start_hour..nighttime_start_hour).contains(&hour) {
            TimeSlot::Daytime
        } else {
            TimeSlot::Nighttime
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DaySlots<'a> {
    pub all_day: Vec<&'a Occurrence>,
    pub daytime: Vec<&'a Occurrence>,
    pub nighttime: Vec<&'a Occurrence>,
}

impl DaySlots<'_> {
    pub fn is_empty(&self) -> bool {
        self.all_day.is_empty() && self.daytime.is_empty() && self.nighttime.is_empty()
    }
}

/// Live occurrence times of a single task inside one range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOccurrences {
    pub time_of_day: TimeOfDay,
    pub times: Vec<NaiveDateTime>,
    pub truncated: bool,
}

/// Merged, de-duplicated, time-ordered occurrences for a calendar range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agenda {
    range: CalendarRange,
    occurrences: Vec<Occurrence>,
    truncated_tasks: Vec<String>,
    daytime_start_hour: u32,
    nighttime_start_hour: u32,
}

impl Agenda {
    fn new(
        range: CalendarRange,
        mut occurrences: Vec<Occurrence>,
        mut truncated_tasks: Vec<String>,
        config: &ScheduleConfig,
    ) -> Self {
        occurrences.sort();
        occurrences.dedup_by(|later, earlier| later.key() == earlier.key());
        truncated_tasks.sort();
        truncated_tasks.dedup();
        Self {
            range,
            occurrences,
            truncated_tasks,
            daytime_start_hour: config.daytime_start_hour,
            nighttime_start_hour: config.nighttime_start_hour,
        }
    }

    pub fn range(&self) -> &CalendarRange {
        &self.range
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub fn into_occurrences(self) -> Vec<Occurrence> {
        self.occurrences
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Ids of tasks whose expansion stopped at the iteration cap.
    pub fn truncated_tasks(&self) -> &[String] {
        &self.truncated_tasks
    }

    pub fn occurrences_on_day(&self, day: NaiveDate) -> Vec<&Occurrence> {
        self.occurrences
            .iter()
            .filter(|occurrence| occurrence.day() == day)
            .collect()
    }

    pub fn by_day(&self) -> BTreeMap<NaiveDate, Vec<&Occurrence>> {
        let mut days: BTreeMap<NaiveDate, Vec<&Occurrence>> = BTreeMap::new();
        for occurrence in &self.occurrences {
            days.entry(occurrence.day()).or_default().push(occurrence);
        }
        days
    }

    pub fn slot_of(&self, occurrence: &Occurrence) -> TimeSlot {
        TimeSlot::classify(
            occurrence.time_of_day,
            occurrence.occurrence_date_time,
            self.daytime_start_hour,
            self.nighttime_start_hour,
        )
    }

    pub fn slots_on_day(&self, day: NaiveDate) -> DaySlots<'_> {
        let mut slots = DaySlots::default();
        for occurrence in self.occurrences_on_day(day) {
            match self.slot_of(occurrence) {
                TimeSlot::AllDay => slots.all_day.push(occurrence),
                TimeSlot::Daytime => slots.daytime.push(occurrence),
                TimeSlot::Nighttime => slots.nighttime.push(occurrence),
            }
        }
        slots
    }

    pub fn next_after(&self, instant: NaiveDateTime) -> Option<&Occurrence> {
        let idx = self
            .occurrences
            .partition_point(|occurrence| occurrence.occurrence_date_time <= instant);
        self.occurrences.get(idx)
    }
}

/// Runs the expander over every task and merges the results.
#[derive(Debug, Clone, Copy)]
pub struct OccurrenceAggregator {
    expander: OccurrenceExpander,
    config: ScheduleConfig,
}

impl OccurrenceAggregator {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            expander: OccurrenceExpander::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    #[instrument(skip_all, fields(tasks = rules.len(), plants = plants.len()))]
    pub fn aggregate(
        &self,
        rules: &[CareTaskRule],
        plants: &[PlantMeta],
        range: &CalendarRange,
    ) -> Agenda {
        let plant_index: HashMap<&str, &PlantMeta> =
            plants.iter().map(|plant| (plant.id.as_str(), plant)).collect();
        self.assemble(rules, &plant_index, range, |rule| {
            self.task_occurrences(rule, range)
        })
    }

    /// Occurrences of `rule` inside `range` that survive the pause filter.
    /// `None` when the task cannot be scheduled or is inactive for the range.
    pub fn task_occurrences(
        &self,
        rule: &CareTaskRule,
        range: &CalendarRange,
    ) -> Option<TaskOccurrences> {
        let schedule = rule.schedule()?;
        let Some(live) = schedule.activity.live_range(range) else {
            debug!(task_id = %rule.id, "task paused for the whole range");
            return None;
        };
        let expansion = self.expander.expand(schedule.frequency, schedule.anchor, &live);
        Some(TaskOccurrences {
            time_of_day: schedule.time_of_day,
            times: expansion.occurrences.into_iter().collect(),
            truncated: expansion.truncated,
        })
    }

    pub(crate) fn assemble<'a>(
        &self,
        rules: impl IntoIterator<Item = &'a CareTaskRule>,
        plants: &HashMap<&str, &PlantMeta>,
        range: &CalendarRange,
        mut occurrences_for: impl FnMut(&CareTaskRule) -> Option<TaskOccurrences>,
    ) -> Agenda {
        let mut occurrences = Vec::new();
        let mut truncated = Vec::new();
        for rule in rules {
            let Some(plant) = plants.get(rule.plant_id.as_str()) else {
                let err = ScheduleError::MissingPlant {
                    task_id: rule.id.clone(),
                    plant_id: rule.plant_id.clone(),
                };
                warn!(%err, "skipping orphaned task");
                continue;
            };
            let Some(found) = occurrences_for(rule) else {
                continue;
            };
            if found.truncated {
                truncated.push(rule.id.clone());
            }
            occurrences.extend(found.times.into_iter().map(|at| Occurrence {
                task_id: rule.id.clone(),
                plant_id: rule.plant_id.clone(),
                task_title: rule.title.clone(),
                plant_name: plant.name.clone(),
                plant_photo_url: plant.photo_url.clone(),
                occurrence_date_time: at,
                time_of_day: found.time_of_day,
            }));
        }
        Agenda::new(*range, occurrences, truncated, &self.config)
    }
}

impl Default for OccurrenceAggregator {
    fn default() -> Self {
        Self::new(ScheduleConfig::default())
    }
}

/// Aggregates with the default configuration.
pub fn aggregate(rules: &[CareTaskRule], plants: &[PlantMeta], range: &CalendarRange) -> Agenda {
    OccurrenceAggregator::default().aggregate(rules, plants, range)
}
