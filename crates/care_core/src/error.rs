use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unrecognised frequency `{0}`")]
    UnknownFrequency(String),
    #[error("frequency `{raw}` needs a positive interval")]
    InvalidInterval { raw: String },
    #[error("time of day `{0}` is neither \"all day\" nor HH:MM")]
    InvalidTimeOfDay(String),
    #[error("timestamp `{0}` is not a recognised ISO-8601 value")]
    InvalidTimestamp(String),
    #[error("range start {start} is after range end {end}")]
    EmptyRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("task `{task_id}` references unknown plant `{plant_id}`")]
    MissingPlant { task_id: String, plant_id: String },
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
