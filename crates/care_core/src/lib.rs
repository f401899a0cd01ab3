pub mod activity;
pub mod agenda;
pub mod anchor;
pub mod config;
pub mod error;
pub mod expander;
pub mod frequency;
pub mod service;
pub mod task;
pub mod window;

pub use crate::agenda::{aggregate, Agenda, Occurrence, OccurrenceAggregator, TimeSlot};
pub use crate::config::ScheduleConfig;
pub use crate::error::ScheduleError;
pub use crate::frequency::FrequencyRule;
pub use crate::service::{CareScheduleService, CareScheduleServiceBuilder, ScheduleExport};
pub use crate::task::{CareTaskRule, PlantMeta};
pub use crate::window::{CalendarRange, WeekStart};
