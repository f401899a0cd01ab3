use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tuning knobs for the occurrence engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Extra walk steps allowed beyond the range-derived cap.
    pub iteration_margin: u32,
    /// Hard ceiling on steps per walk, applied after the derived cap.
    pub iteration_limit: Option<usize>,
    /// First hour counted as daytime.
    pub daytime_start_hour: u32,
    /// First hour counted as nighttime.
    pub nighttime_start_hour: u32,
}

impl ScheduleConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(margin) = std::env::var("PLANTCARE_ITERATION_MARGIN") {
            if let Ok(value) = margin.trim().parse::<u32>() {
                config.iteration_margin = value;
            }
        }
        if let Ok(limit) = std::env::var("PLANTCARE_ITERATION_LIMIT") {
            if let Ok(value) = limit.trim().parse::<usize>() {
                if value > 0 {
                    config.iteration_limit = Some(value);
                }
            }
        }
        let mut daytime = config.daytime_start_hour;
        let mut nighttime = config.nighttime_start_hour;
        if let Ok(start) = std::env::var("PLANTCARE_DAYTIME_START") {
            if let Ok(value) = start.trim().parse::<u32>() {
                daytime = value;
            }
        }
        if let Ok(start) = std::env::var("PLANTCARE_NIGHTTIME_START") {
            if let Ok(value) = start.trim().parse::<u32>() {
                nighttime = value;
            }
        }
        match config.with_slot_hours(daytime, nighttime) {
            Some(updated) => config = updated,
            None => warn!(daytime, nighttime, "ignoring invalid time-slot hours"),
        }
        Ok(config)
    }

    /// Returns a copy with new slot boundaries, or `None` unless
    /// `daytime < nighttime <= 24`.
    pub fn with_slot_hours(self, daytime_start_hour: u32, nighttime_start_hour: u32) -> Option<Self> {
        if daytime_start_hour >= nighttime_start_hour || nighttime_start_hour > 24 {
            return None;
        }
        Some(Self {
            daytime_start_hour,
            nighttime_start_hour,
            ..self
        })
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            iteration_margin: 8,
            iteration_limit: None,
            daytime_start_hour: 7,
            nighttime_start_hour: 19,
        }
    }
}
