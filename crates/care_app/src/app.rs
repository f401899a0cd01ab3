use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use care_core::{
    agenda::DaySlots, Agenda, CalendarRange, CareScheduleService, Occurrence, ScheduleConfig,
    ScheduleExport, WeekStart,
};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Week,
    Month,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) data_path: Option<PathBuf>,
    pub(crate) view: ViewKind,
    pub(crate) focus_date: Option<NaiveDate>,
    pub(crate) week_start: WeekStart,
    pub(crate) schedule: ScheduleConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("PLANTCARE_DATA") {
            config.data_path = Some(PathBuf::from(path));
        }
        if let Ok(view) = std::env::var("PLANTCARE_VIEW") {
            match view.trim().to_ascii_lowercase().as_str() {
                "week" => config.view = ViewKind::Week,
                "month" => config.view = ViewKind::Month,
                other => warn!(view = %other, "unknown view; keeping {:?}", config.view),
            }
        }
        if let Ok(focus) = std::env::var("PLANTCARE_FOCUS_DATE") {
            match NaiveDate::parse_from_str(focus.trim(), "%Y-%m-%d") {
                Ok(date) => config.focus_date = Some(date),
                Err(err) => warn!(focus = %focus, %err, "ignoring focus date"),
            }
        }
        if let Ok(start) = std::env::var("PLANTCARE_WEEK_START") {
            if start.trim().eq_ignore_ascii_case("monday") {
                config.week_start = WeekStart::Monday;
            }
        }
        config.schedule = ScheduleConfig::from_env()?;
        Ok(config)
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn with_view(mut self, view: ViewKind, focus_date: NaiveDate) -> Self {
        self.view = view;
        self.focus_date = Some(focus_date);
        self
    }

    pub fn range(&self) -> CalendarRange {
        let focus = self
            .focus_date
            .unwrap_or_else(|| Local::now().date_naive());
        match self.view {
            ViewKind::Week => CalendarRange::week_containing(focus, self.week_start),
            ViewKind::Month => CalendarRange::month_containing(focus),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            view: ViewKind::Week,
            focus_date: None,
            week_start: WeekStart::Sunday,
            schedule: ScheduleConfig::default(),
        }
    }
}

pub fn load_export(path: &Path) -> Result<ScheduleExport> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading schedule export {}", path.display()))?;
    let export: ScheduleExport = serde_json::from_str(&raw)
        .with_context(|| format!("parsing schedule export {}", path.display()))?;
    debug!(
        path = %path.display(),
        plants = export.plants.len(),
        tasks = export.tasks.len(),
        "loaded schedule export"
    );
    Ok(export)
}

pub fn render_agenda(agenda: &Agenda, today: NaiveDate) -> String {
    let mut out = String::new();
    let range = agenda.range();
    let _ = writeln!(
        out,
        "Care schedule {} to {} ({} occurrence{})",
        range.start().date(),
        range.end().date(),
        agenda.len(),
        if agenda.len() == 1 { "" } else { "s" }
    );
    for day in range.days() {
        let slots = agenda.slots_on_day(day);
        if slots.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", format_day_heading(day, today));
        render_slots(&mut out, &slots);
    }
    for task_id in agenda.truncated_tasks() {
        let _ = writeln!(out, "! occurrences for task {} may be incomplete", task_id);
    }
    out
}

fn render_slots(out: &mut String, slots: &DaySlots<'_>) {
    for (label, entries) in [
        ("All day", &slots.all_day),
        ("Daytime", &slots.daytime),
        ("Nighttime", &slots.nighttime),
    ] {
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {}", label);
        for occurrence in entries.iter() {
            let _ = writeln!(out, "    {}", describe_occurrence(occurrence));
        }
    }
}

fn describe_occurrence(occurrence: &Occurrence) -> String {
    let title = occurrence.task_title.as_deref().unwrap_or("Care task");
    if occurrence.time_of_day.is_all_day() {
        format!("{} · {}", title, occurrence.plant_name)
    } else {
        format!(
            "{} {} · {}",
            occurrence.occurrence_date_time.format("%H:%M"),
            title,
            occurrence.plant_name
        )
    }
}

fn format_day_heading(date: NaiveDate, today: NaiveDate) -> String {
    let calendar = date.format("%A, %B %d, %Y");
    let relative = format_relative_label(date, today);
    if relative.is_empty() {
        calendar.to_string()
    } else {
        format!("{} ({})", calendar, relative)
    }
}

fn format_relative_label(date: NaiveDate, today: NaiveDate) -> String {
    let diff = date.signed_duration_since(today).num_days();
    match diff {
        -1 => "Yesterday".to_string(),
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        d if d < 0 => format!("{} days ago", -d),
        d => format!("In {} days", d),
    }
}

pub fn run(config: AppConfig) -> Result<String> {
    let Some(path) = config.data_path.as_deref() else {
        bail!("no schedule export given; set PLANTCARE_DATA");
    };
    let export = load_export(path)?;
    let service = CareScheduleService::builder()
        .with_config(config.schedule)
        .with_export(export)
        .build();
    let range = config.range();
    info!(start = %range.start(), end = %range.end(), "computing care agenda");
    let agenda = service.agenda(&range);
    Ok(render_agenda(&agenda, Local::now().date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const EXPORT: &str = r#"{
        "plants": [
            { "id": "p1", "name": "Snake Plant" },
            { "id": "p2", "name": "Basil" }
        ],
        "tasks": [
            { "id": "t1", "plantId": "p1", "title": "Water", "frequency": "Every 2 Weeks",
              "timeOfDay": "all day", "anchorDueDate": "2024-01-02", "isPaused": false },
            { "id": "t2", "plantId": "p2", "title": "Harvest", "frequency": "Daily",
              "timeOfDay": "20:15", "anchorDueDate": "2024-01-01T00:00:00Z", "isPaused": false },
            { "id": "t3", "plantId": "p9", "title": "Ghost", "frequency": "Daily",
              "anchorDueDate": "2024-01-01", "isPaused": false }
        ]
    }"#;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn relative_labels() {
        let today = day(2024, 1, 10);
        assert_eq!(format_relative_label(day(2024, 1, 9), today), "Yesterday");
        assert_eq!(format_relative_label(day(2024, 1, 10), today), "Today");
        assert_eq!(format_relative_label(day(2024, 1, 13), today), "In 3 days");
        assert_eq!(format_relative_label(day(2024, 1, 5), today), "5 days ago");
    }

    #[test]
    fn runs_week_view_from_export_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("export.json");
        fs::write(&path, EXPORT).expect("write fixture");

        let config = AppConfig::default()
            .with_data_path(&path)
            .with_view(ViewKind::Week, day(2024, 1, 3));
        let range = config.range();
        assert_eq!(range.start().date(), day(2023, 12, 31));

        let output = run(config).expect("run");
        assert!(output.contains("Care schedule 2023-12-31 to 2024-01-06 (8 occurrences)"));
        assert!(output.contains("Water · Snake Plant"));
        assert!(output.contains("20:15 Harvest · Basil"));
        assert!(!output.contains("Ghost"));
        assert!(output.contains("Nighttime"));
    }

    #[test]
    fn missing_data_path_is_an_error() {
        assert!(run(AppConfig::default()).is_err());
    }

    #[test]
    fn unreadable_export_reports_path() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json").expect("write fixture");
        let err = load_export(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
