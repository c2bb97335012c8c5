use capsule_care_client::utils::parse_date;
use capsule_care_client::{AdherenceReport, Classification, DateWindow};
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::Serialize;

use crate::error::{McpError, McpResult};

pub const DEFAULT_WINDOW_DAYS: u32 = 7;
/// Longest window a single request may cover.
pub const MAX_WINDOW_DAYS: usize = 366;

/// Pick the report window: explicit `start_date`/`end_date` when both are
/// given, otherwise the last `days` days ending on `today`.
pub fn resolve_window(
    days: Option<u32>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    today: NaiveDate,
) -> McpResult<DateWindow> {
    let window = match (start_date, end_date) {
        (Some(start), Some(end)) => {
            let start = parse_date(start)
                .ok_or_else(|| McpError::Validation(format!("invalid start_date: {}", start)))?;
            let end = parse_date(end)
                .ok_or_else(|| McpError::Validation(format!("invalid end_date: {}", end)))?;
            if start > end {
                return Err(McpError::Validation(
                    "start_date must not be after end_date".into(),
                ));
            }
            DateWindow::new(start, end)
        }
        (None, None) => {
            let days = days.unwrap_or(DEFAULT_WINDOW_DAYS);
            if days == 0 {
                return Err(McpError::Validation("days must be at least 1".into()));
            }
            DateWindow::last_days(today, days)
        }
        _ => {
            return Err(McpError::Validation(
                "start_date and end_date must be given together".into(),
            ));
        }
    };

    if window.len() > MAX_WINDOW_DAYS {
        return Err(McpError::Validation(format!(
            "window covers {} days; at most {} are allowed",
            window.len(),
            MAX_WINDOW_DAYS
        )));
    }
    Ok(window)
}

/// Year and month to render, defaulting to the month of `today`.
pub fn resolve_month(
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
) -> McpResult<(i32, u32, DateWindow)> {
    let year = year.unwrap_or_else(|| today.year());
    let month = month.unwrap_or_else(|| today.month());
    let grid = DateWindow::month_grid(year, month)
        .ok_or_else(|| McpError::Validation(format!("invalid month: {}-{}", year, month)))?;
    Ok((year, month, grid))
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub day: u32,
    /// False for the padding days of the adjacent months.
    pub in_month: bool,
    pub completion_percent: u32,
    pub taken_count: u32,
    pub expected_count: f64,
    pub classification: Classification,
}

/// Split a month-grid report into Sunday-first rows of seven cells.
pub fn calendar_rows(report: &AdherenceReport, month: u32) -> Vec<Vec<CalendarCell>> {
    let cells: Vec<CalendarCell> = report
        .days
        .iter()
        .map(|d| CalendarCell {
            date: d.date,
            day: d.date.day(),
            in_month: d.date.month() == month,
            completion_percent: d.completion_percent(),
            taken_count: d.taken_count,
            expected_count: d.expected_count,
            classification: d.classification,
        })
        .collect();
    cells.chunks(7).map(<[CalendarCell]>::to_vec).collect()
}
