//! Daily adherence: expected doses versus recorded `taken` intakes.
//!
//! Everything here is pure and synchronous. Intakes are bucketed by the
//! literal `YYYY-MM-DD` prefix of `status_at` (see [`crate::utils::intake_day`]),
//! so a dose logged at 23:30 with a `+05:00` offset lands on the date written
//! in the string, not on the UTC date.

use chrono::{Datelike, Days, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::frequency::expected_doses_per_day;
use crate::history::History;
use crate::models::{IntakeStatus, MedicationIntake, UserMedication};
use crate::utils::intake_day;

/// Minimum `taken / expected` for a day to count as compliant.
pub const COMPLIANCE_THRESHOLD: f64 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Complete,
    Partial,
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DayAdherence {
    pub date: NaiveDate,
    /// Same for every day of a window; fractional for sparse schedules.
    pub expected_count: f64,
    pub taken_count: u32,
    /// Not capped: extra doses push it above 1.0.
    pub adherence_rate: f64,
    pub is_compliant: bool,
    pub classification: Classification,
}

impl DayAdherence {
    fn new(date: NaiveDate, expected_count: f64, taken_count: u32) -> Self {
        if expected_count <= 0.0 {
            return Self {
                date,
                expected_count,
                taken_count,
                adherence_rate: 0.0,
                is_compliant: false,
                classification: Classification::None,
            };
        }
        let adherence_rate = taken_count as f64 / expected_count;
        let is_compliant = adherence_rate >= COMPLIANCE_THRESHOLD;
        let classification = if is_compliant {
            Classification::Complete
        } else if taken_count > 0 {
            Classification::Partial
        } else {
            Classification::None
        };
        Self {
            date,
            expected_count,
            taken_count,
            adherence_rate,
            is_compliant,
            classification,
        }
    }

    /// Rate as a display percentage, capped at 100.
    pub fn completion_percent(&self) -> u32 {
        (self.adherence_rate * 100.0).round().clamp(0.0, 100.0) as u32
    }
}

/// Total expected doses per day across the active medications.
pub fn expected_daily_doses(medications: &[UserMedication]) -> f64 {
    medications
        .iter()
        .filter(|m| m.is_active)
        .map(|m| expected_doses_per_day(m.prescribed_frequency.as_deref()))
        .sum()
}

/// One entry per calendar day in `[window_start, window_end]`, ascending.
/// An inverted window yields an empty vector.
pub fn compute_adherence(
    intakes: &[MedicationIntake],
    medications: &[UserMedication],
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<DayAdherence> {
    let window = DateWindow::new(window_start, window_end);
    if window.is_empty() {
        return Vec::new();
    }

    let expected_count = expected_daily_doses(medications);

    let mut taken_by_day: HashMap<NaiveDate, u32> = HashMap::new();
    for intake in intakes {
        if intake.status != IntakeStatus::Taken {
            continue;
        }
        let Some(day) = intake_day(intake.status_at.as_deref()) else {
            continue;
        };
        if window.contains(day) {
            *taken_by_day.entry(day).or_default() += 1;
        }
    }

    window
        .days()
        .map(|date| {
            let taken = taken_by_day.get(&date).copied().unwrap_or(0);
            DayAdherence::new(date, expected_count, taken)
        })
        .collect()
}

/// Inclusive range of calendar days. Empty when `start > end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `n` days ending on `end`, inclusive.
    pub fn last_days(end: NaiveDate, n: u32) -> Self {
        if n == 0 {
            return match end.succ_opt() {
                Some(start) => Self { start, end },
                None => Self {
                    start: NaiveDate::MAX,
                    end: NaiveDate::MIN,
                },
            };
        }
        let start = end
            .checked_sub_days(Days::new(u64::from(n - 1)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// First to last day of the month. `None` for an invalid month.
    pub fn calendar_month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            start,
            end: next.pred_opt()?,
        })
    }

    /// The month padded with adjacent days so it spans whole Sunday-to-Saturday weeks.
    pub fn month_grid(year: i32, month: u32) -> Option<Self> {
        let month_window = Self::calendar_month(year, month)?;
        let lead = month_window.start.weekday().num_days_from_sunday();
        let trail = 6 - month_window.end.weekday().num_days_from_sunday();
        Some(Self {
            start: month_window
                .start
                .checked_sub_days(Days::new(u64::from(lead)))?,
            end: month_window
                .end
                .checked_add_days(Days::new(u64::from(trail)))?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AdherenceSummary {
    pub days: usize,
    pub complete_days: usize,
    pub partial_days: usize,
    pub none_days: usize,
    /// Days with a positive expected count.
    pub days_with_obligations: usize,
    pub total_taken: u32,
    pub total_expected: f64,
    /// `total_taken / total_expected`, 0 when nothing was expected.
    pub overall_rate: f64,
    /// Complete days over days with obligations, as a rounded percentage.
    pub completion_percent: u32,
}

impl AdherenceSummary {
    pub fn from_days(days: &[DayAdherence]) -> Self {
        let mut summary = Self {
            days: days.len(),
            ..Self::default()
        };
        for day in days {
            match day.classification {
                Classification::Complete => summary.complete_days += 1,
                Classification::Partial => summary.partial_days += 1,
                Classification::None => summary.none_days += 1,
            }
            if day.expected_count > 0.0 {
                summary.days_with_obligations += 1;
            }
            summary.total_taken = summary.total_taken.saturating_add(day.taken_count);
            summary.total_expected += day.expected_count;
        }
        if summary.total_expected > 0.0 {
            summary.overall_rate = summary.total_taken as f64 / summary.total_expected;
        }
        if summary.days_with_obligations > 0 {
            summary.completion_percent = (summary.complete_days as f64 * 100.0
                / summary.days_with_obligations as f64)
                .round() as u32;
        }
        summary
    }
}

/// Per-day adherence for a window with its summary and record counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AdherenceReport {
    pub window: DateWindow,
    pub days: Vec<DayAdherence>,
    pub summary: AdherenceSummary,
    pub taken_records: u32,
    pub missed_records: u32,
    pub skipped_records: u32,
    /// Set when the intake history behind the report stopped at the page cap,
    /// so counts may be low.
    #[serde(default)]
    pub history_truncated: bool,
}

impl AdherenceReport {
    pub fn build(
        intakes: &[MedicationIntake],
        medications: &[UserMedication],
        window: DateWindow,
    ) -> Self {
        let days = compute_adherence(intakes, medications, window.start, window.end);
        let summary = AdherenceSummary::from_days(&days);

        let (mut taken, mut missed, mut skipped) = (0u32, 0u32, 0u32);
        for intake in intakes {
            let in_window = intake_day(intake.status_at.as_deref())
                .map(|d| window.contains(d))
                .unwrap_or(false);
            if !in_window {
                continue;
            }
            match intake.status {
                IntakeStatus::Taken => taken += 1,
                IntakeStatus::Missed => missed += 1,
                IntakeStatus::Skipped => skipped += 1,
                IntakeStatus::Unknown => {}
            }
        }

        Self {
            window,
            days,
            summary,
            taken_records: taken,
            missed_records: missed,
            skipped_records: skipped,
            history_truncated: false,
        }
    }

    /// Report over a loaded history, carrying its truncation flag.
    pub fn from_history(history: &History, window: DateWindow) -> Self {
        Self {
            history_truncated: history.truncated,
            ..Self::build(&history.intakes, &history.medications, window)
        }
    }
}
