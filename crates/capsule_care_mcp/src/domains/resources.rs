use capsule_care_client::adherence::expected_daily_doses;
use capsule_care_client::{AdherenceReport, DateWindow, History};
use chrono::NaiveDate;
use serde_json::{Value, json};

use crate::domains::medications::summary_object;

pub const MEDICATIONS_URI: &str = "capsulecare://user/medications";

/// Active medications with their expected doses plus the last-week summary.
pub fn medications_resource(history: &History, today: NaiveDate) -> Value {
    let active: Vec<Value> = history
        .medications
        .iter()
        .filter(|m| m.is_active)
        .map(|m| Value::Object(summary_object(m)))
        .collect();
    let report = AdherenceReport::from_history(history, DateWindow::last_days(today, 7));
    json!({
        "medications": active,
        "expected_daily_doses": expected_daily_doses(&history.medications),
        "last_7_days": report.summary,
        "history_truncated": report.history_truncated,
        "generated_on": today,
    })
}
