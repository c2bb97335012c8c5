use capsule_care_client::CreateReminderRequest;
use chrono::NaiveTime;
use serde_json::Value;

use crate::domains::ensure_object;
use crate::error::{McpError, McpResult};

/// Normalize `H:MM`, `HH:MM` or `HH:MM:SS` to `HH:MM`.
pub fn normalize_reminder_time(raw: &str) -> McpResult<String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| McpError::Validation(format!("invalid reminder_time: {}", raw)))
}

pub fn prepare_reminder(mut request: CreateReminderRequest) -> McpResult<CreateReminderRequest> {
    if request.user_medication_id <= 0 {
        return Err(McpError::Validation(
            "user_medication_id must be positive".into(),
        ));
    }
    if request.frequency_value == Some(0) {
        return Err(McpError::Validation(
            "frequency_value must be at least 1".into(),
        ));
    }
    if let Some(time) = request.reminder_time.as_deref() {
        request.reminder_time = Some(normalize_reminder_time(time)?);
    }
    Ok(request)
}

pub fn prepare_update(fields: &Value) -> McpResult<Value> {
    let obj = ensure_object(fields)?;
    let mut out = obj.clone();
    if let Some(Value::String(time)) = obj.get("reminder_time") {
        out.insert(
            "reminder_time".into(),
            Value::String(normalize_reminder_time(time)?),
        );
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn times_are_normalized() {
        assert_eq!(normalize_reminder_time("8:05").unwrap(), "08:05");
        assert_eq!(normalize_reminder_time("20:30:00").unwrap(), "20:30");
        assert!(normalize_reminder_time("25:00").is_err());
        assert!(normalize_reminder_time("noon").is_err());
    }

    #[test]
    fn reminder_requires_a_medication() {
        assert!(prepare_reminder(CreateReminderRequest::default()).is_err());
        let ok = prepare_reminder(CreateReminderRequest {
            user_medication_id: 2,
            reminder_time: Some("7:00".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ok.reminder_time.as_deref(), Some("07:00"));
    }

    #[test]
    fn update_rewrites_time() {
        let out = prepare_update(&json!({"reminder_time": "9:15", "is_active": false})).unwrap();
        assert_eq!(out, json!({"reminder_time": "09:15", "is_active": false}));
        assert!(prepare_update(&json!("x")).is_err());
    }
}
