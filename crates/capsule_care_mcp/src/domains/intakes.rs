use capsule_care_client::utils::normalize_timestamp;
use capsule_care_client::{CreateMedicationIntakeRequest, IntakeStatus};
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::domains::ensure_object;
use crate::error::{McpError, McpResult};

/// Fill the intake defaults: status `taken`, logged at `now`.
///
/// A caller-supplied `status_at` is normalized to `YYYY-MM-DDTHH:MM:SS`
/// so the day it lands on is unambiguous.
pub fn prepare_intake(
    mut request: CreateMedicationIntakeRequest,
    now: NaiveDateTime,
) -> McpResult<CreateMedicationIntakeRequest> {
    if request.user_medication_id <= 0 {
        return Err(McpError::Validation(
            "user_medication_id must be positive".into(),
        ));
    }
    if request.status == Some(IntakeStatus::Unknown) {
        return Err(McpError::Validation(
            "status must be one of taken, missed, skipped".into(),
        ));
    }
    request.status.get_or_insert(IntakeStatus::Taken);

    request.status_at = match request.status_at.as_deref().map(str::trim) {
        None | Some("") => Some(now.format("%Y-%m-%dT%H:%M:%S").to_string()),
        Some(raw) => Some(
            normalize_timestamp(raw)
                .ok_or_else(|| McpError::Validation(format!("invalid status_at: {}", raw)))?,
        ),
    };
    Ok(request)
}

/// Validate a partial intake update, normalizing `status_at` like new intakes.
pub fn prepare_update(fields: &Value) -> McpResult<Value> {
    let obj = ensure_object(fields)?;
    let mut out = obj.clone();
    if let Some(status) = obj.get("status") {
        let parsed: IntakeStatus = serde_json::from_value(status.clone())?;
        if parsed == IntakeStatus::Unknown {
            return Err(McpError::Validation(
                "status must be one of taken, missed, skipped".into(),
            ));
        }
    }
    if let Some(Value::String(raw)) = obj.get("status_at") {
        let normalized = normalize_timestamp(raw)
            .ok_or_else(|| McpError::Validation(format!("invalid status_at: {}", raw)))?;
        out.insert("status_at".into(), Value::String(normalized));
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap()
    }

    fn request() -> CreateMedicationIntakeRequest {
        CreateMedicationIntakeRequest {
            user_medication_id: 4,
            ..Default::default()
        }
    }

    #[test]
    fn defaults_to_taken_now() {
        let out = prepare_intake(request(), now()).unwrap();
        assert_eq!(out.status, Some(IntakeStatus::Taken));
        assert_eq!(out.status_at.as_deref(), Some("2025-03-01T08:15:00"));
    }

    #[test]
    fn keeps_explicit_status_and_normalizes_time() {
        let out = prepare_intake(
            CreateMedicationIntakeRequest {
                status: Some(IntakeStatus::Skipped),
                status_at: Some("2025-02-28T21:00:00+01:00".into()),
                ..request()
            },
            now(),
        )
        .unwrap();
        assert_eq!(out.status, Some(IntakeStatus::Skipped));
        assert_eq!(out.status_at.as_deref(), Some("2025-02-28T21:00:00"));
    }

    #[test]
    fn rejects_bad_input() {
        let bad_time = CreateMedicationIntakeRequest {
            status_at: Some("yesterday".into()),
            ..request()
        };
        assert!(prepare_intake(bad_time, now()).is_err());

        let bad_id = CreateMedicationIntakeRequest::default();
        assert!(prepare_intake(bad_id, now()).is_err());

        let unknown = CreateMedicationIntakeRequest {
            status: Some(IntakeStatus::Unknown),
            ..request()
        };
        assert!(prepare_intake(unknown, now()).is_err());
    }

    #[test]
    fn update_normalizes_and_checks_status() {
        let out = prepare_update(&serde_json::json!({
            "status": "missed",
            "status_at": "2025-03-01"
        }))
        .unwrap();
        assert_eq!(out["status_at"], "2025-03-01T00:00:00");
        assert!(prepare_update(&serde_json::json!({"status": "lost"})).is_err());
        assert!(prepare_update(&serde_json::json!({"status_at": "soon"})).is_err());
    }
}
