use capsule_care_client::{FrequencyCode, UserMedication, expected_doses_per_day};
use serde_json::{Map, Value};

use crate::domains::ensure_object;
use crate::error::{McpError, McpResult};

/// Canonical frequency code, or a validation error listing the known codes.
pub fn canonical_frequency(raw: &str) -> McpResult<String> {
    raw.parse::<FrequencyCode>()
        .map(|code| code.as_str().to_string())
        .map_err(|e| {
            let known: Vec<&str> = FrequencyCode::ALL.iter().map(|c| c.as_str()).collect();
            McpError::Validation(format!("{}; expected one of: {}", e, known.join(", ")))
        })
}

/// Validate a partial update: it must be an object, and a
/// `prescribed_frequency` in it is rewritten to its canonical code.
pub fn prepare_update(fields: &Value) -> McpResult<Value> {
    let obj = ensure_object(fields)?;
    let mut out = obj.clone();
    if let Some(Value::String(raw)) = obj.get("prescribed_frequency") {
        out.insert(
            "prescribed_frequency".into(),
            Value::String(canonical_frequency(raw)?),
        );
    }
    Ok(Value::Object(out))
}

/// A tracked medication with its display `name` and `doses_per_day` added.
pub fn enriched(medication: &UserMedication) -> McpResult<Value> {
    let mut value = serde_json::to_value(medication)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("name".into(), Value::String(medication.display_name()));
        obj.insert(
            "doses_per_day".into(),
            Value::from(expected_doses_per_day(
                medication.prescribed_frequency.as_deref(),
            )),
        );
    }
    Ok(value)
}

pub fn enriched_list(medications: &[UserMedication], include_inactive: bool) -> McpResult<Value> {
    let items = medications
        .iter()
        .filter(|m| include_inactive || m.is_active)
        .map(enriched)
        .collect::<McpResult<Vec<_>>>()?;
    Ok(Value::Array(items))
}

/// Short medication lines for prompt bodies.
pub fn describe(medications: &[UserMedication]) -> String {
    let lines: Vec<String> = medications
        .iter()
        .filter(|m| m.is_active)
        .map(|m| {
            let mut line = format!("- {} (id {})", m.display_name(), m.id);
            if let Some(dosage) = &m.prescribed_dosage {
                line.push_str(&format!(", {}", dosage));
            }
            if let Some(freq) = &m.prescribed_frequency {
                line.push_str(&format!(", {}", freq));
            }
            line
        })
        .collect();
    if lines.is_empty() {
        return "(no active medications)".to_string();
    }
    lines.join("\n")
}

pub fn summary_object(medication: &UserMedication) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("id".into(), Value::from(medication.id));
    obj.insert("name".into(), Value::String(medication.display_name()));
    obj.insert(
        "prescribed_frequency".into(),
        medication
            .prescribed_frequency
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    obj.insert(
        "doses_per_day".into(),
        Value::from(expected_doses_per_day(
            medication.prescribed_frequency.as_deref(),
        )),
    );
    obj
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn med(v: Value) -> UserMedication {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn frequency_is_canonicalized() {
        assert_eq!(canonical_frequency("Twice Daily").unwrap(), "twice_daily");
        let err = canonical_frequency("hourly").unwrap_err().to_string();
        assert!(err.contains("once_daily"));
    }

    #[test]
    fn update_must_be_a_non_empty_object() {
        assert!(prepare_update(&json!([1])).is_err());
        assert!(prepare_update(&json!({})).is_err());
        let out = prepare_update(&json!({"prescribed_frequency": "every-8-hours", "notes": "x"}))
            .unwrap();
        assert_eq!(out["prescribed_frequency"], "every_8_hours");
        assert_eq!(out["notes"], "x");
    }

    #[test]
    fn enrichment_adds_name_and_doses() {
        let m = med(json!({
            "id": 3,
            "prescribed_frequency": "three_times_daily",
            "medication": {"id": 9, "name": "Metformin"}
        }));
        let v = enriched(&m).unwrap();
        assert_eq!(v["name"], "Metformin");
        assert_eq!(v["doses_per_day"], 3.0);
    }

    #[test]
    fn inactive_medications_are_hidden_by_default() {
        let meds = vec![
            med(json!({"id": 1, "is_active": true})),
            med(json!({"id": 2, "is_active": false})),
        ];
        assert_eq!(enriched_list(&meds, false).unwrap().as_array().unwrap().len(), 1);
        assert_eq!(enriched_list(&meds, true).unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn describe_lists_active_medications() {
        let meds = vec![med(json!({
            "id": 1, "custom_name": "Morning pill",
            "prescribed_dosage": "10mg", "prescribed_frequency": "once_daily"
        }))];
        assert_eq!(describe(&meds), "- Morning pill (id 1), 10mg, once_daily");
        assert_eq!(describe(&[]), "(no active medications)");
    }
}
