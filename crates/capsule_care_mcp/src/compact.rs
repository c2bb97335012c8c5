//! Field filtering for token-efficient responses.
//!
//! List tools default to a compact view: each object keeps a small default
//! field set unless the caller names the fields it wants.

use serde_json::Value;

/// Default field sets per entity.
pub mod defaults {
    /// Catalog medications
    pub const MEDICATION: &[&str] = &[
        "id",
        "name",
        "generic_name",
        "brand_name",
        "strength",
        "dosage_form",
    ];

    /// Tracked medications, after enrichment with `name` and `doses_per_day`
    pub const USER_MEDICATION: &[&str] = &[
        "id",
        "name",
        "prescribed_dosage",
        "prescribed_frequency",
        "doses_per_day",
        "is_active",
    ];

    pub const DOCTOR: &[&str] = &["id", "first_name", "last_name", "specialty", "phone"];

    pub const REMINDER: &[&str] = &[
        "id",
        "user_medication_id",
        "title",
        "reminder_time",
        "frequency_type",
        "is_active",
    ];

    pub const NOTIFICATION: &[&str] = &["id", "title", "message", "status", "scheduled_at"];

    pub const PRESCRIPTION: &[&str] = &[
        "id",
        "prescription_number",
        "dosage",
        "frequency",
        "status",
        "expiry_date",
    ];

    pub const INTAKE: &[&str] = &["id", "user_medication_id", "status", "status_at"];

    pub const CONTACT: &[&str] = &["id", "name", "relationship", "phone", "is_primary"];
}

/// Keep only `fields` (or `default_fields` when none are given) of an object.
/// Non-objects are returned unchanged.
pub fn compact_object(value: &Value, default_fields: &[&str], fields: Option<&[String]>) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };

    let mut result = serde_json::Map::new();
    match fields {
        Some(custom) => {
            for field in custom {
                if let Some(val) = obj.get(field) {
                    result.insert(field.clone(), val.clone());
                }
            }
        }
        None => {
            for field in default_fields {
                if let Some(val) = obj.get(*field) {
                    result.insert(field.to_string(), val.clone());
                }
            }
        }
    }
    Value::Object(result)
}

/// Compact every object of an array, optionally keeping only the first `limit`.
pub fn compact_array(
    value: &Value,
    default_fields: &[&str],
    fields: Option<&[String]>,
    limit: Option<usize>,
) -> Value {
    let Some(arr) = value.as_array() else {
        return value.clone();
    };

    Value::Array(
        arr.iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|item| compact_object(item, default_fields, fields))
            .collect(),
    )
}

/// Apply compact mode, or plain field filtering when `compact` is off.
pub fn compact(
    value: &Value,
    compact: bool,
    default_fields: &[&str],
    fields: Option<&[String]>,
) -> Value {
    match (compact, fields) {
        (false, None) => value.clone(),
        (false, Some(f)) if value.is_array() => compact_array(value, &[], Some(f), None),
        (false, Some(f)) => compact_object(value, &[], Some(f)),
        (true, _) if value.is_array() => compact_array(value, default_fields, fields, None),
        (true, _) => compact_object(value, default_fields, fields),
    }
}

/// Serialize a list and compact it in one step.
pub fn compact_list<T: serde::Serialize>(
    items: &[T],
    compact_mode: bool,
    default_fields: &[&str],
    fields: Option<&[String]>,
) -> serde_json::Result<Value> {
    let value = serde_json::to_value(items)?;
    Ok(compact(&value, compact_mode, default_fields, fields))
}
