//! Domain logic behind the tools: validation, defaults and view shaping.
//!
//! # Modules
//!
//! - [`adherence`]: window resolution and the calendar month grid
//! - [`intakes`]: intake defaults and timestamp normalization
//! - [`medications`]: frequency validation and enriched medication views
//! - [`notifications`]: unread counting
//! - [`reminders`]: reminder time validation
//! - [`resources`]: the `capsulecare://user/medications` resource body

pub mod adherence;
pub mod intakes;
pub mod medications;
pub mod notifications;
pub mod reminders;
pub mod resources;

use serde_json::{Map, Value};

use crate::error::{McpError, McpResult};

/// Partial updates are sent as JSON objects; reject anything else early.
pub fn ensure_object(fields: &Value) -> McpResult<&Map<String, Value>> {
    match fields.as_object() {
        Some(obj) if !obj.is_empty() => Ok(obj),
        Some(_) => Err(McpError::Validation("fields must not be empty".into())),
        None => Err(McpError::Validation("fields must be a JSON object".into())),
    }
}
