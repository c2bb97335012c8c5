use capsule_care_client::{Notification, Page};
use serde_json::{Value, json};

use crate::compact::{compact_list, defaults};
use crate::error::McpResult;

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| n.is_unread()).count()
}

/// One page of notifications with the unread count of that page.
pub fn page_view(
    page: &Page<Notification>,
    compact: bool,
    fields: Option<&[String]>,
) -> McpResult<Value> {
    Ok(json!({
        "notifications": compact_list(&page.items, compact, defaults::NOTIFICATION, fields)?,
        "unread_count": unread_count(&page.items),
        "total": page.total,
        "page": page.page,
        "pages": page.pages,
    }))
}
