//! Fetches everything the aggregator needs in one pass.

use serde::Serialize;

use crate::models::{MedicationIntake, UserMedication};
use crate::{CapsuleCareClient, CapsuleCareError};

#[derive(Clone, Debug, Default, Serialize)]
pub struct History {
    pub medications: Vec<UserMedication>,
    pub intakes: Vec<MedicationIntake>,
    /// Pages fetched from `/notifications/intake`.
    pub pages_loaded: u32,
    /// True when `max_pages` stopped the walk before the last page.
    pub truncated: bool,
}

/// Load the user medications and page through the intake history.
///
/// Any fetch error aborts the whole load; partial history is never returned.
pub async fn load_history<C>(
    client: &C,
    per_page: u32,
    max_pages: u32,
) -> Result<History, CapsuleCareError>
where
    C: CapsuleCareClient + ?Sized,
{
    let medications = client.get_user_medications().await?;

    let mut history = History {
        medications,
        ..History::default()
    };
    let mut page = 1u32;
    while page <= max_pages {
        let batch = client
            .get_medication_intakes(Some(page), Some(per_page))
            .await?;
        history.pages_loaded += 1;
        let has_next = batch.has_next() && !batch.items.is_empty();
        history.intakes.extend(batch.items);
        if !has_next {
            break;
        }
        if page == max_pages {
            history.truncated = true;
            tracing::warn!(
                max_pages,
                loaded = history.intakes.len(),
                "intake history truncated"
            );
            break;
        }
        page += 1;
    }

    tracing::debug!(
        medications = history.medications.len(),
        intakes = history.intakes.len(),
        pages = history.pages_loaded,
        "history loaded"
    );
    Ok(history)
}
