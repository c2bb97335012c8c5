use rmcp::model::{GetPromptResult, PromptMessage, PromptMessageRole};

pub fn weekly_adherence_review_prompt(days: u32) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Review how well I kept to my medication schedule over the last {} days.\n\nInclude:\n1. Overall adherence rate and how many days were complete, partial or missed\n2. Which days fell short and by how many doses\n3. Missed and skipped records, with any notes or side effects I reported\n4. Patterns (weekends, evenings, specific medications)\n5. Concrete suggestions, such as reminder times to add or change\n\nUse get_adherence with days={} for the per-day breakdown, list_intakes for the individual records, list_user_medications for the schedule and list_reminders to see which reminders are set up.",
                days, days
            ),
        )])
    .with_description(format!("Medication adherence review for the last {} days", days))
}

pub fn medication_check_in_prompt(medication: Option<&str>) -> GetPromptResult {
    let (description, focus) = match medication {
        Some(name) => (
            format!("Dose check-in for {}", name),
            format!("Focus on {} only.", name),
        ),
        None => (
            "Dose check-in for today's medications".to_string(),
            "Go through every active medication.".to_string(),
        ),
    };
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Help me log today's doses. {}\n\nSteps:\n1. Use list_user_medications to see what I take and how often\n2. Use get_adherence with days=1 to see what is already logged today\n3. Ask me which remaining doses I took, skipped or missed\n4. Record each answer with record_intake (status taken, skipped or missed)\n5. Finish with the updated count for today from get_adherence",
                focus
            ),
        )])
    .with_description(description)
}

pub fn register_from_prescription_photo_prompt(image_path: &str) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Register the medication shown in the photo at {}.\n\nSteps:\n1. Run analyze_prescription with path=\"{}\" and show me what was read\n2. If the confidence is low, run extract_prescription_text on the same file and cross-check the name and dosage\n3. Use search_medications to find the catalog entry; only if nothing matches, say so before going further\n4. After I confirm, call add_user_medication with the catalog id, dosage and a frequency code (once_daily, twice_daily, every_8_hours, as_needed and so on)\n5. Offer to create_reminder entries matching the frequency",
                image_path, image_path
            ),
        )])
    .with_description(format!("Register a medication from the photo at {}", image_path))
}

pub fn monthly_calendar_review_prompt(year: i32, month: u32) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Show my medication calendar for {year}-{month:02}.\n\nUse get_calendar_month with year={year} and month={month}. Render it as a Sunday-first grid with one cell per day: mark complete days, partial days with their percentage, and days with nothing taken. Skip the padding days from neighbouring months in the commentary. Then summarize the month: complete days out of days with medication due, the longest run of complete days, and the weeks that need attention."
            ),
        )])
    .with_description(format!("Adherence calendar for {}-{:02}", year, month))
}
