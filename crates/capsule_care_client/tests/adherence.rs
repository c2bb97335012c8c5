use capsule_care_client::{
    Classification, DateWindow, MedicationIntake, UserMedication, compute_adherence,
};
use chrono::NaiveDate;
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn medication(id: i64, frequency: Option<&str>) -> UserMedication {
    serde_json::from_value(json!({
        "id": id,
        "medication_id": id,
        "prescribed_frequency": frequency,
        "is_active": true
    }))
    .unwrap()
}

fn intake(id: i64, status: &str, status_at: Option<&str>) -> MedicationIntake {
    serde_json::from_value(json!({
        "id": id,
        "user_medication_id": 1,
        "status": status,
        "status_at": status_at
    }))
    .unwrap()
}

#[test]
fn no_intakes_means_nothing_taken_and_never_compliant() {
    let meds = vec![medication(1, Some("once_daily")), medication(2, None)];
    let days = compute_adherence(&[], &meds, date(2025, 3, 1), date(2025, 3, 7));
    assert_eq!(days.len(), 7);
    for day in &days {
        assert_eq!(day.taken_count, 0);
        assert_eq!(day.expected_count, 2.0);
        assert!(!day.is_compliant);
        assert_eq!(day.classification, Classification::None);
    }
}

#[test]
fn no_medications_means_nothing_expected() {
    let intakes = vec![intake(1, "taken", Some("2025-03-01T08:00:00"))];
    let days = compute_adherence(&intakes, &[], date(2025, 3, 1), date(2025, 3, 1));
    assert_eq!(days[0].expected_count, 0.0);
    assert_eq!(days[0].taken_count, 1);
    assert_eq!(days[0].adherence_rate, 0.0);
    assert!(!days[0].is_compliant);
    assert_eq!(days[0].classification, Classification::None);
}

#[test]
fn taking_at_least_the_expected_doses_is_compliant() {
    let meds = vec![medication(1, Some("three_times_daily"))];
    for taken in 3..6 {
        let intakes: Vec<_> = (0..taken)
            .map(|i| intake(i, "taken", Some("2025-03-01T08:00:00")))
            .collect();
        let days = compute_adherence(&intakes, &meds, date(2025, 3, 1), date(2025, 3, 1));
        assert!(days[0].is_compliant, "taken={taken}");
        assert_eq!(days[0].classification, Classification::Complete);
    }
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let meds = vec![medication(1, Some("twice_daily"))];
    let intakes = vec![
        intake(1, "taken", Some("2025-03-01T08:00:00")),
        intake(2, "skipped", Some("2025-03-02T08:00:00")),
    ];
    let first = compute_adherence(&intakes, &meds, date(2025, 3, 1), date(2025, 3, 3));
    let second = compute_adherence(&intakes, &meds, date(2025, 3, 1), date(2025, 3, 3));
    assert_eq!(first, second);
}

#[test]
fn output_covers_each_day_of_window_in_order() {
    let meds = vec![medication(1, None)];
    let start = date(2024, 2, 25);
    let end = date(2024, 3, 3);
    let days = compute_adherence(&[], &meds, start, end);
    assert_eq!(days.len(), DateWindow::new(start, end).len());
    assert_eq!(days.len(), 8);
    assert_eq!(days.first().unwrap().date, start);
    assert_eq!(days.last().unwrap().date, end);
    assert!(days.windows(2).all(|w| w[0].date < w[1].date));
}

#[test]
fn twice_daily_partial_then_complete() {
    let meds = vec![medication(1, Some("twice_daily"))];
    let d = date(2025, 3, 1);

    let one = vec![intake(1, "taken", Some("2025-03-01T08:00:00"))];
    let day = &compute_adherence(&one, &meds, d, d)[0];
    assert_eq!(day.taken_count, 1);
    assert_eq!(day.expected_count, 2.0);
    assert_eq!(day.adherence_rate, 0.5);
    assert!(!day.is_compliant);
    assert_eq!(day.classification, Classification::Partial);

    let two = vec![
        intake(1, "taken", Some("2025-03-01T08:00:00")),
        intake(2, "taken", Some("2025-03-01T20:00:00")),
    ];
    let day = &compute_adherence(&two, &meds, d, d)[0];
    assert_eq!(day.taken_count, 2);
    assert_eq!(day.adherence_rate, 1.0);
    assert!(day.is_compliant);
    assert_eq!(day.classification, Classification::Complete);
}

#[test]
fn as_needed_only_is_never_compliant() {
    let meds = vec![medication(1, Some("as_needed"))];
    let intakes = vec![intake(1, "taken", Some("2025-03-01T08:00:00"))];
    let day = &compute_adherence(&intakes, &meds, date(2025, 3, 1), date(2025, 3, 1))[0];
    assert_eq!(day.expected_count, 0.0);
    assert_eq!(day.adherence_rate, 0.0);
    assert!(!day.is_compliant);
}

#[test]
fn skipped_and_missed_do_not_count_as_taken() {
    let meds = vec![medication(1, Some("once_daily"))];
    let intakes = vec![
        intake(1, "skipped", Some("2025-03-01T08:00:00")),
        intake(2, "missed", Some("2025-03-01T09:00:00")),
    ];
    let day = &compute_adherence(&intakes, &meds, date(2025, 3, 1), date(2025, 3, 1))[0];
    assert_eq!(day.taken_count, 0);
    assert_eq!(day.classification, Classification::None);
}

#[test]
fn malformed_timestamps_are_excluded() {
    let meds = vec![medication(1, Some("once_daily"))];
    let intakes = vec![
        intake(1, "taken", None),
        intake(2, "taken", Some("")),
        intake(3, "taken", Some("03/01/2025 08:00")),
        intake(4, "taken", Some("2025-03-01T08:00:00")),
    ];
    let day = &compute_adherence(&intakes, &meds, date(2025, 3, 1), date(2025, 3, 1))[0];
    assert_eq!(day.taken_count, 1);
}

#[test]
fn offset_timestamps_bucket_by_written_date() {
    let meds = vec![medication(1, Some("once_daily"))];
    let intakes = vec![intake(1, "taken", Some("2025-03-01T23:30:00-08:00"))];
    let days = compute_adherence(&intakes, &meds, date(2025, 3, 1), date(2025, 3, 2));
    assert_eq!(days[0].taken_count, 1);
    assert_eq!(days[1].taken_count, 0);
}
