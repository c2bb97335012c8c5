use capsule_care_client::{
    AdherenceReport, DateWindow, MedicationIntake, UserMedication, compute_adherence,
};
use chrono::NaiveDate;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const FREQUENCIES: [&str; 4] = ["once_daily", "twice_daily", "every_8_hours", "as_needed"];

fn fixtures() -> (Vec<MedicationIntake>, Vec<UserMedication>) {
    let medications: Vec<UserMedication> = (0..12)
        .map(|i| {
            serde_json::from_value(serde_json::json!({
                "id": i,
                "prescribed_frequency": FREQUENCIES[i as usize % FREQUENCIES.len()],
                "is_active": i % 5 != 0
            }))
            .expect("medication")
        })
        .collect();

    // A year of history, roughly six logged doses a day.
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).expect("date");
    let intakes: Vec<MedicationIntake> = start
        .iter_days()
        .take(365)
        .enumerate()
        .flat_map(|(day_idx, day)| {
            (0..6).map(move |dose| {
                let status = if (day_idx + dose) % 7 == 0 { "missed" } else { "taken" };
                serde_json::from_value(serde_json::json!({
                    "id": day_idx * 6 + dose,
                    "user_medication_id": dose,
                    "status": status,
                    "status_at": format!("{}T{:02}:00:00", day, 6 + dose * 3)
                }))
                .expect("intake")
            })
        })
        .collect();

    (intakes, medications)
}

fn bench_compute_adherence(c: &mut Criterion) {
    let (intakes, medications) = fixtures();
    let week = DateWindow::last_days(NaiveDate::from_ymd_opt(2025, 12, 31).expect("date"), 7);
    let grid = DateWindow::month_grid(2025, 6).expect("grid");

    c.bench_function("compute_adherence_week_over_year_history", |b| {
        b.iter(|| {
            compute_adherence(
                black_box(&intakes),
                black_box(&medications),
                week.start,
                week.end,
            )
        })
    });

    c.bench_function("adherence_report_month_grid", |b| {
        b.iter(|| AdherenceReport::build(black_box(&intakes), black_box(&medications), grid))
    });
}

criterion_group!(benches, bench_compute_adherence);
criterion_main!(benches);
