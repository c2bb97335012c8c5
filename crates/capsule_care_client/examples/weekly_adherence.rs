use capsule_care_client::{
    AdherenceReport, CapsuleCareClient, DateWindow, LoginRequest, config::Config,
    http_client::ReqwestCapsuleCareClient, load_history,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example: expects CAPSULECARE_TOKEN or CAPSULECARE_USERNAME/PASSWORD in env
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {}", e);
            return Ok(());
        }
    };
    let client = ReqwestCapsuleCareClient::from_config(&cfg)?;
    if let Some(creds) = cfg.credentials.clone() {
        client
            .login(&LoginRequest {
                username: creds.username,
                password: creds.password,
            })
            .await?;
    }

    let history = load_history(&client, 100, cfg.history_max_pages).await?;
    let today = chrono::Local::now().date_naive();
    let report = AdherenceReport::build(
        &history.intakes,
        &history.medications,
        DateWindow::last_days(today, 7),
    );
    for day in &report.days {
        println!(
            "{}  {:>3}%  {}/{}  {:?}",
            day.date.format("%a %d"),
            day.completion_percent(),
            day.taken_count,
            day.expected_count,
            day.classification
        );
    }
    println!(
        "overall {:.0}% ({} complete days of {})",
        report.summary.overall_rate * 100.0,
        report.summary.complete_days,
        report.summary.days_with_obligations
    );
    Ok(())
}
