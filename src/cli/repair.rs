//! CLI `repair` command: recompute every user's engagement streak.

use anyhow::Result;

use habitus::config::HabitusConfig;
use habitus::streak::ENGAGEMENT_THRESHOLD;

pub async fn repair(config: &HabitusConfig) -> Result<()> {
    let (store, reconciler) = super::open_store(config)?;
    let report = reconciler.repair_all_streaks().await?;

    println!("Reconciled {}/{} users.", report.reconciled, report.total_users);

    if report.is_partial() {
        println!();
        println!("Failed ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  {}  {}", failure.user_id, failure.reason);
        }
        println!();
        println!("Fix the records above and run `habitus repair` again.");
    } else {
        // Every cached streak now reflects the compiled threshold.
        store.record_engagement_threshold(ENGAGEMENT_THRESHOLD).await?;
    }

    Ok(())
}
