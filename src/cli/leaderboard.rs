use anyhow::Result;

use habitus::config::HabitusConfig;

/// Print the top users by cached engagement streak.
pub async fn leaderboard(config: &HabitusConfig, limit: usize) -> Result<()> {
    let reconciler = super::open_reconciler(config)?;
    let entries = reconciler.leaderboard(limit).await?;

    if entries.is_empty() {
        println!("No users yet.");
        return Ok(());
    }

    println!("Leaderboard");
    println!("{}", "=".repeat(40));
    for entry in &entries {
        println!("{:>3}. {:<24} {:>5}", entry.rank, entry.username, entry.total_streaks);
    }
    Ok(())
}
