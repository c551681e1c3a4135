//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use habitus::config::HabitusConfig;
use habitus::db;
use habitus::streak::ENGAGEMENT_THRESHOLD;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &HabitusConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `habitus user add <name>` or `habitus serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("habitus Health Report");
    println!("=====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("Calendar offset:   {} min from UTC", config.calendar.utc_offset_minutes);
    println!();
    println!("Engagement threshold:");
    match report.engagement_threshold {
        Some(stored) => println!("  Stored:          {stored}"),
        None => println!("  Stored:          (not set)"),
    }
    println!("  Compiled:        {ENGAGEMENT_THRESHOLD}");
    if let Some(stored) = report.engagement_threshold {
        if stored != ENGAGEMENT_THRESHOLD {
            println!("  WARNING: threshold mismatch! Run `habitus repair` to recompute streaks.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    println!();
    println!("Row counts:");
    println!("  Users:           {}", report.user_count);
    println!("  Habits:          {}", report.habit_count);
    println!("  Audit log:       {}", report.log_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.habitus/habitus.db");
        println!("  2. Run `habitus repair` to rebuild cached engagement streaks.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
