pub mod doctor;
pub mod habit;
pub mod leaderboard;
pub mod repair;
pub mod user;

use anyhow::{Context, Result};
use std::sync::Arc;

use habitus::config::HabitusConfig;
use habitus::db;
use habitus::store::SqliteStore;
use habitus::streak::{SystemClock, ENGAGEMENT_THRESHOLD};
use habitus::Reconciler;

/// Open the configured database and build a reconciler over it.
pub fn open_reconciler(config: &HabitusConfig) -> Result<Reconciler> {
    let (_store, reconciler) = open_store(config)?;
    Ok(reconciler)
}

/// Like [`open_reconciler`], also handing back the concrete store.
pub fn open_store(config: &HabitusConfig) -> Result<(Arc<SqliteStore>, Reconciler)> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    warn_on_threshold_change(&conn);

    let calendar = config.reference_calendar()?;
    let store = Arc::new(SqliteStore::from_connection(conn));
    let reconciler = Reconciler::new(store.clone(), calendar, Arc::new(SystemClock))
        .with_repair_concurrency(config.reconcile.repair_concurrency)
        .with_user_serialization(config.reconcile.serialize_per_user);
    Ok((store, reconciler))
}

/// Cached streaks were computed under the stored threshold until the next repair.
fn warn_on_threshold_change(conn: &rusqlite::Connection) {
    if let Ok(Some(stored)) = db::migrations::get_engagement_threshold(conn) {
        if stored != ENGAGEMENT_THRESHOLD {
            tracing::warn!(
                stored,
                compiled = ENGAGEMENT_THRESHOLD,
                "engagement threshold changed, run `habitus repair` to recompute every streak"
            );
        }
    }
}
