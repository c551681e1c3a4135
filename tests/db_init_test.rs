mod helpers;

use habitus::db;
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    assert!(db_path.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM habits", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn schema_creates_all_tables() {
    let conn = helpers::test_db();

    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    for table in ["users", "habits", "streak_log", "schema_meta"] {
        assert!(tables.contains(&table.to_string()), "{table} table missing");
    }
}

#[test]
fn negative_aggregate_is_rejected_by_check_constraint() {
    let conn = helpers::test_db();
    let result = conn.execute(
        "INSERT INTO users (id, username, total_streaks, created_at, updated_at)
         VALUES ('u1', 'ana', -1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        [],
    );
    assert!(result.is_err(), "negative total_streaks should be rejected");
}

#[test]
fn health_check_passes_on_valid_db() {
    let conn = helpers::test_db();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.engagement_threshold, Some(habitus::streak::ENGAGEMENT_THRESHOLD));
    assert_eq!(report.user_count, 0);
    assert_eq!(report.habit_count, 0);
    assert_eq!(report.log_count, 0);
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_database(&db_path).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn reopening_keeps_data() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    {
        let conn = db::open_database(&db_path).unwrap();
        conn.execute(
            "INSERT INTO users (id, username, total_streaks, created_at, updated_at)
             VALUES ('u1', 'ana', 3, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
    }

    let conn = db::open_database(&db_path).unwrap();
    let streak: i64 = conn
        .query_row("SELECT total_streaks FROM users WHERE id = 'u1'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(streak, 3);
}
