//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text so they sort and
//! compare lexically.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Every table a migrated database holds.
pub const TABLES: [&str; 8] = [
    "heart_rate",
    "heart_rate_summary",
    "sleep_classic_info",
    "sleep_stages_info",
    "sleep_summary",
    "daily_activity_summary",
    "activity_summary",
    "activity_track_point",
];

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: normalized record tables
    r#"
    -- ============================================
    -- Heart rate
    -- ============================================

    CREATE TABLE IF NOT EXISTS heart_rate (
        time_stamp          TEXT PRIMARY KEY,
        heart_rate          INTEGER NOT NULL
    );

    -- Zone minutes and resting rate, -1 when not reported
    CREATE TABLE IF NOT EXISTS heart_rate_summary (
        time_stamp          TEXT PRIMARY KEY,
        resting_heart_rate  INTEGER NOT NULL,
        out_of_range        INTEGER NOT NULL,
        fat_burn            INTEGER NOT NULL,
        cardio              INTEGER NOT NULL,
        peak                INTEGER NOT NULL
    );

    -- ============================================
    -- Sleep
    -- ============================================

    CREATE TABLE IF NOT EXISTS sleep_classic_info (
        time_stamp          TEXT PRIMARY KEY,
        level               TEXT NOT NULL,
        level_code          INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sleep_stages_info (
        time_stamp          TEXT PRIMARY KEY,
        stage               TEXT NOT NULL,
        stage_code          INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sleep_summary (
        time_stamp              TEXT PRIMARY KEY,
        num_sleeps              INTEGER,
        total_sleep_time        INTEGER,
        total_time_in_bed       INTEGER,
        main_sleep_start        TEXT,
        main_sleep_end          TEXT,
        stage_deep_duration     INTEGER,
        stage_light_duration    INTEGER,
        stage_rem_duration      INTEGER,
        stage_wake_duration     INTEGER
    );

    -- ============================================
    -- Activity
    -- ============================================

    CREATE TABLE IF NOT EXISTS daily_activity_summary (
        time_stamp              TEXT PRIMARY KEY,
        steps                   INTEGER NOT NULL,
        floors                  INTEGER NOT NULL,
        elevation               REAL NOT NULL,
        number_of_activities    INTEGER NOT NULL,
        sedentary_minutes       INTEGER NOT NULL,
        lightly_active_minutes  INTEGER NOT NULL,
        fairly_active_minutes   INTEGER NOT NULL,
        very_active_minutes     INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS activity_summary (
        activity_id         INTEGER PRIMARY KEY,
        time_stamp          TEXT NOT NULL,
        distance            REAL NOT NULL,
        steps               INTEGER NOT NULL,
        duration            INTEGER NOT NULL,
        calories            INTEGER NOT NULL,
        activity_type       TEXT NOT NULL,
        activity_type_code  INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_activity_summary_time ON activity_summary(time_stamp);

    CREATE TABLE IF NOT EXISTS activity_track_point (
        activity_id         INTEGER NOT NULL,
        time_stamp          TEXT NOT NULL,
        latitude            REAL,
        longitude           REAL,
        altitude            REAL,
        distance            REAL,
        heart_rate          INTEGER,
        PRIMARY KEY (activity_id, time_stamp)
    );
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.pragma_update(None, "user_version", version)?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
