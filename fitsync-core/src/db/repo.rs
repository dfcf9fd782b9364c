//! Database repository layer
//!
//! Provides the batch write used by ingestion plus the read helpers used
//! by the CLI and tests.

use super::schema::TABLES;
use crate::error::{Error, Result};
use crate::ingest::RecordSink;
use crate::types::*;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // Batch writes
    // ============================================

    /// Insert every record of the batch in one transaction.
    ///
    /// Rows whose key already exists are replaced, so re-normalizing a
    /// day is idempotent.
    pub fn insert_batch(&self, batch: &RecordBatch) -> Result<usize> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        insert_heart_rate(&tx, batch)?;
        insert_sleep(&tx, batch)?;
        insert_activity(&tx, batch)?;

        tx.commit()?;

        tracing::debug!(records = batch.len(), "Committed record batch");
        Ok(batch.len())
    }

    // ============================================
    // Heart rate queries
    // ============================================

    /// Newest heart-rate sample timestamp, if any sample is stored.
    pub fn get_latest_heart_rate_ts(&self) -> Result<Option<NaiveDateTime>> {
        let conn = self.connection();
        let latest: Option<String> =
            conn.query_row("SELECT MAX(time_stamp) FROM heart_rate", [], |r| r.get(0))?;

        latest
            .map(|value| {
                NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT)
                    .map_err(|_| Error::timestamp(value))
            })
            .transpose()
    }

    /// Heart-rate zone summary for a day
    pub fn get_heart_rate_summary(&self, date: NaiveDate) -> Result<Option<HeartRateSummary>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT time_stamp, resting_heart_rate, out_of_range, fat_burn, cardio, peak
             FROM heart_rate_summary WHERE time_stamp = ?",
            [format_ts(&day_start(date))],
            |row| {
                Ok(HeartRateSummary {
                    time_stamp: parse_ts(row, 0)?,
                    resting_heart_rate: row.get(1)?,
                    out_of_range: row.get(2)?,
                    fat_burn: row.get(3)?,
                    cardio: row.get(4)?,
                    peak: row.get(5)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // ============================================
    // Sleep queries
    // ============================================

    /// Stage samples with `from <= time_stamp < to`, in time order
    pub fn get_sleep_stages(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<SleepStageSample>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT time_stamp, stage FROM sleep_stages_info
             WHERE time_stamp >= ? AND time_stamp < ? ORDER BY time_stamp ASC",
        )?;

        let samples = stmt
            .query_map(params![format_ts(&from), format_ts(&to)], |row| {
                Ok(SleepStageSample {
                    time_stamp: parse_ts(row, 0)?,
                    stage: parse_enum(row, 1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(samples)
    }

    /// Sleep totals for a day
    pub fn get_sleep_summary(&self, date: NaiveDate) -> Result<Option<SleepSummary>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT time_stamp, num_sleeps, total_sleep_time, total_time_in_bed,
                    main_sleep_start, main_sleep_end, stage_deep_duration,
                    stage_light_duration, stage_rem_duration, stage_wake_duration
             FROM sleep_summary WHERE time_stamp = ?",
            [format_ts(&day_start(date))],
            |row| {
                Ok(SleepSummary {
                    time_stamp: parse_ts(row, 0)?,
                    num_sleeps: row.get(1)?,
                    total_sleep_time: row.get(2)?,
                    total_time_in_bed: row.get(3)?,
                    main_sleep_start: parse_optional_ts(row, 4)?,
                    main_sleep_end: parse_optional_ts(row, 5)?,
                    stage_deep_duration: row.get(6)?,
                    stage_light_duration: row.get(7)?,
                    stage_rem_duration: row.get(8)?,
                    stage_wake_duration: row.get(9)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // ============================================
    // Activity queries
    // ============================================

    /// Get an activity by its log id
    pub fn get_activity_summary(&self, activity_id: i64) -> Result<Option<ActivitySummary>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT activity_id, time_stamp, distance, steps, duration, calories, activity_type
             FROM activity_summary WHERE activity_id = ?",
            [activity_id],
            |row| {
                Ok(ActivitySummary {
                    activity_id: row.get(0)?,
                    time_stamp: parse_ts(row, 1)?,
                    distance: row.get(2)?,
                    steps: row.get(3)?,
                    duration: row.get(4)?,
                    calories: row.get(5)?,
                    activity_type: parse_enum(row, 6)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    /// Track points of an activity, in time order
    pub fn get_track_points(&self, activity_id: i64) -> Result<Vec<ActivityTrackPoint>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT activity_id, time_stamp, latitude, longitude, altitude, distance, heart_rate
             FROM activity_track_point WHERE activity_id = ? ORDER BY time_stamp ASC",
        )?;

        let points = stmt
            .query_map([activity_id], Self::row_to_track_point)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(points)
    }

    fn row_to_track_point(row: &Row) -> rusqlite::Result<ActivityTrackPoint> {
        let latitude: Option<f64> = row.get(2)?;
        let longitude: Option<f64> = row.get(3)?;
        Ok(ActivityTrackPoint {
            activity_id: row.get(0)?,
            time_stamp: parse_ts(row, 1)?,
            position: latitude
                .zip(longitude)
                .map(|(latitude, longitude)| GeoPoint {
                    latitude,
                    longitude,
                }),
            altitude: row.get(4)?,
            distance: row.get(5)?,
            heart_rate: row.get(6)?,
        })
    }

    // ============================================
    // Statistics
    // ============================================

    /// Number of rows in one of the record tables
    pub fn count_rows(&self, table: &str) -> Result<i64> {
        // Table names cannot be bound as parameters.
        if !TABLES.contains(&table) {
            return Err(Error::Config(format!("unknown table: {}", table)));
        }
        let conn = self.connection();
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
        Ok(count)
    }

    /// Row counts of every record table, in schema order
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        TABLES
            .iter()
            .map(|table| Ok((*table, self.count_rows(table)?)))
            .collect()
    }
}

impl RecordSink for Database {
    fn latest_heart_rate_timestamp(&self) -> Result<Option<NaiveDateTime>> {
        self.get_latest_heart_rate_ts()
    }

    fn write_batch(&self, batch: &RecordBatch) -> Result<usize> {
        self.insert_batch(batch)
    }
}

// ============================================
// Insert helpers (run inside the batch transaction)
// ============================================

fn insert_heart_rate(conn: &Connection, batch: &RecordBatch) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO heart_rate_summary
             (time_stamp, resting_heart_rate, out_of_range, fat_burn, cardio, peak)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for summary in &batch.heart_rate_summaries {
        stmt.execute(params![
            format_ts(&summary.time_stamp),
            summary.resting_heart_rate,
            summary.out_of_range,
            summary.fat_burn,
            summary.cardio,
            summary.peak,
        ])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO heart_rate (time_stamp, heart_rate) VALUES (?1, ?2)",
    )?;
    for sample in &batch.heart_rate_samples {
        stmt.execute(params![format_ts(&sample.time_stamp), sample.heart_rate])?;
    }

    Ok(())
}

fn insert_sleep(conn: &Connection, batch: &RecordBatch) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO sleep_classic_info (time_stamp, level, level_code)
         VALUES (?1, ?2, ?3)",
    )?;
    for sample in &batch.sleep_levels {
        stmt.execute(params![
            format_ts(&sample.time_stamp),
            sample.level.as_str(),
            sample.level.code(),
        ])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO sleep_stages_info (time_stamp, stage, stage_code)
         VALUES (?1, ?2, ?3)",
    )?;
    for sample in &batch.sleep_stages {
        stmt.execute(params![
            format_ts(&sample.time_stamp),
            sample.stage.as_str(),
            sample.stage.code(),
        ])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO sleep_summary
             (time_stamp, num_sleeps, total_sleep_time, total_time_in_bed,
              main_sleep_start, main_sleep_end, stage_deep_duration,
              stage_light_duration, stage_rem_duration, stage_wake_duration)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for summary in &batch.sleep_summaries {
        stmt.execute(params![
            format_ts(&summary.time_stamp),
            summary.num_sleeps,
            summary.total_sleep_time,
            summary.total_time_in_bed,
            summary.main_sleep_start.as_ref().map(format_ts),
            summary.main_sleep_end.as_ref().map(format_ts),
            summary.stage_deep_duration,
            summary.stage_light_duration,
            summary.stage_rem_duration,
            summary.stage_wake_duration,
        ])?;
    }

    Ok(())
}

fn insert_activity(conn: &Connection, batch: &RecordBatch) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO daily_activity_summary
             (time_stamp, steps, floors, elevation, number_of_activities, sedentary_minutes,
              lightly_active_minutes, fairly_active_minutes, very_active_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for daily in &batch.daily_activity_summaries {
        stmt.execute(params![
            format_ts(&daily.time_stamp),
            daily.steps,
            daily.floors,
            daily.elevation,
            daily.number_of_activities,
            daily.sedentary_minutes,
            daily.lightly_active_minutes,
            daily.fairly_active_minutes,
            daily.very_active_minutes,
        ])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO activity_summary
             (activity_id, time_stamp, distance, steps, duration, calories,
              activity_type, activity_type_code)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for activity in &batch.activity_summaries {
        stmt.execute(params![
            activity.activity_id,
            format_ts(&activity.time_stamp),
            activity.distance,
            activity.steps,
            activity.duration,
            activity.calories,
            activity.activity_type.as_str(),
            activity.activity_type.code(),
        ])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO activity_track_point
             (activity_id, time_stamp, latitude, longitude, altitude, distance, heart_rate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for point in &batch.track_points {
        stmt.execute(params![
            point.activity_id,
            format_ts(&point.time_stamp),
            point.position.map(|p| p.latitude),
            point.position.map(|p| p.longitude),
            point.altitude,
            point.distance,
            point.heart_rate,
        ])?;
    }

    Ok(())
}

// ============================================
// Column conversions
// ============================================

fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let value: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_ts(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| {
            NaiveDateTime::parse_from_str(&v, TIMESTAMP_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        })
        .transpose()
}

fn parse_enum<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let value: String = row.get(idx)?;
    value
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}
