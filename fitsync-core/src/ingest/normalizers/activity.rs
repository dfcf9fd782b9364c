//! Activity normalizer
//!
//! Reads `activities.json` and the TCX track file of every activity it
//! lists:
//!
//! ```json
//! {
//!   "activities": [{
//!     "logId": 40123456789,
//!     "startDate": "2021-05-10",
//!     "startTime": "07:30",
//!     "activityParentName": "Outdoor Bike",
//!     "distance": 12.4,
//!     "duration": 2700000,
//!     "steps": 0,
//!     "calories": 410
//!   }],
//!   "summary": {
//!     "steps": 10342, "floors": 12, "elevation": 36.58,
//!     "sedentaryMinutes": 700, "lightlyActiveMinutes": 210,
//!     "fairlyActiveMinutes": 25, "veryActiveMinutes": 45
//!   }
//! }
//! ```
//!
//! Distances are converted from kilometers to meters and durations from
//! milliseconds to seconds. Missing distance, steps, duration or calories
//! count as zero.

use crate::archive::{track_file_name, DayArchive, ACTIVITIES_FILE};
use crate::error::{Error, Result};
use crate::ingest::normalizer::DayNormalizer;
use crate::ingest::normalizers::tcx;
use crate::ingest::timestamps;
use crate::types::{day_start, ActivitySummary, ActivityType, DailyActivitySummary, RecordBatch};
use chrono::NaiveDate;
use serde::Deserialize;

/// Normalizer for `activities.json` and the per-activity track files.
#[derive(Debug, Default)]
pub struct ActivityNormalizer;

impl ActivityNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize the activity list and day summary (no track files).
    pub fn normalize_summaries(&self, date: NaiveDate, content: &str) -> Result<RecordBatch> {
        let raw: RawActivitiesFile = serde_json::from_str(content)?;
        let mut batch = RecordBatch::default();

        batch
            .daily_activity_summaries
            .push(daily_summary(date, &raw.summary, raw.activities.len()));

        for activity in &raw.activities {
            batch.activity_summaries.push(activity_summary(activity)?);
        }

        Ok(batch)
    }
}

impl DayNormalizer for ActivityNormalizer {
    fn name(&self) -> &'static str {
        "activity"
    }

    fn source_files(&self) -> &'static [&'static str] {
        &[ACTIVITIES_FILE]
    }

    fn normalize(&self, day: &DayArchive) -> Result<RecordBatch> {
        let content = day.read_to_string(ACTIVITIES_FILE)?;
        let mut batch = self.normalize_summaries(day.date(), &content)?;

        let log_ids: Vec<i64> = batch
            .activity_summaries
            .iter()
            .map(|a| a.activity_id)
            .collect();
        for log_id in log_ids {
            let file_name = track_file_name(log_id);
            let path = day.file_path(&file_name)?;
            let track = day.read_to_string(&file_name)?;
            batch
                .track_points
                .extend(tcx::parse_track(&path, &track, log_id)?);
        }

        Ok(batch)
    }
}

fn daily_summary(date: NaiveDate, raw: &RawDaySummary, activity_count: usize) -> DailyActivitySummary {
    DailyActivitySummary {
        time_stamp: day_start(date),
        steps: raw.steps,
        floors: raw.floors,
        elevation: raw.elevation,
        number_of_activities: activity_count as i64,
        sedentary_minutes: raw.sedentary_minutes,
        lightly_active_minutes: raw.lightly_active_minutes,
        fairly_active_minutes: raw.fairly_active_minutes,
        very_active_minutes: raw.very_active_minutes,
    }
}

fn activity_summary(raw: &RawActivity) -> Result<ActivitySummary> {
    let start_date = timestamps::parse_date(&raw.start_date)?;
    let time_stamp = timestamps::combine(start_date, &raw.start_time)?;

    let activity_type = ActivityType::from_category_name(&raw.activity_parent_name)
        .map_err(|e| Error::schema(ACTIVITIES_FILE, e))?;

    if raw.distance.is_none() || raw.duration.is_none() {
        tracing::trace!(log_id = raw.log_id, "activity without distance or duration, using 0");
    }

    Ok(ActivitySummary {
        activity_id: raw.log_id,
        time_stamp,
        distance: raw.distance.unwrap_or(0.0) * 1000.0,
        steps: raw.steps.unwrap_or(0),
        duration: raw.duration.unwrap_or(0) / 1000,
        calories: raw.calories.unwrap_or(0),
        activity_type,
    })
}

// ============================================
// Raw JSON record types
// ============================================

#[derive(Debug, Deserialize)]
struct RawActivitiesFile {
    #[serde(default)]
    activities: Vec<RawActivity>,
    summary: RawDaySummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActivity {
    log_id: i64,
    start_date: String,
    start_time: String,
    activity_parent_name: String,
    /// Kilometers
    distance: Option<f64>,
    steps: Option<i64>,
    /// Milliseconds
    duration: Option<i64>,
    calories: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDaySummary {
    steps: i64,
    // Trackers without an altimeter omit floors and elevation.
    #[serde(default)]
    floors: i64,
    #[serde(default)]
    elevation: f64,
    sedentary_minutes: i64,
    lightly_active_minutes: i64,
    fairly_active_minutes: i64,
    very_active_minutes: i64,
}
