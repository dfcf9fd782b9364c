//! Core domain types for fitsync
//!
//! These types are the normalized records produced from one day folder of
//! the raw archive. Every timestamp is a timezone-naive local instant: the
//! tracker reports wall-clock time and zone offsets are stripped, never
//! applied.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Day folder** | One `YYYY-MM-DD` directory of the raw archive |
//! | **Classic** | Older sleep taxonomy: awake / restless / asleep |
//! | **Stages** | Newer sleep taxonomy: wake / rem / light / deep |
//! | **Short data** | Brief wake interruptions that override stage samples |
//! | **Track point** | One GPS/altitude/heart-rate sample of an activity |

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp format used for persisted records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Midnight of a calendar day, used for per-day summary timestamps.
pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

// ============================================
// Heart rate
// ============================================

/// Value stored when the tracker did not report a field.
pub const MISSING_VALUE: i32 = -1;

/// One day of heart-rate zone totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSummary {
    pub time_stamp: NaiveDateTime,
    pub resting_heart_rate: i32,
    pub out_of_range: i32,
    pub fat_burn: i32,
    pub cardio: i32,
    pub peak: i32,
}

/// One per-second heart-rate reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub time_stamp: NaiveDateTime,
    pub heart_rate: i32,
}

// ============================================
// Sleep
// ============================================

/// Classic sleep taxonomy (used by every device before 2019).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepLevel {
    Awake,
    Restless,
    Asleep,
    Unknown,
}

impl SleepLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SleepLevel::Awake => "awake",
            SleepLevel::Restless => "restless",
            SleepLevel::Asleep => "asleep",
            SleepLevel::Unknown => "unknown",
        }
    }

    /// Stable numeric encoding stored next to the tag.
    pub fn code(&self) -> i32 {
        match self {
            SleepLevel::Awake => 0,
            SleepLevel::Restless => 1,
            SleepLevel::Asleep => 2,
            SleepLevel::Unknown => 3,
        }
    }
}

impl std::str::FromStr for SleepLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awake" => Ok(SleepLevel::Awake),
            "restless" => Ok(SleepLevel::Restless),
            "asleep" => Ok(SleepLevel::Asleep),
            "unknown" => Ok(SleepLevel::Unknown),
            _ => Err(format!("unknown sleep level: {}", s)),
        }
    }
}

impl std::fmt::Display for SleepLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages sleep taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    Wake,
    Rem,
    Light,
    Deep,
    Unknown,
}

impl SleepStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SleepStage::Wake => "wake",
            SleepStage::Rem => "rem",
            SleepStage::Light => "light",
            SleepStage::Deep => "deep",
            SleepStage::Unknown => "unknown",
        }
    }

    /// Stable numeric encoding stored next to the tag.
    pub fn code(&self) -> i32 {
        match self {
            SleepStage::Wake => 0,
            SleepStage::Rem => 1,
            SleepStage::Light => 2,
            SleepStage::Deep => 3,
            SleepStage::Unknown => 4,
        }
    }
}

impl std::str::FromStr for SleepStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wake" => Ok(SleepStage::Wake),
            "rem" => Ok(SleepStage::Rem),
            "light" => Ok(SleepStage::Light),
            "deep" => Ok(SleepStage::Deep),
            "unknown" => Ok(SleepStage::Unknown),
            _ => Err(format!("unknown sleep stage: {}", s)),
        }
    }
}

impl std::fmt::Display for SleepStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 30-second classic sleep sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepLevelSample {
    pub time_stamp: NaiveDateTime,
    pub level: SleepLevel,
}

/// 30-second stages sleep sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepStageSample {
    pub time_stamp: NaiveDateTime,
    pub stage: SleepStage,
}

/// Sleep totals for one day.
///
/// The stage durations are only known for stages-format days and are
/// filled in after construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SleepSummary {
    pub time_stamp: NaiveDateTime,
    pub num_sleeps: Option<i32>,
    /// Minutes asleep
    pub total_sleep_time: Option<i32>,
    /// Minutes in bed
    pub total_time_in_bed: Option<i32>,
    pub main_sleep_start: Option<NaiveDateTime>,
    pub main_sleep_end: Option<NaiveDateTime>,
    pub stage_deep_duration: Option<i32>,
    pub stage_light_duration: Option<i32>,
    pub stage_rem_duration: Option<i32>,
    pub stage_wake_duration: Option<i32>,
}

// ============================================
// Activity
// ============================================

/// Activity categories the tracker is known to log.
///
/// This is a closed set: a category name outside it is a schema violation,
/// never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Walk,
    Hike,
    Workout,
    Yoga,
    Run,
    Weights,
    IntervalWorkout,
    Bike,
    Sport,
    Treadmill,
    OutdoorBike,
    Swim,
    AerobicWorkout,
    Spinning,
    Elliptical,
}

impl ActivityType {
    pub const ALL: [ActivityType; 15] = [
        ActivityType::Walk,
        ActivityType::Hike,
        ActivityType::Workout,
        ActivityType::Yoga,
        ActivityType::Run,
        ActivityType::Weights,
        ActivityType::IntervalWorkout,
        ActivityType::Bike,
        ActivityType::Sport,
        ActivityType::Treadmill,
        ActivityType::OutdoorBike,
        ActivityType::Swim,
        ActivityType::AerobicWorkout,
        ActivityType::Spinning,
        ActivityType::Elliptical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Walk => "walk",
            ActivityType::Hike => "hike",
            ActivityType::Workout => "workout",
            ActivityType::Yoga => "yoga",
            ActivityType::Run => "run",
            ActivityType::Weights => "weights",
            ActivityType::IntervalWorkout => "interval_workout",
            ActivityType::Bike => "bike",
            ActivityType::Sport => "sport",
            ActivityType::Treadmill => "treadmill",
            ActivityType::OutdoorBike => "outdoor_bike",
            ActivityType::Swim => "swim",
            ActivityType::AerobicWorkout => "aerobic_workout",
            ActivityType::Spinning => "spinning",
            ActivityType::Elliptical => "elliptical",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ActivityType::Walk => 0,
            ActivityType::Hike => 1,
            ActivityType::Workout => 2,
            ActivityType::Yoga => 3,
            ActivityType::Run => 4,
            ActivityType::Weights => 5,
            ActivityType::IntervalWorkout => 6,
            ActivityType::Bike => 7,
            ActivityType::Sport => 8,
            ActivityType::Treadmill => 9,
            ActivityType::OutdoorBike => 10,
            ActivityType::Swim => 11,
            ActivityType::AerobicWorkout => 12,
            ActivityType::Spinning => 13,
            ActivityType::Elliptical => 14,
        }
    }

    /// Resolve a display name such as "Outdoor Bike" (lower-cased, spaces
    /// replaced by underscores).
    pub fn from_category_name(name: &str) -> Result<Self, String> {
        name.replace(' ', "_").to_lowercase().parse()
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown activity type: {}", s))
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily step/floor totals and intensity buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivitySummary {
    pub time_stamp: NaiveDateTime,
    pub steps: i64,
    pub floors: i64,
    pub elevation: f64,
    pub number_of_activities: i64,
    pub sedentary_minutes: i64,
    pub lightly_active_minutes: i64,
    pub fairly_active_minutes: i64,
    pub very_active_minutes: i64,
}

/// One logged activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Tracker log id (unique across days)
    pub activity_id: i64,
    pub time_stamp: NaiveDateTime,
    /// Meters
    pub distance: f64,
    pub steps: i64,
    /// Seconds
    pub duration: i64,
    pub calories: i64,
    pub activity_type: ActivityType,
}

/// WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One de-duplicated track sample of an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTrackPoint {
    pub activity_id: i64,
    /// Truncated to the whole second
    pub time_stamp: NaiveDateTime,
    pub position: Option<GeoPoint>,
    pub altitude: Option<f64>,
    /// Cumulative meters since the activity start
    pub distance: Option<f64>,
    pub heart_rate: Option<i32>,
}

// ============================================
// Batches
// ============================================

/// Every record normalized from one or more day folders, grouped by kind.
///
/// This is the unit handed to a [`RecordSink`](crate::ingest::RecordSink).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub heart_rate_summaries: Vec<HeartRateSummary>,
    pub heart_rate_samples: Vec<HeartRateSample>,
    pub sleep_levels: Vec<SleepLevelSample>,
    pub sleep_stages: Vec<SleepStageSample>,
    pub sleep_summaries: Vec<SleepSummary>,
    pub daily_activity_summaries: Vec<DailyActivitySummary>,
    pub activity_summaries: Vec<ActivitySummary>,
    pub track_points: Vec<ActivityTrackPoint>,
}

impl RecordBatch {
    /// Move all records of `other` into this batch.
    pub fn extend(&mut self, other: RecordBatch) {
        self.heart_rate_summaries.extend(other.heart_rate_summaries);
        self.heart_rate_samples.extend(other.heart_rate_samples);
        self.sleep_levels.extend(other.sleep_levels);
        self.sleep_stages.extend(other.sleep_stages);
        self.sleep_summaries.extend(other.sleep_summaries);
        self.daily_activity_summaries
            .extend(other.daily_activity_summaries);
        self.activity_summaries.extend(other.activity_summaries);
        self.track_points.extend(other.track_points);
    }

    /// Total number of records across all kinds.
    pub fn len(&self) -> usize {
        self.heart_rate_summaries.len()
            + self.heart_rate_samples.len()
            + self.sleep_levels.len()
            + self.sleep_stages.len()
            + self.sleep_summaries.len()
            + self.daily_activity_summaries.len()
            + self.activity_summaries.len()
            + self.track_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
