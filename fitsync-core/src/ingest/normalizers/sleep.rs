//! Sleep normalizer
//!
//! Reads `sleep.json`, which lists every sleep record of the day plus an
//! optional day summary. Each record carries a `type` discriminator that
//! selects one of two tagging vintages:
//!
//! | Type | Levels | Short data |
//! |------|--------|------------|
//! | `classic` | awake, restless, asleep, unknown | never present |
//! | `stages` | wake, rem, light, deep, unknown | brief wake interruptions |
//!
//! # Expansion
//!
//! Every interval `{dateTime, level, seconds}` is expanded into 30-second
//! samples at `dateTime + 30·i` for `i < seconds / 30`. Leftover seconds
//! are dropped: 30s is the tracker's capture resolution.
//!
//! # Stages reconciliation
//!
//! Stage samples go into a [`Timeline`] first and the short-data wake
//! samples second, so a wake interruption replaces the stage sample at the
//! same 30-second boundary.
//!
//! # Summary
//!
//! All records of one file must belong to a single `dateOfSleep`. With no
//! records there is no summary; with more than one date the file is a
//! schema violation.

use crate::archive::{DayArchive, SLEEP_FILE};
use crate::error::{Error, Result};
use crate::ingest::normalizer::DayNormalizer;
use crate::ingest::timeline::Timeline;
use crate::ingest::timestamps;
use crate::types::{
    day_start, RecordBatch, SleepLevel, SleepLevelSample, SleepStage, SleepStageSample,
    SleepSummary,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Sleep capture resolution in seconds.
pub const SLEEP_CAPTURE_INTERVAL: i64 = 30;

/// Normalizer for `sleep.json`.
#[derive(Debug, Default)]
pub struct SleepNormalizer;

impl SleepNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize the raw JSON document.
    pub fn normalize_str(&self, content: &str) -> Result<RecordBatch> {
        let raw: RawSleepFile = serde_json::from_str(content)?;
        let mut batch = RecordBatch::default();
        let mut sleep_dates = BTreeSet::new();

        for record in &raw.sleep {
            sleep_dates.insert(timestamps::parse_date(&record.date_of_sleep)?);

            match record.sleep_type.as_str() {
                "classic" => batch.sleep_levels.extend(expand_classic(record)?),
                "stages" => batch.sleep_stages.extend(expand_stages(record)?),
                other => {
                    return Err(Error::schema(
                        SLEEP_FILE,
                        format!("unknown sleep type \"{}\"", other),
                    ))
                }
            }
        }

        if sleep_dates.len() > 1 {
            let dates: Vec<String> = sleep_dates.iter().map(|d| d.to_string()).collect();
            return Err(Error::schema(
                SLEEP_FILE,
                format!("records span several sleep dates: {}", dates.join(", ")),
            ));
        }

        if let (Some(date), Some(summary)) = (sleep_dates.first(), raw.summary.as_ref()) {
            batch
                .sleep_summaries
                .push(build_summary(*date, summary, &raw.sleep)?);
        }

        Ok(batch)
    }
}

impl DayNormalizer for SleepNormalizer {
    fn name(&self) -> &'static str {
        "sleep"
    }

    fn source_files(&self) -> &'static [&'static str] {
        &[SLEEP_FILE]
    }

    fn normalize(&self, day: &DayArchive) -> Result<RecordBatch> {
        let content = day.read_to_string(SLEEP_FILE)?;
        self.normalize_str(&content)
    }
}

/// Timestamps of the 30-second samples covering an interval.
pub fn expand_interval(start: NaiveDateTime, seconds: i64) -> impl Iterator<Item = NaiveDateTime> {
    (0..seconds.max(0) / SLEEP_CAPTURE_INTERVAL)
        .map(move |i| start + Duration::seconds(i * SLEEP_CAPTURE_INTERVAL))
}

fn expand_classic(record: &RawSleepRecord) -> Result<Vec<SleepLevelSample>> {
    if record
        .levels
        .short_data
        .as_ref()
        .is_some_and(|short| !short.is_empty())
    {
        return Err(Error::schema(
            SLEEP_FILE,
            format!(
                "classic record of {} carries shortData",
                record.date_of_sleep
            ),
        ));
    }

    let mut samples = Vec::new();
    for interval in &record.levels.data {
        let level: SleepLevel = interval
            .level
            .parse()
            .map_err(|e: String| Error::schema(SLEEP_FILE, e))?;
        let start = timestamps::parse_local_datetime(&interval.date_time)?;
        samples.extend(
            expand_interval(start, interval.seconds)
                .map(|time_stamp| SleepLevelSample { time_stamp, level }),
        );
    }
    Ok(samples)
}

fn expand_stages(record: &RawSleepRecord) -> Result<Vec<SleepStageSample>> {
    let mut timeline = Timeline::new();

    for interval in &record.levels.data {
        let stage: SleepStage = interval
            .level
            .parse()
            .map_err(|e: String| Error::schema(SLEEP_FILE, e))?;
        let start = timestamps::parse_local_datetime(&interval.date_time)?;
        for time_stamp in expand_interval(start, interval.seconds) {
            timeline.insert(time_stamp, SleepStageSample { time_stamp, stage });
        }
    }

    // Short wake interruptions are authoritative over the coarser stages.
    for interval in record.levels.short_data.iter().flatten() {
        if interval.level != SleepStage::Wake.as_str() {
            return Err(Error::schema(
                SLEEP_FILE,
                format!("shortData level \"{}\" is not wake", interval.level),
            ));
        }
        let start = timestamps::parse_local_datetime(&interval.date_time)?;
        for time_stamp in expand_interval(start, interval.seconds) {
            timeline.insert(
                time_stamp,
                SleepStageSample {
                    time_stamp,
                    stage: SleepStage::Wake,
                },
            );
        }
    }

    tracing::debug!(
        date = %record.date_of_sleep,
        samples = timeline.len(),
        overridden = timeline.overwritten(),
        "Expanded stages sleep record"
    );

    Ok(timeline.into_values())
}

fn build_summary(
    date: NaiveDate,
    raw: &RawSleepSummary,
    records: &[RawSleepRecord],
) -> Result<SleepSummary> {
    let mut summary = SleepSummary {
        time_stamp: day_start(date),
        num_sleeps: raw.total_sleep_records,
        total_sleep_time: raw.total_minutes_asleep,
        total_time_in_bed: raw.total_time_in_bed,
        ..Default::default()
    };

    if let Some(main) = records.iter().find(|r| r.is_main_sleep) {
        summary.main_sleep_start = main
            .start_time
            .as_deref()
            .map(timestamps::parse_local_datetime)
            .transpose()?;
        summary.main_sleep_end = main
            .end_time
            .as_deref()
            .map(timestamps::parse_local_datetime)
            .transpose()?;
    }

    if let Some(stages) = &raw.stages {
        summary.stage_deep_duration = stages.deep;
        summary.stage_light_duration = stages.light;
        summary.stage_rem_duration = stages.rem;
        summary.stage_wake_duration = stages.wake;
    }

    Ok(summary)
}

// ============================================
// Raw JSON record types
// ============================================

#[derive(Debug, Deserialize)]
struct RawSleepFile {
    #[serde(default)]
    sleep: Vec<RawSleepRecord>,
    summary: Option<RawSleepSummary>,
}

#[derive(Debug, Deserialize)]
struct RawSleepRecord {
    #[serde(rename = "dateOfSleep")]
    date_of_sleep: String,
    #[serde(rename = "type")]
    sleep_type: String,
    #[serde(rename = "isMainSleep", default)]
    is_main_sleep: bool,
    #[serde(rename = "startTime")]
    start_time: Option<String>,
    #[serde(rename = "endTime")]
    end_time: Option<String>,
    levels: RawLevels,
}

#[derive(Debug, Deserialize)]
struct RawLevels {
    #[serde(default)]
    data: Vec<RawInterval>,
    #[serde(rename = "shortData")]
    short_data: Option<Vec<RawInterval>>,
}

#[derive(Debug, Deserialize)]
struct RawInterval {
    #[serde(rename = "dateTime")]
    date_time: String,
    level: String,
    seconds: i64,
}

#[derive(Debug, Deserialize)]
struct RawSleepSummary {
    #[serde(rename = "totalMinutesAsleep")]
    total_minutes_asleep: Option<i32>,
    #[serde(rename = "totalTimeInBed")]
    total_time_in_bed: Option<i32>,
    #[serde(rename = "totalSleepRecords")]
    total_sleep_records: Option<i32>,
    stages: Option<RawStageMinutes>,
}

#[derive(Debug, Deserialize)]
struct RawStageMinutes {
    deep: Option<i32>,
    light: Option<i32>,
    rem: Option<i32>,
    wake: Option<i32>,
}
