//! Intraday heart-rate normalizer
//!
//! Reads `intra-day-heart-rate-series.json`:
//!
//! ```json
//! {
//!   "activities-heart": [{
//!     "dateTime": "2021-05-10",
//!     "value": {
//!       "restingHeartRate": 60,
//!       "heartRateZones": [{"name": "Fat Burn", "minutes": 30}, ...]
//!     }
//!   }],
//!   "activities-heart-intraday": {
//!     "dataset": [{"time": "00:00:05", "value": 62}, ...]
//!   }
//! }
//! ```
//!
//! Produces one [`HeartRateSummary`] plus one [`HeartRateSample`] per
//! dataset entry, in input order. The dataset is already one entry per
//! second so nothing is de-duplicated here.

use crate::archive::{DayArchive, HEART_RATE_FILE};
use crate::error::{Error, Result};
use crate::ingest::normalizer::DayNormalizer;
use crate::ingest::timestamps;
use crate::types::{
    day_start, HeartRateSample, HeartRateSummary, RecordBatch, MISSING_VALUE,
};
use serde::Deserialize;

/// Normalizer for the intraday heart-rate series.
#[derive(Debug, Default)]
pub struct HeartRateNormalizer;

impl HeartRateNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize the raw JSON document.
    pub fn normalize_str(&self, content: &str) -> Result<RecordBatch> {
        let raw: RawHeartRateFile = serde_json::from_str(content)?;

        let summary = raw
            .activities_heart
            .first()
            .ok_or_else(|| Error::schema(HEART_RATE_FILE, "activities-heart is empty"))?;
        let date = timestamps::parse_date(&summary.date_time)?;

        let zones = ZoneMinutes::from_raw(&summary.value.heart_rate_zones)?;
        let resting_heart_rate = summary.value.resting_heart_rate.unwrap_or_else(|| {
            tracing::trace!(%date, "restingHeartRate missing, using sentinel");
            MISSING_VALUE
        });

        let mut batch = RecordBatch::default();
        batch.heart_rate_summaries.push(HeartRateSummary {
            time_stamp: day_start(date),
            resting_heart_rate,
            out_of_range: zones.out_of_range,
            fat_burn: zones.fat_burn,
            cardio: zones.cardio,
            peak: zones.peak,
        });

        batch.heart_rate_samples.reserve(raw.intraday.dataset.len());
        for entry in &raw.intraday.dataset {
            batch.heart_rate_samples.push(HeartRateSample {
                time_stamp: timestamps::combine(date, &entry.time)?,
                heart_rate: entry.value,
            });
        }

        Ok(batch)
    }
}

impl DayNormalizer for HeartRateNormalizer {
    fn name(&self) -> &'static str {
        "heart_rate"
    }

    fn source_files(&self) -> &'static [&'static str] {
        &[HEART_RATE_FILE]
    }

    fn normalize(&self, day: &DayArchive) -> Result<RecordBatch> {
        let content = day.read_to_string(HEART_RATE_FILE)?;
        self.normalize_str(&content)
    }
}

// ============================================
// Zone mapping
// ============================================

#[derive(Debug, PartialEq, Eq)]
struct ZoneMinutes {
    out_of_range: i32,
    fat_burn: i32,
    cardio: i32,
    peak: i32,
}

impl ZoneMinutes {
    fn from_raw(zones: &[RawZone]) -> Result<Self> {
        let mut minutes = ZoneMinutes {
            out_of_range: MISSING_VALUE,
            fat_burn: MISSING_VALUE,
            cardio: MISSING_VALUE,
            peak: MISSING_VALUE,
        };

        for zone in zones {
            let slot = match zone.name.as_str() {
                "Out of Range" => &mut minutes.out_of_range,
                "Fat Burn" => &mut minutes.fat_burn,
                "Cardio" => &mut minutes.cardio,
                "Peak" => &mut minutes.peak,
                other => {
                    return Err(Error::schema(
                        HEART_RATE_FILE,
                        format!("unknown heart rate zone \"{}\"", other),
                    ))
                }
            };
            *slot = zone.minutes.unwrap_or(MISSING_VALUE);
        }

        Ok(minutes)
    }
}

// ============================================
// Raw JSON record types
// ============================================

#[derive(Debug, Deserialize)]
struct RawHeartRateFile {
    #[serde(rename = "activities-heart")]
    activities_heart: Vec<RawDaySummary>,
    #[serde(rename = "activities-heart-intraday")]
    intraday: RawIntraday,
}

#[derive(Debug, Deserialize)]
struct RawDaySummary {
    #[serde(rename = "dateTime")]
    date_time: String,
    value: RawSummaryValue,
}

#[derive(Debug, Deserialize)]
struct RawSummaryValue {
    #[serde(rename = "restingHeartRate")]
    resting_heart_rate: Option<i32>,
    #[serde(rename = "heartRateZones", default)]
    heart_rate_zones: Vec<RawZone>,
}

#[derive(Debug, Deserialize)]
struct RawZone {
    name: String,
    minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawIntraday {
    #[serde(default)]
    dataset: Vec<RawSample>,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    time: String,
    value: i32,
}
