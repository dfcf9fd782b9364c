//! Per-file-family normalizers
//!
//! Each raw file family of a day folder has a normalizer module that
//! implements the [`DayNormalizer`](super::DayNormalizer) trait.
//!
//! | Family | Module | Source files |
//! |--------|--------|--------------|
//! | Heart rate | [`heart_rate`] | `intra-day-heart-rate-series.json` |
//! | Sleep | [`sleep`] | `sleep.json` |
//! | Activities | [`activity`] | `activities.json`, `<logId>.xml` |

mod activity;
mod heart_rate;
mod sleep;
pub mod tcx;

pub use activity::ActivityNormalizer;
pub use heart_rate::HeartRateNormalizer;
pub use sleep::{expand_interval, SleepNormalizer, SLEEP_CAPTURE_INTERVAL};

use super::DayNormalizer;

/// Create all available normalizers.
///
/// Use this to initialize an [`IngestCoordinator`](super::IngestCoordinator).
pub fn create_all_normalizers() -> Vec<Box<dyn DayNormalizer>> {
    vec![
        Box::new(HeartRateNormalizer::new()),
        Box::new(SleepNormalizer::new()),
        Box::new(ActivityNormalizer::new()),
    ]
}
