//! Normalizer trait abstraction
//!
//! Every raw file family (heart rate, sleep, activities) is handled by a
//! type implementing [`DayNormalizer`]. The coordinator runs all of them
//! over each complete day folder and merges their batches.
//!
//! ## Design Principles
//!
//! 1. **Never mis-normalize**: an unknown discriminator is a
//!    [`SchemaViolation`](crate::Error::SchemaViolation), not a default
//! 2. **Documented defaults**: missing numeric fields get a fixed sentinel
//!    (`-1`) or zero, and nothing else is silently filled in
//! 3. **Stateless**: a normalizer owns no state between days

use crate::archive::DayArchive;
use crate::error::Result;
use crate::types::RecordBatch;

/// Turns one raw file family of a day folder into typed records.
pub trait DayNormalizer: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Raw file names this normalizer reads (track files excluded)
    fn source_files(&self) -> &'static [&'static str];

    /// Normalize a day folder that already passed the completeness check.
    ///
    /// ## Error Handling
    ///
    /// - A file missing from the folder is [`crate::Error::MissingFile`]
    /// - Unknown sleep types, levels, zone labels or activity categories are
    ///   [`crate::Error::SchemaViolation`] and must abort the run
    fn normalize(&self, day: &DayArchive) -> Result<RecordBatch>;
}
