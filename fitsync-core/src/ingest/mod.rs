//! Ingestion layer for normalizing raw day archives
//!
//! This module turns downloaded day folders (Layer 0) into typed,
//! time-indexed records handed to a [`RecordSink`] (Layer 1).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Day folders    │ ──► │ IngestCoordinator│ ──► │   RecordSink    │
//! │ (<root>/YYYY-..)│     │                  │     │   (Database)    │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//!                               │
//!                               ▼
//!                    ┌────────────────────────┐
//!                    │  DayNormalizer         │
//!                    │  ├─ HeartRateNormalizer│
//!                    │  ├─ SleepNormalizer    │
//!                    │  └─ ActivityNormalizer │
//!                    └────────────────────────┘
//! ```
//!
//! A run has two phases. First every candidate day picked by the
//! [`Scheduler`] is checked for completeness, so an incomplete day under
//! the `abort` policy stops the run before anything is written. Then each
//! complete day is normalized, newest first, and its batch is either
//! accumulated for one commit at the end of the run or committed on its
//! own (see [`CommitMode`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fitsync_core::{Config, Database, IngestCoordinator};
//!
//! let config = Config::load()?;
//! let db = Database::open(&config.resolved_database_path())?;
//! db.migrate()?;
//! let coordinator = IngestCoordinator::from_config(db, &config)?;
//!
//! let result = coordinator.sync_all()?;
//! println!("Wrote {} records from {} days", result.records_written, result.days_processed);
//! ```

mod normalizer;
pub mod normalizers;
pub mod scheduler;
pub mod timeline;
pub mod timestamps;

pub use normalizer::DayNormalizer;
pub use scheduler::{CandidateDay, Scheduler};

use crate::archive::{Completeness, DayArchive};
use crate::config::{ArchiveConfig, CommitMode, Config, IncompletePolicy, IngestConfig};
use crate::error::{Error, Result};
use crate::types::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

/// Destination for normalized records.
///
/// Implementations insert every record of a batch with insert-or-replace
/// semantics on key collision and commit the whole batch exactly once.
pub trait RecordSink {
    /// Timestamp of the newest persisted heart-rate sample.
    fn latest_heart_rate_timestamp(&self) -> Result<Option<NaiveDateTime>>;

    /// Write a batch in one transaction, returning the number of records.
    fn write_batch(&self, batch: &RecordBatch) -> Result<usize>;
}

/// Result of a full sync run.
#[derive(Debug, Default)]
pub struct SyncResult {
    /// Where the scheduler resumed from
    pub resume_point: Option<NaiveDateTime>,
    /// Number of day folders normalized
    pub days_processed: usize,
    /// Incomplete days left for a later run (`skip` policy only)
    pub days_skipped: Vec<SkippedDay>,
    /// Records produced by the normalizers
    pub records_normalized: usize,
    /// Records handed to the sink
    pub records_written: usize,
    /// Number of sink commits
    pub commits: usize,
    /// Per-day detail in processing order
    pub days: Vec<DaySyncResult>,
}

/// A candidate day that failed the completeness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDay {
    pub date: NaiveDate,
    pub missing: Vec<String>,
}

/// Records normalized for a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySyncResult {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub heart_rate_samples: usize,
    pub sleep_samples: usize,
    pub activities: usize,
    pub track_points: usize,
    pub total_records: usize,
}

impl DaySyncResult {
    fn new(day: &DayArchive, batch: &RecordBatch) -> Self {
        Self {
            date: day.date(),
            path: day.path().to_path_buf(),
            heart_rate_samples: batch.heart_rate_samples.len(),
            sleep_samples: batch.sleep_levels.len() + batch.sleep_stages.len(),
            activities: batch.activity_summaries.len(),
            track_points: batch.track_points.len(),
            total_records: batch.len(),
        }
    }
}

/// What a run would process, without normalizing or writing anything.
#[derive(Debug)]
pub struct SyncPlan {
    pub resume_point: NaiveDateTime,
    pub days: Vec<PlannedDay>,
}

/// A candidate day and its completeness verdict.
#[derive(Debug)]
pub struct PlannedDay {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub completeness: Completeness,
}

/// Coordinates one ingestion run over the archive.
///
/// The coordinator is responsible for:
/// - Asking the scheduler for the resume point and candidate days
/// - Gating every candidate on completeness
/// - Running all normalizers over each complete day
/// - Handing the batches to the sink according to the commit mode
pub struct IngestCoordinator<S: RecordSink> {
    sink: S,
    scheduler: Scheduler,
    normalizers: Vec<Box<dyn DayNormalizer>>,
    policy: IngestConfig,
}

impl<S: RecordSink> IngestCoordinator<S> {
    /// Create a new coordinator with the default normalizers.
    pub fn new(sink: S, archive: ArchiveConfig, policy: IngestConfig) -> Self {
        Self::with_normalizers(sink, archive, policy, normalizers::create_all_normalizers())
    }

    /// Create a coordinator from a loaded configuration.
    ///
    /// Fails when the `[archive]` section is missing.
    pub fn from_config(sink: S, config: &Config) -> Result<Self> {
        let archive = config.archive()?.clone();
        Ok(Self::new(sink, archive, config.ingest))
    }

    /// Create a coordinator with custom normalizers.
    pub fn with_normalizers(
        sink: S,
        archive: ArchiveConfig,
        policy: IngestConfig,
        normalizers: Vec<Box<dyn DayNormalizer>>,
    ) -> Self {
        Self {
            sink,
            scheduler: Scheduler::new(archive),
            normalizers,
            policy,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// List the candidate days and their completeness (dry run).
    pub fn plan(&self) -> Result<SyncPlan> {
        let resume_point = self.scheduler.resume_point(&self.sink)?;
        let mut days = Vec::new();

        for candidate in self.scheduler.candidate_days(resume_point)? {
            let archive = DayArchive::open(&candidate.path)?;
            days.push(PlannedDay {
                date: candidate.date,
                path: candidate.path,
                completeness: archive.check_completeness()?,
            });
        }

        Ok(SyncPlan { resume_point, days })
    }

    /// Run a full sync.
    pub fn sync_all(&self) -> Result<SyncResult> {
        self.sync_all_with_progress(|_, _, _| {})
    }

    /// Run a full sync with progress callback.
    ///
    /// The callback receives `(current_day_index, total_days, day_path)`
    /// before each complete day is normalized.
    ///
    /// ## Example
    ///
    /// ```rust,ignore
    /// coordinator.sync_all_with_progress(|current, total, path| {
    ///     println!("Processing {}/{}: {}", current + 1, total, path.display());
    /// })?;
    /// ```
    pub fn sync_all_with_progress<F>(&self, mut on_progress: F) -> Result<SyncResult>
    where
        F: FnMut(usize, usize, &Path),
    {
        let resume_point = self.scheduler.resume_point(&self.sink)?;
        let candidates = self.scheduler.candidate_days(resume_point)?;

        let mut result = SyncResult {
            resume_point: Some(resume_point),
            ..SyncResult::default()
        };

        let ready = self.gate(&candidates, &mut result)?;
        let total = ready.len();
        let mut pending = RecordBatch::default();

        for (i, day) in ready.iter().enumerate() {
            on_progress(i, total, day.path());

            let batch = self.normalize_day(day)?;
            let day_result = DaySyncResult::new(day, &batch);
            tracing::info!(
                date = %day.date(),
                records = day_result.total_records,
                "Normalized day"
            );

            result.days_processed += 1;
            result.records_normalized += batch.len();
            result.days.push(day_result);

            match self.policy.commit {
                CommitMode::Run => pending.extend(batch),
                CommitMode::Day => {
                    result.records_written += self.sink.write_batch(&batch)?;
                    result.commits += 1;
                }
            }
        }

        if self.policy.commit == CommitMode::Run && !ready.is_empty() {
            result.records_written += self.sink.write_batch(&pending)?;
            result.commits += 1;
        }

        tracing::info!(
            days = result.days_processed,
            skipped = result.days_skipped.len(),
            records = result.records_written,
            commits = result.commits,
            "Sync complete"
        );

        Ok(result)
    }

    /// Normalize one day folder with every registered normalizer.
    pub fn normalize_day(&self, day: &DayArchive) -> Result<RecordBatch> {
        let mut batch = RecordBatch::default();
        for normalizer in &self.normalizers {
            let part = normalizer.normalize(day)?;
            tracing::debug!(
                date = %day.date(),
                normalizer = normalizer.name(),
                files = ?normalizer.source_files(),
                records = part.len(),
                "Normalizer finished"
            );
            batch.extend(part);
        }
        Ok(batch)
    }

    /// Open every candidate and keep the complete ones, applying the
    /// incomplete-day policy to the rest.
    fn gate(&self, candidates: &[CandidateDay], result: &mut SyncResult) -> Result<Vec<DayArchive>> {
        let mut ready = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let archive = DayArchive::open(&candidate.path)?;
            match archive.check_completeness()? {
                Completeness::Complete => ready.push(archive),
                Completeness::Incomplete { missing } => match self.policy.on_incomplete {
                    IncompletePolicy::Abort => {
                        return Err(Error::IncompleteDay {
                            date: candidate.date,
                            missing,
                        })
                    }
                    IncompletePolicy::Skip => {
                        tracing::warn!(
                            date = %candidate.date,
                            missing = %missing.join(", "),
                            "Skipping incomplete day"
                        );
                        result.days_skipped.push(SkippedDay {
                            date: candidate.date,
                            missing,
                        });
                    }
                },
            }
        }

        Ok(ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ACTIVITIES_FILE, HEART_RATE_FILE, SLEEP_FILE};
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Sink that records the size of every committed batch.
    #[derive(Default)]
    struct RecordingSink {
        latest: Option<NaiveDateTime>,
        commits: RefCell<Vec<usize>>,
    }

    impl RecordSink for RecordingSink {
        fn latest_heart_rate_timestamp(&self) -> Result<Option<NaiveDateTime>> {
            Ok(self.latest)
        }

        fn write_batch(&self, batch: &RecordBatch) -> Result<usize> {
            self.commits.borrow_mut().push(batch.len());
            Ok(batch.len())
        }
    }

    fn write_day(root: &Path, date: &str, sleep: &str) {
        let dir = root.join(date);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(HEART_RATE_FILE),
            format!(
                r#"{{"activities-heart":[{{"dateTime":"{}","value":{{"restingHeartRate":61,"heartRateZones":[]}}}}],
                    "activities-heart-intraday":{{"dataset":[{{"time":"08:00:00","value":70}},{{"time":"08:00:01","value":71}}]}}}}"#,
                date
            ),
        )
        .unwrap();
        fs::write(
            dir.join(ACTIVITIES_FILE),
            r#"{"activities":[],"summary":{"steps":100,"sedentaryMinutes":1,"lightlyActiveMinutes":2,
                "fairlyActiveMinutes":3,"veryActiveMinutes":4}}"#,
        )
        .unwrap();
        fs::write(dir.join(SLEEP_FILE), sleep).unwrap();
    }

    fn archive(root: &Path) -> ArchiveConfig {
        ArchiveConfig {
            root: root.to_path_buf(),
            start_date: NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
        }
    }

    fn policy(commit: CommitMode, on_incomplete: IncompletePolicy) -> IngestConfig {
        IngestConfig {
            commit,
            on_incomplete,
        }
    }

    const NO_SLEEP: &str = r#"{"sleep":[]}"#;

    #[test]
    fn test_sync_result_default() {
        let result = SyncResult::default();
        assert_eq!(result.days_processed, 0);
        assert_eq!(result.records_written, 0);
        assert!(result.days_skipped.is_empty());
    }

    #[test]
    fn test_run_mode_commits_once() {
        crate::logging::init_test();
        let temp = TempDir::new().unwrap();
        write_day(temp.path(), "2021-05-10", NO_SLEEP);
        write_day(temp.path(), "2021-05-11", NO_SLEEP);

        let coordinator = IngestCoordinator::new(
            RecordingSink::default(),
            archive(temp.path()),
            IngestConfig::default(),
        );
        let result = coordinator.sync_all().unwrap();

        assert_eq!(result.days_processed, 2);
        assert_eq!(result.commits, 1);
        // 1 HR summary + 2 samples + 1 daily activity summary per day
        assert_eq!(*coordinator.sink().commits.borrow(), vec![8]);
        assert_eq!(result.records_written, 8);
        assert_eq!(result.days[0].date, NaiveDate::from_ymd_opt(2021, 5, 11).unwrap());
    }

    #[test]
    fn test_day_mode_commits_per_day() {
        let temp = TempDir::new().unwrap();
        write_day(temp.path(), "2021-05-10", NO_SLEEP);
        write_day(temp.path(), "2021-05-11", NO_SLEEP);

        let coordinator = IngestCoordinator::new(
            RecordingSink::default(),
            archive(temp.path()),
            policy(CommitMode::Day, IncompletePolicy::Abort),
        );
        let result = coordinator.sync_all().unwrap();

        assert_eq!(result.commits, 2);
        assert_eq!(*coordinator.sink().commits.borrow(), vec![4, 4]);
    }

    #[test]
    fn test_incomplete_day_aborts_before_write() {
        let temp = TempDir::new().unwrap();
        write_day(temp.path(), "2021-05-10", NO_SLEEP);
        fs::create_dir_all(temp.path().join("2021-05-11")).unwrap();

        let coordinator = IngestCoordinator::new(
            RecordingSink::default(),
            archive(temp.path()),
            policy(CommitMode::Day, IncompletePolicy::Abort),
        );
        let err = coordinator.sync_all().unwrap_err();

        assert!(matches!(err, Error::IncompleteDay { .. }));
        assert!(coordinator.sink().commits.borrow().is_empty());
    }

    #[test]
    fn test_incomplete_day_skipped() {
        let temp = TempDir::new().unwrap();
        write_day(temp.path(), "2021-05-10", NO_SLEEP);
        fs::create_dir_all(temp.path().join("2021-05-11")).unwrap();

        let coordinator = IngestCoordinator::new(
            RecordingSink::default(),
            archive(temp.path()),
            policy(CommitMode::Run, IncompletePolicy::Skip),
        );
        let result = coordinator.sync_all().unwrap();

        assert_eq!(result.days_processed, 1);
        assert_eq!(result.days_skipped.len(), 1);
        assert_eq!(result.days_skipped[0].missing.len(), 3);
    }

    #[test]
    fn test_schema_violation_aborts_run_without_write() {
        let temp = TempDir::new().unwrap();
        write_day(temp.path(), "2021-05-10", NO_SLEEP);
        write_day(
            temp.path(),
            "2021-05-11",
            r#"{"sleep":[{"dateOfSleep":"2021-05-11","type":"nap","levels":{"data":[]}}]}"#,
        );

        let coordinator = IngestCoordinator::new(
            RecordingSink::default(),
            archive(temp.path()),
            IngestConfig::default(),
        );
        let err = coordinator.sync_all().unwrap_err();

        assert!(matches!(err, Error::SchemaViolation { .. }));
        assert!(coordinator.sink().commits.borrow().is_empty());
    }

    #[test]
    fn test_resume_point_limits_candidates() {
        let temp = TempDir::new().unwrap();
        write_day(temp.path(), "2021-05-09", NO_SLEEP);
        write_day(temp.path(), "2021-05-10", NO_SLEEP);

        let sink = RecordingSink {
            latest: NaiveDate::from_ymd_opt(2021, 5, 10)
                .unwrap()
                .and_hms_opt(8, 0, 1),
            ..RecordingSink::default()
        };
        let coordinator = IngestCoordinator::new(sink, archive(temp.path()), IngestConfig::default());
        let result = coordinator.sync_all().unwrap();

        assert_eq!(result.days_processed, 1);
        assert_eq!(result.days[0].date, NaiveDate::from_ymd_opt(2021, 5, 10).unwrap());
    }

    #[test]
    fn test_plan_reports_completeness() {
        let temp = TempDir::new().unwrap();
        write_day(temp.path(), "2021-05-10", NO_SLEEP);
        fs::create_dir_all(temp.path().join("2021-05-11")).unwrap();

        let coordinator = IngestCoordinator::new(
            RecordingSink::default(),
            archive(temp.path()),
            IngestConfig::default(),
        );
        let plan = coordinator.plan().unwrap();

        assert_eq!(plan.days.len(), 2);
        assert!(!plan.days[0].completeness.is_complete());
        assert!(plan.days[1].completeness.is_complete());
        assert!(coordinator.sink().commits.borrow().is_empty());
    }

    #[test]
    fn test_progress_callback() {
        let temp = TempDir::new().unwrap();
        write_day(temp.path(), "2021-05-10", NO_SLEEP);
        write_day(temp.path(), "2021-05-11", NO_SLEEP);

        let coordinator = IngestCoordinator::new(
            RecordingSink::default(),
            archive(temp.path()),
            IngestConfig::default(),
        );
        let mut seen = Vec::new();
        coordinator
            .sync_all_with_progress(|i, total, path| seen.push((i, total, path.to_path_buf())))
            .unwrap();

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (0, 2, temp.path().join("2021-05-11")));
    }
}
