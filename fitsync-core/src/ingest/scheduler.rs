//! Incremental scheduling of day folders
//!
//! The resume point is the newest heart-rate sample already in the sink.
//! Every day folder on or after that calendar day is a candidate, so the
//! last (possibly partial) day is always normalized again. Re-writing it
//! is harmless because the sink replaces records on key collision.

use crate::archive::parse_day_folder_name;
use crate::config::ArchiveConfig;
use crate::error::{Error, Result};
use crate::ingest::RecordSink;
use crate::types::day_start;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

/// Glob for folder names shaped like `YYYY-MM-DD`.
const DAY_FOLDER_GLOB: &str = "[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]";

/// A day folder selected for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDay {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Picks the day folders a run has to process.
#[derive(Debug, Clone)]
pub struct Scheduler {
    archive: ArchiveConfig,
}

impl Scheduler {
    pub fn new(archive: ArchiveConfig) -> Self {
        Self { archive }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive.root
    }

    /// Where this run starts: the newest persisted heart-rate sample, or
    /// the configured start date at midnight for an empty sink.
    pub fn resume_point<S: RecordSink + ?Sized>(&self, sink: &S) -> Result<NaiveDateTime> {
        match sink.latest_heart_rate_timestamp()? {
            Some(latest) => {
                tracing::debug!(%latest, "Resuming from latest heart rate sample");
                Ok(latest)
            }
            None => {
                let start = day_start(self.archive.start_date);
                tracing::debug!(%start, "Sink is empty, starting from configured date");
                Ok(start)
            }
        }
    }

    /// Day folders whose date is on or after the resume point's date,
    /// newest first.
    pub fn candidate_days(&self, resume_point: NaiveDateTime) -> Result<Vec<CandidateDay>> {
        let root = &self.archive.root;
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "archive root {} is not a directory",
                root.display()
            )));
        }

        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&root.to_string_lossy()),
            DAY_FOLDER_GLOB
        );
        let entries = glob::glob(&pattern)
            .map_err(|e| Error::Config(format!("invalid archive glob pattern: {}", e)))?;

        let since = resume_point.date();
        let mut days = Vec::new();

        for path in entries.flatten() {
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(date) = parse_day_folder_name(name) else {
                tracing::warn!(folder = %path.display(), "Ignoring folder with invalid date name");
                continue;
            };
            if date >= since {
                days.push(CandidateDay { date, path });
            }
        }

        days.sort_by(|a, b| b.date.cmp(&a.date));

        tracing::info!(
            root = %root.display(),
            since = %since,
            count = days.len(),
            "Selected candidate days"
        );

        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordBatch;
    use std::fs;
    use tempfile::TempDir;

    struct FixedSink(Option<NaiveDateTime>);

    impl RecordSink for FixedSink {
        fn latest_heart_rate_timestamp(&self) -> Result<Option<NaiveDateTime>> {
            Ok(self.0)
        }

        fn write_batch(&self, batch: &RecordBatch) -> Result<usize> {
            Ok(batch.len())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn scheduler(root: &Path) -> Scheduler {
        Scheduler::new(ArchiveConfig {
            root: root.to_path_buf(),
            start_date: date(2021, 5, 1),
        })
    }

    fn archive_with(folders: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for folder in folders {
            fs::create_dir_all(temp.path().join(folder)).unwrap();
        }
        temp
    }

    #[test]
    fn test_resume_point_from_sink() {
        let temp = archive_with(&[]);
        let latest = date(2021, 5, 10).and_hms_opt(13, 45, 2).unwrap();
        let resume = scheduler(temp.path())
            .resume_point(&FixedSink(Some(latest)))
            .unwrap();
        assert_eq!(resume, latest);
    }

    #[test]
    fn test_resume_point_empty_sink() {
        let temp = archive_with(&[]);
        let resume = scheduler(temp.path())
            .resume_point(&FixedSink(None))
            .unwrap();
        assert_eq!(resume, day_start(date(2021, 5, 1)));
    }

    #[test]
    fn test_candidates_inclusive_of_resume_day() {
        let temp = archive_with(&["2021-05-08", "2021-05-09", "2021-05-10", "2021-05-11"]);
        let resume = date(2021, 5, 10).and_hms_opt(23, 59, 59).unwrap();

        let days = scheduler(temp.path()).candidate_days(resume).unwrap();
        let dates: Vec<_> = days.iter().map(|d| d.date).collect();

        assert_eq!(dates, vec![date(2021, 5, 11), date(2021, 5, 10)]);
        assert_eq!(days[0].path, temp.path().join("2021-05-11"));
    }

    #[test]
    fn test_candidates_ignore_other_entries() {
        let temp = archive_with(&["2021-05-10", "2021-13-40", "notes", "2021-5-11"]);
        fs::write(temp.path().join("2021-05-12"), "not a folder").unwrap();

        let days = scheduler(temp.path())
            .candidate_days(day_start(date(2021, 1, 1)))
            .unwrap();
        let dates: Vec<_> = days.iter().map(|d| d.date).collect();

        assert_eq!(dates, vec![date(2021, 5, 10)]);
    }

    #[test]
    fn test_missing_root() {
        let temp = archive_with(&[]);
        let missing = temp.path().join("nope");
        let err = scheduler(&missing)
            .candidate_days(day_start(date(2021, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
