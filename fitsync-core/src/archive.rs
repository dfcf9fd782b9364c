//! Raw day archive
//!
//! The archive root holds one folder per calendar day:
//!
//! ```text
//! <root>/
//! ├── 2021-05-10/
//! │   ├── intra-day-heart-rate-series.json
//! │   ├── activities.json
//! │   ├── sleep.json
//! │   ├── 40123456789.xml        # one TCX file per logged activity
//! │   └── ...
//! └── 2021-05-11/
//! ```
//!
//! A folder is only handed to the normalizers once it is complete: every
//! fixed file is present and every activity listed in `activities.json`
//! has its track file.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Intraday heart-rate series (1-second resolution).
pub const HEART_RATE_FILE: &str = "intra-day-heart-rate-series.json";
/// Daily activity summary and list of logged activities.
pub const ACTIVITIES_FILE: &str = "activities.json";
/// Sleep records for the day.
pub const SLEEP_FILE: &str = "sleep.json";

/// Files every day folder must contain regardless of activities.
pub const FIXED_FILES: [&str; 3] = [HEART_RATE_FILE, ACTIVITIES_FILE, SLEEP_FILE];

/// Folder name format for a day.
pub const DAY_FOLDER_FORMAT: &str = "%Y-%m-%d";

/// Name of the track file for an activity log id.
pub fn track_file_name(log_id: i64) -> String {
    format!("{}.xml", log_id)
}

/// Parse a day folder name (`YYYY-MM-DD`).
pub fn parse_day_folder_name(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, DAY_FOLDER_FORMAT).ok()
}

/// Outcome of the completeness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    Incomplete { missing: Vec<String> },
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }
}

/// Only the log ids are needed to derive track file names.
#[derive(Debug, Deserialize)]
struct ActivityListing {
    activities: Vec<ActivityId>,
}

#[derive(Debug, Deserialize)]
struct ActivityId {
    #[serde(rename = "logId")]
    log_id: i64,
}

/// One calendar day of raw exports.
#[derive(Debug, Clone)]
pub struct DayArchive {
    date: NaiveDate,
    path: PathBuf,
    files: BTreeSet<String>,
}

impl DayArchive {
    /// Open a day folder, listing the regular files it contains.
    ///
    /// The folder name must be a `YYYY-MM-DD` date.
    pub fn open(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::timestamp(path.display().to_string()))?;
        let date = parse_day_folder_name(name).ok_or_else(|| Error::timestamp(name))?;

        let mut files = BTreeSet::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(file_name) = entry.file_name().to_str() {
                    files.insert(file_name.to_string());
                }
            }
        }

        Ok(Self {
            date,
            path: path.to_path_buf(),
            files,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the files present in the folder.
    pub fn files(&self) -> &BTreeSet<String> {
        &self.files
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.files.contains(file_name)
    }

    /// Path of a file inside the folder, failing if the listing lacks it.
    pub fn file_path(&self, file_name: &str) -> Result<PathBuf> {
        let path = self.path.join(file_name);
        if !self.contains(file_name) {
            return Err(Error::MissingFile { path });
        }
        Ok(path)
    }

    /// Read a file of the folder as a string.
    pub fn read_to_string(&self, file_name: &str) -> Result<String> {
        let path = self.file_path(file_name)?;
        Ok(std::fs::read_to_string(path)?)
    }

    /// Log ids of the activities listed in `activities.json`.
    pub fn activity_log_ids(&self) -> Result<Vec<i64>> {
        let content = self.read_to_string(ACTIVITIES_FILE)?;
        let listing: ActivityListing = serde_json::from_str(&content)?;
        Ok(listing.activities.into_iter().map(|a| a.log_id).collect())
    }

    /// Every file name the folder needs before it can be normalized.
    pub fn required_files(&self) -> Result<Vec<String>> {
        let mut required: Vec<String> = FIXED_FILES.iter().map(|f| f.to_string()).collect();
        required.extend(self.activity_log_ids()?.into_iter().map(track_file_name));
        Ok(required)
    }

    /// Decide whether the folder is fully downloaded.
    ///
    /// Track files are only looked up by name; their content is not read.
    pub fn check_completeness(&self) -> Result<Completeness> {
        // Without the activity list the track files cannot be derived.
        if !self.contains(ACTIVITIES_FILE) {
            let missing = FIXED_FILES
                .iter()
                .filter(|f| !self.contains(f))
                .map(|f| f.to_string())
                .collect();
            return Ok(Completeness::Incomplete { missing });
        }

        let missing: Vec<String> = self
            .required_files()?
            .into_iter()
            .filter(|f| !self.contains(f))
            .collect();

        if missing.is_empty() {
            Ok(Completeness::Complete)
        } else {
            Ok(Completeness::Incomplete { missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TWO_ACTIVITIES: &str = r#"{"activities":[{"logId":111},{"logId":222}],"summary":{}}"#;

    fn day_dir(temp: &TempDir, files: &[(&str, &str)]) -> PathBuf {
        let dir = temp.path().join("2021-05-10");
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        dir
    }

    fn all_files() -> Vec<(&'static str, &'static str)> {
        vec![
            (HEART_RATE_FILE, "{}"),
            (ACTIVITIES_FILE, TWO_ACTIVITIES),
            (SLEEP_FILE, "{}"),
            ("111.xml", "<x/>"),
            ("222.xml", "<x/>"),
        ]
    }

    #[test]
    fn test_complete_folder() {
        let temp = TempDir::new().unwrap();
        let dir = day_dir(&temp, &all_files());
        let day = DayArchive::open(&dir).unwrap();

        assert_eq!(day.date(), NaiveDate::from_ymd_opt(2021, 5, 10).unwrap());
        assert_eq!(day.required_files().unwrap().len(), 5);
        assert!(day.check_completeness().unwrap().is_complete());
    }

    #[test]
    fn test_missing_any_required_file_is_incomplete() {
        for skipped in 0..all_files().len() {
            let temp = TempDir::new().unwrap();
            let files: Vec<_> = all_files()
                .into_iter()
                .enumerate()
                .filter(|(i, _)| *i != skipped)
                .map(|(_, f)| f)
                .collect();
            let dir = day_dir(&temp, &files);
            let day = DayArchive::open(&dir).unwrap();

            let verdict = day.check_completeness().unwrap();
            assert!(!verdict.is_complete(), "skipping file #{} must fail", skipped);
        }
    }

    #[test]
    fn test_missing_track_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let files: Vec<_> = all_files()
            .into_iter()
            .filter(|(name, _)| *name != "222.xml")
            .collect();
        let dir = day_dir(&temp, &files);
        let day = DayArchive::open(&dir).unwrap();

        assert_eq!(
            day.check_completeness().unwrap(),
            Completeness::Incomplete {
                missing: vec!["222.xml".to_string()]
            }
        );
    }

    #[test]
    fn test_missing_files_follow_required_order() {
        let temp = TempDir::new().unwrap();
        let dir = day_dir(&temp, &[(ACTIVITIES_FILE, TWO_ACTIVITIES), ("111.xml", "<x/>")]);
        let day = DayArchive::open(&dir).unwrap();

        let expected: Vec<String> = day
            .required_files()
            .unwrap()
            .into_iter()
            .filter(|f| f != ACTIVITIES_FILE && f != "111.xml")
            .collect();
        assert_eq!(expected, vec![HEART_RATE_FILE, SLEEP_FILE, "222.xml"]);
        assert_eq!(
            day.check_completeness().unwrap(),
            Completeness::Incomplete { missing: expected }
        );
    }

    #[test]
    fn test_extra_file_does_not_change_verdict() {
        let temp = TempDir::new().unwrap();
        let mut files = all_files();
        files.push(("notes.txt", "hello"));
        let dir = day_dir(&temp, &files);
        let day = DayArchive::open(&dir).unwrap();
        assert!(day.check_completeness().unwrap().is_complete());
    }

    #[test]
    fn test_missing_activity_list_short_circuits() {
        let temp = TempDir::new().unwrap();
        let dir = day_dir(&temp, &[(HEART_RATE_FILE, "{}"), (SLEEP_FILE, "{}")]);
        let day = DayArchive::open(&dir).unwrap();

        assert_eq!(
            day.check_completeness().unwrap(),
            Completeness::Incomplete {
                missing: vec![ACTIVITIES_FILE.to_string()]
            }
        );
    }

    #[test]
    fn test_subdirectories_are_not_files() {
        let temp = TempDir::new().unwrap();
        let dir = day_dir(&temp, &[(HEART_RATE_FILE, "{}")]);
        fs::create_dir_all(dir.join(SLEEP_FILE)).unwrap();
        let day = DayArchive::open(&dir).unwrap();
        assert!(!day.contains(SLEEP_FILE));
    }

    #[test]
    fn test_file_path_of_absent_file() {
        let temp = TempDir::new().unwrap();
        let dir = day_dir(&temp, &[]);
        let day = DayArchive::open(&dir).unwrap();
        assert!(matches!(
            day.file_path(SLEEP_FILE),
            Err(Error::MissingFile { .. })
        ));
    }

    #[test]
    fn test_open_rejects_non_date_folder() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("downloads");
        fs::create_dir_all(&dir).unwrap();
        assert!(DayArchive::open(&dir).is_err());
    }
}
