//! Integration tests for the fitsync ingestion pipeline
//!
//! These tests use the fixture archive in `tests/fixtures/archive/` to
//! verify the end-to-end normalization and database storage flow:
//!
//! - `2021-05-09`: classic sleep, no logged activities, sparse heart-rate zones
//! - `2021-05-10`: stages sleep with a short wake, one bike ride with a track

use chrono::{NaiveDate, NaiveDateTime};
use fitsync_core::config::{ArchiveConfig, CommitMode, IncompletePolicy, IngestConfig};
use fitsync_core::db::Database;
use fitsync_core::ingest::IngestCoordinator;
use fitsync_core::types::{ActivityType, SleepStage};
use fitsync_core::{Error, RecordSink};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the path to the fixture archive
fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/archive")
}

/// Copy the fixture archive so a test can modify it
fn copy_archive(dest: &Path) {
    for day in fs::read_dir(fixture_root()).unwrap() {
        let day = day.unwrap().path();
        let target = dest.join(day.file_name().unwrap());
        fs::create_dir_all(&target).unwrap();
        for file in fs::read_dir(&day).unwrap() {
            let file = file.unwrap().path();
            fs::copy(&file, target.join(file.file_name().unwrap())).unwrap();
        }
    }
}

fn archive_config(root: &Path) -> ArchiveConfig {
    ArchiveConfig {
        root: root.to_path_buf(),
        start_date: date(2021, 5, 1),
    }
}

fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    db
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    date(2021, 5, d).and_hms_opt(h, m, s).unwrap()
}

fn total_rows(db: &Database) -> i64 {
    db.table_counts().unwrap().iter().map(|(_, n)| n).sum()
}

// ============================================
// End-to-end
// ============================================

#[test]
fn test_sync_fixture_archive() {
    let coordinator = IngestCoordinator::new(
        test_db(),
        archive_config(&fixture_root()),
        IngestConfig::default(),
    );

    let result = coordinator.sync_all().expect("sync should succeed");

    assert_eq!(result.days_processed, 2);
    assert_eq!(result.commits, 1);
    assert!(result.days_skipped.is_empty());
    assert_eq!(result.resume_point, Some(at(1, 0, 0, 0)));
    // Newest day first
    assert_eq!(result.days[0].date, date(2021, 5, 10));
    assert_eq!(result.days[0].track_points, 3);

    let db = coordinator.sink();
    let counts = db.table_counts().unwrap();
    assert_eq!(
        counts,
        vec![
            ("heart_rate", 8),
            ("heart_rate_summary", 2),
            ("sleep_classic_info", 5),
            ("sleep_stages_info", 9),
            ("sleep_summary", 2),
            ("daily_activity_summary", 2),
            ("activity_summary", 1),
            ("activity_track_point", 3),
        ]
    );
    assert_eq!(result.records_written as i64, total_rows(db));
}

#[test]
fn test_heart_rate_sentinels_persisted() {
    let coordinator = IngestCoordinator::new(
        test_db(),
        archive_config(&fixture_root()),
        IngestConfig::default(),
    );
    coordinator.sync_all().unwrap();

    let summary = coordinator
        .sink()
        .get_heart_rate_summary(date(2021, 5, 9))
        .unwrap()
        .expect("summary for 2021-05-09");
    assert_eq!(summary.resting_heart_rate, -1);
    assert_eq!(summary.out_of_range, 1410);
    assert_eq!(summary.fat_burn, 30);
    assert_eq!(summary.cardio, -1);
    assert_eq!(summary.peak, -1);

    let summary = coordinator
        .sink()
        .get_heart_rate_summary(date(2021, 5, 10))
        .unwrap()
        .unwrap();
    assert_eq!(summary.resting_heart_rate, 58);
    assert_eq!(summary.peak, 0);
}

#[test]
fn test_short_wake_persisted_over_light() {
    let coordinator = IngestCoordinator::new(
        test_db(),
        archive_config(&fixture_root()),
        IngestConfig::default(),
    );
    coordinator.sync_all().unwrap();

    let db = coordinator.sink();
    let night = db.get_sleep_stages(at(9, 23, 0, 0), at(9, 23, 2, 0)).unwrap();
    let stages: Vec<_> = night.iter().map(|s| s.stage).collect();
    assert_eq!(
        stages,
        vec![
            SleepStage::Light,
            SleepStage::Light,
            SleepStage::Wake,
            SleepStage::Light
        ]
    );

    let summary = db.get_sleep_summary(date(2021, 5, 10)).unwrap().unwrap();
    assert_eq!(summary.main_sleep_start, Some(at(9, 23, 0, 0)));
    assert_eq!(summary.main_sleep_end, Some(at(9, 23, 4, 30)));
    assert_eq!(summary.stage_light_duration, Some(2));

    // Classic days carry no stage minutes
    let classic = db.get_sleep_summary(date(2021, 5, 9)).unwrap().unwrap();
    assert_eq!(classic.total_sleep_time, Some(1));
    assert_eq!(classic.stage_deep_duration, None);
}

#[test]
fn test_activity_and_track_persisted() {
    let coordinator = IngestCoordinator::new(
        test_db(),
        archive_config(&fixture_root()),
        IngestConfig::default(),
    );
    coordinator.sync_all().unwrap();

    let db = coordinator.sink();
    let activity = db.get_activity_summary(40123456789).unwrap().unwrap();
    assert_eq!(activity.activity_type, ActivityType::OutdoorBike);
    assert_eq!(activity.time_stamp, at(10, 7, 30, 0));
    assert!((activity.distance - 12400.0).abs() < 1e-6);
    assert_eq!(activity.duration, 2700);

    let points = db.get_track_points(40123456789).unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points[1].time_stamp, at(10, 7, 30, 1));
    // The sub-second point replaced the whole-second one
    assert_eq!(points[1].heart_rate, Some(101));
    assert_eq!(points[1].distance, Some(7.9));
    assert_eq!(points[2].position, None);
    assert_eq!(points[2].heart_rate, None);
}

// ============================================
// Incremental runs
// ============================================

#[test]
fn test_second_run_resumes_from_latest_sample() {
    let coordinator = IngestCoordinator::new(
        test_db(),
        archive_config(&fixture_root()),
        IngestConfig::default(),
    );
    coordinator.sync_all().unwrap();
    let before = coordinator.sink().table_counts().unwrap();

    let result = coordinator.sync_all().unwrap();

    assert_eq!(result.resume_point, Some(at(10, 6, 0, 4)));
    assert_eq!(result.days_processed, 1);
    assert_eq!(result.days[0].date, date(2021, 5, 10));
    assert_eq!(coordinator.sink().table_counts().unwrap(), before);
}

#[test]
fn test_day_commit_mode_on_disk() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("data").join("fitsync.db");

    let db = Database::open(&db_path).unwrap();
    db.migrate().unwrap();
    let coordinator = IngestCoordinator::new(
        db,
        archive_config(&fixture_root()),
        IngestConfig {
            commit: CommitMode::Day,
            on_incomplete: IncompletePolicy::Abort,
        },
    );
    let result = coordinator.sync_all().unwrap();
    assert_eq!(result.commits, 2);
    drop(coordinator);

    let reopened = Database::open(&db_path).unwrap();
    reopened.migrate().unwrap();
    assert_eq!(reopened.count_rows("heart_rate").unwrap(), 8);
    assert_eq!(
        reopened.latest_heart_rate_timestamp().unwrap(),
        Some(at(10, 6, 0, 4))
    );
}

// ============================================
// Failure modes
// ============================================

#[test]
fn test_two_sleep_dates_abort_without_writes() {
    let temp = TempDir::new().unwrap();
    copy_archive(temp.path());
    fs::write(
        temp.path().join("2021-05-10/sleep.json"),
        r#"{"sleep":[
            {"dateOfSleep":"2021-05-10","type":"stages","levels":{"data":[]}},
            {"dateOfSleep":"2021-05-11","type":"stages","levels":{"data":[]}}
        ]}"#,
    )
    .unwrap();

    let coordinator = IngestCoordinator::new(
        test_db(),
        archive_config(temp.path()),
        IngestConfig::default(),
    );
    let err = coordinator.sync_all().unwrap_err();

    assert!(matches!(err, Error::SchemaViolation { .. }));
    assert_eq!(total_rows(coordinator.sink()), 0);
}

#[test]
fn test_missing_track_file_aborts() {
    let temp = TempDir::new().unwrap();
    copy_archive(temp.path());
    fs::remove_file(temp.path().join("2021-05-10/40123456789.xml")).unwrap();

    let coordinator = IngestCoordinator::new(
        test_db(),
        archive_config(temp.path()),
        IngestConfig::default(),
    );
    match coordinator.sync_all() {
        Err(Error::IncompleteDay { date: day, missing }) => {
            assert_eq!(day, date(2021, 5, 10));
            assert_eq!(missing, vec!["40123456789.xml".to_string()]);
        }
        other => panic!("expected IncompleteDay, got {:?}", other),
    }
    assert_eq!(total_rows(coordinator.sink()), 0);
}

#[test]
fn test_missing_track_file_skipped() {
    let temp = TempDir::new().unwrap();
    copy_archive(temp.path());
    fs::remove_file(temp.path().join("2021-05-10/40123456789.xml")).unwrap();

    let coordinator = IngestCoordinator::new(
        test_db(),
        archive_config(temp.path()),
        IngestConfig {
            commit: CommitMode::Run,
            on_incomplete: IncompletePolicy::Skip,
        },
    );
    let result = coordinator.sync_all().unwrap();

    assert_eq!(result.days_processed, 1);
    assert_eq!(result.days_skipped.len(), 1);
    assert_eq!(result.days_skipped[0].date, date(2021, 5, 10));
    assert_eq!(coordinator.sink().count_rows("heart_rate").unwrap(), 3);
    assert_eq!(coordinator.sink().count_rows("activity_summary").unwrap(), 0);
}

#[test]
fn test_plan_lists_candidates_without_writing() {
    let temp = TempDir::new().unwrap();
    copy_archive(temp.path());
    fs::create_dir_all(temp.path().join("2021-05-11")).unwrap();
    fs::create_dir_all(temp.path().join("2021-04-30")).unwrap();

    let coordinator = IngestCoordinator::new(
        test_db(),
        archive_config(temp.path()),
        IngestConfig::default(),
    );
    let plan = coordinator.plan().unwrap();

    let dates: Vec<_> = plan.days.iter().map(|d| d.date).collect();
    assert_eq!(
        dates,
        vec![date(2021, 5, 11), date(2021, 5, 10), date(2021, 5, 9)]
    );
    assert!(!plan.days[0].completeness.is_complete());
    assert!(plan.days[1].completeness.is_complete());
    assert_eq!(total_rows(coordinator.sink()), 0);
}
