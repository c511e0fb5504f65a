//! Integration tests for persisted statistics.
//!
//! These tests verify the statistics file across organizer runs:
//! - Absent, corrupt and invalid files load as zero
//! - Files written by older releases are still read, current keys first
//! - A held lock defers flushing without losing counts

use assert_fs::prelude::*;
use assert_fs::TempDir;
use photo_organizer::core::pipeline::Organizer;
use photo_organizer::core::stats::{
    FlushOutcome, FlushPolicy, LockMode, StatisticsRecord, StatisticsStore, StatsLock,
    STATS_FILE_NAME,
};
use predicates::prelude::*;
use std::time::Duration;

fn organizer(source: &TempDir, root: &TempDir) -> Organizer {
    Organizer::builder()
        .source(source.path())
        .destination(root.path())
        .flush_policy(FlushPolicy {
            every_ops: 1,
            interval: Duration::from_secs(30),
            lock_timeout: Duration::from_millis(50),
        })
        .build()
        .unwrap()
}

#[test]
fn missing_statistics_file_starts_at_zero() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();

    let organizer = organizer(&source, &root);

    assert_eq!(organizer.statistics(), StatisticsRecord::default());
    root.child(STATS_FILE_NAME).assert(predicate::path::missing());
}

#[test]
fn corrupt_statistics_file_starts_at_zero() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    root.child(STATS_FILE_NAME)
        .write_str("{\"files_moved\": 3, \"bytes_mo")
        .unwrap();

    let organizer = organizer(&source, &root);

    assert_eq!(organizer.statistics(), StatisticsRecord::default());
}

#[test]
fn negative_counters_are_rejected() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    root.child(STATS_FILE_NAME)
        .write_str(r#"{"files_moved": -1, "bytes_moved": 100}"#)
        .unwrap();

    let organizer = organizer(&source, &root);

    assert_eq!(organizer.statistics(), StatisticsRecord::default());
}

#[test]
fn legacy_field_names_are_read() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    root.child(STATS_FILE_NAME)
        .write_str(
            r#"{
                "files_moved_to_destination": 12,
                "bytes_moved_to_destination": 1200,
                "files_moved_to_duplicates": 2,
                "bytes_moved_to_duplicates": 200,
                "files_deleted": 1,
                "bytes_deleted": 100
            }"#,
        )
        .unwrap();

    let mut organizer = organizer(&source, &root);
    let expected = StatisticsRecord {
        files_moved: 12,
        bytes_moved: 1200,
        files_duplicated: 2,
        bytes_duplicated: 200,
        files_deleted: 1,
        bytes_deleted: 100,
    };
    assert_eq!(organizer.statistics(), expected);

    assert_eq!(organizer.flush_now(), FlushOutcome::Written);
    root.child(STATS_FILE_NAME)
        .assert(predicate::str::contains("\"files_duplicated\": 2"));
    let written = std::fs::read_to_string(root.child(STATS_FILE_NAME).path()).unwrap();
    assert!(!written.contains("moved_to_destination"));
}

#[test]
fn file_with_both_key_generations_keeps_its_totals() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    root.child(STATS_FILE_NAME)
        .write_str(
            r#"{
                "files_moved": 20,
                "bytes_moved": 2000,
                "files_moved_to_destination": 12,
                "files_duplicated": 3,
                "bytes_deleted": 100
            }"#,
        )
        .unwrap();

    let organizer = organizer(&source, &root);

    let stats = organizer.statistics();
    assert_eq!((stats.files_moved, stats.bytes_moved), (20, 2000));
    assert_eq!(stats.files_duplicated, 3);
    assert_eq!(stats.bytes_deleted, 100);
}

#[test]
fn held_lock_defers_flush_until_released() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut organizer = organizer(&source, &root);
    let stats_path = StatisticsStore::path_in(organizer.destination());

    let holder = StatsLock::acquire(
        &StatsLock::path_for(&stats_path),
        LockMode::Exclusive,
        Duration::from_millis(50),
    )
    .unwrap()
    .expect("lock is free");

    let photo = source.child("notes.txt");
    photo.write_str("kept in memory").unwrap();
    organizer.process(photo.path());

    root.child(STATS_FILE_NAME).assert(predicate::path::missing());
    assert_eq!(organizer.statistics().files_moved, 1);

    drop(holder);
    assert_eq!(organizer.maybe_flush(), FlushOutcome::Written);

    let persisted = StatisticsStore::read(&stats_path).unwrap().unwrap();
    assert_eq!(persisted.files_moved, 1);
    assert_eq!(persisted.bytes_moved, 14);
}

#[test]
fn totals_accumulate_across_runs() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();

    for (run, name) in ["first.txt", "second.txt"].iter().enumerate() {
        let mut organizer = organizer(&source, &root);
        assert_eq!(organizer.statistics().files_moved, run as u64);

        let file = source.child(*name);
        file.write_str("abc").unwrap();
        organizer.process(file.path());
        organizer.shutdown();
    }

    let persisted = StatisticsStore::read(&root.path().join(STATS_FILE_NAME))
        .unwrap()
        .unwrap();
    assert_eq!(persisted.files_moved, 2);
    assert_eq!(persisted.bytes_moved, 6);
    assert!(persisted.last_updated.is_some());
}
