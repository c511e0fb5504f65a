//! Integration tests for the organizer.
//!
//! These tests drive whole candidates through classification, duplicate
//! resolution, file operations and statistics:
//! - Filing by capture date
//! - Identical and conflicting duplicates
//! - Keep-oldest displacement
//! - Restart behaviour

use assert_fs::prelude::*;
use assert_fs::TempDir;
use chrono::{NaiveDate, NaiveDateTime};
use photo_organizer::core::classifier::ClassifierConfig;
use photo_organizer::core::media::MediaKind;
use photo_organizer::core::metadata::{CaptureTime, DateSource, MetadataProbe};
use photo_organizer::core::pipeline::{Organizer, ProcessOutcome};
use photo_organizer::core::resolver::ConflictPolicy;
use photo_organizer::core::stats::StatisticsRecord;
use predicates::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Reports the same capture time for every photo or video
struct FixedProbe(NaiveDateTime);

impl MetadataProbe for FixedProbe {
    fn capture_time(&self, _path: &Path, kind: MediaKind) -> Option<CaptureTime> {
        kind.is_media()
            .then(|| CaptureTime::new(self.0, DateSource::Exif))
    }
}

/// Reports no capture time at all
struct NoMetadata;

impl MetadataProbe for NoMetadata {
    fn capture_time(&self, _path: &Path, _kind: MediaKind) -> Option<CaptureTime> {
        None
    }
}

fn june_15() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 6, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn organizer(source: &TempDir, root: &TempDir, policy: ConflictPolicy, delete: bool) -> Organizer {
    Organizer::builder()
        .source(source.path())
        .destination(root.path())
        .probe(Box::new(FixedProbe(june_15())))
        .conflict_policy(policy)
        .delete_duplicates(delete)
        .build()
        .unwrap()
}

fn library(root: &TempDir, rel: &str) -> PathBuf {
    root.path().canonicalize().unwrap().join(rel)
}

fn set_modified(path: &Path, at: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(at)
        .unwrap();
}

#[test]
fn unique_photo_is_filed_under_year_and_month() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut organizer = organizer(&source, &root, ConflictPolicy::DivertIncoming, true);

    let photo = source.child("IMG_20230615_1200.jpg");
    photo.write_binary(b"jpeg bytes").unwrap();

    let outcome = organizer.process(photo.path());

    assert_eq!(
        outcome,
        ProcessOutcome::Moved {
            to: library(&root, "2023/06_Jun/IMG_20230615_1200.jpg")
        }
    );
    photo.assert(predicate::path::missing());
    root.child("2023/06_Jun/IMG_20230615_1200.jpg")
        .assert(predicate::path::is_file())
        .assert("jpeg bytes");

    let stats = organizer.statistics();
    assert_eq!(stats.files_moved, 1);
    assert_eq!(stats.bytes_moved, 10);
}

#[test]
fn identical_content_is_deleted_from_source() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut organizer = organizer(&source, &root, ConflictPolicy::DivertIncoming, true);

    let photo = source.child("a.jpg");
    photo.write_binary(b"same").unwrap();
    organizer.process(photo.path());
    photo.write_binary(b"same").unwrap();

    let outcome = organizer.process(photo.path());

    assert_eq!(
        outcome,
        ProcessOutcome::DuplicateDeleted {
            existing: library(&root, "2023/06_Jun/a.jpg")
        }
    );
    photo.assert(predicate::path::missing());
    root.child("Duplicates").assert(predicate::path::missing());

    let stats = organizer.statistics();
    assert_eq!((stats.files_moved, stats.files_deleted), (1, 1));
    assert_eq!(stats.bytes_deleted, 4);
}

#[test]
fn conflicting_content_goes_to_duplicates_with_new_name() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut organizer = organizer(&source, &root, ConflictPolicy::DivertIncoming, true);

    let photo = source.child("a.jpg");
    photo.write_binary(b"first").unwrap();
    organizer.process(photo.path());
    photo.write_binary(b"second").unwrap();
    organizer.process(photo.path());
    photo.write_binary(b"third").unwrap();
    organizer.process(photo.path());

    root.child("2023/06_Jun/a.jpg").assert("first");
    root.child("Duplicates/20230615_120000.0001.jpg").assert("second");
    root.child("Duplicates/20230615_120000.0002.jpg").assert("third");

    let stats = organizer.statistics();
    assert_eq!(stats.files_moved, 1);
    assert_eq!(stats.files_duplicated, 2);
    assert_eq!(stats.bytes_duplicated, 11);
}

#[test]
fn keep_oldest_displaces_newer_file_and_transfers_its_bytes() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut organizer = organizer(&source, &root, ConflictPolicy::KeepOldest, true);
    let five_mb = 5 * 1024 * 1024;

    let newer = source.child("clip.mov");
    newer.write_binary(&vec![1u8; five_mb]).unwrap();
    organizer.process(newer.path());
    assert_eq!(organizer.statistics().bytes_moved, five_mb as u64);

    let older = source.child("clip.mov");
    older.write_binary(b"the original").unwrap();
    set_modified(older.path(), SystemTime::now() - Duration::from_secs(86_400));

    let outcome = organizer.process(older.path());

    assert_eq!(
        outcome,
        ProcessOutcome::ReplacedExisting {
            to: library(&root, "2023/06_Jun/clip.mov"),
            displaced_to: Some(library(&root, "Duplicates/20230615_120000.0001.mov")),
        }
    );
    root.child("2023/06_Jun/clip.mov").assert("the original");
    root.child("Duplicates/20230615_120000.0001.mov")
        .assert(predicate::path::is_file());

    let stats = organizer.statistics();
    assert_eq!(stats.files_moved, 1);
    assert_eq!(stats.bytes_moved, 12);
    assert_eq!(stats.files_duplicated, 1);
    assert_eq!(stats.bytes_duplicated, five_mb as u64);
    assert_eq!(stats.total_bytes(), five_mb as u64 + 12);
}

#[test]
fn keep_oldest_leaves_older_filed_copy_in_place() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut organizer = organizer(&source, &root, ConflictPolicy::KeepOldest, true);

    let photo = source.child("a.jpg");
    photo.write_binary(b"filed first").unwrap();
    organizer.process(photo.path());
    set_modified(
        &library(&root, "2023/06_Jun/a.jpg"),
        SystemTime::now() - Duration::from_secs(86_400),
    );

    photo.write_binary(b"arrived later").unwrap();
    let outcome = organizer.process(photo.path());

    assert!(matches!(outcome, ProcessOutcome::MovedToDuplicates { .. }));
    root.child("2023/06_Jun/a.jpg").assert("filed first");
}

#[test]
fn files_without_any_date_land_in_fallback_bucket() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut organizer = Organizer::builder()
        .source(source.path())
        .destination(root.path())
        .probe(Box::new(NoMetadata))
        .classifier_config(ClassifierConfig {
            file_date_fallback: false,
            rename_by_date: false,
        })
        .build()
        .unwrap();

    let photo = source.child("scan.png");
    photo.write_binary(b"png").unwrap();
    organizer.process(photo.path());

    root.child("NoDateFound/scan.png")
        .assert(predicate::path::is_file());
}

#[test]
fn rename_by_date_uses_capture_stamp() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut organizer = Organizer::builder()
        .source(source.path())
        .destination(root.path())
        .probe(Box::new(FixedProbe(june_15())))
        .classifier_config(ClassifierConfig {
            file_date_fallback: true,
            rename_by_date: true,
        })
        .build()
        .unwrap();

    let photo = source.child("DSC_0042.JPG");
    photo.write_binary(b"raw").unwrap();
    organizer.process(photo.path());

    root.child("2023/06_Jun/20230615_120000.JPG")
        .assert(predicate::path::is_file());
}

#[test]
fn unknown_types_and_download_markers() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    source.child("manual.pdf").write_binary(b"pdf").unwrap();
    source
        .child("manual.pdf.Zone.Identifier")
        .write_str("[ZoneTransfer]\nZoneId=3\n")
        .unwrap();
    let mut organizer = organizer(&source, &root, ConflictPolicy::DivertIncoming, true);

    let summary = organizer.sweep(Duration::ZERO);

    assert_eq!(summary.moved, 1);
    root.child("Unknown File Types/manual.pdf")
        .assert(predicate::path::is_file());
    source
        .child("manual.pdf.Zone.Identifier")
        .assert(predicate::path::exists());
}

#[test]
fn restart_does_not_double_count() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();

    let photo = source.child("a.jpg");
    photo.write_binary(b"once").unwrap();
    let mut first = organizer(&source, &root, ConflictPolicy::DivertIncoming, true);
    first.process(photo.path());
    let before = first.shutdown();

    let mut second = organizer(&source, &root, ConflictPolicy::DivertIncoming, true);
    assert_eq!(second.statistics(), before);

    let summary = second.sweep(Duration::ZERO);
    assert_eq!(summary.processed(), 0);
    assert_eq!(second.shutdown(), before);
}

#[test]
fn every_processed_file_is_counted_exactly_once() {
    let source = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let mut organizer = organizer(&source, &root, ConflictPolicy::KeepOldest, true);

    let drops: &[(&str, &[u8])] = &[
        ("a.jpg", b"alpha"),
        ("a.jpg", b"alpha"),
        ("a.jpg", b"beta"),
        ("b.mp4", b"video"),
        ("notes.txt", b"text"),
        ("notes.txt", b"other text"),
        ("a.jpg", b"beta"),
    ];

    let mut bytes = 0u64;
    for (name, content) in drops {
        let file = source.child(*name);
        file.write_binary(content).unwrap();
        let outcome = organizer.process(file.path());
        assert!(outcome.is_completed(), "{} was not completed: {:?}", name, outcome);
        bytes += content.len() as u64;
    }

    let stats = organizer.statistics();
    assert_eq!(stats.total_files(), drops.len() as u64);
    assert_eq!(stats.total_bytes(), bytes);
    assert_eq!(stats.files_deleted, 2);
    assert_ne!(stats, StatisticsRecord::default());
}
