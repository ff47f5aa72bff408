// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::codec::{self, Entry, EventSummary};
use crate::event::{Event, EventType};
use crate::store::{ClearTarget, LogStore, StoreOptions, StreamName};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Map};
use std::fs;
use std::io::Write;
use tempfile::tempdir;

fn event(kind: EventType, title: &str, secs: i64) -> Event {
    let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    Event::new(base + Duration::seconds(secs), kind, title, "", Map::new())
}

fn fast_store(dir: &std::path::Path) -> LogStore {
    LogStore::open_with(dir, StoreOptions { fsync: false }).unwrap()
}

#[test]
fn test_open_creates_dir_and_lazy_streams() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nested").join("logs");
    let store = LogStore::open(&root).unwrap();

    assert!(root.is_dir());
    assert!(store.health().ready);
    for name in StreamName::ALL {
        assert!(!store.path(name).exists());
    }
}

#[test]
fn test_stream_files_follow_type_names() {
    let names: Vec<String> = StreamName::ALL.iter().map(|n| n.file_name()).collect();
    assert_eq!(names, ["aggregate.log", "info.log", "error.log", "api-failed.log"]);
    assert_eq!(StreamName::parse("log"), Some(StreamName::Typed(EventType::Info)));
    assert_eq!(StreamName::parse("all"), None);
    assert_eq!(ClearTarget::parse("all"), Some(ClearTarget::All));
}

#[test]
fn test_append_writes_both_streams() {
    let dir = tempdir().unwrap();
    let store = fast_store(dir.path());

    let mut e = event(EventType::Error, "Crash", 0);
    e.description = "npe".into();
    e.metadata.insert("screen".into(), json!("Home"));
    store.append(&e).unwrap();

    let aggregate = store.read(StreamName::Aggregate, 10).unwrap();
    assert_eq!(
        aggregate,
        vec![Entry::Summary(EventSummary {
            timestamp: Some("2025-01-01T00:00:00.000Z".into()),
            kind: Some("error".into()),
            title: "Crash".into(),
            description: Some("npe".into()),
        })]
    );

    let typed = store.read(StreamName::Typed(EventType::Error), 10).unwrap();
    assert_eq!(typed, vec![Entry::Event(e)]);

    assert!(store.read(StreamName::Typed(EventType::Info), 10).unwrap().is_empty());
    assert!(!store.path(StreamName::Typed(EventType::ApiFailed)).exists());
}

#[test]
fn test_read_bounded_newest_first() {
    let dir = tempdir().unwrap();
    let store = fast_store(dir.path());

    for i in 0..7 {
        store.append(&event(EventType::Info, &format!("e{}", i), i)).unwrap();
    }

    let typed = store.read(StreamName::Typed(EventType::Info), 3).unwrap();
    let titles: Vec<&str> = typed.iter().map(Entry::title).collect();
    assert_eq!(titles, ["e6", "e5", "e4"]);

    let aggregate = store.read(StreamName::Aggregate, 100).unwrap();
    assert_eq!(aggregate.len(), 7);
    assert_eq!(aggregate[0].title(), "e6");
    assert_eq!(aggregate[6].title(), "e0");

    assert!(store.read(StreamName::Aggregate, 0).unwrap().is_empty());
}

#[test]
fn test_read_missing_stream_is_empty() {
    let dir = tempdir().unwrap();
    let store = fast_store(dir.path());
    for name in StreamName::ALL {
        assert!(store.read(name, 10).unwrap().is_empty());
    }
}

#[test]
fn test_read_tolerates_malformed_entries() {
    let dir = tempdir().unwrap();
    let store = fast_store(dir.path());
    store.append(&event(EventType::Error, "good", 1)).unwrap();

    {
        let mut f = fs::OpenOptions::new()
            .append(true)
            .open(store.path(StreamName::Typed(EventType::Error)))
            .unwrap();
        f.write_all(b"hand written note\n---\n\n   \n---\n[x] [ERROR] broken\n{\"type\":\n---\n").unwrap();

        let mut f = fs::OpenOptions::new()
            .append(true)
            .open(store.path(StreamName::Aggregate))
            .unwrap();
        f.write_all(b"\n  \nnot a compact line\n").unwrap();
    }

    let typed = store.read(StreamName::Typed(EventType::Error), 10).unwrap();
    assert_eq!(typed.len(), 3);
    assert_eq!(typed[0], Entry::Raw("[x] [ERROR] broken\n{\"type\":".into()));
    assert_eq!(typed[1], Entry::Raw("hand written note".into()));
    assert!(matches!(&typed[2], Entry::Event(e) if e.title == "good"));

    let aggregate = store.read(StreamName::Aggregate, 10).unwrap();
    assert_eq!(aggregate.len(), 2);
    assert_eq!(aggregate[0], Entry::Summary(EventSummary::opaque("not a compact line")));
}

#[test]
fn test_read_ignores_torn_tail() {
    let dir = tempdir().unwrap();
    let store = fast_store(dir.path());
    store.append(&event(EventType::ApiFailed, "whole", 1)).unwrap();

    for name in [StreamName::Aggregate, StreamName::Typed(EventType::ApiFailed)] {
        let mut f = fs::OpenOptions::new().append(true).open(store.path(name)).unwrap();
        f.write_all(b"[2025-01-01T00:00:09.000Z] [API-FAILED] torn\n{\"timest").unwrap();
    }

    let typed = store.read(StreamName::Typed(EventType::ApiFailed), 10).unwrap();
    assert_eq!(typed.len(), 1);
    assert_eq!(typed[0].title(), "whole");

    // The aggregate tail line is complete up to its newline; only the JSON fragment is dropped.
    let aggregate = store.read(StreamName::Aggregate, 10).unwrap();
    assert_eq!(aggregate.len(), 2);
    assert_eq!(aggregate[0].title(), "torn");
}

#[test]
fn test_append_after_torn_tail_seals_fragment() {
    let dir = tempdir().unwrap();
    let store = fast_store(dir.path());
    store.append(&event(EventType::Error, "whole", 1)).unwrap();

    // A crash mid-append left a fragment at the end of both streams.
    for name in [StreamName::Aggregate, StreamName::Typed(EventType::Error)] {
        let mut f = fs::OpenOptions::new().append(true).open(store.path(name)).unwrap();
        f.write_all(b"[2025-01-01T00:00:09.000Z] [ERROR] torn\n{\"timest").unwrap();
    }

    let mut after = event(EventType::Error, "after-crash", 10);
    after.description = "d".into();
    store.append(&after).unwrap();

    let typed = store.read(StreamName::Typed(EventType::Error), 10).unwrap();
    assert_eq!(typed.len(), 3);
    assert_eq!(typed[0], Entry::Event(after.clone()));
    assert_eq!(typed[1], Entry::Raw("[2025-01-01T00:00:09.000Z] [ERROR] torn\n{\"timest".into()));
    assert_eq!(typed[2].title(), "whole");

    let aggregate = store.read(StreamName::Aggregate, 10).unwrap();
    let titles: Vec<&str> = aggregate.iter().map(Entry::title).collect();
    assert_eq!(titles, ["after-crash", "{\"timest", "torn", "whole"]);
    assert!(matches!(&aggregate[0], Entry::Summary(s) if s.description.as_deref() == Some("d")));

    // Later appends are unaffected
    store.append(&event(EventType::Error, "next", 11)).unwrap();
    let typed = store.read(StreamName::Typed(EventType::Error), 1).unwrap();
    assert_eq!(typed[0].title(), "next");
}

#[test]
fn test_read_during_in_flight_append() {
    let dir = tempdir().unwrap();
    let store = fast_store(dir.path());
    store.append(&event(EventType::Info, "done", 1)).unwrap();

    let pending = event(EventType::Info, "pending", 2);
    let record = codec::encode_record(&pending).unwrap();
    let line = codec::encode_line(&pending);
    let (head, rest) = record.as_bytes().split_at(record.len() / 2);
    let (line_head, line_rest) = line.as_bytes().split_at(line.len() - 1);

    let mut typed_file = fs::OpenOptions::new()
        .append(true)
        .open(store.path(StreamName::Typed(EventType::Info)))
        .unwrap();
    let mut aggregate_file = fs::OpenOptions::new()
        .append(true)
        .open(store.path(StreamName::Aggregate))
        .unwrap();
    typed_file.write_all(head).unwrap();
    aggregate_file.write_all(line_head).unwrap();

    // Only complete entries are visible while the write is partway through
    let typed = store.read(StreamName::Typed(EventType::Info), 10).unwrap();
    assert_eq!(typed.len(), 1);
    assert_eq!(typed[0].title(), "done");
    assert_eq!(store.read(StreamName::Aggregate, 10).unwrap().len(), 1);

    typed_file.write_all(rest).unwrap();
    aggregate_file.write_all(line_rest).unwrap();

    let typed = store.read(StreamName::Typed(EventType::Info), 10).unwrap();
    assert_eq!(typed[0], Entry::Event(pending));
    assert_eq!(store.read(StreamName::Aggregate, 10).unwrap()[0].title(), "pending");
}

#[test]
fn test_clear_single_stream() {
    let dir = tempdir().unwrap();
    let store = fast_store(dir.path());
    store.append(&event(EventType::Error, "a", 1)).unwrap();
    store.append(&event(EventType::Info, "b", 2)).unwrap();

    store.clear(ClearTarget::Stream(StreamName::Typed(EventType::Error))).unwrap();

    assert!(store.read(StreamName::Typed(EventType::Error), 10).unwrap().is_empty());
    assert_eq!(store.read(StreamName::Typed(EventType::Info), 10).unwrap().len(), 1);
    assert_eq!(store.read(StreamName::Aggregate, 10).unwrap().len(), 2);
    // Cleared streams stay present but empty
    assert!(store.path(StreamName::Typed(EventType::Error)).exists());
}

#[test]
fn test_clear_all_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = fast_store(dir.path());

    // Nothing exists yet
    store.clear(ClearTarget::All).unwrap();

    store.append(&event(EventType::Error, "a", 1)).unwrap();
    store.append(&event(EventType::ApiFailed, "b", 2)).unwrap();
    store.clear(ClearTarget::All).unwrap();
    store.clear(ClearTarget::All).unwrap();

    for name in StreamName::ALL {
        assert!(store.read(name, 100).unwrap().is_empty());
    }

    // Appends after a clear start fresh
    store.append(&event(EventType::Error, "c", 3)).unwrap();
    let typed = store.read(StreamName::Typed(EventType::Error), 10).unwrap();
    assert_eq!(typed.len(), 1);
    assert_eq!(typed[0].title(), "c");
}

#[test]
fn test_reopen_reads_existing_streams() {
    let dir = tempdir().unwrap();
    {
        let store = LogStore::open(dir.path()).unwrap();
        store.append(&event(EventType::Info, "persisted", 1)).unwrap();
    }

    let store = LogStore::open(dir.path()).unwrap();
    let typed = store.read(StreamName::Typed(EventType::Info), 10).unwrap();
    assert_eq!(typed, vec![Entry::Event(event(EventType::Info, "persisted", 1))]);
}

#[test]
fn test_health_and_stats() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("logs");
    let store = fast_store(&root);
    store.append(&event(EventType::Info, "x", 1)).unwrap();

    let stats = store.stats();
    assert_eq!(stats.len(), 4);
    assert_eq!(stats[0].stream, "aggregate");
    assert!(stats[0].bytes > 0);
    assert!(stats[1].bytes > stats[0].bytes);
    assert_eq!(stats[2].bytes, 0);

    // The writability check leaves nothing behind
    let leftovers: Vec<_> = fs::read_dir(&root)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|n| !n.ends_with(".log"))
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {:?}", leftovers);

    fs::remove_dir_all(&root).unwrap();
    assert!(!store.health().ready);
}

#[test]
fn test_health_requires_a_directory() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("logs");
    let store = fast_store(&root);
    assert!(store.health().ready);

    fs::remove_dir_all(&root).unwrap();
    fs::write(&root, b"not a directory").unwrap();
    assert!(!store.health().ready);
}
