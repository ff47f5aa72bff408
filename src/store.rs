// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-only multi-stream log store.
//!
//! One aggregate stream plus one stream per [`EventType`], each a plain file
//! in the store directory.
//!
//! # Guarantees
//! - Every accepted event is appended to the aggregate stream (compact line)
//!   and to its typed stream (detailed record)
//! - Appends to one stream are serialized; a record is a single `write_all`
//! - Readers take no lock. Bytes past the last complete terminator belong to
//!   an append in flight and are ignored; a read that overlaps a truncate is
//!   retried
//! - A tail torn by a crash is sealed off by the next append, so it reads
//!   back as one raw entry and never swallows the record after it
//! - No cross-stream atomicity: a crash between the two writes can leave an
//!   event in only one stream

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::codec::{self, Entry, LINE_TERMINATOR, RECORD_TERMINATOR};
use crate::error::{StoreError, StoreResult};
use crate::event::{Event, EventType};

/// Identifies a stream. Partition identity derives only from the event type
/// enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamName {
    Aggregate,
    Typed(EventType),
}

impl StreamName {
    pub const ALL: [StreamName; 4] = [
        StreamName::Aggregate,
        StreamName::Typed(EventType::Info),
        StreamName::Typed(EventType::Error),
        StreamName::Typed(EventType::ApiFailed),
    ];

    /// Accepts `aggregate` and every event type name, aliases included.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "aggregate" => Some(StreamName::Aggregate),
            other => EventType::parse(other).map(StreamName::Typed),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamName::Aggregate => "aggregate",
            StreamName::Typed(kind) => kind.as_str(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.log", self.as_str())
    }

    /// Bytes closing every complete entry of this stream.
    fn terminator(&self) -> &'static str {
        match self {
            StreamName::Aggregate => LINE_TERMINATOR,
            StreamName::Typed(_) => RECORD_TERMINATOR,
        }
    }

    fn index(&self) -> usize {
        match self {
            StreamName::Aggregate => 0,
            StreamName::Typed(EventType::Info) => 1,
            StreamName::Typed(EventType::Error) => 2,
            StreamName::Typed(EventType::ApiFailed) => 3,
        }
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a clear operation truncates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearTarget {
    All,
    Stream(StreamName),
}

impl ClearTarget {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(ClearTarget::All),
            other => StreamName::parse(other).map(ClearTarget::Stream),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClearTarget::All => "all",
            ClearTarget::Stream(name) => name.as_str(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Health {
    pub ready: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub stream: &'static str,
    pub file: String,
    pub bytes: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct StoreOptions {
    /// fsync after every append and truncate.
    pub fsync: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { fsync: true }
    }
}

const HEALTH_MARKER: &str = ".health-check";

struct Stream {
    path: PathBuf,
    // Held for one append or one truncate.
    write_lock: Mutex<()>,
    // Odd while a truncate is in progress.
    truncations: AtomicU64,
}

/// The single owner of all persisted streams. Construct once and share.
pub struct LogStore {
    dir: PathBuf,
    options: StoreOptions,
    streams: [Stream; 4],
}

impl LogStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    /// Stream files are created lazily on first append.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(dir, StoreOptions::default())
    }

    pub fn open_with(dir: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io("store", e))?;

        let streams = StreamName::ALL.map(|name| Stream {
            path: dir.join(name.file_name()),
            write_lock: Mutex::new(()),
            truncations: AtomicU64::new(0),
        });

        tracing::info!("Log store opened at {:?} (fsync: {})", dir, options.fsync);
        Ok(Self { dir, options, streams })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: StreamName) -> &Path {
        &self.stream(name).path
    }

    fn stream(&self, name: StreamName) -> &Stream {
        &self.streams[name.index()]
    }

    /// Appends `event` to the aggregate stream and to its typed stream.
    ///
    /// Both writes are always attempted. A failure of either is reported, but
    /// a write that already succeeded is not rolled back.
    pub fn append(&self, event: &Event) -> StoreResult<()> {
        let line = codec::encode_line(event);
        let record = codec::encode_record(event)?;

        let aggregate = self.write(StreamName::Aggregate, line.as_bytes());
        let typed = self.write(StreamName::Typed(event.kind), record.as_bytes());

        match (&aggregate, &typed) {
            (Ok(()), Ok(())) => {
                tracing::debug!("Appended {} event {:?}", event.kind, event.title);
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => {
                tracing::warn!("Partial append of {} event: {}", event.kind, e);
            }
            (Err(a), Err(t)) => {
                tracing::warn!("Append of {} event failed: {}; {}", event.kind, a, t);
            }
        }

        aggregate.and(typed)
    }

    fn write(&self, name: StreamName, bytes: &[u8]) -> StoreResult<()> {
        let stream = self.stream(name);
        let _guard = stream.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let io_err = |e| StoreError::io(name.as_str(), e);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&stream.path)
            .map_err(io_err)?;

        let terminator = name.terminator();
        if ends_cleanly(&mut file, terminator).map_err(io_err)? {
            file.write_all(bytes).map_err(io_err)?;
        } else {
            tracing::warn!("Sealing torn tail of {} stream before append", name);
            let mut sealed = Vec::with_capacity(terminator.len() + bytes.len());
            sealed.extend_from_slice(terminator.as_bytes());
            sealed.extend_from_slice(bytes);
            file.write_all(&sealed).map_err(io_err)?;
        }
        file.flush().map_err(io_err)?;
        if self.options.fsync {
            file.sync_all().map_err(io_err)?;
        }
        Ok(())
    }

    /// Returns at most `limit` entries, newest first.
    ///
    /// A missing or empty stream yields an empty vector. Entries that cannot
    /// be parsed come back as raw text rather than failing the read.
    pub fn read(&self, name: StreamName, limit: usize) -> StoreResult<Vec<Entry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let stream = self.stream(name);
        let loaded = loop {
            let before = stream.truncations.load(Ordering::SeqCst);
            let loaded = fs::read(&stream.path);
            if before % 2 == 0 && stream.truncations.load(Ordering::SeqCst) == before {
                break loaded;
            }
            // A truncate overlapped the load; the bytes may mix old and new contents.
            std::thread::yield_now();
        };
        let bytes = match loaded {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(name.as_str(), e)),
        };

        let entries = match name {
            StreamName::Aggregate => {
                let text = String::from_utf8_lossy(codec::complete_prefix(&bytes, LINE_TERMINATOR));
                newest_first(text.split(LINE_TERMINATOR), limit, codec::parse_line)
            }
            StreamName::Typed(_) => {
                let text = String::from_utf8_lossy(codec::complete_prefix(&bytes, RECORD_TERMINATOR));
                newest_first(text.split(RECORD_TERMINATOR), limit, codec::parse_record)
            }
        };
        Ok(entries)
    }

    /// Truncates the targeted streams to empty. Streams that were never
    /// created are skipped without error.
    pub fn clear(&self, target: ClearTarget) -> StoreResult<()> {
        let names = match target {
            ClearTarget::All => StreamName::ALL.to_vec(),
            ClearTarget::Stream(name) => vec![name],
        };

        let mut first_err = None;
        for name in names {
            if let Err(e) = self.truncate(name) {
                tracing::warn!("Failed to clear {} stream: {}", name, e);
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => {
                tracing::debug!("Cleared {}", target.as_str());
                Ok(())
            }
        }
    }

    fn truncate(&self, name: StreamName) -> StoreResult<()> {
        let stream = self.stream(name);
        let _guard = stream.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        stream.truncations.fetch_add(1, Ordering::SeqCst);
        let result = OpenOptions::new().write(true).truncate(true).open(&stream.path);
        stream.truncations.fetch_add(1, Ordering::SeqCst);

        match result {
            Ok(file) => {
                if self.options.fsync {
                    file.sync_all().map_err(|e| StoreError::io(name.as_str(), e))?;
                }
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(name.as_str(), e)),
        }
    }

    /// Whether the backing directory exists and accepts new files.
    pub fn health(&self) -> Health {
        let ready = fs::metadata(&self.dir).map(|m| m.is_dir()).unwrap_or(false) && self.check_writable();
        Health { ready }
    }

    fn check_writable(&self) -> bool {
        let marker = self.dir.join(HEALTH_MARKER);
        let created = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&marker);
        match created {
            Ok(file) => {
                drop(file);
                if let Err(e) = fs::remove_file(&marker) {
                    tracing::debug!("Could not remove health marker {:?}: {}", marker, e);
                }
                true
            }
            Err(e) => {
                tracing::debug!("Log directory {:?} not writable: {}", self.dir, e);
                false
            }
        }
    }

    /// Size on disk of each stream; 0 for streams not yet created.
    pub fn stats(&self) -> Vec<StreamStats> {
        StreamName::ALL
            .iter()
            .map(|name| StreamStats {
                stream: name.as_str(),
                file: name.file_name(),
                bytes: fs::metadata(self.path(*name)).map(|m| m.len()).unwrap_or(0),
            })
            .collect()
    }
}

/// Whether `file` is empty or ends with a complete `terminator`.
fn ends_cleanly(file: &mut File, terminator: &str) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    let terminator = terminator.as_bytes();
    if len < terminator.len() as u64 {
        return Ok(false);
    }

    let mut tail = vec![0u8; terminator.len()];
    file.seek(SeekFrom::End(-(terminator.len() as i64)))?;
    file.read_exact(&mut tail)?;
    Ok(tail == terminator)
}

fn newest_first<'a>(
    pieces: impl Iterator<Item = &'a str>,
    limit: usize,
    parse: fn(&str) -> Entry,
) -> Vec<Entry> {
    let pieces: Vec<&str> = pieces.filter(|p| !p.trim().is_empty()).collect();
    let start = pieces.len().saturating_sub(limit);
    pieces[start..].iter().rev().map(|p| parse(p)).collect()
}
