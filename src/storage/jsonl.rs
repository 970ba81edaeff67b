use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{PersistedRecord, RecordStore, StoredRecord};
use crate::{relay::RelayState, Error, Result};

pub const DEFAULT_STORE_PATH: &str = "sensor_data.jsonl";

#[derive(Debug, Serialize, Deserialize)]
struct RecordLine {
    id: u64,
    timestamp: String,
    temperature: f64,
    humidity: f64,
    relay_status: u8,
}

/// Append-only JSON Lines file. Each line carries a CRC of its own body so a
/// torn write is skipped instead of poisoning later reads.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    file: File,
    next_id: u64,
    // Last write may have left a partial line behind.
    needs_newline: bool,
}

impl JsonlStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| storage_error("create dir", &path, e))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| storage_error("open", &path, e))?;

        let mut last_id = 0;
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)
            .map_err(|e| storage_error("scan", &path, e))?;
        for line in raw.split(|b| *b == b'\n') {
            if let Some(stored) = decode_line(&String::from_utf8_lossy(line)) {
                last_id = last_id.max(stored.id);
            }
        }
        let needs_newline = raw.last().is_some_and(|b| *b != b'\n');
        file.seek(SeekFrom::End(0))
            .map_err(|e| storage_error("seek", &path, e))?;

        Ok(Self {
            path,
            file,
            next_id: last_id + 1,
            needs_newline,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.needs_newline {
            self.file.write_all(b"\n")?;
            self.needs_newline = false;
        }
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.file.write_all(&buf)?;
        self.file.flush()?;
        self.file.sync_data()
    }
}

impl RecordStore for JsonlStore {
    fn append(&mut self, record: &PersistedRecord) -> Result<u64> {
        let id = self.next_id;
        let line = encode_line(id, record)?;
        if let Err(err) = self.write_line(&line) {
            self.needs_newline = true;
            return Err(storage_error("append", &self.path, err));
        }
        self.next_id += 1;
        Ok(id)
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        read_recent(&self.path, limit)
    }

    fn close(&mut self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| storage_error("close", &self.path, e))
    }
}

/// Read up to `limit` newest valid records from a store file, newest first.
/// A missing file reads as empty.
pub fn read_recent(path: &Path, limit: usize) -> Result<Vec<StoredRecord>> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(storage_error("read", path, err)),
    };

    let mut window: VecDeque<StoredRecord> = VecDeque::with_capacity(limit.min(1024));
    for line in BufReader::new(file).split(b'\n') {
        let line = line.map_err(|e| storage_error("read", path, e))?;
        if let Some(stored) = decode_line(&String::from_utf8_lossy(&line)) {
            if window.len() == limit {
                window.pop_front();
            }
            window.push_back(stored);
        }
    }
    Ok(window.into_iter().rev().collect())
}

const CRC_FIELD: &str = ",\"crc\":";

/// The crc covers the exact bytes of the body it is appended to.
fn encode_line(id: u64, record: &PersistedRecord) -> Result<String> {
    let line = RecordLine {
        id,
        timestamp: humantime::format_rfc3339_millis(record.timestamp).to_string(),
        temperature: record.temperature,
        humidity: record.humidity,
        relay_status: record.relay.as_status(),
    };
    let body = serde_json::to_string(&line)?;
    let crc = checksum(&body);
    let open = body
        .strip_suffix('}')
        .ok_or_else(|| Error::Storage(format!("record {id} did not encode as an object")))?;
    Ok(format!("{open}{CRC_FIELD}{crc}}}"))
}

fn decode_line(raw: &str) -> Option<StoredRecord> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (open, tail) = raw.rsplit_once(CRC_FIELD)?;
    let expected: u32 = tail.strip_suffix('}')?.parse().ok()?;
    if checksum(&format!("{open}}}")) != expected {
        return None;
    }
    let line: RecordLine = serde_json::from_str(raw).ok()?;
    let timestamp = humantime::parse_rfc3339(&line.timestamp).ok()?;
    let relay = RelayState::from_status(line.relay_status)?;
    Some(StoredRecord {
        id: line.id,
        record: PersistedRecord {
            timestamp,
            temperature: line.temperature,
            humidity: line.humidity,
            relay,
        },
    })
}

fn checksum(body: &str) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(body.as_bytes());
    hasher.finalize()
}

fn storage_error(action: &str, path: &Path, err: io::Error) -> Error {
    Error::Storage(format!("{action} {}: {err}", path.display()))
}
