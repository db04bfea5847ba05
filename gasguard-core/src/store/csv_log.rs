//! CSV reading log
//!
//! ```text
//! timestamp,sensor_id,sensor_type,value,anomaly
//! 2025-03-01 10:00:00,kitchen-1,mq5_01,182.5,0
//! 2025-03-01 10:00:05,kitchen-1,mq5_01,1240.0,1
//! ```
//!
//! Timestamps are UTC in [`TIMESTAMP_FORMAT`] (RFC 3339 is accepted on
//! read). The file is only ever appended to; the header is written with the
//! first row.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::errors::{StoreError, StoreResult};
use crate::reading::Reading;
use crate::time::Timestamp;
use crate::traits::ReadingStore;

/// Column header of the reading log
pub const CSV_HEADER: [&str; 5] = ["timestamp", "sensor_id", "sensor_type", "value", "anomaly"];

/// Timestamp layout of the reading log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only reading log backed by a CSV file
///
/// One mutex serializes appends and reads, so a reader never sees a row
/// that is half written. Every append is flushed before it returns.
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvStore {
    /// Store over `path`; the file is created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Log file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every row in the log, in file order
    pub fn load_all(&self) -> StoreResult<Vec<Reading>> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut rows = Vec::new();
        self.scan(None, |reading| rows.push(reading))?;
        Ok(rows)
    }

    /// Visit rows in file order, parsing only those of `sensor_type` when given
    ///
    /// Rows of other types are skipped unparsed, so a malformed row only
    /// faults reads of its own type.
    fn scan(&self, sensor_type: Option<&str>, mut visit: impl FnMut(Reading)) -> StoreResult<()> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if let Some(wanted) = sensor_type {
                if record.get(2) != Some(wanted) {
                    continue;
                }
            }
            visit(parse_row(&record, index as u64 + 1)?);
        }
        Ok(())
    }
}

impl ReadingStore for CsvStore {
    fn append(&self, reading: Reading) -> StoreResult<()> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let empty = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if empty {
            writer.write_record(CSV_HEADER)?;
        }
        writer.write_record([
            reading.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            reading.sensor_id,
            reading.sensor_type,
            reading.value.to_string(),
            if reading.is_anomaly { "1" } else { "0" }.to_string(),
        ])?;
        writer.flush()?;
        Ok(())
    }

    fn recent(&self, sensor_type: &str, count: usize) -> StoreResult<Vec<Reading>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        // Grows with the rows found; `count` comes from configuration
        let mut window = VecDeque::new();
        self.scan(Some(sensor_type), |reading| {
            if window.len() == count {
                window.pop_front();
            }
            window.push_back(reading);
        })?;
        Ok(window.into())
    }
}

fn parse_row(record: &StringRecord, row: u64) -> StoreResult<Reading> {
    let field = |index: usize| {
        record.get(index).ok_or_else(|| StoreError::Malformed {
            row,
            reason: format!("missing column '{}'", CSV_HEADER[index]),
        })
    };

    let raw_timestamp = field(0)?;
    let timestamp = parse_timestamp(raw_timestamp).ok_or_else(|| StoreError::Malformed {
        row,
        reason: format!("bad timestamp '{raw_timestamp}'"),
    })?;

    let raw_value = field(3)?;
    let value: f64 = raw_value.parse().map_err(|_| StoreError::Malformed {
        row,
        reason: format!("value '{raw_value}' is not a number"),
    })?;
    if !value.is_finite() {
        return Err(StoreError::Malformed {
            row,
            reason: format!("value '{raw_value}' is not finite"),
        });
    }

    // Missing flag column reads as not anomalous
    let is_anomaly = match record.get(4).unwrap_or("") {
        "1" | "true" | "True" => true,
        "0" | "false" | "False" | "" => false,
        other => {
            return Err(StoreError::Malformed {
                row,
                reason: format!("bad anomaly flag '{other}'"),
            })
        }
    };

    Ok(Reading {
        timestamp,
        sensor_id: field(1)?.to_string(),
        sensor_type: field(2)?.to_string(),
        value,
        is_anomaly,
    })
}

fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_parse_both_layouts() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 5).unwrap();
        assert_eq!(parse_timestamp("2025-03-01 10:00:05"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T10:00:05Z"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn malformed_value_names_the_row() {
        let record = StringRecord::from(vec!["2025-03-01 10:00:05", "dev", "mq5_01", "abc", "0"]);
        match parse_row(&record, 7) {
            Err(StoreError::Malformed { row, reason }) => {
                assert_eq!(row, 7);
                assert!(reason.contains("abc"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
