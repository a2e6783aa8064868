//! Log sinks
//!
//! Accumulates decoded output in memory for the duration of a session and
//! persists it once at stop time. Two independent sinks:
//!
//! - `RowSink` buffers one `DecodedRow` per decoded frame and flushes a
//!   single CSV with sparse signal columns.
//! - `DiscoverySink` flushes the message/signal inventory to a tabular
//!   CSV and a structured JSON file sharing a timestamped base name.
//!
//! Flushing is all-or-nothing per file: content is written to a temporary
//! file in the target directory and persisted with a rename, so no
//! partially written file is ever observable. An empty buffer produces
//! `FlushOutcome::NothingToWrite` and no files.

use crate::session::MessageInventory;
use crate::types::{DecodedRow, SinkError};
use chrono::Utc;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result of a flush
#[derive(Debug)]
pub enum FlushOutcome {
    /// Files written, in the order they were produced
    Written(Vec<PathBuf>),
    /// The buffer was empty; no file was created
    NothingToWrite,
}

impl FlushOutcome {
    /// Paths written by this flush (empty for `NothingToWrite`)
    pub fn files(&self) -> &[PathBuf] {
        match self {
            FlushOutcome::Written(files) => files,
            FlushOutcome::NothingToWrite => &[],
        }
    }
}

/// Buffers decoded rows and flushes them as one CSV per session
///
/// Signal columns are registered as rows introduce them; within a single
/// row, new names are added in sorted order so output is deterministic.
/// Signals absent from a given frame leave their cells blank.
#[derive(Debug, Default)]
pub struct RowSink {
    rows: Vec<DecodedRow>,
    columns: Vec<String>,
    column_set: HashSet<String>,
}

impl RowSink {
    /// Create an empty row sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoded row, registering any new signal columns
    pub fn append(&mut self, row: DecodedRow) {
        let mut new_columns: Vec<&String> = row
            .values
            .keys()
            .filter(|name| !self.column_set.contains(*name))
            .collect();
        new_columns.sort();
        for name in new_columns {
            self.column_set.insert(name.clone());
            self.columns.push(name.clone());
        }
        self.rows.push(row);
    }

    /// Number of buffered rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows have been appended
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Buffered rows, available for retry if a flush fails
    pub fn rows(&self) -> &[DecodedRow] {
        &self.rows
    }

    /// Write the buffered rows to `can_log_{timestamp}.csv` in `out_dir`
    ///
    /// Does not consume the buffer; the session loop calls this exactly
    /// once, and a failed flush leaves the rows available to the caller.
    pub fn flush(&self, out_dir: &Path) -> Result<FlushOutcome, SinkError> {
        if self.rows.is_empty() {
            log::info!("no rows buffered, skipping CSV output");
            return Ok(FlushOutcome::NothingToWrite);
        }

        std::fs::create_dir_all(out_dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = out_dir.join(format!("can_log_{}.csv", stamp));

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(format!("timestamp,arbitration_id,{}", self.columns.join(",")));

        for row in &self.rows {
            let secs = row.timestamp_ns / 1_000_000_000;
            let micros = (row.timestamp_ns % 1_000_000_000) / 1_000;
            let mut cells = Vec::with_capacity(self.columns.len() + 2);
            cells.push(format!("{}.{:06}", secs, micros));
            cells.push(format!("{:#x}", row.can_id));
            for column in &self.columns {
                cells.push(
                    row.values
                        .get(column)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                );
            }
            lines.push(cells.join(","));
        }
        lines.push(String::new());

        write_atomic(&path, &lines.join("\n"))?;
        log::info!("wrote {} rows to {:?}", self.rows.len(), path);
        Ok(FlushOutcome::Written(vec![path]))
    }
}

/// Flushes the discovery inventory to a CSV/JSON file pair
///
/// Base filename is derived from the catalog source identifier and the
/// flush wall-clock time, so repeated sessions do not collide.
#[derive(Debug)]
pub struct DiscoverySink {
    source: String,
}

impl DiscoverySink {
    /// Create a discovery sink for the given catalog source identifier
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Write `{source}_messages_{ts}.csv` and `{source}_messages_{ts}.txt`
    ///
    /// The CSV has one row per message with semicolon-joined signal names,
    /// in discovery order; the `.txt` is the equivalent nested JSON
    /// mapping, pretty-printed.
    pub fn flush(
        &self,
        inventory: &[MessageInventory],
        out_dir: &Path,
    ) -> Result<FlushOutcome, SinkError> {
        if inventory.is_empty() {
            log::info!("no messages observed, skipping discovery output");
            return Ok(FlushOutcome::NothingToWrite);
        }

        std::fs::create_dir_all(out_dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let base = format!("{}_messages_{}", self.source, stamp);

        let csv_path = out_dir.join(format!("{}.csv", base));
        let mut lines = Vec::with_capacity(inventory.len() + 1);
        lines.push("MessageName,SignalNames".to_string());
        for message in inventory {
            lines.push(format!("{},{}", message.name, message.signals.join(";")));
        }
        lines.push(String::new());
        write_atomic(&csv_path, &lines.join("\n"))?;

        let txt_path = out_dir.join(format!("{}.txt", base));
        let map: serde_json::Map<String, serde_json::Value> = inventory
            .iter()
            .map(|m| {
                (
                    m.name.clone(),
                    serde_json::Value::Array(
                        m.signals
                            .iter()
                            .map(|s| serde_json::Value::String(s.clone()))
                            .collect(),
                    ),
                )
            })
            .collect();
        let json = serde_json::to_string_pretty(&serde_json::Value::Object(map))
            .map_err(|e| SinkError::Persist(e.to_string()))?;
        write_atomic(&txt_path, &json)?;

        log::info!(
            "wrote discovery summary for {} messages to {:?} and {:?}",
            inventory.len(),
            csv_path,
            txt_path
        );
        Ok(FlushOutcome::Written(vec![csv_path, txt_path]))
    }
}

/// Write `contents` to `path` via a temporary file in the same directory
fn write_atomic(path: &Path, contents: &str) -> Result<(), SinkError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path)
        .map_err(|e| SinkError::Persist(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PhysicalValue;
    use std::collections::HashMap;

    fn row(timestamp_ns: u64, can_id: u32, values: &[(&str, PhysicalValue)]) -> DecodedRow {
        DecodedRow {
            timestamp_ns,
            can_id,
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_empty_row_sink_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RowSink::new();
        let outcome = sink.flush(dir.path()).unwrap();
        assert!(matches!(outcome, FlushOutcome::NothingToWrite));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_row_sink_writes_sparse_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RowSink::new();
        sink.append(row(
            1_500_000_000_250_000_000,
            0x100,
            &[
                ("Speed", PhysicalValue::Float(88.5)),
                ("Rpm", PhysicalValue::Integer(3000)),
            ],
        ));
        sink.append(row(
            1_500_000_001_000_000_000,
            0x200,
            &[("Brake", PhysicalValue::Integer(1))],
        ));
        assert_eq!(sink.len(), 2);

        let outcome = sink.flush(dir.path()).unwrap();
        let files = outcome.files();
        assert_eq!(files.len(), 1);
        assert!(files[0].file_name().unwrap().to_str().unwrap().starts_with("can_log_"));

        let content = std::fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "timestamp,arbitration_id,Rpm,Speed,Brake");
        assert_eq!(lines[1], "1500000000.250000,0x100,3000,88.5,");
        assert_eq!(lines[2], "1500000001.000000,0x200,,,1");
    }

    #[test]
    fn test_row_sink_flush_keeps_rows_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RowSink::new();
        sink.append(row(0, 0x100, &[("x", PhysicalValue::Integer(1))]));
        sink.flush(dir.path()).unwrap();
        assert_eq!(sink.rows().len(), 1);
    }

    #[test]
    fn test_empty_discovery_sink_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiscoverySink::new("ccan");
        let outcome = sink.flush(&[], dir.path()).unwrap();
        assert!(matches!(outcome, FlushOutcome::NothingToWrite));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_discovery_sink_writes_csv_and_json_pair() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiscoverySink::new("ccan");
        let inventory = vec![
            MessageInventory {
                name: "EngineStatus".to_string(),
                signals: vec!["Speed".to_string(), "Rpm".to_string()],
            },
            MessageInventory {
                name: "BrakeStatus".to_string(),
                signals: vec!["Brake".to_string()],
            },
        ];

        let outcome = sink.flush(&inventory, dir.path()).unwrap();
        let files = outcome.files();
        assert_eq!(files.len(), 2);

        let csv = std::fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "MessageName,SignalNames");
        assert_eq!(lines[1], "EngineStatus,Speed;Rpm");
        assert_eq!(lines[2], "BrakeStatus,Brake");

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files[1]).unwrap()).unwrap();
        assert_eq!(json["EngineStatus"], serde_json::json!(["Speed", "Rpm"]));
        assert_eq!(json["BrakeStatus"], serde_json::json!(["Brake"]));

        // Shared timestamped base name
        let stem0 = files[0].file_stem().unwrap();
        let stem1 = files[1].file_stem().unwrap();
        assert_eq!(stem0, stem1);
        assert!(stem0.to_str().unwrap().starts_with("ccan_messages_"));
    }
}
