use crate::core::models::record::MetricRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error for output file '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An append-only destination for metric records.
pub trait RecordSink {
    fn append(&mut self, record: &MetricRecord) -> Result<(), SinkError>;
}

/// Keeps every appended record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<MetricRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &MetricRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}

pub const CSV_HEADER: [&str; 8] = [
    "name",
    "value",
    "model",
    "iteration",
    "run_time",
    "timestamp",
    "data_size",
    "params",
];

fn open_append(path: &Path) -> Result<(File, bool), SinkError> {
    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    Ok((file, is_new))
}

/// Appends one CSV row per record. The header is written only when the file is new.
///
/// Predictions are never written here; route them to a [`JsonLinesSink`].
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let (file, is_new) = open_append(&path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(CSV_HEADER)?;
            writer.flush().map_err(|source| SinkError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &MetricRecord) -> Result<(), SinkError> {
        self.writer.write_record([
            record.name.clone(),
            record.value.to_string(),
            record.model.clone(),
            record.iteration.to_string(),
            record.run_time_secs.to_string(),
            record.timestamp.clone(),
            record.data_size.to_string(),
            record.params_string(),
        ])?;
        self.writer.flush().map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Appends each record as one JSON object per line, predictions included.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let (file, _) = open_append(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }
}

impl RecordSink for JsonLinesSink {
    fn append(&mut self, record: &MetricRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        let io_err = |source| SinkError::Io {
            path: self.path.clone(),
            source,
        };
        self.writer.write_all(b"\n").map_err(io_err)?;
        self.writer.flush().map_err(io_err)
    }
}
