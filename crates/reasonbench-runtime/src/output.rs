//! Run folders, the JSONL record log, and the metrics report.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use reasonbench_core::{MetricsReport, ResultRecord};

/// Per-sample records, one JSON object per line.
pub const RECORDS_FILE: &str = "full_log.jsonl";

/// Pretty-printed [`MetricsReport`].
pub const METRICS_FILE: &str = "metrics.json";

/// Errors writing or reading run output.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path}:{line}: invalid record: {source}")]
    Malformed {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Folder name for one run: `<YYYYmmdd_HHMMSS>_<run>_<method>_<model_type>_<model>`.
///
/// Model names like `deepseek/deepseek-chat` are flattened so the result is a
/// single path component.
pub fn run_folder_name(
    started: DateTime<Local>,
    run_name: &str,
    method: &str,
    model_type: &str,
    model_name: &str,
) -> String {
    format!(
        "{}_{}_{}_{}_{}",
        started.format("%Y%m%d_%H%M%S"),
        run_name,
        method,
        model_type,
        model_name
    )
    .replace('/', "-")
}

/// Create `<output_dir>/<name>` (and parents).
pub fn create_run_folder(output_dir: &Path, name: &str) -> Result<PathBuf, OutputError> {
    let dir = output_dir.join(name);
    fs::create_dir_all(&dir).map_err(io_error(&dir))?;
    Ok(dir)
}

/// Destination for result records, called once per finished sample in
/// sample order.
pub trait RecordSink: Send + Sync {
    fn write(&self, record: &ResultRecord) -> Result<(), OutputError>;
}

/// Appends records to a JSONL file, flushing after each line so a log
/// survives an aborted run.
pub struct JsonlSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    /// Create (or truncate) the log file.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let path = path.into();
        let file = File::create(&path).map_err(io_error(&path))?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl RecordSink for JsonlSink {
    fn write(&self, record: &ResultRecord) -> Result<(), OutputError> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .map_err(io_error(&self.path))
    }
}

/// Keeps records in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ResultRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn records(&self) -> Vec<ResultRecord> {
        self.records.lock().clone()
    }
}

impl RecordSink for MemorySink {
    fn write(&self, record: &ResultRecord) -> Result<(), OutputError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Write the metrics report as pretty JSON.
pub fn write_metrics(path: &Path, report: &MetricsReport) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json + "\n").map_err(io_error(path))
}

/// Read back a JSONL record log. Blank lines are ignored.
pub fn read_records(path: &Path) -> Result<Vec<ResultRecord>, OutputError> {
    let file = File::open(path).map_err(io_error(path))?;
    let mut records = Vec::new();

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_error(path))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| OutputError::Malformed {
            path: path.display().to_string(),
            line: i + 1,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}
