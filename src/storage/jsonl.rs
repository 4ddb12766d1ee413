//! JSONL (JSON Lines) run history.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::BenchError;
use crate::catalog::ResolvedFamily;
use crate::core::{EnvironmentInfo, SCHEMA_VERSION, SizeRecord, TimingAggregate};
use crate::pipeline::{EvaluationReport, ResultSink, RunMeta, VariantFailure, VariantRun};

/// One evaluation as persisted in the history file.
///
/// Raw samples are omitted; the CSV tables carry them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub schema_version: u32,
    #[serde(flatten)]
    pub meta: RunMeta,
    pub env: EnvironmentInfo,
    pub resolved: Vec<ResolvedFamilyRecord>,
    pub runs: Vec<VariantRun>,
    pub aggregates: Vec<TimingAggregate>,
    pub sizes: Vec<SizeRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<VariantFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<VariantFailure>,
}

/// Resolved family with string level keys, as JSON object keys must be strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFamilyRecord {
    pub family: String,
    pub kind: crate::core::PrimitiveKind,
    pub variants: Vec<(u8, String)>,
}

impl From<&ResolvedFamily> for ResolvedFamilyRecord {
    fn from(f: &ResolvedFamily) -> Self {
        ResolvedFamilyRecord {
            family: f.family.clone(),
            kind: f.kind,
            variants: f.iter().map(|(l, v)| (l, v.to_string())).collect(),
        }
    }
}

impl RunRecord {
    pub fn from_report(report: &EvaluationReport<'_>, env: EnvironmentInfo) -> Self {
        let eval = report.evaluation;
        RunRecord {
            schema_version: SCHEMA_VERSION,
            meta: report.meta.clone(),
            env,
            resolved: eval.resolved.iter().map(ResolvedFamilyRecord::from).collect(),
            runs: eval.runs.clone(),
            aggregates: eval.aggregates.clone(),
            sizes: eval.sizes.clone(),
            failures: eval.failures.clone(),
            aborted: eval.aborted.clone(),
        }
    }

    pub fn correctness_failures(&self) -> usize {
        self.runs.iter().map(|r| r.correctness_failures).sum()
    }
}

/// Appends one [`RunRecord`] per evaluation and reads them back.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
    env: EnvironmentInfo,
}

impl JsonlSink {
    /// Sink for `path` with environment detected from the current host.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_env(path, EnvironmentInfo::detect())
    }

    pub fn with_env(path: impl AsRef<Path>, env: EnvironmentInfo) -> Self {
        JsonlSink {
            path: path.as_ref().to_path_buf(),
            env,
        }
    }

    /// Get the path to the JSONL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a single record to the JSONL file.
    ///
    /// # Errors
    /// Returns an error if the schema version is not the current one, or if
    /// serialization or file operations fail.
    pub fn append(&self, record: &RunRecord) -> Result<(), BenchError> {
        if record.schema_version != SCHEMA_VERSION {
            return Err(BenchError::Message(format!(
                "schema version mismatch: record has v{}, expected v{}",
                record.schema_version, SCHEMA_VERSION
            )));
        }

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BenchError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| BenchError::Message(format!("failed to open file: {e}")))?;

        let json = serde_json::to_string(record)
            .map_err(|e| BenchError::Message(format!("failed to serialize record: {e}")))?;

        writeln!(file, "{}", json)
            .map_err(|e| BenchError::Message(format!("failed to write record: {e}")))?;

        Ok(())
    }

    /// Read all records from the JSONL file.
    pub fn read_all(&self) -> Result<Vec<RunRecord>, BenchError> {
        self.read_filtered(None)
    }

    /// Read records, optionally keeping only runs that requested `family`.
    pub fn read_filtered(&self, family: Option<&str>) -> Result<Vec<RunRecord>, BenchError> {
        if !self.path.exists() {
            return Err(BenchError::Message(format!(
                "file not found: {}",
                self.path.display()
            )));
        }

        let file = File::open(&self.path)
            .map_err(|e| BenchError::Message(format!("failed to open file: {e}")))?;

        let mut records = Vec::new();
        for (line_num, line_result) in BufReader::new(file).lines().enumerate() {
            let line = line_result.map_err(|e| {
                BenchError::Message(format!("failed to read line {}: {e}", line_num + 1))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let record: RunRecord = serde_json::from_str(&line).map_err(|e| {
                BenchError::Message(format!("failed to parse line {}: {e}", line_num + 1))
            })?;

            if let Some(name) = family {
                if !record.meta.families.iter().any(|f| f == name) {
                    continue;
                }
            }

            records.push(record);
        }

        Ok(records)
    }

    /// Number of non-empty lines; zero when the file does not exist.
    pub fn count(&self) -> Result<usize, BenchError> {
        if !self.path.exists() {
            return Ok(0);
        }
        let file = File::open(&self.path)
            .map_err(|e| BenchError::Message(format!("failed to open file: {e}")))?;
        let mut n = 0;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| BenchError::Message(format!("failed to read line: {e}")))?;
            if !line.trim().is_empty() {
                n += 1;
            }
        }
        Ok(n)
    }
}

impl ResultSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn deliver(&self, report: &EvaluationReport<'_>) -> Result<(), BenchError> {
        let record = RunRecord::from_report(report, self.env.clone());
        self.append(&record)?;
        info!(path = %self.path.display(), record_id = %record.meta.record_id, "appended run record");
        Ok(())
    }
}
