//! CSV export of raw samples, aggregates and sizes.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::BenchError;
use crate::core::{SizeRecord, TimingAggregate, TimingSample};
use crate::pipeline::{EvaluationReport, ResultSink, VariantRun};

/// Raw sample columns in deterministic order.
pub const TIMES_HEADERS: &[&str] = &[
    "family",
    "level",
    "variant",
    "kind",
    "operation",
    "label",
    "run",
    "duration_ms",
    "correct",
];

/// Aggregate columns in deterministic order.
pub const AGGREGATE_HEADERS: &[&str] = &[
    "family",
    "level",
    "variant",
    "operation",
    "label",
    "samples",
    "mean_ms",
    "stddev_ms",
    "min_ms",
    "max_ms",
    "median_ms",
];

/// Size columns in deterministic order.
pub const SIZE_HEADERS: &[&str] = &[
    "family",
    "level",
    "variant",
    "kind",
    "public_key_bytes",
    "secret_key_bytes",
    "ciphertext_bytes",
    "shared_secret_bytes",
    "signature_bytes",
    "ind_cca2",
    "euf_cma",
];

/// The three files written for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPaths {
    pub times: PathBuf,
    pub aggregates: PathBuf,
    pub sizes: PathBuf,
}

/// Writes `<stamp>_times-<N>x_<families>.csv`, `<stamp>_aggregates-<N>x_<families>.csv`
/// and `<stamp>_sizes_<families>.csv` into one directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvSink { dir: dir.into() }
    }

    pub fn paths(&self, report: &EvaluationReport<'_>) -> CsvPaths {
        let meta = report.meta;
        let stamp = meta.file_stamp();
        let families = family_tag(&meta.families);
        let n = meta.config.measured_runs;
        CsvPaths {
            times: self.dir.join(format!("{stamp}_times-{n}x_{families}.csv")),
            aggregates: self.dir.join(format!("{stamp}_aggregates-{n}x_{families}.csv")),
            sizes: self.dir.join(format!("{stamp}_sizes_{families}.csv")),
        }
    }

    /// Write raw samples to any writer.
    pub fn write_times<W: Write>(
        &self,
        report: &EvaluationReport<'_>,
        writer: W,
    ) -> Result<(), BenchError> {
        let rows = report.samples().iter().map(|s| sample_to_row(report, s));
        write_table(TIMES_HEADERS, rows, writer)
    }

    /// Write aggregates to any writer.
    pub fn write_aggregates<W: Write>(
        &self,
        report: &EvaluationReport<'_>,
        writer: W,
    ) -> Result<(), BenchError> {
        let rows = report
            .aggregates()
            .iter()
            .map(|a| aggregate_to_row(report, a));
        write_table(AGGREGATE_HEADERS, rows, writer)
    }

    /// Write sizes to any writer.
    pub fn write_sizes<W: Write>(
        &self,
        report: &EvaluationReport<'_>,
        writer: W,
    ) -> Result<(), BenchError> {
        let rows = report.sizes().iter().map(|s| size_to_row(report, s));
        write_table(SIZE_HEADERS, rows, writer)
    }
}

impl ResultSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn deliver(&self, report: &EvaluationReport<'_>) -> Result<(), BenchError> {
        // Ensure output directory exists
        if !self.dir.as_os_str().is_empty() && !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)
                .map_err(|e| BenchError::Message(format!("failed to create directory: {e}")))?;
        }

        let paths = self.paths(report);
        self.write_times(report, create(&paths.times)?)?;
        self.write_aggregates(report, create(&paths.aggregates)?)?;
        self.write_sizes(report, create(&paths.sizes)?)?;

        info!(
            times = %paths.times.display(),
            aggregates = %paths.aggregates.display(),
            sizes = %paths.sizes.display(),
            "wrote CSV tables"
        );
        Ok(())
    }
}

fn create(path: &Path) -> Result<std::fs::File, BenchError> {
    std::fs::File::create(path).map_err(|e| {
        BenchError::Message(format!("failed to create file {}: {e}", path.display()))
    })
}

fn write_table<W: Write>(
    headers: &[&str],
    rows: impl Iterator<Item = Vec<String>>,
    writer: W,
) -> Result<(), BenchError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(headers)
        .map_err(|e| BenchError::Message(format!("failed to write CSV headers: {e}")))?;

    for row in rows {
        csv_writer
            .write_record(&row)
            .map_err(|e| BenchError::Message(format!("failed to write CSV row: {e}")))?;
    }

    csv_writer
        .flush()
        .map_err(|e| BenchError::Message(format!("failed to flush CSV writer: {e}")))?;

    Ok(())
}

/// Requested families as a file-name fragment.
fn family_tag(families: &[String]) -> String {
    let tag = families
        .iter()
        .map(|f| {
            f.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-");
    if tag.is_empty() { "none".to_string() } else { tag }
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn run_of<'a>(report: &EvaluationReport<'a>, variant: &str) -> Option<&'a VariantRun> {
    report.evaluation.runs.iter().find(|r| r.variant == variant)
}

fn sample_to_row(report: &EvaluationReport<'_>, s: &TimingSample) -> Vec<String> {
    let run = run_of(report, &s.variant);
    vec![
        opt(run.map(|r| &r.family)),
        opt(run.map(|r| r.level)),
        s.variant.clone(),
        opt(run.map(|r| r.kind)),
        s.operation.to_string(),
        opt(run.map(|r| s.operation.label(r.kind))),
        s.run.to_string(),
        format!("{:.6}", s.duration_ms),
        s.correct.to_string(),
    ]
}

fn aggregate_to_row(report: &EvaluationReport<'_>, a: &TimingAggregate) -> Vec<String> {
    let run = run_of(report, &a.variant);
    vec![
        opt(run.map(|r| &r.family)),
        opt(run.map(|r| r.level)),
        a.variant.clone(),
        a.operation.to_string(),
        opt(run.map(|r| a.operation.label(r.kind))),
        a.samples.to_string(),
        format!("{:.6}", a.mean_ms),
        a.stddev_ms.map(|v| format!("{:.6}", v)).unwrap_or_default(),
        format!("{:.6}", a.min_ms),
        format!("{:.6}", a.max_ms),
        format!("{:.6}", a.median_ms),
    ]
}

fn size_to_row(report: &EvaluationReport<'_>, s: &SizeRecord) -> Vec<String> {
    vec![
        opt(run_of(report, &s.variant).map(|r| &r.family)),
        opt(s.level),
        s.variant.clone(),
        s.kind.to_string(),
        s.public_key.to_string(),
        s.secret_key.to_string(),
        opt(s.ciphertext),
        opt(s.shared_secret),
        opt(s.signature),
        opt(s.ind_cca2),
        opt(s.euf_cma),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BenchmarkConfig, OperationKind, PrimitiveKind};
    use crate::pipeline::{Evaluation, RunMeta};

    fn make_meta() -> RunMeta {
        RunMeta {
            record_id: "id".to_string(),
            timestamp: "2026-10-17T08:09:10Z".to_string(),
            provider: "mock".to_string(),
            provider_version: None,
            config: BenchmarkConfig::new(2, 0),
            families: vec!["kyber".to_string(), "ecdsa".to_string()],
            levels: vec![1],
            rules_sha256: "x".to_string(),
        }
    }

    fn make_eval() -> Evaluation {
        let samples: Vec<TimingSample> = (0..2)
            .flat_map(|run| {
                OperationKind::ALL.into_iter().map(move |operation| TimingSample {
                    variant: "Kyber512".to_string(),
                    operation,
                    duration_ms: 0.5 + run as f64,
                    run,
                    correct: true,
                })
            })
            .collect();
        Evaluation {
            aggregates: crate::aggregate::aggregate(&samples),
            samples,
            sizes: vec![SizeRecord {
                variant: "Kyber512".to_string(),
                kind: PrimitiveKind::Kem,
                level: Some(1),
                public_key: 800,
                secret_key: 1632,
                ciphertext: Some(768),
                shared_secret: Some(32),
                signature: None,
                ind_cca2: Some(true),
                euf_cma: None,
            }],
            runs: vec![VariantRun {
                family: "kyber".to_string(),
                kind: PrimitiveKind::Kem,
                level: 1,
                variant: "Kyber512".to_string(),
                correctness_failures: 0,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_file_names() {
        let meta = make_meta();
        let eval = make_eval();
        let report = EvaluationReport {
            meta: &meta,
            evaluation: &eval,
        };
        let paths = CsvSink::new("out").paths(&report);
        assert_eq!(paths.times, Path::new("out/20261017-080910_times-2x_kyber-ecdsa.csv"));
        assert_eq!(
            paths.aggregates,
            Path::new("out/20261017-080910_aggregates-2x_kyber-ecdsa.csv")
        );
        assert_eq!(paths.sizes, Path::new("out/20261017-080910_sizes_kyber-ecdsa.csv"));
    }

    #[test]
    fn test_times_table() {
        let meta = make_meta();
        let eval = make_eval();
        let report = EvaluationReport {
            meta: &meta,
            evaluation: &eval,
        };
        let mut buffer = Vec::new();
        CsvSink::new("out").write_times(&report, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], TIMES_HEADERS.join(","));
        assert_eq!(lines[1], "kyber,1,Kyber512,kem,keygen,keypair,0,0.500000,true");
        assert_eq!(lines[2], "kyber,1,Kyber512,kem,produce,encapsulate,0,0.500000,true");
    }

    #[test]
    fn test_aggregate_and_size_tables() {
        let meta = make_meta();
        let eval = make_eval();
        let report = EvaluationReport {
            meta: &meta,
            evaluation: &eval,
        };
        let sink = CsvSink::new("out");

        let mut buffer = Vec::new();
        sink.write_aggregates(&report, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let first = text.lines().nth(1).unwrap();
        assert!(first.starts_with("kyber,1,Kyber512,keygen,keypair,2,1.000000,"));

        let mut buffer = Vec::new();
        sink.write_sizes(&report, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "kyber,1,Kyber512,kem,800,1632,768,32,,true,"
        );
    }

    #[test]
    fn test_deliver_creates_directory_and_files() {
        let meta = make_meta();
        let eval = make_eval();
        let report = EvaluationReport {
            meta: &meta,
            evaluation: &eval,
        };
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/results");
        let sink = CsvSink::new(&out);
        sink.deliver(&report).unwrap();

        let paths = sink.paths(&report);
        assert!(paths.times.exists());
        assert!(paths.aggregates.exists());
        assert!(paths.sizes.exists());
    }

    #[test]
    fn test_family_tag_sanitized() {
        assert_eq!(family_tag(&[]), "none");
        assert_eq!(family_tag(&["a/b".to_string(), "c".to_string()]), "a_b-c");
    }
}
