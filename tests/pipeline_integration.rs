//! End-to-end evaluation against the mock provider, delivered to every sink.

use std::time::Duration;

use pqc_bench::catalog::{MechanismCatalog, MechanismRules};
use pqc_bench::core::{BenchmarkConfig, EnvironmentInfo, OperationKind};
use pqc_bench::pipeline::{Evaluation, EvaluationPipeline, FailurePolicy, RunMeta};
use pqc_bench::provider::{MockConfig, MockProvider};
use pqc_bench::report::HtmlSink;
use pqc_bench::runner::BenchmarkRunner;
use pqc_bench::storage::{CsvSink, JsonlSink, TIMES_HEADERS};

fn mock(config: MockConfig) -> MockProvider {
    MockProvider::new(
        config
            .with_kem("ML-KEM-512", 1)
            .with_kem("ML-KEM-768", 3)
            .with_kem("ML-KEM-1024", 5)
            .with_sig("ML-DSA-44", 2)
            .with_sig("ML-DSA-65", 3)
            .with_sig("ML-DSA-87", 5)
            .with_curve("P-256", 1)
            .with_curve("P-384", 3),
    )
}

fn families(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn evaluate(
    provider: &MockProvider,
    fams: &[String],
    levels: &[u8],
    config: BenchmarkConfig,
    policy: FailurePolicy,
) -> (Evaluation, RunMeta) {
    let catalog = MechanismCatalog::new(MechanismRules::builtin().unwrap());
    let runner = BenchmarkRunner::new(config).with_clock(provider.clock());
    let eval = EvaluationPipeline::new(&catalog, runner)
        .with_policy(policy)
        .evaluate(fams, levels, provider)
        .unwrap();
    let meta = RunMeta::new(provider, config, fams, levels, catalog.rules().fingerprint());
    (eval, meta)
}

#[test]
fn test_full_run_to_all_sinks() {
    let provider = mock(MockConfig::new("mock").with_op_cost(Duration::from_micros(250)));
    let fams = families(&["mlkem", "mldsa", "ecdsa"]);
    let (eval, meta) = evaluate(
        &provider,
        &fams,
        &[1, 3],
        BenchmarkConfig::new(4, 1),
        FailurePolicy::Abort,
    );

    let order: Vec<&str> = eval.runs.iter().map(|r| r.variant.as_str()).collect();
    assert_eq!(order, vec!["ML-KEM-512", "ML-KEM-768", "ML-DSA-65", "P-256", "P-384"]);
    for agg in &eval.aggregates {
        assert_eq!(agg.samples, 4);
        assert!((agg.mean_ms - 0.25).abs() < 1e-9);
    }

    let dir = tempfile::tempdir().unwrap();
    let csv = CsvSink::new(dir.path().join("csv"));
    let jsonl = JsonlSink::with_env(dir.path().join("history.jsonl"), EnvironmentInfo::default());
    let html = HtmlSink::new(dir.path().join("report.html"));
    eval.deliver(&meta, &csv).unwrap();
    eval.deliver(&meta, &jsonl).unwrap();
    eval.deliver(&meta, &html).unwrap();

    let paths = csv.paths(&pqc_bench::pipeline::EvaluationReport {
        meta: &meta,
        evaluation: &eval,
    });
    let times = std::fs::read_to_string(&paths.times).unwrap();
    let mut lines = times.lines();
    assert_eq!(lines.next().unwrap(), TIMES_HEADERS.join(","));
    assert_eq!(lines.count(), 5 * 3 * 4);
    assert!(paths.times.file_name().unwrap().to_string_lossy().contains("_times-4x_mlkem-mldsa-ecdsa"));
    assert!(paths.aggregates.exists());
    assert!(paths.sizes.exists());

    let records = jsonl.read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].meta.record_id, meta.record_id);
    assert_eq!(records[0].runs.len(), 5);
    assert_eq!(records[0].meta.rules_sha256.len(), 64);

    let page = std::fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(page.contains("\"ML-DSA-65\""));
}

#[test]
fn test_aborted_run_still_delivers_partial_tables() {
    let provider = mock(MockConfig::new("mock").open_fails("ML-KEM-1024"));
    let fams = families(&["mlkem", "mldsa"]);
    let (eval, meta) = evaluate(
        &provider,
        &fams,
        &[1, 2, 3, 4, 5],
        BenchmarkConfig::new(2, 0),
        FailurePolicy::Abort,
    );
    assert_eq!(eval.runs.len(), 2);
    assert_eq!(eval.aborted.as_ref().unwrap().variant, "ML-KEM-1024");

    let dir = tempfile::tempdir().unwrap();
    let jsonl = JsonlSink::with_env(dir.path().join("h.jsonl"), EnvironmentInfo::default());
    eval.deliver(&meta, &jsonl).unwrap();
    let record = &jsonl.read_all().unwrap()[0];
    assert_eq!(record.aborted.as_ref().unwrap().level, 5);
    assert_eq!(record.aggregates.len(), 2 * 3);
}

#[test]
fn test_skip_policy_and_correctness_counting() {
    let provider = mock(
        MockConfig::new("mock")
            .produce_errors("ML-DSA-44")
            .consume_fails_on("ML-KEM-512", 2),
    );
    let fams = families(&["mldsa", "mlkem"]);
    let (eval, _) = evaluate(
        &provider,
        &fams,
        &[1, 2],
        BenchmarkConfig::new(3, 0),
        FailurePolicy::Skip,
    );
    assert_eq!(eval.failures.len(), 1);
    assert_eq!(eval.failures[0].variant, "ML-DSA-44");
    assert_eq!(eval.runs.len(), 1);
    assert_eq!(eval.correctness_failures(), 1);

    // the failing iteration is still timed
    let consumes = eval
        .samples
        .iter()
        .filter(|s| s.operation == OperationKind::Consume)
        .count();
    assert_eq!(consumes, 3);
    assert_eq!(eval.samples.iter().filter(|s| !s.correct).count(), 3);
}

#[test]
fn test_sessions_released_every_iteration() {
    let provider = mock(MockConfig::new("mock"));
    let fams = families(&["ecdsa"]);
    evaluate(
        &provider,
        &fams,
        &[1, 3],
        BenchmarkConfig::new(3, 2),
        FailurePolicy::Abort,
    );
    let c = provider.counters();
    assert_eq!(c.sessions_opened, 2 * 5);
    assert_eq!(c.sessions_released, c.sessions_opened);
}
