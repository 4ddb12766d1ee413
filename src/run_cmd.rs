//! CLI command handler for `run`.
//!
//! Resolves the requested families against the built-in provider, benchmarks
//! every variant, then hands the (possibly partial) evaluation to each sink.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::catalog::{ECDSA_FAMILY, MechanismCatalog, MechanismRules};
use crate::core::BenchmarkConfig;
use crate::pipeline::{EvaluationPipeline, FailurePolicy, ResultSink, RunMeta};
use crate::provider::{BuiltinProvider, PrimitiveProvider};
use crate::report::HtmlSink;
use crate::runner::BenchmarkRunner;
use crate::storage::{CsvSink, JsonlSink};
use crate::{BenchError, BenchResult};

/// Options for one `run` invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub kem: Vec<String>,
    pub sig: Vec<String>,
    pub ecdsa: bool,
    pub levels: Vec<u8>,
    pub measured_runs: i64,
    pub warmup_runs: i64,
    pub out_dir: PathBuf,
    pub rules: Option<PathBuf>,
    pub on_error: FailurePolicy,
    pub csv: bool,
    pub history: Option<PathBuf>,
    pub html: Option<PathBuf>,
}

impl RunOptions {
    /// Requested families: KEM families, then signature families, then the baseline.
    pub fn families(&self) -> Vec<String> {
        let mut out: Vec<String> = self.kem.iter().chain(self.sig.iter()).cloned().collect();
        if self.ecdsa {
            out.push(ECDSA_FAMILY.to_string());
        }
        out
    }
}

pub fn load_rules(path: Option<&PathBuf>) -> BenchResult<MechanismRules> {
    match path {
        Some(p) => MechanismRules::load(p),
        None => MechanismRules::builtin(),
    }
}

/// Run the `run` command against the built-in provider.
pub fn run(opts: RunOptions) -> BenchResult<()> {
    let provider = BuiltinProvider::new();
    run_with_provider(&opts, &provider)
}

/// Evaluate and deliver; fails after delivery when the run aborted or saw
/// verification failures.
pub fn run_with_provider(opts: &RunOptions, provider: &dyn PrimitiveProvider) -> BenchResult<()> {
    let families = opts.families();
    if families.is_empty() {
        return Err(BenchError::InvalidConfig(
            "no families requested (use --kem, --sig or --ecdsa)".into(),
        ));
    }

    let config = BenchmarkConfig::new(opts.measured_runs, opts.warmup_runs);
    let catalog = MechanismCatalog::new(load_rules(opts.rules.as_ref())?);
    let pipeline = EvaluationPipeline::new(&catalog, BenchmarkRunner::new(config))
        .with_policy(opts.on_error);

    let evaluation = pipeline.evaluate(&families, &opts.levels, provider)?;
    let meta = RunMeta::new(
        provider,
        config,
        &families,
        &opts.levels,
        catalog.rules().fingerprint(),
    );

    let mut sinks: Vec<Box<dyn ResultSink>> = Vec::new();
    if opts.csv {
        sinks.push(Box::new(CsvSink::new(opts.out_dir.clone())));
    }
    if let Some(path) = &opts.history {
        sinks.push(Box::new(JsonlSink::new(path)));
    }
    if let Some(path) = &opts.html {
        sinks.push(Box::new(HtmlSink::new(path)));
    }
    for sink in &sinks {
        evaluation.deliver(&meta, sink.as_ref())?;
    }

    eprintln!(
        "Benchmarked {} variant(s), {} skipped, {} verification failure(s)",
        evaluation.runs.len(),
        evaluation.failures.len(),
        evaluation.correctness_failures()
    );

    if let Some(failure) = &evaluation.aborted {
        return Err(BenchError::Message(format!(
            "evaluation aborted at `{}` (family `{}`, level {}): {}",
            failure.variant, failure.family, failure.level, failure.error
        )));
    }
    for failure in &evaluation.failures {
        warn!(variant = %failure.variant, error = %failure.error, "variant skipped");
    }
    let bad = evaluation.correctness_failures();
    if bad > 0 {
        return Err(BenchError::Message(format!(
            "{bad} iteration(s) failed verification"
        )));
    }
    info!(record_id = %meta.record_id, "run complete");
    Ok(())
}
