//! End-to-end evaluation: resolve, benchmark each variant, aggregate, deliver.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::aggregate::aggregate;
use crate::catalog::{MechanismCatalog, ResolvedFamily};
use crate::core::{BenchmarkConfig, PrimitiveKind, SizeRecord, TimingAggregate, TimingSample};
use crate::provider::PrimitiveProvider;
use crate::runner::BenchmarkRunner;
use crate::{BenchError, BenchResult};

/// What to do when one variant cannot be benchmarked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failing variant and keep what was measured so far.
    #[default]
    Abort,
    /// Record the failure and continue with the next variant.
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(BenchError::InvalidConfig(format!(
                "unknown failure policy `{other}` (expected abort or skip)"
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailurePolicy::Abort => "abort",
            FailurePolicy::Skip => "skip",
        })
    }
}

/// One benchmarked variant and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRun {
    pub family: String,
    pub kind: PrimitiveKind,
    pub level: u8,
    pub variant: String,
    pub correctness_failures: usize,
}

/// A variant that could not be benchmarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFailure {
    pub family: String,
    pub level: u8,
    pub variant: String,
    pub error: String,
}

/// Result of one pipeline invocation. Complete or partial.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub resolved: Vec<ResolvedFamily>,
    pub samples: Vec<TimingSample>,
    pub aggregates: Vec<TimingAggregate>,
    pub sizes: Vec<SizeRecord>,
    /// Successfully benchmarked variants, in run order
    pub runs: Vec<VariantRun>,
    /// Variants skipped under [`FailurePolicy::Skip`]
    pub failures: Vec<VariantFailure>,
    /// The variant that stopped the run under [`FailurePolicy::Abort`]
    pub aborted: Option<VariantFailure>,
}

impl Evaluation {
    pub fn correctness_failures(&self) -> usize {
        self.runs.iter().map(|r| r.correctness_failures).sum()
    }

    /// True when every resolved variant was benchmarked.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && self.failures.is_empty()
    }

    /// Variants grouped by claimed level, each group in run order.
    pub fn by_level(&self) -> BTreeMap<u8, Vec<&VariantRun>> {
        let mut out: BTreeMap<u8, Vec<&VariantRun>> = BTreeMap::new();
        for run in &self.runs {
            out.entry(run.level).or_default().push(run);
        }
        out
    }

    pub fn level_of(&self, variant: &str) -> Option<u8> {
        self.runs.iter().find(|r| r.variant == variant).map(|r| r.level)
    }

    /// Hand the tables to a sink.
    pub fn deliver(&self, meta: &RunMeta, sink: &dyn ResultSink) -> BenchResult<()> {
        sink.deliver(&EvaluationReport {
            meta,
            evaluation: self,
        })
    }
}

/// Provenance recorded alongside every delivered evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMeta {
    pub record_id: String,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub provider: String,
    pub provider_version: Option<String>,
    pub config: BenchmarkConfig,
    pub families: Vec<String>,
    pub levels: Vec<u8>,
    pub rules_sha256: String,
}

impl RunMeta {
    pub fn new(
        provider: &dyn PrimitiveProvider,
        config: BenchmarkConfig,
        families: &[String],
        levels: &[u8],
        rules_sha256: &str,
    ) -> Self {
        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let record_id = format!(
            "{:x}-{}",
            nanos,
            timestamp
                .get(..19)
                .unwrap_or_default()
                .replace([':', '-', 'T'], "")
        );
        RunMeta {
            record_id,
            timestamp,
            provider: provider.name().to_string(),
            provider_version: provider.version(),
            config,
            families: families.to_vec(),
            levels: levels.to_vec(),
            rules_sha256: rules_sha256.to_string(),
        }
    }

    /// `YYYYMMDD-HHMMSS` prefix for output file names.
    pub fn file_stamp(&self) -> String {
        self.timestamp
            .get(..19)
            .map(|s| s.replace(['-', ':'], "").replace('T', "-"))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Borrowed view handed to a [`ResultSink`].
#[derive(Debug, Clone, Copy)]
pub struct EvaluationReport<'a> {
    pub meta: &'a RunMeta,
    pub evaluation: &'a Evaluation,
}

impl<'a> EvaluationReport<'a> {
    pub fn samples(&self) -> &'a [TimingSample] {
        &self.evaluation.samples
    }

    pub fn aggregates(&self) -> &'a [TimingAggregate] {
        &self.evaluation.aggregates
    }

    pub fn sizes(&self) -> &'a [SizeRecord] {
        &self.evaluation.sizes
    }

    pub fn level_of(&self, variant: &str) -> Option<u8> {
        self.evaluation.level_of(variant)
    }
}

/// Destination for evaluation results. The only place I/O happens.
pub trait ResultSink {
    fn name(&self) -> &str;

    fn deliver(&self, report: &EvaluationReport<'_>) -> BenchResult<()>;
}

/// Composes catalog, runner and aggregator. Strictly sequential.
pub struct EvaluationPipeline<'a> {
    catalog: &'a MechanismCatalog,
    runner: BenchmarkRunner,
    policy: FailurePolicy,
}

impl<'a> EvaluationPipeline<'a> {
    pub fn new(catalog: &'a MechanismCatalog, runner: BenchmarkRunner) -> Self {
        EvaluationPipeline {
            catalog,
            runner,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve `families` at `levels` and benchmark every variant in order.
    ///
    /// Configuration and resolution errors are returned as `Err`. A variant
    /// that fails to run is recorded according to the policy; the returned
    /// evaluation then holds everything measured before (and, when skipping,
    /// after) it.
    pub fn evaluate(
        &self,
        families: &[String],
        levels: &[u8],
        provider: &dyn PrimitiveProvider,
    ) -> BenchResult<Evaluation> {
        self.runner.config().validate()?;
        let resolved = self.catalog.resolve_all(families, provider, levels)?;

        let mut eval = Evaluation {
            resolved: resolved.clone(),
            ..Default::default()
        };

        // A variant matched by two requested families is measured once,
        // under the first family that claims it.
        let mut claimed: BTreeMap<(PrimitiveKind, String), String> = BTreeMap::new();

        'families: for family in &resolved {
            for (level, variant) in family.iter() {
                let key = (family.kind, variant.to_string());
                if let Some(owner) = claimed.get(&key) {
                    warn!(
                        variant,
                        family = %family.family,
                        claimed_by = %owner,
                        "variant already benchmarked, skipping"
                    );
                    continue;
                }
                claimed.insert(key, family.family.clone());
                match self.runner.run(family.kind, variant, provider) {
                    Ok(outcome) => {
                        eval.samples.extend(outcome.samples);
                        eval.sizes.extend(outcome.sizes);
                        eval.runs.push(VariantRun {
                            family: family.family.clone(),
                            kind: family.kind,
                            level,
                            variant: variant.to_string(),
                            correctness_failures: outcome.correctness_failures,
                        });
                    }
                    Err(e) => {
                        let failure = VariantFailure {
                            family: family.family.clone(),
                            level,
                            variant: variant.to_string(),
                            error: e.to_string(),
                        };
                        match self.policy {
                            FailurePolicy::Abort => {
                                error!(variant, error = %e, "aborting evaluation");
                                eval.aborted = Some(failure);
                                break 'families;
                            }
                            FailurePolicy::Skip => {
                                warn!(variant, error = %e, "skipping variant");
                                eval.failures.push(failure);
                            }
                        }
                    }
                }
            }
        }

        eval.aggregates = aggregate(&eval.samples);
        info!(
            variants = eval.runs.len(),
            samples = eval.samples.len(),
            correctness_failures = eval.correctness_failures(),
            complete = eval.is_complete(),
            "evaluation finished"
        );
        Ok(eval)
    }
}
