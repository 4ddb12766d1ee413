//! Warm-up/measure protocol for one variant, identical for every primitive kind.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info, warn};

use crate::BenchResult;
use crate::core::{BenchmarkConfig, OperationKind, PrimitiveKind, SizeRecord, TimingSample};
use crate::provider::{Clock, MonotonicClock, PrimitiveProvider, Session};

/// Length of the random message signed (and ignored by KEMs) per iteration.
pub const MESSAGE_LEN: usize = 60;

/// Everything measured for one variant.
#[derive(Debug, Clone)]
pub struct BenchmarkOutcome {
    pub variant: String,
    pub kind: PrimitiveKind,
    /// `measured_runs` samples per operation, in run order
    pub samples: Vec<TimingSample>,
    pub sizes: Option<SizeRecord>,
    /// Iterations whose consume step reported a mismatch, warm-up included
    pub correctness_failures: usize,
}

/// Drives a provider through keygen/produce/consume iterations.
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    clock: Arc<dyn Clock>,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig) -> Self {
        BenchmarkRunner {
            config,
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    /// Replace the time source read around each timed call.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Benchmark one variant.
    ///
    /// The configuration is validated before the provider is touched. Sizes
    /// are read once up front. Every iteration gets its own session, released
    /// when the iteration ends however it ends.
    pub fn run(
        &self,
        kind: PrimitiveKind,
        variant: &str,
        provider: &dyn PrimitiveProvider,
    ) -> BenchResult<BenchmarkOutcome> {
        let (measured, warmup) = self.config.validate()?;

        let sizes = provider.details(kind, variant)?.size_record(variant, kind);

        let mut rng = rand::thread_rng();
        let mut correctness_failures = 0;
        let mut samples = Vec::with_capacity(measured * OperationKind::ALL.len());

        debug!(variant, kind = %kind, warmup, measured, "starting benchmark");

        for i in 0..warmup + measured {
            let is_warmup = i < warmup;
            let message = random_message(&mut rng);

            let (durations, correct) = {
                let mut session = provider.open(kind, variant)?;
                self.iteration(session.as_mut(), &message)?
            };

            if !correct {
                correctness_failures += 1;
                warn!(variant, run = i, warmup = is_warmup, "correctness check failed");
            }

            // Only collect times for measured iterations
            if !is_warmup {
                let run = i - warmup;
                for (operation, duration_ms) in OperationKind::ALL.into_iter().zip(durations) {
                    samples.push(TimingSample {
                        variant: variant.to_string(),
                        operation,
                        duration_ms,
                        run,
                        correct,
                    });
                }
            }
        }

        info!(
            variant,
            samples = samples.len(),
            correctness_failures,
            "benchmark complete"
        );

        Ok(BenchmarkOutcome {
            variant: variant.to_string(),
            kind,
            samples,
            sizes,
            correctness_failures,
        })
    }

    /// One keygen/produce/consume pass, each call in its own timing bracket.
    fn iteration(&self, session: &mut dyn Session, message: &[u8]) -> BenchResult<([f64; 3], bool)> {
        let ((), keygen_ms) = self.timed(|| session.generate_keypair())?;
        let ((), produce_ms) = self.timed(|| session.produce(message))?;
        let (correct, consume_ms) = self.timed(|| session.consume(message))?;
        Ok(([keygen_ms, produce_ms, consume_ms], correct))
    }

    fn timed<T>(&self, op: impl FnOnce() -> BenchResult<T>) -> BenchResult<(T, f64)> {
        let start = self.clock.now();
        let out = op();
        let end = self.clock.now();
        Ok((out?, to_ms(end.saturating_sub(start))))
    }
}

fn to_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1e6
}

fn random_message(rng: &mut impl Rng) -> Vec<u8> {
    rng.sample_iter(&Alphanumeric).take(MESSAGE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BenchError;
    use crate::provider::{MockConfig, MockProvider};

    fn runner(provider: &MockProvider, measured: i64, warmup: i64) -> BenchmarkRunner {
        BenchmarkRunner::new(BenchmarkConfig::new(measured, warmup)).with_clock(provider.clock())
    }

    #[test]
    fn test_random_message_is_alphanumeric() {
        let msg = random_message(&mut rand::thread_rng());
        assert_eq!(msg.len(), MESSAGE_LEN);
        assert!(msg.iter().all(u8::is_ascii_alphanumeric));
    }

    #[test]
    fn test_exactly_n_samples_per_operation() {
        let provider = MockProvider::new(MockConfig::new("m").with_kem("K", 1));
        let out = runner(&provider, 7, 3).run(PrimitiveKind::Kem, "K", &provider).unwrap();
        for op in OperationKind::ALL {
            let runs: Vec<usize> = out
                .samples
                .iter()
                .filter(|s| s.operation == op)
                .map(|s| s.run)
                .collect();
            assert_eq!(runs, (0..7).collect::<Vec<_>>());
        }
        assert_eq!(provider.counters().sessions_opened, 10);
    }

    #[test]
    fn test_mock_cost_recorded_exactly() {
        let provider = MockProvider::new(
            MockConfig::new("m")
                .with_sig("S", 2)
                .with_op_cost(Duration::from_millis(2)),
        );
        let out = runner(&provider, 5, 2).run(PrimitiveKind::Sig, "S", &provider).unwrap();
        assert_eq!(out.samples.len(), 15);
        assert!(out.samples.iter().all(|s| s.duration_ms == 2.0));
        assert_eq!(out.correctness_failures, 0);
    }

    #[test]
    fn test_invalid_config_makes_no_provider_calls() {
        for (measured, warmup) in [(0, 0), (-1, 0), (3, -1)] {
            let provider = MockProvider::new(MockConfig::new("m").with_kem("K", 1));
            let err = runner(&provider, measured, warmup)
                .run(PrimitiveKind::Kem, "K", &provider)
                .unwrap_err();
            assert!(matches!(err, BenchError::InvalidConfig(_)));
            assert_eq!(provider.counters().provider_calls, 0);
        }
    }

    #[test]
    fn test_correctness_failure_counted_not_raised() {
        // consumes 1-2 are warm-up; the 3rd is measured run 0
        let provider = MockProvider::new(MockConfig::new("m").with_kem("K", 1).consume_fails_on("K", 3));
        let out = runner(&provider, 3, 2).run(PrimitiveKind::Kem, "K", &provider).unwrap();
        assert_eq!(out.correctness_failures, 1);
        assert_eq!(out.samples.len(), 9);
        let consume = out
            .samples
            .iter()
            .find(|s| s.operation == OperationKind::Consume && s.run == 0)
            .unwrap();
        assert!(!consume.correct);
        assert!(out.samples.iter().filter(|s| s.run > 0).all(|s| s.correct));
    }

    #[test]
    fn test_warmup_failures_also_counted() {
        let provider = MockProvider::new(MockConfig::new("m").with_kem("K", 1).consume_fails_on("K", 1));
        let out = runner(&provider, 1, 1).run(PrimitiveKind::Kem, "K", &provider).unwrap();
        assert_eq!(out.correctness_failures, 1);
        assert!(out.samples.iter().all(|s| s.correct));
    }

    #[test]
    fn test_session_released_when_operation_errors() {
        let provider = MockProvider::new(MockConfig::new("m").with_sig("S", 1).produce_errors("S"));
        let err = runner(&provider, 4, 0).run(PrimitiveKind::Sig, "S", &provider).unwrap_err();
        assert!(matches!(err, BenchError::Provider { .. }));
        let c = provider.counters();
        assert_eq!(c.sessions_opened, 1);
        assert_eq!(c.sessions_released, 1);
        assert_eq!(c.consume_calls, 0);
    }

    #[test]
    fn test_every_session_released() {
        let provider = MockProvider::new(MockConfig::new("m").with_kem("K", 1));
        runner(&provider, 4, 2).run(PrimitiveKind::Kem, "K", &provider).unwrap();
        let c = provider.counters();
        assert_eq!(c.sessions_opened, 6);
        assert_eq!(c.sessions_released, 6);
    }

    #[test]
    fn test_provider_unavailable_propagates() {
        let provider = MockProvider::new(MockConfig::new("m").with_kem("K", 1).open_fails("K"));
        let err = runner(&provider, 2, 0).run(PrimitiveKind::Kem, "K", &provider).unwrap_err();
        assert!(matches!(err, BenchError::ProviderUnavailable { .. }));

        let err = runner(&provider, 2, 0)
            .run(PrimitiveKind::Kem, "Nope", &provider)
            .unwrap_err();
        assert!(matches!(err, BenchError::ProviderUnavailable { .. }));
    }

    #[test]
    fn test_sizes_independent_of_config() {
        let provider = MockProvider::new(MockConfig::new("m").with_kem("K", 3));
        let a = runner(&provider, 1, 0).run(PrimitiveKind::Kem, "K", &provider).unwrap();
        let b = runner(&provider, 4, 2).run(PrimitiveKind::Kem, "K", &provider).unwrap();
        assert_eq!(a.sizes, b.sizes);
        let sizes = a.sizes.unwrap();
        assert_eq!(sizes.level, Some(3));
        assert_eq!(sizes.ciphertext, Some(768));
    }
}
