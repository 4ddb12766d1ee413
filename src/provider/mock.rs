//! Mock provider for testing.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{ArtifactLengths, MechanismDetails, PrimitiveKind};
use crate::{BenchError, BenchResult};

use super::traits::{ManualClock, PrimitiveProvider, Session};

/// A fake mechanism the mock advertises.
#[derive(Debug, Clone)]
pub struct MockMechanism {
    pub kind: PrimitiveKind,
    pub name: String,
    pub level: Option<u8>,
    pub lengths: Option<ArtifactLengths>,
}

/// Configuration for mock provider responses.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Name to report
    pub name: String,
    /// Version to report
    pub version: Option<String>,
    /// Mechanisms in enumeration order
    pub mechanisms: Vec<MockMechanism>,
    /// Simulated duration of every session operation
    pub op_cost: Duration,
    /// Variants whose consume always reports a mismatch
    pub consume_fails: BTreeSet<String>,
    /// `(variant, n)`: the n-th consume (1-based) of that variant reports a mismatch
    pub consume_fails_on: BTreeSet<(String, usize)>,
    /// Variants whose `open` fails while `details` still succeeds
    pub open_fails: BTreeSet<String>,
    /// Variants whose produce step returns an error
    pub produce_errors: BTreeSet<String>,
    /// Variants that are enumerated but whose `details` fails
    pub details_fails: BTreeSet<String>,
}

impl MockConfig {
    /// Create a new mock config with the given name and no mechanisms.
    pub fn new(name: impl Into<String>) -> Self {
        MockConfig {
            name: name.into(),
            version: Some("mock-1.0.0".to_string()),
            mechanisms: Vec::new(),
            op_cost: Duration::from_millis(1),
            consume_fails: BTreeSet::new(),
            consume_fails_on: BTreeSet::new(),
            open_fails: BTreeSet::new(),
            produce_errors: BTreeSet::new(),
            details_fails: BTreeSet::new(),
        }
    }

    /// Add a KEM with plausible lengths.
    pub fn with_kem(self, name: impl Into<String>, level: u8) -> Self {
        self.with_mechanism(MockMechanism {
            kind: PrimitiveKind::Kem,
            name: name.into(),
            level: Some(level),
            lengths: Some(ArtifactLengths::Kem {
                public_key: 800,
                secret_key: 1632,
                ciphertext: 768,
                shared_secret: 32,
            }),
        })
    }

    /// Add a signature scheme with plausible lengths.
    pub fn with_sig(self, name: impl Into<String>, level: u8) -> Self {
        self.with_mechanism(MockMechanism {
            kind: PrimitiveKind::Sig,
            name: name.into(),
            level: Some(level),
            lengths: Some(ArtifactLengths::Signature {
                public_key: 897,
                secret_key: 1281,
                signature: 666,
            }),
        })
    }

    /// Add an elliptic curve.
    pub fn with_curve(self, name: impl Into<String>, level: u8) -> Self {
        self.with_mechanism(MockMechanism {
            kind: PrimitiveKind::Ecdsa,
            name: name.into(),
            level: Some(level),
            lengths: Some(ArtifactLengths::Signature {
                public_key: 65,
                secret_key: 32,
                signature: 64,
            }),
        })
    }

    pub fn with_mechanism(mut self, mechanism: MockMechanism) -> Self {
        self.mechanisms.push(mechanism);
        self
    }

    /// Report no claimed level for `name`.
    pub fn without_level(mut self, name: &str) -> Self {
        for m in self.mechanisms.iter_mut().filter(|m| m.name == name) {
            m.level = None;
        }
        self
    }

    pub fn with_op_cost(mut self, cost: Duration) -> Self {
        self.op_cost = cost;
        self
    }

    /// Make every consume of `variant` report a mismatch.
    pub fn consume_fails(mut self, variant: impl Into<String>) -> Self {
        self.consume_fails.insert(variant.into());
        self
    }

    /// Make only the `nth` consume call (1-based) of `variant` report a mismatch.
    pub fn consume_fails_on(mut self, variant: impl Into<String>, nth: usize) -> Self {
        self.consume_fails_on.insert((variant.into(), nth));
        self
    }

    /// Make `open` fail for `variant`.
    pub fn open_fails(mut self, variant: impl Into<String>) -> Self {
        self.open_fails.insert(variant.into());
        self
    }

    /// Make `details` fail for `variant` while it is still enumerated.
    pub fn details_fails(mut self, variant: impl Into<String>) -> Self {
        self.details_fails.insert(variant.into());
        self
    }

    /// Make produce return an error for `variant`.
    pub fn produce_errors(mut self, variant: impl Into<String>) -> Self {
        self.produce_errors.insert(variant.into());
        self
    }
}

/// Snapshot of how the mock was exercised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCounters {
    /// Every trait call on the provider itself
    pub provider_calls: usize,
    pub sessions_opened: usize,
    pub sessions_released: usize,
    pub keygen_calls: usize,
    pub produce_calls: usize,
    pub consume_calls: usize,
}

/// Mock provider for unit testing.
///
/// Operations do no cryptography; each one advances the shared
/// [`ManualClock`] by the configured cost so recorded timings are exact.
pub struct MockProvider {
    config: MockConfig,
    clock: Arc<ManualClock>,
    counters: Cell<MockCounters>,
    consumes_by_variant: RefCell<BTreeMap<String, usize>>,
}

impl MockProvider {
    /// Create a new mock provider with the given configuration.
    pub fn new(config: MockConfig) -> Self {
        MockProvider {
            config,
            clock: Arc::new(ManualClock::new()),
            counters: Cell::new(MockCounters::default()),
            consumes_by_variant: RefCell::new(BTreeMap::new()),
        }
    }

    /// Clock the runner must read for timings to reflect `op_cost`.
    pub fn clock(&self) -> Arc<ManualClock> {
        Arc::clone(&self.clock)
    }

    pub fn counters(&self) -> MockCounters {
        self.counters.get()
    }

    fn bump(&self, f: impl FnOnce(&mut MockCounters)) {
        let mut c = self.counters.get();
        f(&mut c);
        self.counters.set(c);
    }

    fn find(&self, kind: PrimitiveKind, variant: &str) -> BenchResult<&MockMechanism> {
        self.config
            .mechanisms
            .iter()
            .find(|m| m.kind == kind && m.name == variant)
            .ok_or_else(|| BenchError::ProviderUnavailable {
                variant: variant.to_string(),
            })
    }

    fn next_consume_is_correct(&self, variant: &str) -> bool {
        let mut by_variant = self.consumes_by_variant.borrow_mut();
        let n = by_variant.entry(variant.to_string()).or_insert(0);
        *n += 1;
        !self.config.consume_fails.contains(variant)
            && !self
                .config
                .consume_fails_on
                .contains(&(variant.to_string(), *n))
    }
}

impl PrimitiveProvider for MockProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn version(&self) -> Option<String> {
        self.config.version.clone()
    }

    fn enabled_mechanisms(&self, kind: PrimitiveKind) -> Vec<String> {
        self.bump(|c| c.provider_calls += 1);
        self.config
            .mechanisms
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| m.name.clone())
            .collect()
    }

    fn details(&self, kind: PrimitiveKind, variant: &str) -> BenchResult<MechanismDetails> {
        self.bump(|c| c.provider_calls += 1);
        let m = self.find(kind, variant)?;
        if self.config.details_fails.contains(variant) {
            return Err(BenchError::ProviderUnavailable {
                variant: variant.to_string(),
            });
        }
        Ok(MechanismDetails {
            claimed_nist_level: m.level,
            lengths: m.lengths,
            security_notion: Some(kind != PrimitiveKind::Ecdsa),
        })
    }

    fn open(&self, kind: PrimitiveKind, variant: &str) -> BenchResult<Box<dyn Session + '_>> {
        self.bump(|c| c.provider_calls += 1);
        self.find(kind, variant)?;
        if self.config.open_fails.contains(variant) {
            return Err(BenchError::ProviderUnavailable {
                variant: variant.to_string(),
            });
        }
        self.bump(|c| c.sessions_opened += 1);
        Ok(Box::new(MockSession {
            provider: self,
            variant: variant.to_string(),
            has_keypair: false,
            has_artifact: false,
        }))
    }
}

struct MockSession<'a> {
    provider: &'a MockProvider,
    variant: String,
    has_keypair: bool,
    has_artifact: bool,
}

impl MockSession<'_> {
    fn out_of_order(&self, step: &str) -> BenchError {
        BenchError::Provider {
            variant: self.variant.clone(),
            reason: format!("{step} called out of order"),
        }
    }
}

impl Session for MockSession<'_> {
    fn generate_keypair(&mut self) -> BenchResult<()> {
        self.provider.bump(|c| c.keygen_calls += 1);
        self.provider.clock.advance(self.provider.config.op_cost);
        self.has_keypair = true;
        Ok(())
    }

    fn produce(&mut self, _message: &[u8]) -> BenchResult<()> {
        self.provider.bump(|c| c.produce_calls += 1);
        if !self.has_keypair {
            return Err(self.out_of_order("produce"));
        }
        self.provider.clock.advance(self.provider.config.op_cost);
        if self.provider.config.produce_errors.contains(&self.variant) {
            return Err(BenchError::Provider {
                variant: self.variant.clone(),
                reason: "mock produce failed".into(),
            });
        }
        self.has_artifact = true;
        Ok(())
    }

    fn consume(&mut self, _message: &[u8]) -> BenchResult<bool> {
        self.provider.bump(|c| c.consume_calls += 1);
        if !self.has_artifact {
            return Err(self.out_of_order("consume"));
        }
        self.provider.clock.advance(self.provider.config.op_cost);
        Ok(self.provider.next_consume_is_correct(&self.variant))
    }
}

impl Drop for MockSession<'_> {
    fn drop(&mut self) {
        self.provider.bump(|c| c.sessions_released += 1);
    }
}
