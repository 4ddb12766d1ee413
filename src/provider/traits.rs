//! Provider and per-iteration session abstractions, plus the timing clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::BenchResult;
use crate::core::{MechanismDetails, PrimitiveKind};

/// Key material and artifacts for one benchmark iteration.
///
/// The three calls are made in order and each consumes state left by the
/// previous one. Dropping the session releases everything it holds.
pub trait Session {
    /// Generate a fresh keypair and keep it for the rest of the iteration.
    fn generate_keypair(&mut self) -> BenchResult<()>;

    /// Encapsulate to the public key, or sign `message`.
    fn produce(&mut self, message: &[u8]) -> BenchResult<()>;

    /// Decapsulate and compare shared secrets, or verify the signature.
    ///
    /// `Ok(false)` is a correctness failure, not an error.
    fn consume(&mut self, message: &[u8]) -> BenchResult<bool>;
}

/// Source of cryptographic operations and mechanism metadata.
pub trait PrimitiveProvider {
    /// Returns the provider name (e.g., "builtin", "mock").
    fn name(&self) -> &str;

    /// Returns the provider version, if available.
    fn version(&self) -> Option<String>;

    /// Variant names the provider can run, in enumeration order.
    fn enabled_mechanisms(&self, kind: PrimitiveKind) -> Vec<String>;

    /// Static metadata; never runs an operation.
    ///
    /// Unknown variants yield `ProviderUnavailable`.
    fn details(&self, kind: PrimitiveKind, variant: &str) -> BenchResult<MechanismDetails>;

    /// Open an independent session for a single iteration.
    fn open(&self, kind: PrimitiveKind, variant: &str) -> BenchResult<Box<dyn Session + '_>>;
}

/// Monotonic time source read around each timed call.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
