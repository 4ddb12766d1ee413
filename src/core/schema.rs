//! Shared data model for resolution, measurement and aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BenchError, BenchResult};

/// Schema version for forward compatibility of persisted run records
pub const SCHEMA_VERSION: u32 = 1;

/// Claimed NIST security categories a variant may be tagged with.
pub const SECURITY_LEVELS: [u8; 5] = [1, 2, 3, 4, 5];

/// Which primitive API a variant is driven through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Kem,
    Sig,
    Ecdsa,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Kem => "kem",
            PrimitiveKind::Sig => "sig",
            PrimitiveKind::Ecdsa => "ecdsa",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three timed phases of one iteration.
///
/// `Produce` is encapsulation or signing, `Consume` is decapsulation or verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Keygen,
    Produce,
    Consume,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Keygen,
        OperationKind::Produce,
        OperationKind::Consume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Keygen => "keygen",
            OperationKind::Produce => "produce",
            OperationKind::Consume => "consume",
        }
    }

    /// Human label for a primitive kind, e.g. "encapsulate" or "sign".
    pub fn label(&self, kind: PrimitiveKind) -> &'static str {
        match (self, kind) {
            (OperationKind::Keygen, _) => "keypair",
            (OperationKind::Produce, PrimitiveKind::Kem) => "encapsulate",
            (OperationKind::Consume, PrimitiveKind::Kem) => "decapsulate",
            (OperationKind::Produce, _) => "sign",
            (OperationKind::Consume, _) => "verify",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run configuration for one benchmark invocation.
///
/// Fields are signed so that out-of-range input survives until [`BenchmarkConfig::validate`]
/// can reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub measured_runs: i64,
    pub warmup_runs: i64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            measured_runs: 1,
            warmup_runs: 0,
        }
    }
}

impl BenchmarkConfig {
    pub fn new(measured_runs: i64, warmup_runs: i64) -> Self {
        BenchmarkConfig {
            measured_runs,
            warmup_runs,
        }
    }

    /// Returns `(measured, warmup)` as counts, or `InvalidConfig`.
    pub fn validate(&self) -> BenchResult<(usize, usize)> {
        if self.measured_runs <= 0 {
            return Err(BenchError::InvalidConfig(format!(
                "measured runs must be positive, got {}",
                self.measured_runs
            )));
        }
        if self.warmup_runs < 0 {
            return Err(BenchError::InvalidConfig(format!(
                "warm-up runs must be non-negative, got {}",
                self.warmup_runs
            )));
        }
        Ok((self.measured_runs as usize, self.warmup_runs as usize))
    }
}

/// One timed call of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSample {
    pub variant: String,
    pub operation: OperationKind,
    pub duration_ms: f64,
    pub run: usize,
    /// Whether the iteration's consume step succeeded
    pub correct: bool,
}

/// Descriptive statistics for one `(variant, operation)` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingAggregate {
    pub variant: String,
    pub operation: OperationKind,
    pub samples: usize,
    pub mean_ms: f64,
    /// Sample standard deviation; undefined below two samples
    pub stddev_ms: Option<f64>,
    pub min_ms: f64,
    pub max_ms: f64,
    pub median_ms: f64,
}

/// Artifact sizes and security metadata, fetched once per variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRecord {
    pub variant: String,
    pub kind: PrimitiveKind,
    pub level: Option<u8>,
    pub public_key: usize,
    pub secret_key: usize,
    pub ciphertext: Option<usize>,
    pub shared_secret: Option<usize>,
    pub signature: Option<usize>,
    pub ind_cca2: Option<bool>,
    pub euf_cma: Option<bool>,
}

/// Lengths reported by a provider, shaped by primitive kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactLengths {
    Kem {
        public_key: usize,
        secret_key: usize,
        ciphertext: usize,
        shared_secret: usize,
    },
    Signature {
        public_key: usize,
        secret_key: usize,
        signature: usize,
    },
}

/// Everything a provider reports about one variant without running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MechanismDetails {
    pub claimed_nist_level: Option<u8>,
    pub lengths: Option<ArtifactLengths>,
    /// IND-CCA2 for KEMs, EUF-CMA for signatures
    pub security_notion: Option<bool>,
}

impl MechanismDetails {
    /// Flatten into a size row; `None` when the provider reports no lengths.
    pub fn size_record(&self, variant: &str, kind: PrimitiveKind) -> Option<SizeRecord> {
        let lengths = self.lengths?;
        let mut record = SizeRecord {
            variant: variant.to_string(),
            kind,
            level: self.claimed_nist_level,
            public_key: 0,
            secret_key: 0,
            ciphertext: None,
            shared_secret: None,
            signature: None,
            ind_cca2: None,
            euf_cma: None,
        };
        match lengths {
            ArtifactLengths::Kem {
                public_key,
                secret_key,
                ciphertext,
                shared_secret,
            } => {
                record.public_key = public_key;
                record.secret_key = secret_key;
                record.ciphertext = Some(ciphertext);
                record.shared_secret = Some(shared_secret);
                record.ind_cca2 = self.security_notion;
            }
            ArtifactLengths::Signature {
                public_key,
                secret_key,
                signature,
            } => {
                record.public_key = public_key;
                record.secret_key = secret_key;
                record.signature = Some(signature);
                record.euf_cma = self.security_notion;
            }
        }
        Some(record)
    }
}
