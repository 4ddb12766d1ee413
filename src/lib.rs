pub mod aggregate;
pub mod catalog;
pub mod core;
pub mod list_cmd;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod run_cmd;
pub mod runner;
pub mod storage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    /// A family identifier with no registered rule.
    #[error("unknown mechanism family `{family}`")]
    UnknownFamily { family: String },
    /// The provider matched a name but reported no claimed security level for it.
    #[error("provider reported no security level for `{variant}` (family `{family}`)")]
    MissingLevel { family: String, variant: String },
    #[error("invalid benchmark configuration: {0}")]
    InvalidConfig(String),
    /// The backend cannot instantiate the variant (e.g. disabled at build time).
    #[error("provider cannot instantiate `{variant}`")]
    ProviderUnavailable { variant: String },
    #[error("provider operation failed for `{variant}`: {reason}")]
    Provider { variant: String, reason: String },
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type BenchResult<T> = Result<T, BenchError>;

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}
