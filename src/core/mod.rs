//! Core types shared by the catalog, runner, aggregator and sinks.

pub mod env;
pub mod schema;

// Re-export key types for convenience
pub use env::EnvironmentInfo;
pub use schema::{
    ArtifactLengths, BenchmarkConfig, MechanismDetails, OperationKind, PrimitiveKind,
    SCHEMA_VERSION, SECURITY_LEVELS, SizeRecord, TimingAggregate, TimingSample,
};
