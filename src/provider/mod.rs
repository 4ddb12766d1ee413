//! Primitive providers: the operations being measured and their metadata.
//!
//! The runner only sees [`PrimitiveProvider`] and [`Session`]; concrete
//! providers live alongside.

pub mod builtin;
pub mod mock;
pub mod traits;

// Re-export key types
pub use builtin::{BuiltinProvider, CurveScheme, KemScheme, SignatureScheme};
pub use mock::{MockConfig, MockCounters, MockMechanism, MockProvider};
pub use traits::{Clock, ManualClock, MonotonicClock, PrimitiveProvider, Session};
