//! Codec round-trip conformance harness
//!
//! Drives an encoder/decoder pair through one encode, decode and verify
//! cycle, waiting a bounded time for each asynchronously delivered result.
//! Codec families are plugged in by composition ([`CodecFamily`]) and
//! collected into suites by the [`TestRegistry`].

pub mod config;
pub mod error;
pub mod family;
pub mod harness;
pub mod registry;
pub mod state;
pub mod synchronizer;

// Re-export commonly used types
pub use config::{ClipConfig, CodecToggles, HarnessConfig, LoggingConfig};
pub use error::{FailureReason, HarnessError, Stage, TestFailure};
pub use family::CodecFamily;
pub use harness::{CodecHarness, RoundTripChecks, RoundTripReport, TestCase};
pub use registry::{CaseError, CaseOutcome, CaseResult, SuiteReport, TestRegistry};
pub use state::RoundTripState;
pub use synchronizer::{Synchronizer, WaitOutcome};
