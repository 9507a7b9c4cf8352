//! A library for handing crash dumps to an external analysis engine and
//! turning its output into an always-valid incident summary.
//!
//! The engine itself (symbolication, stack walking, suspect heuristics) is an
//! opaque collaborator. This crate owns the two subsystems around it:
//!
//! * the [`ExecutionBridge`], which decides how to invoke the engine (a
//!   direct call into its library, or a separate headless host process),
//!   manages cancellation, and folds every failure mode into one
//!   [`ExecutionResult`] contract, and
//! * report ingestion ([`ingest`]), which parses the engine's
//!   loosely-structured summary document into an [`AnalysisSummary`]
//!   field-by-field, so one malformed field never takes down the whole
//!   report.
//!
//! [`TriageSession`] ties the two together and guarantees at most one
//! analysis run is in flight per session.
//!
//! ```no_run
//! use dump_triage::{InvocationRequest, TriageSession, ExecutionBridge};
//!
//! # async fn demo() -> Result<(), dump_triage::TriageError> {
//! let session = TriageSession::new(ExecutionBridge::new());
//! let request = InvocationRequest::new("crash.dmp");
//! let analysis = session.analyze(request).await?;
//! println!("{}", analysis.summary.summary_sentence);
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod bridge;
pub mod engine;
pub mod ingest;
pub mod request;
pub mod session;
pub mod summary;

pub use bridge::{ExecutionBridge, ExecutionResult, ExecutionStrategy, HostDiscovery};
pub use engine::{
    AnalyzerEngine, EngineCall, EngineError, EngineStatus, NativeEngine, EXIT_CANCELED,
    EXIT_ENGINE_UNAVAILABLE, EXIT_EXECUTION_FAILED, EXIT_INVALID_INPUT,
};
pub use ingest::IngestError;
pub use request::InvocationRequest;
pub use session::{CompletedAnalysis, TriageError, TriageSession};
pub use summary::{AnalysisSummary, EvidenceItem, ResourceItem, Suspect};
