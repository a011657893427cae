//! pubmend resolver - conflict parsing, reconciliation, and orchestration
//!
//! The engine's decision layer: collect version signals, reconcile them
//! into a recommendation, parse solver output into conflicts, and drive
//! the transactional backup/detect/resolve/verify cycle.

pub mod conflict;
pub mod orchestrator;
pub mod reconciler;
pub mod runner;
pub mod signals;

pub use conflict::{annotate, dedupe, parse, DependencyConflict, SDK_SENTINEL};
pub use orchestrator::{
    ResolutionAttempt, ResolutionOrchestrator, ResolutionReport, RunState, UnresolvedReason,
};
pub use reconciler::{plan_update, reconcile, UpdatePlan, VersionAnalysis};
pub use runner::{CommandOutput, PubGetRunner, ResolutionRunner};
pub use signals::{collect, SignalSet};
