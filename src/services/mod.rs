//! Services Layer
//!
//! Business logic shared by the HTTP handlers and the binary. Handlers stay
//! thin and delegate here.

pub mod reconciliation_service;
pub mod repair_runs;

pub use reconciliation_service::{ReconciliationService, RepairOutcome};
pub use repair_runs::{RepairRun, RepairRunStatus, RunRegistry};
