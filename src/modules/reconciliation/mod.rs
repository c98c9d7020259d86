//! Inventory reconciliation engine
//!
//! Detects books whose aggregate counters, status flag or codes disagree
//! with their copy and borrowing rows, plans the writes that bring them back
//! in line and applies those writes best-effort:
//!
//! - [`scanner`] classifies every book from an [`InventorySnapshot`]
//! - [`health`] rolls the diagnoses up into a [`HealthReport`]
//! - [`planner`] turns a snapshot and a [`RepairScope`] into a [`RepairPlan`]
//! - [`executor`] applies a plan, reporting [`RepairProgress`] as it goes

pub mod code_allocator;
pub mod error;
pub mod executor;
pub mod health;
pub mod planner;
pub mod progress;
pub mod scanner;

pub use code_allocator::CodeAllocator;
pub use error::ReconcileError;
pub use executor::{ExecutionSummary, RepairExecutor};
pub use health::{HealthReport, IssueCounters, summarize};
pub use planner::{CodeTarget, RepairOperation, RepairPlan, RepairScope, plan_repair};
pub use progress::{RepairFailure, RepairProgress, RunPhase};
pub use scanner::{BookDiagnosis, InventorySnapshot, IssueType, diagnose};
