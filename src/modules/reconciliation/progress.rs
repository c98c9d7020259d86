use serde::Serialize;

/// Where a repair run currently is.
///
/// `Idle → Scanning → Planning → Executing → Verifying → Completed`, with
/// `Cancelled` and `Failed` as the other terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Scanning,
    Planning,
    Executing,
    Verifying,
    Completed,
    Cancelled,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::Cancelled | RunPhase::Failed
        )
    }
}

/// Snapshot of a run, emitted after every phase change and every operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairProgress {
    pub phase: RunPhase,
    /// Operations attempted so far
    pub current: usize,
    pub total: usize,
    pub fixed: usize,
    pub failed: usize,
    pub description: String,
}

impl RepairProgress {
    pub fn idle() -> Self {
        Self::at(RunPhase::Idle, "Waiting to start")
    }

    pub fn at(phase: RunPhase, description: impl Into<String>) -> Self {
        Self {
            phase,
            current: 0,
            total: 0,
            fixed: 0,
            failed: 0,
            description: description.into(),
        }
    }
}

/// One operation that could not be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairFailure {
    /// Position of the operation in the plan
    pub index: usize,
    pub description: String,
    pub error: String,
}
