//! Background repair runs
//!
//! A run is started on its own task and tracked in a shared registry so the
//! admin UI can poll its progress and cancel it. Finished runs stay pollable
//! for an hour and are dropped when a later run starts.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{ReconciliationService, RepairOutcome};
use crate::modules::reconciliation::{RepairProgress, RepairScope, RunPhase};
use crate::utils::CancellationToken;

/// How long a finished run stays pollable, in seconds.
pub const FINISHED_RUN_RETENTION_SECS: i64 = 3600;

pub type RunRegistry = Arc<DashMap<Uuid, RepairRun>>;

#[derive(Debug, Clone)]
pub struct RepairRun {
    pub scope: RepairScope,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub progress: RepairProgress,
    pub outcome: Option<RepairOutcome>,
    /// Set when scanning or planning failed
    pub error: Option<String>,
    cancel: CancellationToken,
}

impl RepairRun {
    fn new(scope: RepairScope) -> Self {
        Self {
            scope,
            started_at: Utc::now(),
            finished_at: None,
            progress: RepairProgress::idle(),
            outcome: None,
            error: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn status(&self, run_id: Uuid) -> RepairRunStatus {
        RepairRunStatus {
            run_id,
            scope: self.scope,
            started_at: self.started_at.to_rfc3339(),
            finished_at: self.finished_at.map(|t| t.to_rfc3339()),
            phase: self.progress.phase,
            progress: self.progress.clone(),
            outcome: self.outcome.clone(),
            error: self.error.clone(),
        }
    }
}

/// What the admin UI sees when polling a run.
#[derive(Debug, Clone, Serialize)]
pub struct RepairRunStatus {
    pub run_id: Uuid,
    pub scope: RepairScope,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub phase: RunPhase,
    pub progress: RepairProgress,
    pub outcome: Option<RepairOutcome>,
    pub error: Option<String>,
}

/// Register a run for `scope` and start it in the background.
pub fn start_run(
    registry: &RunRegistry,
    service: Arc<ReconciliationService>,
    scope: RepairScope,
) -> Uuid {
    prune_finished(registry, Utc::now());

    let run_id = Uuid::new_v4();
    let run = RepairRun::new(scope);
    let cancel = run.cancel.clone();
    registry.insert(run_id, run);

    tracing::info!("🔧 Starting repair run {} ({})", run_id, scope);

    let registry = registry.clone();
    tokio::spawn(async move {
        let progress_registry = registry.clone();
        let result = service
            .plan_and_execute(scope, &cancel, move |progress| {
                // The terminal snapshot is stored together with the outcome
                if progress.phase.is_terminal() {
                    return;
                }
                if let Some(mut run) = progress_registry.get_mut(&run_id) {
                    run.progress = progress.clone();
                }
            })
            .await;

        let Some(mut run) = registry.get_mut(&run_id) else {
            return;
        };
        run.finished_at = Some(Utc::now());
        match result {
            Ok(outcome) => {
                tracing::info!(
                    "Repair run {} finished: {} fixed, {} failed, cancelled={}",
                    run_id,
                    outcome.fixed,
                    outcome.failed,
                    outcome.cancelled
                );
                run.progress = outcome.final_progress();
                run.outcome = Some(outcome);
            }
            Err(e) => {
                tracing::error!("Repair run {} failed: {}", run_id, e);
                run.progress = RepairProgress::at(RunPhase::Failed, e.to_string());
                run.error = Some(e.to_string());
            }
        }
    });

    run_id
}

/// Drop runs that finished more than [`FINISHED_RUN_RETENTION_SECS`] before `now`.
/// Runs still in flight are always kept.
pub fn prune_finished(registry: &RunRegistry, now: DateTime<Utc>) -> usize {
    let before = registry.len();
    let retention = Duration::seconds(FINISHED_RUN_RETENTION_SECS);
    registry.retain(|_, run| run.finished_at.is_none_or(|finished| now - finished < retention));
    let pruned = before.saturating_sub(registry.len());
    if pruned > 0 {
        tracing::debug!("Pruned {} finished repair runs", pruned);
    }
    pruned
}

/// Request cancellation of a run. `None` when the id is unknown.
///
/// Returns whether the run was still in flight when asked.
pub fn cancel_run(registry: &RunRegistry, run_id: Uuid) -> Option<bool> {
    let run = registry.get(&run_id)?;
    if run.progress.phase.is_terminal() {
        return Some(false);
    }
    run.cancel.cancel();
    tracing::info!("Cancellation requested for repair run {}", run_id);
    Some(true)
}

pub fn run_status(registry: &RunRegistry, run_id: Uuid) -> Option<RepairRunStatus> {
    registry.get(&run_id).map(|run| run.status(run_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(at: DateTime<Utc>) -> RepairRun {
        let mut run = RepairRun::new(RepairScope::All);
        run.finished_at = Some(at);
        run.progress = RepairProgress::at(RunPhase::Completed, "done");
        run
    }

    #[test]
    fn test_prune_drops_only_expired_finished_runs() {
        let registry: RunRegistry = Arc::new(DashMap::new());
        let now = Utc::now();

        let stale = Uuid::new_v4();
        let recent = Uuid::new_v4();
        let running = Uuid::new_v4();
        registry.insert(stale, finished(now - Duration::hours(2)));
        registry.insert(recent, finished(now - Duration::minutes(5)));
        let mut long_running = RepairRun::new(RepairScope::All);
        long_running.started_at = now - Duration::hours(3);
        registry.insert(running, long_running);

        assert_eq!(prune_finished(&registry, now), 1);
        assert!(run_status(&registry, stale).is_none());
        assert!(run_status(&registry, recent).is_some());
        assert!(run_status(&registry, running).is_some());
    }
}
