//! Reconciliation Service - scan, plan and repair without the HTTP layer

use serde::Serialize;
use std::sync::Arc;

use crate::config::ReconcileConfig;
use crate::domain::InventoryGateway;
use crate::modules::reconciliation::{
    HealthReport, InventorySnapshot, ReconcileError, RepairExecutor, RepairFailure, RepairPlan,
    RepairProgress, RepairScope, RunPhase, diagnose, plan_repair, summarize,
};
use crate::utils::CancellationToken;

/// Final result of a repair run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairOutcome {
    pub scope: RepairScope,
    /// Operations in the plan
    pub planned: usize,
    pub fixed: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub failures: Vec<RepairFailure>,
    /// Health after the run. Informational only; `None` when the run was
    /// cancelled or the re-scan itself failed.
    pub rescan: Option<HealthReport>,
}

impl RepairOutcome {
    /// Terminal progress snapshot for this outcome.
    pub fn final_progress(&self) -> RepairProgress {
        RepairProgress {
            phase: if self.cancelled {
                RunPhase::Cancelled
            } else {
                RunPhase::Completed
            },
            current: self.fixed + self.failed,
            total: self.planned,
            fixed: self.fixed,
            failed: self.failed,
            description: format!(
                "{} fixed, {} failed of {} planned",
                self.fixed, self.failed, self.planned
            ),
        }
    }
}

#[derive(Clone)]
pub struct ReconciliationService {
    gateway: Arc<dyn InventoryGateway>,
    config: ReconcileConfig,
}

impl ReconciliationService {
    pub fn new(gateway: Arc<dyn InventoryGateway>, config: ReconcileConfig) -> Self {
        Self { gateway, config }
    }

    /// Classify every book and summarize.
    pub async fn scan(&self) -> Result<HealthReport, ReconcileError> {
        let snapshot = InventorySnapshot::load(self.gateway.as_ref()).await?;
        let report = summarize(diagnose(&snapshot));

        tracing::info!(
            "📚 Inventory scan: {}/{} books healthy (score {})",
            report.healthy_books,
            report.total_books,
            report.health_score
        );

        Ok(report)
    }

    /// Health of a single book, from a fresh snapshot.
    pub async fn scan_book(&self, book_id: i32) -> Result<HealthReport, ReconcileError> {
        let snapshot = InventorySnapshot::load(self.gateway.as_ref()).await?;
        Ok(summarize(diagnose(&snapshot.only_book(book_id)?)))
    }

    /// Fail with `BookNotFound` unless the book exists.
    pub async fn ensure_book(&self, book_id: i32) -> Result<(), ReconcileError> {
        self.gateway
            .find_book(book_id)
            .await
            .map_err(ReconcileError::read("books"))?
            .map(|_| ())
            .ok_or(ReconcileError::BookNotFound(book_id))
    }

    /// Build the plan for `scope` without writing anything.
    pub async fn plan(&self, scope: RepairScope) -> Result<RepairPlan, ReconcileError> {
        let snapshot = InventorySnapshot::load(self.gateway.as_ref()).await?;
        plan_repair(self.gateway.as_ref(), &snapshot, scope).await
    }

    /// Scan, plan, execute and re-scan.
    ///
    /// Only the scan and the planning pass can fail the call. Write failures
    /// are counted in the outcome and the run continues past them.
    pub async fn plan_and_execute<F>(
        &self,
        scope: RepairScope,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<RepairOutcome, ReconcileError>
    where
        F: FnMut(&RepairProgress) + Send,
    {
        on_progress(&RepairProgress::at(RunPhase::Scanning, "Loading inventory"));
        let snapshot = InventorySnapshot::load(self.gateway.as_ref()).await?;

        on_progress(&RepairProgress::at(
            RunPhase::Planning,
            format!("Planning repairs for {}", scope),
        ));
        let plan = plan_repair(self.gateway.as_ref(), &snapshot, scope).await?;
        let planned = plan.len();

        let executor = RepairExecutor::new(self.gateway.as_ref(), self.config.write_delay);
        let summary = executor.execute(&plan, cancel, &mut on_progress).await;

        let rescan = if summary.cancelled {
            None
        } else {
            if !self.config.settle_delay.is_zero() {
                tokio::time::sleep(self.config.settle_delay).await;
            }
            on_progress(&RepairProgress {
                phase: RunPhase::Verifying,
                current: planned,
                total: planned,
                fixed: summary.fixed,
                failed: summary.failed,
                description: "Re-scanning inventory".to_string(),
            });
            let result = match scope {
                RepairScope::SingleBook(id) => self.scan_book(id).await,
                _ => self.scan().await,
            };
            match result {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::warn!("Post-repair re-scan failed: {}", e);
                    None
                }
            }
        };

        let outcome = RepairOutcome {
            scope,
            planned,
            fixed: summary.fixed,
            failed: summary.failed,
            cancelled: summary.cancelled,
            failures: summary.failures,
            rescan,
        };
        on_progress(&outcome.final_progress());

        Ok(outcome)
    }
}
