//! Repair executor
//!
//! Applies a plan one operation at a time, in order. A failed write is
//! counted and skipped; the run carries on with the next operation.

use serde::Serialize;
use std::time::Duration;

use super::planner::{CodeTarget, RepairOperation, RepairPlan};
use super::progress::{RepairFailure, RepairProgress, RunPhase};
use crate::domain::{
    CopyCondition, CopyStatus, CreateBookCopyInput, DomainError, InventoryGateway,
    UpdateBookCopyInput, UpdateBookInput,
};
use crate::utils::CancellationToken;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionSummary {
    pub fixed: usize,
    pub failed: usize,
    /// Set when the run stopped early on request
    pub cancelled: bool,
    pub failures: Vec<RepairFailure>,
}

pub struct RepairExecutor<'a, G: ?Sized> {
    gateway: &'a G,
    write_delay: Duration,
}

impl<'a, G> RepairExecutor<'a, G>
where
    G: InventoryGateway + ?Sized,
{
    pub fn new(gateway: &'a G, write_delay: Duration) -> Self {
        Self {
            gateway,
            write_delay,
        }
    }

    /// Apply every operation of `plan`, reporting progress after each one.
    ///
    /// Cancellation is checked before each operation; an operation already
    /// started always completes.
    pub async fn execute<F>(
        &self,
        plan: &RepairPlan,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> ExecutionSummary
    where
        F: FnMut(&RepairProgress),
    {
        let total = plan.len();
        let mut summary = ExecutionSummary::default();

        for (index, operation) in plan.operations.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(
                    "Repair cancelled after {} of {} operations",
                    index,
                    total
                );
                summary.cancelled = true;
                break;
            }

            if index > 0 && !self.write_delay.is_zero() {
                tokio::time::sleep(self.write_delay).await;
            }

            let description = operation.describe();
            match self.apply(operation).await {
                Ok(()) => {
                    summary.fixed += 1;
                    tracing::debug!("✅ {}", description);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!("❌ {} failed: {}", description, e);
                    summary.failures.push(RepairFailure {
                        index,
                        description: description.clone(),
                        error: e.to_string(),
                    });
                }
            }

            on_progress(&RepairProgress {
                phase: RunPhase::Executing,
                current: index + 1,
                total,
                fixed: summary.fixed,
                failed: summary.failed,
                description,
            });
        }

        tracing::info!(
            "Repair {} finished: {} fixed, {} failed",
            plan.scope,
            summary.fixed,
            summary.failed
        );

        summary
    }

    async fn apply(&self, operation: &RepairOperation) -> Result<(), DomainError> {
        match operation {
            RepairOperation::CreateCopy {
                book_id,
                copy_number,
                book_code,
                tracking_code,
            } => {
                self.gateway
                    .create_book_copy(CreateBookCopyInput {
                        book_id: *book_id,
                        copy_number: *copy_number,
                        book_code: book_code.clone(),
                        tracking_code: tracking_code.clone(),
                        status: CopyStatus::Available.as_str().to_string(),
                        condition: CopyCondition::Good.as_str().to_string(),
                    })
                    .await?;
            }
            RepairOperation::SetCopyStatus { copy_id, to, .. } => {
                self.gateway
                    .update_book_copy(
                        *copy_id,
                        UpdateBookCopyInput {
                            status: Some(to.as_str().to_string()),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            RepairOperation::SetCopyBookCode {
                copy_id, book_code, ..
            } => {
                self.gateway
                    .update_book_copy(
                        *copy_id,
                        UpdateBookCopyInput {
                            book_code: Some(book_code.clone()),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            RepairOperation::SetBookCounters {
                book_id,
                total_copies,
                available_copies,
                status,
            } => {
                self.gateway
                    .update_book(
                        *book_id,
                        UpdateBookInput {
                            total_copies: *total_copies,
                            available_copies: *available_copies,
                            status: status.map(|s| s.as_str().to_string()),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            RepairOperation::AssignCode { target, code } => match target {
                CodeTarget::Book { book_id } => {
                    self.gateway
                        .update_book(
                            *book_id,
                            UpdateBookInput {
                                book_code: Some(code.clone()),
                                ..Default::default()
                            },
                        )
                        .await?;
                }
                CodeTarget::Copy {
                    copy_id, book_code, ..
                } => {
                    self.gateway
                        .update_book_copy(
                            *copy_id,
                            UpdateBookCopyInput {
                                book_code: Some(book_code.clone()),
                                tracking_code: Some(code.clone()),
                                ..Default::default()
                            },
                        )
                        .await?;
                }
            },
        }
        Ok(())
    }
}
