//! Repair planner
//!
//! Turns a snapshot into an ordered list of corrective writes without
//! performing any of them. Phases run in a fixed order and each one works on
//! an in-memory copy of the inventory that already reflects the operations
//! planned before it, so a combined plan is internally consistent even though
//! nothing reaches the store until execution.
//!
//! The only store access during planning is the code allocator's probe.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::code_allocator::{CodeAllocator, random_base36};
use super::error::ReconcileError;
use super::scanner::{InventorySnapshot, has_stale_status, is_loanable};
use crate::domain::{Book, BookStatus, CopyStatus, InventoryGateway};

/// Candidate copy numbers tried per book before falling back to random
/// tracking suffixes.
pub const MAX_GAP_ATTEMPTS: u32 = 1000;

/// Upper bound on copies created for one book in a single plan. Larger
/// declared totals are taken as data-entry errors and only partly filled.
pub const MAX_NEW_COPIES_PER_BOOK: i32 = 1000;

const RANDOM_TRACKING_LEN: usize = 6;

/// Which part of the inventory a repair run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "book_id", rename_all = "snake_case")]
pub enum RepairScope {
    MissingCopies,
    MismatchedCounts,
    StatusIssues,
    BookCodes,
    All,
    SingleBook(i32),
}

impl RepairScope {
    /// Parse the wire name used by the admin API.
    pub fn parse(scope: &str, book_id: Option<i32>) -> Result<Self, String> {
        match scope {
            "missing_copies" | "no_copies" => Ok(RepairScope::MissingCopies),
            "mismatched_counts" => Ok(RepairScope::MismatchedCounts),
            "status_issues" => Ok(RepairScope::StatusIssues),
            "book_codes" => Ok(RepairScope::BookCodes),
            "all" => Ok(RepairScope::All),
            "single_book" => book_id
                .map(RepairScope::SingleBook)
                .ok_or_else(|| "single_book scope requires a book_id".to_string()),
            other => Err(format!("Unknown repair scope '{}'", other)),
        }
    }

    fn phases(&self) -> &'static [RepairPhase] {
        match self {
            RepairScope::MissingCopies => &[RepairPhase::MissingCopies],
            RepairScope::MismatchedCounts => &[RepairPhase::MismatchedCounts],
            RepairScope::StatusIssues => &[RepairPhase::StatusIssues],
            RepairScope::BookCodes => &[RepairPhase::BookCodes],
            RepairScope::All | RepairScope::SingleBook(_) => &[
                RepairPhase::MissingCopies,
                RepairPhase::MismatchedCounts,
                RepairPhase::StatusIssues,
                RepairPhase::BookCodes,
            ],
        }
    }

    fn only_book(&self) -> Option<i32> {
        match self {
            RepairScope::SingleBook(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for RepairScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairScope::MissingCopies => f.write_str("missing_copies"),
            RepairScope::MismatchedCounts => f.write_str("mismatched_counts"),
            RepairScope::StatusIssues => f.write_str("status_issues"),
            RepairScope::BookCodes => f.write_str("book_codes"),
            RepairScope::All => f.write_str("all"),
            RepairScope::SingleBook(id) => write!(f, "single_book({})", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepairPhase {
    MissingCopies,
    MismatchedCounts,
    StatusIssues,
    BookCodes,
}

/// What an `AssignCode` operation writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeTarget {
    /// The book's own code
    Book { book_id: i32 },
    /// A copy's tracking code. `book_code` is stamped on the copy as well.
    Copy {
        book_id: i32,
        copy_id: i32,
        book_code: String,
    },
}

/// One atomic corrective write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RepairOperation {
    /// New `available` copy in `good` condition
    CreateCopy {
        book_id: i32,
        copy_number: i32,
        book_code: String,
        tracking_code: String,
    },
    SetCopyStatus {
        book_id: i32,
        copy_id: i32,
        from: String,
        to: CopyStatus,
    },
    /// Copy is labelled but carries a stale or missing book code
    SetCopyBookCode {
        book_id: i32,
        copy_id: i32,
        book_code: String,
    },
    /// Fields left `None` are not written.
    SetBookCounters {
        book_id: i32,
        total_copies: Option<i32>,
        available_copies: Option<i32>,
        status: Option<BookStatus>,
    },
    AssignCode { target: CodeTarget, code: String },
}

impl RepairOperation {
    pub fn book_id(&self) -> i32 {
        match self {
            RepairOperation::CreateCopy { book_id, .. }
            | RepairOperation::SetCopyStatus { book_id, .. }
            | RepairOperation::SetCopyBookCode { book_id, .. }
            | RepairOperation::SetBookCounters { book_id, .. } => *book_id,
            RepairOperation::AssignCode { target, .. } => match target {
                CodeTarget::Book { book_id } | CodeTarget::Copy { book_id, .. } => *book_id,
            },
        }
    }

    /// One-line description for progress reporting.
    pub fn describe(&self) -> String {
        match self {
            RepairOperation::CreateCopy {
                book_id,
                copy_number,
                tracking_code,
                ..
            } => format!(
                "Create copy #{} ({}) of book {}",
                copy_number, tracking_code, book_id
            ),
            RepairOperation::SetCopyStatus {
                copy_id, from, to, ..
            } => format!("Set copy {} status from '{}' to '{}'", copy_id, from, to),
            RepairOperation::SetCopyBookCode {
                copy_id, book_code, ..
            } => format!("Stamp book code {} on copy {}", book_code, copy_id),
            RepairOperation::SetBookCounters {
                book_id,
                total_copies,
                available_copies,
                status,
            } => {
                let mut parts = Vec::new();
                if let Some(total) = total_copies {
                    parts.push(format!("total={}", total));
                }
                if let Some(available) = available_copies {
                    parts.push(format!("available={}", available));
                }
                if let Some(status) = status {
                    parts.push(format!("status={}", status));
                }
                format!("Set book {} {}", book_id, parts.join(", "))
            }
            RepairOperation::AssignCode { target, code } => match target {
                CodeTarget::Book { book_id } => format!("Assign code {} to book {}", code, book_id),
                CodeTarget::Copy { copy_id, .. } => {
                    format!("Assign tracking code {} to copy {}", code, copy_id)
                }
            },
        }
    }
}

/// Ordered corrective writes for one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairPlan {
    pub scope: RepairScope,
    pub operations: Vec<RepairOperation>,
}

impl RepairPlan {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// `{book_code}-{copy_number:02}`
pub fn tracking_code(book_code: &str, copy_number: i32) -> String {
    format!("{}-{:02}", book_code, copy_number)
}

#[derive(Debug, Clone)]
struct WorkingCopy {
    /// `None` for copies planned in this pass
    id: Option<i32>,
    copy_number: i32,
    tracking_code: Option<String>,
    book_code: Option<String>,
    status: String,
}

#[derive(Debug, Clone)]
struct WorkingBook {
    book: Book,
    copies: Vec<WorkingCopy>,
    /// Code allocated for tracking codes but not yet written to the book
    pending_code: Option<String>,
}

impl WorkingBook {
    fn copy_count(&self) -> i32 {
        self.copies.len() as i32
    }

    fn available_count(&self, currently_out: &HashSet<i32>) -> i32 {
        self.copies
            .iter()
            .filter(|c| {
                let out = c.id.is_some_and(|id| currently_out.contains(&id));
                is_loanable(&c.status, out)
            })
            .count() as i32
    }
}

/// In-memory inventory that phases read and update as they plan.
struct WorkingInventory {
    books: Vec<WorkingBook>,
    currently_out: HashSet<i32>,
    /// Every tracking code in the inventory, including planned ones
    tracking_codes: HashSet<String>,
}

impl WorkingInventory {
    fn new(snapshot: &InventorySnapshot, only_book: Option<i32>) -> Result<Self, ReconcileError> {
        let mut seen = HashSet::new();
        for book in &snapshot.books {
            if !seen.insert(book.id) {
                return Err(ReconcileError::InvalidPlan(format!(
                    "book {} appears twice in the snapshot",
                    book.id
                )));
            }
        }

        if let Some(id) = only_book
            && !seen.contains(&id)
        {
            return Err(ReconcileError::BookNotFound(id));
        }

        let mut copies_by_book: HashMap<i32, Vec<WorkingCopy>> = HashMap::new();
        for copy in &snapshot.copies {
            copies_by_book
                .entry(copy.book_id)
                .or_default()
                .push(WorkingCopy {
                    id: Some(copy.id),
                    copy_number: copy.copy_number,
                    tracking_code: copy.tracking().map(str::to_string),
                    book_code: copy
                        .book_code
                        .as_deref()
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string),
                    status: copy.status.clone(),
                });
        }

        // Tracking codes are global, so they come from every copy even when
        // planning for a single book.
        let tracking_codes = snapshot
            .copies
            .iter()
            .filter_map(|c| c.tracking().map(str::to_string))
            .collect();

        let books = snapshot
            .books
            .iter()
            .filter(|b| only_book.is_none_or(|id| b.id == id))
            .map(|b| WorkingBook {
                book: b.clone(),
                copies: copies_by_book.remove(&b.id).unwrap_or_default(),
                pending_code: None,
            })
            .collect();

        Ok(Self {
            books,
            currently_out: snapshot.currently_out(),
            tracking_codes,
        })
    }
}

/// Pick a tracking code for a copy that is free across the whole inventory.
fn free_tracking_code(taken: &HashSet<String>, book_code: &str, copy_number: i32) -> String {
    let preferred = tracking_code(book_code, copy_number);
    if !taken.contains(&preferred) {
        return preferred;
    }
    random_tracking_code(taken, book_code)
}

fn random_tracking_code(taken: &HashSet<String>, book_code: &str) -> String {
    loop {
        let candidate = format!("{}-{}", book_code, random_base36(RANDOM_TRACKING_LEN));
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
}

async fn plan_missing_copies<G>(
    inventory: &mut WorkingInventory,
    allocator: &mut CodeAllocator<'_, G>,
    operations: &mut Vec<RepairOperation>,
) -> Result<(), ReconcileError>
where
    G: InventoryGateway + ?Sized,
{
    let WorkingInventory {
        books,
        tracking_codes,
        ..
    } = inventory;

    for wb in books.iter_mut() {
        let mut needed = wb.book.total_copies.saturating_sub(wb.copy_count());
        if needed <= 0 {
            continue;
        }
        if needed > MAX_NEW_COPIES_PER_BOOK {
            tracing::warn!(
                "Book {} declares {} copies, creating {} in this pass",
                wb.book.id,
                wb.book.total_copies,
                MAX_NEW_COPIES_PER_BOOK
            );
            needed = MAX_NEW_COPIES_PER_BOOK;
        }

        let book_code = match wb.book.code().or(wb.pending_code.as_deref()) {
            Some(code) => code.to_string(),
            None => {
                let code = allocator.allocate(&wb.book.title).await?;
                wb.pending_code = Some(code.clone());
                code
            }
        };

        let mut used: HashSet<i32> = wb.copies.iter().map(|c| c.copy_number).collect();
        let mut created = 0;
        let mut candidate = 1;
        let mut attempts = 0;

        // Fill gaps in the numbering before extending past the maximum
        while created < needed && attempts < MAX_GAP_ATTEMPTS {
            attempts += 1;
            let number = candidate;
            candidate += 1;

            if used.contains(&number) {
                continue;
            }
            let code = tracking_code(&book_code, number);
            if tracking_codes.contains(&code) {
                continue;
            }

            used.insert(number);
            tracking_codes.insert(code.clone());
            wb.copies.push(WorkingCopy {
                id: None,
                copy_number: number,
                tracking_code: Some(code.clone()),
                book_code: Some(book_code.clone()),
                status: CopyStatus::Available.as_str().to_string(),
            });
            operations.push(RepairOperation::CreateCopy {
                book_id: wb.book.id,
                copy_number: number,
                book_code: book_code.clone(),
                tracking_code: code,
            });
            created += 1;
        }

        if created < needed {
            tracing::warn!(
                "Copy numbering for book {} exhausted after {} attempts, using random tracking codes",
                wb.book.id,
                MAX_GAP_ATTEMPTS
            );
            let mut next = used.iter().copied().max().unwrap_or(0).max(candidate - 1);
            while created < needed {
                next += 1;
                let code = random_tracking_code(tracking_codes, &book_code);
                tracking_codes.insert(code.clone());
                wb.copies.push(WorkingCopy {
                    id: None,
                    copy_number: next,
                    tracking_code: Some(code.clone()),
                    book_code: Some(book_code.clone()),
                    status: CopyStatus::Available.as_str().to_string(),
                });
                operations.push(RepairOperation::CreateCopy {
                    book_id: wb.book.id,
                    copy_number: next,
                    book_code: book_code.clone(),
                    tracking_code: code,
                });
                created += 1;
            }
        }

        tracing::debug!(
            "Planned {} new copies for book {} ({})",
            created,
            wb.book.id,
            book_code
        );
    }

    Ok(())
}

fn plan_counts(inventory: &mut WorkingInventory, operations: &mut Vec<RepairOperation>) {
    let WorkingInventory {
        books,
        currently_out,
        ..
    } = inventory;

    for wb in books.iter_mut() {
        let total = wb.copy_count();
        let available = wb.available_count(currently_out);
        if wb.book.total_copies == total && wb.book.available_copies == available {
            continue;
        }

        operations.push(RepairOperation::SetBookCounters {
            book_id: wb.book.id,
            total_copies: Some(total),
            available_copies: Some(available),
            status: None,
        });
        wb.book.total_copies = total;
        wb.book.available_copies = available;
    }
}

/// Copies are only ever corrected towards `available`, and only when no
/// active borrowing holds them. Nothing is forced to `borrowed`.
fn plan_statuses(inventory: &mut WorkingInventory, operations: &mut Vec<RepairOperation>) {
    let WorkingInventory {
        books,
        currently_out,
        ..
    } = inventory;

    for wb in books.iter_mut() {
        let book_id = wb.book.id;
        for copy in wb.copies.iter_mut() {
            let Some(copy_id) = copy.id else { continue };
            if !has_stale_status(&copy.status, currently_out.contains(&copy_id)) {
                continue;
            }
            operations.push(RepairOperation::SetCopyStatus {
                book_id,
                copy_id,
                from: copy.status.clone(),
                to: CopyStatus::Available,
            });
            copy.status = CopyStatus::Available.as_str().to_string();
        }

        let available = wb.available_count(currently_out);
        let derived = BookStatus::derive(wb.copy_count(), available);
        let stored = wb.book.status.parse::<BookStatus>().ok();

        let available_copies = (wb.book.available_copies != available).then_some(available);
        let status = (stored != Some(derived)).then_some(derived);
        if available_copies.is_none() && status.is_none() {
            continue;
        }

        operations.push(RepairOperation::SetBookCounters {
            book_id,
            total_copies: None,
            available_copies,
            status,
        });
        wb.book.available_copies = available;
        wb.book.status = derived.as_str().to_string();
    }
}

async fn plan_codes<G>(
    inventory: &mut WorkingInventory,
    allocator: &mut CodeAllocator<'_, G>,
    operations: &mut Vec<RepairOperation>,
) -> Result<(), ReconcileError>
where
    G: InventoryGateway + ?Sized,
{
    let WorkingInventory {
        books,
        tracking_codes,
        ..
    } = inventory;

    for wb in books.iter_mut() {
        let book_id = wb.book.id;

        if wb.book.code().is_none() {
            let code = match wb.pending_code.take() {
                Some(code) => code,
                None => allocator.allocate(&wb.book.title).await?,
            };
            operations.push(RepairOperation::AssignCode {
                target: CodeTarget::Book { book_id },
                code: code.clone(),
            });
            wb.book.book_code = Some(code);
        }

        let Some(book_code) = wb.book.code().map(str::to_string) else {
            return Err(ReconcileError::InvalidPlan(format!(
                "book {} still has no code after assignment",
                book_id
            )));
        };

        for copy in wb.copies.iter_mut().filter(|c| c.tracking_code.is_none()) {
            let Some(copy_id) = copy.id else { continue };
            let code = free_tracking_code(tracking_codes, &book_code, copy.copy_number);
            tracking_codes.insert(code.clone());
            operations.push(RepairOperation::AssignCode {
                target: CodeTarget::Copy {
                    book_id,
                    copy_id,
                    book_code: book_code.clone(),
                },
                code: code.clone(),
            });
            copy.tracking_code = Some(code);
            copy.book_code = Some(book_code.clone());
        }

        // Lowest copy id keeps a shared label, later holders get a new one
        let mut order: Vec<usize> = (0..wb.copies.len())
            .filter(|&i| wb.copies[i].id.is_some())
            .collect();
        order.sort_by_key(|&i| wb.copies[i].id);
        let mut kept = HashSet::new();
        for i in order {
            let copy = &mut wb.copies[i];
            let (Some(copy_id), Some(current)) = (copy.id, copy.tracking_code.clone()) else {
                continue;
            };
            if kept.insert(current.clone()) {
                continue;
            }
            let code = free_tracking_code(tracking_codes, &book_code, copy.copy_number);
            tracking_codes.insert(code.clone());
            tracing::debug!(
                "Copy {} shares tracking code {}, relabelling as {}",
                copy_id,
                current,
                code
            );
            operations.push(RepairOperation::AssignCode {
                target: CodeTarget::Copy {
                    book_id,
                    copy_id,
                    book_code: book_code.clone(),
                },
                code: code.clone(),
            });
            copy.tracking_code = Some(code);
            copy.book_code = Some(book_code.clone());
        }

        for copy in wb.copies.iter_mut() {
            let Some(copy_id) = copy.id else { continue };
            if copy.book_code.as_deref() == Some(book_code.as_str()) {
                continue;
            }
            operations.push(RepairOperation::SetCopyBookCode {
                book_id,
                copy_id,
                book_code: book_code.clone(),
            });
            copy.book_code = Some(book_code.clone());
        }
    }

    Ok(())
}

/// Build the repair plan for `scope` from `snapshot`.
///
/// `snapshot` must be the full inventory even for a single-book scope:
/// tracking codes are checked for uniqueness across every copy.
pub async fn plan_repair<G>(
    gateway: &G,
    snapshot: &InventorySnapshot,
    scope: RepairScope,
) -> Result<RepairPlan, ReconcileError>
where
    G: InventoryGateway + ?Sized,
{
    let mut inventory = WorkingInventory::new(snapshot, scope.only_book())?;
    let mut allocator = CodeAllocator::new(gateway);
    let mut operations = Vec::new();

    for phase in scope.phases() {
        let before = operations.len();
        match phase {
            RepairPhase::MissingCopies => {
                plan_missing_copies(&mut inventory, &mut allocator, &mut operations).await?
            }
            RepairPhase::MismatchedCounts => plan_counts(&mut inventory, &mut operations),
            RepairPhase::StatusIssues => plan_statuses(&mut inventory, &mut operations),
            RepairPhase::BookCodes => {
                plan_codes(&mut inventory, &mut allocator, &mut operations).await?
            }
        }
        tracing::debug!(
            "Phase {:?} planned {} operations",
            phase,
            operations.len() - before
        );
    }

    tracing::info!(
        "Planned {} repair operations for scope {}",
        operations.len(),
        scope
    );

    Ok(RepairPlan { scope, operations })
}
