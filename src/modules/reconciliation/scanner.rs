//! Inventory scanner
//!
//! Loads the book, copy and borrowing universes and classifies every book
//! against the invariants tying its counters to its copies:
//!
//! - `total_copies` equals the number of copy rows for the book
//! - `available_copies` equals the copies marked `available` that no active
//!   borrowing holds
//! - `status` is `unavailable` exactly when either count is zero
//!
//! Classification is pure; only [`InventorySnapshot::load`] touches the store.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::error::ReconcileError;
use crate::domain::{Book, BookCopy, BookStatus, Borrowing, CopyStatus, InventoryGateway};

/// Everything a scan or a planning pass reads, captured at one point in time.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    pub books: Vec<Book>,
    pub copies: Vec<BookCopy>,
    pub active_borrowings: Vec<Borrowing>,
}

impl InventorySnapshot {
    /// Read the three collections. Any read failure aborts the whole load.
    pub async fn load<G>(gateway: &G) -> Result<Self, ReconcileError>
    where
        G: InventoryGateway + ?Sized,
    {
        let books = gateway
            .list_books()
            .await
            .map_err(ReconcileError::read("books"))?;
        let copies = gateway
            .list_book_copies()
            .await
            .map_err(ReconcileError::read("book copies"))?;
        let active_borrowings = gateway
            .list_active_borrowings()
            .await
            .map_err(ReconcileError::read("borrowings"))?;

        tracing::debug!(
            "Loaded inventory snapshot: {} books, {} copies, {} active borrowings",
            books.len(),
            copies.len(),
            active_borrowings.len()
        );

        Ok(Self {
            books,
            copies,
            active_borrowings,
        })
    }

    /// Restrict the snapshot to a single book and its detail rows.
    pub fn only_book(&self, book_id: i32) -> Result<Self, ReconcileError> {
        let book = self
            .books
            .iter()
            .find(|b| b.id == book_id)
            .cloned()
            .ok_or(ReconcileError::BookNotFound(book_id))?;

        Ok(Self {
            books: vec![book],
            copies: self
                .copies
                .iter()
                .filter(|c| c.book_id == book_id)
                .cloned()
                .collect(),
            active_borrowings: self
                .active_borrowings
                .iter()
                .filter(|b| b.book_id == Some(book_id) || self.holds_copy_of(b, book_id))
                .cloned()
                .collect(),
        })
    }

    fn holds_copy_of(&self, borrowing: &Borrowing, book_id: i32) -> bool {
        borrowing.book_copy_id.is_some_and(|copy_id| {
            self.copies
                .iter()
                .any(|c| c.id == copy_id && c.book_id == book_id)
        })
    }

    /// Ids of copies held by an active borrowing.
    pub fn currently_out(&self) -> HashSet<i32> {
        self.active_borrowings
            .iter()
            .filter_map(|b| b.book_copy_id)
            .collect()
    }

    pub fn copies_by_book(&self) -> HashMap<i32, Vec<&BookCopy>> {
        let mut grouped: HashMap<i32, Vec<&BookCopy>> = HashMap::new();
        for copy in &self.copies {
            grouped.entry(copy.book_id).or_default().push(copy);
        }
        grouped
    }
}

/// Invariant violated by a book, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    NoCopies,
    MismatchedCounts,
    StatusIssue,
    DuplicateTracking,
    NoBookCode,
    Healthy,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::NoCopies => "no_copies",
            IssueType::MismatchedCounts => "mismatched_counts",
            IssueType::StatusIssue => "status_issue",
            IssueType::DuplicateTracking => "duplicate_tracking",
            IssueType::NoBookCode => "no_book_code",
            IssueType::Healthy => "healthy",
        }
    }
}

/// A copy counts as loanable when it reads `available` and is not out.
pub(crate) fn is_loanable(status: &str, currently_out: bool) -> bool {
    !currently_out && status.parse::<CopyStatus>() == Ok(CopyStatus::Available)
}

/// A copy that is not out must read `available` unless damaged or lost.
/// Unknown status strings count as stale too.
pub(crate) fn has_stale_status(status: &str, currently_out: bool) -> bool {
    if currently_out {
        return false;
    }
    match status.parse::<CopyStatus>() {
        Ok(CopyStatus::Available) => false,
        Ok(parsed) => !parsed.is_withdrawn(),
        Err(_) => true,
    }
}

/// Counts derived from the detail rows of one book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyTally {
    pub copy_count: i32,
    pub available_count: i32,
}

impl CopyTally {
    pub fn of<'a, I>(copies: I, currently_out: &HashSet<i32>) -> Self
    where
        I: IntoIterator<Item = &'a BookCopy>,
    {
        let mut tally = CopyTally::default();
        for copy in copies {
            tally.copy_count += 1;
            if is_loanable(&copy.status, currently_out.contains(&copy.id)) {
                tally.available_count += 1;
            }
        }
        tally
    }

    pub fn derived_status(&self) -> BookStatus {
        BookStatus::derive(self.copy_count, self.available_count)
    }
}

/// Classification of one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDiagnosis {
    pub book_id: i32,
    pub title: String,
    pub book_code: Option<String>,
    /// Primary issue, used for bucketing
    pub issue_type: IssueType,
    /// Every violated invariant, most severe first. Empty when healthy.
    pub issues: Vec<IssueType>,
    pub recommendations: Vec<String>,
    pub declared_total: i32,
    pub declared_available: i32,
    pub actual_copies: i32,
    pub actual_available: i32,
}

impl BookDiagnosis {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has(&self, issue: IssueType) -> bool {
        self.issues.contains(&issue)
    }
}

/// Classify one book given its copies and the currently-out copy ids.
pub fn classify_book(
    book: &Book,
    copies: &[&BookCopy],
    currently_out: &HashSet<i32>,
) -> BookDiagnosis {
    let tally = CopyTally::of(copies.iter().copied(), currently_out);
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if book.total_copies > 0 && tally.copy_count == 0 {
        issues.push(IssueType::NoCopies);
        recommendations.push(format!(
            "Declares {} copies but none exist; create the missing copies",
            book.total_copies
        ));
    } else if book.total_copies != tally.copy_count
        || book.available_copies != tally.available_count
    {
        issues.push(IssueType::MismatchedCounts);
        if book.total_copies != tally.copy_count {
            recommendations.push(format!(
                "Total copies is {} but {} copies exist",
                book.total_copies, tally.copy_count
            ));
        }
        if book.available_copies != tally.available_count {
            recommendations.push(format!(
                "Available copies is {} but {} copies are on the shelf",
                book.available_copies, tally.available_count
            ));
        }
    }

    let stale = copies
        .iter()
        .filter(|c| has_stale_status(&c.status, currently_out.contains(&c.id)))
        .count();
    let derived = tally.derived_status();
    let stored = book.status.parse::<BookStatus>().ok();
    if stale > 0 || book.available_copies != tally.available_count || stored != Some(derived) {
        issues.push(IssueType::StatusIssue);
        if stale > 0 {
            recommendations.push(format!(
                "{} copies are not marked available although no active borrowing holds them",
                stale
            ));
        }
        if stored != Some(derived) {
            recommendations.push(format!(
                "Status is '{}' but should be '{}'",
                book.status, derived
            ));
        }
    }

    let mut tracking_counts: HashMap<&str, usize> = HashMap::new();
    for copy in copies {
        if let Some(code) = copy.tracking() {
            *tracking_counts.entry(code).or_default() += 1;
        }
    }
    let mut duplicated: Vec<(&str, usize)> = tracking_counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .collect();
    if !duplicated.is_empty() {
        duplicated.sort();
        issues.push(IssueType::DuplicateTracking);
        for (code, n) in duplicated {
            recommendations.push(format!("Tracking code {} is used by {} copies", code, n));
        }
    }

    let uncoded_copies = copies.iter().filter(|c| c.tracking().is_none()).count();
    if book.code().is_none() || uncoded_copies > 0 {
        issues.push(IssueType::NoBookCode);
        if book.code().is_none() {
            recommendations.push("Book has no code; assign one".to_string());
        }
        if uncoded_copies > 0 {
            recommendations.push(format!("{} copies have no tracking code", uncoded_copies));
        }
    }

    issues.sort();

    BookDiagnosis {
        book_id: book.id,
        title: book.title.clone(),
        book_code: book.code().map(str::to_string),
        issue_type: issues.first().copied().unwrap_or(IssueType::Healthy),
        issues,
        recommendations,
        declared_total: book.total_copies,
        declared_available: book.available_copies,
        actual_copies: tally.copy_count,
        actual_available: tally.available_count,
    }
}

/// Classify every book of the snapshot, in snapshot order.
pub fn diagnose(snapshot: &InventorySnapshot) -> Vec<BookDiagnosis> {
    let currently_out = snapshot.currently_out();
    let by_book = snapshot.copies_by_book();

    snapshot
        .books
        .iter()
        .map(|book| {
            let copies = by_book.get(&book.id).map(Vec::as_slice).unwrap_or(&[]);
            classify_book(book, copies, &currently_out)
        })
        .collect()
}
