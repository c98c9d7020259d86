//! Corpus-wide health report built from per-book diagnoses.

use serde::{Deserialize, Serialize};

use super::scanner::{BookDiagnosis, IssueType};

/// Number of books carrying each issue. A book may add to several counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounters {
    pub no_copies: usize,
    pub mismatched_counts: usize,
    pub status_issue: usize,
    pub duplicate_tracking: usize,
    pub no_book_code: usize,
}

impl IssueCounters {
    fn record(&mut self, issue: IssueType) {
        match issue {
            IssueType::NoCopies => self.no_copies += 1,
            IssueType::MismatchedCounts => self.mismatched_counts += 1,
            IssueType::StatusIssue => self.status_issue += 1,
            IssueType::DuplicateTracking => self.duplicate_tracking += 1,
            IssueType::NoBookCode => self.no_book_code += 1,
            IssueType::Healthy => {}
        }
    }

    pub fn get(&self, issue: IssueType) -> usize {
        match issue {
            IssueType::NoCopies => self.no_copies,
            IssueType::MismatchedCounts => self.mismatched_counts,
            IssueType::StatusIssue => self.status_issue,
            IssueType::DuplicateTracking => self.duplicate_tracking,
            IssueType::NoBookCode => self.no_book_code,
            IssueType::Healthy => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub total_books: usize,
    pub healthy_books: usize,
    pub flagged_books: usize,
    /// Percentage of books with no detected issue
    pub health_score: u8,
    pub counters: IssueCounters,
    /// Every non-healthy book, most severe primary issue first
    pub problem_books: Vec<BookDiagnosis>,
}

impl HealthReport {
    pub fn is_clean(&self) -> bool {
        self.problem_books.is_empty()
    }
}

/// `round(healthy / total * 100)`, and 100 for an empty inventory.
pub fn health_score(total_books: usize, flagged_books: usize) -> u8 {
    if total_books == 0 {
        return 100;
    }
    let healthy = total_books.saturating_sub(flagged_books) as f64;
    (healthy / total_books as f64 * 100.0).round() as u8
}

pub fn summarize(diagnoses: Vec<BookDiagnosis>) -> HealthReport {
    let total_books = diagnoses.len();
    let mut counters = IssueCounters::default();

    let mut problem_books: Vec<BookDiagnosis> = diagnoses
        .into_iter()
        .filter(|d| !d.is_healthy())
        .inspect(|d| d.issues.iter().for_each(|issue| counters.record(*issue)))
        .collect();

    problem_books.sort_by(|a, b| {
        a.issue_type
            .cmp(&b.issue_type)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.book_id.cmp(&b.book_id))
    });

    let flagged_books = problem_books.len();

    HealthReport {
        total_books,
        healthy_books: total_books - flagged_books,
        flagged_books,
        health_score: health_score(total_books, flagged_books),
        counters,
        problem_books,
    }
}
