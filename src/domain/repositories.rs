//! Repository trait definitions
//!
//! These traits define the contract for inventory data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::DomainError;

/// Aggregate inventory record for one title
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    /// Human-readable catalogue code, unique across books
    pub book_code: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    /// Raw stored flag, normally `available` or `unavailable`
    pub status: String,
}

impl Book {
    /// The stored code, ignoring blank values left by older imports.
    pub fn code(&self) -> Option<&str> {
        self.book_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// One physical copy of a book
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BookCopy {
    pub id: i32,
    pub book_id: i32,
    pub copy_number: i32,
    pub book_code: Option<String>,
    pub tracking_code: Option<String>,
    /// Raw stored status, see [`super::CopyStatus`]
    pub status: String,
    pub condition: String,
}

impl BookCopy {
    pub fn tracking(&self) -> Option<&str> {
        self.tracking_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Loan record. The engine only needs to know which copy it holds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Borrowing {
    pub id: i32,
    pub student_id: Option<i32>,
    pub book_id: Option<i32>,
    pub book_copy_id: Option<i32>,
    pub status: String,
}

/// Input for updating a book. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBookInput {
    pub book_code: Option<String>,
    pub total_copies: Option<i32>,
    pub available_copies: Option<i32>,
    pub status: Option<String>,
}

/// Input for updating a copy. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBookCopyInput {
    pub status: Option<String>,
    pub condition: Option<String>,
    pub book_code: Option<String>,
    pub tracking_code: Option<String>,
}

/// Input for creating a copy
#[derive(Debug, Clone, PartialEq)]
pub struct CreateBookCopyInput {
    pub book_id: i32,
    pub copy_number: i32,
    pub book_code: String,
    pub tracking_code: String,
    pub status: String,
    pub condition: String,
}

/// Record store access needed by the reconciliation engine.
///
/// Bulk listings have no pagination contract. Every write is an independent,
/// immediately committed call.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// List every book
    async fn list_books(&self) -> Result<Vec<Book>, DomainError>;

    /// List every copy of every book
    async fn list_book_copies(&self) -> Result<Vec<BookCopy>, DomainError>;

    /// List borrowings whose status is `active`, ignoring case and padding
    async fn list_active_borrowings(&self) -> Result<Vec<Borrowing>, DomainError>;

    /// Find a book by id
    async fn find_book(&self, id: i32) -> Result<Option<Book>, DomainError>;

    /// Find the book holding exactly this code
    async fn find_book_by_code(&self, code: &str) -> Result<Option<Book>, DomainError>;

    /// Update a book
    async fn update_book(&self, id: i32, input: UpdateBookInput) -> Result<Book, DomainError>;

    /// Update a copy
    async fn update_book_copy(
        &self,
        id: i32,
        input: UpdateBookCopyInput,
    ) -> Result<BookCopy, DomainError>;

    /// Create a new copy
    async fn create_book_copy(&self, input: CreateBookCopyInput) -> Result<BookCopy, DomainError>;
}
