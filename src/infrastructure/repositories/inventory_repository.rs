//! SeaORM implementation of InventoryGateway

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::{
    Book, BookCopy, Borrowing, BorrowingStatus, CreateBookCopyInput, DomainError,
    InventoryGateway, UpdateBookCopyInput, UpdateBookInput,
};
use crate::models::book::{self, Entity as BookEntity};
use crate::models::book_copy::{self, Entity as CopyEntity};
use crate::models::borrowing::{self, Entity as BorrowingEntity};

/// SeaORM-based implementation of InventoryGateway
pub struct SeaOrmInventoryRepository {
    db: DatabaseConnection,
}

impl SeaOrmInventoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InventoryGateway for SeaOrmInventoryRepository {
    async fn list_books(&self) -> Result<Vec<Book>, DomainError> {
        let books = BookEntity::find()
            .order_by_asc(book::Column::Id)
            .all(&self.db)
            .await?;

        Ok(books.into_iter().map(Book::from).collect())
    }

    async fn list_book_copies(&self) -> Result<Vec<BookCopy>, DomainError> {
        let copies = CopyEntity::find()
            .order_by_asc(book_copy::Column::BookId)
            .order_by_asc(book_copy::Column::CopyNumber)
            .all(&self.db)
            .await?;

        Ok(copies.into_iter().map(BookCopy::from).collect())
    }

    async fn list_active_borrowings(&self) -> Result<Vec<Borrowing>, DomainError> {
        // Older rows carry `Active` or padded values; match the way the
        // status parser does
        let status =
            Func::lower(Func::cust(Alias::new("TRIM")).arg(Expr::col(borrowing::Column::Status)));
        let borrowings = BorrowingEntity::find()
            .filter(Expr::expr(status).eq(BorrowingStatus::Active.as_str()))
            .all(&self.db)
            .await?;

        Ok(borrowings.into_iter().map(Borrowing::from).collect())
    }

    async fn find_book(&self, id: i32) -> Result<Option<Book>, DomainError> {
        let result = BookEntity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(Book::from))
    }

    async fn find_book_by_code(&self, code: &str) -> Result<Option<Book>, DomainError> {
        let result = BookEntity::find()
            .filter(book::Column::BookCode.eq(code))
            .one(&self.db)
            .await?;

        Ok(result.map(Book::from))
    }

    async fn update_book(&self, id: i32, input: UpdateBookInput) -> Result<Book, DomainError> {
        let existing = BookEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: book::ActiveModel = existing.into();

        if let Some(code) = input.book_code {
            active.book_code = Set(Some(code));
        }
        if let Some(total) = input.total_copies {
            active.total_copies = Set(total);
        }
        if let Some(available) = input.available_copies {
            active.available_copies = Set(available);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active.update(&self.db).await?;
        Ok(result.into())
    }

    async fn update_book_copy(
        &self,
        id: i32,
        input: UpdateBookCopyInput,
    ) -> Result<BookCopy, DomainError> {
        let existing = CopyEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: book_copy::ActiveModel = existing.into();

        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if let Some(condition) = input.condition {
            active.condition = Set(condition);
        }
        if let Some(code) = input.book_code {
            active.book_code = Set(Some(code));
        }
        if let Some(tracking) = input.tracking_code {
            active.tracking_code = Set(Some(tracking));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active.update(&self.db).await?;
        Ok(result.into())
    }

    async fn create_book_copy(&self, input: CreateBookCopyInput) -> Result<BookCopy, DomainError> {
        if input.copy_number < 1 {
            return Err(DomainError::Validation(format!(
                "copy number must be positive, got {}",
                input.copy_number
            )));
        }

        let now = chrono::Utc::now().to_rfc3339();

        let new_copy = book_copy::ActiveModel {
            book_id: Set(input.book_id),
            copy_number: Set(input.copy_number),
            book_code: Set(Some(input.book_code)),
            tracking_code: Set(Some(input.tracking_code)),
            status: Set(input.status),
            condition: Set(input.condition),
            notes: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = new_copy.insert(&self.db).await?;
        Ok(result.into())
    }
}
