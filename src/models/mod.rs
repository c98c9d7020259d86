pub mod book;
pub mod book_copy;
pub mod borrowing;
