//! Domain layer - Pure inventory abstractions
//!
//! This layer contains NO framework dependencies (no SeaORM, no Axum).
//! Only record types, status vocabularies, trait definitions and domain errors.

pub mod errors;
pub mod repositories;
pub mod status;

pub use errors::DomainError;
pub use repositories::*;
pub use status::{BookStatus, BorrowingStatus, CopyCondition, CopyStatus, UnknownStatus};
