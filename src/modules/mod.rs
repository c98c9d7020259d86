//! Feature modules

pub mod reconciliation;
