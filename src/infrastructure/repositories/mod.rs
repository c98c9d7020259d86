//! Repository implementations using SeaORM

pub mod inventory_repository;

pub use inventory_repository::SeaOrmInventoryRepository;
