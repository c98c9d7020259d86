use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub book_code: Option<String>,
    /// Declared number of copies. Denormalized from `book_copies`.
    pub total_copies: i32,
    /// Declared number of loanable copies. Denormalized from `book_copies`
    /// and active `borrowings`.
    pub available_copies: i32,
    /// `available` or `unavailable`
    #[sea_orm(default_value = "available")]
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::book_copy::Entity")]
    Copies,
}

impl Related<super::book_copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Copies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::Book {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            author: model.author,
            isbn: model.isbn,
            book_code: model.book_code,
            total_copies: model.total_copies,
            available_copies: model.available_copies,
            status: model.status,
        }
    }
}
