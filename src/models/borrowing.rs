use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "borrowings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub student_id: Option<i32>,
    pub book_id: Option<i32>,
    pub book_copy_id: Option<i32>,
    pub borrowed_date: String,
    pub due_date: String,
    pub returned_date: Option<String>,
    pub status: String, // 'active', 'returned', 'lost'
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book_copy::Entity",
        from = "Column::BookCopyId",
        to = "super::book_copy::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    BookCopy,
}

impl Related<super::book_copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookCopy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::Borrowing {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            student_id: model.student_id,
            book_id: model.book_id,
            book_copy_id: model.book_copy_id,
            status: model.status,
        }
    }
}
