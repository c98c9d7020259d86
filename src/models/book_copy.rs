use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "book_copies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub book_id: i32,
    /// Positive, unique within a book
    pub copy_number: i32,
    pub book_code: Option<String>,
    /// Globally unique label, usually `{book_code}-{copy_number:02}`.
    /// Not enforced by the schema: legacy imports carry duplicates.
    pub tracking_code: Option<String>,
    /// Valid values:
    /// - `available`: On shelf, can be loaned
    /// - `borrowed`: Out on an active borrowing
    /// - `damaged`: Withdrawn for repair
    /// - `lost`: Copy is lost
    #[sea_orm(default_value = "available")]
    pub status: String,
    #[sea_orm(default_value = "good")]
    pub condition: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id"
    )]
    Book,
    #[sea_orm(has_many = "super::borrowing::Entity")]
    Borrowings,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::borrowing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Borrowings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::BookCopy {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            book_id: model.book_id,
            copy_number: model.copy_number,
            book_code: model.book_code,
            tracking_code: model.tracking_code,
            status: model.status,
            condition: model.condition,
        }
    }
}
