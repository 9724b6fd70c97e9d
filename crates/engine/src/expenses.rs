//! Expense table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "expense")]
    pub description: String,
    #[sea_orm(column_name = "expense_amount", column_type = "Double")]
    pub amount: f64,
    pub due_date: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A persisted expense.
///
/// `due_date` is an opaque integer code, stored and returned verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub amount: f64,
    pub due_date: i32,
}

impl From<Model> for Expense {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            description: model.description,
            amount: model.amount,
            due_date: model.due_date,
        }
    }
}
