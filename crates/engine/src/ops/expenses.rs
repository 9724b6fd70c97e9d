use sea_orm::{
    ActiveValue, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, QueryOrder, QueryResult,
    QueryTrait, SqlErr,
};

use crate::{EngineError, Expense, ResultEngine, expenses};

use super::Engine;

impl Engine {
    /// Every expense, highest id first.
    ///
    /// A query that cannot run is reported as [`EngineError::NotFound`]; a
    /// row that cannot be decoded fails the whole listing with
    /// [`EngineError::InvalidInput`].
    pub async fn list_expenses(&self) -> ResultEngine<Vec<Expense>> {
        let statement = expenses::Entity::find()
            .order_by_desc(expenses::Column::Id)
            .build(self.database.get_database_backend());

        let rows = self.database.query_all(statement).await.map_err(|err| {
            tracing::error!("failed to query expenses: {err}");
            EngineError::NotFound
        })?;

        rows.iter().map(decode_expense).collect()
    }

    /// Single expense by `id`.
    pub async fn get_expense_by_id(&self, id: i64) -> ResultEngine<Expense> {
        let statement =
            expenses::Entity::find_by_id(id).build(self.database.get_database_backend());

        let row = self
            .database
            .query_one(statement)
            .await
            .map_err(|err| {
                tracing::error!(id, "failed to query expense: {err}");
                EngineError::InvalidInput
            })?
            .ok_or(EngineError::NotFound)?;

        decode_expense(&row)
    }

    /// Insert a new expense and return the id assigned by the store.
    pub async fn create_expense(
        &self,
        description: &str,
        amount: f64,
        due_date: i32,
    ) -> ResultEngine<i64> {
        let model = expenses::ActiveModel {
            id: ActiveValue::NotSet,
            description: ActiveValue::Set(description.to_string()),
            amount: ActiveValue::Set(amount),
            due_date: ActiveValue::Set(due_date),
        };

        let inserted = expenses::Entity::insert(model)
            .exec(&self.database)
            .await
            .map_err(write_error)?;

        Ok(inserted.last_insert_id)
    }
}

fn decode_expense(row: &QueryResult) -> ResultEngine<Expense> {
    expenses::Model::from_query_result(row, "")
        .map(Expense::from)
        .map_err(|err| {
            tracing::error!("failed to decode expense row: {err}");
            EngineError::InvalidInput
        })
}

fn write_error(err: DbErr) -> EngineError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::warn!("expense insert rejected: {detail}");
            EngineError::DuplicateConflict
        }
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
            tracing::warn!("expense insert rejected: {detail}");
            EngineError::InvalidInput
        }
        _ => {
            tracing::error!("failed to insert expense: {err}");
            EngineError::Internal
        }
    }
}
