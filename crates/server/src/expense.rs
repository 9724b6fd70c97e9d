//! Expense API endpoints

use api_types::expense::{Expense, ExpenseAccepted, ExpenseData, ExpenseNew};
use axum::{
    Json,
    body::Bytes,
    extract::{
        Path, State,
        rejection::{BytesRejection, PathRejection},
    },
    http::StatusCode,
};

use crate::{ServerError, server::ServerState};

fn map_expense(expense: engine::Expense) -> Expense {
    Expense {
        id: expense.id,
        expense: expense.description,
        expense_amount: expense.amount,
        due_date: i64::from(expense.due_date),
    }
}

/// Parse the `id` path segment. Missing and malformed ids are the same
/// failure for the client.
pub(crate) fn parse_expense_id(raw: &str) -> Result<i64, ServerError> {
    if raw.is_empty() {
        return Err(ServerError::Rejection(
            "missing expense id parameter".to_string(),
        ));
    }

    raw.parse().map_err(|err| {
        ServerError::Rejection(format!("failed to parse expense id {raw:?}: {err}"))
    })
}

/// Handle requests for listing every expense
pub async fn list(
    State(state): State<ServerState>,
) -> Result<Json<ExpenseData<Vec<Expense>>>, ServerError> {
    tracing::info!("fetching all expenses");

    let expenses: Vec<Expense> = state
        .engine
        .list_expenses()
        .await
        .inspect_err(|err| tracing::error!("failed to fetch expenses: {err}"))?
        .into_iter()
        .map(map_expense)
        .collect();

    tracing::info!(count = expenses.len(), "expenses fetched successfully");
    Ok(Json(ExpenseData {
        status: StatusCode::OK.as_u16(),
        data: expenses,
    }))
}

/// Handle requests for a single expense
pub async fn get(
    State(state): State<ServerState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<ExpenseData<Expense>>, ServerError> {
    let Path(raw) = id?;
    tracing::info!(id = %raw, "fetching expense by id");

    let id = parse_expense_id(&raw)?;
    let expense = state
        .engine
        .get_expense_by_id(id)
        .await
        .inspect_err(|err| tracing::error!(id, "failed to fetch expense by id: {err}"))?;

    tracing::info!(id, expense = %expense.description, "expense fetched successfully");
    Ok(Json(ExpenseData {
        status: StatusCode::OK.as_u16(),
        data: map_expense(expense),
    }))
}

/// Handle requests for creating a new expense.
///
/// The body is decoded as JSON whatever its `Content-Type`. The parsed body
/// is echoed back. It is written to the store only when `persist_created`
/// is enabled.
pub async fn create(
    State(state): State<ServerState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ExpenseAccepted>, ServerError> {
    tracing::info!("creating new expense");

    let Json(payload) = Json::<ExpenseNew>::from_bytes(&body?)?;
    tracing::info!(
        expense = %payload.expense,
        amount = payload.expense_amount,
        due_date = payload.due_date,
        "expense data received"
    );

    if state.options.persist_created {
        let due_date = i32::try_from(payload.due_date).map_err(|_| {
            ServerError::Rejection(format!(
                "due_date {} does not fit the store",
                payload.due_date
            ))
        })?;
        let id = state
            .engine
            .create_expense(&payload.expense, payload.expense_amount, due_date)
            .await
            .inspect_err(|err| tracing::error!("failed to persist expense: {err}"))?;
        tracing::info!(id, "expense persisted");
    }

    tracing::info!(expense = %payload.expense, "expense created successfully");
    Ok(Json(ExpenseAccepted::success(payload)))
}
