use serde::{Deserialize, Serialize};

pub mod expense {
    use super::*;

    /// An expense as exposed on the wire.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Expense {
        pub id: i64,
        pub expense: String,
        pub expense_amount: f64,
        pub due_date: i64,
    }

    /// Body of `POST /expense/`.
    ///
    /// Every field is required; unknown fields are ignored. `due_date` is
    /// carried verbatim.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub expense: String,
        pub expense_amount: f64,
        pub due_date: i64,
    }

    /// Read envelope, `status` carries the numeric HTTP status.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseData<T> {
        pub status: u16,
        pub data: T,
    }

    /// Create envelope, `status` is always `"success"`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseAccepted {
        pub status: String,
        pub data: ExpenseNew,
    }

    impl ExpenseAccepted {
        pub fn success(data: ExpenseNew) -> Self {
            Self {
                status: "success".to_string(),
                data,
            }
        }
    }
}

/// Body of every failed response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
