pub use error::EngineError;
pub use expenses::Expense;
pub use ops::{Engine, EngineBuilder};

mod error;
mod expenses;
mod ops;

type ResultEngine<T> = Result<T, EngineError>;
