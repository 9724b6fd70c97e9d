//! The module contains the errors the engine can throw.
//!
//! Errors carry only their kind. Driver details are logged where the
//! failure is mapped and never travel further.
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    #[error("resource not found")]
    NotFound,
    #[error("resource already exists")]
    DuplicateConflict,
    #[error("invalid input")]
    InvalidInput,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("internal error")]
    Internal,
}
