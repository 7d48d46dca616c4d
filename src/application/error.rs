use thiserror::Error;

use crate::domain::ExpenseId;
use crate::storage::StorageError;

use super::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error("Invalid expense: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AppError {
    /// True when the host storage refused the write for lack of space.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, AppError::Storage(StorageError::QuotaExceeded { .. }))
    }
}
