use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{format_cents, parse_cents, Category, Expense, NewExpense, MAX_AMOUNT};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all required fields (missing {0})")]
    MissingField(&'static str),

    #[error("Please enter a valid positive number for the amount: '{0}'")]
    InvalidAmount(String),

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Amount is too large (maximum {})", format_cents(MAX_AMOUNT))]
    AmountTooLarge,

    #[error("Unknown category '{0}' (expected one of: Food, Transportation, Entertainment, Rent, Other)")]
    UnknownCategory(String),

    #[error("Invalid date '{0}', use YYYY-MM-DD")]
    InvalidDate(String),
}

/// Raw expense input as typed by the user, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub amount: String,
    pub category: String,
    pub date: String,
    pub description: String,
}

impl ExpenseDraft {
    /// Draft pre-filled from an existing record, for editing.
    pub fn from_expense(expense: &Expense) -> Self {
        Self {
            amount: format_cents(expense.amount),
            category: expense.category.map(|c| c.to_string()).unwrap_or_default(),
            date: expense.date.format("%Y-%m-%d").to_string(),
            description: expense.description.clone().unwrap_or_default(),
        }
    }

    /// Check the draft and turn it into a payload the store accepts.
    pub fn validate(&self) -> Result<NewExpense, ValidationError> {
        let amount = self.amount.trim();
        let category = self.category.trim();
        let date = self.date.trim();

        if amount.is_empty() {
            return Err(ValidationError::MissingField("amount"));
        }
        if category.is_empty() {
            return Err(ValidationError::MissingField("category"));
        }
        if date.is_empty() {
            return Err(ValidationError::MissingField("date"));
        }

        let amount = parse_cents(amount)
            .map_err(|_| ValidationError::InvalidAmount(amount.to_string()))?;
        if amount <= 0 {
            return Err(ValidationError::NonPositiveAmount);
        }
        if amount > MAX_AMOUNT {
            return Err(ValidationError::AmountTooLarge);
        }

        let category = Category::parse(category)
            .ok_or_else(|| ValidationError::UnknownCategory(category.to_string()))?;

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(date.to_string()))?;

        let description = self.description.trim();
        let mut expense = NewExpense::new(amount, category, date);
        if !description.is_empty() {
            expense = expense.with_description(description);
        }
        Ok(expense)
    }
}
