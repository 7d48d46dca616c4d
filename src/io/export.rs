use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::domain::{format_cents, Expense};

/// Full snapshot of the expense collection for JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub expenses: Vec<Expense>,
}

/// Writes an expense collection out in CSV or JSON.
pub struct Exporter<'a> {
    expenses: &'a [Expense],
}

impl<'a> Exporter<'a> {
    pub fn new(expenses: &'a [Expense]) -> Self {
        Self { expenses }
    }

    /// Export expenses to CSV, one row per record in insertion order.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["id", "date", "amount", "category", "description"])?;

        for expense in self.expenses {
            csv_writer.write_record([
                expense.id.to_string(),
                expense.date.format("%Y-%m-%d").to_string(),
                format_cents(expense.amount),
                expense.category_label().to_string(),
                expense.description.clone().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(self.expenses.len())
    }

    /// Export the collection as a pretty-printed JSON snapshot.
    pub fn export_json<W: Write>(&self, mut writer: W) -> Result<ExpenseSnapshot> {
        let snapshot = ExpenseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            expenses: self.expenses.to_vec(),
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, ExpenseId, NewExpense};
    use chrono::NaiveDate;

    fn sample() -> Vec<Expense> {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        vec![
            Expense::from_new(
                ExpenseId(1),
                NewExpense::new(5000, Category::Food, date).with_description("Lunch, with friends"),
            ),
            Expense {
                id: ExpenseId(2),
                amount: 3000,
                category: None,
                date,
                description: None,
            },
        ]
    }

    #[test]
    fn test_export_csv() {
        let expenses = sample();
        let mut out = Vec::new();
        let count = Exporter::new(&expenses).export_csv(&mut out).unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,date,amount,category,description");
        assert_eq!(lines[1], r#"1,2024-01-01,50.00,Food,"Lunch, with friends""#);
        assert_eq!(lines[2], "2,2024-01-01,30.00,Uncategorized,");
    }

    #[test]
    fn test_export_json_snapshot() {
        let expenses = sample();
        let mut out = Vec::new();
        let snapshot = Exporter::new(&expenses).export_json(&mut out).unwrap();
        assert_eq!(snapshot.expenses, expenses);

        let parsed: ExpenseSnapshot = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(parsed.expenses.len(), 2);
    }
}
