use serde::{Deserialize, Serialize};

use crate::domain::{Cents, Expense};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: Cents,
    pub count: usize,
    pub categories: Vec<CategoryTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Cents,
    pub count: usize,
    pub percentage: f64,
}

/// Sum of all amounts. Saturates at the `Cents` bounds instead of wrapping.
pub fn total(expenses: &[Expense]) -> Cents {
    expenses
        .iter()
        .fold(0, |sum: Cents, e| sum.saturating_add(e.amount))
}

/// Per-category sums, in the order each category first appears.
/// Records without a category are grouped under "Uncategorized".
pub fn totals_by_category(expenses: &[Expense]) -> Vec<(&'static str, Cents)> {
    group(expenses)
        .into_iter()
        .map(|(label, total, _)| (label, total))
        .collect()
}

pub fn summarize(expenses: &[Expense]) -> Summary {
    let total = total(expenses);
    let categories = group(expenses)
        .into_iter()
        .map(|(label, cat_total, count)| CategoryTotal {
            category: label.to_string(),
            total: cat_total,
            count,
            percentage: if total > 0 {
                cat_total as f64 * 100.0 / total as f64
            } else {
                0.0
            },
        })
        .collect();

    Summary {
        total,
        count: expenses.len(),
        categories,
    }
}

fn group(expenses: &[Expense]) -> Vec<(&'static str, Cents, usize)> {
    let mut groups: Vec<(&'static str, Cents, usize)> = Vec::new();
    for expense in expenses {
        let label = expense.category_label();
        match groups.iter_mut().find(|(l, _, _)| *l == label) {
            Some((_, sum, count)) => {
                *sum = sum.saturating_add(expense.amount);
                *count += 1;
            }
            None => groups.push((label, expense.amount, 1)),
        }
    }
    groups
}
