//! Summaries computed from a user's transactions.
//!
//! These functions only look at the transactions they are given. The caller decides whose
//! transactions and which period to pass in.

use std::collections::HashMap;

use crate::{kind::Kind, transaction::Transaction};

/// The label used for expenses whose category is missing.
pub(super) const UNCATEGORIZED_LABEL: &str = "Без категории";

/// Total income, total expenses and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Balance {
    pub income: f64,
    pub expense: f64,
}

impl Balance {
    /// Income minus expenses.
    pub fn total(&self) -> f64 {
        self.income - self.expense
    }
}

/// The amount spent in one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

/// Sum the income and expense amounts of `transactions`.
pub fn balance(transactions: &[Transaction]) -> Balance {
    transactions
        .iter()
        .fold(Balance::default(), |mut balance, transaction| {
            match transaction.kind {
                Kind::Income => balance.income += transaction.amount,
                Kind::Expense => balance.expense += transaction.amount,
            }

            balance
        })
}

/// Sum the expenses of `transactions` per category name.
///
/// Categories without expenses are left out. The result is ordered by total, largest first,
/// with ties broken by name.
pub fn category_breakdown(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for transaction in transactions {
        if transaction.kind != Kind::Expense {
            continue;
        }

        let name = transaction
            .category_name
            .as_deref()
            .unwrap_or(UNCATEGORIZED_LABEL);
        *totals.entry(name).or_insert(0.0) += transaction.amount;
    }

    let mut breakdown: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(name, total)| CategoryTotal {
            name: name.to_owned(),
            total,
        })
        .collect();

    breakdown.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

    breakdown
}

/// The `count` most recent transactions, newest first.
///
/// Transactions on the same day are ordered by ID, the most recently inserted first.
pub fn recent(transactions: &[Transaction], count: usize) -> Vec<&Transaction> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    sorted.truncate(count);

    sorted
}
