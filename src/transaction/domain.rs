//! Core transaction domain types.

use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{Error, auth::UserID, category::CategoryId, kind::Kind, month::Month};

/// Database identifier for a transaction.
pub type TransactionId = i64;

/// An amount of money that came in or went out on a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserID,
    pub category_id: Option<CategoryId>,
    /// The name of the category, `None` if the transaction has no category.
    pub category_name: Option<String>,
    /// The non-negative amount in rubles. `kind` decides the sign.
    pub amount: f64,
    pub kind: Kind,
    pub date: Date,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// The amount with its sign: positive for income, negative for expenses.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            Kind::Income => self.amount,
            Kind::Expense => -self.amount,
        }
    }
}

/// The fields a user supplies when creating or editing a transaction.
///
/// Required fields are optional here so that a missing value can be reported as a
/// validation error instead of a failed request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionForm {
    pub kind: Kind,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub date: Option<Date>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A transaction that passed validation and is ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransaction {
    pub category_id: CategoryId,
    pub amount: f64,
    pub kind: Kind,
    pub date: Date,
    pub description: Option<String>,
}

/// Narrows a transaction listing. `None` means "do not filter on this field".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionFilter {
    pub month: Option<Month>,
    pub kind: Option<Kind>,
    pub category_id: Option<CategoryId>,
}

impl TransactionForm {
    /// Check that the required fields are present and the amount is usable.
    ///
    /// Surrounding whitespace is trimmed from the description and an empty description is
    /// treated as no description.
    ///
    /// # Errors
    ///
    /// - [Error::MissingTransactionFields] if the category, amount or date is missing.
    /// - [Error::InvalidAmount] if the amount is negative, infinite or NaN.
    pub fn validate(&self) -> Result<ValidatedTransaction, Error> {
        let (Some(category_id), Some(amount), Some(date)) =
            (self.category_id, self.amount, self.date)
        else {
            return Err(Error::MissingTransactionFields);
        };

        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidAmount);
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .map(str::to_owned);

        Ok(ValidatedTransaction {
            category_id,
            amount,
            kind: self.kind,
            date,
            description,
        })
    }
}
