//! Monthly spending limits and how much of them has been used.

use serde::Deserialize;

use crate::{Error, auth::UserID, category::CategoryId, month::Month};

/// Database identifier for a budget.
pub type BudgetId = i64;

/// A spending limit for one expense category in one month.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: UserID,
    pub category_id: CategoryId,
    pub category_name: String,
    pub limit_amount: f64,
    pub month: Month,
}

/// A budget together with the amount spent in its category during its month.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetProgress {
    pub budget: Budget,
    pub spent: f64,
}

impl BudgetProgress {
    /// The share of the limit that has been spent, see [utilization].
    pub fn utilization(&self) -> u8 {
        utilization(self.budget.limit_amount, self.spent)
    }

    pub fn status(&self) -> BudgetStatus {
        BudgetStatus::from_utilization(self.utilization())
    }
}

/// The percentage of `limit_amount` used by `spent`, rounded and capped at 100.
///
/// A limit of zero counts as fully used.
pub fn utilization(limit_amount: f64, spent: f64) -> u8 {
    if limit_amount <= 0.0 {
        return 100;
    }

    let percentage = (spent / limit_amount * 100.0).round();

    percentage.clamp(0.0, 100.0) as u8
}

/// How worried the user should be about a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Ok,
    /// At least 75% used.
    Warning,
    /// The limit has been reached.
    Over,
}

impl BudgetStatus {
    const WARNING_THRESHOLD: u8 = 75;

    pub fn from_utilization(utilization: u8) -> Self {
        if utilization >= 100 {
            BudgetStatus::Over
        } else if utilization >= Self::WARNING_THRESHOLD {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Ok
        }
    }

    /// Tailwind classes for the filled part of a progress bar.
    pub fn bar_style(&self) -> &'static str {
        match self {
            BudgetStatus::Ok => "bg-green-500",
            BudgetStatus::Warning => "bg-yellow-400",
            BudgetStatus::Over => "bg-red-600",
        }
    }
}

/// The form for setting the limit of a category for a month.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BudgetForm {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// The month as "YYYY-MM", as sent by `<input type="month">`.
    pub month: String,
    #[serde(default)]
    pub limit_amount: Option<f64>,
}

/// A budget that passed validation and is ready to be written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewBudget {
    pub category_id: CategoryId,
    pub month: Month,
    pub limit_amount: f64,
}

impl BudgetForm {
    /// # Errors
    ///
    /// - [Error::MissingBudgetFields] if the category or limit is missing.
    /// - [Error::InvalidMonth] if the month cannot be parsed.
    /// - [Error::InvalidAmount] if the limit is negative, infinite or NaN.
    pub fn validate(&self) -> Result<NewBudget, Error> {
        let (Some(category_id), Some(limit_amount)) = (self.category_id, self.limit_amount) else {
            return Err(Error::MissingBudgetFields);
        };

        let month = self.month.parse()?;

        if !limit_amount.is_finite() || limit_amount < 0.0 {
            return Err(Error::InvalidAmount);
        }

        Ok(NewBudget {
            category_id,
            month,
            limit_amount,
        })
    }
}
