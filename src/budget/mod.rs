//! Monthly spending limits per expense category.

mod db;
mod delete;
mod domain;
mod page;
mod view;

pub use db::{
    create_budget_table, delete_budget, list_budget_progress, list_budgets_for_month,
    upsert_budget,
};
pub use delete::delete_budget_endpoint;
pub use domain::{
    Budget, BudgetForm, BudgetId, BudgetProgress, BudgetStatus, NewBudget, utilization,
};
pub use page::{get_budgets_page, upsert_budget_endpoint};
pub use view::budget_progress_item;
