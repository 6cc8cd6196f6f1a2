//! Dashboard module
//!
//! Provides an overview page with the user's balance, spending per category, recent
//! transactions and this month's budgets.

mod aggregation;
mod charts;
mod page;

pub use aggregation::{Balance, CategoryTotal, balance, category_breakdown, recent};
pub use page::get_dashboard_page;
