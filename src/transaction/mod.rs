//! Income and expense transactions, and the pages for listing, creating, editing and
//! deleting them.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod form;
mod list;

pub use create::{create_transaction_endpoint, get_new_transaction_page};
pub use db::{
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    list_transactions, update_transaction,
};
pub use delete::delete_transaction_endpoint;
pub use domain::{
    Transaction, TransactionFilter, TransactionForm, TransactionId, ValidatedTransaction,
};
pub use edit::{get_edit_transaction_page, update_transaction_endpoint};
pub use list::get_transactions_page;
