//! Categories partition a user's transactions into income and expense buckets.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;
mod options;

pub use create::create_category_endpoint;
pub use db::{
    create_category, create_category_table, delete_category, get_category, list_categories,
    rename_category, seed_default_categories,
};
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryId, CategoryName};
pub use edit::{get_edit_category_page, rename_category_endpoint};
pub use list::get_categories_page;
pub use options::{category_options_view, get_category_options};
