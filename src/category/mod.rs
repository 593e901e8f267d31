//! Categories label transactions of one type, e.g. 'Mercado' for expenses.
//!
//! Categories are managed from the transactions page: they can be created
//! and deleted but never renamed.

mod domain;
mod manager;

pub use domain::{Category, CategoryId, CategoryName, NewCategory, compare_by_name};
pub use manager::{delete_category, post_category};
