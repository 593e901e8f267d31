//! Dashboard module
//!
//! Provides the home page: the current month's totals, charts of the
//! monthly series and the most recent transactions.

mod cards;
mod charts;
mod handlers;

pub use handlers::get_dashboard_page;
