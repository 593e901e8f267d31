//! Transactions and the page for recording them.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the validated `NewTransaction` for inserts
//! - The four step wizard that builds a new transaction
//! - The transactions page state, its rendering and its route handlers

mod domain;
mod endpoints;
mod page;
pub(crate) mod view;
pub(crate) mod wizard;

pub use domain::{NewTransaction, Transaction, TransactionId, TransactionType};
pub(crate) use endpoints::reload_transactions_page;
pub use endpoints::{TransactionsState, get_transactions_page, post_transaction, post_wizard};
pub use page::{MountId, TransactionsPage, TransactionsPageSlot};
pub use wizard::{Wizard, WizardError, WizardStep};
