//! Core transaction domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{auth::UserId, category::CategoryId};

/// Backend identifier for a transaction.
pub type TransactionId = i64;

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
}

impl TransactionType {
    /// The value stored by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// The label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Income => "Receita",
            TransactionType::Expense => "Despesa",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction as stored by the backend.
///
/// Transactions are only ever created and read, never edited or deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub description: String,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub date: Date,
    pub category_id: Option<CategoryId>,
    pub user_id: UserId,
    /// The name of the transaction's category, when the query joined it.
    pub category_name: Option<String>,
}

/// A validated transaction ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub description: String,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category_id: CategoryId,
    pub date: Date,
    pub user_id: UserId,
}
