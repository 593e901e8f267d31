//! Core category domain types.

use std::{cmp::Ordering, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{Error, auth::UserId, transaction::TransactionType};

/// Backend identifier for a category.
pub type CategoryId = i64;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name from user input.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is
    /// empty after trimming.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is trimmed and not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user defined label for transactions of one type, e.g. 'Mercado' for
/// expenses or 'Salário' for income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: CategoryName,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub user_id: UserId,
}

/// A category that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCategory {
    pub name: CategoryName,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub user_id: UserId,
}

/// The order categories are listed in: by name ignoring case, then by the
/// exact name.
pub fn compare_by_name(a: &Category, b: &Category) -> Ordering {
    let a = a.name.as_ref();
    let b = b.name.as_ref();

    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}


#[cfg(test)]
mod category_order_tests {
    use std::cmp::Ordering;

    use crate::{auth::UserId, transaction::TransactionType};

    use super::{Category, CategoryName, compare_by_name};

    fn category(name: &str) -> Category {
        Category {
            id: 1,
            name: CategoryName::new_unchecked(name),
            transaction_type: TransactionType::Expense,
            user_id: UserId::new("user"),
        }
    }

    #[test]
    fn ignores_case_first() {
        assert_eq!(
            compare_by_name(&category("alimentação"), &category("Lazer")),
            Ordering::Less
        );
    }

    #[test]
    fn breaks_ties_with_exact_name() {
        assert_eq!(
            compare_by_name(&category("Lazer"), &category("lazer")),
            Ordering::Less
        );
    }

    #[test]
    fn deserializes_backend_row() {
        let json = r#"{"id":7,"name":"Mercado","type":"expense","user_id":"abc","created_at":"2024-03-01T00:00:00Z"}"#;

        let got: Category = serde_json::from_str(json).unwrap();

        assert_eq!(got.id, 7);
        assert_eq!(got.name.as_ref(), "Mercado");
        assert_eq!(got.transaction_type, TransactionType::Expense);
    }
}
