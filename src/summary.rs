//! Aggregates computed by the backend.
//!
//! These are never recomputed locally. The only derived value is the balance.

use serde::Deserialize;

use crate::backend::wire;

/// Income and expense totals for the current month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MonthlySummary {
    #[serde(deserialize_with = "wire::number", default)]
    pub total_income: f64,
    #[serde(deserialize_with = "wire::number", default)]
    pub total_expense: f64,
}

impl MonthlySummary {
    pub fn balance(&self) -> f64 {
        self.total_income - self.total_expense
    }
}

/// Income and expense for one month of the history shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonthlyTotals {
    /// The month label as produced by the backend, e.g. "2024-03".
    pub month: String,
    #[serde(deserialize_with = "wire::number", default)]
    pub income: f64,
    #[serde(deserialize_with = "wire::number", default)]
    pub expense: f64,
}

/// Income and expense totals for a month picked in the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MonthSummary {
    #[serde(rename = "total_receitas", deserialize_with = "wire::number", default)]
    pub total_income: f64,
    #[serde(rename = "total_despesas", deserialize_with = "wire::number", default)]
    pub total_expense: f64,
}

impl MonthSummary {
    pub fn balance(&self) -> f64 {
        self.total_income - self.total_expense
    }
}
