//! Helpers for the loosely typed payloads returned by the backend.

use serde::{Deserialize, Deserializer};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Deserialize an ISO 8601 calendar date. Timestamps are cut down to their
/// date part.
pub fn date<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let day = text.get(..10).unwrap_or(&text);

    Date::parse(day, DATE_FORMAT)
        .map_err(|error| serde::de::Error::custom(format!("invalid date {text:?}: {error}")))
}

/// Format a date the way the backend stores it, e.g. "2024-03-10".
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parse a date in the format produced by [format_date], e.g. from an HTML
/// date input.
pub fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text.trim(), DATE_FORMAT).ok()
}

/// Deserialize a number that may arrive as a JSON number, a numeric string
/// (Postgres `numeric`) or `null`, which reads as zero.
pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    match Option::<Number>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(Number::Float(value)) => Ok(value),
        Some(Number::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|error| serde::de::Error::custom(format!("invalid number {text:?}: {error}"))),
    }
}

/// An RPC result, which is either a single row or a set of rows depending on
/// how the function was declared.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    /// The first row, if any.
    pub fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::Many(rows) => rows.into_iter().next(),
            OneOrMany::One(row) => Some(row),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(rows) => rows,
            OneOrMany::One(row) => vec![row],
        }
    }
}
