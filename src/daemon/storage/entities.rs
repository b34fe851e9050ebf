use chrono::{DateTime, NaiveDate, Utc};

use crate::utils::time::date_to_key;

/// One row of the usage table. `(title, date)` is the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub title: String,
    pub process_name: String,
    pub category: String,
    pub seconds: i64,
    pub date: NaiveDate,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryUsage {
    pub category: String,
    pub seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleUsage {
    pub title: String,
    pub category: String,
    pub seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayUsage {
    pub date: NaiveDate,
    pub seconds: i64,
}

/// Restricts reporting queries to a set of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    All,
    Day(NaiveDate),
    /// Both ends inclusive.
    Range(NaiveDate, NaiveDate),
}

impl DateFilter {
    /// Returns a `WHERE` clause and its positional parameters.
    pub(super) fn where_clause(&self) -> (&'static str, Vec<String>) {
        match *self {
            DateFilter::All => ("", vec![]),
            DateFilter::Day(day) => ("WHERE date = ?1", vec![date_to_key(day)]),
            DateFilter::Range(from, to) => (
                "WHERE date BETWEEN ?1 AND ?2",
                vec![date_to_key(from.min(to)), date_to_key(from.max(to))],
            ),
        }
    }
}
