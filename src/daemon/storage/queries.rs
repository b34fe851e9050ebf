//! Read side of the usage table. Used by the policy engine through
//! [UsageStore](super::usage_store::UsageStore) and by reporting through [UsageReader].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter, types::Type};

use crate::utils::time::{date_to_key, key_to_date};

use super::{
    entities::{CategoryUsage, DateFilter, DayUsage, TitleUsage, UsageRecord},
    schema::open_reader,
};

pub fn seconds_for_title(conn: &Connection, title: &str, date: NaiveDate) -> rusqlite::Result<i64> {
    let seconds = conn
        .query_row(
            "SELECT seconds FROM track WHERE title = ?1 AND date = ?2",
            params![title, date_to_key(date)],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(seconds.unwrap_or(0))
}

pub fn seconds_for_category(
    conn: &Connection,
    category: &str,
    date: NaiveDate,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(seconds), 0) FROM track WHERE category = ?1 AND date = ?2",
        params![category, date_to_key(date)],
        |row| row.get(0),
    )
}

pub fn records(conn: &Connection, filter: DateFilter) -> rusqlite::Result<Vec<UsageRecord>> {
    let (clause, values) = filter.where_clause();
    let mut stmt = conn.prepare(&format!(
        "SELECT title, process_name, category, seconds, date, last_updated
         FROM track {clause}
         ORDER BY date, title"
    ))?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(UsageRecord {
            title: row.get(0)?,
            process_name: row.get(1)?,
            category: row.get(2)?,
            seconds: row.get(3)?,
            date: date_column(row, 4)?,
            last_updated: timestamp_column(row, 5)?,
        })
    })?;
    rows.collect()
}

pub fn totals_by_category(
    conn: &Connection,
    filter: DateFilter,
) -> rusqlite::Result<Vec<CategoryUsage>> {
    let (clause, values) = filter.where_clause();
    let mut stmt = conn.prepare(&format!(
        "SELECT category, SUM(seconds) AS total
         FROM track {clause}
         GROUP BY category
         ORDER BY total DESC, category"
    ))?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(CategoryUsage {
            category: row.get(0)?,
            seconds: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Titles with the most accumulated time. A title keeps the category of its latest row.
pub fn top_titles(
    conn: &Connection,
    filter: DateFilter,
    limit: usize,
) -> rusqlite::Result<Vec<TitleUsage>> {
    let (clause, values) = filter.where_clause();
    let mut stmt = conn.prepare(&format!(
        "SELECT title,
                (SELECT t.category FROM track t WHERE t.title = track.title
                 ORDER BY t.date DESC LIMIT 1) AS category,
                SUM(seconds) AS total
         FROM track {clause}
         GROUP BY title
         ORDER BY total DESC, title
         LIMIT {limit}"
    ))?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(TitleUsage {
            title: row.get(0)?,
            category: row.get(1)?,
            seconds: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn totals_by_day(conn: &Connection, filter: DateFilter) -> rusqlite::Result<Vec<DayUsage>> {
    let (clause, values) = filter.where_clause();
    let mut stmt = conn.prepare(&format!(
        "SELECT date, SUM(seconds)
         FROM track {clause}
         GROUP BY date
         ORDER BY date"
    ))?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(DayUsage {
            date: date_column(row, 0)?,
            seconds: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn grand_total(conn: &Connection, filter: DateFilter) -> rusqlite::Result<i64> {
    let (clause, values) = filter.where_clause();
    conn.query_row(
        &format!("SELECT COALESCE(SUM(seconds), 0) FROM track {clause}"),
        params_from_iter(values),
        |row| row.get(0),
    )
}

fn date_column(row: &Row, index: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(index)?;
    key_to_date(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// Independent read-only session over the usage table, for reporting and export.
pub struct UsageReader {
    conn: Connection,
}

impl UsageReader {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        Ok(Self {
            conn: open_reader(path)?,
        })
    }

    pub fn records(&self, filter: DateFilter) -> rusqlite::Result<Vec<UsageRecord>> {
        records(&self.conn, filter)
    }

    pub fn totals_by_category(&self, filter: DateFilter) -> rusqlite::Result<Vec<CategoryUsage>> {
        totals_by_category(&self.conn, filter)
    }

    pub fn top_titles(&self, filter: DateFilter, limit: usize) -> rusqlite::Result<Vec<TitleUsage>> {
        top_titles(&self.conn, filter, limit)
    }

    pub fn totals_by_day(&self, filter: DateFilter) -> rusqlite::Result<Vec<DayUsage>> {
        totals_by_day(&self.conn, filter)
    }

    pub fn grand_total(&self, filter: DateFilter) -> rusqlite::Result<i64> {
        grand_total(&self.conn, filter)
    }
}
