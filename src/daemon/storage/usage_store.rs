use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::{
    daemon::processing::categorizer::Category, error::TrackerError, utils::clock::Clock,
    utils::time::date_to_key,
};

use super::{
    entities::{DateFilter, UsageRecord},
    queries,
    schema::open_writer,
};

/// Interface for abstracting the per-day usage table. The sampling loop owns the only
/// implementation that writes.
pub trait UsageStore {
    /// Adds one second to `(category.canonical_title, date)`, creating the row if needed.
    fn record_tick(&mut self, category: &Category, date: NaiveDate) -> Result<(), TrackerError>;

    /// Seconds accumulated for a title on a date, 0 if nothing was recorded.
    fn seconds_today(&self, title: &str, date: NaiveDate) -> Result<i64, TrackerError>;

    /// Seconds accumulated by every title of a category on a date.
    fn category_seconds(&self, category: &str, date: NaiveDate) -> Result<i64, TrackerError>;

    fn query(&self, filter: DateFilter) -> Result<Vec<UsageRecord>, TrackerError>;
}

const UPSERT: &str = "
    INSERT INTO track (title, process_name, category, seconds, date, last_updated)
    VALUES (?1, ?2, ?3, 1, ?4, ?5)
    ON CONFLICT(title, date) DO UPDATE SET
        seconds = seconds + 1,
        last_updated = excluded.last_updated
";

/// The main realization of [UsageStore].
pub struct SqliteUsageStore {
    conn: Connection,
    path: PathBuf,
    clock: Box<dyn Clock>,
}

impl SqliteUsageStore {
    pub fn open(path: &Path, clock: Box<dyn Clock>) -> Result<Self, TrackerError> {
        let conn = open_writer(path)?;
        info!("Opened usage store {path:?}");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            clock,
        })
    }
}

impl UsageStore for SqliteUsageStore {
    fn record_tick(&mut self, category: &Category, date: NaiveDate) -> Result<(), TrackerError> {
        // A single statement runs in its own transaction, readers see the row before or after
        // the increment and nothing in between.
        self.conn.execute(
            UPSERT,
            params![
                category.canonical_title,
                category.raw_process_name,
                category.name,
                date_to_key(date),
                self.clock.time().to_rfc3339(),
            ],
        )?;
        debug!("Recorded tick for {} on {date}", category.canonical_title);
        Ok(())
    }

    fn seconds_today(&self, title: &str, date: NaiveDate) -> Result<i64, TrackerError> {
        Ok(queries::seconds_for_title(&self.conn, title, date)?)
    }

    fn category_seconds(&self, category: &str, date: NaiveDate) -> Result<i64, TrackerError> {
        Ok(queries::seconds_for_category(&self.conn, category, date)?)
    }

    fn query(&self, filter: DateFilter) -> Result<Vec<UsageRecord>, TrackerError> {
        Ok(queries::records(&self.conn, filter)?)
    }
}

impl Drop for SqliteUsageStore {
    fn drop(&mut self) {
        info!("Releasing usage store {:?}", self.path);
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{
        daemon::{
            processing::categorizer::Category,
            storage::{
                entities::{CategoryUsage, DateFilter, DayUsage, TitleUsage},
                queries::UsageReader,
                schema::DATABASE_FILE_NAME,
            },
        },
        utils::clock::test_clock::TestClock,
        window_api::WindowSnapshot,
    };

    use super::{SqliteUsageStore, UsageStore};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn category(title: &str, name: &str) -> Category {
        Category {
            name: name.into(),
            canonical_title: title.into(),
            raw_process_name: format!("{title}-process"),
            source: WindowSnapshot {
                process_id: 42,
                process_name: format!("{title}-process.exe").into(),
                executable_path: "".into(),
                window_title: title.into(),
            },
        }
    }

    fn ticks(store: &mut SqliteUsageStore, category: &Category, date: NaiveDate, n: usize) {
        for _ in 0..n {
            store.record_tick(category, date).unwrap();
        }
    }

    #[test]
    fn test_ticks_accumulate_exactly() -> Result<()> {
        let dir = tempdir()?;
        let mut store = SqliteUsageStore::open(
            &dir.path().join(DATABASE_FILE_NAME),
            Box::new(TestClock::new(day(1))),
        )?;
        let chrome = category("chrome", "Browsing");

        assert_eq!(store.seconds_today("chrome", day(1))?, 0);
        ticks(&mut store, &chrome, day(1), 125);

        let rows = store.query(DateFilter::All)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "chrome");
        assert_eq!(rows[0].category, "Browsing");
        assert_eq!(rows[0].process_name, "chrome-process");
        assert_eq!(rows[0].seconds, 125);
        assert_eq!(rows[0].date, day(1));
        assert_eq!(store.seconds_today("chrome", day(1))?, 125);
        Ok(())
    }

    #[test]
    fn test_rows_are_per_title_and_day() -> Result<()> {
        let dir = tempdir()?;
        let mut store = SqliteUsageStore::open(
            &dir.path().join(DATABASE_FILE_NAME),
            Box::new(TestClock::new(day(1))),
        )?;
        let chrome = category("chrome", "Browsing");
        let code = category("code", "Development");

        ticks(&mut store, &chrome, day(1), 3);
        ticks(&mut store, &chrome, day(2), 2);
        ticks(&mut store, &code, day(2), 4);

        assert_eq!(store.query(DateFilter::All)?.len(), 3);
        assert_eq!(store.seconds_today("chrome", day(1))?, 3);
        assert_eq!(store.seconds_today("chrome", day(2))?, 2);
        assert_eq!(store.category_seconds("Development", day(2))?, 4);
        assert_eq!(store.category_seconds("Development", day(1))?, 0);
        assert_eq!(store.query(DateFilter::Day(day(2)))?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_reader_aggregates() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(DATABASE_FILE_NAME);
        let mut store = SqliteUsageStore::open(&path, Box::new(TestClock::new(day(1))))?;
        ticks(&mut store, &category("chrome", "Browsing"), day(1), 5);
        ticks(&mut store, &category("firefox", "Browsing"), day(2), 2);
        ticks(&mut store, &category("code", "Development"), day(2), 4);
        ticks(&mut store, &category("code", "Development"), day(9), 1);

        let reader = UsageReader::open(&path)?;
        let week = DateFilter::Range(day(1), day(7));

        assert_eq!(
            reader.totals_by_category(week)?,
            vec![
                CategoryUsage {
                    category: "Browsing".into(),
                    seconds: 7
                },
                CategoryUsage {
                    category: "Development".into(),
                    seconds: 4
                },
            ]
        );
        assert_eq!(
            reader.top_titles(DateFilter::All, 2)?,
            vec![
                TitleUsage {
                    title: "chrome".into(),
                    category: "Browsing".into(),
                    seconds: 5
                },
                TitleUsage {
                    title: "code".into(),
                    category: "Development".into(),
                    seconds: 5
                },
            ]
        );
        assert_eq!(
            reader.totals_by_day(week)?,
            vec![
                DayUsage {
                    date: day(1),
                    seconds: 5
                },
                DayUsage {
                    date: day(2),
                    seconds: 6
                },
            ]
        );
        assert_eq!(reader.grand_total(week)?, 11);
        assert_eq!(reader.grand_total(DateFilter::All)?, 12);
        Ok(())
    }

    #[test]
    fn test_reader_tolerates_empty_results() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(DATABASE_FILE_NAME);
        let _store = SqliteUsageStore::open(&path, Box::new(TestClock::new(day(1))))?;

        let reader = UsageReader::open(&path)?;
        assert!(reader.records(DateFilter::Day(day(1)))?.is_empty());
        assert!(reader.totals_by_category(DateFilter::All)?.is_empty());
        assert!(reader.top_titles(DateFilter::All, 10)?.is_empty());
        assert_eq!(reader.grand_total(DateFilter::All)?, 0);
        Ok(())
    }

    #[test]
    fn test_reader_sees_committed_ticks_while_writer_is_open() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(DATABASE_FILE_NAME);
        let mut store = SqliteUsageStore::open(&path, Box::new(TestClock::new(day(1))))?;
        let chrome = category("chrome", "Browsing");
        let reader = UsageReader::open(&path)?;

        for expected in 1..=10 {
            store.record_tick(&chrome, day(1))?;
            let rows = reader.records(DateFilter::Day(day(1)))?;
            assert_eq!(rows[0].seconds, expected);
        }
        Ok(())
    }
}
