use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Days, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::daemon::storage::entities::DateFilter;

use super::Args;

const WEEK_DAYS: u64 = 6;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Days a `report` or `export` covers. Without any flag only today is used.
#[derive(Debug, Clone, clap::Args)]
pub struct FilterArgs {
    #[arg(long, help = "Only today", conflicts_with_all = ["yesterday", "week", "date", "from", "all"])]
    today: bool,
    #[arg(long, help = "Only yesterday", conflicts_with_all = ["week", "date", "from", "all"])]
    yesterday: bool,
    #[arg(long, help = "Last 7 days including today", conflicts_with_all = ["date", "from", "all"])]
    week: bool,
    #[arg(
        long,
        help = "A single day. Examples are \"yesterday\", \"2 days ago\", \"15/03/2025\"",
        conflicts_with_all = ["from", "all"]
    )]
    date: Option<String>,
    #[arg(long, help = "Start of an inclusive range of days", requires = "to", conflicts_with = "all")]
    from: Option<String>,
    #[arg(long, help = "End of an inclusive range of days", requires = "from")]
    to: Option<String>,
    #[arg(long, help = "Everything ever recorded")]
    all: bool,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

impl FilterArgs {
    /// Turns the flags into a [DateFilter], relative expressions are evaluated against `now`.
    pub fn resolve(&self, now: DateTime<Local>) -> Result<DateFilter> {
        let today = now.date_naive();
        let dialect = self.date_style.into();
        let parse = |name: &str, text: &str| -> Result<NaiveDate> {
            parse_date_string(text, now, dialect)
                .map(|v| v.with_timezone(&Local).date_naive())
                .map_err(|e| {
                    Args::command()
                        .error(
                            clap::error::ErrorKind::ValueValidation,
                            format!("Failed to validate {name} date {text:?}: {e}"),
                        )
                        .into()
                })
        };

        let filter = if self.all {
            DateFilter::All
        } else if let (Some(from), Some(to)) = (&self.from, &self.to) {
            DateFilter::Range(parse("from", from)?, parse("to", to)?)
        } else if let Some(date) = &self.date {
            DateFilter::Day(parse("the", date)?)
        } else if self.week {
            DateFilter::Range(today - Days::new(WEEK_DAYS), today)
        } else if self.yesterday {
            DateFilter::Day(today - Days::new(1))
        } else {
            DateFilter::Day(today)
        };
        Ok(filter)
    }
}
