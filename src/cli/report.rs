use std::{fmt::Write, path::PathBuf};

use ansi_term::Style;
use anyhow::Result;
use chrono::Local;
use clap::Parser;

use crate::{
    daemon::storage::{
        entities::{CategoryUsage, DateFilter, DayUsage, TitleUsage},
        queries::UsageReader,
        schema::DATABASE_FILE_NAME,
    },
    utils::{
        dir::create_application_default_path,
        percentage::{Percentage, seconds_percentage},
        time::format_seconds,
    },
};

use super::filter::FilterArgs;

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long, default_value_t = 10, help = "Number of titles shown")]
    top: usize,
    #[arg(short = 'p', long = "percentage", help = "Hide titles below the specified share of the total", default_value = "0")]
    min_percentage: Percentage,
    #[arg(long, help = "Application directory")]
    dir: Option<PathBuf>,
}

/// Everything `report` prints, read in one go from the usage table.
#[derive(Debug, PartialEq)]
pub struct Report {
    pub categories: Vec<CategoryUsage>,
    pub titles: Vec<TitleUsage>,
    pub days: Vec<DayUsage>,
    pub total: i64,
}

impl Report {
    pub fn read(reader: &UsageReader, filter: DateFilter, top: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            categories: reader.totals_by_category(filter)?,
            titles: reader.top_titles(filter, top)?,
            days: reader.totals_by_day(filter)?,
            total: reader.grand_total(filter)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0 && self.categories.is_empty()
    }

    /// Renders the report. Percentages are shares of the grand total of the filter.
    pub fn render(&self, min_percentage: Percentage, styled: bool) -> String {
        let header = |text: &str| {
            if styled {
                Style::new().bold().paint(text).to_string()
            } else {
                text.to_string()
            }
        };
        let mut out = String::new();

        let _ = writeln!(out, "{}", header("Categories"));
        for entry in &self.categories {
            let _ = writeln!(
                out,
                "{}\t{}\t{}",
                seconds_percentage(entry.seconds, self.total),
                format_seconds(entry.seconds),
                entry.category
            );
        }

        let _ = writeln!(out, "\n{}", header("Titles"));
        for entry in &self.titles {
            let share = seconds_percentage(entry.seconds, self.total);
            if *share < *min_percentage {
                continue;
            }
            let _ = writeln!(
                out,
                "{share}\t{}\t{}\t{}",
                format_seconds(entry.seconds),
                entry.title,
                entry.category
            );
        }

        if self.days.len() > 1 {
            let _ = writeln!(out, "\n{}", header("Days"));
            for entry in &self.days {
                let _ = writeln!(out, "{}\t{}", entry.date, format_seconds(entry.seconds));
            }
        }

        let _ = writeln!(out, "\n{}\t{}", header("Total"), format_seconds(self.total));
        out
    }
}

/// Command to process `report`. Prints how the tracked time was spent over the selected days.
pub async fn process_report_command(command: ReportCommand) -> Result<()> {
    let filter = command.filter.resolve(Local::now())?;
    let dir = command.dir.map_or_else(create_application_default_path, Ok)?;
    let db_path = dir.join(DATABASE_FILE_NAME);
    if !db_path.exists() {
        println!("Nothing was recorded yet, {db_path:?} doesn't exist");
        return Ok(());
    }

    let reader = UsageReader::open(&db_path)?;
    let report = Report::read(&reader, filter, command.top)?;
    if report.is_empty() {
        println!("No usage recorded for {filter:?}");
        return Ok(());
    }
    print!("{}", report.render(command.min_percentage, true));
    Ok(())
}
