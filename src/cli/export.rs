use std::{
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::info;

use crate::{
    daemon::storage::{entities::UsageRecord, queries::UsageReader, schema::DATABASE_FILE_NAME},
    utils::{dir::create_application_default_path, time::date_to_key},
};

use super::filter::FilterArgs;

const HEADER: [&str; 6] = [
    "title",
    "process_name",
    "category",
    "seconds",
    "date",
    "last_updated",
];

#[derive(Debug, Parser)]
pub struct ExportCommand {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long, short, help = "File the rows are written to")]
    output: PathBuf,
    #[arg(long, help = "Application directory")]
    dir: Option<PathBuf>,
}

/// Tabs and line breaks would split a field, they are replaced with spaces.
fn clean_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

/// Writes `records` as tab separated values with a header line.
pub fn write_tsv(records: &[UsageRecord], writer: impl Write) -> std::io::Result<()> {
    let mut writer = BufWriter::new(writer);
    writeln!(writer, "{}", HEADER.join("\t"))?;
    for record in records {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            clean_field(&record.title),
            clean_field(&record.process_name),
            clean_field(&record.category),
            record.seconds,
            date_to_key(record.date),
            record.last_updated.to_rfc3339(),
        )?;
    }
    writer.flush()
}

/// Command to process `export`. Dumps the raw rows of the selected days.
pub async fn process_export_command(command: ExportCommand) -> Result<()> {
    let filter = command.filter.resolve(Local::now())?;
    let dir = command.dir.map_or_else(create_application_default_path, Ok)?;
    let db_path = dir.join(DATABASE_FILE_NAME);
    if !db_path.exists() {
        println!("Nothing was recorded yet, {db_path:?} doesn't exist");
        return Ok(());
    }

    let records = UsageReader::open(&db_path)?.records(filter)?;
    write_tsv(&records, std::fs::File::create(&command.output)?)?;
    info!("Exported {} rows to {:?}", records.len(), command.output);
    if records.is_empty() {
        println!("No usage recorded for {filter:?}, only the header was written");
    } else {
        println!("Exported {} rows to {:?}", records.len(), command.output);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;

    fn record(title: &str, seconds: i64) -> UsageRecord {
        UsageRecord {
            title: title.into(),
            process_name: "chrome".into(),
            category: "Browsing".into(),
            seconds,
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            last_updated: Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_writes_header_and_rows() {
        let mut out = Vec::new();
        write_tsv(&[record("chrome", 125), record("Tabs\tand\nlines", 3)], &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "title\tprocess_name\tcategory\tseconds\tdate\tlast_updated",
                "chrome\tchrome\tBrowsing\t125\t2024-04-01\t2024-04-01T10:00:00+00:00",
                "Tabs and lines\tchrome\tBrowsing\t3\t2024-04-01\t2024-04-01T10:00:00+00:00",
            ]
        );
    }

    #[test]
    fn test_empty_export_has_header() {
        let mut out = Vec::new();
        write_tsv(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", HEADER.join("\t")));
    }
}
