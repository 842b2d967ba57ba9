use std::{
    fs::File,
    io::Read,
    path::PathBuf,
};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::{
    errors::ReportError,
    models::{DataMapping, WORKDAYS, WeekKey, WeeklyRecord},
    traits::DataSource,
};

const FIELDS_PER_LINE: usize = WORKDAYS + 1;

/// Reads worked hours from lines shaped `date,Mon,Tue,Wed,Thu,Fri`.
///
/// The date is a `YYYY-MM-DD` Sunday and an empty hour column means a full day.
/// Lines that do not fit are logged and skipped.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parses every line of `input` into a mapping of week to hours.
    ///
    /// # Arguments
    /// * `input` - Headerless comma separated lines.
    ///
    /// # Returns
    /// The valid weeks. A later line for the same week replaces an earlier one.
    /// Only I/O failures are errors.
    pub fn parse<R: Read>(input: R) -> Result<DataMapping> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(Trim::All)
            .from_reader(input);

        let mut weeks = DataMapping::new();
        let mut rejected = 0usize;

        for (index, rec) in reader.records().enumerate() {
            let record = match rec {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    let line = e.position().map(|p| p.line());
                    warn!(line = ?line, error = %e, "unreadable line, skipping record");
                    rejected += 1;
                    continue;
                }
            };
            let line = record.position().map_or(index as u64 + 1, |p| p.line());
            debug!(line, fields = ?record, "processing line");

            match Self::parse_record(&record) {
                Ok((week, hours)) => {
                    if let Some(previous) = weeks.insert(week, hours) {
                        debug!(line, %week, %previous, "later line replaces earlier record");
                    }
                }
                Err(e) => {
                    warn!(line, error = %e, "skipping record");
                    rejected += 1;
                }
            }
        }

        info!(weeks = weeks.len(), rejected, "csv data loaded");
        Ok(weeks)
    }

    fn parse_record(record: &StringRecord) -> Result<(WeekKey, WeeklyRecord), ReportError> {
        if record.len() != FIELDS_PER_LINE {
            return Err(ReportError::FieldCount(record.len()));
        }
        let week = WeekKey::parse(&record[0])?;
        let hours = WeeklyRecord::from_fields(record.iter().skip(1))?;
        Ok((week, hours))
    }
}

impl DataSource for CsvSource {
    fn weekly_hours(&self, _start: WeekKey) -> Result<DataMapping> {
        let file = File::open(&self.path)
            .with_context(|| format!("cannot open csv file {}", self.path.display()))?;
        let weeks = Self::parse(file)
            .with_context(|| format!("cannot read csv file {}", self.path.display()))?;
        debug!(data = ?weeks, "csv data");
        Ok(weeks)
    }
}
