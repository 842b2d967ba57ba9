use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    calendar::CalendarEvent,
    models::{DataMapping, OverdueSet, WeekKey, WeeklyRecord},
};

/// CSVWrite trait provides a method to write a record to a CSV sink.
pub trait CSVWrite {
    /// Writes a record to a CSV sink.
    ///
    /// # Arguments
    /// * `record` - The record to write that is Serializable.
    ///
    /// # Returns
    /// A Result indicating success or failure.
    fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()>;

    /// Flushes anything buffered so far.
    fn flush(&mut self) -> Result<()>;
}

/// OverdueResolver trait provides the weeks the backend still waits for.
pub trait OverdueResolver {
    /// Fetches the current set of overdue weeks.
    ///
    /// # Returns
    /// The overdue weeks, or the collaborator failure.
    fn overdue_weeks(&self) -> Result<OverdueSet>;
}

/// Submitter trait files one week of hours with the backend.
pub trait Submitter {
    /// Submits the hours worked during `week`.
    ///
    /// # Arguments
    /// * `week` - The Sunday starting the reported week.
    /// * `hours` - Monday to Friday hours.
    ///
    /// # Returns
    /// A Result indicating success or failure.
    fn submit(&self, week: WeekKey, hours: &WeeklyRecord) -> Result<()>;
}

/// DataSource trait produces worked hours keyed by week.
pub trait DataSource {
    /// Produces the worked hours of every week the source knows about from `start` on.
    ///
    /// # Arguments
    /// * `start` - The earliest week the caller is interested in.
    ///
    /// # Returns
    /// A mapping of week to hours, or the failure that prevented building it.
    fn weekly_hours(&self, start: WeekKey) -> Result<DataMapping>;
}

/// EventFeed trait lists calendar events.
pub trait EventFeed {
    /// Lists events that end at or after `since`.
    fn events_since(&self, since: NaiveDateTime) -> Result<Vec<CalendarEvent>>;
}
