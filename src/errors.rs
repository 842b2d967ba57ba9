use chrono::{NaiveDate, Weekday};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("expecting 6 fields, got {0}")]
    FieldCount(usize),

    #[error("malformed date {0:?}")]
    MalformedDate(String),

    #[error("date {date} is a {weekday}, not a Sunday")]
    NotSunday { date: NaiveDate, weekday: Weekday },

    #[error("expected 5 workdays, got {0}")]
    WorkdayCount(usize),

    #[error("malformed hours value {0:?}")]
    MalformedHours(String),

    #[error("backend rejected week {week}: {status}")]
    Rejected { week: NaiveDate, status: u16 },

    #[error("backend returned {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("no password available for user {0}")]
    MissingPassword(String),

    #[error("calendar source selected but no calendar url configured")]
    MissingCalendarUrl,
}
