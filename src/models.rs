use crate::errors::ReportError;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use getset::Getters;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const LISTING_FORMAT: &str = "%Y-%b-%d";
pub const FULL_DAY: u32 = 8;
pub const WORKDAYS: usize = 5;

/// Weeks the backend still expects a report for.
pub type OverdueSet = BTreeSet<WeekKey>;

/// Worked hours per reporting week, ordered by week.
pub type DataMapping = BTreeMap<WeekKey, WeeklyRecord>;

/// The Sunday that starts a reporting week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WeekKey(NaiveDate);

impl WeekKey {
    /// Parses a `YYYY-MM-DD` date that must fall on a Sunday.
    pub fn parse(raw: &str) -> Result<Self, ReportError> {
        let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|_| ReportError::MalformedDate(raw.to_string()))?;
        Self::try_from(date)
    }

    /// Returns the week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let back = date.weekday().num_days_from_sunday();
        Self(date - Days::new(u64::from(back)))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + Days::new(7))
    }

    /// Monday through Friday of this week.
    pub fn workdays(&self) -> impl Iterator<Item = NaiveDate> {
        let sunday = self.0;
        (1..=WORKDAYS as u64).map(move |offset| sunday + Days::new(offset))
    }

    /// Human-facing form used by the overdue listing, e.g. `2023-Jan-01`.
    pub fn listing(&self) -> String {
        self.0.format(LISTING_FORMAT).to_string()
    }
}

impl TryFrom<NaiveDate> for WeekKey {
    type Error = ReportError;

    fn try_from(date: NaiveDate) -> Result<Self, Self::Error> {
        match date.weekday() {
            Weekday::Sun => Ok(Self(date)),
            weekday => Err(ReportError::NotSunday { date, weekday }),
        }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

/// Hours worked Monday through Friday of one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Getters)]
#[serde(transparent)]
pub struct WeeklyRecord {
    #[getset(get = "pub")]
    hours: [u32; WORKDAYS],
}

impl WeeklyRecord {
    pub fn new(hours: [u32; WORKDAYS]) -> Self {
        WeeklyRecord { hours }
    }

    #[cfg(test)]
    pub fn full_week() -> Self {
        Self::new([FULL_DAY; WORKDAYS])
    }

    /// Builds a record from raw hour fields.
    ///
    /// # Arguments
    /// * `fields` - One field per workday. An empty field means a full day.
    ///
    /// # Returns
    /// The record, or the reason the fields are not a valid week.
    pub fn from_fields<'a, I>(fields: I) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let hours = fields
            .into_iter()
            .map(|field| match field.trim() {
                "" => Ok(FULL_DAY),
                value => value
                    .parse::<u32>()
                    .map_err(|_| ReportError::MalformedHours(value.to_string())),
            })
            .collect::<Result<Vec<u32>, ReportError>>()?;

        let count = hours.len();
        let hours: [u32; WORKDAYS] = hours
            .try_into()
            .map_err(|_| ReportError::WorkdayCount(count))?;
        Ok(Self::new(hours))
    }

    pub fn total(&self) -> u32 {
        self.hours.iter().sum()
    }
}

impl fmt::Display for WeeklyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_accepts_sunday() -> Result<()> {
        let key = WeekKey::parse("2023-01-01")?;
        assert_eq!(key.date(), date(2023, 1, 1));
        assert_eq!(key.to_string(), "2023-01-01");
        Ok(())
    }

    #[test]
    fn test_parse_rejects_weekday() {
        let res = WeekKey::parse("2023-01-02");
        assert!(matches!(
            res,
            Err(ReportError::NotSunday {
                weekday: Weekday::Mon,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_rejects_other_formats() {
        assert!(matches!(
            WeekKey::parse("01/01/2023"),
            Err(ReportError::MalformedDate(_))
        ));
        assert!(matches!(
            WeekKey::parse("2023-02-30"),
            Err(ReportError::MalformedDate(_))
        ));
    }

    #[test]
    fn test_listing_format() -> Result<()> {
        assert_eq!(WeekKey::parse("2023-01-08")?.listing(), "2023-Jan-08");
        assert_eq!(WeekKey::parse("2022-12-25")?.listing(), "2022-Dec-25");
        Ok(())
    }

    #[test]
    fn test_containing_rewinds_to_sunday() {
        assert_eq!(WeekKey::containing(date(2023, 1, 6)).date(), date(2023, 1, 1));
        assert_eq!(WeekKey::containing(date(2023, 1, 7)).date(), date(2023, 1, 1));
        assert_eq!(WeekKey::containing(date(2023, 1, 8)).date(), date(2023, 1, 8));
    }

    #[test]
    fn test_workdays_are_monday_to_friday() -> Result<()> {
        let key = WeekKey::parse("2023-01-01")?;
        let days: Vec<Weekday> = key.workdays().map(|d| d.weekday()).collect();
        assert_eq!(
            days,
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
        );
        assert_eq!(key.next().date(), date(2023, 1, 8));
        Ok(())
    }

    #[test]
    fn test_record_defaults_empty_fields_to_full_day() -> Result<()> {
        let record = WeeklyRecord::from_fields(["", "4", "", "0", " 6 "])?;
        assert_eq!(record.hours(), &[8, 4, 8, 0, 6]);
        assert_eq!(record.total(), 26);
        Ok(())
    }

    #[test]
    fn test_record_rejects_wrong_length() {
        assert!(matches!(
            WeeklyRecord::from_fields(["8", "8", "8", "8"]),
            Err(ReportError::WorkdayCount(4))
        ));
    }

    #[test]
    fn test_record_rejects_non_integer_hours() {
        assert!(matches!(
            WeeklyRecord::from_fields(["8", "abc", "8", "8", "8"]),
            Err(ReportError::MalformedHours(_))
        ));
        assert!(matches!(
            WeeklyRecord::from_fields(["8", "-1", "8", "8", "8"]),
            Err(ReportError::MalformedHours(_))
        ));
    }

    #[test]
    fn test_record_serializes_as_plain_list() -> Result<()> {
        let json = serde_json::to_string(&WeeklyRecord::new([8, 7, 6, 5, 4]))?;
        assert_eq!(json, "[8,7,6,5,4]");
        Ok(())
    }
}
