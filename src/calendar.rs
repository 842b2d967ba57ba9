use anyhow::Result;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use getset::Getters;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    models::{DataMapping, FULL_DAY, WORKDAYS, WeekKey, WeeklyRecord},
    traits::{DataSource, EventFeed},
};

pub const REGEX_ENV: &str = "OVERDUE_CALENDAR_REGEX";
pub const DEFAULT_REGEX: &str = r"\b(vacation|holiday|pto|out of office|ooo|sick)\b";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Getters)]
pub struct CalendarEvent {
    #[getset(get = "pub")]
    subject: String,
    #[getset(get = "pub")]
    start: NaiveDateTime,
    #[getset(get = "pub")]
    end: NaiveDateTime,
}

impl CalendarEvent {
    #[cfg(test)]
    pub fn new(subject: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        CalendarEvent {
            subject: subject.into(),
            start,
            end,
        }
    }
}

/// Worked hours derived from calendar events whose subject marks time off.
pub struct CalendarSource<F> {
    feed: F,
    absence: Regex,
    through: NaiveDate,
}

impl<F: EventFeed> CalendarSource<F> {
    /// Builds a calendar source.
    ///
    /// # Arguments
    /// * `feed` - Where events come from.
    /// * `pattern` - Subjects matching this, case-insensitively, count as time off.
    /// * `through` - Weeks are produced up to the one containing this date.
    pub fn new(feed: F, pattern: &str, through: NaiveDate) -> Result<Self> {
        let absence = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            feed,
            absence,
            through,
        })
    }

    fn worked_on(day: NaiveDate, absences: &[&CalendarEvent]) -> u32 {
        let Some(next) = day.checked_add_days(Days::new(1)) else {
            return FULL_DAY;
        };
        let (open, close) = (day.and_time(NaiveTime::MIN), next.and_time(NaiveTime::MIN));

        let mut spans: Vec<(NaiveDateTime, NaiveDateTime)> = absences
            .iter()
            .map(|event| ((*event.start()).max(open), (*event.end()).min(close)))
            .filter(|(from, to)| from < to)
            .collect();
        spans.sort();

        let mut minutes = 0i64;
        let mut cursor = open;
        for (from, to) in spans {
            let from = from.max(cursor);
            if from < to {
                minutes += (to - from).num_minutes();
                cursor = to;
            }
        }

        let absent = u32::try_from((minutes + 30) / 60).unwrap_or(u32::MAX);
        FULL_DAY - absent.min(FULL_DAY)
    }
}

impl<F: EventFeed> DataSource for CalendarSource<F> {
    fn weekly_hours(&self, start: WeekKey) -> Result<DataMapping> {
        let since = start.date().and_time(NaiveTime::MIN);
        let events = self.feed.events_since(since)?;
        let absences: Vec<&CalendarEvent> = events
            .iter()
            .filter(|event| self.absence.is_match(event.subject()))
            .collect();
        debug!(events = events.len(), absences = absences.len(), "calendar events fetched");

        let last = WeekKey::containing(self.through);
        let mut weeks = DataMapping::new();
        let mut week = start;
        while week <= last {
            let mut hours = [FULL_DAY; WORKDAYS];
            for (slot, day) in hours.iter_mut().zip(week.workdays()) {
                *slot = Self::worked_on(day, &absences);
            }
            weeks.insert(week, WeeklyRecord::new(hours));
            week = week.next();
        }

        info!(weeks = weeks.len(), "calendar data loaded");
        Ok(weeks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct MockFeed {
        events: Vec<CalendarEvent>,
        asked: RefCell<Vec<NaiveDateTime>>,
    }

    impl MockFeed {
        fn new(events: Vec<CalendarEvent>) -> Self {
            Self {
                events,
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl EventFeed for &MockFeed {
        fn events_since(&self, since: NaiveDateTime) -> Result<Vec<CalendarEvent>> {
            self.asked.borrow_mut().push(since);
            Ok(self.events.clone())
        }
    }

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").unwrap()
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn week(raw: &str) -> WeekKey {
        WeekKey::parse(raw).unwrap()
    }

    #[test]
    fn test_no_events_is_full_weeks_through_date() -> Result<()> {
        let feed = MockFeed::new(Vec::new());
        let source = CalendarSource::new(&feed, DEFAULT_REGEX, day("2023-01-18"))?;
        let weeks = source.weekly_hours(week("2023-01-01"))?;

        assert_eq!(
            weeks.keys().copied().collect::<Vec<_>>(),
            vec![week("2023-01-01"), week("2023-01-08"), week("2023-01-15")]
        );
        assert!(weeks.values().all(|r| *r == WeeklyRecord::full_week()));
        assert_eq!(*feed.asked.borrow(), vec![at("2023-01-01 00:00")]);
        Ok(())
    }

    #[test]
    fn test_matching_events_reduce_hours() -> Result<()> {
        let feed = MockFeed::new(vec![
            CalendarEvent::new("Vacation", at("2023-01-02 00:00"), at("2023-01-04 00:00")),
            CalendarEvent::new("Dentist (PTO)", at("2023-01-05 13:00"), at("2023-01-05 16:00")),
            CalendarEvent::new("Team standup", at("2023-01-06 09:00"), at("2023-01-06 17:00")),
        ]);
        let source = CalendarSource::new(&feed, DEFAULT_REGEX, day("2023-01-07"))?;
        let weeks = source.weekly_hours(week("2023-01-01"))?;

        assert_eq!(weeks[&week("2023-01-01")].hours(), &[0, 0, 8, 5, 8]);
        Ok(())
    }

    #[test]
    fn test_overlapping_absences_are_not_double_counted() -> Result<()> {
        let feed = MockFeed::new(vec![
            CalendarEvent::new("sick", at("2023-01-02 09:00"), at("2023-01-02 12:00")),
            CalendarEvent::new("SICK", at("2023-01-02 10:00"), at("2023-01-02 13:00")),
        ]);
        let source = CalendarSource::new(&feed, DEFAULT_REGEX, day("2023-01-02"))?;
        let weeks = source.weekly_hours(week("2023-01-01"))?;

        assert_eq!(weeks[&week("2023-01-01")].hours(), &[4, 8, 8, 8, 8]);
        Ok(())
    }

    #[test]
    fn test_custom_pattern() -> Result<()> {
        let feed = MockFeed::new(vec![CalendarEvent::new(
            "Conference",
            at("2023-01-09 00:00"),
            at("2023-01-10 00:00"),
        )]);
        let source = CalendarSource::new(&feed, "conference", day("2023-01-09"))?;
        let weeks = source.weekly_hours(week("2023-01-08"))?;

        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[&week("2023-01-08")].hours(), &[0, 8, 8, 8, 8]);
        Ok(())
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let feed = MockFeed::new(Vec::new());
        assert!(CalendarSource::new(&feed, "(unclosed", day("2023-01-01")).is_err());
    }
}
