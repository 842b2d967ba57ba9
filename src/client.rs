//! Blocking HTTP clients for the time-reporting backend and the calendar feed.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    calendar::CalendarEvent,
    errors::ReportError,
    models::{OverdueSet, WeekKey, WeeklyRecord},
    traits::{EventFeed, OverdueResolver, Submitter},
};

const EVENT_QUERY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// User name and password sent as HTTP basic auth.
#[derive(Clone)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.user, Some(&self.password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Submission<'a> {
    hours: &'a WeeklyRecord,
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("cannot build http client")
}

fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(ReportError::UnexpectedStatus {
        url: response.url().to_string(),
        status: status.as_u16(),
    }
    .into())
}

/// The remote time-reporting backend.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpBackend {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

impl OverdueResolver for HttpBackend {
    fn overdue_weeks(&self) -> Result<OverdueSet> {
        let url = format!("{}/weeks/overdue", self.base_url);
        debug!(%url, user = self.credentials.user(), "fetching overdue weeks");

        let response = self
            .credentials
            .apply(self.client.get(&url))
            .send()
            .with_context(|| format!("cannot reach backend at {url}"))?;
        let dates: Vec<NaiveDate> = check(response)?
            .json()
            .context("backend sent a malformed overdue list")?;
        Ok(to_overdue_set(dates))
    }
}

/// Keeps the Sundays of `dates`; anything else is logged and dropped.
pub fn to_overdue_set(dates: Vec<NaiveDate>) -> OverdueSet {
    let mut weeks = OverdueSet::new();
    for date in dates {
        match WeekKey::try_from(date) {
            Ok(week) => {
                weeks.insert(week);
            }
            Err(e) => warn!(error = %e, "ignoring overdue entry"),
        }
    }
    weeks
}

impl Submitter for HttpBackend {
    fn submit(&self, week: WeekKey, hours: &WeeklyRecord) -> Result<()> {
        let url = format!("{}/weeks/{}", self.base_url, week);
        let response = self
            .credentials
            .apply(self.client.post(&url))
            .json(&Submission { hours })
            .send()
            .with_context(|| format!("cannot reach backend at {url}"))?;

        let status = response.status();
        if !status.is_success() {
            Err(ReportError::Rejected {
                week: week.date(),
                status: status.as_u16(),
            })?
        }
        Ok(())
    }
}

/// A calendar server listing events as JSON.
pub struct HttpEventFeed {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpEventFeed {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

impl EventFeed for HttpEventFeed {
    fn events_since(&self, since: NaiveDateTime) -> Result<Vec<CalendarEvent>> {
        let url = format!("{}/events", self.base_url);
        let since = since.format(EVENT_QUERY_FORMAT).to_string();
        debug!(%url, %since, "fetching calendar events");

        let response = self
            .credentials
            .apply(self.client.get(&url))
            .query(&[("since", since.as_str())])
            .send()
            .with_context(|| format!("cannot reach calendar at {url}"))?;
        let events = check(response)?
            .json()
            .context("calendar sent malformed events")?;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_body_shape() -> Result<()> {
        let hours = WeeklyRecord::new([8, 8, 4, 8, 8]);
        let body = serde_json::to_value(Submission { hours: &hours })?;
        assert_eq!(body, serde_json::json!({ "hours": [8, 8, 4, 8, 8] }));
        Ok(())
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_overdue_set_drops_non_sundays() {
        let weeks = to_overdue_set(vec![
            day("2023-01-08"),
            day("2023-01-03"),
            day("2023-01-01"),
            day("2023-01-07"),
        ]);
        let kept: Vec<NaiveDate> = weeks.iter().map(|w| w.date()).collect();
        assert_eq!(kept, vec![day("2023-01-01"), day("2023-01-08")]);
    }

    #[test]
    fn test_overdue_set_of_only_weekdays_is_empty() {
        assert!(to_overdue_set(vec![day("2023-01-02"), day("2023-01-06")]).is_empty());
        assert!(to_overdue_set(Vec::new()).is_empty());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("jdoe", "hunter2");
        let shown = format!("{credentials:?}");
        assert!(shown.contains("jdoe"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_events_deserialize_from_feed_json() -> Result<()> {
        let raw = r#"[{"subject":"Vacation","start":"2023-01-02T00:00:00","end":"2023-01-03T00:00:00"}]"#;
        let events: Vec<CalendarEvent> = serde_json::from_str(raw)?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject(), "Vacation");
        assert_eq!(events[0].start().format(EVENT_QUERY_FORMAT).to_string(), "2023-01-02T00:00:00");
        Ok(())
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() -> Result<()> {
        let backend = HttpBackend::new(
            "http://localhost:8080/",
            Credentials::new("jdoe", "pw"),
            Duration::from_secs(1),
        )?;
        assert_eq!(backend.base_url, "http://localhost:8080");
        Ok(())
    }
}
