//! Google Calendar events listing.
//!
//! One `events.list` call per run: no pagination, no conditional fetch.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;

use nowcal_auth::Credential;
use nowcal_core::TimeWindow;

use crate::error::{ClientError, ClientResult};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// An event as printed by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Start as returned by the API: an RFC 3339 time, or a date for
    /// all-day events.
    pub start: String,
    pub summary: String,
    pub description: String,
}

impl CalendarEvent {
    /// Renders the event as `<start> (<summary>) <description>`.
    pub fn line(&self) -> String {
        format!("{} ({}) {}", self.start, self.summary, self.description)
    }
}

/// Google Calendar API client bound to one access token.
#[derive(Debug)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    authorization: String,
    base_url: String,
}

impl CalendarClient {
    /// Creates a client authenticated with `credential`.
    pub fn new(credential: &Credential, timeout: Duration) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nowcal/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Calendar(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            authorization: credential.authorization_header(),
            base_url: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Points the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(calendar_id)
        )
    }

    /// Lists single (expanded) events starting in `window`, ordered by start.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
        max_results: usize,
    ) -> ClientResult<Vec<CalendarEvent>> {
        let url = self.events_url(calendar_id);
        debug!(calendar = calendar_id, start = %window.start, end = %window.end, "listing events");

        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, self.authorization.as_str())
            .query(&[
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("showDeleted", "false".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", max_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Calendar("request timeout".to_string())
                } else if e.is_connect() {
                    ClientError::Calendar(format!("connection failed: {}", e))
                } else {
                    ClientError::Calendar(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Calendar(
                "access token rejected; run again with --update".to_string(),
            ));
        }

        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::Calendar(format!(
                "calendar {:?} is not accessible ({})",
                calendar_id, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Calendar(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ClientError::Calendar(format!(
                "API error ({}): {}",
                status,
                body.trim()
            )));
        }

        let events = parse_events(&body)?;
        debug!("fetched {} events from calendar {}", events.len(), calendar_id);
        Ok(events)
    }
}

fn parse_events(body: &str) -> ClientResult<Vec<CalendarEvent>> {
    let list: EventListResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::Calendar(format!("failed to parse response: {}", e)))?;

    Ok(list
        .items
        .into_iter()
        .filter(|event| event.status.as_deref() != Some("cancelled"))
        .map(|event| CalendarEvent {
            start: event
                .start
                .date_time
                .filter(|dt| !dt.is_empty())
                .or(event.start.date)
                .unwrap_or_default(),
            summary: event.summary.unwrap_or_default(),
            description: event.description.unwrap_or_default(),
        })
        .collect())
}

// Google Calendar API response types

#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date_time: Option<String>,
    date: Option<String>,
}
