//! Print the events of the current hour.

use std::io::{self, Write};

use chrono::Utc;
use tracing::{debug, info};

use nowcal_auth::{TokenCacheManager, TokenStore};
use nowcal_core::TimeWindow;

use crate::calendar::{CalendarClient, CalendarEvent};
use crate::config::Settings;
use crate::error::ClientResult;

/// What a run printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// At least one event was printed.
    Events(usize),
    /// The hour is free.
    Empty,
}

/// Acquires a token, lists the hour's events and prints them to stdout.
pub async fn show(settings: &Settings) -> ClientResult<Listing> {
    let oauth = settings.oauth_config()?;
    let store = TokenStore::new(&settings.token_file);
    debug!(token_file = %store.path().display(), "using token cache");

    let manager = TokenCacheManager::for_console(&oauth, store)?;
    let credential = manager.acquire(&oauth, settings.force_interactive).await?;

    let window = TimeWindow::current_hour(Utc::now());
    let client = CalendarClient::new(&credential, settings.timeout)?;
    let events = client
        .list_events(&settings.calendar_id, &window, settings.max_results)
        .await?;
    info!(count = events.len(), "listed events");

    let mut stdout = io::stdout().lock();
    let listing = render(&events, &mut stdout)?;
    stdout.flush()?;
    Ok(listing)
}

/// Writes the listing in the tool's plain text format.
pub fn render(events: &[CalendarEvent], out: &mut impl Write) -> io::Result<Listing> {
    writeln!(out, "Upcoming events:")?;
    if events.is_empty() {
        writeln!(out, "No upcoming events found.")?;
        return Ok(Listing::Empty);
    }
    for event in events {
        writeln!(out, "{}", event.line())?;
    }
    Ok(Listing::Events(events.len()))
}
