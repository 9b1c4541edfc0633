//! Pure aggregation over a snapshot of stored events.
//!
//! Every function takes the events oldest-first, never mutates them and never
//! fails: an empty slice yields zero counts, empty maps and an empty range.

use std::collections::HashSet;

use audit_model::{Event, event_types};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// How many pages [`top_pages`] returns when the caller has no preference.
pub const DEFAULT_TOP_PAGES: usize = 10;

/// How many events [`stats`] echoes back in `recentEvents`.
pub const RECENT_EVENTS: usize = 10;

/// Path counted for a page view that reported no path, or an empty one.
pub const ROOT_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCount {
    pub path: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimeRange {
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeviceBreakdown {
    pub desktop: u64,
    pub mobile: u64,
    pub tablet: u64,
    pub other: u64,
}

/// Body of the summary read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_events: usize,
    pub unique_visitors: usize,
    pub events_by_type: IndexMap<String, u64>,
}

/// Body of the extended statistics read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_events: usize,
    pub page_views: u64,
    pub clicks: u64,
    pub form_submissions: u64,
    pub unique_visitors: usize,
    pub unique_sessions: usize,
    pub events_by_type: IndexMap<String, u64>,
    pub devices: DeviceBreakdown,
    pub top_pages: Vec<PageCount>,
    /// Mean `page_exit` duration in milliseconds, rounded.
    pub average_time_on_page: u64,
    /// Newest first.
    pub recent_events: Vec<Event>,
    pub time_range: TimeRange,
}

/// Event counts keyed by type, in first-seen order.
pub fn count_by_type(events: &[Event]) -> IndexMap<String, u64> {
    let mut counts = IndexMap::new();
    for event in events {
        *counts.entry(event.event_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Distinct `visitorId` values. Events without one are not counted.
pub fn unique_visitor_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter_map(|event| event.visitor_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

/// Distinct `sessionId` values. Events without one are not counted.
pub fn unique_session_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter_map(|event| event.session_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

/// Most viewed paths among `page_view` events, highest count first.
///
/// Ties keep the order in which the paths were first seen.
pub fn top_pages(events: &[Event], limit: usize) -> Vec<PageCount> {
    let mut counts: IndexMap<&str, u64> = IndexMap::new();
    for event in events
        .iter()
        .filter(|event| event.is_type(event_types::PAGE_VIEW))
    {
        let path = event
            .page_path()
            .filter(|path| !path.is_empty())
            .unwrap_or(ROOT_PATH);
        *counts.entry(path).or_insert(0) += 1;
    }

    let mut ranked: Vec<PageCount> = counts
        .into_iter()
        .map(|(path, count)| PageCount {
            path: path.to_owned(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Server receive time of the oldest and newest event.
pub fn time_range(events: &[Event]) -> TimeRange {
    TimeRange {
        first: events.first().map(|event| event.server.received_at),
        last: events.last().map(|event| event.server.received_at),
    }
}

/// Device types reported by page views; a missing type counts as desktop.
pub fn device_breakdown(events: &[Event]) -> DeviceBreakdown {
    let mut breakdown = DeviceBreakdown::default();
    for event in events
        .iter()
        .filter(|event| event.is_type(event_types::PAGE_VIEW))
    {
        match event.device_type().unwrap_or("desktop") {
            "desktop" => breakdown.desktop += 1,
            "mobile" => breakdown.mobile += 1,
            "tablet" => breakdown.tablet += 1,
            _ => breakdown.other += 1,
        }
    }
    breakdown
}

/// Mean `duration` of `page_exit` events in milliseconds, 0 when there are none.
pub fn average_time_on_page(events: &[Event]) -> u64 {
    let durations: Vec<f64> = events
        .iter()
        .filter(|event| event.is_type(event_types::PAGE_EXIT))
        .map(|event| event.duration().unwrap_or(0.0).max(0.0))
        .collect();
    if durations.is_empty() {
        return 0;
    }
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    mean.round() as u64
}

pub fn summary(events: &[Event]) -> Summary {
    Summary {
        total_events: events.len(),
        unique_visitors: unique_visitor_count(events),
        events_by_type: count_by_type(events),
    }
}

pub fn stats(events: &[Event], top_pages_limit: usize) -> Stats {
    let events_by_type = count_by_type(events);
    let of_type = |event_type: &str| events_by_type.get(event_type).copied().unwrap_or(0);

    Stats {
        total_events: events.len(),
        page_views: of_type(event_types::PAGE_VIEW),
        clicks: of_type(event_types::CLICK),
        form_submissions: of_type(event_types::FORM_SUBMISSION),
        unique_visitors: unique_visitor_count(events),
        unique_sessions: unique_session_count(events),
        devices: device_breakdown(events),
        top_pages: top_pages(events, top_pages_limit),
        average_time_on_page: average_time_on_page(events),
        recent_events: events.iter().rev().take(RECENT_EVENTS).cloned().collect(),
        time_range: time_range(events),
        events_by_type,
    }
}
