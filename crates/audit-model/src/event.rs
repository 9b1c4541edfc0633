//! The stored visitor event.
//!
//! On the wire an [`Event`] is one flat JSON object: the correlation fields
//! the aggregator understands sit next to whatever else the browser tracker
//! sent (`page`, `device`, `element`, `duration`, ...). Those extra fields are
//! kept verbatim in [`Event::payload`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type names emitted by the browser tracker.
pub mod event_types {
    pub const PAGE_VIEW: &str = "page_view";
    pub const CLICK: &str = "click";
    pub const FORM_SUBMISSION: &str = "form_submission";
    pub const SCROLL_DEPTH: &str = "scroll_depth";
    pub const TIME_ON_PAGE: &str = "time_on_page";
    pub const PAGE_EXIT: &str = "page_exit";
}

/// One observed client action, as stored.
///
/// Built only by the ingestion gateway and never mutated afterwards; stores
/// hand out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Client clock. Not trusted for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub server: ServerMeta,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Metadata stamped by the server at ingestion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMeta {
    pub received_at: DateTime<Utc>,
    /// First 16 hex characters of the SHA-256 of the client address.
    pub ip_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, server: ServerMeta) -> Self {
        Self {
            event_type: event_type.into(),
            visitor_id: None,
            session_id: None,
            timestamp: None,
            server,
            payload: Map::new(),
        }
    }

    pub fn with_visitor(mut self, visitor_id: impl Into<String>) -> Self {
        self.visitor_id = Some(visitor_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn is_type(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }

    /// Page path the event refers to.
    ///
    /// Page views carry `page: { path, .. }`; interaction events carry the
    /// bare pathname as `page: "/path"`.
    pub fn page_path(&self) -> Option<&str> {
        match self.payload.get("page")? {
            Value::String(path) => Some(path.as_str()),
            Value::Object(page) => page.get("path").and_then(Value::as_str),
            _ => None,
        }
    }

    /// `device.type` as reported by the tracker (`desktop`, `mobile`, `tablet`).
    pub fn device_type(&self) -> Option<&str> {
        self.payload
            .get("device")
            .and_then(|device| device.get("type"))
            .and_then(Value::as_str)
    }

    /// Milliseconds reported by `page_exit` / `time_on_page` events.
    pub fn duration(&self) -> Option<f64> {
        self.payload.get("duration").and_then(Value::as_f64)
    }
}

impl ServerMeta {
    pub fn new(received_at: DateTime<Utc>, ip_hash: impl Into<String>) -> Self {
        Self {
            received_at,
            ip_hash: ip_hash.into(),
            user_agent: None,
            referer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{Event, ServerMeta, event_types};

    fn server() -> ServerMeta {
        let received_at = Utc
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("valid timestamp");
        ServerMeta::new(received_at, "0123456789abcdef")
    }

    #[test]
    fn payload_is_flattened_next_to_known_fields() {
        let event = Event::new(event_types::PAGE_VIEW, server())
            .with_visitor("v1")
            .with_field("page", json!({ "path": "/about", "title": "About" }));

        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["eventType"], "page_view");
        assert_eq!(value["visitorId"], "v1");
        assert_eq!(value["page"]["path"], "/about");
        assert_eq!(value["server"]["ipHash"], "0123456789abcdef");
        assert!(value.get("sessionId").is_none());
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn stored_json_reads_back_into_the_same_event() {
        let event = Event::new(event_types::CLICK, server())
            .with_session("s1")
            .with_field("element", json!({ "tag": "A" }));

        let raw = serde_json::to_string(&event).expect("serialize");
        let parsed: Event = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(parsed, event);
    }

    #[test]
    fn page_path_accepts_object_and_string_forms() {
        let view = Event::new(event_types::PAGE_VIEW, server())
            .with_field("page", json!({ "path": "/projects" }));
        let click = Event::new(event_types::CLICK, server()).with_field("page", json!("/contact"));
        let bare = Event::new(event_types::SCROLL_DEPTH, server()).with_field("page", json!(42));

        assert_eq!(view.page_path(), Some("/projects"));
        assert_eq!(click.page_path(), Some("/contact"));
        assert_eq!(bare.page_path(), None);
    }

    #[test]
    fn device_type_and_duration_read_nested_payload() {
        let event = Event::new(event_types::PAGE_EXIT, server())
            .with_field("device", json!({ "type": "mobile", "touchPoints": 5 }))
            .with_field("duration", json!(1500));

        assert_eq!(event.device_type(), Some("mobile"));
        assert_eq!(event.duration(), Some(1500.0));
    }
}
