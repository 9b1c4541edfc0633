//! Turns a raw client submission into a storable [`Event`].
//!
//! Nothing the client sends is trusted for identity: the network identifier
//! is derived from request metadata and only its hash is kept. Ingestion is
//! side-effect free; appending to a store is the caller's job.

use audit_model::{AuditError, AuditResult, Event, RequestContext, ServerMeta};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Client identifier used when the request carries no usable address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Length of the stored client fingerprint, in hex characters.
pub const IP_HASH_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestionGateway;

impl IngestionGateway {
    pub fn new() -> Self {
        Self
    }

    /// Parses `raw` as a JSON object and enriches it with server metadata.
    pub fn ingest(&self, raw: &[u8], ctx: &RequestContext) -> AuditResult<Event> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|error| AuditError::malformed(format!("invalid JSON body: {error}")))?;
        self.ingest_value(value, ctx)
    }

    pub fn ingest_value(&self, value: Value, ctx: &RequestContext) -> AuditResult<Event> {
        self.ingest_value_at(value, ctx, Utc::now())
    }

    /// Same as [`ingest_value`](Self::ingest_value) with an explicit server clock reading.
    pub fn ingest_value_at(
        &self,
        value: Value,
        ctx: &RequestContext,
        received_at: DateTime<Utc>,
    ) -> AuditResult<Event> {
        let Value::Object(mut fields) = value else {
            return Err(AuditError::malformed("event must be a JSON object"));
        };

        // Server metadata is ours to set.
        fields.remove("server");

        let event_type = take_event_type(&mut fields)?;
        let visitor_id = take_string(&mut fields, "visitorId")?;
        let session_id = take_string(&mut fields, "sessionId")?;
        let timestamp = take_string(&mut fields, "timestamp")?;

        let server = ServerMeta {
            received_at,
            ip_hash: hash_client_id(&resolve_client_id(ctx)),
            user_agent: ctx.user_agent.clone(),
            referer: ctx.referer.clone(),
        };
        debug!(%event_type, ip_hash = %server.ip_hash, "event ingested");

        Ok(Event {
            event_type,
            visitor_id,
            session_id,
            timestamp,
            server,
            payload: fields,
        })
    }
}

/// First `X-Forwarded-For` hop, else `X-Real-IP`, else the socket peer,
/// else [`UNKNOWN_CLIENT`].
pub fn resolve_client_id(ctx: &RequestContext) -> String {
    let forwarded = ctx
        .forwarded_for
        .as_deref()
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());
    let real_ip = ctx
        .real_ip
        .as_deref()
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_owned)
        .or_else(|| ctx.peer_addr.map(|addr| addr.to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_owned())
}

/// One-way fingerprint of a client identifier: the first
/// [`IP_HASH_LEN`] lowercase hex characters of its SHA-256 digest.
pub fn hash_client_id(client_id: &str) -> String {
    let digest = Sha256::digest(client_id.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(IP_HASH_LEN);
    encoded
}

/// `eventType`, or the browser tracker's `type` when `eventType` is absent or null.
fn take_event_type(fields: &mut Map<String, Value>) -> AuditResult<String> {
    let event_type = match take_string(fields, "eventType")? {
        Some(event_type) => Some(event_type),
        None => take_string(fields, "type")?,
    };
    match event_type {
        Some(event_type) if !event_type.trim().is_empty() => Ok(event_type),
        _ => Err(AuditError::malformed("missing eventType")),
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> AuditResult<Option<String>> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(AuditError::malformed(format!("{key} must be a string"))),
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use audit_model::{AuditError, RequestContext};
    use chrono::Utc;
    use serde_json::json;

    use super::{IngestionGateway, UNKNOWN_CLIENT, hash_client_id, resolve_client_id};

    #[test]
    fn hash_is_stable_sixteen_lowercase_hex_chars() {
        let first = hash_client_id("203.0.113.5");
        let second = hash_client_id("203.0.113.5");

        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
        assert_ne!(first, hash_client_id("203.0.113.6"));
    }

    #[test]
    fn hash_matches_known_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad
        assert_eq!(hash_client_id("abc"), "ba7816bf8f01cfea");
    }

    #[test]
    fn client_id_prefers_first_forwarded_hop() {
        let ctx = RequestContext::new()
            .forwarded_for(" 203.0.113.5 , 10.0.0.1")
            .real_ip("198.51.100.7");
        assert_eq!(resolve_client_id(&ctx), "203.0.113.5");
    }

    #[test]
    fn client_id_falls_back_through_real_ip_peer_and_sentinel() {
        let real = RequestContext::new().forwarded_for("").real_ip("198.51.100.7");
        assert_eq!(resolve_client_id(&real), "198.51.100.7");

        let peer = RequestContext::new().peer_addr(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(resolve_client_id(&peer), "192.0.2.1");

        assert_eq!(resolve_client_id(&RequestContext::new()), UNKNOWN_CLIENT);
    }

    #[test]
    fn ingest_enriches_without_keeping_raw_address() {
        let ctx = RequestContext::new()
            .forwarded_for("203.0.113.5")
            .user_agent("Mozilla/5.0")
            .referer("https://example.com/");
        let raw = br#"{"eventType":"page_view","visitorId":"v1","sessionId":"s1","timestamp":"2026-01-01T00:00:00Z","page":{"path":"/"}}"#;

        let event = IngestionGateway::new().ingest(raw, &ctx).expect("ingest");

        assert_eq!(event.event_type, "page_view");
        assert_eq!(event.visitor_id.as_deref(), Some("v1"));
        assert_eq!(event.session_id.as_deref(), Some("s1"));
        assert_eq!(event.timestamp.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(event.server.ip_hash, hash_client_id("203.0.113.5"));
        assert_eq!(event.server.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(event.server.referer.as_deref(), Some("https://example.com/"));
        assert_eq!(event.page_path(), Some("/"));

        let stored = serde_json::to_string(&event).expect("serialize");
        assert!(!stored.contains("203.0.113.5"));
    }

    #[test]
    fn client_supplied_server_block_is_discarded() {
        let received_at = Utc::now();
        let event = IngestionGateway::new()
            .ingest_value_at(
                json!({
                    "eventType": "click",
                    "server": { "ipHash": "forged", "ip": "10.0.0.1" }
                }),
                &RequestContext::new(),
                received_at,
            )
            .expect("ingest");

        assert_eq!(event.server.ip_hash, hash_client_id(UNKNOWN_CLIENT));
        assert_eq!(event.server.received_at, received_at);
        assert!(!event.payload.contains_key("server"));
    }

    #[test]
    fn tracker_type_field_is_accepted_as_event_type() {
        let event = IngestionGateway::new()
            .ingest(br#"{"type":"form_submission","formId":"contact"}"#, &RequestContext::new())
            .expect("ingest");

        assert_eq!(event.event_type, "form_submission");
        assert!(!event.payload.contains_key("type"));
        assert_eq!(event.payload["formId"], "contact");
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        let gateway = IngestionGateway::new();
        let ctx = RequestContext::new();

        for raw in [
            &b"not json"[..],
            b"[1, 2, 3]",
            b"\"page_view\"",
            b"{}",
            br#"{"eventType":""}"#,
            br#"{"eventType":7}"#,
            br#"{"eventType":"click","visitorId":{"id":1}}"#,
        ] {
            let error = gateway.ingest(raw, &ctx).unwrap_err();
            assert!(
                matches!(error, AuditError::MalformedInput(_)),
                "expected malformed input for {}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn null_event_type_falls_back_to_tracker_type() {
        let event = IngestionGateway::new()
            .ingest(br#"{"eventType":null,"type":"click"}"#, &RequestContext::new())
            .expect("ingest");

        assert_eq!(event.event_type, "click");
        assert!(!event.payload.contains_key("eventType"));
        assert!(!event.payload.contains_key("type"));
    }

    #[test]
    fn null_correlation_fields_are_treated_as_absent() {
        let event = IngestionGateway::new()
            .ingest(
                br#"{"eventType":"scroll_depth","visitorId":null,"depth":75}"#,
                &RequestContext::new(),
            )
            .expect("ingest");

        assert_eq!(event.visitor_id, None);
        assert_eq!(event.payload["depth"], 75);
    }
}
