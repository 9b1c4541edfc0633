//! # audit-model — shared audit trail types
//!
//! Contract crate for the audit trail: the stored [`Event`] shape, the
//! server-observed request metadata the ingestion gateway consumes, and the
//! error taxonomy every other crate returns.
//!
//! ## Module Overview
//!
//! - [`event`] — Event, ServerMeta, well-known event type names
//! - [`context`] — RequestContext (transport-agnostic request metadata)
//! - [`error`] — AuditError, AuditResult

pub mod context;
pub mod error;
pub mod event;

pub use context::RequestContext;
pub use error::{AuditError, AuditResult};
pub use event::{Event, ServerMeta, event_types};
