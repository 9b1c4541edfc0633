//! Server-observed request metadata.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// What the transport saw about an inbound request, stripped of anything
/// transport specific. Header values are carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Raw `X-Forwarded-For` header.
    pub forwarded_for: Option<String>,
    /// Raw `X-Real-IP` header.
    pub real_ip: Option<String>,
    /// Socket peer address, when the transport knows it.
    pub peer_addr: Option<IpAddr>,
    pub user_agent: Option<String>,
    /// `Referer`, falling back to `Referrer`.
    pub referer: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarded_for(mut self, value: impl Into<String>) -> Self {
        self.forwarded_for = Some(value.into());
        self
    }

    pub fn real_ip(mut self, value: impl Into<String>) -> Self {
        self.real_ip = Some(value.into());
        self
    }

    pub fn peer_addr(mut self, addr: IpAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.user_agent = Some(value.into());
        self
    }

    pub fn referer(mut self, value: impl Into<String>) -> Self {
        self.referer = Some(value.into());
        self
    }
}
