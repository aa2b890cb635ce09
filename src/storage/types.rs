//! Shared storage record types and the hard truncation limits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Hard truncation limits, in characters. Oversized values are cut with no
/// marker; the size field on the row keeps the true length.
pub const REQUEST_BODY_LIMIT: usize = 10_000;
pub const RESPONSE_BODY_LIMIT: usize = 5_000;
pub const WS_RAW_LIMIT: usize = 10_000;
pub const SUSPICIOUS_PAYLOAD_LIMIT: usize = 5_000;
pub const CREDENTIAL_PREFIX_LIMIT: usize = 100;

/// Truncate to at most `limit` characters.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Http,
    WebSocket,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Http => "http",
            TransportKind::WebSocket => "websocket",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Wire kind of a persisted WebSocket message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsFrameKind {
    Connect,
    Request,
    Response,
    Event,
    Invalid,
}

impl WsFrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WsFrameKind::Connect => "connect",
            WsFrameKind::Request => "request",
            WsFrameKind::Response => "response",
            WsFrameKind::Event => "event",
            WsFrameKind::Invalid => "invalid",
        }
    }
}

/// How the peer presented credentials. `Device` and `Tailscale` exist for
/// wire compatibility; the handshake path only produces the first three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Token,
    Password,
    Device,
    Tailscale,
    None,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Token => "token",
            AuthMethod::Password => "password",
            AuthMethod::Device => "device",
            AuthMethod::Tailscale => "tailscale",
            AuthMethod::None => "none",
        }
    }
}

/// Impersonated platform surface a webhook hit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelTag {
    Whatsapp,
    Telegram,
    Discord,
    Slack,
    Signal,
    Hooks,
    Custom,
}

impl ChannelTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelTag::Whatsapp => "whatsapp",
            ChannelTag::Telegram => "telegram",
            ChannelTag::Discord => "discord",
            ChannelTag::Slack => "slack",
            ChannelTag::Signal => "signal",
            ChannelTag::Hooks => "hooks",
            ChannelTag::Custom => "custom",
        }
    }
}

/// One live session's identity row.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub id: Uuid,
    pub source_ip: String,
    pub user_agent: Option<String>,
    pub transport: TransportKind,
    pub connected_at: DateTime<Utc>,
}

/// One completed HTTP exchange. `body` and `response_body` are passed raw;
/// the store applies the truncation limits on write.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub connection_id: Uuid,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Value,
    pub body: String,
    pub response_code: u16,
    pub response_body: String,
    pub duration_ms: i64,
    pub suspicious: bool,
    pub reasons: Vec<String>,
}

/// One framed message crossing a socket, either direction.
#[derive(Debug, Clone)]
pub struct WsMessageRecord {
    pub connection_id: Uuid,
    pub direction: Direction,
    pub frame_kind: WsFrameKind,
    pub method: Option<String>,
    pub correlation_id: Option<String>,
    pub payload: Option<Value>,
    pub raw: String,
    pub suspicious: bool,
    pub reasons: Vec<String>,
}

/// One credential presentation. `credential` is the fingerprint hash;
/// `credential_raw` keeps the first characters of the original for research.
#[derive(Debug, Clone)]
pub struct AuthAttemptRecord {
    pub connection_id: Uuid,
    pub source_ip: String,
    pub auth_method: AuthMethod,
    pub credential: String,
    pub credential_raw: Option<String>,
    pub success: bool,
    pub client_id: Option<String>,
    pub client_version: Option<String>,
    pub client_platform: Option<String>,
}

/// One webhook hit against an impersonated platform surface.
#[derive(Debug, Clone)]
pub struct ChannelInteractionRecord {
    pub channel: ChannelTag,
    pub endpoint: String,
    pub http_method: String,
    pub headers: Value,
    pub payload: String,
    pub sender_id: Option<String>,
    pub message_text: Option<String>,
    pub source_ip: String,
    pub response_code: u16,
    pub response_body: String,
    pub suspicious: bool,
    pub reasons: Vec<String>,
}

/// One classifier hit, snapshotted at ingest time.
#[derive(Debug, Clone)]
pub struct SuspiciousActivityRecord {
    pub category: String,
    pub severity: String,
    pub description: String,
    pub payload: String,
    pub pattern: String,
    pub source_ip: String,
    pub user_agent: Option<String>,
    pub request_path: Option<String>,
    pub request_method: Option<String>,
    pub connection_id: Option<Uuid>,
}

/// Counter increments and flag raises for one aggregator touch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TouchDelta {
    pub requests: u32,
    pub ws_messages: u32,
    pub auth_attempts: u32,
    pub suspicious: u32,
    pub is_scanner: bool,
    pub is_bruteforcer: bool,
    pub is_exploiter: bool,
}

impl TouchDelta {
    pub fn request() -> Self {
        TouchDelta { requests: 1, ..Default::default() }
    }

    pub fn ws_message() -> Self {
        TouchDelta { ws_messages: 1, ..Default::default() }
    }

    pub fn auth_attempt() -> Self {
        TouchDelta { auth_attempts: 1, ..Default::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_under_limit_verbatim() {
        let body = "a".repeat(10_000);
        assert_eq!(truncate_chars(&body, REQUEST_BODY_LIMIT), body);
    }

    #[test]
    fn test_truncate_over_limit() {
        let body = "a".repeat(10_001);
        let cut = truncate_chars(&body, REQUEST_BODY_LIMIT);
        assert_eq!(cut.chars().count(), 10_000);
        assert_eq!(body.len(), 10_001);
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let body = "é".repeat(120);
        let cut = truncate_chars(&body, CREDENTIAL_PREFIX_LIMIT);
        assert_eq!(cut.chars().count(), 100);
    }

    #[test]
    fn test_enum_labels() {
        assert_eq!(TransportKind::WebSocket.as_str(), "websocket");
        assert_eq!(WsFrameKind::Invalid.as_str(), "invalid");
        assert_eq!(AuthMethod::None.as_str(), "none");
        assert_eq!(ChannelTag::Hooks.as_str(), "hooks");
    }
}
