//! Frame codec for the gateway WebSocket protocol.
//!
//! Frames are UTF-8 JSON text discriminated by a `type` field. The first
//! client message is the connect envelope, a JSON object with no `type`.
//! Parsing is deliberately permissive: a honeypot logs what it cannot
//! understand instead of closing the connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: u32 = 1;

/// Policy constants advertised in the hello-ok envelope.
pub const MAX_PAYLOAD: u64 = 524_288;
pub const MAX_BUFFERED_BYTES: u64 = 1_572_864;
pub const TICK_INTERVAL_MS: u64 = 30_000;

/// Error code vocabulary used in response frames.
pub mod error_codes {
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const METHOD_NOT_FOUND: &str = "method_not_found";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Event names the server may emit. Only `tick` is autonomous.
pub const EVENTS: &[&str] = &[
    "connect.challenge",
    "agent",
    "chat",
    "presence",
    "tick",
    "talk.mode",
    "shutdown",
    "health",
    "heartbeat",
    "cron",
    "node.pair.requested",
    "node.pair.resolved",
    "node.invoke.request",
    "device.pair.requested",
    "device.pair.resolved",
    "voicewake.changed",
    "exec.approval.requested",
    "exec.approval.resolved",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(
        rename = "retryAfterMs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_after_ms: Option<u64>,
}

impl ErrorBody {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
            retryable: None,
            retry_after_ms: None,
        }
    }
}

/// One framed message, either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    #[serde(rename = "req")]
    Request {
        id: String,
        method: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Value>,
    },
    #[serde(rename = "res")]
    Response {
        id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorBody>,
    },
    #[serde(rename = "event")]
    Event {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },
}

impl Frame {
    pub fn ok_response(id: &str, payload: Value) -> Self {
        Frame::Response {
            id: id.to_string(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn error_response(id: &str, error: ErrorBody) -> Self {
        Frame::Response {
            id: id.to_string(),
            ok: false,
            payload: None,
            error: Some(error),
        }
    }

    pub fn event(name: &str, payload: Value, seq: u64) -> Self {
        Frame::Event {
            event: name.to_string(),
            payload: Some(payload),
            seq: Some(seq),
        }
    }

    /// Wire kind label used for persisted rows.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Frame::Request { .. } => "request",
            Frame::Response { .. } => "response",
            Frame::Event { .. } => "event",
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            Frame::Request { method, .. } => Some(method),
            _ => None,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Frame::Request { id, .. } | Frame::Response { id, .. } => Some(id),
            Frame::Event { .. } => None,
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Client identity block inside the connect envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Credentials presented in the connect envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthBlock {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// The client's first message on a fresh socket.
///
/// Every field is optional; a malformed envelope is still accepted so that
/// the attempt can be recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectEnvelope {
    #[serde(rename = "minProtocol", default)]
    pub min_protocol: Option<u32>,
    #[serde(rename = "maxProtocol", default)]
    pub max_protocol: Option<u32>,
    #[serde(default)]
    pub client: Option<ClientInfo>,
    #[serde(default)]
    pub caps: Option<Value>,
    #[serde(default)]
    pub commands: Option<Value>,
    #[serde(default)]
    pub permissions: Option<Value>,
    #[serde(rename = "pathEnv", default)]
    pub path_env: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub scopes: Option<Value>,
    #[serde(default)]
    pub device: Option<Value>,
    #[serde(default)]
    pub auth: Option<AuthBlock>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(rename = "userAgent", default)]
    pub user_agent: Option<String>,
}

/// Result of parsing one inbound text message.
#[derive(Debug)]
pub enum Inbound {
    /// JSON object with no `type` field: the connect envelope. The raw value
    /// is kept alongside so the original can be persisted verbatim.
    Envelope(Box<ConnectEnvelope>, Value),
    Frame(Frame),
}

/// Parse one inbound message. Returns `None` when the text is not JSON or
/// carries an unknown `type`; the caller records it as frame kind `invalid`
/// and keeps the socket open.
pub fn parse_inbound(text: &str) -> Option<Inbound> {
    let value: Value = serde_json::from_str(text).ok()?;
    if !value.is_object() {
        return None;
    }
    if value.get("type").is_some() {
        return serde_json::from_value::<Frame>(value).ok().map(Inbound::Frame);
    }
    let envelope = serde_json::from_value(value.clone()).unwrap_or_default();
    Some(Inbound::Envelope(Box::new(envelope), value))
}
