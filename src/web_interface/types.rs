use serde_json::Value;

use crate::storage::types::ChannelTag;

/// A fully-computed canned HTTP response.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl CannedResponse {
    pub fn json(value: &Value) -> Self {
        Self::json_status(200, value)
    }

    pub fn json_status(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: Vec::new(),
        }
    }

    pub fn asset(body: Vec<u8>, content_type: &'static str) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    /// Lossy text view of the body, used for the persisted response column.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Channel attribution for endpoints that impersonate a platform webhook.
#[derive(Debug, Clone)]
pub struct ChannelPart {
    pub tag: ChannelTag,
    pub sender_id: Option<String>,
    pub message_text: Option<String>,
}

/// Outcome of routing one request.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub response: CannedResponse,
    pub channel: Option<ChannelPart>,
}

impl Dispatch {
    pub fn plain(response: CannedResponse) -> Self {
        Self { response, channel: None }
    }

    pub fn channel(response: CannedResponse, part: ChannelPart) -> Self {
        Self { response, channel: Some(part) }
    }
}
