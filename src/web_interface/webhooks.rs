//! Platform-faithful webhook responders and best-effort message extraction.
//!
//! Each impersonated platform gets its canonical response shape; extraction
//! of sender and text is silent on failure, the interaction row is written
//! either way.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::types::CannedResponse;
use crate::storage::types::ChannelTag;

pub fn whatsapp_receive() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true, "received": true }))
}

pub fn whatsapp_send() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true, "messageId": Uuid::new_v4(), "status": "sent" }))
}

fn telegram_bot_profile() -> Value {
    json!({
        "id": 7_000_000_001i64,
        "is_bot": true,
        "first_name": "OpenClaw Assistant",
        "username": "openclaw_assistant_bot",
        "can_join_groups": true,
        "can_read_all_group_messages": false,
        "supports_inline_queries": false,
    })
}

pub fn telegram_webhook() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true }))
}

pub fn telegram_set_webhook() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true, "result": true, "description": "Webhook is set" }))
}

pub fn telegram_get_me() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true, "result": telegram_bot_profile() }))
}

/// Message echo in Telegram's sendMessage shape.
pub fn telegram_send_message(body: &str) -> CannedResponse {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let chat_id = parsed.get("chat_id").cloned().unwrap_or(Value::Null);
    let text = parsed
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let now = Utc::now().timestamp();
    CannedResponse::json(&json!({
        "ok": true,
        "result": {
            "message_id": now % 100_000,
            "from": telegram_bot_profile(),
            "chat": { "id": chat_id, "type": "private" },
            "date": now,
            "text": text,
        },
    }))
}

pub fn telegram_generic() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true, "result": {} }))
}

/// Discord gateway ping gets PONG; anything else gets a type-4 message.
pub fn discord_interaction(body: &str) -> CannedResponse {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    if parsed.get("type").and_then(Value::as_i64) == Some(1) {
        CannedResponse::json(&json!({ "type": 1 }))
    } else {
        CannedResponse::json(&json!({
            "type": 4,
            "data": { "content": "Acknowledged." },
        }))
    }
}

pub fn discord_pong() -> CannedResponse {
    CannedResponse::json(&json!({ "type": 1 }))
}

/// Slack URL verification echoes the challenge as a bare body; everything
/// else is a 200 ack.
pub fn slack_event(body: &str) -> CannedResponse {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    if parsed.get("type").and_then(Value::as_str) == Some("url_verification") {
        if let Some(challenge) = parsed.get("challenge").and_then(Value::as_str) {
            return CannedResponse::text(200, challenge);
        }
    }
    CannedResponse::json(&json!({ "ok": true }))
}

pub fn slack_command() -> CannedResponse {
    CannedResponse::json(&json!({ "response_type": "ephemeral", "text": "Command received" }))
}

pub fn signal_receive() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true }))
}

pub fn signal_send() -> CannedResponse {
    CannedResponse::json(&json!({ "timestamp": Utc::now().timestamp_millis() }))
}

pub fn generic_channel(channel: &str) -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true, "channel": channel }))
}

pub fn hooks_wake() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true, "mode": "now" }))
}

pub fn hooks_agent() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true, "runId": Uuid::new_v4() }))
}

pub fn hooks_generic() -> CannedResponse {
    CannedResponse::json(&json!({ "ok": true }))
}

/// Best-effort extraction of (sender id, message text) per platform.
pub fn extract_message(tag: ChannelTag, body: &str) -> (Option<String>, Option<String>) {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return (None, None),
    };
    match tag {
        ChannelTag::Whatsapp => {
            let sender = lookup_str(&parsed, &["key", "remoteJid"]);
            let text = lookup_str(&parsed, &["message", "conversation"]).or_else(|| {
                lookup_str(&parsed, &["message", "extendedTextMessage", "text"])
            });
            (sender, text)
        }
        ChannelTag::Telegram => (
            lookup(&parsed, &["message", "from", "id"]).map(value_to_string),
            lookup_str(&parsed, &["message", "text"]),
        ),
        ChannelTag::Discord => (
            lookup(&parsed, &["user", "id"]).map(value_to_string),
            lookup_str(&parsed, &["data", "content"]),
        ),
        ChannelTag::Slack => (
            lookup_str(&parsed, &["event", "user"]),
            lookup_str(&parsed, &["event", "text"]),
        ),
        ChannelTag::Signal => (
            lookup_str(&parsed, &["source"]),
            lookup_str(&parsed, &["dataMessage", "message"]),
        ),
        ChannelTag::Hooks | ChannelTag::Custom => (None, None),
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

fn lookup_str(value: &Value, path: &[&str]) -> Option<String> {
    lookup(value, path).and_then(Value::as_str).map(str::to_string)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
