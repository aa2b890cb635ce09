//! Endpoint catalog and the shared request pipeline.
//!
//! Every inbound HTTP request, matched or not, goes through the same
//! sequence: capture, client-ip derivation, connection row, attacker-session
//! bump, classification, canned dispatch, request row. The canned response
//! is computed only after the evidence writes are on their way.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use log::error;
use serde_json::{json, Map, Value};
use uuid::Uuid;
use warp::http::{HeaderMap, Method, Response};
use warp::path::FullPath;
use warp::Rejection;

use super::static_ui;
use super::types::{CannedResponse, ChannelPart, Dispatch};
use super::webhooks;
use crate::controller::AppContext;
use crate::protocol::frames::PROTOCOL_VERSION;
use crate::protocol::methods::CHANNELS;
use crate::storage::store::spawn_logged;
use crate::storage::types::{
    ChannelInteractionRecord, ChannelTag, ConnectionRecord, RequestRecord,
    SuspiciousActivityRecord, TouchDelta, TransportKind,
};

/// Derive the client address: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real = real.trim();
        if !real.is_empty() {
            return real.to_string();
        }
    }
    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn user_agent_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        map.insert(
            name.as_str().to_string(),
            Value::String(String::from_utf8_lossy(value.as_bytes()).to_string()),
        );
    }
    Value::Object(map)
}

/// The full pre/post pipeline around one HTTP exchange.
pub async fn handle_request(
    method: Method,
    full_path: FullPath,
    query: String,
    headers: HeaderMap,
    remote: Option<SocketAddr>,
    body_bytes: Bytes,
    app: Arc<AppContext>,
) -> Result<Response<Vec<u8>>, Rejection> {
    let started = Instant::now();
    let path = full_path.as_str().to_string();
    let method_str = method.as_str().to_string();
    let body = String::from_utf8_lossy(&body_bytes).to_string();
    let source_ip = client_ip(&headers, remote);
    let user_agent = user_agent_of(&headers);

    let conn_id = Uuid::new_v4();
    let connection = ConnectionRecord {
        id: conn_id,
        source_ip: source_ip.clone(),
        user_agent: user_agent.clone(),
        transport: TransportKind::Http,
        connected_at: Utc::now(),
    };
    // FK parent of the request row, so this one write is awaited
    if let Err(e) = app.store.insert_connection(&connection).await {
        error!("connection row write failed: {}", e);
    }

    let haystack = format!("{} {} {}", path, query, body);
    let classification = app.classifier.classify(&haystack);
    for hit in &classification.matches {
        let record = SuspiciousActivityRecord {
            category: hit.category.as_str().to_string(),
            severity: hit.severity.as_str().to_string(),
            description: hit.category.description().to_string(),
            payload: haystack.clone(),
            pattern: hit.pattern.to_string(),
            source_ip: source_ip.clone(),
            user_agent: user_agent.clone(),
            request_path: Some(path.clone()),
            request_method: Some(method_str.clone()),
            connection_id: Some(conn_id),
        };
        let store = app.store.clone();
        spawn_logged("suspicious_activity", async move {
            store.insert_suspicious_activity(&record).await
        });
    }

    let mut delta = TouchDelta::request();
    if classification.is_suspicious() {
        delta.suspicious = classification.matches.len() as u32;
        delta.is_scanner = classification.is_scanner();
        delta.is_exploiter = classification.is_exploiter();
    }
    app.tracker.touch(&source_ip, delta);

    let dispatch = dispatch(&method_str, &path, &body, &app).await;

    if let Some(part) = &dispatch.channel {
        let record = ChannelInteractionRecord {
            channel: part.tag,
            endpoint: path.clone(),
            http_method: method_str.clone(),
            headers: headers_to_json(&headers),
            payload: body.clone(),
            sender_id: part.sender_id.clone(),
            message_text: part.message_text.clone(),
            source_ip: source_ip.clone(),
            response_code: dispatch.response.status,
            response_body: dispatch.response.body_string(),
            suspicious: classification.is_suspicious(),
            reasons: classification.reasons(),
        };
        let store = app.store.clone();
        spawn_logged("channel_interaction", async move {
            store.insert_channel_interaction(&record).await
        });
    }

    let request = RequestRecord {
        connection_id: conn_id,
        method: method_str,
        path,
        query: if query.is_empty() { None } else { Some(query) },
        headers: headers_to_json(&headers),
        body,
        response_code: dispatch.response.status,
        response_body: dispatch.response.body_string(),
        duration_ms: started.elapsed().as_millis() as i64,
        suspicious: classification.is_suspicious(),
        reasons: classification.reasons(),
    };
    let store = app.store.clone();
    spawn_logged("request", async move { store.insert_request(&request).await });

    let store = app.store.clone();
    spawn_logged("connection_close", async move {
        store.close_connection(conn_id).await
    });

    let response = Response::builder()
        .status(dispatch.response.status)
        .header("content-type", dispatch.response.content_type)
        .body(dispatch.response.body)
        .unwrap_or_else(|_| Response::new(Vec::new()));
    Ok(response)
}

/// Map one (method, path) to its canned handler.
async fn dispatch(method: &str, path: &str, body: &str, app: &AppContext) -> Dispatch {
    // Telegram bot-API family: /bot<token>/<call>
    if let Some(rest) = path.strip_prefix("/bot") {
        if let Some(idx) = rest.find('/').filter(|_| !rest.starts_with('/')) {
            let (_token, call) = (&rest[..idx], &rest[idx + 1..]);
            let response = match (method, call) {
                ("POST", "webhook") => webhooks::telegram_webhook(),
                ("POST", "setWebhook") => webhooks::telegram_set_webhook(),
                (_, "getMe") => webhooks::telegram_get_me(),
                ("POST", "sendMessage") => webhooks::telegram_send_message(body),
                _ => webhooks::telegram_generic(),
            };
            return with_channel(response, ChannelTag::Telegram, body);
        }
    }

    match (method, path) {
        ("GET", "/health") => return Dispatch::plain(health(app).await),
        ("GET", "/api/status") => return Dispatch::plain(api_status(app).await),
        ("POST", "/webhook/whatsapp") => {
            return with_channel(webhooks::whatsapp_receive(), ChannelTag::Whatsapp, body)
        }
        ("POST", "/webhook/whatsapp/send") => {
            return with_channel(webhooks::whatsapp_send(), ChannelTag::Whatsapp, body)
        }
        ("POST", "/webhook/discord") => {
            return with_channel(webhooks::discord_pong(), ChannelTag::Discord, body)
        }
        ("POST", "/interactions") => {
            return with_channel(webhooks::discord_interaction(body), ChannelTag::Discord, body)
        }
        ("POST", "/webhook/slack") | ("POST", "/slack/events") => {
            return with_channel(webhooks::slack_event(body), ChannelTag::Slack, body)
        }
        ("POST", "/slack/commands") => {
            return with_channel(webhooks::slack_command(), ChannelTag::Slack, body)
        }
        ("POST", "/slack/interactive") => {
            return with_channel(CannedResponse::empty(200), ChannelTag::Slack, body)
        }
        ("POST", "/webhook/signal") => {
            return with_channel(webhooks::signal_receive(), ChannelTag::Signal, body)
        }
        ("POST", "/v1/send") => {
            return with_channel(webhooks::signal_send(), ChannelTag::Signal, body)
        }
        ("POST", "/hooks/wake") => {
            return with_channel(webhooks::hooks_wake(), ChannelTag::Hooks, body)
        }
        ("POST", "/hooks/agent") => {
            return with_channel(webhooks::hooks_agent(), ChannelTag::Hooks, body)
        }
        _ => {}
    }

    // Discord application webhooks: /api/webhooks/:id/:token
    if method == "POST" && path.starts_with("/api/webhooks/") {
        let tail: Vec<&str> = path["/api/webhooks/".len()..]
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if tail.len() == 2 {
            return with_channel(CannedResponse::empty(204), ChannelTag::Discord, body);
        }
    }

    // generic single-segment webhook: /webhook/:channel
    if method == "POST" {
        if let Some(name) = path.strip_prefix("/webhook/") {
            if !name.is_empty() && !name.contains('/') {
                let tag = channel_tag_for(name);
                return with_channel(webhooks::generic_channel(name), tag, body);
            }
        }
        if path.starts_with("/hooks/") {
            return with_channel(webhooks::hooks_generic(), ChannelTag::Hooks, body);
        }
    }

    if method == "GET" {
        match path {
            "/" | "/ui" | "/control" | "/chat" => {
                return Dispatch::plain(CannedResponse::html(static_ui::index_html().await))
            }
            p if p.starts_with("/ui/") => {
                if let Some((bytes, content_type)) = static_ui::serve_asset(&p[4..]).await {
                    return Dispatch::plain(CannedResponse::asset(bytes, content_type));
                }
                return Dispatch::plain(CannedResponse::html(static_ui::index_html().await));
            }
            _ => {}
        }
    }

    // catch-all: webhook-shaped prefixes get a JSON 404, everything else is
    // the control UI. The prefix set is load-bearing for scanners.
    if path.starts_with("/api/") || path.starts_with("/webhook/") || path.starts_with("/bot") {
        Dispatch::plain(CannedResponse::json_status(404, &json!({ "error": "Not found" })))
    } else {
        Dispatch::plain(CannedResponse::html(static_ui::index_html().await))
    }
}

fn with_channel(response: CannedResponse, tag: ChannelTag, body: &str) -> Dispatch {
    let (sender_id, message_text) = webhooks::extract_message(tag, body);
    Dispatch::channel(
        response,
        ChannelPart {
            tag,
            sender_id,
            message_text,
        },
    )
}

fn channel_tag_for(name: &str) -> ChannelTag {
    match name {
        "whatsapp" => ChannelTag::Whatsapp,
        "telegram" => ChannelTag::Telegram,
        "discord" => ChannelTag::Discord,
        "slack" => ChannelTag::Slack,
        "signal" => ChannelTag::Signal,
        _ => ChannelTag::Custom,
    }
}

async fn health(app: &AppContext) -> CannedResponse {
    CannedResponse::json(&json!({
        "ok": true,
        "version": app.config.fake_version,
        "uptime": (Utc::now() - app.started_at).num_seconds(),
        "connections": app.registry.live_count().await,
    }))
}

async fn api_status(app: &AppContext) -> CannedResponse {
    let mut channels = Map::new();
    for name in CHANNELS {
        let connected = name != "imessage";
        channels.insert(
            name.to_string(),
            json!({ "connected": connected, "state": if connected { "connected" } else { "disconnected" } }),
        );
    }
    CannedResponse::json(&json!({
        "ok": true,
        "gateway": {
            "version": app.config.fake_version,
            "protocol": PROTOCOL_VERSION,
            "uptime": (Utc::now() - app.started_at).num_seconds(),
            "connections": app.registry.live_count().await,
        },
        "channels": channels,
    }))
}
