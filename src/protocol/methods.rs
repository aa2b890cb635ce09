//! Canned-response catalog for the impersonated gateway.
//!
//! The registry is built once at startup and never mutated. Each handler is
//! a deterministic builder over a small context; fresh uuids and current
//! timestamps are the only variation between calls.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use log::error;
use serde_json::{json, Value};
use uuid::Uuid;

use super::frames::{
    error_codes, ErrorBody, Frame, EVENTS, MAX_BUFFERED_BYTES, MAX_PAYLOAD, PROTOCOL_VERSION,
    TICK_INTERVAL_MS,
};

/// Fake commit hash reported by the server block of hello-ok.
const SERVER_COMMIT: &str = "f3d91ac";
const SERVER_HOST: &str = "openclaw-gw";

/// Channels the impersonated product integrates with.
pub const CHANNELS: [&str; 6] = ["whatsapp", "telegram", "discord", "slack", "signal", "imessage"];

/// Global constants available to handlers. Nothing else may influence a
/// canned payload.
#[derive(Debug, Clone)]
pub struct MethodContext {
    pub version: String,
    pub gateway_token: String,
    pub conn_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl MethodContext {
    fn uptime_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0)
    }
}

type MethodHandler = fn(&MethodContext, Option<&Value>) -> Value;

pub struct MethodRegistry {
    handlers: HashMap<&'static str, MethodHandler>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, MethodHandler> = HashMap::new();
        for (name, handler) in CATALOG.iter().copied() {
            handlers.insert(name, handler);
        }
        Self { handlers }
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Sorted method names for the hello-ok features block.
    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Build the response frame for one request. Unknown methods get
    /// `method_not_found`; a panicking handler is downgraded to a generic
    /// `internal_error` so nothing of the inside reaches the wire.
    pub fn dispatch(&self, id: &str, method: &str, params: Option<&Value>, ctx: &MethodContext) -> Frame {
        let handler = match self.handlers.get(method) {
            Some(handler) => *handler,
            None => {
                return Frame::error_response(
                    id,
                    ErrorBody::new(error_codes::METHOD_NOT_FOUND, "no such method"),
                )
            }
        };
        match catch_unwind(AssertUnwindSafe(|| handler(ctx, params))) {
            Ok(payload) => Frame::ok_response(id, payload),
            Err(_) => {
                error!("handler for {} panicked", method);
                Frame::error_response(
                    id,
                    ErrorBody::new(error_codes::INTERNAL_ERROR, "internal error"),
                )
            }
        }
    }

    /// The server hello emitted after the connect envelope is accepted.
    /// `device_auth` is present when the envelope carried a device block.
    pub fn hello_ok(&self, ctx: &MethodContext, device_auth: Option<Value>) -> Value {
        let mut hello = json!({
            "type": "hello-ok",
            "protocol": PROTOCOL_VERSION,
            "server": {
                "version": ctx.version,
                "commit": SERVER_COMMIT,
                "host": SERVER_HOST,
                "connId": ctx.conn_id,
            },
            "features": {
                "methods": self.method_names(),
                "events": EVENTS,
            },
            "snapshot": {
                "presence": [],
                "channels": {},
            },
            "policy": {
                "maxPayload": MAX_PAYLOAD,
                "maxBufferedBytes": MAX_BUFFERED_BYTES,
                "tickIntervalMs": TICK_INTERVAL_MS,
            },
        });
        if let Some(auth) = device_auth {
            hello["auth"] = auth;
        }
        hello
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn param_str<'a>(params: Option<&'a Value>, key: &str) -> Option<&'a str> {
    params.and_then(|p| p.get(key)).and_then(Value::as_str)
}

// ---- handlers -------------------------------------------------------------

fn health(ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "version": ctx.version, "uptimeMs": ctx.uptime_ms(), "ts": now_ms() })
}

fn status(ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "ok": true,
        "version": ctx.version,
        "uptimeMs": ctx.uptime_ms(),
        "channels": channel_states(),
        "agents": { "active": 1, "idle": 0 },
        "queue": { "pending": 0 },
    })
}

fn logs_tail(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    let ts = now_ms();
    json!({
        "lines": [
            format!("{} INFO gateway listening", ts - 93_000),
            format!("{} INFO channel whatsapp connected", ts - 61_000),
            format!("{} INFO heartbeat ok", ts - 30_000),
        ],
        "cursor": ts,
    })
}

fn channel_states() -> Value {
    Value::Array(
        CHANNELS
            .iter()
            .map(|name| {
                let connected = *name != "imessage";
                json!({
                    "name": name,
                    "connected": connected,
                    "state": if connected { "connected" } else { "disconnected" },
                    "lastEventMs": now_ms() - 41_000,
                })
            })
            .collect(),
    )
}

fn channels_status(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "channels": channel_states() })
}

fn channels_logout(_ctx: &MethodContext, params: Option<&Value>) -> Value {
    let channel = param_str(params, "channel").unwrap_or("whatsapp");
    json!({ "ok": true, "channel": channel, "loggedOut": true })
}

fn usage_status(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "plan": "pro",
        "tokensUsed": 1_284_411,
        "tokensLimit": 5_000_000,
        "resetAtMs": now_ms() + 86_400_000,
    })
}

fn usage_cost(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "currency": "USD",
        "monthToDate": 42.17,
        "breakdown": [
            { "model": "claude-opus-4", "cost": 31.02 },
            { "model": "claude-haiku-3", "cost": 11.15 },
        ],
    })
}

fn tts_status(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "enabled": false, "provider": "elevenlabs", "voices": 3 })
}

fn tts_providers(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "providers": [
            { "id": "elevenlabs", "configured": true },
            { "id": "openai", "configured": false },
            { "id": "edge", "configured": true },
        ],
    })
}

fn config_get(ctx: &MethodContext, _params: Option<&Value>) -> Value {
    // the decoy token is the bait: a "leaked" credential that leads nowhere
    json!({
        "config": {
            "gateway": { "port": 18789, "bind": "0.0.0.0", "token": ctx.gateway_token },
            "agents": { "defaults": { "model": "claude-opus-4" } },
            "channels": { "whatsapp": { "enabled": true }, "telegram": { "enabled": true } },
        },
    })
}

fn config_set(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "applied": false, "pendingRestart": true })
}

fn config_apply(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "applied": true, "restartedAtMs": now_ms() })
}

fn config_patch(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "applied": true })
}

fn config_schema(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "schema": {
            "type": "object",
            "properties": {
                "gateway": { "type": "object" },
                "agents": { "type": "object" },
                "channels": { "type": "object" },
                "cron": { "type": "object" },
            },
        },
    })
}

fn exec_approvals_get(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "approvals": { "mode": "ask", "allowlist": ["ls", "cat", "git status"] } })
}

fn exec_approvals_set(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true })
}

fn wizard_start(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "wizardId": Uuid::new_v4(), "step": "welcome", "totalSteps": 5 })
}

fn wizard_next(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "step": "channels", "index": 2, "totalSteps": 5 })
}

fn wizard_cancel(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "cancelled": true })
}

fn wizard_status(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "active": false, "step": Value::Null })
}

fn talk_mode(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "mode": "text", "available": ["text", "voice"] })
}

fn models_list(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "models": [
            { "id": "claude-opus-4", "provider": "anthropic", "default": true },
            { "id": "claude-haiku-3", "provider": "anthropic", "default": false },
            { "id": "gpt-4o", "provider": "openai", "default": false },
        ],
    })
}

fn agents_list(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "agents": [
            { "id": "main", "name": "Assistant", "model": "claude-opus-4", "default": true },
        ],
    })
}

fn skills_status(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "skills": [
            { "name": "weather", "version": "1.2.0", "enabled": true },
            { "name": "calendar", "version": "0.9.3", "enabled": true },
            { "name": "shell", "version": "2.0.1", "enabled": false },
        ],
    })
}

fn skills_bins(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "bins": { "node": true, "ffmpeg": true, "yt-dlp": false } })
}

fn skills_install(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "installId": Uuid::new_v4(), "status": "queued" })
}

fn skills_update(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "updated": [], "status": "up-to-date" })
}

fn update_run(ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "updating": false, "current": ctx.version, "latest": ctx.version })
}

fn voicewake_get(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "enabled": false, "keyword": "openclaw" })
}

fn voicewake_set(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true })
}

fn sessions_list(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "sessions": [
            { "id": "sess_main", "kind": "chat", "updatedAtMs": now_ms() - 120_000, "messages": 12 },
        ],
    })
}

fn sessions_preview(_ctx: &MethodContext, params: Option<&Value>) -> Value {
    let id = param_str(params, "id").unwrap_or("sess_main");
    json!({
        "id": id,
        "preview": [
            { "role": "user", "text": "remind me to water the plants" },
            { "role": "assistant", "text": "Done, daily at 9am." },
        ],
    })
}

fn sessions_patch(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "patched": true })
}

fn sessions_reset(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "reset": true })
}

fn sessions_delete(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "deleted": true })
}

fn sessions_compact(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "compacted": true, "tokensSaved": 8192 })
}

fn last_heartbeat(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ts": now_ms() - 12_000 })
}

fn set_heartbeats(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true })
}

fn wake(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "mode": "now" })
}

fn node_pair_request(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "requestId": Uuid::new_v4(), "status": "pending" })
}

fn node_pair_list(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "pending": [],
        "paired": [
            { "nodeId": "node-mac-01", "name": "macbook", "lastSeenMs": now_ms() - 9_000 },
        ],
    })
}

fn node_pair_approve(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "approved": true })
}

fn node_pair_reject(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "rejected": true })
}

fn node_pair_verify(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "verified": true })
}

fn device_pair_list(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "devices": [
            { "deviceId": Uuid::new_v4(), "platform": "ios", "role": "admin", "pairedAtMs": now_ms() - 604_800_000i64 },
        ],
    })
}

fn device_pair_approve(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "approved": true })
}

fn device_pair_reject(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "rejected": true })
}

fn device_token_rotate(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "deviceToken": Uuid::new_v4(), "issuedAtMs": now_ms() })
}

fn device_token_revoke(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "revoked": true })
}

fn node_rename(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true })
}

fn node_list(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "nodes": [
            { "id": "node-mac-01", "name": "macbook", "online": true, "caps": ["exec", "browser"] },
        ],
    })
}

fn node_describe(ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "id": "node-mac-01",
        "platform": "darwin",
        "version": ctx.version,
        "commands": ["system.run", "system.notify", "browser.open"],
    })
}

fn node_invoke(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "invokeId": Uuid::new_v4(), "status": "dispatched" })
}

fn node_invoke_result(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "status": "pending" })
}

fn node_event(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true })
}

fn cron_list(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "jobs": [
            { "id": Uuid::new_v4(), "schedule": "0 9 * * *", "action": "agent.run", "enabled": true },
        ],
    })
}

fn cron_status(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "running": true, "jobs": 1, "nextRunAtMs": now_ms() + 3_600_000 })
}

fn cron_add(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "id": Uuid::new_v4() })
}

fn cron_update(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true })
}

fn cron_remove(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "removed": true })
}

fn cron_run(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "runId": Uuid::new_v4() })
}

fn cron_runs(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({
        "runs": [
            { "runId": Uuid::new_v4(), "startedAtMs": now_ms() - 3_600_000, "status": "ok" },
        ],
    })
}

fn system_presence(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "presence": [ { "host": "gateway", "state": "online" } ] })
}

fn system_event(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true })
}

fn send(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "messageId": Uuid::new_v4(), "queued": true })
}

fn agent(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "runId": Uuid::new_v4(), "status": "accepted" })
}

fn agent_identity_get(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "agentId": "main", "name": "Assistant", "avatar": Value::Null })
}

fn agent_wait(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "status": "idle" })
}

fn browser_request(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "requestId": Uuid::new_v4(), "status": "queued" })
}

fn chat_history(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "messages": [], "cursor": Value::Null })
}

fn chat_abort(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "aborted": false })
}

fn chat_send(_ctx: &MethodContext, _params: Option<&Value>) -> Value {
    json!({ "ok": true, "messageId": Uuid::new_v4(), "status": "queued" })
}

/// The full method catalog of the impersonated product.
const CATALOG: &[(&str, MethodHandler)] = &[
    ("health", health),
    ("status", status),
    ("logs.tail", logs_tail),
    ("channels.status", channels_status),
    ("channels.logout", channels_logout),
    ("usage.status", usage_status),
    ("usage.cost", usage_cost),
    ("tts.status", tts_status),
    ("tts.providers", tts_providers),
    ("config.get", config_get),
    ("config.set", config_set),
    ("config.apply", config_apply),
    ("config.patch", config_patch),
    ("config.schema", config_schema),
    ("exec.approvals.get", exec_approvals_get),
    ("exec.approvals.set", exec_approvals_set),
    ("wizard.start", wizard_start),
    ("wizard.next", wizard_next),
    ("wizard.cancel", wizard_cancel),
    ("wizard.status", wizard_status),
    ("talk.mode", talk_mode),
    ("models.list", models_list),
    ("agents.list", agents_list),
    ("skills.status", skills_status),
    ("skills.bins", skills_bins),
    ("skills.install", skills_install),
    ("skills.update", skills_update),
    ("update.run", update_run),
    ("voicewake.get", voicewake_get),
    ("voicewake.set", voicewake_set),
    ("sessions.list", sessions_list),
    ("sessions.preview", sessions_preview),
    ("sessions.patch", sessions_patch),
    ("sessions.reset", sessions_reset),
    ("sessions.delete", sessions_delete),
    ("sessions.compact", sessions_compact),
    ("last-heartbeat", last_heartbeat),
    ("set-heartbeats", set_heartbeats),
    ("wake", wake),
    ("node.pair.request", node_pair_request),
    ("node.pair.list", node_pair_list),
    ("node.pair.approve", node_pair_approve),
    ("node.pair.reject", node_pair_reject),
    ("node.pair.verify", node_pair_verify),
    ("device.pair.list", device_pair_list),
    ("device.pair.approve", device_pair_approve),
    ("device.pair.reject", device_pair_reject),
    ("device.token.rotate", device_token_rotate),
    ("device.token.revoke", device_token_revoke),
    ("node.rename", node_rename),
    ("node.list", node_list),
    ("node.describe", node_describe),
    ("node.invoke", node_invoke),
    ("node.invoke.result", node_invoke_result),
    ("node.event", node_event),
    ("cron.list", cron_list),
    ("cron.status", cron_status),
    ("cron.add", cron_add),
    ("cron.update", cron_update),
    ("cron.remove", cron_remove),
    ("cron.run", cron_run),
    ("cron.runs", cron_runs),
    ("system-presence", system_presence),
    ("system-event", system_event),
    ("send", send),
    ("agent", agent),
    ("agent.identity.get", agent_identity_get),
    ("agent.wait", agent_wait),
    ("browser.request", browser_request),
    ("chat.history", chat_history),
    ("chat.abort", chat_abort),
    ("chat.send", chat_send),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ctx() -> MethodContext {
        MethodContext {
            version: "2026.1.14".to_string(),
            gateway_token: "oc_gw_test".to_string(),
            conn_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_catalog_complete_and_unique() {
        let registry = MethodRegistry::new();
        assert_eq!(CATALOG.len(), 72);
        assert_eq!(registry.method_names().len(), CATALOG.len());
        for (name, _) in CATALOG {
            assert!(registry.contains(name), "missing handler for {}", name);
        }
    }

    #[test]
    fn test_channels_status_lists_six_channels() {
        let registry = MethodRegistry::new();
        let frame = registry.dispatch("r1", "channels.status", None, &test_ctx());
        match frame {
            Frame::Response { id, ok, payload, .. } => {
                assert_eq!(id, "r1");
                assert!(ok);
                let channels = payload.unwrap()["channels"].as_array().unwrap().clone();
                assert_eq!(channels.len(), 6);
                let names: Vec<&str> =
                    channels.iter().map(|c| c["name"].as_str().unwrap()).collect();
                for expected in CHANNELS {
                    assert!(names.contains(&expected), "missing channel {}", expected);
                }
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_method() {
        let registry = MethodRegistry::new();
        let frame = registry.dispatch("r2", "no.such", None, &test_ctx());
        match frame {
            Frame::Response { id, ok, error, .. } => {
                assert_eq!(id, "r2");
                assert!(!ok);
                assert_eq!(error.unwrap().code, error_codes::METHOD_NOT_FOUND);
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_every_handler_produces_json_object() {
        let registry = MethodRegistry::new();
        let ctx = test_ctx();
        for (name, _) in CATALOG {
            let frame = registry.dispatch("x", name, None, &ctx);
            match frame {
                Frame::Response { ok, payload, .. } => {
                    assert!(ok, "{} not ok", name);
                    assert!(payload.unwrap().is_object(), "{} payload not an object", name);
                }
                other => panic!("expected response for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_hello_ok_shape() {
        let registry = MethodRegistry::new();
        let hello = registry.hello_ok(&test_ctx(), None);
        assert_eq!(hello["type"], "hello-ok");
        assert_eq!(hello["protocol"], 1);
        assert_eq!(hello["policy"]["tickIntervalMs"], 30_000);
        assert_eq!(hello["policy"]["maxPayload"], 524_288);
        let methods = hello["features"]["methods"].as_array().unwrap();
        assert!(methods.iter().any(|m| m == "channels.status"));
        assert!(hello.get("auth").is_none());
    }

    #[test]
    fn test_hello_ok_with_device_auth() {
        let registry = MethodRegistry::new();
        let auth = json!({ "deviceToken": Uuid::new_v4(), "role": "admin", "scopes": ["*"], "issuedAtMs": now_ms() });
        let hello = registry.hello_ok(&test_ctx(), Some(auth));
        assert_eq!(hello["auth"]["role"], "admin");
        assert_eq!(hello["auth"]["scopes"][0], "*");
    }

    #[test]
    fn test_config_get_leaks_decoy_token() {
        let registry = MethodRegistry::new();
        let frame = registry.dispatch("r3", "config.get", None, &test_ctx());
        match frame {
            Frame::Response { payload, .. } => {
                let payload = payload.unwrap();
                assert_eq!(payload["config"]["gateway"]["token"], "oc_gw_test");
            }
            other => panic!("expected response, got {:?}", other),
        }
    }
}
