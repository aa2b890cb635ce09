//! Per-WebSocket state machine.
//!
//! One task per socket owns the reader half, the tick timer and the
//! shutdown listener in a single select loop. All outbound traffic funnels
//! through one writer task so a handler response and a tick can never
//! interleave mid-send.

use std::sync::Arc;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use crate::classifier::Classification;
use crate::controller::AppContext;
use crate::gateway::auth;
use crate::gateway::registry::ConnectionHandle;
use crate::protocol::frames::{
    parse_inbound, ConnectEnvelope, Frame, Inbound, PROTOCOL_VERSION, TICK_INTERVAL_MS,
};
use crate::protocol::methods::MethodContext;
use crate::storage::store::spawn_logged;
use crate::storage::types::{
    AuthAttemptRecord, ConnectionRecord, Direction, SuspiciousActivityRecord, TouchDelta,
    TransportKind, WsFrameKind, WsMessageRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    New,
    Authenticated,
}

/// Drive one upgraded socket until the peer leaves, the transport fails or
/// the process shuts down.
pub async fn handle_socket(
    socket: WebSocket,
    source_ip: String,
    user_agent: Option<String>,
    app: Arc<AppContext>,
) {
    let conn_id = Uuid::new_v4();
    info!("websocket connection {} from {}", conn_id, source_ip);

    // the connection row is the FK parent of everything else on this socket,
    // so it is the one write that is awaited
    let record = ConnectionRecord {
        id: conn_id,
        source_ip: source_ip.clone(),
        user_agent: user_agent.clone(),
        transport: TransportKind::WebSocket,
        connected_at: Utc::now(),
    };
    if let Err(e) = app.store.insert_connection(&record).await {
        error!("connection row write failed: {}", e);
    }
    app.tracker.touch(&source_ip, TouchDelta::default());

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let handle = app.registry.register(conn_id, tx).await;
    let method_ctx = MethodContext {
        version: app.config.fake_version.clone(),
        gateway_token: app.config.fake_gateway_token.clone(),
        conn_id,
        started_at: app.started_at,
    };

    let mut state = ConnState::New;
    let tick_period = Duration::from_millis(TICK_INTERVAL_MS);
    let mut ticker = interval_at(Instant::now() + tick_period, tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut shutdown_rx = app.shutdown.subscribe();

    loop {
        tokio::select! {
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(message)) => {
                        if message.is_close() {
                            break;
                        }
                        let Ok(text) = message.to_str() else { continue };
                        state = process_text(
                            text,
                            state,
                            &handle,
                            &method_ctx,
                            &source_ip,
                            user_agent.as_deref(),
                            conn_id,
                            &app,
                        );
                    }
                    Some(Err(e)) => {
                        debug!("connection {} transport error: {}", conn_id, e);
                        break;
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                if state == ConnState::Authenticated && !emit_tick(&handle, conn_id, &app) {
                    break;
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    app.registry.remove(conn_id).await;
    drop(handle);
    let store = app.store.clone();
    spawn_logged("connection_close", async move {
        store.close_connection(conn_id).await
    });
    let _ = writer.await;
    info!("websocket connection {} closed", conn_id);
}

/// Handle one inbound text message: classify, persist, respond. Returns the
/// next state. Nothing here awaits; persistence is spawned off the path.
#[allow(clippy::too_many_arguments)]
fn process_text(
    text: &str,
    state: ConnState,
    handle: &ConnectionHandle,
    method_ctx: &MethodContext,
    source_ip: &str,
    user_agent: Option<&str>,
    conn_id: Uuid,
    app: &Arc<AppContext>,
) -> ConnState {
    let classification = app.classifier.classify(text);
    record_suspicious(&classification, text, source_ip, user_agent, conn_id, app);

    let mut delta = TouchDelta::ws_message();
    if classification.is_suspicious() {
        delta.suspicious = classification.matches.len() as u32;
        delta.is_scanner = classification.is_scanner();
        delta.is_exploiter = classification.is_exploiter();
    }
    app.tracker.touch(source_ip, delta);

    match parse_inbound(text) {
        None => {
            debug!("connection {} sent an unparseable frame", conn_id);
            record_inbound(app, conn_id, WsFrameKind::Invalid, None, None, None, text, &classification);
            state
        }
        Some(Inbound::Envelope(envelope, raw)) => {
            record_inbound(
                app,
                conn_id,
                WsFrameKind::Connect,
                None,
                None,
                Some(raw),
                text,
                &classification,
            );
            match state {
                ConnState::New => {
                    authenticate(*envelope, handle, method_ctx, source_ip, conn_id, app);
                    ConnState::Authenticated
                }
                // a repeated envelope is just more evidence
                ConnState::Authenticated => state,
            }
        }
        Some(Inbound::Frame(frame)) => {
            record_inbound(
                app,
                conn_id,
                match &frame {
                    Frame::Request { .. } => WsFrameKind::Request,
                    Frame::Response { .. } => WsFrameKind::Response,
                    Frame::Event { .. } => WsFrameKind::Event,
                },
                frame.method().map(str::to_string),
                frame.correlation_id().map(str::to_string),
                serde_json::from_str(text).ok(),
                text,
                &classification,
            );
            if state == ConnState::Authenticated {
                if let Frame::Request { id, method, params } = &frame {
                    let response = app.methods.dispatch(id, method, params.as_ref(), method_ctx);
                    record_outbound(app, conn_id, &response);
                    handle.send_frame(&response);
                }
            }
            state
        }
    }
}

/// NEW → AUTHENTICATED. The honeypot accepts every envelope; the credential
/// is captured, the hello-ok goes out, ticks start.
fn authenticate(
    envelope: ConnectEnvelope,
    handle: &ConnectionHandle,
    method_ctx: &MethodContext,
    source_ip: &str,
    conn_id: Uuid,
    app: &Arc<AppContext>,
) {
    let min = envelope.min_protocol.unwrap_or(PROTOCOL_VERSION);
    let max = envelope.max_protocol.unwrap_or(PROTOCOL_VERSION);
    if PROTOCOL_VERSION < min || PROTOCOL_VERSION > max {
        warn!(
            "connection {} protocol range [{}, {}] excludes {}, accepting anyway",
            conn_id, min, max, PROTOCOL_VERSION
        );
    }

    let (auth_method, credential) = auth::detect_credentials(&envelope);
    let client = envelope.client.clone().unwrap_or_default();
    let attempt = AuthAttemptRecord {
        connection_id: conn_id,
        source_ip: source_ip.to_string(),
        auth_method,
        credential: auth::fingerprint(credential.as_deref().unwrap_or("")),
        credential_raw: credential,
        success: true,
        client_id: client.id,
        client_version: client.version,
        client_platform: client.platform,
    };
    let store = app.store.clone();
    spawn_logged("auth_attempt", async move {
        store.insert_auth_attempt(&attempt).await
    });
    app.tracker.touch(source_ip, TouchDelta::auth_attempt());

    // a device-bound handshake is granted a fresh admin token on the spot
    let device_auth = envelope.device.as_ref().map(|_| {
        json!({
            "deviceToken": Uuid::new_v4(),
            "role": "admin",
            "scopes": ["*"],
            "issuedAtMs": Utc::now().timestamp_millis(),
        })
    });
    let hello = app.methods.hello_ok(method_ctx, device_auth);
    record_outbound_raw(app, conn_id, WsFrameKind::Connect, &hello);
    handle.send_json(&hello);
    handle.mark_authenticated();
}

/// Emit one heartbeat tick. Returns false when the writer is gone, which
/// means the socket is dead.
fn emit_tick(handle: &ConnectionHandle, conn_id: Uuid, app: &Arc<AppContext>) -> bool {
    let frame = Frame::event(
        "tick",
        json!({ "ts": Utc::now().timestamp_millis() }),
        handle.next_seq(),
    );
    let sent = handle.send_frame(&frame);
    if sent {
        record_outbound(app, conn_id, &frame);
    } else {
        debug!("connection {} tick skipped, socket gone", conn_id);
    }
    sent
}

#[allow(clippy::too_many_arguments)]
fn record_inbound(
    app: &Arc<AppContext>,
    conn_id: Uuid,
    frame_kind: WsFrameKind,
    method: Option<String>,
    correlation_id: Option<String>,
    payload: Option<Value>,
    raw: &str,
    classification: &Classification,
) {
    let record = WsMessageRecord {
        connection_id: conn_id,
        direction: Direction::Inbound,
        frame_kind,
        method,
        correlation_id,
        payload,
        raw: raw.to_string(),
        suspicious: classification.is_suspicious(),
        reasons: classification.reasons(),
    };
    let store = app.store.clone();
    spawn_logged("ws_message", async move {
        store.insert_ws_message(&record).await
    });
}

fn record_outbound(app: &Arc<AppContext>, conn_id: Uuid, frame: &Frame) {
    let record = WsMessageRecord {
        connection_id: conn_id,
        direction: Direction::Outbound,
        frame_kind: match frame {
            Frame::Request { .. } => WsFrameKind::Request,
            Frame::Response { .. } => WsFrameKind::Response,
            Frame::Event { .. } => WsFrameKind::Event,
        },
        method: frame.method().map(str::to_string),
        correlation_id: frame.correlation_id().map(str::to_string),
        payload: serde_json::from_str(&frame.to_text()).ok(),
        raw: frame.to_text(),
        suspicious: false,
        reasons: vec![],
    };
    let store = app.store.clone();
    spawn_logged("ws_message", async move {
        store.insert_ws_message(&record).await
    });
}

fn record_outbound_raw(app: &Arc<AppContext>, conn_id: Uuid, frame_kind: WsFrameKind, value: &Value) {
    let record = WsMessageRecord {
        connection_id: conn_id,
        direction: Direction::Outbound,
        frame_kind,
        method: None,
        correlation_id: None,
        payload: Some(value.clone()),
        raw: value.to_string(),
        suspicious: false,
        reasons: vec![],
    };
    let store = app.store.clone();
    spawn_logged("ws_message", async move {
        store.insert_ws_message(&record).await
    });
}

fn record_suspicious(
    classification: &Classification,
    payload: &str,
    source_ip: &str,
    user_agent: Option<&str>,
    conn_id: Uuid,
    app: &Arc<AppContext>,
) {
    for hit in &classification.matches {
        let record = SuspiciousActivityRecord {
            category: hit.category.as_str().to_string(),
            severity: hit.severity.as_str().to_string(),
            description: hit.category.description().to_string(),
            payload: payload.to_string(),
            pattern: hit.pattern.to_string(),
            source_ip: source_ip.to_string(),
            user_agent: user_agent.map(str::to_string),
            request_path: None,
            request_method: None,
            connection_id: Some(conn_id),
        };
        let store = app.store.clone();
        spawn_logged("suspicious_activity", async move {
            store.insert_suspicious_activity(&record).await
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::test_app;
    use crate::storage::db_entities::{auth_attempts, connections, ws_messages};
    use sea_orm::EntityTrait;

    const ENVELOPE: &str = r#"{"minProtocol":1,"maxProtocol":1,"client":{"id":"x","version":"0","platform":"linux","mode":"m"},"auth":{"token":"abc"}}"#;

    async fn ws_client(
        app: Arc<AppContext>,
    ) -> warp::test::WsClient {
        let route = crate::web_interface::server::gateway_route(app);
        warp::test::ws()
            .path("/")
            .handshake(route)
            .await
            .expect("websocket handshake")
    }

    async fn recv_json(client: &mut warp::test::WsClient) -> Value {
        let message = client.recv().await.expect("frame");
        serde_json::from_str(message.to_str().expect("text frame")).expect("json frame")
    }

    async fn settle() {
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    }

    #[tokio::test]
    async fn test_handshake_acceptance() {
        let app = test_app().await;
        let mut client = ws_client(app.clone()).await;

        client.send_text(ENVELOPE).await;
        let hello = recv_json(&mut client).await;
        assert_eq!(hello["type"], "hello-ok");
        assert_eq!(hello["protocol"], 1);
        assert_eq!(hello["policy"]["tickIntervalMs"], 30_000);
        let methods = hello["features"]["methods"].as_array().unwrap();
        assert!(methods.iter().any(|m| m == "channels.status"));

        settle().await;
        let attempts = auth_attempts::Entity::find().all(app.store.raw()).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].auth_method, "token");
        assert!(attempts[0].credential.starts_with("hash_"));
        assert_eq!(attempts[0].credential_raw.as_deref(), Some("abc"));
        assert!(attempts[0].success);

        // the auth attempt references a live connection row
        let conn_rows = connections::Entity::find().all(app.store.raw()).await.unwrap();
        assert_eq!(conn_rows.len(), 1);
        assert_eq!(attempts[0].connection_id, conn_rows[0].id);
    }

    #[tokio::test]
    async fn test_method_dispatch() {
        let app = test_app().await;
        let mut client = ws_client(app.clone()).await;
        client.send_text(ENVELOPE).await;
        let _hello = recv_json(&mut client).await;

        client
            .send_text(r#"{"type":"req","id":"r1","method":"channels.status"}"#)
            .await;
        let response = recv_json(&mut client).await;
        assert_eq!(response["type"], "res");
        assert_eq!(response["id"], "r1");
        assert_eq!(response["ok"], true);
        let channels = response["payload"]["channels"].as_array().unwrap();
        assert_eq!(channels.len(), 6);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let app = test_app().await;
        let mut client = ws_client(app.clone()).await;
        client.send_text(ENVELOPE).await;
        let _hello = recv_json(&mut client).await;

        client
            .send_text(r#"{"type":"req","id":"r2","method":"no.such"}"#)
            .await;
        let response = recv_json(&mut client).await;
        assert_eq!(response["id"], "r2");
        assert_eq!(response["ok"], false);
        assert_eq!(response["error"]["code"], "method_not_found");
    }

    #[tokio::test]
    async fn test_invalid_frame_keeps_socket_open() {
        let app = test_app().await;
        let mut client = ws_client(app.clone()).await;
        client.send_text(ENVELOPE).await;
        let _hello = recv_json(&mut client).await;

        client.send_text("not json at all").await;
        // the socket survives; the next request is answered normally
        client
            .send_text(r#"{"type":"req","id":"r3","method":"health"}"#)
            .await;
        let response = recv_json(&mut client).await;
        assert_eq!(response["id"], "r3");
        assert_eq!(response["ok"], true);

        settle().await;
        let rows = ws_messages::Entity::find().all(app.store.raw()).await.unwrap();
        assert!(rows.iter().any(|r| r.frame_kind == "invalid"));
    }

    #[tokio::test]
    async fn test_request_before_envelope_gets_no_response() {
        let app = test_app().await;
        let mut client = ws_client(app.clone()).await;

        // still NEW: logged, no reply
        client
            .send_text(r#"{"type":"req","id":"early","method":"health"}"#)
            .await;
        // envelope then unblocks the session
        client.send_text(ENVELOPE).await;
        let hello = recv_json(&mut client).await;
        assert_eq!(hello["type"], "hello-ok");

        settle().await;
        let rows = ws_messages::Entity::find().all(app.store.raw()).await.unwrap();
        let early = rows
            .iter()
            .find(|r| r.correlation_id.as_deref() == Some("early"))
            .expect("pre-auth request recorded");
        assert_eq!(early.direction, "inbound");
        // no outbound response for it
        assert!(!rows
            .iter()
            .any(|r| r.direction == "outbound" && r.correlation_id.as_deref() == Some("early")));
    }

    #[tokio::test]
    async fn test_device_handshake_grants_admin_auth() {
        let app = test_app().await;
        let mut client = ws_client(app.clone()).await;
        client
            .send_text(r#"{"minProtocol":1,"maxProtocol":1,"device":{"id":"dev-1"},"auth":{"token":"t"}}"#)
            .await;
        let hello = recv_json(&mut client).await;
        assert_eq!(hello["auth"]["role"], "admin");
        assert_eq!(hello["auth"]["scopes"][0], "*");
        assert!(hello["auth"]["deviceToken"].is_string());
    }

    #[tokio::test]
    async fn test_protocol_mismatch_still_accepted() {
        let app = test_app().await;
        let mut client = ws_client(app.clone()).await;
        client
            .send_text(r#"{"minProtocol":4,"maxProtocol":9,"auth":{"password":"letmein"}}"#)
            .await;
        let hello = recv_json(&mut client).await;
        assert_eq!(hello["type"], "hello-ok");

        settle().await;
        let attempts = auth_attempts::Entity::find().all(app.store.raw()).await.unwrap();
        assert_eq!(attempts[0].auth_method, "password");
        assert!(attempts[0].success);
    }

    #[tokio::test]
    async fn test_ws_messages_recorded_both_directions() {
        let app = test_app().await;
        let mut client = ws_client(app.clone()).await;
        client.send_text(ENVELOPE).await;
        let _hello = recv_json(&mut client).await;
        client
            .send_text(r#"{"type":"req","id":"r1","method":"status"}"#)
            .await;
        let _response = recv_json(&mut client).await;

        settle().await;
        let rows = ws_messages::Entity::find().all(app.store.raw()).await.unwrap();
        assert!(rows.iter().any(|r| r.direction == "inbound" && r.frame_kind == "connect"));
        assert!(rows.iter().any(|r| r.direction == "outbound" && r.frame_kind == "connect"));
        assert!(rows
            .iter()
            .any(|r| r.direction == "inbound" && r.method.as_deref() == Some("status")));
        assert!(rows
            .iter()
            .any(|r| r.direction == "outbound" && r.frame_kind == "response"));
    }

    #[tokio::test]
    async fn test_tick_frames_carry_increasing_seq() {
        let app = test_app().await;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let conn_id = Uuid::new_v4();
        let handle = app.registry.register(conn_id, tx).await;
        handle.mark_authenticated();

        assert!(emit_tick(&handle, conn_id, &app));
        assert!(emit_tick(&handle, conn_id, &app));

        for expected_seq in 1..=2u64 {
            let message = rx.try_recv().expect("tick queued");
            let value: Value = serde_json::from_str(message.to_str().unwrap()).unwrap();
            assert_eq!(value["type"], "event");
            assert_eq!(value["event"], "tick");
            assert!(value["payload"]["ts"].is_i64());
            assert_eq!(value["seq"], expected_seq);
        }

        // once the receiver is gone the tick reports the socket as dead
        drop(rx);
        assert!(!emit_tick(&handle, conn_id, &app));
    }

    #[tokio::test]
    async fn test_suspicious_ws_payload_classified() {
        let app = test_app().await;
        let mut client = ws_client(app.clone()).await;
        client.send_text(ENVELOPE).await;
        let _hello = recv_json(&mut client).await;
        client
            .send_text(r#"{"type":"req","id":"r9","method":"send","params":{"text":"' OR 1=1--"}}"#)
            .await;
        let _response = recv_json(&mut client).await;

        settle().await;
        use crate::storage::db_entities::suspicious_activities;
        let hits = suspicious_activities::Entity::find().all(app.store.raw()).await.unwrap();
        assert!(hits.iter().any(|h| h.category == "sql_injection"));
        assert!(hits.iter().all(|h| h.connection_id.is_some()));
    }
}
