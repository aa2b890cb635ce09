//! SQLite-backed store gateway.
//!
//! Write-only: the running honeypot only ever inserts (plus the connection
//! close timestamp and the attacker-session upsert). Analysis happens out of
//! process, against the same file.

use chrono::Utc;
use log::{error, info};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    EntityTrait, QueryFilter, Set, Statement,
};
use std::future::Future;
use uuid::Uuid;

use crate::error_handling::types::StoreError;
use crate::storage::db_entities::{
    attacker_sessions, auth_attempts, channel_interactions, connections, requests,
    suspicious_activities, ws_messages,
};
use crate::storage::types::{
    truncate_chars, AuthAttemptRecord, ChannelInteractionRecord, ConnectionRecord, RequestRecord,
    SuspiciousActivityRecord, TouchDelta, WsMessageRecord, CREDENTIAL_PREFIX_LIMIT,
    REQUEST_BODY_LIMIT, RESPONSE_BODY_LIMIT, SUSPICIOUS_PAYLOAD_LIMIT, WS_RAW_LIMIT,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS connections (
        id TEXT PRIMARY KEY,
        source_ip TEXT NOT NULL,
        user_agent TEXT,
        transport TEXT NOT NULL,
        connected_at TEXT NOT NULL,
        disconnected_at TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        connection_id TEXT NOT NULL,
        method TEXT NOT NULL,
        path TEXT NOT NULL,
        query TEXT,
        headers TEXT NOT NULL,
        body TEXT NOT NULL,
        body_size INTEGER NOT NULL,
        response_code INTEGER NOT NULL,
        response_body TEXT NOT NULL,
        duration_ms INTEGER NOT NULL,
        suspicious INTEGER NOT NULL,
        reasons TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY(connection_id) REFERENCES connections(id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ws_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        connection_id TEXT NOT NULL,
        direction TEXT NOT NULL,
        frame_kind TEXT NOT NULL,
        method TEXT,
        correlation_id TEXT,
        payload TEXT,
        raw TEXT NOT NULL,
        payload_size INTEGER NOT NULL,
        suspicious INTEGER NOT NULL,
        reasons TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY(connection_id) REFERENCES connections(id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS auth_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        connection_id TEXT NOT NULL,
        source_ip TEXT NOT NULL,
        auth_method TEXT NOT NULL,
        credential TEXT NOT NULL,
        credential_raw TEXT,
        success INTEGER NOT NULL,
        client_id TEXT,
        client_version TEXT,
        client_platform TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY(connection_id) REFERENCES connections(id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS channel_interactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        channel TEXT NOT NULL,
        endpoint TEXT NOT NULL,
        http_method TEXT NOT NULL,
        headers TEXT NOT NULL,
        payload TEXT NOT NULL,
        payload_size INTEGER NOT NULL,
        sender_id TEXT,
        message_text TEXT,
        source_ip TEXT NOT NULL,
        response_code INTEGER NOT NULL,
        response_body TEXT NOT NULL,
        suspicious INTEGER NOT NULL,
        reasons TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS suspicious_activities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category TEXT NOT NULL,
        severity TEXT NOT NULL,
        description TEXT NOT NULL,
        payload TEXT NOT NULL,
        pattern TEXT NOT NULL,
        source_ip TEXT NOT NULL,
        user_agent TEXT,
        request_path TEXT,
        request_method TEXT,
        connection_id TEXT,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attacker_sessions (
        source_ip TEXT PRIMARY KEY,
        first_seen TEXT NOT NULL,
        last_seen TEXT NOT NULL,
        request_count INTEGER NOT NULL,
        ws_message_count INTEGER NOT NULL,
        auth_attempt_count INTEGER NOT NULL,
        suspicious_count INTEGER NOT NULL,
        is_scanner INTEGER NOT NULL,
        is_bruteforcer INTEGER NOT NULL,
        is_exploiter INTEGER NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_requests_connection ON requests(connection_id);",
    "CREATE INDEX IF NOT EXISTS idx_ws_messages_connection ON ws_messages(connection_id);",
    "CREATE INDEX IF NOT EXISTS idx_suspicious_source_ip ON suspicious_activities(source_ip);",
    "CREATE INDEX IF NOT EXISTS idx_channel_source_ip ON channel_interactions(source_ip);",
];

pub struct Store {
    conn: DatabaseConnection,
}

impl Store {
    /// Open (creating if needed) the database and bootstrap the schema.
    /// A failure here is fatal to startup.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let conn = Database::connect(database_url)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        conn.execute(Statement::from_string(
            DbBackend::Sqlite,
            "PRAGMA foreign_keys = ON".to_string(),
        ))
        .await
        .map_err(|e| StoreError::SchemaFailed(e.to_string()))?;
        for ddl in SCHEMA {
            conn.execute(Statement::from_string(DbBackend::Sqlite, ddl.to_string()))
                .await
                .map_err(|e| StoreError::SchemaFailed(e.to_string()))?;
        }
        info!("evidence store ready at {}", database_url);
        Ok(Self { conn })
    }

    pub async fn insert_connection(&self, record: &ConnectionRecord) -> Result<(), StoreError> {
        let model = connections::ActiveModel {
            id: Set(record.id.to_string()),
            source_ip: Set(record.source_ip.clone()),
            user_agent: Set(record.user_agent.clone()),
            transport: Set(record.transport.as_str().to_string()),
            connected_at: Set(record.connected_at.to_rfc3339()),
            disconnected_at: Set(None),
        };
        connections::Entity::insert(model).exec(&self.conn).await?;
        Ok(())
    }

    /// Stamp the close time. Only a null `disconnected_at` is written, so a
    /// timestamp once set is never cleared.
    pub async fn close_connection(&self, id: Uuid) -> Result<(), StoreError> {
        connections::Entity::update_many()
            .col_expr(
                connections::Column::DisconnectedAt,
                Expr::value(Utc::now().to_rfc3339()),
            )
            .filter(connections::Column::Id.eq(id.to_string()))
            .filter(connections::Column::DisconnectedAt.is_null())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn insert_request(&self, record: &RequestRecord) -> Result<(), StoreError> {
        let model = requests::ActiveModel {
            connection_id: Set(record.connection_id.to_string()),
            method: Set(record.method.clone()),
            path: Set(record.path.clone()),
            query: Set(record.query.clone()),
            headers: Set(record.headers.to_string()),
            body: Set(truncate_chars(&record.body, REQUEST_BODY_LIMIT)),
            body_size: Set(record.body.len() as i64),
            response_code: Set(record.response_code as i32),
            response_body: Set(truncate_chars(&record.response_body, RESPONSE_BODY_LIMIT)),
            duration_ms: Set(record.duration_ms),
            suspicious: Set(record.suspicious),
            reasons: Set(reasons_json(&record.reasons)),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };
        model.insert(&self.conn).await?;
        Ok(())
    }

    pub async fn insert_ws_message(&self, record: &WsMessageRecord) -> Result<(), StoreError> {
        let model = ws_messages::ActiveModel {
            connection_id: Set(record.connection_id.to_string()),
            direction: Set(record.direction.as_str().to_string()),
            frame_kind: Set(record.frame_kind.as_str().to_string()),
            method: Set(record.method.clone()),
            correlation_id: Set(record.correlation_id.clone()),
            payload: Set(record.payload.as_ref().map(|p| p.to_string())),
            raw: Set(truncate_chars(&record.raw, WS_RAW_LIMIT)),
            payload_size: Set(record.raw.len() as i64),
            suspicious: Set(record.suspicious),
            reasons: Set(reasons_json(&record.reasons)),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };
        model.insert(&self.conn).await?;
        Ok(())
    }

    pub async fn insert_auth_attempt(&self, record: &AuthAttemptRecord) -> Result<(), StoreError> {
        let model = auth_attempts::ActiveModel {
            connection_id: Set(record.connection_id.to_string()),
            source_ip: Set(record.source_ip.clone()),
            auth_method: Set(record.auth_method.as_str().to_string()),
            credential: Set(record.credential.clone()),
            credential_raw: Set(record
                .credential_raw
                .as_ref()
                .map(|raw| truncate_chars(raw, CREDENTIAL_PREFIX_LIMIT))),
            success: Set(record.success),
            client_id: Set(record.client_id.clone()),
            client_version: Set(record.client_version.clone()),
            client_platform: Set(record.client_platform.clone()),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };
        model.insert(&self.conn).await?;
        Ok(())
    }

    pub async fn insert_channel_interaction(
        &self,
        record: &ChannelInteractionRecord,
    ) -> Result<(), StoreError> {
        let model = channel_interactions::ActiveModel {
            channel: Set(record.channel.as_str().to_string()),
            endpoint: Set(record.endpoint.clone()),
            http_method: Set(record.http_method.clone()),
            headers: Set(record.headers.to_string()),
            payload: Set(truncate_chars(&record.payload, REQUEST_BODY_LIMIT)),
            payload_size: Set(record.payload.len() as i64),
            sender_id: Set(record.sender_id.clone()),
            message_text: Set(record.message_text.clone()),
            source_ip: Set(record.source_ip.clone()),
            response_code: Set(record.response_code as i32),
            response_body: Set(truncate_chars(&record.response_body, RESPONSE_BODY_LIMIT)),
            suspicious: Set(record.suspicious),
            reasons: Set(reasons_json(&record.reasons)),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };
        model.insert(&self.conn).await?;
        Ok(())
    }

    pub async fn insert_suspicious_activity(
        &self,
        record: &SuspiciousActivityRecord,
    ) -> Result<(), StoreError> {
        let model = suspicious_activities::ActiveModel {
            category: Set(record.category.clone()),
            severity: Set(record.severity.clone()),
            description: Set(record.description.clone()),
            payload: Set(truncate_chars(&record.payload, SUSPICIOUS_PAYLOAD_LIMIT)),
            pattern: Set(record.pattern.clone()),
            source_ip: Set(record.source_ip.clone()),
            user_agent: Set(record.user_agent.clone()),
            request_path: Set(record.request_path.clone()),
            request_method: Set(record.request_method.clone()),
            connection_id: Set(record.connection_id.map(|id| id.to_string())),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };
        model.insert(&self.conn).await?;
        Ok(())
    }

    /// Create-or-increment the per-IP aggregate. Counters only ever grow and
    /// the boolean flags are sticky: the OR in the update arm keeps a raised
    /// flag raised.
    pub async fn upsert_attacker_session(
        &self,
        source_ip: &str,
        delta: TouchDelta,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let sql = r#"
            INSERT INTO attacker_sessions (
                source_ip, first_seen, last_seen,
                request_count, ws_message_count, auth_attempt_count, suspicious_count,
                is_scanner, is_bruteforcer, is_exploiter
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_ip) DO UPDATE SET
                last_seen = excluded.last_seen,
                request_count = request_count + excluded.request_count,
                ws_message_count = ws_message_count + excluded.ws_message_count,
                auth_attempt_count = auth_attempt_count + excluded.auth_attempt_count,
                suspicious_count = suspicious_count + excluded.suspicious_count,
                is_scanner = (is_scanner OR excluded.is_scanner),
                is_bruteforcer = (is_bruteforcer OR excluded.is_bruteforcer),
                is_exploiter = (is_exploiter OR excluded.is_exploiter)
        "#;
        self.conn
            .execute(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                sql,
                [
                    source_ip.into(),
                    now.clone().into(),
                    now.into(),
                    (delta.requests as i64).into(),
                    (delta.ws_messages as i64).into(),
                    (delta.auth_attempts as i64).into(),
                    (delta.suspicious as i64).into(),
                    delta.is_scanner.into(),
                    delta.is_bruteforcer.into(),
                    delta.is_exploiter.into(),
                ],
            ))
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> &DatabaseConnection {
        &self.conn
    }
}

/// Run a persistence future off the response path: failures are logged at
/// error level and swallowed.
pub fn spawn_logged<F>(what: &'static str, fut: F)
where
    F: Future<Output = Result<(), StoreError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            error!("{} write failed: {}", what, e);
        }
    });
}

fn reasons_json(reasons: &[String]) -> String {
    serde_json::to_string(reasons).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{
        AuthMethod, ChannelTag, Direction, TransportKind, WsFrameKind,
    };
    use serde_json::json;
    use tempfile::TempDir;

    async fn temp_store() -> Store {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.sqlite3");
        // keep the TempDir alive for the test duration
        Box::leak(Box::new(dir));
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Store::connect(&url).await.unwrap()
    }

    fn connection_record() -> ConnectionRecord {
        ConnectionRecord {
            id: Uuid::new_v4(),
            source_ip: "203.0.113.9".to_string(),
            user_agent: Some("curl/8.5".to_string()),
            transport: TransportKind::Http,
            connected_at: Utc::now(),
        }
    }

    fn request_record(connection_id: Uuid, body: String) -> RequestRecord {
        RequestRecord {
            connection_id,
            method: "POST".to_string(),
            path: "/webhook/whatsapp".to_string(),
            query: None,
            headers: json!({"host": "target"}),
            body,
            response_code: 200,
            response_body: "{\"ok\":true}".to_string(),
            duration_ms: 3,
            suspicious: false,
            reasons: vec![],
        }
    }

    #[tokio::test]
    async fn test_connection_insert_and_close() {
        let store = temp_store().await;
        let record = connection_record();
        store.insert_connection(&record).await.unwrap();

        let row = connections::Entity::find_by_id(record.id.to_string())
            .one(store.raw())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.source_ip, "203.0.113.9");
        assert_eq!(row.transport, "http");
        assert!(row.disconnected_at.is_none());

        store.close_connection(record.id).await.unwrap();
        let closed = connections::Entity::find_by_id(record.id.to_string())
            .one(store.raw())
            .await
            .unwrap()
            .unwrap();
        let first_stamp = closed.disconnected_at.clone().unwrap();

        // a second close must not move the stamp
        store.close_connection(record.id).await.unwrap();
        let again = connections::Entity::find_by_id(record.id.to_string())
            .one(store.raw())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.disconnected_at.unwrap(), first_stamp);
    }

    #[tokio::test]
    async fn test_request_body_truncation_boundary() {
        let store = temp_store().await;
        let conn_record = connection_record();
        store.insert_connection(&conn_record).await.unwrap();

        store
            .insert_request(&request_record(conn_record.id, "a".repeat(10_000)))
            .await
            .unwrap();
        store
            .insert_request(&request_record(conn_record.id, "a".repeat(10_001)))
            .await
            .unwrap();

        let rows = requests::Entity::find().all(store.raw()).await.unwrap();
        assert_eq!(rows.len(), 2);
        let exact = rows.iter().find(|r| r.body_size == 10_000).unwrap();
        assert_eq!(exact.body.len(), 10_000);
        let over = rows.iter().find(|r| r.body_size == 10_001).unwrap();
        assert_eq!(over.body.len(), 10_000);
    }

    #[tokio::test]
    async fn test_ws_message_insert() {
        let store = temp_store().await;
        let conn_record = connection_record();
        store.insert_connection(&conn_record).await.unwrap();

        store
            .insert_ws_message(&WsMessageRecord {
                connection_id: conn_record.id,
                direction: Direction::Inbound,
                frame_kind: WsFrameKind::Request,
                method: Some("channels.status".to_string()),
                correlation_id: Some("r1".to_string()),
                payload: Some(json!({"type":"req","id":"r1","method":"channels.status"})),
                raw: "{\"type\":\"req\",\"id\":\"r1\",\"method\":\"channels.status\"}".to_string(),
                suspicious: false,
                reasons: vec![],
            })
            .await
            .unwrap();

        let rows = ws_messages::Entity::find().all(store.raw()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].frame_kind, "request");
        assert_eq!(rows[0].method.as_deref(), Some("channels.status"));
        assert_eq!(rows[0].connection_id, conn_record.id.to_string());
    }

    #[tokio::test]
    async fn test_auth_attempt_credential_prefix_limit() {
        let store = temp_store().await;
        let conn_record = connection_record();
        store.insert_connection(&conn_record).await.unwrap();

        store
            .insert_auth_attempt(&AuthAttemptRecord {
                connection_id: conn_record.id,
                source_ip: conn_record.source_ip.clone(),
                auth_method: AuthMethod::Token,
                credential: "hash_deadbeef".to_string(),
                credential_raw: Some("x".repeat(250)),
                success: true,
                client_id: Some("cli".to_string()),
                client_version: None,
                client_platform: None,
            })
            .await
            .unwrap();

        let rows = auth_attempts::Entity::find().all(store.raw()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].success);
        assert_eq!(rows[0].auth_method, "token");
        assert_eq!(rows[0].credential_raw.as_ref().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_channel_interaction_insert() {
        let store = temp_store().await;
        store
            .insert_channel_interaction(&ChannelInteractionRecord {
                channel: ChannelTag::Telegram,
                endpoint: "/bot123/sendMessage".to_string(),
                http_method: "POST".to_string(),
                headers: json!({}),
                payload: "{\"chat_id\":1}".to_string(),
                sender_id: Some("1".to_string()),
                message_text: Some("hi".to_string()),
                source_ip: "198.51.100.4".to_string(),
                response_code: 200,
                response_body: "{\"ok\":true}".to_string(),
                suspicious: false,
                reasons: vec![],
            })
            .await
            .unwrap();

        let rows = channel_interactions::Entity::find().all(store.raw()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].channel, "telegram");
        assert_eq!(rows[0].sender_id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_suspicious_activity_payload_truncation() {
        let store = temp_store().await;
        store
            .insert_suspicious_activity(&SuspiciousActivityRecord {
                category: "sql_injection".to_string(),
                severity: "high".to_string(),
                description: "SQL injection attempt".to_string(),
                payload: "x".repeat(6_000),
                pattern: "pattern".to_string(),
                source_ip: "198.51.100.4".to_string(),
                user_agent: None,
                request_path: Some("/webhook/whatsapp".to_string()),
                request_method: Some("POST".to_string()),
                connection_id: None,
            })
            .await
            .unwrap();

        let rows = suspicious_activities::Entity::find().all(store.raw()).await.unwrap();
        assert_eq!(rows[0].payload.len(), 5_000);
        assert_eq!(rows[0].severity, "high");
    }

    #[tokio::test]
    async fn test_attacker_session_upsert_accumulates() {
        let store = temp_store().await;
        let delta = TouchDelta {
            requests: 2,
            ws_messages: 1,
            auth_attempts: 0,
            suspicious: 1,
            is_scanner: false,
            is_bruteforcer: false,
            is_exploiter: false,
        };
        for _ in 0..3 {
            store.upsert_attacker_session("192.0.2.1", delta).await.unwrap();
        }

        let row = attacker_sessions::Entity::find_by_id("192.0.2.1".to_string())
            .one(store.raw())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.request_count, 6);
        assert_eq!(row.ws_message_count, 3);
        assert_eq!(row.auth_attempt_count, 0);
        assert_eq!(row.suspicious_count, 3);
    }

    #[tokio::test]
    async fn test_attacker_session_flags_sticky() {
        let store = temp_store().await;
        store
            .upsert_attacker_session(
                "192.0.2.2",
                TouchDelta { is_scanner: true, ..Default::default() },
            )
            .await
            .unwrap();
        // a later clean touch must not lower the flag
        store
            .upsert_attacker_session("192.0.2.2", TouchDelta::request())
            .await
            .unwrap();

        let row = attacker_sessions::Entity::find_by_id("192.0.2.2".to_string())
            .one(store.raw())
            .await
            .unwrap()
            .unwrap();
        assert!(row.is_scanner);
        assert!(!row.is_exploiter);
        assert_eq!(row.request_count, 1);
    }
}
