//! SeaORM entity models, one module per table.
//!
//! Timestamps are RFC 3339 strings, uuids are TEXT. The store is
//! append-only apart from `connections.disconnected_at` and the
//! `attacker_sessions` upsert.

pub mod connections {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "connections")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub source_ip: String,
        pub user_agent: Option<String>,
        pub transport: String,
        pub connected_at: String,
        pub disconnected_at: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod requests {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "requests")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub connection_id: String,
        pub method: String,
        pub path: String,
        pub query: Option<String>,
        pub headers: String,
        pub body: String,
        pub body_size: i64,
        pub response_code: i32,
        pub response_body: String,
        pub duration_ms: i64,
        pub suspicious: bool,
        pub reasons: String,
        pub created_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::connections::Entity",
            from = "Column::ConnectionId",
            to = "super::connections::Column::Id"
        )]
        Connection,
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod ws_messages {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "ws_messages")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub connection_id: String,
        pub direction: String,
        pub frame_kind: String,
        pub method: Option<String>,
        pub correlation_id: Option<String>,
        pub payload: Option<String>,
        pub raw: String,
        pub payload_size: i64,
        pub suspicious: bool,
        pub reasons: String,
        pub created_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::connections::Entity",
            from = "Column::ConnectionId",
            to = "super::connections::Column::Id"
        )]
        Connection,
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod auth_attempts {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "auth_attempts")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub connection_id: String,
        pub source_ip: String,
        pub auth_method: String,
        pub credential: String,
        pub credential_raw: Option<String>,
        pub success: bool,
        pub client_id: Option<String>,
        pub client_version: Option<String>,
        pub client_platform: Option<String>,
        pub created_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::connections::Entity",
            from = "Column::ConnectionId",
            to = "super::connections::Column::Id"
        )]
        Connection,
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod channel_interactions {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "channel_interactions")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub channel: String,
        pub endpoint: String,
        pub http_method: String,
        pub headers: String,
        pub payload: String,
        pub payload_size: i64,
        pub sender_id: Option<String>,
        pub message_text: Option<String>,
        pub source_ip: String,
        pub response_code: i32,
        pub response_body: String,
        pub suspicious: bool,
        pub reasons: String,
        pub created_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod suspicious_activities {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "suspicious_activities")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub category: String,
        pub severity: String,
        pub description: String,
        pub payload: String,
        pub pattern: String,
        pub source_ip: String,
        pub user_agent: Option<String>,
        pub request_path: Option<String>,
        pub request_method: Option<String>,
        pub connection_id: Option<String>,
        pub created_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod attacker_sessions {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "attacker_sessions")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub source_ip: String,
        pub first_seen: String,
        pub last_seen: String,
        pub request_count: i64,
        pub ws_message_count: i64,
        pub auth_attempt_count: i64,
        pub suspicious_count: i64,
        pub is_scanner: bool,
        pub is_bruteforcer: bool,
        pub is_exploiter: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
