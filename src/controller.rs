//! Process wiring and lifecycle.
//!
//! The controller builds the shared context (store, classifier, method
//! registry, live-connection table), runs the warp listener and owns the
//! graceful-shutdown sequence: announce, close sockets, drain HTTP.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info};
use serde_json::json;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use crate::classifier::Classifier;
use crate::configuration::Config;
use crate::error_handling::types::ControllerError;
use crate::gateway::registry::ConnectionRegistry;
use crate::protocol::methods::MethodRegistry;
use crate::storage::store::Store;
use crate::storage::tracker::AttackerTracker;
use crate::web_interface;

/// Everything a request or socket handler needs, shared by `Arc`.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<Store>,
    pub classifier: Arc<Classifier>,
    pub methods: Arc<MethodRegistry>,
    pub registry: Arc<ConnectionRegistry>,
    pub tracker: AttackerTracker,
    pub started_at: DateTime<Utc>,
    /// Per-connection tasks subscribe to this; one send tears them all down.
    pub shutdown: broadcast::Sender<()>,
}

pub struct Controller {
    app: Arc<AppContext>,
    server_handle: Option<JoinHandle<()>>,
}

impl Controller {
    /// Build the shared context. An unreachable database is fatal here; the
    /// caller exits non-zero.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        let store = Arc::new(Store::connect(&config.database_url).await?);
        let tracker = AttackerTracker::new(store.clone());
        let (shutdown, _) = broadcast::channel(4);

        if let Some(url) = &config.alert_webhook_url {
            info!("alert webhook configured: {}", url);
        }
        if let Some(path) = &config.geoip_database_path {
            info!("geoip database configured: {}", path.display());
        }

        let app = Arc::new(AppContext {
            store,
            classifier: Arc::new(Classifier::new()),
            methods: Arc::new(MethodRegistry::new()),
            registry: Arc::new(ConnectionRegistry::new()),
            tracker,
            started_at: Utc::now(),
            shutdown,
            config,
        });
        Ok(Self {
            app,
            server_handle: None,
        })
    }

    /// Serve until the shutdown channel fires, then tear down in order:
    /// announce the shutdown event, close live sockets, drain HTTP.
    pub async fn run(
        &mut self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ControllerError> {
        let addr = self.app.config.listen_addr()?;
        let routes = web_interface::server::routes(self.app.clone());

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (bound, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
            let _ = stop_rx.await;
        });
        info!("gateway listening on {}", bound);
        self.server_handle = Some(tokio::spawn(server));

        let _ = shutdown_rx.recv().await;
        info!("shutdown requested, closing connections");

        let notified = self
            .app
            .registry
            .broadcast("shutdown", json!({ "reason": "maintenance" }))
            .await;
        info!("shutdown event sent to {} connections", notified);
        let _ = self.app.shutdown.send(());

        let _ = stop_tx.send(());
        if let Some(handle) = self.server_handle.take() {
            if let Err(e) = handle.await {
                error!("server task ended abnormally: {}", e);
            }
        }
        info!("gateway stopped");
        Ok(())
    }

    pub fn context(&self) -> Arc<AppContext> {
        self.app.clone()
    }
}

/// Shared fixture for in-crate tests: full context over a throwaway
/// SQLite file.
#[cfg(test)]
pub(crate) async fn test_app() -> Arc<AppContext> {
    use clap::Parser;
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.sqlite3");
    Box::leak(Box::new(dir));
    let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
    let config = Config::try_parse_from(["propolis", "--database-url", url.as_str()]).unwrap();

    let store = Arc::new(Store::connect(&url).await.unwrap());
    let tracker = AttackerTracker::new(store.clone());
    let (shutdown, _) = broadcast::channel(4);
    Arc::new(AppContext {
        store,
        classifier: Arc::new(Classifier::new()),
        methods: Arc::new(MethodRegistry::new()),
        registry: Arc::new(ConnectionRegistry::new()),
        tracker,
        started_at: Utc::now(),
        shutdown,
        config,
    })
}
