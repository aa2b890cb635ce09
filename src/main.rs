use std::fs::File;

use env_logger::Target;
use log::{error, info, warn};
use propolis::configuration::Config;
use propolis::controller::Controller;

#[tokio::main]
async fn main() {
    let config = Config::from_args();

    // Respect RUST_LOG overrides; keep the ORM quiet by default
    let mut builder = env_logger::Builder::from_default_env();
    builder
        .filter_level(config.log_level.to_filter())
        .filter_module("sea_orm", log::LevelFilter::Warn)
        .filter_module("sqlx", log::LevelFilter::Warn)
        .format_target(false);
    if config.log_to_file {
        match File::create(&config.log_path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!(
                    "could not open log file {}: {}, logging to stderr",
                    config.log_path.display(),
                    e
                );
            }
        }
    }
    builder.init();

    println!(
        "
    ┌─────────────────────────────────────────────────┐
    │  propolis — OpenClaw gateway honeypot  v{}  │
    └─────────────────────────────────────────────────┘
    ",
        env!("CARGO_PKG_VERSION")
    );

    info!("propolis starting up");

    let mut controller = match Controller::new(config).await {
        Ok(controller) => controller,
        Err(e) => {
            error!("failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    let controller_handle = tokio::spawn(async move {
        if let Err(e) = controller.run(shutdown_rx).await {
            error!("controller error: {}", e);
        }
    });

    info!("propolis is operational");

    shutdown_signal().await;
    info!("shutdown signal received, stopping honeypot...");

    if let Err(e) = shutdown_tx.send(()) {
        error!("failed to propagate shutdown: {}", e);
    }

    match tokio::time::timeout(tokio::time::Duration::from_secs(10), controller_handle).await {
        Ok(Ok(())) => info!("propolis shutdown completed"),
        Ok(Err(e)) => error!("controller task failed during shutdown: {}", e),
        Err(_) => warn!("shutdown timed out after 10 seconds, exiting"),
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
