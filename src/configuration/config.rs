use super::types::LogLevel;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::error_handling::types::ConfigError;

/// Runtime configuration for the honeypot.
///
/// Every field is settable from the command line or from the environment.
/// The defaults are chosen so that a bare `propolis` invocation comes up
/// listening on the impersonated gateway's stock port with a local SQLite
/// file next to the binary.
///
/// # Fields Overview
///
/// - `port` / `bind_address`: the single TCP listener multiplexing HTTP and
///   WebSocket traffic
/// - `database_url`: SQLite DSN for the evidence store
/// - `log_level`, `log_to_file`, `log_path`: logging backend selection
/// - `fake_version`: product version reported in health/hello payloads
/// - `fake_gateway_token`: the decoy gateway token some canned responses echo
/// - `alert_webhook_url`, `geoip_database_path`: hand-off points for the
///   optional enrichment/alerting collaborators; parsed and logged, consumed
///   elsewhere
#[derive(Parser, Debug, Clone)]
#[command(name = "propolis")]
#[command(about = "High-interaction honeypot impersonating the OpenClaw assistant gateway")]
pub struct Config {
    /// TCP port for the combined HTTP/WebSocket listener
    #[arg(long, env = "PORT", default_value_t = 18789)]
    pub port: u16,

    /// Address to bind the listener to
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// SQLite DSN for the evidence store
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://propolis.sqlite3?mode=rwc")]
    pub database_url: String,

    /// Log verbosity
    #[arg(long, env = "LOG_LEVEL", value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Mirror logs to a file instead of stderr
    #[arg(long, action = clap::ArgAction::SetTrue, env = "LOG_TO_FILE")]
    pub log_to_file: bool,

    /// Log file location, used when `log_to_file` is set
    #[arg(long, env = "LOG_PATH", default_value = "propolis.log")]
    pub log_path: PathBuf,

    /// Product version advertised in health and hello payloads
    #[arg(long, env = "FAKE_VERSION", default_value = "2026.1.14")]
    pub fake_version: String,

    /// Decoy gateway token echoed by config-surface methods
    #[arg(long, env = "FAKE_GATEWAY_TOKEN", default_value = "oc_gw_3f9a1d7be2c84405")]
    pub fake_gateway_token: String,

    /// Optional webhook to notify on high-severity hits (external collaborator)
    #[arg(long, env = "ALERT_WEBHOOK_URL")]
    pub alert_webhook_url: Option<String>,

    /// Optional MaxMind database path for GeoIP enrichment (external collaborator)
    #[arg(long, env = "GEOIP_DATABASE_PATH")]
    pub geoip_database_path: Option<PathBuf>,
}

impl Config {
    pub fn from_args() -> Self {
        Config::parse()
    }

    /// Resolve the listener socket address from `bind_address` and `port`.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> Config {
        Config::try_parse_from(args.iter().copied()).expect("config should parse")
    }

    #[test]
    fn test_defaults() {
        let config = parse_from(&["propolis"]);
        assert_eq!(config.port, 18789);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.log_to_file);
        assert!(config.alert_webhook_url.is_none());
    }

    #[test]
    fn test_listen_addr() {
        let config = parse_from(&["propolis", "--bind-address", "127.0.0.1", "--port", "9000"]);
        let addr = config.listen_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_bind_address() {
        let config = parse_from(&["propolis", "--bind-address", "not-an-ip"]);
        assert!(config.listen_addr().is_err());
    }
}
