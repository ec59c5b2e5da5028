use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::recruitment::ids::MAX_NODE_ID;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let node_id = env::var("APP_NODE_ID")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<u16>()
            .ok()
            .filter(|id| *id <= MAX_NODE_ID)
            .ok_or(ConfigError::InvalidNodeId)?;

        let notification_queue = env::var("APP_NOTIFICATION_QUEUE")
            .unwrap_or_else(|_| "256".to_string())
            .parse::<usize>()
            .ok()
            .filter(|capacity| *capacity > 0)
            .ok_or(ConfigError::InvalidQueueCapacity)?;

        let transition_retries = env::var("APP_TRANSITION_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u8>()
            .ok()
            .filter(|retries| *retries > 0)
            .ok_or(ConfigError::InvalidRetryLimit)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline: PipelineConfig {
                node_id,
                notification_queue,
                transition_retries,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the recruitment process orchestrator and its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Snowflake node id, unique per running instance.
    pub node_id: u16,
    /// Capacity of the stage notification queue; overflow is dropped.
    pub notification_queue: usize,
    /// Attempts per transition when a concurrent writer bumps the record version.
    pub transition_retries: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            notification_queue: 256,
            transition_retries: 3,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNodeId,
    InvalidQueueCapacity,
    InvalidRetryLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNodeId => {
                write!(f, "APP_NODE_ID must be an integer between 0 and {MAX_NODE_ID}")
            }
            ConfigError::InvalidQueueCapacity => {
                write!(f, "APP_NOTIFICATION_QUEUE must be a positive integer")
            }
            ConfigError::InvalidRetryLimit => {
                write!(f, "APP_TRANSITION_RETRIES must be between 1 and 255")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNodeId
            | ConfigError::InvalidQueueCapacity
            | ConfigError::InvalidRetryLimit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_NODE_ID");
        env::remove_var("APP_NOTIFICATION_QUEUE");
        env::remove_var("APP_TRANSITION_RETRIES");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.pipeline.node_id, 0);
        assert_eq!(config.pipeline.notification_queue, 256);
        assert_eq!(config.pipeline.transition_retries, 3);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_node_id_outside_snowflake_range() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_NODE_ID", "1024");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(result, Err(ConfigError::InvalidNodeId)));
    }

    #[test]
    fn rejects_zero_capacity_queue_and_zero_retries() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_NOTIFICATION_QUEUE", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidQueueCapacity)
        ));

        reset_env();
        env::set_var("APP_TRANSITION_RETRIES", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidRetryLimit)
        ));
        reset_env();
    }

    #[test]
    fn production_aliases_are_recognised() {
        assert_eq!(AppEnvironment::from_str(" PROD "), AppEnvironment::Production);
        assert_eq!(AppEnvironment::from_str("ci"), AppEnvironment::Test);
        assert_eq!(AppEnvironment::from_str("staging"), AppEnvironment::Development);
    }
}
