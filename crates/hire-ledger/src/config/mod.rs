use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::placement::{GuaranteePolicy, SafetyThresholds, MAX_GUARANTEE_DAYS};

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
    pub placement: PlacementConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            placement: PlacementConfig::from_env()?,
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

/// Guarantee defaults and safety tier thresholds for the placement lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementConfig {
    pub default_guarantee_days: u32,
    pub at_risk_days: u32,
    pub critical_days: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        let thresholds = SafetyThresholds::default();
        Self {
            default_guarantee_days: GuaranteePolicy::default().default_guarantee_days,
            at_risk_days: thresholds.at_risk_days,
            critical_days: thresholds.critical_days,
        }
    }
}

impl PlacementConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            default_guarantee_days: read_days(
                "PLACEMENT_GUARANTEE_DAYS",
                defaults.default_guarantee_days,
            )?,
            at_risk_days: read_days("PLACEMENT_AT_RISK_DAYS", defaults.at_risk_days)?,
            critical_days: read_days("PLACEMENT_CRITICAL_DAYS", defaults.critical_days)?,
        };

        if config.default_guarantee_days > MAX_GUARANTEE_DAYS {
            return Err(ConfigError::GuaranteeTooLong {
                days: config.default_guarantee_days,
                max: MAX_GUARANTEE_DAYS,
            });
        }

        if config.critical_days > config.at_risk_days {
            return Err(ConfigError::InvalidThresholds {
                critical: config.critical_days,
                at_risk: config.at_risk_days,
            });
        }

        Ok(config)
    }

    pub fn guarantee_policy(&self) -> GuaranteePolicy {
        GuaranteePolicy {
            default_guarantee_days: self.default_guarantee_days,
            thresholds: SafetyThresholds {
                at_risk_days: self.at_risk_days,
                critical_days: self.critical_days,
            },
        }
    }
}

fn read_days(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidDays { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDays { key: &'static str },
    InvalidThresholds { critical: u32, at_risk: u32 },
    GuaranteeTooLong { days: u32, max: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDays { key } => {
                write!(f, "{key} must be a non-negative whole number of days")
            }
            ConfigError::InvalidThresholds { critical, at_risk } => write!(
                f,
                "critical threshold ({critical} days) cannot exceed at-risk threshold ({at_risk} days)"
            ),
            ConfigError::GuaranteeTooLong { days, max } => write!(
                f,
                "PLACEMENT_GUARANTEE_DAYS ({days}) cannot exceed {max} days"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDays { .. }
            | ConfigError::InvalidThresholds { .. }
            | ConfigError::GuaranteeTooLong { .. } => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PLACEMENT_GUARANTEE_DAYS",
            "PLACEMENT_AT_RISK_DAYS",
            "PLACEMENT_CRITICAL_DAYS",
        ] {
            env::remove_var(key);
        }
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
        assert_eq!(config.placement.default_guarantee_days, 90);
        assert_eq!(config.placement.at_risk_days, 30);
        assert_eq!(config.placement.critical_days, 7);
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
    fn reads_guarantee_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PLACEMENT_GUARANTEE_DAYS", "60");
        env::set_var("PLACEMENT_AT_RISK_DAYS", "21");
        let config = AppConfig::load().expect("config loads");
        let policy = config.placement.guarantee_policy();
        assert_eq!(policy.default_guarantee_days, 60);
        assert_eq!(policy.thresholds.at_risk_days, 21);
        assert_eq!(policy.thresholds.critical_days, 7);
        reset_env();
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PLACEMENT_AT_RISK_DAYS", "5");
        env::set_var("PLACEMENT_CRITICAL_DAYS", "10");
        match AppConfig::load() {
            Err(ConfigError::InvalidThresholds { critical, at_risk }) => {
                assert_eq!((critical, at_risk), (10, 5));
            }
            other => panic!("expected threshold error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_days() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PLACEMENT_GUARANTEE_DAYS", "ninety");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidDays {
                key: "PLACEMENT_GUARANTEE_DAYS"
            })
        ));
        reset_env();
    }

    #[test]
    fn rejects_guarantee_beyond_limit() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PLACEMENT_GUARANTEE_DAYS", u32::MAX.to_string());
        match AppConfig::load() {
            Err(ConfigError::GuaranteeTooLong { days, max }) => {
                assert_eq!(days, u32::MAX);
                assert_eq!(max, MAX_GUARANTEE_DAYS);
            }
            other => panic!("expected guarantee limit error, got {other:?}"),
        }
        reset_env();
    }
}
