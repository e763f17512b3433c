//! Process configuration from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use glasserp_observability::LogFormat;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value `{value}`: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES is enabled")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    /// External order-parsing service. `None` selects the built-in line parser.
    pub order_parser_url: Option<String>,
    pub zalo_send_url: String,
    pub zalo_access_token: Option<String>,
    pub conversation_ttl: Duration,
    pub history_limit: usize,
    pub staff_forward_delay: Duration,
    pub http_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            use_persistent_stores: false,
            database_url: None,
            redis_url: None,
            order_parser_url: None,
            zalo_send_url: glasserp_infra::external::DEFAULT_ZALO_SEND_URL.to_string(),
            zalo_access_token: None,
            conversation_ttl: Duration::from_secs(24 * 3600),
            history_limit: 200,
            staff_forward_delay: Duration::from_millis(100),
            http_timeout: glasserp_infra::external::DEFAULT_HTTP_TIMEOUT,
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            bind_addr: parse_or(&get, "BIND_ADDR", defaults.bind_addr)?,
            use_persistent_stores: parse_or(&get, "USE_PERSISTENT_STORES", false)?,
            database_url: get("DATABASE_URL"),
            redis_url: get("REDIS_URL"),
            order_parser_url: get("ORDER_PARSER_URL"),
            zalo_send_url: get("ZALO_SEND_URL").unwrap_or(defaults.zalo_send_url),
            zalo_access_token: get("ZALO_ACCESS_TOKEN"),
            conversation_ttl: Duration::from_secs(
                3600 * parse_or::<u64, _>(&get, "CONVERSATION_TTL_HOURS", 24)?,
            ),
            history_limit: parse_or(&get, "HISTORY_LIMIT", defaults.history_limit)?,
            staff_forward_delay: Duration::from_millis(parse_or(
                &get,
                "STAFF_FORWARD_DELAY_MS",
                100u64,
            )?),
            http_timeout: Duration::from_secs(parse_or(
                &get,
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
            log_format: parse_or(&get, "LOG_FORMAT", defaults.log_format)?,
        };

        if config.conversation_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                var: "CONVERSATION_TTL_HOURS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if config.history_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "HISTORY_LIMIT",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if config.use_persistent_stores {
            if config.database_url.is_none() {
                return Err(ConfigError::Missing("DATABASE_URL"));
            }
            if config.redis_url.is_none() {
                return Err(ConfigError::Missing("REDIS_URL"));
            }
        }
        Ok(config)
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert!(!c.use_persistent_stores);
        assert_eq!(c.conversation_ttl, Duration::from_secs(86_400));
        assert_eq!(c.history_limit, 200);
        assert_eq!(c.staff_forward_delay, Duration::from_millis(100));
        assert_eq!(c.http_timeout, Duration::from_secs(30));
        assert_eq!(c.log_format, LogFormat::Json);
        assert!(c.order_parser_url.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let c = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("CONVERSATION_TTL_HOURS", "2"),
            ("HISTORY_LIMIT", "50"),
            ("LOG_FORMAT", "pretty"),
            ("ORDER_PARSER_URL", "http://parser:8000/process_zalo_chat"),
            ("ZALO_ACCESS_TOKEN", "  "),
        ])
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.conversation_ttl, Duration::from_secs(7200));
        assert_eq!(c.history_limit, 50);
        assert_eq!(c.log_format, LogFormat::Pretty);
        assert!(c.order_parser_url.is_some());
        assert!(c.zalo_access_token.is_none());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = config(&[("HISTORY_LIMIT", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "HISTORY_LIMIT", .. }));
        assert!(config(&[("CONVERSATION_TTL_HOURS", "0")]).is_err());
    }

    #[test]
    fn persistent_mode_needs_both_urls() {
        assert_eq!(
            config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        assert_eq!(
            config(&[
                ("USE_PERSISTENT_STORES", "true"),
                ("DATABASE_URL", "postgres://localhost/glass"),
            ])
            .unwrap_err(),
            ConfigError::Missing("REDIS_URL")
        );
    }
}
