//! Fail-fast environment-variable configuration loading.
//!
//! Every variable is read exactly once, here, at startup. Nothing downstream touches
//! `std::env` directly.

use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { name, reason: reason.into() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_base_url: Url,
    pub server_addr: SocketAddr,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub authorization_servers: Vec<String>,
    pub audience: String,
    pub jwks_cache_ttl: Duration,
    pub clock_skew: Duration,
    pub session_ttl: Duration,
    pub rust_log: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_base_url = required_url("SERVER_BASE_URL")?;
        if server_base_url.scheme() == "http" {
            let host_is_local = matches!(server_base_url.host_str(), Some("localhost" | "127.0.0.1"));
            if !host_is_local {
                return Err(invalid(
                    "SERVER_BASE_URL",
                    "http is only permitted when host is localhost or 127.0.0.1; use https",
                ));
            }
        } else if server_base_url.scheme() != "https" {
            return Err(invalid("SERVER_BASE_URL", "scheme must be http or https"));
        }

        let server_addr = parse_addr(
            env_or_default("SERVER_ADDR", ":8080"),
            "SERVER_ADDR",
        )?;

        let read_timeout = positive_duration_secs("SERVER_READ_TIMEOUT", 30)?;
        let write_timeout = positive_duration_secs("SERVER_WRITE_TIMEOUT", 30)?;
        let idle_timeout = non_negative_duration_secs("SERVER_IDLE_TIMEOUT", 120)?;

        let authorization_servers = required_nonempty_csv("OAUTH_AUTHORIZATION_SERVERS")?;
        let audience = required_url("OAUTH_AUDIENCE")?.to_string();
        let jwks_cache_ttl = positive_duration_secs("OAUTH_JWKS_CACHE_TTL", 300)?;
        let clock_skew = positive_duration_secs("OAUTH_CLOCK_SKEW", 60)?;
        let session_ttl = positive_duration_secs("MCP_SESSION_TTL", 3600)?;

        let rust_log = env_or_default("RUST_LOG", "info");
        let log_format = match env_or_default("LOG_FORMAT", "pretty").as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(invalid("LOG_FORMAT", format!("must be pretty or json, got {other}")));
            }
        };

        Ok(Self {
            server_base_url,
            server_addr,
            read_timeout,
            write_timeout,
            idle_timeout,
            authorization_servers,
            audience,
            jwks_cache_ttl,
            clock_skew,
            session_ttl,
            rust_log,
            log_format,
        })
    }

    /// The canonical resource URI advertised in protected-resource metadata: the base URL
    /// without a trailing slash.
    #[must_use]
    pub fn resource_uri(&self) -> String {
        self.server_base_url.as_str().trim_end_matches('/').to_string()
    }

    #[must_use]
    pub fn protected_resource_metadata_url(&self) -> String {
        format!("{}/.well-known/oauth-protected-resource", self.resource_uri())
    }
}

fn env_or_default(name: &'static str, default: &str) -> String {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn required_url(name: &'static str) -> Result<Url, ConfigError> {
    let raw = std::env::var(name).ok().filter(|s| !s.trim().is_empty()).ok_or(ConfigError::Missing(name))?;
    Url::parse(raw.trim()).map_err(|err| invalid(name, err.to_string()))
}

fn required_nonempty_csv(name: &'static str) -> Result<Vec<String>, ConfigError> {
    let raw = std::env::var(name).ok().filter(|s| !s.trim().is_empty()).ok_or(ConfigError::Missing(name))?;
    let items: Vec<String> = raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();
    if items.is_empty() {
        return Err(invalid(name, "must contain at least one value"));
    }
    Ok(items)
}

fn positive_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let secs = parsed_u64_or_default(name, default_secs)?;
    if secs == 0 {
        return Err(invalid(name, "must be a positive number of seconds"));
    }
    Ok(Duration::from_secs(secs))
}

fn non_negative_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(parsed_u64_or_default(name, default_secs)?))
}

fn parsed_u64_or_default(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name).ok().filter(|s| !s.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<u64>().map_err(|err| invalid(name, err.to_string())),
    }
}

fn parse_addr(raw: String, name: &'static str) -> Result<SocketAddr, ConfigError> {
    let raw = if let Some(port) = raw.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        raw
    };
    raw.parse::<SocketAddr>().map_err(|err| invalid(name, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const REQUIRED: &[(&str, &str)] = &[
        ("SERVER_BASE_URL", "https://rs.example.com"),
        ("OAUTH_AUTHORIZATION_SERVERS", "https://as.example.com"),
        ("OAUTH_AUDIENCE", "https://rs.example.com"),
    ];

    fn with_env<T>(overrides: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap();
        let all_names: Vec<&str> = REQUIRED
            .iter()
            .map(|(k, _)| *k)
            .chain(overrides.iter().map(|(k, _)| *k))
            .chain([
                "SERVER_ADDR",
                "SERVER_READ_TIMEOUT",
                "SERVER_WRITE_TIMEOUT",
                "SERVER_IDLE_TIMEOUT",
                "OAUTH_JWKS_CACHE_TTL",
                "OAUTH_CLOCK_SKEW",
                "MCP_SESSION_TTL",
                "RUST_LOG",
                "LOG_FORMAT",
            ])
            .collect();
        for name in &all_names {
            unsafe { std::env::remove_var(name) };
        }
        for (k, v) in REQUIRED {
            unsafe { std::env::set_var(k, v) };
        }
        for (k, v) in overrides {
            unsafe { std::env::set_var(k, v) };
        }
        let result = f();
        for name in &all_names {
            unsafe { std::env::remove_var(name) };
        }
        result
    }

    #[test]
    fn missing_required_var_fails() {
        with_env(&[], || {
            unsafe { std::env::remove_var("SERVER_BASE_URL") };
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::Missing("SERVER_BASE_URL")));
        });
    }

    #[test]
    fn defaults_are_applied() {
        with_env(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.server_addr.port(), 8080);
            assert_eq!(config.read_timeout, Duration::from_secs(30));
            assert_eq!(config.log_format, LogFormat::Pretty);
        });
    }

    #[test]
    fn http_base_url_rejected_for_non_local_host() {
        with_env(&[("SERVER_BASE_URL", "http://rs.example.com")], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { name: "SERVER_BASE_URL", .. }));
        });
    }

    #[test]
    fn http_base_url_allowed_for_localhost() {
        with_env(&[("SERVER_BASE_URL", "http://localhost:8080")], || {
            assert!(Config::from_env().is_ok());
        });
    }

    #[test]
    fn zero_timeout_is_rejected() {
        with_env(&[("SERVER_READ_TIMEOUT", "0")], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { name: "SERVER_READ_TIMEOUT", .. }));
        });
    }

    #[test]
    fn authorization_servers_are_split_and_trimmed() {
        with_env(
            &[("OAUTH_AUTHORIZATION_SERVERS", " https://a.example.com , https://b.example.com ")],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(
                    config.authorization_servers,
                    vec!["https://a.example.com".to_string(), "https://b.example.com".to_string()]
                );
            },
        );
    }

    #[test]
    fn resource_uri_strips_trailing_slash() {
        with_env(&[("SERVER_BASE_URL", "https://rs.example.com/")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.resource_uri(), "https://rs.example.com");
        });
    }
}
