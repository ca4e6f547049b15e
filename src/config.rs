// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Missing
//! required values abort startup before the server binds.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SERVICE_ID` | This service's ID, sent as `X-Service-ID` | Required |
//! | `SERVICE_SECRET` | Shared secret for service-to-service calls | Required |
//! | `AUTH_SERVICE_URL` | Base URL of the authorization service | Required |
//! | `JWT_SECRET` | HS256 secret for local bearer-token validation | Optional (bearer path disabled) |
//! | `SERVICE_HOSTS` | Extra peers as `name=url,name=url` | Empty |
//! | `RATE_LIMIT_PER_MINUTE` | Per-client request ceiling | `60` |
//! | `MAX_BODY_BYTES` | Request body limit | `10485760` |
//! | `ALLOWED_ORIGINS` | CORS origins, comma separated | Empty (permissive) |
//! | `TRUSTED_IPS` | Allowed client IPs, comma separated | Empty (all) |
//! | `TRUSTED_PROXIES` | Proxy IPs whose `X-Forwarded-For` / `X-Real-IP` are honoured | Empty (none) |
//! | `API_KEY` | Static API key | Unset (disabled) |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::IpAddr;
use std::num::NonZeroU32;

use url::Url;

use crate::client::{ServiceCredentials, ServiceRoutes};

pub const SERVICE_ID_ENV: &str = "SERVICE_ID";
pub const SERVICE_SECRET_ENV: &str = "SERVICE_SECRET";
pub const AUTH_SERVICE_URL_ENV: &str = "AUTH_SERVICE_URL";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const SERVICE_HOSTS_ENV: &str = "SERVICE_HOSTS";
pub const RATE_LIMIT_ENV: &str = "RATE_LIMIT_PER_MINUTE";
pub const MAX_BODY_BYTES_ENV: &str = "MAX_BODY_BYTES";
pub const ALLOWED_ORIGINS_ENV: &str = "ALLOWED_ORIGINS";
pub const TRUSTED_IPS_ENV: &str = "TRUSTED_IPS";
pub const TRUSTED_PROXIES_ENV: &str = "TRUSTED_PROXIES";
pub const API_KEY_ENV: &str = "API_KEY";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Route-table name the authorization service is registered under.
pub const AUTH_SERVICE_NAME: &str = "auth";

pub const DEFAULT_RATE_LIMIT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(rpm) => rpm,
    None => unreachable!(),
};
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("{name} is not a valid URL: {reason}")]
    InvalidUrl { name: String, reason: String },

    #[error("{name} has an invalid value: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Validated service configuration.
#[derive(Clone)]
pub struct Config {
    pub service_id: String,
    pub service_secret: String,
    pub auth_service_url: Url,
    pub jwt_secret: Option<String>,
    pub service_hosts: Vec<(String, Url)>,
    pub rate_limit_per_minute: NonZeroU32,
    pub max_body_bytes: usize,
    pub allowed_origins: Vec<String>,
    pub trusted_ips: Vec<String>,
    pub trusted_proxies: Vec<IpAddr>,
    pub api_key: Option<String>,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("service_id", &self.service_id)
            .field("auth_service_url", &self.auth_service_url.as_str())
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("service_hosts", &self.service_hosts)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("allowed_origins", &self.allowed_origins)
            .field("trusted_ips", &self.trusted_ips)
            .field("trusted_proxies", &self.trusted_proxies)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let service_id = required(SERVICE_ID_ENV)?;
        let service_secret = required(SERVICE_SECRET_ENV)?;
        let auth_service_url = parse_url(AUTH_SERVICE_URL_ENV, &required(AUTH_SERVICE_URL_ENV)?)?;

        let service_hosts = match get(SERVICE_HOSTS_ENV) {
            Some(raw) => parse_service_hosts(&raw)?,
            None => Vec::new(),
        };

        let rate_limit_per_minute = parse_number(
            RATE_LIMIT_ENV,
            get(RATE_LIMIT_ENV),
            DEFAULT_RATE_LIMIT_PER_MINUTE,
        )?;

        let trusted_proxies = split_list(get(TRUSTED_PROXIES_ENV))
            .into_iter()
            .map(|raw| {
                raw.parse::<IpAddr>().map_err(|_| ConfigError::InvalidValue {
                    name: TRUSTED_PROXIES_ENV,
                    value: raw,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            service_id,
            service_secret,
            auth_service_url,
            jwt_secret: get(JWT_SECRET_ENV),
            service_hosts,
            rate_limit_per_minute,
            max_body_bytes: parse_number(
                MAX_BODY_BYTES_ENV,
                get(MAX_BODY_BYTES_ENV),
                DEFAULT_MAX_BODY_BYTES,
            )?,
            allowed_origins: split_list(get(ALLOWED_ORIGINS_ENV)),
            trusted_ips: split_list(get(TRUSTED_IPS_ENV)),
            trusted_proxies,
            api_key: get(API_KEY_ENV),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_number(PORT_ENV, get(PORT_ENV), DEFAULT_PORT)?,
            log_format: get(LOG_FORMAT_ENV)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        })
    }

    pub fn credentials(&self) -> ServiceCredentials {
        ServiceCredentials {
            service_id: self.service_id.clone(),
            service_secret: self.service_secret.clone(),
        }
    }

    /// Route table with `auth` plus every `SERVICE_HOSTS` entry.
    pub fn routes(&self) -> ServiceRoutes {
        self.service_hosts.iter().fold(
            ServiceRoutes::new().with_host(AUTH_SERVICE_NAME, self.auth_service_url.clone()),
            |routes, (name, url)| routes.with_host(name.clone(), url.clone()),
        )
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn parse_service_hosts(raw: &str) -> Result<Vec<(String, Url)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, url) = entry.split_once('=').ok_or(ConfigError::InvalidValue {
                name: SERVICE_HOSTS_ENV,
                value: entry.to_string(),
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: SERVICE_HOSTS_ENV,
                    value: entry.to_string(),
                });
            }
            let url = parse_url(&format!("{SERVICE_HOSTS_ENV}[{name}]"), url.trim())?;
            Ok((name.to_string(), url))
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVICE_ID", "orders-service"),
        ("SERVICE_SECRET", "peer-secret"),
        ("AUTH_SERVICE_URL", "http://auth.internal:8080"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.rate_limit_per_minute.get(), 60);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.jwt_secret.is_none());
        assert!(config.allowed_origins.is_empty());
        assert!(config.trusted_proxies.is_empty());
    }

    #[test]
    fn each_required_variable_is_enforced() {
        for (missing, _) in REQUIRED {
            let vars: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = load(&vars).unwrap_err();
            assert!(matches!(err, ConfigError::Missing(name) if name == missing));
        }
    }

    #[test]
    fn blank_required_variable_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[1] = ("SERVICE_SECRET", "  ");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("SERVICE_SECRET"));
    }

    #[test]
    fn invalid_auth_url_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = ("AUTH_SERVICE_URL", "not a url");
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidUrl { .. }
        ));
    }

    #[test]
    fn routes_include_auth_and_extra_hosts() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SERVICE_HOSTS", "orders=http://orders:9000, billing=http://billing:9001"));
        let config = load(&vars).unwrap();

        let routes = config.routes();
        assert_eq!(
            routes.resolve("/api/v1/auth/access").unwrap().as_str(),
            "http://auth.internal:8080/api/v1/auth/access"
        );
        assert_eq!(
            routes.resolve("/api/v1/billing/invoices").unwrap().as_str(),
            "http://billing:9001/api/v1/billing/invoices"
        );
    }

    #[test]
    fn malformed_service_hosts_entry_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SERVICE_HOSTS", "orders"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidValue { name: "SERVICE_HOSTS", .. }
        ));
    }

    #[test]
    fn optional_values_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("JWT_SECRET", "jwt"),
            ("RATE_LIMIT_PER_MINUTE", "120"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("TRUSTED_IPS", "10.0.0.1"),
            ("TRUSTED_PROXIES", "10.0.0.5, ::1"),
            ("PORT", "9090"),
            ("LOG_FORMAT", "JSON"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.jwt_secret.as_deref(), Some("jwt"));
        assert_eq!(config.rate_limit_per_minute.get(), 120);
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.trusted_ips, vec!["10.0.0.1".to_string()]);
        assert_eq!(
            config.trusted_proxies,
            vec!["10.0.0.5".parse::<IpAddr>().unwrap(), "::1".parse().unwrap()]
        );
        assert_eq!(config.port, 9090);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn bad_number_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "eighty"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidValue { name: "PORT", .. }
        ));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("RATE_LIMIT_PER_MINUTE", "0"));
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidValue {
                name: "RATE_LIMIT_PER_MINUTE",
                value: "0".into()
            }
        );
    }

    #[test]
    fn trusted_proxy_must_be_an_ip() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("TRUSTED_PROXIES", "lb.internal"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidValue { name: "TRUSTED_PROXIES", .. }
        ));
    }

    #[test]
    fn debug_hides_secrets() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("JWT_SECRET", "jwt-very-secret"));
        let debug = format!("{:?}", load(&vars).unwrap());
        assert!(!debug.contains("peer-secret"));
        assert!(!debug.contains("jwt-very-secret"));
    }
}
