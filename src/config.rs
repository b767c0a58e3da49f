// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`AppConfig`] loaded from the environment once at startup. A `.env` file
//! in the working directory is honoured when present.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH0_DOMAIN` | Token issuer domain (JWKS and issuer derive from it) | Required |
//! | `AUTH0_AUDIENCE` | Expected JWT audience claim | Required |
//! | `DATABASE_URL` | Full PostgreSQL URL (overrides the parts below) | Optional |
//! | `DATABASE_HOST` | PostgreSQL host | `localhost` |
//! | `DATABASE_PORT` | PostgreSQL port | `5432` |
//! | `DATABASE_USERNAME` | PostgreSQL user | Required without `DATABASE_URL` |
//! | `DATABASE_PASSWORD` | PostgreSQL password | empty |
//! | `DATABASE_NAME` | PostgreSQL database | Required without `DATABASE_URL` |
//! | `DATABASE_MAX_CONNECTIONS` | Connection pool size | `10` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated allowed origins | `http://localhost:3000` |
//! | `JWKS_REFRESH_INTERVAL_SECS` | Background JWKS refresh period | `3600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

pub const AUTH0_DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const AUTH0_AUDIENCE_ENV: &str = "AUTH0_AUDIENCE";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const DATABASE_HOST_ENV: &str = "DATABASE_HOST";
pub const DATABASE_PORT_ENV: &str = "DATABASE_PORT";
pub const DATABASE_USERNAME_ENV: &str = "DATABASE_USERNAME";
pub const DATABASE_PASSWORD_ENV: &str = "DATABASE_PASSWORD";
pub const DATABASE_NAME_ENV: &str = "DATABASE_NAME";
pub const DATABASE_MAX_CONNECTIONS_ENV: &str = "DATABASE_MAX_CONNECTIONS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const JWKS_REFRESH_INTERVAL_ENV: &str = "JWKS_REFRESH_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_HOST: &str = "localhost";
const DEFAULT_DATABASE_PORT: u16 = 5432;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_JWKS_REFRESH_SECS: u64 = 3600;

/// Errors raised while reading configuration. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Token verification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// Bare issuer domain, e.g. `tenant.eu.auth0.com`.
    pub domain: String,
    /// Audience value that must appear in the token's `aud` claim.
    pub audience: String,
    /// Period of the background key-set refresh.
    pub jwks_refresh_interval: Duration,
}

impl AuthSettings {
    /// Issuer expected in the `iss` claim. The trailing slash is significant.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    /// Published key-set endpoint of the issuer.
    pub fn jwks_url(&self) -> Result<Url, ConfigError> {
        let raw = format!("https://{}/.well-known/jwks.json", self.domain);
        Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            name: AUTH0_DOMAIN_ENV,
            value: self.domain.clone(),
            reason: e.to_string(),
        })
    }
}

/// PostgreSQL settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub cors_allowed_origins: Vec<String>,
}

/// Complete process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub auth: AuthSettings,
    pub database: DatabaseSettings,
    pub server: ServerSettings,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let auth = AuthSettings {
            domain: get(AUTH0_DOMAIN_ENV)
                .map(|d| d.trim_end_matches('/').to_string())
                .ok_or(ConfigError::Missing(AUTH0_DOMAIN_ENV))?,
            audience: get(AUTH0_AUDIENCE_ENV).ok_or(ConfigError::Missing(AUTH0_AUDIENCE_ENV))?,
            jwks_refresh_interval: Duration::from_secs(parse_or(
                JWKS_REFRESH_INTERVAL_ENV,
                get(JWKS_REFRESH_INTERVAL_ENV),
                DEFAULT_JWKS_REFRESH_SECS,
            )?),
        };
        // Fail early on a domain that cannot form a URL.
        auth.jwks_url()?;

        let url = match get(DATABASE_URL_ENV) {
            Some(url) => url,
            None => {
                let host = get(DATABASE_HOST_ENV).unwrap_or_else(|| DEFAULT_DATABASE_HOST.to_string());
                let port: u16 = parse_or(DATABASE_PORT_ENV, get(DATABASE_PORT_ENV), DEFAULT_DATABASE_PORT)?;
                let username = get(DATABASE_USERNAME_ENV).ok_or(ConfigError::Missing(DATABASE_USERNAME_ENV))?;
                let password = get(DATABASE_PASSWORD_ENV).unwrap_or_default();
                let name = get(DATABASE_NAME_ENV).ok_or(ConfigError::Missing(DATABASE_NAME_ENV))?;
                postgres_url(&host, port, &username, &password, &name)?
            }
        };
        let database = DatabaseSettings {
            url,
            max_connections: parse_or(
                DATABASE_MAX_CONNECTIONS_ENV,
                get(DATABASE_MAX_CONNECTIONS_ENV),
                DEFAULT_MAX_CONNECTIONS,
            )?,
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_or(PORT_ENV, get(PORT_ENV), DEFAULT_PORT)?;
        let addr: SocketAddr = format!("{host}:{port}").parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                name: HOST_ENV,
                value: host.clone(),
                reason: e.to_string(),
            }
        })?;
        let cors_allowed_origins = get(CORS_ALLOWED_ORIGINS_ENV)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            auth,
            database,
            server: ServerSettings {
                addr,
                cors_allowed_origins,
            },
        })
    }

    /// Load from a fixed map. Handy in tests.
    pub fn from_map(vars: &HashMap<&str, &str>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Build a connection URL from parts, percent-encoding the credentials.
fn postgres_url(
    host: &str,
    port: u16,
    username: &str,
    password: &str,
    name: &str,
) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: DATABASE_HOST_ENV,
        value: host.to_string(),
        reason,
    };
    let mut url = Url::parse(&format!("postgres://{host}:{port}")).map_err(|e| invalid(e.to_string()))?;
    url.set_username(username)
        .map_err(|_| invalid("cannot carry credentials".to_string()))?;
    if !password.is_empty() {
        url.set_password(Some(password))
            .map_err(|_| invalid("cannot carry credentials".to_string()))?;
    }
    url.set_path(name);
    Ok(url.to_string())
}
