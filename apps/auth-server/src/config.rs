// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup into an
//! [`AppConfig`]. Nothing reads the environment after that.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the user database | `./data` |
//! | `CAS_BASE_URL` | Campus SSO portal | `https://sso-portal.isep.fr` |
//! | `CAS_TIMEOUT_SECS` | Timeout for each request to the SSO portal | `10` |
//! | `JWT_SECRET` | HS256 signing secret (at least 32 bytes) | Required |
//! | `JWT_ISSUER` | `iss` claim of issued tokens | `moveit-api` |
//! | `TOKEN_VALIDITY_SECS` | Default session token lifetime | `3600` |
//! | `TOKEN_REMEMBER_ME_VALIDITY_SECS` | Lifetime when "remember me" is set | `2592000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// The user database (`users.redb`) is created inside this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const CAS_BASE_URL_ENV: &str = "CAS_BASE_URL";
pub const CAS_TIMEOUT_ENV: &str = "CAS_TIMEOUT_SECS";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const TOKEN_VALIDITY_ENV: &str = "TOKEN_VALIDITY_SECS";
pub const TOKEN_REMEMBER_ME_VALIDITY_ENV: &str = "TOKEN_REMEMBER_ME_VALIDITY_SECS";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_CAS_BASE_URL: &str = "https://sso-portal.isep.fr";
pub const DEFAULT_CAS_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_JWT_ISSUER: &str = "moveit-api";
pub const DEFAULT_TOKEN_VALIDITY_SECS: u64 = 60 * 60;
pub const DEFAULT_TOKEN_REMEMBER_ME_VALIDITY_SECS: u64 = 30 * 24 * 60 * 60;

/// Shortest accepted HS256 secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Name of the database file inside `DATA_DIR`.
pub const USER_DB_FILE: &str = "users.redb";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings for the campus SSO delegate.
#[derive(Debug, Clone)]
pub struct CasConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

/// Settings for the session token issuer.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub validity: Duration,
    pub remember_me_validity: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub cas: CasConfig,
    pub token: TokenConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        let raw_url = get(CAS_BASE_URL_ENV).unwrap_or_else(|| DEFAULT_CAS_BASE_URL.to_string());
        let base_url = Url::parse(&raw_url).map_err(|e| ConfigError::Invalid {
            name: CAS_BASE_URL_ENV,
            reason: e.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                name: CAS_BASE_URL_ENV,
                reason: format!("unsupported scheme `{}`", base_url.scheme()),
            });
        }

        let cas_timeout = parse_or(get(CAS_TIMEOUT_ENV), CAS_TIMEOUT_ENV, DEFAULT_CAS_TIMEOUT_SECS)?;
        if cas_timeout == 0 {
            return Err(ConfigError::Invalid {
                name: CAS_TIMEOUT_ENV,
                reason: "must be greater than zero".to_string(),
            });
        }

        let secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: JWT_SECRET_ENV,
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }

        let issuer = get(JWT_ISSUER_ENV).unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string());
        let validity = parse_or(get(TOKEN_VALIDITY_ENV), TOKEN_VALIDITY_ENV, DEFAULT_TOKEN_VALIDITY_SECS)?;
        let remember_me_validity = parse_or(
            get(TOKEN_REMEMBER_ME_VALIDITY_ENV),
            TOKEN_REMEMBER_ME_VALIDITY_ENV,
            DEFAULT_TOKEN_REMEMBER_ME_VALIDITY_SECS,
        )?;

        if validity == 0 {
            return Err(ConfigError::Invalid {
                name: TOKEN_VALIDITY_ENV,
                reason: "must be greater than zero".to_string(),
            });
        }
        // Remember-me tokens must outlive regular ones.
        if remember_me_validity <= validity {
            return Err(ConfigError::Invalid {
                name: TOKEN_REMEMBER_ME_VALIDITY_ENV,
                reason: format!("must be longer than {TOKEN_VALIDITY_ENV} ({validity}s)"),
            });
        }

        Ok(Self {
            host,
            port,
            data_dir,
            log_format,
            cas: CasConfig {
                base_url,
                timeout: Duration::from_secs(cas_timeout),
            },
            token: TokenConfig {
                secret,
                issuer,
                validity: Duration::from_secs(validity),
                remember_me_validity: Duration::from_secs(remember_me_validity),
            },
        })
    }

    /// Full path of the user database file.
    pub fn user_db_path(&self) -> PathBuf {
        self.data_dir.join(USER_DB_FILE)
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
