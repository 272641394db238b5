// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, default values, and [`AppConfig`], which is
//! loaded once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `bankcards.redb` | `./data` |
//! | `JWT_SECRET` | Token signing secret (base64) | Required |
//! | `JWT_EXPIRATION_MINUTES` | Token lifetime | `60` |
//! | `JWT_ALLOW_INSECURE_SECRET` | Accept a non-base64 secret as raw bytes | `false` |
//! | `CARD_ENCRYPTION_SECRET` | Card-number encryption secret | Required |
//! | `CARD_ENCRYPTION_SALT` | Card-number key derivation salt | Required |
//! | `ADMIN_USERNAME` / `ADMIN_PASSWORD` / `ADMIN_EMAIL` | Bootstrap admin account | Unset |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; serve HTTPS when both are set | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// # Default
/// `./data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "bankcards.redb";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRATION_MINUTES_ENV: &str = "JWT_EXPIRATION_MINUTES";

/// Accept a JWT secret that is not base64 and use its bytes directly.
///
/// Intended for local development only.
pub const JWT_ALLOW_INSECURE_SECRET_ENV: &str = "JWT_ALLOW_INSECURE_SECRET";

pub const CARD_ENCRYPTION_SECRET_ENV: &str = "CARD_ENCRYPTION_SECRET";
pub const CARD_ENCRYPTION_SALT_ENV: &str = "CARD_ENCRYPTION_SALT";

pub const ADMIN_USERNAME_ENV: &str = "ADMIN_USERNAME";
pub const ADMIN_PASSWORD_ENV: &str = "ADMIN_PASSWORD";
pub const ADMIN_EMAIL_ENV: &str = "ADMIN_EMAIL";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_JWT_EXPIRATION_MINUTES: i64 = 60;
/// Longest accepted token lifetime (one week).
pub const MAX_JWT_EXPIRATION_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Credentials of the administrator created at startup.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_expiration_minutes: i64,
    pub jwt_allow_insecure_secret: bool,
    pub card_encryption_secret: String,
    pub card_encryption_salt: String,
    pub admin: Option<AdminBootstrap>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .field("jwt_allow_insecure_secret", &self.jwt_allow_insecure_secret)
            .field("admin", &self.admin)
            .field("tls", &self.tls)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
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
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port = match get(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("{raw:?} is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let jwt_expiration_minutes = match get(JWT_EXPIRATION_MINUTES_ENV) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(minutes) if (1..=MAX_JWT_EXPIRATION_MINUTES).contains(&minutes) => minutes,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: JWT_EXPIRATION_MINUTES_ENV,
                        reason: format!(
                            "{raw:?} is not a number of minutes between 1 and {MAX_JWT_EXPIRATION_MINUTES}"
                        ),
                    })
                }
            },
            None => DEFAULT_JWT_EXPIRATION_MINUTES,
        };

        let jwt_allow_insecure_secret = match get(JWT_ALLOW_INSECURE_SECRET_ENV) {
            Some(raw) => parse_bool(JWT_ALLOW_INSECURE_SECRET_ENV, &raw)?,
            None => false,
        };

        let admin = match (get(ADMIN_USERNAME_ENV), get(ADMIN_PASSWORD_ENV), get(ADMIN_EMAIL_ENV)) {
            (Some(username), Some(password), Some(email)) => Some(AdminBootstrap {
                username,
                password,
                email,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: ADMIN_USERNAME_ENV,
                    reason: format!(
                        "{ADMIN_USERNAME_ENV}, {ADMIN_PASSWORD_ENV} and {ADMIN_EMAIL_ENV} must be set together"
                    ),
                })
            }
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: format!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together"),
                })
            }
        };

        let log_format = match get(LOG_FORMAT_ENV).map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "pretty" => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("{other:?} is neither \"json\" nor \"pretty\""),
                })
            }
            None => LogFormat::Pretty,
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            jwt_secret: required(JWT_SECRET_ENV)?,
            jwt_expiration_minutes,
            jwt_allow_insecure_secret,
            card_encryption_secret: required(CARD_ENCRYPTION_SECRET_ENV)?,
            card_encryption_salt: required(CARD_ENCRYPTION_SALT_ENV)?,
            admin,
            tls,
            log_format,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::minutes(self.jwt_expiration_minutes)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                reason: format!("{:?} is not a valid bind address", self.host),
            })
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            reason: format!("{raw:?} is not a boolean"),
        }),
    }
}
