// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once from the environment at startup and is
//! immutable afterwards. The session key and issuer domain are handed to
//! constructors from here; nothing reads the environment later.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SESSION_KEY` | HMAC secret for session cookies (at least 32 bytes) | Required |
//! | `AUTH0_DOMAIN` | Auth0 tenant domain, e.g. `tenant.eu.auth0.com` | Required |
//! | `AUTH0_AUDIENCE` | Expected JWT audience claim | Not checked |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWKS_TIMEOUT_SECONDS` | Timeout for the outbound JWKS fetch | `10` |
//! | `JWKS_CACHE_TTL_SECONDS` | Enables the JWKS cache with this TTL | No cache |
//! | `JWT_LEEWAY_SECONDS` | Clock skew tolerance for `exp`/`nbf` | `0` |
//! | `SESSION_MAX_AGE_SECONDS` | Session cookie lifetime, at most 400 days | `2592000` (30 days) |
//! | `COOKIE_SECURE` | Adds the `Secure` cookie attribute | `true` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,panic_button_api=debug,tower_http=debug` |

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::auth::session::MIN_SESSION_KEY_BYTES;

pub const SESSION_KEY_ENV: &str = "SESSION_KEY";
pub const AUTH0_DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const AUTH0_AUDIENCE_ENV: &str = "AUTH0_AUDIENCE";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWKS_TIMEOUT_ENV: &str = "JWKS_TIMEOUT_SECONDS";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECONDS";
pub const JWT_LEEWAY_ENV: &str = "JWT_LEEWAY_SECONDS";
pub const SESSION_MAX_AGE_ENV: &str = "SESSION_MAX_AGE_SECONDS";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";

/// Environment variable for the logging format. Read by `main` before the
/// rest of the configuration so that config errors are logged properly.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWKS_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_JWT_LEEWAY_SECONDS: u64 = 0;
pub const DEFAULT_SESSION_MAX_AGE_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Upper bound on `JWT_LEEWAY_SECONDS`. Larger values defeat expiry checks.
pub const MAX_JWT_LEEWAY_SECONDS: u64 = 600;

/// Upper bound on `SESSION_MAX_AGE_SECONDS`. Browsers clamp `Max-Age` to 400 days.
pub const MAX_SESSION_MAX_AGE_SECONDS: u64 = 400 * 24 * 60 * 60;

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,panic_button_api=debug,tower_http=debug";

/// Service configuration.
///
/// The session key is redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// `host:port` to listen on.
    pub bind_address: String,

    /// Auth0 tenant domain. The JWKS lives at `https://{domain}/.well-known/jwks.json`.
    pub auth0_domain: String,

    /// When set, tokens must carry this `aud`.
    pub auth0_audience: Option<String>,

    pub jwks_timeout: Duration,

    /// `None` disables the JWKS cache; every sign-in fetches fresh keys.
    pub jwks_cache_ttl: Option<Duration>,

    pub jwt_leeway_seconds: u64,

    /// HMAC-SHA256 key for session cookies.
    pub session_key: Vec<u8>,

    pub session_max_age: Duration,

    pub cookie_secure: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("auth0_domain", &self.auth0_domain)
            .field("auth0_audience", &self.auth0_audience)
            .field("jwks_timeout", &self.jwks_timeout)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("jwt_leeway_seconds", &self.jwt_leeway_seconds)
            .field("session_key", &"[REDACTED]")
            .field("session_max_age", &self.session_max_age)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ConfigError {
    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars = env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from a map of variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let session_key = required(vars, SESSION_KEY_ENV)?.as_bytes().to_vec();
        if session_key.len() < MIN_SESSION_KEY_BYTES {
            return Err(ConfigError::invalid(
                SESSION_KEY_ENV,
                format!(
                    "must be at least {MIN_SESSION_KEY_BYTES} bytes, got {}",
                    session_key.len()
                ),
            ));
        }

        let auth0_domain = required(vars, AUTH0_DOMAIN_ENV)?.trim().to_string();
        if auth0_domain.contains("://") || auth0_domain.contains('/') {
            return Err(ConfigError::invalid(
                AUTH0_DOMAIN_ENV,
                "must be a bare host name without scheme or path",
            ));
        }

        let auth0_audience = vars
            .get(AUTH0_AUDIENCE_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let host = vars
            .get(HOST_ENV)
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_or(vars, PORT_ENV, DEFAULT_PORT)?;

        let jwks_timeout_seconds: u64 =
            parse_or(vars, JWKS_TIMEOUT_ENV, DEFAULT_JWKS_TIMEOUT_SECONDS)?;
        if jwks_timeout_seconds == 0 {
            return Err(ConfigError::invalid(JWKS_TIMEOUT_ENV, "must be greater than 0"));
        }

        let jwks_cache_ttl = match parse_optional::<u64>(vars, JWKS_CACHE_TTL_ENV)? {
            Some(0) => {
                return Err(ConfigError::invalid(
                    JWKS_CACHE_TTL_ENV,
                    "must be greater than 0 (unset it to disable caching)",
                ))
            }
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => None,
        };

        let jwt_leeway_seconds: u64 = parse_or(vars, JWT_LEEWAY_ENV, DEFAULT_JWT_LEEWAY_SECONDS)?;
        if jwt_leeway_seconds > MAX_JWT_LEEWAY_SECONDS {
            return Err(ConfigError::invalid(
                JWT_LEEWAY_ENV,
                format!("must not exceed {MAX_JWT_LEEWAY_SECONDS} seconds, got {jwt_leeway_seconds}"),
            ));
        }

        let session_max_age_seconds: u64 =
            parse_or(vars, SESSION_MAX_AGE_ENV, DEFAULT_SESSION_MAX_AGE_SECONDS)?;
        if session_max_age_seconds == 0 {
            return Err(ConfigError::invalid(SESSION_MAX_AGE_ENV, "must be greater than 0"));
        }
        if session_max_age_seconds > MAX_SESSION_MAX_AGE_SECONDS {
            return Err(ConfigError::invalid(
                SESSION_MAX_AGE_ENV,
                format!(
                    "must not exceed {MAX_SESSION_MAX_AGE_SECONDS} seconds, got {session_max_age_seconds}"
                ),
            ));
        }

        let cookie_secure: bool = parse_or(vars, COOKIE_SECURE_ENV, true)?;

        Ok(Config {
            bind_address: format!("{host}:{port}"),
            auth0_domain,
            auth0_audience,
            jwks_timeout: Duration::from_secs(jwks_timeout_seconds),
            jwks_cache_ttl,
            jwt_leeway_seconds,
            session_key,
            session_max_age: Duration::from_secs(session_max_age_seconds),
            cookie_secure,
        })
    }
}

fn required<'a>(vars: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ConfigError> {
    vars.get(name)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_optional<T>(vars: &HashMap<String, String>, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match vars.get(name).map(|value| value.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::invalid(name, format!("could not parse '{raw}': {e}"))),
    }
}

fn parse_or<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    Ok(parse_optional(vars, name)?.unwrap_or(default))
}
