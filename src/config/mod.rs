//! Configuration management for Keygate
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use chrono::Duration;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::{AuthSettings, DEFAULT_SWEEP_INTERVAL_SECONDS};

/// Upper bound for nonce and session TTLs (one year)
pub const MAX_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Which identity scheme (and matching signature oracle) to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentitySchemeKind {
    #[default]
    Evm,
    Stellar,
}

impl FromStr for IdentitySchemeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "evm" | "ethereum" => Ok(IdentitySchemeKind::Evm),
            "stellar" => Ok(IdentitySchemeKind::Stellar),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid identity scheme: '{}'. Expected: evm or stellar",
                s
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Domain embedded in challenges (default: localhost:3001)
    pub auth_domain: String,

    /// Resource URI embedded in challenges
    pub auth_uri: String,

    /// Human-readable statement embedded in challenges
    pub auth_statement: String,

    /// Chain / network id embedded in challenges (default: 1)
    pub auth_chain_id: u64,

    /// Identity scheme (default: evm)
    pub identity_scheme: IdentitySchemeKind,

    /// Auth nonce TTL in seconds (default: 300 = 5 minutes)
    pub auth_nonce_ttl_seconds: i64,

    /// Session TTL in seconds (default: 86400 = 24 hours)
    pub auth_session_ttl_seconds: i64,

    /// Interval between expiry sweeps in seconds (default: 60)
    pub auth_sweep_interval_seconds: u64,

    /// Upper bound on a signature oracle call in seconds (default: 10)
    pub auth_oracle_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|s| s.parse::<Environment>())
            .transpose()?
            .unwrap_or_default();

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS");

        let auth_domain = lookup("AUTH_DOMAIN").unwrap_or_else(|| format!("localhost:{}", port));

        let auth_uri = lookup("AUTH_URI").unwrap_or_else(|| format!("http://{}", auth_domain));

        let auth_statement = lookup("AUTH_STATEMENT")
            .unwrap_or_else(|| "Sign in to prove you control this account.".to_string());

        let auth_chain_id = parse_var(&lookup, "AUTH_CHAIN_ID", 1u64)?;

        let identity_scheme = lookup("AUTH_IDENTITY_SCHEME")
            .map(|s| s.parse::<IdentitySchemeKind>())
            .transpose()?
            .unwrap_or_default();

        let auth_nonce_ttl_seconds = parse_var(&lookup, "AUTH_NONCE_TTL_SECONDS", 300i64)?;

        let auth_session_ttl_seconds =
            parse_var(&lookup, "AUTH_SESSION_TTL_SECONDS", 24 * 60 * 60i64)?;

        let auth_sweep_interval_seconds = parse_var(
            &lookup,
            "AUTH_SWEEP_INTERVAL_SECONDS",
            DEFAULT_SWEEP_INTERVAL_SECONDS,
        )?;

        let auth_oracle_timeout_seconds = parse_var(&lookup, "AUTH_ORACLE_TIMEOUT_SECONDS", 10u64)?;

        let config = Config {
            environment,
            host,
            port,
            log_level,
            cors_allowed_origins,
            auth_domain,
            auth_uri,
            auth_statement,
            auth_chain_id,
            identity_scheme,
            auth_nonce_ttl_seconds,
            auth_session_ttl_seconds,
            auth_sweep_interval_seconds,
            auth_oracle_timeout_seconds,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the challenge protocol cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_statement.contains('\n') || self.auth_statement.contains('\r') {
            return Err(ConfigError::InvalidValue(
                "AUTH_STATEMENT must be a single line".to_string(),
            ));
        }

        if self.auth_domain.trim().is_empty() || self.auth_domain.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidValue(
                "AUTH_DOMAIN must be a non-empty host".to_string(),
            ));
        }

        if self.auth_nonce_ttl_seconds <= 0 || self.auth_session_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "Nonce and session TTLs must be positive".to_string(),
            ));
        }

        if self.auth_nonce_ttl_seconds > MAX_TTL_SECONDS
            || self.auth_session_ttl_seconds > MAX_TTL_SECONDS
        {
            return Err(ConfigError::InvalidValue(format!(
                "Nonce and session TTLs must not exceed {} seconds",
                MAX_TTL_SECONDS
            )));
        }

        if self.auth_sweep_interval_seconds == 0 || self.auth_oracle_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "Sweep interval and oracle timeout must be positive".to_string(),
            ));
        }

        if self.environment.is_production() && self.auth_domain.starts_with("localhost") {
            return Err(ConfigError::MissingEnvVar("AUTH_DOMAIN".to_string()));
        }

        Ok(())
    }

    /// Auth protocol settings derived from this configuration
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            domain: self.auth_domain.clone(),
            uri: self.auth_uri.clone(),
            statement: self.auth_statement.clone(),
            version: "1".to_string(),
            chain_id: self.auth_chain_id,
            nonce_ttl: Duration::seconds(self.auth_nonce_ttl_seconds),
            session_ttl: Duration::seconds(self.auth_session_ttl_seconds),
            oracle_timeout: std::time::Duration::from_secs(self.auth_oracle_timeout_seconds),
        }
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.auth_sweep_interval_seconds)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{} has an invalid value: '{}'", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!(
            "dev".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert_eq!(
            "staging".parse::<Environment>().unwrap(),
            Environment::Staging
        );
        assert_eq!(
            "PROD".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("invalid".parse::<Environment>().is_err());
    }

    #[test]
    fn test_environment_as_str() {
        assert_eq!(Environment::Development.as_str(), "development");
        assert_eq!(Environment::Staging.as_str(), "staging");
        assert_eq!(Environment::Production.as_str(), "production");
        assert!(Environment::Production.is_production());
        assert!(!Environment::Staging.is_production());
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.auth_domain, "localhost:3001");
        assert_eq!(config.auth_uri, "http://localhost:3001");
        assert_eq!(config.identity_scheme, IdentitySchemeKind::Evm);

        let settings = config.auth_settings();
        assert_eq!(settings.nonce_ttl, Duration::minutes(5));
        assert_eq!(settings.session_ttl, Duration::hours(24));
        assert_eq!(settings.chain_id, 1);
        assert_eq!(config.sweep_interval(), std::time::Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("AUTH_DOMAIN", "login.example.com"),
            ("AUTH_CHAIN_ID", "137"),
            ("AUTH_IDENTITY_SCHEME", "stellar"),
            ("AUTH_NONCE_TTL_SECONDS", "60"),
            ("AUTH_SESSION_TTL_SECONDS", "3600"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.auth_uri, "http://login.example.com");
        assert_eq!(config.identity_scheme, IdentitySchemeKind::Stellar);
        assert_eq!(config.auth_settings().chain_id, 137);
        assert_eq!(config.auth_settings().session_ttl, Duration::hours(1));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config_from(&[("PORT", "http")]),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            config_from(&[("AUTH_NONCE_TTL_SECONDS", "soon")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            config_from(&[("AUTH_SESSION_TTL_SECONDS", "0")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            config_from(&[("AUTH_SESSION_TTL_SECONDS", "10000000000000")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            config_from(&[("AUTH_NONCE_TTL_SECONDS", "9223372036854775807")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            config_from(&[("AUTH_IDENTITY_SCHEME", "bitcoin")]),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_ttl_ceiling_still_issues_challenges() {
        use crate::auth::{AuthService, EvmAddress, EvmPersonalSignOracle, SystemClock};
        use std::sync::Arc;

        let ceiling = MAX_TTL_SECONDS.to_string();
        let config = config_from(&[
            ("AUTH_NONCE_TTL_SECONDS", ceiling.as_str()),
            ("AUTH_SESSION_TTL_SECONDS", ceiling.as_str()),
        ])
        .unwrap();
        assert_eq!(
            config.auth_settings().session_ttl,
            Duration::seconds(MAX_TTL_SECONDS)
        );

        let service = AuthService::new(
            config.auth_settings(),
            Arc::new(EvmAddress),
            Arc::new(EvmPersonalSignOracle),
            Arc::new(SystemClock),
        );
        let challenge = service
            .request_challenge("0xabc0000000000000000000000000000000000001")
            .await
            .unwrap();
        assert!(challenge.expires_at > challenge.issued_at);
    }

    #[test]
    fn test_multiline_statement_rejected() {
        assert!(config_from(&[("AUTH_STATEMENT", "line one\nline two")]).is_err());
    }

    #[test]
    fn test_production_requires_domain() {
        assert!(matches!(
            config_from(&[("ENVIRONMENT", "production")]),
            Err(ConfigError::MissingEnvVar(_))
        ));
        assert!(config_from(&[
            ("ENVIRONMENT", "production"),
            ("AUTH_DOMAIN", "login.example.com"),
        ])
        .is_ok());
    }

    #[test]
    fn test_config_error_types() {
        let err = ConfigError::MissingEnvVar("AUTH_DOMAIN".to_string());
        assert!(err.to_string().contains("AUTH_DOMAIN"));

        let err = ConfigError::InvalidPort("invalid".to_string());
        assert!(err.to_string().contains("invalid"));
    }
}
