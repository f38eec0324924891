//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

const DEFAULT_CATALOG_URL: &str = "https://fortnite-api.com/v2/shop";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Create missing tables at startup
    pub apply_schema: bool,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// HS256 secret the auth provider signs access tokens with
    pub jwt_secret: String,

    /// Expected `aud` claim
    pub jwt_audience: String,

    /// Operator emails allowed to run privileged operations
    pub admin_emails: Vec<String>,

    /// Upstream shop catalog endpoint
    pub catalog_url: String,

    /// Upstream API key, sent as the `apiKey` query parameter
    pub catalog_api_key: Option<String>,

    /// How long a fetched catalog stays fresh
    pub catalog_ttl: Duration,

    /// Emit JSON log lines
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL");

        let database_max_connections = get("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let apply_schema = parse_bool(get("APPLY_SCHEMA"), true, "APPLY_SCHEMA")?;

        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = get("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = get("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::MissingEnv("JWT_SECRET"))?;

        let jwt_audience = get("JWT_AUDIENCE").unwrap_or_else(|| "authenticated".to_string());

        let admin_emails = get("ADMIN_EMAILS")
            .map(|list| {
                list.split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let catalog_url = get("CATALOG_URL").unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

        let catalog_api_key = get("CATALOG_API_KEY");

        let catalog_ttl = get("CATALOG_TTL_SECONDS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidValue("CATALOG_TTL_SECONDS"))?;

        let log_json = get("LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config = Self {
            database_url,
            database_max_connections,
            apply_schema,
            host,
            port,
            environment,
            jwt_secret,
            jwt_audience,
            admin_emails,
            catalog_url,
            catalog_api_key,
            catalog_ttl,
            log_json,
        };

        if config.is_production() && config.database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        Ok(config)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_bool(value: Option<String>, default: bool, key: &'static str) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes") => Ok(true),
        Some("0" | "false" | "no") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue(key)),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert!(config.database_url.is_none());
        assert_eq!(config.port, 3000);
        assert_eq!(config.jwt_audience, "authenticated");
        assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
        assert_eq!(config.catalog_ttl, Duration::from_secs(30));
        assert!(config.admin_emails.is_empty());
        assert!(config.apply_schema);
    }

    #[test]
    fn test_missing_jwt_secret() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("JWT_SECRET")));
    }

    #[test]
    fn test_admin_emails_split_and_trimmed() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("ADMIN_EMAILS", " ops@store.gg, Owner@Store.gg ,,"),
        ]))
        .unwrap();

        assert_eq!(config.admin_emails, vec!["ops@store.gg", "Owner@Store.gg"]);
    }

    #[test]
    fn test_production_requires_database() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("DATABASE_URL")));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("PORT")));

        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("CATALOG_TTL_SECONDS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("CATALOG_TTL_SECONDS")));
    }
}
