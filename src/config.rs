use std::str::FromStr;

use crate::domain::ShareSettings;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;
const DEFAULT_MAX_ARTIFACT_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_OTEL_ENDPOINT: &str = "http://localhost:4318/v1/traces";
const DEFAULT_SAMPLING_RATE: f64 = 0.01;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Where shares are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub otel_enabled: bool,
    pub otel_endpoint: String,
    pub service_name: String,
    /// Fraction of traces exported, between 0.0 and 1.0
    pub sampling_rate: f64,
    pub environment: String,
}

/// Process configuration, read once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub jwt_secret: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Zero disables token expiry
    pub share_token_ttl_days: i64,
    pub max_artifact_bytes: usize,
    pub run_migrations: bool,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from `.env` (if present) and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").or_else(|| var("RDS_PROXY_URL"));
        let store_backend = match var("STORE_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "STORE_BACKEND",
                value,
            })?,
            None if database_url.is_some() => StoreBackend::Postgres,
            None => StoreBackend::Memory,
        };
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL or RDS_PROXY_URL"));
        }

        let jwt_secret = var("JWT_SECRET")
            .or_else(|| var("SECRET_KEY"))
            .ok_or(ConfigError::Missing("JWT_SECRET or SECRET_KEY"))?;

        let share_token_ttl_days =
            parse_or("SHARE_TOKEN_TTL_DAYS", var("SHARE_TOKEN_TTL_DAYS"), DEFAULT_TOKEN_TTL_DAYS)?;
        if share_token_ttl_days < 0 {
            return Err(ConfigError::Invalid {
                name: "SHARE_TOKEN_TTL_DAYS",
                value: share_token_ttl_days.to_string(),
            });
        }

        let sampling_rate: f64 = parse_or(
            "OTEL_TRACE_SAMPLING_RATE",
            var("OTEL_TRACE_SAMPLING_RATE"),
            DEFAULT_SAMPLING_RATE,
        )?;

        Ok(Self {
            database_url,
            store_backend,
            jwt_secret,
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            db_max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                var("DB_MAX_CONNECTIONS"),
                DEFAULT_DB_MAX_CONNECTIONS,
            )?,
            share_token_ttl_days,
            max_artifact_bytes: parse_or(
                "MAX_ARTIFACT_BYTES",
                var("MAX_ARTIFACT_BYTES"),
                DEFAULT_MAX_ARTIFACT_BYTES,
            )?,
            run_migrations: parse_or("RUN_MIGRATIONS", var("RUN_MIGRATIONS"), true)?,
            telemetry: TelemetryConfig {
                otel_enabled: parse_or("OTEL_ENABLED", var("OTEL_ENABLED"), false)?,
                otel_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_OTEL_ENDPOINT.to_string()),
                service_name: var("OTEL_SERVICE_NAME")
                    .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
                sampling_rate: sampling_rate.clamp(0.0, 1.0),
                environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            },
        })
    }

    pub fn share_settings(&self) -> ShareSettings {
        ShareSettings {
            token_ttl: (self.share_token_ttl_days > 0)
                .then(|| chrono::Duration::days(self.share_token_ttl_days)),
            max_artifact_bytes: self.max_artifact_bytes,
        }
    }
}

fn parse_or<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
