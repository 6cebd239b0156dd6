use anyhow::Context;
use serde::Deserialize;

/// Seven days.
const DEFAULT_TTL_MINUTES: i64 = 60 * 24 * 7;
/// One year.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;

        // No fallback secret: a missing key must stop startup.
        let secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let ttl_minutes = match get("JWT_TTL_MINUTES") {
            Some(v) => v
                .parse::<i64>()
                .with_context(|| format!("JWT_TTL_MINUTES is not a number: {v}"))?,
            None => DEFAULT_TTL_MINUTES,
        };
        if ttl_minutes <= 0 {
            anyhow::bail!("JWT_TTL_MINUTES must be positive");
        }
        if ttl_minutes > MAX_TTL_MINUTES {
            anyhow::bail!("JWT_TTL_MINUTES must not exceed {MAX_TTL_MINUTES}");
        }

        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "nutriplan".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "nutriplan-users".into()),
            ttl_minutes,
        };

        let port = match get("APP_PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT is not a valid port: {v}"))?,
            None => 5000,
        };

        Ok(Self {
            database_url,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt,
        })
    }
}
