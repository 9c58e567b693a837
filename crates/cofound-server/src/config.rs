use std::path::PathBuf;

use anyhow::{Context, bail};

use cofound_matching::Limits;

/// Secrets that ship in sample configs and must never reach a deployment.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me", "changeme", "secret", "your-secret-key"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKeys {
    Secret(String),
    JwksUrl(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub token_keys: TokenKeys,
    pub limits: Limits,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset and empty values are treated alike.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = or("COFOUND_PORT", "8000")
            .parse()
            .context("COFOUND_PORT must be a port number")?;

        let environment = or("COFOUND_ENVIRONMENT", "development");
        if environment != "development" && environment != "production" {
            bail!("COFOUND_ENVIRONMENT must be development or production, got {environment}");
        }

        let cors_origins = or("COFOUND_CORS_ORIGINS", "http://localhost:3000,http://localhost:3001")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let token_keys = match (get("COFOUND_JWT_SECRET"), get("COFOUND_JWKS_URL")) {
            (Some(_), Some(_)) => bail!("set only one of COFOUND_JWT_SECRET and COFOUND_JWKS_URL"),
            (None, None) => bail!("one of COFOUND_JWT_SECRET or COFOUND_JWKS_URL is required"),
            (Some(secret), None) => {
                if PLACEHOLDER_SECRETS.contains(&secret.as_str()) {
                    bail!("COFOUND_JWT_SECRET is a placeholder value; set a real secret");
                }
                TokenKeys::Secret(secret)
            }
            (None, Some(url)) => TokenKeys::JwksUrl(url),
        };

        let defaults = Limits::default();
        let limits = Limits {
            intro_weekly: match get("COFOUND_INTRO_WEEKLY_LIMIT") {
                Some(v) => v.parse().context("COFOUND_INTRO_WEEKLY_LIMIT must be a number")?,
                None => defaults.intro_weekly,
            },
            message_daily: match get("COFOUND_MESSAGE_DAILY_LIMIT") {
                Some(v) => v.parse().context("COFOUND_MESSAGE_DAILY_LIMIT must be a number")?,
                None => defaults.message_daily,
            },
        };

        Ok(Self {
            host: or("COFOUND_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(or("COFOUND_DB_PATH", "cofound.db")),
            environment,
            cors_origins,
            token_keys,
            limits,
        })
    }
}
