use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

use algomitra_ai::GeminiConfig;
use algomitra_ai::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// JWT secrets copied from sample env files. Refuse to start with these.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your_jwt_secret",
];

pub const DEFAULT_EMAIL_DOMAIN: &str = "@mitwpu.edu.in";

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    pub allowed_email_domain: String,
    pub gemini: GeminiConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("JWT_SECRET is unset or still a placeholder");
        }

        let host = var("ALGOMITRA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("PORT must be a valid port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let ttl_hours: i64 = var("JWT_TTL_HOURS")
            .map(|v| v.parse())
            .transpose()
            .context("JWT_TTL_HOURS must be a whole number of hours")?
            .unwrap_or(72);
        if ttl_hours <= 0 {
            bail!("JWT_TTL_HOURS must be positive");
        }

        Ok(Self {
            addr,
            db_path: var("ALGOMITRA_DB_PATH")
                .unwrap_or_else(|| "algomitra.db".into())
                .into(),
            jwt_secret,
            jwt_ttl: chrono::Duration::hours(ttl_hours),
            allowed_email_domain: var("ALLOWED_EMAIL_DOMAIN")
                .unwrap_or_else(|| DEFAULT_EMAIL_DOMAIN.into()),
            gemini: GeminiConfig {
                base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
                model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
                api_key: var("GEMINI_API_KEY"),
                ..GeminiConfig::default()
            },
        })
    }
}
