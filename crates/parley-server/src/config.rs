use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use parley_chat::DEFAULT_DAILY_LIMIT;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub daily_message_limit: u32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("PARLEY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PARLEY_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port = match lookup("PARLEY_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid PARLEY_PORT '{}'", raw))?,
            None => 3000,
        };
        let daily_message_limit = match lookup("PARLEY_DAILY_MESSAGE_LIMIT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid PARLEY_DAILY_MESSAGE_LIMIT '{}'", raw))?,
            None => DEFAULT_DAILY_LIMIT,
        };

        Ok(Self {
            host: lookup("PARLEY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: lookup("PARLEY_DB_PATH").unwrap_or_else(|| "parley.db".into()).into(),
            jwt_secret,
            daily_message_limit,
        })
    }
}
