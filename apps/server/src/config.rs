//! Application configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Explorer used for proposal links when `EXPLORER_URL` is unset.
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.zera.vision/transactions";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{} environment variable(s) must be set", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Block senders must resolve from the trusted domain.
    #[default]
    Production,
    /// Block sender authentication is skipped.
    Development,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }
}

/// Settings read from the process environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Telegram bot token.
    pub bot_token: String,
    /// sqlx SQLite URL, e.g. `sqlite://bot.db`.
    pub database_url: String,
    /// Domain whose current addresses may broadcast blocks.
    pub trusted_domain: Option<String>,
    pub environment: Environment,
    /// Restrict notifications to one chat (testing).
    pub notify_only_chat: Option<i64>,
    /// Base URL for proposal explorer links.
    pub explorer_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bot_token", &"<redacted>")
            .field("database_url", &self.database_url)
            .field("trusted_domain", &self.trusted_domain)
            .field("environment", &self.environment)
            .field("notify_only_chat", &self.notify_only_chat)
            .field("explorer_url", &self.explorer_url)
            .finish()
    }
}

impl AppConfig {
    /// Load from environment variables.
    ///
    /// Uses TELEGRAM_BOT_TOKEN, DATABASE_URL, TRUSTED_DOMAIN, ENVIRONMENT,
    /// NOTIFY_ONLY_CHAT and EXPLORER_URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // Default to production for safety
        let environment = get("ENVIRONMENT")
            .map(|v| Environment::parse(&v))
            .unwrap_or_default();

        let bot_token = get("TELEGRAM_BOT_TOKEN");
        let database_url = get("DATABASE_URL");
        let trusted_domain = get("TRUSTED_DOMAIN");

        let mut missing = Vec::new();
        if bot_token.is_none() {
            missing.push("TELEGRAM_BOT_TOKEN");
        }
        if database_url.is_none() {
            missing.push("DATABASE_URL");
        }
        if trusted_domain.is_none() && environment == Environment::Production {
            missing.push("TRUSTED_DOMAIN");
        }
        let (Some(bot_token), Some(database_url)) = (bot_token, database_url) else {
            return Err(ConfigError::Missing(missing));
        };
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let notify_only_chat = match get("NOTIFY_ONLY_CHAT") {
            Some(value) => Some(value.trim().parse::<i64>().map_err(|_| {
                ConfigError::Invalid {
                    name: "NOTIFY_ONLY_CHAT",
                    value,
                }
            })?),
            None => None,
        };

        Ok(Self {
            bot_token,
            database_url,
            trusted_domain,
            environment,
            notify_only_chat,
            explorer_url: get("EXPLORER_URL").unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string()),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
