//! Configuration management for taskmail.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `TASK_STORE` - Optional. `memory` or `sqlite`. Defaults to `sqlite`.
//! - `DATABASE_PATH` - Optional. SQLite file. Defaults to `./data/taskmail.db`.
//! - `MAIL_ENABLED` - Optional. Set to `false` to force the console fallback. Defaults to `true`.
//! - `MAIL_FROM` - Optional. Sender address. Empty means mail is not configured.
//! - `MAIL_PLACEHOLDER` - Optional. Sender value treated as unconfigured.
//!   Defaults to `taskmanagerai@gmail.com`.
//! - `SMTP_HOST` - Optional. Defaults to `smtp.gmail.com`.
//! - `SMTP_PORT` - Optional. Defaults to `587`.
//! - `SMTP_USERNAME` - Optional. Defaults to `MAIL_FROM`.
//! - `SMTP_PASSWORD` - Optional. Defaults to empty.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreType;

/// Sender value shipped in the default application properties. Environments
/// that never replaced it have no working mail credentials.
pub const DEFAULT_PLACEHOLDER_SENDER: &str = "taskmanagerai@gmail.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Sender-side mail settings consulted before every dispatch.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Explicit switch; `false` always selects the console fallback.
    pub enabled: bool,

    /// Address used in the `From` header.
    pub sender: String,

    /// Sender value reserved for unconfigured environments.
    pub placeholder: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sender: String::new(),
            placeholder: DEFAULT_PLACEHOLDER_SENDER.to_string(),
        }
    }
}

impl MailConfig {
    /// Mail settings with the given sender and the default placeholder.
    pub fn with_sender(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            ..Self::default()
        }
    }

    /// Whether real delivery should be attempted.
    ///
    /// False when disabled, when the sender is blank, or when the sender is
    /// exactly the reserved placeholder.
    pub fn is_configured(&self) -> bool {
        if !self.enabled {
            return false;
        }
        let sender = self.sender.trim();
        !sender.is_empty() && sender != self.placeholder
    }
}

/// SMTP relay settings for the real transport.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Task store backend
    pub store_type: StoreType,

    /// SQLite database file (ignored by the memory store)
    pub database_path: PathBuf,

    pub mail: MailConfig,

    pub smtp: SmtpConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric or boolean variable
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let store_type = std::env::var("TASK_STORE")
            .map(|v| StoreType::from_str(&v))
            .unwrap_or_default();

        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/taskmail.db"));

        let enabled = match std::env::var("MAIL_ENABLED") {
            Ok(v) => parse_bool(&v)
                .ok_or_else(|| ConfigError::InvalidValue("MAIL_ENABLED".to_string(), v))?,
            Err(_) => true,
        };

        let sender = std::env::var("MAIL_FROM").unwrap_or_default();

        let mail = MailConfig {
            enabled,
            sender: sender.clone(),
            placeholder: std::env::var("MAIL_PLACEHOLDER")
                .unwrap_or_else(|_| DEFAULT_PLACEHOLDER_SENDER.to_string()),
        };

        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .map_err(|e| {
                    ConfigError::InvalidValue("SMTP_PORT".to_string(), format!("{}", e))
                })?,
            username: std::env::var("SMTP_USERNAME").unwrap_or(sender),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
        };

        Ok(Self {
            host,
            port,
            store_type,
            database_path,
            mail,
            smtp,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(store_type: StoreType, mail: MailConfig) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            store_type,
            database_path: PathBuf::from("./data/taskmail.db"),
            mail,
            smtp: SmtpConfig::default(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sender_is_not_configured() {
        assert!(!MailConfig::default().is_configured());
        assert!(!MailConfig::with_sender("   ").is_configured());
    }

    #[test]
    fn placeholder_sender_is_not_configured() {
        assert!(!MailConfig::with_sender(DEFAULT_PLACEHOLDER_SENDER).is_configured());
    }

    #[test]
    fn real_sender_is_configured() {
        assert!(MailConfig::with_sender("smtp-configured@example.com").is_configured());
    }

    #[test]
    fn disabled_flag_wins_over_real_sender() {
        let mail = MailConfig {
            enabled: false,
            ..MailConfig::with_sender("smtp-configured@example.com")
        };
        assert!(!mail.is_configured());
    }

    #[test]
    fn custom_placeholder_is_honoured() {
        let mail = MailConfig {
            placeholder: "change-me@example.com".to_string(),
            ..MailConfig::with_sender("change-me@example.com")
        };
        assert!(!mail.is_configured());
        // The stock placeholder is an ordinary address once replaced.
        let mail = MailConfig {
            placeholder: "change-me@example.com".to_string(),
            ..MailConfig::with_sender(DEFAULT_PLACEHOLDER_SENDER)
        };
        assert!(mail.is_configured());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
