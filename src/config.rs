use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Source account
    pub twitter_user_id: String,
    pub twitter_token: String,
    pub twitter_api_url: String,

    // Destination account
    pub mastodon_url: String,
    pub mastodon_token: String,

    // State
    pub database_path: PathBuf,

    // Triggers
    pub post_sync_schedule: String,
    pub profile_sync_schedule: String,
    pub web_host: String,
    pub web_port: u16,

    // HTTP
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Source account
            twitter_user_id: required_env("TWITTER_USER_ID")?,
            twitter_token: required_env("TWITTER_TOKEN")?,
            twitter_api_url: env_or_default("TWITTER_API_URL", "https://api.twitter.com/2"),

            // Destination account
            mastodon_url: required_env("MASTODON_URL")?,
            mastodon_token: required_env("MASTODON_TOKEN")?,

            // State
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/mirror.sqlite")),

            // Triggers
            post_sync_schedule: env_or_default("POST_SYNC_SCHEDULE", "*/5 * * * *"),
            profile_sync_schedule: env_or_default("PROFILE_SYNC_SCHEDULE", "0 0 * * *"),
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,

            // HTTP
            http_timeout_secs: parse_env_u64("HTTP_TIMEOUT_SECS", 30)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("TWITTER_USER_ID", &self.twitter_user_id),
            ("TWITTER_TOKEN", &self.twitter_token),
            ("MASTODON_URL", &self.mastodon_url),
            ("MASTODON_TOKEN", &self.mastodon_token),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: "cannot be empty".to_string(),
                });
            }
        }
        if self.post_sync_schedule == self.profile_sync_schedule {
            return Err(ConfigError::InvalidValue {
                name: "PROFILE_SYNC_SCHEDULE".to_string(),
                message: "must differ from POST_SYNC_SCHEDULE".to_string(),
            });
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Base URL of the Mastodon instance, without a trailing slash.
    ///
    /// A bare host name is taken to mean HTTPS.
    #[must_use]
    pub fn mastodon_base_url(&self) -> String {
        let url = self.mastodon_url.trim().trim_end_matches('/');
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{url}")
        }
    }

    /// Configuration with placeholder credentials, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            twitter_user_id: "12345".to_string(),
            twitter_token: "twitter-token".to_string(),
            twitter_api_url: "http://127.0.0.1:9/2".to_string(),
            mastodon_url: "http://127.0.0.1:9".to_string(),
            mastodon_token: "mastodon-token".to_string(),
            database_path: PathBuf::from(":memory:"),
            post_sync_schedule: "*/5 * * * *".to_string(),
            profile_sync_schedule: "0 0 * * *".to_string(),
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            http_timeout_secs: 10,
        }
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_required() {
        std::env::set_var("TWITTER_USER_ID", "783214");
        std::env::set_var("TWITTER_TOKEN", "t-token");
        std::env::set_var("MASTODON_URL", "mastodon.example");
        std::env::set_var("MASTODON_TOKEN", "m-token");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        set_required();
        std::env::remove_var("WEB_PORT");
        std::env::remove_var("POST_SYNC_SCHEDULE");

        let config = Config::from_env().unwrap();
        assert_eq!(config.twitter_user_id, "783214");
        assert_eq!(config.web_port, 8080);
        assert_eq!(config.post_sync_schedule, "*/5 * * * *");
        assert_eq!(config.mastodon_base_url(), "https://mastodon.example");
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_required() {
        set_required();
        std::env::remove_var("MASTODON_TOKEN");

        match Config::from_env() {
            Err(ConfigError::MissingEnvVar(name)) => assert_eq!(name, "MASTODON_TOKEN"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_from_env_bad_port() {
        set_required();
        std::env::set_var("WEB_PORT", "eighty");

        let result = Config::from_env();
        std::env::remove_var("WEB_PORT");
        assert!(matches!(result, Err(ConfigError::ParseInt { .. })));
    }

    #[test]
    fn test_validate_rejects_shared_schedule() {
        let config = Config {
            profile_sync_schedule: "*/5 * * * *".to_string(),
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mastodon_base_url_keeps_scheme() {
        let config = Config {
            mastodon_url: "http://localhost:3000/".to_string(),
            ..Config::for_testing()
        };
        assert_eq!(config.mastodon_base_url(), "http://localhost:3000");
    }
}
