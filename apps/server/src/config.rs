//! Server configuration.

use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database URL.
    pub database_url: String,
    /// Directory uploaded icons are stored in and served from.
    pub media_dir: String,
    /// Public base URL used when building icon URLs.
    pub web_host: String,
    /// Session lifetime in hours.
    pub session_ttl_hours: i64,
    /// Commit hash reported by the version endpoint.
    pub commit_hash: String,
    /// Log level.
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("TROVE_SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("TROVE_SERVER_PORT")
                .unwrap_or_else(|_| "8470".to_string())
                .parse()
                .unwrap_or(8470),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:trove.db?mode=rwc".to_string()),
            media_dir: env::var("TROVE_MEDIA_DIR").unwrap_or_else(|_| "media".to_string()),
            web_host: env::var("TROVE_WEB_HOST")
                .unwrap_or_else(|_| "http://localhost:8470".to_string()),
            session_ttl_hours: env::var("TROVE_SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(auth::DEFAULT_SESSION_TTL_HOURS),
            commit_hash: env::var("COMMIT_HASH").unwrap_or_else(|_| "local".to_string()),
            log_level: env::var("TROVE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the absolute URL for a stored media path.
    pub fn media_url(&self, path: &str) -> String {
        format!("{}/media/{}", self.web_host.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_url() {
        let mut config = Config::from_env().unwrap();
        config.web_host = "https://trove.example/".to_string();
        assert_eq!(
            config.media_url("U_abc/icon.png"),
            "https://trove.example/media/U_abc/icon.png"
        );
    }
}
