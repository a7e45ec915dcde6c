use std::env;

use crate::PulseGraphError;

pub const DEFAULT_OTX_BASE_URL: &str = "https://otx.alienvault.com/api/v1";
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Application configuration loaded from environment variables.
/// Built once at process entry and passed by reference to the feed client
/// and graph writer.
#[derive(Debug, Clone)]
pub struct Config {
    // OTX feed
    pub otx_api_key: String,
    pub otx_base_url: String,
    pub max_pages: u32,

    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
}

impl Config {
    /// Load the full import configuration. Reads `.env` if present.
    pub fn from_env() -> Result<Self, PulseGraphError> {
        dotenvy::dotenv().ok();

        let mut config = Self::feed_from_env()?;
        config.neo4j_uri = required_env("NEO4J_URI")?;
        config.neo4j_user = required_env("NEO4J_USER")?;
        config.neo4j_password = required_env("NEO4J_PASSWORD")?;
        Ok(config)
    }

    /// Load only the feed settings (summary mode never opens the graph).
    pub fn feed_from_env() -> Result<Self, PulseGraphError> {
        dotenvy::dotenv().ok();

        let max_pages = match env::var("OTX_MAX_PAGES") {
            Ok(raw) => parse_max_pages(&raw)?,
            Err(_) => DEFAULT_MAX_PAGES,
        };

        Ok(Self {
            otx_api_key: required_env("OTX_API_KEY")?,
            otx_base_url: env::var("OTX_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OTX_BASE_URL.to_string()),
            max_pages,
            neo4j_uri: String::new(),
            neo4j_user: String::new(),
            neo4j_password: String::new(),
        })
    }

    /// Log which settings are present without leaking secrets.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            if val.is_empty() {
                return "<not set>".to_string();
            }
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OTX_API_KEY: {}", preview(&self.otx_api_key));
        tracing::info!("  OTX_BASE_URL: {}", self.otx_base_url);
        tracing::info!("  OTX_MAX_PAGES: {}", self.max_pages);
        tracing::info!("  NEO4J_URI: {}", self.neo4j_uri);
        tracing::info!("  NEO4J_USER: {}", self.neo4j_user);
        tracing::info!("  NEO4J_PASSWORD: {}", preview(&self.neo4j_password));
    }
}

fn required_env(key: &str) -> Result<String, PulseGraphError> {
    match env::var(key) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(PulseGraphError::Config(format!(
            "{key} environment variable is required"
        ))),
    }
}

fn parse_max_pages(raw: &str) -> Result<u32, PulseGraphError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(PulseGraphError::Config(format!(
            "OTX_MAX_PAGES must be a positive integer, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_pages_must_be_positive() {
        assert_eq!(parse_max_pages("7").unwrap(), 7);
        assert_eq!(parse_max_pages(" 12 ").unwrap(), 12);
        assert!(parse_max_pages("0").is_err());
        assert!(parse_max_pages("-3").is_err());
        assert!(parse_max_pages("lots").is_err());
    }

    #[test]
    fn bad_max_pages_is_a_config_error() {
        let err = parse_max_pages("lots").unwrap_err();
        assert!(matches!(err, PulseGraphError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
