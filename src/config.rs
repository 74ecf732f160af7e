use crate::error::AppError;
use dotenvy::dotenv;
use std::env;

/// Default candidate cache endpoints: local development first, then the
/// Docker Compose service name.
const DEFAULT_CACHE_URLS: &str = "redis://127.0.0.1:6379,redis://redis:6379";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Candidate cache endpoints, probed in order on first store access.
    pub cache_urls: Vec<String>,
    /// Number of notifications kept in the rolling backlog.
    pub history_size: usize,
    /// TTL applied to the cached backlog entry, in seconds.
    pub cache_ttl_secs: i64,
}

impl Config {
    fn parse_urls(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let cache_urls =
            Self::parse_urls(&env::var("CACHE_URLS").unwrap_or_else(|_| DEFAULT_CACHE_URLS.into()));
        if cache_urls.is_empty() {
            return Err(AppError::Config("CACHE_URLS is set but empty".into()));
        }

        let history_size = env::var("HISTORY_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        if history_size == 0 {
            return Err(AppError::Config("HISTORY_SIZE must be at least 1".into()));
        }

        let cache_ttl_secs = env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        Ok(Config {
            port,
            cache_urls,
            history_size,
            cache_ttl_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_urls_splits_and_trims() {
        let urls = Config::parse_urls(" redis://a:6379 , redis://b:6379,, ");
        assert_eq!(urls, vec!["redis://a:6379", "redis://b:6379"]);
    }

    #[test]
    fn parse_urls_empty_input() {
        assert!(Config::parse_urls("  ,  ").is_empty());
    }
}
