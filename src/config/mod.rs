//! Application configuration management

use std::env;

use anyhow::{Context, Result};
use url::Url;

use crate::services::episode_matcher::{MatcherConfig, NumberPolicy};
use crate::services::rate_limiter::{RateLimitConfig, RetryConfig};
use crate::services::tvmaze::DEFAULT_BASE_URL;

/// Matcher configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// TVMaze API base URL
    pub tvmaze_base_url: String,

    /// Sustained TVMaze request rate
    pub tvmaze_requests_per_second: u32,

    /// Requests allowed above the sustained rate in a burst
    pub tvmaze_burst_size: u32,

    /// Attempts per TVMaze request, including the first
    pub tvmaze_max_retries: u32,

    /// Reject matches whose season/episode token is not a number
    pub strict_numbers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tvmaze_base_url: DEFAULT_BASE_URL.to_string(),
            tvmaze_requests_per_second: 2,
            tvmaze_burst_size: 5,
            tvmaze_max_retries: 3,
            strict_numbers: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tvmaze_base_url = lookup("TVMAZE_BASE_URL").unwrap_or(defaults.tvmaze_base_url);
        validate_base_url(&tvmaze_base_url, "TVMAZE_BASE_URL")?;

        let number = |key: &str, default: u32| -> Result<u32> {
            match lookup(key) {
                Some(value) => value
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid {}", key)),
                None => Ok(default),
            }
        };

        Ok(Self {
            tvmaze_requests_per_second: number(
                "TVMAZE_REQUESTS_PER_SECOND",
                defaults.tvmaze_requests_per_second,
            )?,
            tvmaze_burst_size: number("TVMAZE_BURST_SIZE", defaults.tvmaze_burst_size)?,
            tvmaze_max_retries: number("TVMAZE_MAX_RETRIES", defaults.tvmaze_max_retries)?,
            strict_numbers: lookup("MATCHER_STRICT_NUMBERS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.strict_numbers),
            tvmaze_base_url,
        })
    }

    /// Replace the TVMaze base URL, e.g. from `--base-url`
    pub fn set_base_url(&mut self, base_url: String, source: &str) -> Result<()> {
        validate_base_url(&base_url, source)?;
        self.tvmaze_base_url = base_url;
        Ok(())
    }

    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            number_policy: if self.strict_numbers {
                NumberPolicy::Strict
            } else {
                NumberPolicy::Lenient
            },
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: self.tvmaze_requests_per_second,
            burst_size: self.tvmaze_burst_size,
        }
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.tvmaze_max_retries.max(1),
            ..RetryConfig::default()
        }
    }
}

fn validate_base_url(base_url: &str, source: &str) -> Result<()> {
    Url::parse(base_url).with_context(|| format!("Invalid {}: {}", source, base_url))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.matcher_config().number_policy, NumberPolicy::Lenient);
        assert_eq!(config.rate_limit(), RateLimitConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TVMAZE_BASE_URL", "http://localhost:8080"),
            ("TVMAZE_REQUESTS_PER_SECOND", "10"),
            ("TVMAZE_MAX_RETRIES", "0"),
            ("MATCHER_STRICT_NUMBERS", "1"),
        ])
        .unwrap();
        assert_eq!(config.tvmaze_base_url, "http://localhost:8080");
        assert_eq!(config.rate_limit().requests_per_second, 10);
        assert_eq!(config.retry().max_retries, 1);
        assert_eq!(config.matcher_config().number_policy, NumberPolicy::Strict);
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("TVMAZE_BASE_URL", "not a url")]).is_err());
        assert!(load(&[("TVMAZE_BURST_SIZE", "many")]).is_err());
    }

    #[test]
    fn test_base_url_override_is_validated() {
        let mut config = Config::default();

        let err = config
            .set_base_url("not a url".to_string(), "--base-url")
            .unwrap_err();
        assert!(err.to_string().contains("Invalid --base-url"));
        assert_eq!(config.tvmaze_base_url, DEFAULT_BASE_URL);

        config
            .set_base_url("http://localhost:9000".to_string(), "--base-url")
            .unwrap();
        assert_eq!(config.tvmaze_base_url, "http://localhost:9000");
    }
}
