//! Application configuration

use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub graphql_url: String,
    /// Outbound query budget, kept under GitHub's 5000/hour ceiling
    pub requests_per_hour: u32,
    /// Overall deadline for a batch run in minutes
    pub timeout_minutes: u64,
    pub max_concurrent_users: usize,
    /// First calendar year covered by contribution-collection queries
    pub history_start_year: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: None,
            graphql_url: "https://api.github.com/graphql".to_string(),
            requests_per_hour: 4500,
            timeout_minutes: 30,
            max_concurrent_users: 4,
            history_start_year: 2010,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            github_token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            graphql_url: env::var("GITHUB_GRAPHQL_URL").unwrap_or(defaults.graphql_url),
            requests_per_hour: env::var("GITHUB_REQUESTS_PER_HOUR")
                .ok()
                .and_then(|r| r.parse().ok())
                .filter(|r| *r > 0)
                .unwrap_or(defaults.requests_per_hour),
            timeout_minutes: env::var("RUN_TIMEOUT_MINUTES")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(defaults.timeout_minutes),
            max_concurrent_users: env::var("MAX_CONCURRENT_USERS")
                .ok()
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_users),
            history_start_year: env::var("HISTORY_START_YEAR")
                .ok()
                .and_then(|y| y.parse().ok())
                .unwrap_or(defaults.history_start_year),
        }
    }
}
