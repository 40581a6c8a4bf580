use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    pub rules_path: Option<PathBuf>,
    pub session_ttl: Duration,
    pub purge_interval: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_domain: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            rules_path: None,
            session_ttl: Duration::from_secs(60 * 60),
            purge_interval: Duration::from_secs(60),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 120,
            cookie_name: "chatter_session".to_string(),
            cookie_secure: false,
            cookie_domain: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Missing or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let seconds = |key: &str, fallback: Duration| {
            non_empty(key)
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|value| *value > 0)
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            bind: non_empty("CHATTER_BIND").unwrap_or(defaults.bind),
            rules_path: non_empty("CHATTER_RULES_PATH").map(PathBuf::from),
            session_ttl: seconds("CHATTER_SESSION_TTL_SECONDS", defaults.session_ttl),
            purge_interval: seconds("CHATTER_PURGE_INTERVAL_SECONDS", defaults.purge_interval),
            rate_limit_window: seconds(
                "CHATTER_RATE_LIMIT_WINDOW_SECONDS",
                defaults.rate_limit_window,
            ),
            rate_limit_max: non_empty("CHATTER_RATE_LIMIT_MAX")
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(defaults.rate_limit_max),
            cookie_name: non_empty("CHATTER_COOKIE_NAME").unwrap_or(defaults.cookie_name),
            cookie_secure: non_empty("CHATTER_COOKIE_SECURE")
                .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.cookie_secure),
            cookie_domain: non_empty("CHATTER_COOKIE_DOMAIN"),
        }
    }
}
