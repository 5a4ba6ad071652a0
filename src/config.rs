use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.odin.fun/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub page_limit: usize,
    pub max_pages: u32,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub log_level: String,
    pub log_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_limit: 100,
            max_pages: 50,
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_delay: Duration::from_millis(2000),
            log_level: "info".to_string(),
            log_file: Some("odin_pln.log".to_string()),
        }
    }
}

impl Config {
    /// Reads the `ODIN_*` variables, after loading `.env` if there is one.
    pub fn init() -> Config {
        if dotenv::dotenv().is_err() {
            tracing::debug!("No .env file found, using process environment");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unparseable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let parsed = |key: &str| lookup(key).map(|v| v.trim().to_string());

        Config {
            api_base_url: parsed("ODIN_API_BASE_URL")
                .filter(|v| !v.is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            page_limit: parse_or(parsed("ODIN_PAGE_LIMIT"), defaults.page_limit)
                .max(1),
            max_pages: parse_or(parsed("ODIN_MAX_PAGES"), defaults.max_pages).max(1),
            request_timeout: parsed("ODIN_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_attempts: parse_or(parsed("ODIN_MAX_ATTEMPTS"), defaults.max_attempts).max(1),
            retry_delay: parsed("ODIN_RETRY_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            log_level: parsed("ODIN_PLN_LOG_LEVEL")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.log_level),
            log_file: match parsed("ODIN_PLN_LOG_FILE") {
                Some(path) if path.is_empty() => None,
                Some(path) => Some(path),
                None => defaults.log_file,
            },
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
