use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // External classification service
    pub openai_api_key: String,
    pub classifier_model: String,

    // Browser
    pub max_concurrent_pages: usize,

    // Storage
    pub session_dir: String,
    pub artifact_dir: String,

    // Collection bounds
    pub default_max_followers: usize,
    pub scroll_budget_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: required_env("OPENAI_API_KEY"),
            classifier_model: env::var("CLASSIFIER_MODEL")
                .unwrap_or_else(|_| "gpt-4.1-mini".to_string()),
            max_concurrent_pages: env::var("MAX_CONCURRENT_PAGES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .expect("MAX_CONCURRENT_PAGES must be a number"),
            session_dir: env::var("SESSION_DIR").unwrap_or_else(|_| ".".to_string()),
            artifact_dir: env::var("ARTIFACT_DIR").unwrap_or_else(|_| "artifacts".to_string()),
            default_max_followers: env::var("MAX_FOLLOWERS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .expect("MAX_FOLLOWERS must be a number"),
            scroll_budget_secs: env::var("SCROLL_BUDGET_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .expect("SCROLL_BUDGET_SECS must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
