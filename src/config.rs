//! Environment-based configuration

use std::path::PathBuf;
use std::str::FromStr;

/// Runtime configuration, read from the environment with defaults suitable
/// for local development. Malformed values fall back to the default rather
/// than aborting startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_browsers: usize,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub upload_dir: PathBuf,
    pub data_dir: PathBuf,
    pub redis_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub worker_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            max_browsers: env_parse("MAX_CONCURRENT_BROWSERS", 3),
            headless: std::env::var("BROWSER_HEADLESS").as_deref() != Ok("false"),
            viewport_width: env_parse("BROWSER_VIEWPORT_WIDTH", 1920),
            viewport_height: env_parse("BROWSER_VIEWPORT_HEIGHT", 1080),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "./uploads")),
            data_dir: PathBuf::from(env_or("DATA_DIR", "./data")),
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1:6379"),
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            ollama_model: env_or("OLLAMA_MODEL", "llama3.2-vision"),
            worker_concurrency: env_parse("WORKER_CONCURRENCY", 1),
        }
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        std::env::set_var("WEBPILOT_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_parse::<usize>("WEBPILOT_TEST_GARBAGE", 7), 7);
        std::env::remove_var("WEBPILOT_TEST_GARBAGE");
    }

    #[test]
    fn test_env_parse_reads_valid_values() {
        std::env::set_var("WEBPILOT_TEST_NUMBER", "12");
        assert_eq!(env_parse::<usize>("WEBPILOT_TEST_NUMBER", 7), 12);
        std::env::remove_var("WEBPILOT_TEST_NUMBER");
    }
}
