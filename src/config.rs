use crate::error::{LinkError, LinkResult};
use clap::Parser;
use std::net::SocketAddr;
use validator::ValidateUrl;

#[derive(Debug, Clone, Parser)]
#[command(name = "snaplink", version, about = "URL shortener with expiring links")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:5000")]
    pub bind_addr: SocketAddr,

    /// Public address short codes are appended to
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:5000")]
    pub base_url: String,

    /// Link lifetime used when a request omits `visibility` or sends a non-positive one
    #[arg(long, env = "DEFAULT_VALIDITY_MINUTES", default_value_t = 30)]
    pub default_validity_minutes: i64,

    /// Expired link sweep interval in seconds, 0 disables the sweep
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 0)]
    pub sweep_interval_secs: u64,

    /// Click events kept per link
    #[arg(long, env = "MAX_CLICK_HISTORY", default_value_t = 100)]
    pub max_click_history: usize,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Remote log ingestion endpoint
    #[arg(long, env = "LOG_API_URL")]
    pub log_api_url: Option<String>,

    /// Bearer token for the remote log endpoint
    #[arg(long, env = "LOG_ACCESS_TOKEN", hide_env_values = true)]
    pub log_access_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            base_url: "http://localhost:5000".to_string(),
            default_validity_minutes: 30,
            sweep_interval_secs: 0,
            max_click_history: 100,
            log_level: "info".to_string(),
            log_api_url: None,
            log_access_token: None,
        }
    }
}

impl Config {
    /// Load configuration from command line arguments and environment variables
    pub fn from_env() -> LinkResult<Self> {
        let config = Config::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LinkResult<()> {
        if !self.base_url.validate_url() {
            return Err(LinkError::Configuration(format!(
                "BASE_URL '{}' is not a valid URL",
                self.base_url
            )));
        }

        if self.default_validity_minutes <= 0 {
            return Err(LinkError::Configuration(
                "Default validity must be greater than 0 minutes".to_string(),
            ));
        }

        if self.max_click_history == 0 {
            return Err(LinkError::Configuration(
                "Click history size must be greater than 0".to_string(),
            ));
        }

        match (&self.log_api_url, &self.log_access_token) {
            (Some(url), Some(_)) if !url.validate_url() => Err(LinkError::Configuration(
                format!("LOG_API_URL '{}' is not a valid URL", url),
            )),
            (Some(_), None) | (None, Some(_)) => Err(LinkError::Configuration(
                "LOG_API_URL and LOG_ACCESS_TOKEN must be set together".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn remote_logging_enabled(&self) -> bool {
        self.log_api_url.is_some() && self.log_access_token.is_some()
    }
}
