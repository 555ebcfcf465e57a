use crate::error::{GatewayError, Result};
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.apilayer.com/exchangerates_data";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

const API_KEY_PLACEHOLDER: &str = "your_api_key_here";

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub listen_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("EXCHANGE_RATES_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GatewayError::Config("EXCHANGE_RATES_API_KEY not set".to_string()))?;

        if api_key == API_KEY_PLACEHOLDER {
            return Err(GatewayError::Config(
                "EXCHANGE_RATES_API_KEY still holds the placeholder value".to_string(),
            ));
        }

        let base_url = lookup("EXCHANGE_RATES_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = lookup("EXCHANGE_RATES_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| {
                GatewayError::Config(format!("Invalid EXCHANGE_RATES_TIMEOUT_SECS: {}", e))
            })?;

        if timeout_secs == 0 {
            return Err(GatewayError::Config(
                "EXCHANGE_RATES_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let listen_addr =
            lookup("MCP_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

        Ok(Config {
            api_key,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            listen_addr,
        })
    }

    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Config {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// The API key must never reach the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("listen_addr", &self.listen_addr)
            .finish()
    }
}
