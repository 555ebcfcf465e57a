use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use super::{ExchangeRatesApi, ProviderQuery};
use crate::config::Config;
use crate::error::{GatewayError, Result};

const API_KEY_HEADER: &str = "apikey";

/// HTTP client for the APILayer exchange rates API
#[derive(Clone)]
pub struct RatesClient {
    inner: Arc<RatesClientInner>,
}

struct RatesClientInner {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl RatesClient {
    /// Create a new client from the loaded configuration
    pub fn new(config: &Config) -> Result<Self> {
        // Validate URL format
        config
            .base_url
            .parse::<url::Url>()
            .map_err(|e| GatewayError::Config(format!("Invalid base URL: {}", e)))?;

        if config.api_key.is_empty() {
            return Err(GatewayError::Config("API key is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        debug!("Exchange rates client targeting {}", config.base_url);

        Ok(RatesClient {
            inner: Arc::new(RatesClientInner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone(),
                timeout: config.timeout,
            }),
        })
    }

    /// Full URL for a provider path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            error!("Request to {} timed out after {:?}", url, self.inner.timeout);
            GatewayError::Timeout(format!(
                "no response from {} within {:?}",
                url, self.inner.timeout
            ))
        } else {
            error!("Request to {} failed: {}", url, e);
            GatewayError::Transport(format!("request to {} failed: {}", url, e))
        }
    }
}

#[async_trait]
impl ExchangeRatesApi for RatesClient {
    async fn fetch(&self, query: &ProviderQuery) -> Result<Value> {
        let url = self.endpoint(&query.path);
        debug!("GET {} ?{}", url, query.query_string());

        let response = self
            .inner
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.inner.api_key)
            .query(&query.params)
            .send()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            error!("Provider returned HTTP {} for {}", status, url);
            return Err(GatewayError::Transport(format!(
                "provider returned HTTP {} for {}",
                status, url
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(&url, e)
            } else {
                error!("Malformed JSON body from {}: {}", url, e);
                GatewayError::Transport(format!("malformed JSON body from {}: {}", url, e))
            }
        })
    }
}
