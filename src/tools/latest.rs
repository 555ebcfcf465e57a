use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::params::{default_base_currency, normalize_currency, normalize_symbols};
use super::{parse_arguments, to_payload, ArgumentSchema, ParamSpec, ParamType, ToolHandler};
use crate::api::{ExchangeRatesApi, ProviderQuery};
use crate::error::{GatewayError, Result};
use crate::precision;
use crate::schema::{self, LatestRatesResponse, Shape, Validated};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestRatesRequest {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    // Comma-separated, e.g. "EUR,GBP"
    #[serde(default)]
    pub symbols: Option<String>,
}

impl Default for LatestRatesRequest {
    fn default() -> Self {
        LatestRatesRequest {
            base_currency: default_base_currency(),
            symbols: None,
        }
    }
}

impl LatestRatesRequest {
    pub fn normalize(self) -> Result<Self> {
        Ok(LatestRatesRequest {
            base_currency: normalize_currency("base_currency", &self.base_currency)?,
            symbols: normalize_symbols(self.symbols.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestRatesOutput {
    pub base_currency: String,
    pub date: String,
    pub timestamp: i64,
    pub rates: BTreeMap<String, f64>,
    pub formatted_rates: Vec<String>,
    pub total_currencies: usize,
}

pub struct LatestRatesTool {
    api: Arc<dyn ExchangeRatesApi>,
}

impl LatestRatesTool {
    pub const NAME: &'static str = "get_latest_rates";
    pub const DESCRIPTION: &'static str =
        "Get the latest exchange rates for a base currency, optionally limited to some symbols";

    pub fn new(api: Arc<dyn ExchangeRatesApi>) -> Self {
        LatestRatesTool { api }
    }

    pub fn arguments() -> ArgumentSchema {
        ArgumentSchema::new()
            .param(
                ParamSpec::optional(
                    "base_currency",
                    ParamType::String,
                    "Base currency code (default: USD)",
                )
                .with_default("USD"),
            )
            .param(ParamSpec::optional(
                "symbols",
                ParamType::String,
                "Comma-separated currency codes to return (optional, e.g. EUR,GBP)",
            ))
    }

    /// `/latest?base=..&symbols=..`
    pub fn build_query(request: &LatestRatesRequest) -> ProviderQuery {
        ProviderQuery::new("/latest")
            .param("base", request.base_currency.as_str())
            .optional_param("symbols", request.symbols.as_deref())
    }

    pub async fn get_latest_rates(&self, request: LatestRatesRequest) -> Result<LatestRatesOutput> {
        let request = request.normalize()?;
        debug!(
            "Fetching latest rates for base {} (symbols: {:?})",
            request.base_currency, request.symbols
        );

        let raw = self.api.fetch(&Self::build_query(&request)).await?;

        let body: LatestRatesResponse = match schema::validate(&raw, Shape::LatestRates)? {
            Validated::Accepted(body) => body,
            Validated::Rejected { reason } => {
                return Err(GatewayError::ProviderFailure {
                    operation: "Failed to retrieve latest rates".to_string(),
                    reason,
                })
            }
        };

        let formatted_rates = body
            .rates
            .iter()
            .map(|(currency, rate)| precision::format_rate(&body.base, *rate, currency))
            .collect();

        info!(
            "Retrieved {} latest rates for {} on {}",
            body.rates.len(),
            body.base,
            body.date
        );

        Ok(LatestRatesOutput {
            total_currencies: body.rates.len(),
            formatted_rates,
            base_currency: body.base,
            date: body.date,
            timestamp: body.timestamp,
            rates: body.rates,
        })
    }
}

#[async_trait]
impl ToolHandler for LatestRatesTool {
    async fn call(&self, arguments: Value) -> Result<Value> {
        let request: LatestRatesRequest = parse_arguments(arguments)?;
        to_payload(&self.get_latest_rates(request).await?)
    }
}
