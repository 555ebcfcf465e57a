use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::params::{default_base_currency, normalize_currency, normalize_symbols, parse_date};
use super::{parse_arguments, to_payload, ArgumentSchema, ParamSpec, ParamType, ToolHandler};
use crate::api::{ExchangeRatesApi, ProviderQuery};
use crate::error::{GatewayError, Result};
use crate::precision;
use crate::schema::{self, HistoricalResponse, Shape, Validated};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRatesRequest {
    pub date: String,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default)]
    pub symbols: Option<String>,
}

impl HistoricalRatesRequest {
    pub fn normalize(self) -> Result<Self> {
        parse_date("date", &self.date)?;
        Ok(HistoricalRatesRequest {
            date: self.date,
            base_currency: normalize_currency("base_currency", &self.base_currency)?,
            symbols: normalize_symbols(self.symbols.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRatesOutput {
    pub date: String,
    pub base_currency: String,
    pub timestamp: i64,
    pub rates: BTreeMap<String, f64>,
    pub formatted_rates: Vec<String>,
    pub total_currencies: usize,
}

pub struct HistoricalRatesTool {
    api: Arc<dyn ExchangeRatesApi>,
}

impl HistoricalRatesTool {
    pub const NAME: &'static str = "get_historical_rates";
    pub const DESCRIPTION: &'static str = "Get exchange rates for a specific past date";

    pub fn new(api: Arc<dyn ExchangeRatesApi>) -> Self {
        HistoricalRatesTool { api }
    }

    pub fn arguments() -> ArgumentSchema {
        ArgumentSchema::new()
            .param(ParamSpec::required(
                "date",
                ParamType::String,
                "Date in YYYY-MM-DD format",
            ))
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
                "Comma-separated currency codes to return (optional)",
            ))
    }

    /// The date is part of the path (`/{date}`), not the query string.
    pub fn build_query(request: &HistoricalRatesRequest) -> ProviderQuery {
        ProviderQuery::new(format!("/{}", request.date))
            .param("base", request.base_currency.as_str())
            .optional_param("symbols", request.symbols.as_deref())
    }

    pub async fn get_historical_rates(
        &self,
        request: HistoricalRatesRequest,
    ) -> Result<HistoricalRatesOutput> {
        let request = request.normalize()?;
        debug!(
            "Fetching historical rates for {} (base {}, symbols: {:?})",
            request.date, request.base_currency, request.symbols
        );

        let raw = self.api.fetch(&Self::build_query(&request)).await?;

        let body: HistoricalResponse = match schema::validate(&raw, Shape::Historical)? {
            Validated::Accepted(body) => body,
            Validated::Rejected { reason } => {
                return Err(GatewayError::ProviderFailure {
                    operation: "Failed to retrieve historical rates".to_string(),
                    reason,
                })
            }
        };

        let formatted_rates = body
            .rates
            .iter()
            .map(|(currency, rate)| {
                precision::format_historical_rate(&body.base, *rate, currency, &body.date)
            })
            .collect();

        info!(
            "Retrieved {} historical rates for {} as of {}",
            body.rates.len(),
            body.base,
            body.date
        );

        Ok(HistoricalRatesOutput {
            total_currencies: body.rates.len(),
            formatted_rates,
            date: body.date,
            base_currency: body.base,
            timestamp: body.timestamp,
            rates: body.rates,
        })
    }
}

#[async_trait]
impl ToolHandler for HistoricalRatesTool {
    async fn call(&self, arguments: Value) -> Result<Value> {
        let request: HistoricalRatesRequest = parse_arguments(arguments)?;
        to_payload(&self.get_historical_rates(request).await?)
    }
}
