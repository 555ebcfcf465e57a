use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::params::{check_date_range, default_base_currency, normalize_currency, normalize_symbols};
use super::{parse_arguments, to_payload, ArgumentSchema, ParamSpec, ParamType, ToolHandler};
use crate::api::{ExchangeRatesApi, ProviderQuery};
use crate::error::{GatewayError, Result};
use crate::schema::{self, Shape, TimeSeriesResponse, Validated};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesRequest {
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default)]
    pub symbols: Option<String>,
}

impl TimeSeriesRequest {
    pub fn normalize(self) -> Result<Self> {
        check_date_range(&self.start_date, &self.end_date)?;
        Ok(TimeSeriesRequest {
            start_date: self.start_date,
            end_date: self.end_date,
            base_currency: normalize_currency("base_currency", &self.base_currency)?,
            symbols: normalize_symbols(self.symbols.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesOutput {
    pub base_currency: String,
    pub start_date: String,
    pub end_date: String,
    pub rates: BTreeMap<String, BTreeMap<String, f64>>,
    pub total_days: usize,
}

pub struct TimeSeriesTool {
    api: Arc<dyn ExchangeRatesApi>,
}

impl TimeSeriesTool {
    pub const NAME: &'static str = "get_time_series_rates";
    pub const DESCRIPTION: &'static str = "Get daily exchange rates between two dates";

    pub fn new(api: Arc<dyn ExchangeRatesApi>) -> Self {
        TimeSeriesTool { api }
    }

    pub fn arguments() -> ArgumentSchema {
        ArgumentSchema::new()
            .param(ParamSpec::required(
                "start_date",
                ParamType::String,
                "Start date in YYYY-MM-DD format",
            ))
            .param(ParamSpec::required(
                "end_date",
                ParamType::String,
                "End date in YYYY-MM-DD format",
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

    pub fn build_query(request: &TimeSeriesRequest) -> ProviderQuery {
        ProviderQuery::new("/timeseries")
            .param("start_date", request.start_date.as_str())
            .param("end_date", request.end_date.as_str())
            .param("base", request.base_currency.as_str())
            .optional_param("symbols", request.symbols.as_deref())
    }

    pub async fn get_time_series(&self, request: TimeSeriesRequest) -> Result<TimeSeriesOutput> {
        let request = request.normalize()?;
        debug!(
            "Fetching time series {}..{} (base {}, symbols: {:?})",
            request.start_date, request.end_date, request.base_currency, request.symbols
        );

        let raw = self.api.fetch(&Self::build_query(&request)).await?;

        let body: TimeSeriesResponse = match schema::validate(&raw, Shape::TimeSeries)? {
            Validated::Accepted(body) => body,
            Validated::Rejected { reason } => {
                return Err(GatewayError::ProviderFailure {
                    operation: "Failed to retrieve time series data".to_string(),
                    reason,
                })
            }
        };

        info!(
            "Retrieved {} days of rates for {} ({}..{})",
            body.rates.len(),
            body.base,
            body.start_date,
            body.end_date
        );

        Ok(TimeSeriesOutput {
            total_days: body.rates.len(),
            base_currency: body.base,
            start_date: body.start_date,
            end_date: body.end_date,
            rates: body.rates,
        })
    }
}

#[async_trait]
impl ToolHandler for TimeSeriesTool {
    async fn call(&self, arguments: Value) -> Result<Value> {
        let request: TimeSeriesRequest = parse_arguments(arguments)?;
        to_payload(&self.get_time_series(request).await?)
    }
}
