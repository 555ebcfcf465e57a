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
use crate::schema::{self, FluctuationRate, FluctuationResponse, Shape, Validated};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluctuationRequest {
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default)]
    pub symbols: Option<String>,
}

impl FluctuationRequest {
    pub fn normalize(self) -> Result<Self> {
        check_date_range(&self.start_date, &self.end_date)?;
        Ok(FluctuationRequest {
            start_date: self.start_date,
            end_date: self.end_date,
            base_currency: normalize_currency("base_currency", &self.base_currency)?,
            symbols: normalize_symbols(self.symbols.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluctuationOutput {
    pub base_currency: String,
    pub start_date: String,
    pub end_date: String,
    pub rates: BTreeMap<String, FluctuationRate>,
    pub total_currencies: usize,
}

pub struct FluctuationTool {
    api: Arc<dyn ExchangeRatesApi>,
}

impl FluctuationTool {
    pub const NAME: &'static str = "get_fluctuation_data";
    pub const DESCRIPTION: &'static str =
        "Get how currencies fluctuated between two dates (start rate, end rate, change, change %)";

    pub fn new(api: Arc<dyn ExchangeRatesApi>) -> Self {
        FluctuationTool { api }
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

    pub fn build_query(request: &FluctuationRequest) -> ProviderQuery {
        ProviderQuery::new("/fluctuation")
            .param("start_date", request.start_date.as_str())
            .param("end_date", request.end_date.as_str())
            .param("base", request.base_currency.as_str())
            .optional_param("symbols", request.symbols.as_deref())
    }

    pub async fn get_fluctuation(&self, request: FluctuationRequest) -> Result<FluctuationOutput> {
        let request = request.normalize()?;
        debug!(
            "Fetching fluctuation {}..{} (base {}, symbols: {:?})",
            request.start_date, request.end_date, request.base_currency, request.symbols
        );

        let raw = self.api.fetch(&Self::build_query(&request)).await?;

        let body: FluctuationResponse = match schema::validate(&raw, Shape::Fluctuation)? {
            Validated::Accepted(body) => body,
            Validated::Rejected { reason } => {
                return Err(GatewayError::ProviderFailure {
                    operation: "Failed to retrieve fluctuation data".to_string(),
                    reason,
                })
            }
        };

        info!(
            "Retrieved fluctuation for {} currencies against {}",
            body.rates.len(),
            body.base
        );

        Ok(FluctuationOutput {
            total_currencies: body.rates.len(),
            base_currency: body.base,
            start_date: body.start_date,
            end_date: body.end_date,
            rates: body.rates,
        })
    }
}

#[async_trait]
impl ToolHandler for FluctuationTool {
    async fn call(&self, arguments: Value) -> Result<Value> {
        let request: FluctuationRequest = parse_arguments(arguments)?;
        to_payload(&self.get_fluctuation(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::StubApi;
    use serde_json::json;

    fn request() -> FluctuationRequest {
        FluctuationRequest {
            start_date: "2024-01-01".to_string(),
            end_date: "2024-01-31".to_string(),
            base_currency: "usd".to_string(),
            symbols: Some("EUR, GBP".to_string()),
        }
    }

    #[tokio::test]
    async fn test_fluctuation_passthrough() {
        let api = Arc::new(StubApi::new(json!({
            "success": true,
            "fluctuation": true,
            "start_date": "2024-01-01",
            "end_date": "2024-01-31",
            "base": "USD",
            "rates": {
                "EUR": {"start_rate": 0.905, "end_rate": 0.921, "change": 0.016, "change_pct": 1.768},
                "GBP": {"start_rate": 0.785, "end_rate": 0.787, "change": 0.002, "change_pct": 0.2548}
            }
        })));
        let tool = FluctuationTool::new(api.clone());

        let output = tool.get_fluctuation(request()).await.unwrap();

        assert_eq!(
            api.last_query().unwrap().query_string(),
            "start_date=2024-01-01&end_date=2024-01-31&base=USD&symbols=EUR,GBP"
        );
        assert_eq!(output.total_currencies, 2);
        assert_eq!(output.rates["EUR"].change_pct, 1.768);
        assert_eq!(output.rates["GBP"].end_rate, 0.787);
    }

    #[tokio::test]
    async fn test_fluctuation_rejected() {
        let api = Arc::new(StubApi::new(json!({
            "success": false,
            "error": {"code": 504, "type": "invalid_start_date"}
        })));
        let tool = FluctuationTool::new(api);

        let err = tool.get_fluctuation(request()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provider failure: Failed to retrieve fluctuation data (invalid_start_date)"
        );
    }
}
