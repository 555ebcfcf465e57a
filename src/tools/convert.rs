use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::params::{normalize_currency, parse_date};
use super::{parse_arguments, to_payload, ArgumentSchema, ParamSpec, ParamType, ToolHandler};
use crate::api::{ExchangeRatesApi, ProviderQuery};
use crate::error::{GatewayError, Result};
use crate::precision;
use crate::schema::{self, ConvertInfo, ConvertQuery, ConvertResponse, Shape, Validated};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: f64,
    // YYYY-MM-DD; latest rates are used when absent
    #[serde(default)]
    pub date: Option<String>,
}

impl ConvertRequest {
    /// Validate and canonicalize the arguments before anything is sent.
    pub fn normalize(self) -> Result<Self> {
        let from_currency = normalize_currency("from_currency", &self.from_currency)?;
        let to_currency = normalize_currency("to_currency", &self.to_currency)?;

        if !self.amount.is_finite() {
            return Err(GatewayError::InvalidArgument(format!(
                "`amount` must be a finite number, got {}",
                self.amount
            )));
        }
        // A zero amount would make the derived conversion rate undefined.
        if self.amount == 0.0 {
            return Err(GatewayError::DivisionByZero(
                "`amount` must be non-zero to derive a conversion rate".to_string(),
            ));
        }
        if self.amount < 0.0 {
            return Err(GatewayError::InvalidArgument(format!(
                "`amount` must be positive, got {}",
                self.amount
            )));
        }

        let date = match self.date {
            Some(date) if !date.is_empty() => {
                parse_date("date", &date)?;
                Some(date)
            }
            _ => None,
        };

        Ok(ConvertRequest {
            from_currency,
            to_currency,
            amount: self.amount,
            date,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertOutput {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: f64,
    pub converted_amount: f64,
    pub conversion_rate: f64,
    pub query_info: ConvertQuery,
    pub additional_info: ConvertInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

pub struct ConvertTool {
    api: Arc<dyn ExchangeRatesApi>,
}

impl ConvertTool {
    pub const NAME: &'static str = "convert_currency";
    pub const DESCRIPTION: &'static str =
        "Convert an amount from one currency to another, optionally at a historical date";

    pub fn new(api: Arc<dyn ExchangeRatesApi>) -> Self {
        ConvertTool { api }
    }

    pub fn arguments() -> ArgumentSchema {
        ArgumentSchema::new()
            .param(ParamSpec::required(
                "from_currency",
                ParamType::String,
                "Source currency code (e.g. USD)",
            ))
            .param(ParamSpec::required(
                "to_currency",
                ParamType::String,
                "Target currency code (e.g. EUR)",
            ))
            .param(ParamSpec::required(
                "amount",
                ParamType::Number,
                "Amount to convert (must be greater than zero)",
            ))
            .param(ParamSpec::optional(
                "date",
                ParamType::String,
                "Date for a historical conversion in YYYY-MM-DD format (optional)",
            ))
    }

    /// `/convert?from=..&to=..&amount=..&date=..`
    pub fn build_query(request: &ConvertRequest) -> ProviderQuery {
        ProviderQuery::new("/convert")
            .param("from", request.from_currency.as_str())
            .param("to", request.to_currency.as_str())
            .param("amount", request.amount)
            .optional_param("date", request.date.as_deref())
    }

    pub async fn convert(&self, request: ConvertRequest) -> Result<ConvertOutput> {
        let request = request.normalize()?;
        debug!(
            "Converting {} {} -> {} (date: {:?})",
            request.amount, request.from_currency, request.to_currency, request.date
        );

        let raw = self.api.fetch(&Self::build_query(&request)).await?;

        let body: ConvertResponse = match schema::validate(&raw, Shape::Convert)? {
            Validated::Accepted(body) => body,
            Validated::Rejected { reason } => {
                warn!(
                    "Conversion {} -> {} rejected by provider",
                    request.from_currency, request.to_currency
                );
                return Err(GatewayError::ProviderFailure {
                    operation: "Conversion failed".to_string(),
                    reason,
                });
            }
        };

        let conversion_rate = precision::conversion_rate(body.result, request.amount)?;

        info!(
            "Converted {} {} = {} {}",
            request.amount, request.from_currency, body.result, request.to_currency
        );

        Ok(ConvertOutput {
            from_currency: request.from_currency,
            to_currency: request.to_currency,
            amount: request.amount,
            converted_amount: body.result,
            conversion_rate,
            query_info: body.query,
            additional_info: body.info,
            date: body.date,
        })
    }
}

#[async_trait]
impl ToolHandler for ConvertTool {
    async fn call(&self, arguments: Value) -> Result<Value> {
        let request: ConvertRequest = parse_arguments(arguments)?;
        to_payload(&self.convert(request).await?)
    }
}
