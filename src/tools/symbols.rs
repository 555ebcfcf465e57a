use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{parse_arguments, to_payload, ArgumentSchema, ToolHandler};
use crate::api::{ExchangeRatesApi, ProviderQuery};
use crate::error::{GatewayError, Result};
use crate::schema::{self, Shape, SymbolsResponse, Validated};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolsRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolsOutput {
    pub symbols: BTreeMap<String, String>,
    pub formatted_list: Vec<String>,
    pub total_currencies: usize,
}

pub struct SymbolsTool {
    api: Arc<dyn ExchangeRatesApi>,
}

impl SymbolsTool {
    pub const NAME: &'static str = "get_currency_symbols";
    pub const DESCRIPTION: &'static str =
        "Get all available currency symbols and their full names";

    pub fn new(api: Arc<dyn ExchangeRatesApi>) -> Self {
        SymbolsTool { api }
    }

    pub fn arguments() -> ArgumentSchema {
        ArgumentSchema::new()
    }

    pub fn build_query(_request: &SymbolsRequest) -> ProviderQuery {
        ProviderQuery::new("/symbols")
    }

    /// List every currency the provider supports
    pub async fn get_symbols(&self, request: SymbolsRequest) -> Result<SymbolsOutput> {
        debug!("Fetching currency symbols");

        let query = Self::build_query(&request);
        let raw = self.api.fetch(&query).await?;

        let body: SymbolsResponse = match schema::validate(&raw, Shape::Symbols)? {
            Validated::Accepted(body) => body,
            Validated::Rejected { reason } => {
                return Err(GatewayError::ProviderFailure {
                    operation: "Failed to retrieve currency symbols".to_string(),
                    reason,
                })
            }
        };

        let formatted_list = body
            .symbols
            .iter()
            .map(|(code, name)| format!("{}: {}", code, name))
            .collect();

        info!("Retrieved {} currency symbols", body.symbols.len());

        Ok(SymbolsOutput {
            total_currencies: body.symbols.len(),
            formatted_list,
            symbols: body.symbols,
        })
    }
}

#[async_trait]
impl ToolHandler for SymbolsTool {
    async fn call(&self, arguments: Value) -> Result<Value> {
        let request: SymbolsRequest = parse_arguments(arguments)?;
        to_payload(&self.get_symbols(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::StubApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_symbols_reshaped() {
        let api = Arc::new(StubApi::new(json!({
            "success": true,
            "symbols": {"USD": "United States Dollar", "EUR": "Euro"}
        })));
        let tool = SymbolsTool::new(api.clone());

        let output = tool.get_symbols(SymbolsRequest::default()).await.unwrap();

        assert_eq!(output.total_currencies, 2);
        assert_eq!(
            output.formatted_list,
            vec!["EUR: Euro", "USD: United States Dollar"]
        );
        assert_eq!(api.last_query().unwrap().path, "/symbols");
        assert!(api.last_query().unwrap().params.is_empty());
    }

    #[tokio::test]
    async fn test_symbols_provider_failure() {
        let api = Arc::new(StubApi::new(json!({"success": false})));
        let tool = SymbolsTool::new(api);

        let err = tool
            .get_symbols(SymbolsRequest::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provider failure: Failed to retrieve currency symbols"
        );
    }

    #[tokio::test]
    async fn test_symbols_schema_error() {
        let api = Arc::new(StubApi::new(json!({"success": true, "symbols": ["USD"]})));
        let tool = SymbolsTool::new(api);

        let err = tool
            .get_symbols(SymbolsRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Schema(_)));
    }
}
