use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::ExchangeRatesApi;
use crate::error::{GatewayError, Result};
use crate::tools::{
    ArgumentSchema, ConvertTool, FluctuationTool, HistoricalRatesTool, LatestRatesTool,
    SymbolsTool, TimeSeriesTool, ToolDefinition, ToolHandler, ToolResponse,
};

struct RegisteredTool {
    name: &'static str,
    description: &'static str,
    arguments: ArgumentSchema,
    handler: Arc<dyn ToolHandler>,
}

/// Tools available to the gateway, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the six exchange rate tools, all sharing `api`.
    pub fn with_exchange_tools(api: Arc<dyn ExchangeRatesApi>) -> Result<Self> {
        let mut registry = ToolRegistry::new();

        registry.register(
            SymbolsTool::NAME,
            SymbolsTool::DESCRIPTION,
            SymbolsTool::arguments(),
            Arc::new(SymbolsTool::new(api.clone())),
        )?;
        registry.register(
            LatestRatesTool::NAME,
            LatestRatesTool::DESCRIPTION,
            LatestRatesTool::arguments(),
            Arc::new(LatestRatesTool::new(api.clone())),
        )?;
        registry.register(
            ConvertTool::NAME,
            ConvertTool::DESCRIPTION,
            ConvertTool::arguments(),
            Arc::new(ConvertTool::new(api.clone())),
        )?;
        registry.register(
            HistoricalRatesTool::NAME,
            HistoricalRatesTool::DESCRIPTION,
            HistoricalRatesTool::arguments(),
            Arc::new(HistoricalRatesTool::new(api.clone())),
        )?;
        registry.register(
            TimeSeriesTool::NAME,
            TimeSeriesTool::DESCRIPTION,
            TimeSeriesTool::arguments(),
            Arc::new(TimeSeriesTool::new(api.clone())),
        )?;
        registry.register(
            FluctuationTool::NAME,
            FluctuationTool::DESCRIPTION,
            FluctuationTool::arguments(),
            Arc::new(FluctuationTool::new(api)),
        )?;

        info!("Registered {} tools", registry.len());
        Ok(registry)
    }

    pub fn register(
        &mut self,
        name: &'static str,
        description: &'static str,
        arguments: ArgumentSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        if self.contains(name) {
            return Err(GatewayError::Config(format!(
                "tool `{}` is already registered",
                name
            )));
        }

        debug!("Registering tool {}", name);
        self.tools.push(RegisteredTool {
            name,
            description,
            arguments,
            handler,
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name).collect()
    }

    pub fn arguments(&self, name: &str) -> Option<&ArgumentSchema> {
        self.find(name).map(|tool| &tool.arguments)
    }

    /// Definitions advertised through `tools/list`
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition::new(tool.name, tool.description, &tool.arguments))
            .collect()
    }

    /// Run the named tool.
    ///
    /// Only an unknown name is an `Err`; every failure inside a known tool is
    /// folded into an error envelope naming the tool.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<ToolResponse> {
        let tool = self.find(name).ok_or_else(|| {
            warn!("Rejected call to unknown tool {}", name);
            GatewayError::UnknownOperation(name.to_string())
        })?;

        info!("Calling tool {}", name);

        let outcome = match tool.arguments.prepare(arguments) {
            Ok(arguments) => tool.handler.call(arguments).await,
            Err(e) => Err(e),
        };

        Ok(match outcome {
            Ok(payload) => ToolResponse::success(payload),
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                ToolResponse::error(format!("{} failed: {}", name, e))
            }
        })
    }

    fn find(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|tool| tool.name == name)
    }
}
