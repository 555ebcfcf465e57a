pub mod api;
pub mod config;
pub mod error;
pub mod precision;
pub mod schema;
pub mod server;
pub mod tools;

pub use api::{ExchangeRatesApi, ProviderQuery, RatesClient};
pub use config::Config;
pub use error::{GatewayError, Result};
pub use server::{McpServer, ToolRegistry};
