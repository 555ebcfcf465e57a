pub mod mcp;
pub mod registry;

pub use mcp::{serve, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer};
pub use registry::ToolRegistry;
