use exchange_rates_mcp_server::server::serve;
use exchange_rates_mcp_server::{Config, McpServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Logs go to stderr so stdio mode keeps stdout for protocol messages
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting Exchange Rates MCP Server...");

    // Fail before serving anything if the API key is missing
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let mcp_server = match McpServer::from_config(&config) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            error!("Failed to initialize MCP server: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Available tools: {}",
        mcp_server.registry().names().join(", ")
    );

    if std::env::args().any(|arg| arg == "--stdio") {
        info!("Serving MCP over stdio");
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        serve(stdin, stdout, mcp_server).await?;
        return Ok(());
    }

    // Start TCP server
    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = TcpListener::bind(&addr).await?;

    info!("MCP server listening on {}", addr);

    loop {
        let (socket, peer_addr) = listener.accept().await?;
        let mcp_server = Arc::clone(&mcp_server);

        tokio::spawn(async move {
            let (reader, writer) = socket.into_split();
            if let Err(e) = serve(BufReader::new(reader), writer, mcp_server).await {
                error!("Error handling connection from {}: {}", peer_addr, e);
            }
        });
    }
}
