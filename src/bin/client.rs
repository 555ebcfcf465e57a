use serde_json::{json, Map, Value};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

type Reader = BufReader<OwnedReadHalf>;
type Writer = OwnedWriteHalf;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    println!("╔═══════════════════════════════════════════════════════╗");
    println!("║   Exchange Rates MCP Server - Test Client v1.0       ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    // Connect to server
    let addr = std::env::var("MCP_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    println!("Connecting to server at {}...", addr);

    let socket = TcpStream::connect(&addr).await?;
    let (reader, writer) = socket.into_split();
    let reader = BufReader::new(reader);

    println!("✓ Connected successfully!\n");

    let mut client = TestClient::new(reader, writer);
    client.initialize().await?;

    loop {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║ Available Commands:                                  ║");
        println!("║ 1. get_currency_symbols  - List all currencies       ║");
        println!("║ 2. get_latest_rates      - Latest exchange rates     ║");
        println!("║ 3. convert_currency      - Convert an amount         ║");
        println!("║ 4. get_historical_rates  - Rates on a past date      ║");
        println!("║ 5. get_time_series_rates - Daily rates in a range    ║");
        println!("║ 6. get_fluctuation_data  - Fluctuation in a range    ║");
        println!("║ 7. tools/list            - List available tools      ║");
        println!("║ 8. exit                  - Close connection          ║");
        println!("╚═══════════════════════════════════════════════════════╝");

        let choice = prompt("\nEnter command number (1-8): ")?;

        match choice.as_str() {
            "1" => client.call_tool("get_currency_symbols", Map::new()).await?,
            "2" => client.get_latest_rates().await?,
            "3" => client.convert_currency().await?,
            "4" => client.get_historical_rates().await?,
            "5" => client.date_range_tool("get_time_series_rates").await?,
            "6" => client.date_range_tool("get_fluctuation_data").await?,
            "7" => client.list_tools().await?,
            "8" => {
                println!("\nGoodbye!");
                break;
            }
            _ => println!("Invalid choice. Please enter 1-8."),
        }
    }

    Ok(())
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Insert the answer only when the user typed something.
fn optional(arguments: &mut Map<String, Value>, name: &str, label: &str) -> io::Result<()> {
    let answer = prompt(label)?;
    if !answer.is_empty() {
        arguments.insert(name.to_string(), Value::String(answer));
    }
    Ok(())
}

struct TestClient {
    reader: Reader,
    writer: Writer,
    request_id: i32,
}

impl TestClient {
    fn new(reader: Reader, writer: Writer) -> Self {
        TestClient {
            reader,
            writer,
            request_id: 1,
        }
    }

    async fn send_request(&mut self, request: Value) -> eyre::Result<()> {
        let request_json = serde_json::to_string(&request)?;
        println!(
            "\n→ Sending request:\n{}",
            serde_json::to_string_pretty(&request)?
        );

        self.writer.write_all(request_json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        // Read response
        let mut response_line = String::new();
        self.reader.read_line(&mut response_line).await?;

        if !response_line.is_empty() {
            println!("\n← Response received:");
            let response: Value = serde_json::from_str(&response_line)?;

            // Tool results carry the envelope as JSON text; show it unwrapped.
            match response["result"]["content"][0]["text"].as_str() {
                Some(text) => println!("{}", text),
                None => println!("{}", serde_json::to_string_pretty(&response)?),
            }

            if let Some(error) = response.get("error") {
                if !error.is_null() {
                    println!(
                        "\n⚠️  Error: {}",
                        error.get("message").unwrap_or(&Value::Null)
                    );
                }
            }
        }

        self.request_id += 1;
        Ok(())
    }

    async fn initialize(&mut self) -> eyre::Result<()> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "clientInfo": {"name": "mcp-client", "version": "1.0"}
            },
            "id": self.request_id
        });
        self.send_request(request).await?;

        let initialized = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        self.writer
            .write_all(serde_json::to_string(&initialized)?.as_bytes())
            .await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>) -> eyre::Result<()> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {
                "name": name,
                "arguments": arguments
            },
            "id": self.request_id
        });

        self.send_request(request).await
    }

    async fn get_latest_rates(&mut self) -> eyre::Result<()> {
        let mut arguments = Map::new();
        optional(&mut arguments, "base_currency", "\nBase currency (Enter for USD): ")?;
        optional(&mut arguments, "symbols", "Symbols, e.g. EUR,GBP (Enter for all): ")?;
        self.call_tool("get_latest_rates", arguments).await
    }

    async fn convert_currency(&mut self) -> eyre::Result<()> {
        let mut arguments = Map::new();
        arguments.insert(
            "from_currency".to_string(),
            json!(prompt("\nFrom currency (e.g. USD): ")?),
        );
        arguments.insert(
            "to_currency".to_string(),
            json!(prompt("To currency (e.g. EUR): ")?),
        );

        let amount: f64 = match prompt("Amount: ")?.parse() {
            Ok(amount) => amount,
            Err(_) => {
                println!("Invalid amount.");
                return Ok(());
            }
        };
        arguments.insert("amount".to_string(), json!(amount));
        optional(&mut arguments, "date", "Date YYYY-MM-DD (Enter for latest): ")?;

        self.call_tool("convert_currency", arguments).await
    }

    async fn get_historical_rates(&mut self) -> eyre::Result<()> {
        let mut arguments = Map::new();
        arguments.insert("date".to_string(), json!(prompt("\nDate (YYYY-MM-DD): ")?));
        optional(&mut arguments, "base_currency", "Base currency (Enter for USD): ")?;
        optional(&mut arguments, "symbols", "Symbols, e.g. EUR,GBP (Enter for all): ")?;
        self.call_tool("get_historical_rates", arguments).await
    }

    async fn date_range_tool(&mut self, name: &str) -> eyre::Result<()> {
        let mut arguments = Map::new();
        arguments.insert(
            "start_date".to_string(),
            json!(prompt("\nStart date (YYYY-MM-DD): ")?),
        );
        arguments.insert(
            "end_date".to_string(),
            json!(prompt("End date (YYYY-MM-DD): ")?),
        );
        optional(&mut arguments, "base_currency", "Base currency (Enter for USD): ")?;
        optional(&mut arguments, "symbols", "Symbols, e.g. EUR,GBP (Enter for all): ")?;
        self.call_tool(name, arguments).await
    }

    async fn list_tools(&mut self) -> eyre::Result<()> {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║ Listing Available Tools                              ║");
        println!("╚═══════════════════════════════════════════════════════╝");

        let request = json!({
            "jsonrpc": "2.0",
            "method": "tools/list",
            "params": {},
            "id": self.request_id
        });

        self.send_request(request).await
    }
}
