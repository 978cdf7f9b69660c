use std::collections::HashMap;
use std::time::Duration;

use clap::{Parser, Subcommand};

use forwardeaz::grpc::client::{ApiVersion, CheckAttributes, CheckClient};

#[derive(Parser)]
#[command(name = "forwardeaz-cli")]
#[command(about = "Debugging CLI for the forwardeaz authorization service", long_about = None)]
struct Cli {
    /// gRPC address of the service
    #[arg(short, long, global = true, default_value = "http://localhost:9090")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one Check call and print the decision
    Check {
        /// Authorization API version
        #[arg(long, value_enum, default_value = "v3")]
        api: ApiVersion,

        #[arg(long, default_value = "GET")]
        method: String,

        #[arg(long)]
        host: String,

        #[arg(long, default_value = "/")]
        path: String,

        #[arg(long, default_value = "https")]
        scheme: String,

        /// Request header as name=value (repeatable)
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Deadline announced to the server, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {:?}", raw));
    }
    Ok((name.to_ascii_lowercase(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            api,
            method,
            host,
            path,
            scheme,
            headers,
            timeout_ms,
        } => {
            let mut client = CheckClient::connect(&cli.server).await?;

            let mut header_map: HashMap<String, String> = headers.into_iter().collect();
            header_map
                .entry(":authority".to_string())
                .or_insert_with(|| host.clone());

            let attributes = CheckAttributes {
                method,
                host,
                path,
                scheme,
                headers: header_map,
            };
            let outcome = client
                .check(api, &attributes, timeout_ms.map(Duration::from_millis))
                .await?;

            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
