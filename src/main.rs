//! forwardeaz service binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                  FORWARDEAZ                   │
//!                        │                                               │
//!   Envoy CheckRequest   │  ┌──────────┐   ┌──────────┐   ┌───────────┐  │
//!   ─────────────────────┼─▶│  grpc    │──▶│  decode  │──▶│  authz    │──┼──▶ GET forward-auth
//!        (v2 | v3)       │  │  server  │   │ (v2|v3)  │   │  checker  │  │     authority
//!                        │  └──────────┘   └──────────┘   └─────┬─────┘  │
//!                        │                                      │        │
//!   Envoy CheckResponse  │  ┌──────────┐                 ┌─────▼─────┐  │
//!   ◀────────────────────┼──│  encode  │◀────────────────│ security  │◀─┼─── status + headers
//!                        │  │ (v2|v3)  │                 │  headers  │  │
//!                        │  └──────────┘                 └───────────┘  │
//!                        │                                               │
//!                        │   config · observability · lifecycle          │
//!                        └───────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use forwardeaz::authz::{ForwardAuthChecker, ForwardAuthConfig};
use forwardeaz::config::{loader, Args};
use forwardeaz::grpc::AuthzServer;
use forwardeaz::lifecycle::{wait_for_shutdown, Shutdown};
use forwardeaz::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = loader::load(Args::parse())?;

    logging::init_logging(&config.log_level, config.log_format)?;

    tracing::info!(
        version = %config.version,
        config = %serde_json::to_string(&config)?,
        "Starting service"
    );

    if let Some(addr) = config.metrics_addr()? {
        metrics::init_metrics(addr)?;
    }

    let checker = ForwardAuthChecker::new(ForwardAuthConfig::from_service_config(&config)?)?;
    let server = AuthzServer::new(Arc::new(checker));

    let listener = TcpListener::bind(config.listen_addr()?).await?;

    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let stopped_early = tokio::select! {
        signal = wait_for_shutdown() => {
            tracing::info!(signal = signal?, "Stopping service");
            false
        }
        result = &mut server_task => {
            result??;
            true
        }
    };

    if !stopped_early {
        shutdown.trigger();
        server_task.await??;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
