//! Standalone broker daemon
//!
//! Runs the module broker without a cloud bridge (null collaborators), which
//! is enough for local modules to discover each other and exchange traffic:
//!
//! ```text
//! broker-daemon [bind_port]
//! ```

use std::process::exit;

use skybus_broker::{Broker, Collaborators};
use skybus_core::BrokerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port: u16 = args
        .get(1)
        .map(|v| {
            v.parse().unwrap_or_else(|_| {
                eprintln!("bad bind_port: {v}");
                exit(1);
            })
        })
        .unwrap_or(60_000);

    let broker = Broker::bind(
        format!("127.0.0.1:{port}").parse().unwrap(),
        BrokerConfig::default(),
        Collaborators::default(),
    )
    .await
    .unwrap_or_else(|e| {
        // Bind failure is fatal for a broker.
        eprintln!("failed to bind broker socket: {e}");
        exit(1);
    });

    broker.start().expect("broker already started");
    tracing::info!(addr = %broker.local_addr(), "broker up");

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutting down");
    broker.stop();
}
