//! Generic module demo
//!
//! Registers with a local broker, subscribes to the dummy message type, and
//! exchanges counter payloads with any other instance of itself:
//!
//! ```text
//! generic-module <module_name> <broker_port> <listen_port> [rate_ms]
//! ```
//!
//! Run a broker, then two instances with different names and ports, and
//! watch each one print the other's counters.

use std::process::exit;
use std::time::Duration;

use serde_json::json;

use skybus_module::{ModuleClient, ModuleConfig};

/// Scratch message type in the user range; the broker only routes it.
const TYPE_DEMO_COUNTER: u32 = 85_001;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} module_name broker_port listen_port [rate_ms]", args[0]);
        exit(1);
    }

    let module_name = args[1].clone();
    let broker_port: u16 = args[2].parse().unwrap_or_else(|_| {
        eprintln!("bad broker_port: {}", args[2]);
        exit(1);
    });
    let listen_port: u16 = args[3].parse().unwrap_or_else(|_| {
        eprintln!("bad listen_port: {}", args[3]);
        exit(1);
    });
    let rate_ms: u64 = args
        .get(4)
        .map(|v| v.parse().unwrap_or(1_000))
        .unwrap_or(1_000);

    let client = ModuleClient::connect(ModuleConfig {
        module_id: module_name.clone(),
        message_filter: vec![TYPE_DEMO_COUNTER],
        listen_addr: format!("127.0.0.1:{listen_port}").parse().unwrap(),
        broker_addr: format!("127.0.0.1:{broker_port}").parse().unwrap(),
        ..Default::default()
    })
    .await
    .unwrap_or_else(|e| {
        eprintln!("failed to bind module socket: {e}");
        exit(1);
    });

    let mut rx = client.start().expect("receiver already started");
    client.spawn_announcer();
    tracing::info!(module = %module_name, addr = %client.local_addr(), "module up");

    let sender = client.clone();
    let sender_name = module_name.clone();
    tokio::spawn(async move {
        let mut counter: u64 = 0;
        let mut ticker = tokio::time::interval(Duration::from_millis(rate_ms));
        loop {
            ticker.tick().await;
            counter += 1;
            let cmd = json!({"from": sender_name, "counter": counter});
            if let Err(e) = sender
                .send_message(None, TYPE_DEMO_COUNTER, cmd, true)
                .await
            {
                tracing::warn!("send failed: {e}");
            }
        }
    });

    while let Some((message, from)) = rx.recv().await {
        match serde_json::from_slice::<serde_json::Value>(&message) {
            Ok(parsed) => {
                println!("[{module_name}] {} <- {}", parsed["ms"], from);
            }
            Err(_) => tracing::warn!(%from, "non-JSON message"),
        }
    }
}
