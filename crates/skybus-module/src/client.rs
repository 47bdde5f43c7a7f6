//! Module client implementation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;

use skybus_core::{
    BusResult, ModuleKey, FIELD_MESSAGE_CMD, FIELD_MESSAGE_TYPE, FIELD_ROUTING_TYPE,
    FIELD_SENDER_MODULE_KEY, FIELD_TARGET_ID, ID_FIELD_FEATURES,
    ID_FIELD_HARDWARE_ID, ID_FIELD_HARDWARE_TYPE, ID_FIELD_INSTANCE_TIMESTAMP,
    ID_FIELD_MESSAGE_FILTER, ID_FIELD_MODULE_CLASS, ID_FIELD_MODULE_ID,
    ID_FIELD_MODULE_KEY, ID_FIELD_RESEND, ID_FIELD_VERSION, MODULE_CLASS_GENERIC,
    ROUTING_GROUP, ROUTING_INDIVIDUAL, ROUTING_INTERMODULE, TYPE_MODULE_ID,
};
use skybus_transport::{ChunkSocket, MessageReceiver};

/// Static description of a module instance.
#[derive(Clone, Debug)]
pub struct ModuleConfig {
    pub module_id: String,
    pub module_class: String,
    /// Message types this module wants forwarded to it.
    pub message_filter: Vec<u32>,
    /// Capability strings ("T", "R", "V", "C").
    pub features: Vec<String>,
    pub version: String,
    pub hardware_serial: Option<String>,
    pub hardware_type: i64,
    /// Local bind address; port 0 lets the OS pick.
    pub listen_addr: SocketAddr,
    pub broker_addr: SocketAddr,
    /// Cadence of periodic identity announcements.
    pub announce_interval: Duration,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        ModuleConfig {
            module_id: "module".to_string(),
            module_class: MODULE_CLASS_GENERIC.to_string(),
            message_filter: Vec::new(),
            features: Vec::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            hardware_serial: None,
            hardware_type: 0,
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            broker_addr: "127.0.0.1:60000".parse().unwrap(),
            announce_interval: Duration::from_secs(1),
        }
    }
}

struct ClientInner {
    config: ModuleConfig,
    socket: ChunkSocket,
    module_key: ModuleKey,
    /// Stamped once per instance; the broker uses a change to detect a
    /// restart under the same module id.
    instance_timestamp: i64,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Client handle for one module instance. Clone shares the instance.
#[derive(Clone)]
pub struct ModuleClient {
    inner: Arc<ClientInner>,
}

impl ModuleClient {
    /// Bind the module socket and mint the instance identity.
    pub async fn connect(config: ModuleConfig) -> BusResult<ModuleClient> {
        let socket = ChunkSocket::bind(config.listen_addr, Duration::from_secs(5)).await?;

        let instance_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Ok(ModuleClient {
            inner: Arc::new(ClientInner {
                config,
                socket,
                module_key: generate_module_key(),
                instance_timestamp,
                tasks: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.socket.local_addr()
    }

    pub fn module_key(&self) -> &ModuleKey {
        &self.inner.module_key
    }

    /// Start receiving broker-forwarded messages.
    pub fn start(&self) -> BusResult<MessageReceiver> {
        self.inner.socket.start()
    }

    /// Spawn the periodic identity announcement loop.
    pub fn spawn_announcer(&self) {
        let client = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(client.inner.config.announce_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = client.announce(false).await {
                    tracing::warn!("identity announce failed: {}", e);
                }
            }
        });
        self.inner.tasks.lock().push(task);
    }

    /// Stop the announcer and the receive loop. Idempotent.
    pub fn stop(&self) {
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
        self.inner.socket.stop();
    }

    /// The module's identity message. `resend` asks the broker to reply
    /// with its own identity.
    pub fn identity_json(&self, resend: bool) -> Value {
        let config = &self.inner.config;

        let mut ms = Map::new();
        ms.insert(ID_FIELD_MODULE_ID.into(), json!(config.module_id));
        ms.insert(ID_FIELD_MODULE_CLASS.into(), json!(config.module_class));
        ms.insert(ID_FIELD_MESSAGE_FILTER.into(), json!(config.message_filter));
        ms.insert(ID_FIELD_FEATURES.into(), json!(config.features));
        ms.insert(ID_FIELD_MODULE_KEY.into(), json!(self.inner.module_key.as_str()));
        if let Some(serial) = &config.hardware_serial {
            ms.insert(ID_FIELD_HARDWARE_ID.into(), json!(serial));
            ms.insert(ID_FIELD_HARDWARE_TYPE.into(), json!(config.hardware_type));
        }
        ms.insert(ID_FIELD_VERSION.into(), json!(config.version));
        ms.insert(
            ID_FIELD_INSTANCE_TIMESTAMP.into(),
            json!(self.inner.instance_timestamp),
        );
        ms.insert(ID_FIELD_RESEND.into(), json!(resend));

        let mut envelope = Map::new();
        envelope.insert(FIELD_ROUTING_TYPE.into(), json!(ROUTING_INTERMODULE));
        envelope.insert(FIELD_MESSAGE_TYPE.into(), json!(TYPE_MODULE_ID));
        envelope.insert(FIELD_MESSAGE_CMD.into(), Value::Object(ms));
        Value::Object(envelope)
    }

    /// Announce this module to the broker.
    pub async fn announce(&self, resend: bool) -> BusResult<()> {
        let message = self.identity_json(resend).to_string();
        self.inner
            .socket
            .send_to(message.as_bytes(), self.inner.config.broker_addr)
            .await
    }

    /// Send an application message through the broker.
    ///
    /// `internal` marks intermodule traffic that must never reach the cloud;
    /// otherwise the routing is individual when a target is named and group
    /// when not.
    pub async fn send_message(
        &self,
        target: Option<&str>,
        message_type: u32,
        cmd: Value,
        internal: bool,
    ) -> BusResult<()> {
        let routing = if internal {
            ROUTING_INTERMODULE
        } else if target.is_some() {
            ROUTING_INDIVIDUAL
        } else {
            ROUTING_GROUP
        };

        let mut envelope = Map::new();
        envelope.insert(
            FIELD_SENDER_MODULE_KEY.into(),
            json!(self.inner.module_key.as_str()),
        );
        if let Some(target) = target {
            envelope.insert(FIELD_TARGET_ID.into(), json!(target));
        }
        envelope.insert(FIELD_ROUTING_TYPE.into(), json!(routing));
        envelope.insert(FIELD_MESSAGE_TYPE.into(), json!(message_type));
        envelope.insert(FIELD_MESSAGE_CMD.into(), cmd);

        let message = Value::Object(envelope).to_string();
        self.inner
            .socket
            .send_to(message.as_bytes(), self.inner.config.broker_addr)
            .await
    }
}

/// GUID-shaped instance key; uniqueness across restarts is what matters.
fn generate_module_key() -> ModuleKey {
    let bits: u128 = rand::random();
    ModuleKey::new(format!(
        "{:08X}-{:04X}-{:04X}-{:04X}-{:012X}",
        (bits >> 96) as u32,
        (bits >> 80) as u16,
        (bits >> 64) as u16,
        (bits >> 48) as u16,
        bits & 0xFFFF_FFFF_FFFF,
    ))
}
