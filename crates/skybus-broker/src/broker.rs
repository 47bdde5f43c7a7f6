//! Broker context
//!
//! One [`Broker`] per process, constructed at startup and handed to whatever
//! needs it. Shared state is split into two mutual-exclusion domains:
//! registry mutations and sweeps behind a parking_lot mutex, message fan-out
//! behind an async mutex held across the sends of one dispatch. The
//! transport keeps its own send lock underneath so multi-chunk sends never
//! interleave on the wire.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;

use skybus_core::{
    BrokerConfig, BusResult, CloudStatus, MonotonicClock, SubsystemFlags, UnitInfo,
    UnitLocation, FIELD_MESSAGE_CMD, FIELD_MESSAGE_TYPE, FIELD_ROUTING_TYPE,
    ID_FIELD_FEATURES, ID_FIELD_MESSAGE_FILTER, ID_FIELD_MODULE_CLASS,
    ID_FIELD_MODULE_ID, ID_FIELD_MODULE_KEY, ID_FIELD_PARTY_RECORD, ID_FIELD_RESEND,
    ID_FIELD_SOCKET_STATUS, ID_FIELD_VERSION, PARTY_FIELD_GROUP, PARTY_FIELD_ID,
    ROUTING_INTERMODULE, TYPE_MODULE_ID,
};
use skybus_transport::ChunkSocket;

use crate::hooks::{
    AlertSink, Authenticator, CloudLink, LogAlerts, NullCloud, NullP2p,
    OfflineAuthenticator, P2pLink,
};
use crate::registry::RegistryState;
use crate::sweeper::sweep_dead_modules;

/// External collaborators injected into the broker.
#[derive(Clone)]
pub struct Collaborators {
    pub cloud: Arc<dyn CloudLink>,
    pub auth: Arc<dyn Authenticator>,
    pub alerts: Arc<dyn AlertSink>,
    pub p2p: Arc<dyn P2pLink>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Collaborators {
            cloud: Arc::new(NullCloud),
            auth: Arc::new(OfflineAuthenticator),
            alerts: Arc::new(LogAlerts),
            p2p: Arc::new(NullP2p),
        }
    }
}

pub(crate) struct BrokerInner {
    pub(crate) config: BrokerConfig,
    pub(crate) clock: MonotonicClock,
    pub(crate) socket: ChunkSocket,
    /// Lock domain 1: registration, camera index, sweeps.
    pub(crate) registry: Mutex<RegistryState>,
    /// Lock domain 2: serializes one fan-out at a time.
    pub(crate) fanout: tokio::sync::Mutex<()>,
    pub(crate) unit_info: Mutex<UnitInfo>,
    pub(crate) unit_location: Mutex<UnitLocation>,
    pub(crate) flags: SubsystemFlags,
    pub(crate) cloud_status: Mutex<CloudStatus>,
    pub(crate) hooks: Collaborators,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// The broker. Clone is cheap and shares the same context.
#[derive(Clone)]
pub struct Broker {
    pub(crate) inner: Arc<BrokerInner>,
}

impl Broker {
    /// Bind the broker socket. Bind failure is fatal; callers exit.
    pub async fn bind(
        addr: SocketAddr,
        config: BrokerConfig,
        hooks: Collaborators,
    ) -> BusResult<Broker> {
        let socket = ChunkSocket::bind(addr, config.reassembly_timeout).await?;

        Ok(Broker {
            inner: Arc::new(BrokerInner {
                config,
                clock: MonotonicClock::new(),
                socket,
                registry: Mutex::new(RegistryState::new()),
                fanout: tokio::sync::Mutex::new(()),
                unit_info: Mutex::new(UnitInfo::default()),
                unit_location: Mutex::new(UnitLocation::default()),
                flags: SubsystemFlags::new(),
                cloud_status: Mutex::new(CloudStatus::Fresh),
                hooks,
                tasks: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.socket.local_addr()
    }

    pub fn flags(&self) -> &SubsystemFlags {
        &self.inner.flags
    }

    /// Launch the receive pump and the liveness sweeper. Fails if the
    /// transport was already started.
    pub fn start(&self) -> BusResult<()> {
        let mut rx = self.inner.socket.start()?;

        let broker = self.clone();
        let pump = tokio::spawn(async move {
            while let Some((message, src)) = rx.recv().await {
                broker.handle_inbound(&message, src).await;
            }
        });

        let broker = self.clone();
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(broker.inner.config.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                broker.sweep();
            }
        });

        let mut tasks = self.inner.tasks.lock();
        tasks.push(pump);
        tasks.push(sweeper);
        Ok(())
    }

    /// Stop background tasks and the transport. Idempotent.
    pub fn stop(&self) {
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
        self.inner.socket.stop();
    }

    /// One pass of the dead-module sweep. Returns true when a new death was
    /// found.
    pub fn sweep(&self) -> bool {
        let now = self.now_us();
        let online = self.inner.flags.cloud_online();
        let mut registry = self.inner.registry.lock();
        let mut unit_info = self.inner.unit_info.lock();
        sweep_dead_modules(
            &mut registry,
            now,
            &*self.inner.hooks.alerts,
            &self.inner.flags,
            &mut unit_info,
            online,
        )
    }

    /// The broker's own identity message.
    pub fn identity_json(&self, resend: bool) -> Value {
        let identity = &self.inner.config.identity;

        let mut ms = Map::new();
        ms.insert(ID_FIELD_MODULE_ID.into(), json!(identity.module_id));
        ms.insert(ID_FIELD_MODULE_CLASS.into(), json!(identity.module_class));
        ms.insert(ID_FIELD_MESSAGE_FILTER.into(), json!(identity.message_filter));
        ms.insert(ID_FIELD_FEATURES.into(), json!(identity.features));
        ms.insert(ID_FIELD_MODULE_KEY.into(), json!(identity.module_key.as_str()));
        ms.insert(
            ID_FIELD_PARTY_RECORD.into(),
            json!({
                PARTY_FIELD_ID: identity.party_id.as_str(),
                PARTY_FIELD_GROUP: identity.group_id,
            }),
        );
        ms.insert(ID_FIELD_VERSION.into(), json!(identity.version));
        ms.insert(
            ID_FIELD_SOCKET_STATUS.into(),
            json!(self.inner.cloud_status.lock().code()),
        );
        ms.insert(ID_FIELD_RESEND.into(), json!(resend));

        let mut envelope = Map::new();
        envelope.insert(FIELD_ROUTING_TYPE.into(), json!(ROUTING_INTERMODULE));
        envelope.insert(FIELD_MESSAGE_TYPE.into(), json!(TYPE_MODULE_ID));
        envelope.insert(FIELD_MESSAGE_CMD.into(), Value::Object(ms));
        Value::Object(envelope)
    }

    /// Cloud connection status changed: remember it and push the broker
    /// identity to every registered module so they can react.
    pub async fn on_cloud_connection(&self, status: CloudStatus) {
        *self.inner.cloud_status.lock() = status;
        self.inner.flags.set_cloud_online(status.is_online());

        let message = self.identity_json(false).to_string();
        let addresses = self.inner.registry.lock().all_addresses();
        for addr in addresses {
            if let Err(e) = self.inner.socket.send_to(message.as_bytes(), addr).await {
                tracing::warn!(%addr, "identity push failed: {}", e);
            }
        }
    }

    /// All camera devices across all camera modules, in wire form.
    pub fn camera_list_json(&self) -> Value {
        self.inner.registry.lock().cameras.camera_list_json()
    }

    /// Diagnostics snapshot of the registry.
    pub fn module_list_json(&self) -> Value {
        self.inner.registry.lock().module_list_json()
    }

    /// Last known vehicle location snapshot.
    pub fn unit_location(&self) -> UnitLocation {
        self.inner.unit_location.lock().clone()
    }

    /// Latest vehicle identity snapshot.
    pub fn unit_info(&self) -> UnitInfo {
        self.inner.unit_info.lock().clone()
    }

    pub(crate) fn now_us(&self) -> u64 {
        self.inner.clock.now_us()
    }

    pub(crate) async fn send_raw(&self, message: &[u8], dest: SocketAddr) {
        if let Err(e) = self.inner.socket.send_to(message, dest).await {
            tracing::warn!(%dest, "send failed: {}", e);
        }
    }
}
