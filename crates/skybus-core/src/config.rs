//! Broker configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::{ModuleKey, PartyId, MODULE_CLASS_COMM};

/// Identity the broker announces to modules as its own identity message.
#[derive(Clone, Debug)]
pub struct BrokerIdentity {
    /// Logical module id of the broker itself, e.g. "Communicator_Main".
    pub module_id: String,
    /// Always a "comm"-class module.
    pub module_class: String,
    /// Message types the broker itself wants from the cloud side.
    pub message_filter: Vec<u32>,
    /// Capability strings, usually empty for the broker.
    pub features: Vec<String>,
    /// Instance GUID, unique per broker instance.
    pub module_key: ModuleKey,
    pub version: String,
    pub party_id: PartyId,
    pub group_id: String,
}

impl Default for BrokerIdentity {
    fn default() -> Self {
        BrokerIdentity {
            module_id: "Communicator".to_string(),
            module_class: MODULE_CLASS_COMM.to_string(),
            message_filter: Vec::new(),
            features: Vec::new(),
            module_key: ModuleKey::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            party_id: PartyId::default(),
            group_id: String::new(),
        }
    }
}

/// Broker tuning knobs. Bind/target addresses are supplied at the call sites
/// that construct the transport.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    pub identity: BrokerIdentity,
    /// Interval of the dead-module sweep.
    pub sweep_interval: Duration,
    /// Partial reassembly buffers older than this are discarded.
    pub reassembly_timeout: Duration,
    /// Where inbound image captures are persisted before cloud forwarding.
    pub image_capture_path: PathBuf,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            identity: BrokerIdentity::default(),
            sweep_interval: Duration::from_secs(1),
            reassembly_timeout: Duration::from_secs(5),
            image_capture_path: PathBuf::from("img.jpg"),
        }
    }
}
