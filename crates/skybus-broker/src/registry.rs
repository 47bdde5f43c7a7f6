//! Module registry and the registration protocol
//!
//! One entry per module id for the lifetime of the process. Entries are
//! created on the first identity message, updated in place afterwards, and
//! never deleted; death is a flag the sweeper sets and any received message
//! clears. A restart is detected by a changed instance timestamp, not by
//! replacing the entry, so the module key and accumulated subscriptions
//! survive.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::SocketAddr;

use serde_json::{json, Value};

use skybus_core::{
    LicenseStatus, ModuleId, ModuleKey, Severity, SubsystemFlags, UnitInfo,
    ID_FIELD_FEATURES, ID_FIELD_HARDWARE_ID, ID_FIELD_HARDWARE_TYPE,
    ID_FIELD_INSTANCE_TIMESTAMP, ID_FIELD_MESSAGE_FILTER, ID_FIELD_MODULE_CLASS,
    ID_FIELD_MODULE_ID, ID_FIELD_MODULE_KEY, ID_FIELD_RESEND, ID_FIELD_VERSION,
    MODULE_CLASS_CAMERA, MODULE_CLASS_FCB,
};

use crate::camera::CameraIndex;
use crate::hooks::{AlertSink, Authenticator};
use crate::subscriptions::SubscriptionIndex;

/// One registered peer.
#[derive(Clone, Debug)]
pub struct ModuleEntry {
    pub module_id: ModuleId,
    pub module_key: ModuleKey,
    pub module_class: String,
    pub features: Vec<String>,
    pub hardware_serial: Option<String>,
    pub hardware_type: i64,
    pub version: String,
    pub license: LicenseStatus,
    /// A license-bad peer triggers exactly one fan-out alert.
    pub license_alerted: bool,
    pub last_access_time: u64,
    pub is_dead: bool,
    pub instance_timestamp: Option<i64>,
    pub address: SocketAddr,
}

impl ModuleEntry {
    pub fn is_class(&self, class_prefix: &str) -> bool {
        self.module_class.starts_with(class_prefix)
    }
}

/// Outcome of one registration message, consumed by the dispatcher.
#[derive(Debug, Default)]
pub struct RegistrationEffect {
    /// A subscription or vehicle permission actually changed; the broker
    /// identity should be re-announced to the cloud.
    pub changed: bool,
    /// The module asked for the broker's identity in reply.
    pub resend_requested: bool,
}

/// Shared mutable state of the registration lock domain: module entries plus
/// the two derived indexes maintained during registration.
#[derive(Debug, Default)]
pub struct RegistryState {
    pub modules: HashMap<ModuleId, ModuleEntry>,
    pub subscriptions: SubscriptionIndex,
    pub cameras: CameraIndex,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one identity payload. Returns None when the payload has no
    /// module id (dropped like any malformed message).
    #[allow(clippy::too_many_arguments)]
    pub fn register_or_update(
        &mut self,
        cmd: &Value,
        src: SocketAddr,
        now_us: u64,
        auth: &dyn Authenticator,
        alerts: &dyn AlertSink,
        flags: &SubsystemFlags,
        unit_info: &mut UnitInfo,
    ) -> Option<RegistrationEffect> {
        let module_id = ModuleId::new(cmd[ID_FIELD_MODULE_ID].as_str()?);
        let mut effect = RegistrationEffect::default();

        let (module_class, features) = match self.modules.entry(module_id.clone()) {
            Entry::Vacant(slot) => {
                let mut entry = ModuleEntry {
                    module_id: module_id.clone(),
                    module_key: ModuleKey::new(
                        cmd[ID_FIELD_MODULE_KEY].as_str().unwrap_or_default(),
                    ),
                    module_class: cmd[ID_FIELD_MODULE_CLASS]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                    features: parse_features(&cmd[ID_FIELD_FEATURES]),
                    hardware_serial: cmd[ID_FIELD_HARDWARE_ID].as_str().map(str::to_string),
                    hardware_type: cmd[ID_FIELD_HARDWARE_TYPE].as_i64().unwrap_or(0),
                    version: cmd[ID_FIELD_VERSION].as_str().unwrap_or("na").to_string(),
                    license: LicenseStatus::NoData,
                    license_alerted: false,
                    last_access_time: now_us,
                    is_dead: false,
                    instance_timestamp: cmd[ID_FIELD_INSTANCE_TIMESTAMP].as_i64(),
                    address: src,
                };

                if entry.hardware_serial.is_some() {
                    check_license(&mut entry, auth, alerts);
                }

                tracing::info!(module = %entry.module_id, class = %entry.module_class, "module registered");
                let info = (entry.module_class.clone(), entry.features.clone());
                slot.insert(entry);
                info
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                entry.is_dead = false;

                let timestamp = cmd[ID_FIELD_INSTANCE_TIMESTAMP].as_i64();
                if timestamp.is_some() && entry.instance_timestamp != timestamp {
                    // Restarted instance: same id, same key, fresh timestamp.
                    entry.version =
                        cmd[ID_FIELD_VERSION].as_str().unwrap_or("na").to_string();
                    entry.instance_timestamp = timestamp;
                    alerts.notify(
                        Severity::Alert,
                        &format!("Module {} has been restarted.", entry.module_id),
                    );
                    tracing::warn!(module = %entry.module_id, "module restarted");
                }

                if entry.license == LicenseStatus::NotVerified {
                    // The authenticator was not ready last time; retry.
                    check_license(entry, auth, alerts);
                }

                entry.last_access_time = now_us;
                entry.address = src;
                (entry.module_class.clone(), entry.features.clone())
            }
        };

        effect.changed |= self
            .subscriptions
            .subscribe_all(&module_id, &cmd[ID_FIELD_MESSAGE_FILTER]);

        if module_class.starts_with(MODULE_CLASS_CAMERA) {
            self.cameras.update_from_payload(&module_id, cmd, now_us);
            flags.set_camera_connected(true);
        } else if module_class.starts_with(MODULE_CLASS_FCB) {
            unit_info.use_fcb = true;
            flags.set_fcb_connected(true);
        }

        for feature in &features {
            effect.changed |= unit_info.permissions.merge_feature(feature);
        }

        effect.resend_requested = cmd[ID_FIELD_RESEND].as_bool().unwrap_or(false);

        Some(effect)
    }

    pub fn get(&self, module_id: &ModuleId) -> Option<&ModuleEntry> {
        self.modules.get(module_id)
    }

    /// Snapshot of every registered module's address, for broadcast pushes.
    pub fn all_addresses(&self) -> Vec<SocketAddr> {
        self.modules.values().map(|m| m.address).collect()
    }

    /// Diagnostics view of the registry.
    pub fn module_list_json(&self) -> Value {
        let list: Vec<Value> = self
            .modules
            .values()
            .map(|m| {
                json!({
                    "v": m.version,
                    "i": m.module_id.as_str(),
                    "c": m.module_class,
                    "t": m.instance_timestamp,
                    "d": m.is_dead,
                })
            })
            .collect();
        Value::Array(list)
    }
}

fn parse_features(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|features| {
            features
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Resolve the license state against the authenticator. Leaves the module
/// NotVerified when the backend is unreachable so a later registration can
/// retry.
fn check_license(entry: &mut ModuleEntry, auth: &dyn Authenticator, alerts: &dyn AlertSink) {
    let Some(serial) = entry.hardware_serial.as_deref() else {
        entry.license = LicenseStatus::NoData;
        return;
    };

    if !auth.is_ready() {
        tracing::warn!(module = %entry.module_id, "module license could not be verified");
        entry.license = LicenseStatus::NotVerified;
        return;
    }

    if auth.validate_hardware(serial, entry.hardware_type) {
        tracing::info!(module = %entry.module_id, "module license OK");
        entry.license = LicenseStatus::VerifiedOk;
    } else {
        tracing::error!(module = %entry.module_id, "module license invalid");
        entry.license = LicenseStatus::VerifiedBad;
        alerts.notify(
            Severity::Alert,
            &format!("Module {} is not allowed to run.", entry.module_id),
        );
    }
}
