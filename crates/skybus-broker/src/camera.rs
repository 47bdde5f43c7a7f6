//! Camera device index
//!
//! Camera modules report a complete device inventory with every identity
//! message. Devices absent from the latest snapshot have disappeared (most
//! likely the module restarted and minted new device ids), so they are
//! purged right after the upsert pass — the one place in the broker where
//! entries are actively deleted.

use std::collections::HashMap;

use serde_json::{json, Value};

use skybus_core::{
    ModuleId, CAM_FIELD_AVAILABLE, CAM_FIELD_DEVICE_TYPE, CAM_FIELD_ID,
    CAM_FIELD_LOGICAL_NAME, CAM_FIELD_RECORDING, CAM_FIELD_STREAMING,
    ID_FIELD_CAMERA_LIST,
};

/// One camera device owned by one camera module.
#[derive(Clone, Debug)]
pub struct CameraDeviceEntry {
    pub module_id: ModuleId,
    pub device_id: String,
    pub logical_name: String,
    pub is_recording: bool,
    pub is_available: bool,
    pub streaming: i64,
    pub device_type: i64,
    pub last_access_time: u64,
}

#[derive(Debug, Default)]
pub struct CameraIndex {
    by_module: HashMap<ModuleId, HashMap<String, CameraDeviceEntry>>,
}

impl CameraIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the devices of one module from its identity payload, then
    /// purge everything the snapshot no longer mentions.
    pub fn update_from_payload(&mut self, module_id: &ModuleId, cmd: &Value, now_us: u64) {
        let devices = self.by_module.entry(module_id.clone()).or_default();

        if let Some(entries) = cmd[ID_FIELD_CAMERA_LIST].as_array() {
            for entry in entries {
                let Some(device_id) = entry[CAM_FIELD_ID].as_str() else {
                    continue;
                };

                let device = devices
                    .entry(device_id.to_string())
                    .or_insert_with(|| CameraDeviceEntry {
                        module_id: module_id.clone(),
                        device_id: device_id.to_string(),
                        logical_name: String::new(),
                        is_recording: false,
                        is_available: false,
                        streaming: 0,
                        device_type: 0,
                        last_access_time: now_us,
                    });

                device.logical_name = entry[CAM_FIELD_LOGICAL_NAME]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                device.is_recording = entry[CAM_FIELD_RECORDING].as_bool().unwrap_or(false);
                device.is_available = entry[CAM_FIELD_AVAILABLE].as_bool().unwrap_or(false);
                device.streaming = entry[CAM_FIELD_STREAMING].as_i64().unwrap_or(0);
                device.device_type = entry[CAM_FIELD_DEVICE_TYPE].as_i64().unwrap_or(0);
                device.last_access_time = now_us;
            }
        }

        devices.retain(|_, device| device.last_access_time >= now_us);
    }

    /// All camera devices across all modules, in wire form.
    pub fn camera_list_json(&self) -> Value {
        let mut list = Vec::new();
        for devices in self.by_module.values() {
            for device in devices.values() {
                list.push(json!({
                    CAM_FIELD_AVAILABLE: device.is_available,
                    CAM_FIELD_LOGICAL_NAME: device.logical_name,
                    CAM_FIELD_ID: device.device_id,
                    CAM_FIELD_STREAMING: device.streaming,
                    CAM_FIELD_RECORDING: device.is_recording,
                    CAM_FIELD_DEVICE_TYPE: device.device_type,
                }));
            }
        }
        Value::Array(list)
    }

    pub fn device_count(&self) -> usize {
        self.by_module.values().map(HashMap::len).sum()
    }
}
