//! Process-wide vehicle snapshots
//!
//! Any module may report vehicle location or unit identity; the broker keeps
//! the latest snapshot and stamps it into outbound commands (image capture)
//! and the cloud identity announcement.

use serde_json::Value;

/// Last known vehicle location, as reported by whichever module owns motion
/// data. Coordinates are integer degrees*1e7, altitudes in millimetres.
#[derive(Clone, Debug, Default)]
pub struct UnitLocation {
    pub latitude: i64,
    pub longitude: i64,
    pub altitude: i64,
    pub altitude_relative: i64,
    pub h_acc: i64,
    pub yaw: i64,
    pub last_access_time: u64,
    pub is_new: bool,
    pub is_valid: bool,
}

impl UnitLocation {
    /// Overwrite the snapshot from a location-info payload. Returns false and
    /// leaves the snapshot untouched when a required field is missing.
    pub fn update_from(&mut self, ms: &Value, now_us: u64) -> bool {
        let (Some(la), Some(ln), Some(a)) =
            (ms["la"].as_i64(), ms["ln"].as_i64(), ms["a"].as_i64())
        else {
            return false;
        };

        self.latitude = la;
        self.longitude = ln;
        self.altitude = a;
        self.altitude_relative = ms["r"].as_i64().unwrap_or(0);
        self.h_acc = ms["ha"].as_i64().unwrap_or(0);
        self.yaw = ms["y"].as_i64().unwrap_or(0);
        self.last_access_time = now_us;
        self.is_new = true;
        self.is_valid = true;
        true
    }
}

/// Vehicle-level capabilities accumulated from module feature declarations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VehiclePermissions {
    pub telemetry_tx: bool,
    pub telemetry_rx: bool,
    pub video: bool,
    pub camera_control: bool,
}

impl VehiclePermissions {
    /// Merge one capability string ("T", "R", "V", "C"). Returns true when
    /// the permission set actually changed.
    pub fn merge_feature(&mut self, feature: &str) -> bool {
        let slot = match feature {
            "T" => &mut self.telemetry_tx,
            "R" => &mut self.telemetry_rx,
            "V" => &mut self.video,
            "C" => &mut self.camera_control,
            _ => return false,
        };
        let changed = !*slot;
        *slot = true;
        changed
    }
}

/// Aggregated vehicle identity as last reported by the flight-control module.
#[derive(Clone, Debug, Default)]
pub struct UnitInfo {
    pub vehicle_type: i64,
    pub flying_mode: i64,
    pub gps_mode: i64,
    pub use_fcb: bool,
    pub autopilot: i64,
    pub is_armed: bool,
    pub is_flying: bool,
    pub telemetry_protocol: i64,
    pub flying_last_start_time: i64,
    pub flying_total_duration: i64,
    pub is_tracking_mode: bool,
    pub manual_tx_blocked_mode: i64,
    pub is_gcs_blocked: bool,
    pub swarm_follower_formation: i64,
    pub swarm_leader_formation: i64,
    pub swarm_leader_i_am_following: String,
    pub permissions: VehiclePermissions,
}

impl UnitInfo {
    /// Overwrite the snapshot from a unit-identity payload. Fields absent
    /// from the payload keep serde_json defaults rather than stale values so
    /// the snapshot always mirrors the latest complete report.
    pub fn update_from(&mut self, ms: &Value) -> bool {
        let Some(vehicle_type) = ms["VT"].as_i64() else {
            return false;
        };

        self.vehicle_type = vehicle_type;
        self.flying_mode = ms["FM"].as_i64().unwrap_or(0);
        self.gps_mode = ms["GM"].as_i64().unwrap_or(0);
        self.use_fcb = ms["FI"].as_bool().unwrap_or(false);
        self.autopilot = ms["AP"].as_i64().unwrap_or(0);
        self.is_armed = ms["AR"].as_bool().unwrap_or(false);
        self.is_flying = ms["FL"].as_bool().unwrap_or(false);
        self.telemetry_protocol = ms["TP"].as_i64().unwrap_or(0);
        self.flying_last_start_time = ms["z"].as_i64().unwrap_or(0);
        self.flying_total_duration = ms["a"].as_i64().unwrap_or(0);
        self.is_tracking_mode = ms["b"].as_bool().unwrap_or(false);
        self.manual_tx_blocked_mode = ms["C"].as_i64().unwrap_or(0);
        self.is_gcs_blocked = ms["B"].as_bool().unwrap_or(false);
        self.swarm_follower_formation = ms["n"].as_i64().unwrap_or(0);
        self.swarm_leader_formation = ms["o"].as_i64().unwrap_or(0);
        self.swarm_leader_i_am_following =
            ms["q"].as_str().unwrap_or_default().to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_location_update() {
        let mut loc = UnitLocation::default();
        assert!(!loc.is_valid);

        let ms = json!({"la": 473977418, "ln": 85455938, "a": 540000, "r": 12000, "ha": 3, "y": 180});
        assert!(loc.update_from(&ms, 42));

        assert_eq!(loc.latitude, 473977418);
        assert_eq!(loc.yaw, 180);
        assert_eq!(loc.last_access_time, 42);
        assert!(loc.is_valid);
        assert!(loc.is_new);
    }

    #[test]
    fn test_location_update_rejects_partial_payload() {
        let mut loc = UnitLocation::default();
        assert!(!loc.update_from(&json!({"la": 1, "ln": 2}), 0));
        assert!(!loc.is_valid);
    }

    #[test]
    fn test_permissions_merge_reports_change() {
        let mut perms = VehiclePermissions::default();
        assert!(perms.merge_feature("T"));
        assert!(!perms.merge_feature("T"));
        assert!(perms.merge_feature("V"));
        assert!(!perms.merge_feature("X"));
        assert!(perms.telemetry_tx);
        assert!(perms.video);
        assert!(!perms.camera_control);
    }

    #[test]
    fn test_unit_info_update() {
        let mut info = UnitInfo::default();
        let ms = json!({
            "VT": 2, "FM": 3, "GM": 1, "FI": true, "AP": 3, "AR": true,
            "FL": false, "TP": 1, "z": 0, "a": 1200, "b": false, "C": 0,
            "B": false, "n": 1, "o": 0, "q": "leader-1"
        });
        assert!(info.update_from(&ms));
        assert!(info.is_armed);
        assert!(info.use_fcb);
        assert_eq!(info.swarm_leader_i_am_following, "leader-1");
    }
}
