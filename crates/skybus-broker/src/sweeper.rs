//! Dead-module sweep
//!
//! Runs on a fixed interval from the broker. A module that stayed silent
//! past [`MODULE_TIMEOUT_US`] is marked dead exactly once; fcb/camera deaths
//! also clear the matching subsystem flag. The dead-to-alive branch is
//! defensive: any received message already resurrects the entry, so the
//! sweeper seeing it means traffic arrived between sweeps without a sweep
//! observing the dead state.

use skybus_core::{
    Severity, SubsystemFlags, UnitInfo, MODULE_CLASS_CAMERA, MODULE_CLASS_FCB,
    MODULE_TIMEOUT_US,
};

use crate::hooks::AlertSink;
use crate::registry::RegistryState;

/// Scan for silent modules. Returns true when a new death was found;
/// already-dead modules do not count.
pub fn sweep_dead_modules(
    state: &mut RegistryState,
    now_us: u64,
    alerts: &dyn AlertSink,
    flags: &SubsystemFlags,
    unit_info: &mut UnitInfo,
    broker_online: bool,
) -> bool {
    let mut dead_found = false;

    for entry in state.modules.values_mut() {
        let silent_for = now_us.saturating_sub(entry.last_access_time);

        if silent_for > MODULE_TIMEOUT_US {
            if entry.is_dead {
                continue;
            }
            entry.is_dead = true;
            dead_found = true;

            if broker_online {
                alerts.notify(
                    Severity::Emergency,
                    &format!("Module {} is not responding.", entry.module_id),
                );
            }
            tracing::error!(module = %entry.module_id, "module is not responding");

            if entry.is_class(MODULE_CLASS_FCB) {
                unit_info.use_fcb = false;
                flags.set_fcb_connected(false);
            } else if entry.is_class(MODULE_CLASS_CAMERA) {
                flags.set_camera_connected(false);
            }
        } else if entry.is_dead {
            entry.is_dead = false;
            if broker_online {
                alerts.notify(
                    Severity::Notice,
                    &format!("Module {} is back online.", entry.module_id),
                );
            }
            tracing::warn!(module = %entry.module_id, "module is back online");
        }
    }

    dead_found
}
