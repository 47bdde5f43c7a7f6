//! Subsystem status flags
//!
//! One instance lives in the broker context and is shared with whatever
//! needs a cheap liveness view (fcb / camera module connected, cloud online).
//! Replaces a process-global status object with an explicitly passed handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared subsystem-online flags. Clone is cheap (Arc).
#[derive(Clone, Debug, Default)]
pub struct SubsystemFlags {
    inner: Arc<Flags>,
}

#[derive(Debug, Default)]
struct Flags {
    fcb_connected: AtomicBool,
    camera_connected: AtomicBool,
    cloud_online: AtomicBool,
}

impl SubsystemFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fcb_connected(&self, connected: bool) {
        self.inner.fcb_connected.store(connected, Ordering::Relaxed);
    }

    pub fn fcb_connected(&self) -> bool {
        self.inner.fcb_connected.load(Ordering::Relaxed)
    }

    pub fn set_camera_connected(&self, connected: bool) {
        self.inner
            .camera_connected
            .store(connected, Ordering::Relaxed);
    }

    pub fn camera_connected(&self) -> bool {
        self.inner.camera_connected.load(Ordering::Relaxed)
    }

    pub fn set_cloud_online(&self, online: bool) {
        self.inner.cloud_online.store(online, Ordering::Relaxed);
    }

    pub fn cloud_online(&self) -> bool {
        self.inner.cloud_online.load(Ordering::Relaxed)
    }
}
