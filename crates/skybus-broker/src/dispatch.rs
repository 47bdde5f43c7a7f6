//! Inbound message state machine
//!
//! Every reassembled datagram lands here. Malformed messages are dropped
//! silently; there is no error channel back to a UDP peer. Message kinds the
//! broker understands get handled inline, everything else either fans out to
//! subscribers, relays to the cloud, or both.

use std::net::SocketAddr;

use serde_json::{json, Value};

use skybus_core::{
    Severity, LicenseStatus, P2P_ACTION_CONNECT_TO_MAC, TYPE_EXTERNAL_GEOFENCE,
    TYPE_IMAGE, TYPE_SYSTEM_LOAD_TASKS, TYPE_UPLOAD_WAYPOINTS,
};
use skybus_wire::{is_binary, split_at_nul, Envelope, MessageKind};

use crate::broker::Broker;
use crate::hooks::TaskScope;

impl Broker {
    /// Entry point for one reassembled datagram.
    pub async fn handle_inbound(&self, message: &[u8], src: SocketAddr) {
        // The JSON envelope ends at the first NUL; anything after is an
        // opaque binary tail some kinds carry.
        let (json_part, _) = split_at_nul(message);
        let envelope = match Envelope::parse(json_part) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(%src, "dropping malformed datagram: {}", e);
                return;
            }
        };

        match MessageKind::from_type(envelope.message_type) {
            MessageKind::ModuleId => self.handle_module_identity(&envelope, src).await,
            MessageKind::ModuleRemoteExecute => self.handle_remote_execute(&envelope),
            MessageKind::ModuleLocationInfo => {
                let now = self.now_us();
                self.inner.unit_location.lock().update_from(envelope.cmd(), now);
            }
            MessageKind::UnitIdentity => self.handle_unit_identity(&envelope),
            MessageKind::Image => self.handle_image(&envelope, message),
            MessageKind::P2pAction => self.handle_p2p_action(&envelope),
            MessageKind::SwarmRelay => self.handle_swarm_relay(&envelope, message),
            MessageKind::Opaque(_) => self.handle_opaque(&envelope, message).await,
        }
    }

    /// Fan a message out to every live, licensed subscriber of its type,
    /// skipping the module that originated it. Public because the cloud
    /// client pushes server-received messages through the same path.
    pub async fn dispatch_to_subscribers(
        &self,
        message_type: u32,
        message: &[u8],
        sender_module_key: &str,
    ) {
        let _serialized = self.inner.fanout.lock().await;

        let targets: Vec<SocketAddr> = {
            let mut registry = self.inner.registry.lock();
            let state = &mut *registry;

            let mut targets = Vec::new();
            for module_id in state.subscriptions.subscribers(message_type) {
                let Some(entry) = state.modules.get_mut(module_id) else {
                    tracing::error!(module = %module_id, message_type, "subscribed module is not available");
                    continue;
                };
                if entry.license == LicenseStatus::VerifiedBad {
                    if !entry.license_alerted {
                        entry.license_alerted = true;
                        self.inner.hooks.alerts.notify(
                            Severity::Alert,
                            &format!("Module {} is not allowed to run.", entry.module_id),
                        );
                    }
                    continue;
                }
                if entry.is_dead {
                    continue;
                }
                if entry.module_key.matches(sender_module_key) {
                    continue; // never echo a message back to its origin
                }
                targets.push(entry.address);
            }
            targets
        };

        for addr in targets {
            self.send_raw(message, addr).await;
        }
    }

    async fn handle_module_identity(&self, envelope: &Envelope, src: SocketAddr) {
        let now = self.now_us();
        let effect = {
            let mut registry = self.inner.registry.lock();
            let mut unit_info = self.inner.unit_info.lock();
            registry.register_or_update(
                envelope.cmd(),
                src,
                now,
                &*self.inner.hooks.auth,
                &*self.inner.hooks.alerts,
                &self.inner.flags,
                &mut unit_info,
            )
        };
        let Some(effect) = effect else { return };

        if effect.changed {
            self.inner
                .hooks
                .cloud
                .announce_identity(envelope.target_id.as_deref());
        }
        if effect.resend_requested {
            let reply = self.identity_json(false).to_string();
            self.send_raw(reply.as_bytes(), src).await;
        }
    }

    /// Module-directed command for the broker itself. Never forwarded.
    fn handle_remote_execute(&self, envelope: &Envelope) {
        let Some(command) = envelope.cmd()["C"].as_u64() else {
            return;
        };

        if command as u32 == TYPE_SYSTEM_LOAD_TASKS {
            let cloud = &self.inner.hooks.cloud;
            cloud.load_tasks_by_scope(TaskScope::Group, TYPE_EXTERNAL_GEOFENCE);
            cloud.load_tasks_by_scope(TaskScope::Group, TYPE_UPLOAD_WAYPOINTS);
        }
    }

    fn handle_unit_identity(&self, envelope: &Envelope) {
        if self.inner.unit_info.lock().update_from(envelope.cmd()) {
            self.inner.hooks.cloud.announce_identity(None);
        }
    }

    fn handle_image(&self, envelope: &Envelope, message: &[u8]) {
        let (_, binary) = split_at_nul(message);
        let binary = binary.unwrap_or_default();
        let target = envelope.target_id.as_deref();

        if !envelope.is_intermodule() {
            if let Err(e) = std::fs::write(&self.inner.config.image_capture_path, binary) {
                tracing::warn!("image capture write failed: {}", e);
            }
            self.inner
                .hooks
                .cloud
                .send_binary_command(target, TYPE_IMAGE, binary, Value::Null);
            return;
        }

        // Intermodule copy: stamp the last known location into the command
        // before forwarding, if we have one.
        let location = self.inner.unit_location.lock().clone();
        if !location.is_valid {
            return;
        }

        let mut cmd = envelope.cmd().clone();
        cmd["prv"] = json!("gps");
        cmd["lat"] = json!(location.latitude);
        cmd["lng"] = json!(location.longitude);
        cmd["alt"] = json!(location.altitude);
        cmd["tim"] = json!(self.now_us());
        self.inner
            .hooks
            .cloud
            .send_binary_command(target, TYPE_IMAGE, binary, cmd);
    }

    fn handle_p2p_action(&self, envelope: &Envelope) {
        let cmd = envelope.cmd();
        if cmd["a"].as_i64() != Some(P2P_ACTION_CONNECT_TO_MAC) {
            return;
        }
        if let Some(party) = cmd["int_prty"].as_str() {
            self.inner.hooks.p2p.connect_to_mesh(party);
        }
    }

    /// Swarm payloads prefer the direct mesh route; the cloud is the
    /// fallback when no route exists.
    fn handle_swarm_relay(&self, envelope: &Envelope, message: &[u8]) {
        let target = envelope.target_id.as_deref();
        if self.inner.hooks.p2p.relay_swarm(target, message) {
            return;
        }
        self.inner.hooks.cloud.relay_raw(
            message,
            envelope.is_system(),
            is_binary(message),
            target,
            envelope.message_type,
            envelope.cmd(),
        );
    }

    /// Types the broker does not interpret. A sender-key field marks a
    /// module-originated message that must reach local subscribers;
    /// everything except intermodule-only traffic also relays to the cloud.
    async fn handle_opaque(&self, envelope: &Envelope, message: &[u8]) {
        if let Some(sender_key) = envelope.sender_module_key.as_deref() {
            self.dispatch_to_subscribers(envelope.message_type, message, sender_key)
                .await;
        }

        if envelope.is_intermodule() {
            return;
        }

        self.inner.hooks.cloud.relay_raw(
            message,
            envelope.is_system(),
            is_binary(message),
            envelope.target_id.as_deref(),
            envelope.message_type,
            envelope.cmd(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Collaborators;
    use crate::hooks::test_doubles::{
        RecordingAlerts, RecordingCloud, RecordingP2p, StaticAuth,
    };
    use skybus_core::{BrokerConfig, CloudStatus, LicenseStatus, ModuleId};
    use skybus_transport::ChunkSocket;
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        broker: Broker,
        cloud: Arc<RecordingCloud>,
        alerts: Arc<RecordingAlerts>,
        p2p: Arc<RecordingP2p>,
    }

    async fn harness_with(auth: StaticAuth, p2p: RecordingP2p) -> Harness {
        let cloud = Arc::new(RecordingCloud::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let p2p = Arc::new(p2p);

        let config = BrokerConfig {
            image_capture_path: std::env::temp_dir()
                .join(format!("skybus-img-{}.jpg", std::process::id())),
            ..Default::default()
        };

        let broker = Broker::bind(
            "127.0.0.1:0".parse().unwrap(),
            config,
            Collaborators {
                cloud: cloud.clone(),
                auth: Arc::new(auth),
                alerts: alerts.clone(),
                p2p: p2p.clone(),
            },
        )
        .await
        .unwrap();

        Harness { broker, cloud, alerts, p2p }
    }

    async fn harness() -> Harness {
        harness_with(
            StaticAuth { ready: true, valid: true },
            RecordingP2p::default(),
        )
        .await
    }

    /// A module endpoint: real socket plus the identity datagram that
    /// registers it with the broker.
    struct TestModule {
        socket: ChunkSocket,
        rx: skybus_transport::MessageReceiver,
    }

    impl TestModule {
        async fn bind() -> Self {
            let socket =
                ChunkSocket::bind("127.0.0.1:0".parse().unwrap(), Duration::from_secs(5))
                    .await
                    .unwrap();
            let rx = socket.start().unwrap();
            TestModule { socket, rx }
        }

        fn addr(&self) -> SocketAddr {
            self.socket.local_addr()
        }

        async fn recv(&mut self) -> Vec<u8> {
            tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .expect("timed out waiting for forwarded message")
                .expect("channel closed")
                .0
        }

        async fn expect_silence(&mut self) {
            let outcome =
                tokio::time::timeout(Duration::from_millis(200), self.rx.recv()).await;
            assert!(outcome.is_err(), "expected no message, got one");
        }
    }

    fn identity(module_id: &str, filter: &[u32], resend: bool) -> Vec<u8> {
        json!({
            "ty": "uv",
            "mt": 9100,
            "ms": {
                "a": module_id,
                "b": "gen",
                "c": filter,
                "d": [],
                "e": format!("KEY-{module_id}"),
                "u": 1,
                "z": resend,
            },
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn test_subscriber_receives_exactly_one_copy() {
        let h = harness().await;
        let mut gen1 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[9001], false), gen1.addr())
            .await;

        let msg = json!({"ty": "g", "mt": 9001, "GU": "other-key", "ms": {"n": 1}})
            .to_string()
            .into_bytes();
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        assert_eq!(gen1.recv().await, msg);
        gen1.expect_silence().await;
    }

    #[tokio::test]
    async fn test_unsubscribed_type_not_delivered() {
        let h = harness().await;
        let mut gen1 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[9001], false), gen1.addr())
            .await;

        let msg = json!({"ty": "g", "mt": 1002, "GU": "other-key", "ms": {}})
            .to_string()
            .into_bytes();
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        gen1.expect_silence().await;
    }

    #[tokio::test]
    async fn test_no_echo_to_originating_module() {
        let h = harness().await;
        let mut gen1 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[2022], false), gen1.addr())
            .await;

        let msg = json!({"ty": "uv", "mt": 2022, "GU": "KEY-gen1", "ms": {}})
            .to_string()
            .into_bytes();
        h.broker.handle_inbound(&msg, gen1.addr()).await;

        gen1.expect_silence().await;
    }

    #[tokio::test]
    async fn test_cloud_path_dispatch_preserves_body() {
        // Scenario: gen1 subscribed to 9001, a grp datagram arrives via the
        // cloud collaborator path.
        let h = harness().await;
        let mut gen1 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[9001], false), gen1.addr())
            .await;

        let msg = json!({"ty": "g", "mt": 9001, "ms": {"payload": [1, 2, 3]}})
            .to_string()
            .into_bytes();
        h.broker.dispatch_to_subscribers(9001, &msg, "").await;

        assert_eq!(gen1.recv().await, msg);
        gen1.expect_silence().await;
    }

    #[tokio::test]
    async fn test_dead_module_skipped() {
        let h = harness().await;
        let mut gen1 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[9001], false), gen1.addr())
            .await;
        h.broker
            .inner
            .registry
            .lock()
            .modules
            .get_mut(&ModuleId::new("gen1"))
            .unwrap()
            .is_dead = true;

        h.broker.dispatch_to_subscribers(9001, b"{\"x\":1}", "").await;
        gen1.expect_silence().await;
    }

    #[tokio::test]
    async fn test_license_bad_module_skipped_with_one_alert() {
        let h = harness().await;
        let mut gen1 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[9001], false), gen1.addr())
            .await;
        h.broker
            .inner
            .registry
            .lock()
            .modules
            .get_mut(&ModuleId::new("gen1"))
            .unwrap()
            .license = LicenseStatus::VerifiedBad;

        h.broker.dispatch_to_subscribers(9001, b"{\"x\":1}", "").await;
        h.broker.dispatch_to_subscribers(9001, b"{\"x\":2}", "").await;
        gen1.expect_silence().await;

        let events = h.alerts.events.lock();
        assert_eq!(events.len(), 1);
        assert!(events[0].1.contains("not allowed"));
    }

    #[tokio::test]
    async fn test_registration_announces_identity_when_changed() {
        let h = harness().await;
        let gen1 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[9001], false), gen1.addr())
            .await;
        assert_eq!(h.cloud.announced.lock().len(), 1);

        // Unchanged re-registration: no re-announcement.
        h.broker
            .handle_inbound(&identity("gen1", &[9001], false), gen1.addr())
            .await;
        assert_eq!(h.cloud.announced.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_resend_flag_gets_identity_reply() {
        let h = harness().await;
        let mut gen1 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[], true), gen1.addr())
            .await;

        let reply = gen1.recv().await;
        let parsed: serde_json::Value = serde_json::from_slice(&reply).unwrap();
        assert_eq!(parsed["mt"], 9100);
        assert_eq!(parsed["ty"], "uv");
        assert_eq!(parsed["ms"]["z"], false);
        assert_eq!(parsed["ms"]["b"], "comm");
    }

    #[tokio::test]
    async fn test_remote_execute_loads_tasks() {
        let h = harness().await;

        let msg = json!({"ty": "uv", "mt": 9101, "ms": {"C": 9001}})
            .to_string()
            .into_bytes();
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        let tasks = h.cloud.tasks.lock();
        assert_eq!(
            *tasks,
            vec![
                (TaskScope::Group, TYPE_EXTERNAL_GEOFENCE),
                (TaskScope::Group, TYPE_UPLOAD_WAYPOINTS),
            ]
        );
        // Never forwarded onward.
        assert!(h.cloud.relayed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_location_info_updates_snapshot() {
        let h = harness().await;

        let msg = json!({
            "ty": "uv", "mt": 9102,
            "ms": {"la": 10, "ln": 20, "a": 30, "r": 5, "ha": 1, "y": 90},
        })
        .to_string()
        .into_bytes();
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        let location = h.broker.unit_location();
        assert!(location.is_valid);
        assert_eq!(location.latitude, 10);
        assert_eq!(location.yaw, 90);
    }

    #[tokio::test]
    async fn test_unit_identity_reannounces() {
        let h = harness().await;

        let msg = json!({
            "ty": "uv", "mt": 1004,
            "ms": {
                "VT": 2, "FM": 1, "GM": 0, "FI": true, "AP": 3, "AR": true,
                "FL": true, "TP": 1, "z": 0, "a": 0, "b": false, "C": 0,
                "B": false, "n": 0, "o": 0, "q": "",
            },
        })
        .to_string()
        .into_bytes();
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        assert!(h.broker.unit_info().is_armed);
        assert_eq!(h.cloud.announced.lock().as_slice(), &[None]);
    }

    #[tokio::test]
    async fn test_image_from_outside_persisted_and_forwarded() {
        let h = harness().await;

        let mut msg = json!({"ty": "i", "tg": "gcs-1", "mt": 1006, "ms": {}})
            .to_string()
            .into_bytes();
        msg.push(0);
        msg.extend_from_slice(b"\xFF\xD8jpegbytes");
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        let binary = h.cloud.binary.lock();
        assert_eq!(binary.len(), 1);
        assert_eq!(binary[0].message_type, TYPE_IMAGE);
        assert_eq!(binary[0].target.as_deref(), Some("gcs-1"));
        assert_eq!(binary[0].payload, b"\xFF\xD8jpegbytes");

        let captured = std::fs::read(&h.broker.inner.config.image_capture_path).unwrap();
        assert_eq!(captured, b"\xFF\xD8jpegbytes");
    }

    #[tokio::test]
    async fn test_intermodule_image_stamped_with_location() {
        let h = harness().await;

        let loc = json!({
            "ty": "uv", "mt": 9102,
            "ms": {"la": 111, "ln": 222, "a": 333, "r": 0, "ha": 0, "y": 0},
        })
        .to_string()
        .into_bytes();
        h.broker.handle_inbound(&loc, "127.0.0.1:5999".parse().unwrap()).await;

        let mut msg = json!({"ty": "uv", "mt": 1006, "ms": {"w": 640}})
            .to_string()
            .into_bytes();
        msg.push(0);
        msg.extend_from_slice(b"imagedata");
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        let binary = h.cloud.binary.lock();
        assert_eq!(binary.len(), 1);
        assert_eq!(binary[0].cmd["prv"], "gps");
        assert_eq!(binary[0].cmd["lat"], 111);
        assert_eq!(binary[0].cmd["lng"], 222);
        assert_eq!(binary[0].cmd["alt"], 333);
        assert_eq!(binary[0].cmd["w"], 640);
        assert_eq!(binary[0].payload, b"imagedata");
    }

    #[tokio::test]
    async fn test_intermodule_image_without_location_dropped() {
        let h = harness().await;

        let mut msg = json!({"ty": "uv", "mt": 1006, "ms": {}})
            .to_string()
            .into_bytes();
        msg.push(0);
        msg.extend_from_slice(b"imagedata");
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        assert!(h.cloud.binary.lock().is_empty());
    }

    #[tokio::test]
    async fn test_p2p_connect_action() {
        let h = harness().await;

        let msg = json!({"ty": "uv", "mt": 6505, "ms": {"a": 2, "int_prty": "party-9"}})
            .to_string()
            .into_bytes();
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        assert_eq!(h.p2p.connects.lock().as_slice(), &["party-9".to_string()]);
    }

    #[tokio::test]
    async fn test_swarm_relay_prefers_mesh() {
        let h = harness_with(
            StaticAuth { ready: true, valid: true },
            RecordingP2p { has_route: true, ..Default::default() },
        )
        .await;

        let mut msg = json!({"ty": "i", "tg": "drone-2", "mt": 6503, "ms": {}})
            .to_string()
            .into_bytes();
        msg.push(0);
        msg.extend_from_slice(b"mavlink");
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        assert_eq!(h.p2p.relayed.lock().len(), 1);
        assert!(h.cloud.relayed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_swarm_relay_falls_back_to_cloud() {
        let h = harness().await; // default p2p double has no route

        let mut msg = json!({"ty": "i", "tg": "drone-2", "mt": 6503, "ms": {}})
            .to_string()
            .into_bytes();
        msg.push(0);
        msg.extend_from_slice(b"mavlink");
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        let relayed = h.cloud.relayed.lock();
        assert_eq!(relayed.len(), 1);
        assert_eq!(relayed[0].message, msg);
        assert_eq!(relayed[0].target.as_deref(), Some("drone-2"));
        assert!(relayed[0].is_binary);
    }

    #[tokio::test]
    async fn test_opaque_intermodule_not_relayed_to_cloud() {
        let h = harness().await;
        let mut gen1 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[2022], false), gen1.addr())
            .await;

        let msg = json!({"ty": "uv", "mt": 2022, "GU": "other", "ms": {}})
            .to_string()
            .into_bytes();
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        assert_eq!(gen1.recv().await, msg);
        assert!(h.cloud.relayed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_opaque_group_relayed_to_cloud() {
        let h = harness().await;

        let msg = json!({"ty": "g", "mt": 2022, "ms": {"t": 1}})
            .to_string()
            .into_bytes();
        h.broker.handle_inbound(&msg, "127.0.0.1:5999".parse().unwrap()).await;

        let relayed = h.cloud.relayed.lock();
        assert_eq!(relayed.len(), 1);
        assert_eq!(relayed[0].message_type, 2022);
        assert!(!relayed[0].is_binary);
        assert!(relayed[0].target.is_none());
    }

    #[tokio::test]
    async fn test_malformed_datagrams_dropped() {
        let h = harness().await;
        let src: SocketAddr = "127.0.0.1:5999".parse().unwrap();

        h.broker.handle_inbound(b"not json at all", src).await;
        h.broker.handle_inbound(b"{\"mt\": 9100}", src).await; // no routing type
        h.broker.handle_inbound(b"{\"ty\": \"uv\"}", src).await; // no message type

        assert!(h.cloud.relayed.lock().is_empty());
        assert!(h.broker.inner.registry.lock().modules.is_empty());
    }

    #[tokio::test]
    async fn test_camera_snapshot_scenario() {
        // cam1 registers with device d1, then reports only d2: d1 is gone.
        let h = harness().await;
        let cam = TestModule::bind().await;

        let cam_identity = |devices: &Value| {
            json!({
                "ty": "uv", "mt": 9100,
                "ms": {
                    "a": "cam1", "b": "camera", "c": [], "d": [],
                    "e": "KEY-cam1", "u": 1, "z": false, "m": devices,
                },
            })
            .to_string()
            .into_bytes()
        };

        let d1 = json!([{"id": "d1", "ln": "Cam0", "r": false, "v": true, "active": 0, "p": 2}]);
        h.broker.handle_inbound(&cam_identity(&d1), cam.addr()).await;
        assert!(h.broker.flags().camera_connected());

        let d2 = json!([{"id": "d2", "ln": "Cam1", "r": false, "v": true, "active": 0, "p": 2}]);
        h.broker.handle_inbound(&cam_identity(&d2), cam.addr()).await;

        let list = h.broker.camera_list_json();
        let ids: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["d2"]);
    }

    #[tokio::test]
    async fn test_cloud_connection_pushes_identity_to_all() {
        let h = harness().await;
        let mut gen1 = TestModule::bind().await;
        let mut gen2 = TestModule::bind().await;

        h.broker
            .handle_inbound(&identity("gen1", &[], false), gen1.addr())
            .await;
        h.broker
            .handle_inbound(&identity("gen2", &[], false), gen2.addr())
            .await;

        h.broker.on_cloud_connection(CloudStatus::Registered).await;
        assert!(h.broker.flags().cloud_online());

        for module in [&mut gen1, &mut gen2] {
            let msg = module.recv().await;
            let parsed: serde_json::Value = serde_json::from_slice(&msg).unwrap();
            assert_eq!(parsed["mt"], 9100);
            assert_eq!(parsed["ms"]["w"], CloudStatus::Registered.code());
        }
    }
}
