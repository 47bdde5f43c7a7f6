//! Collaborator seams of the broker
//!
//! The cloud protocol client, the licensing backend, the user-facing alert
//! channel, and the p2p mesh are external systems. The broker only talks to
//! them through these object-safe traits; production wiring injects the real
//! clients, tests inject recorders.

use serde_json::Value;

use skybus_core::Severity;

/// Task scopes the cloud side can be asked to load tasks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskScope {
    Group,
    Party,
}

/// Cloud communication server client.
pub trait CloudLink: Send + Sync {
    /// Relay a raw datagram (JSON envelope, possibly with binary tail).
    fn relay_raw(
        &self,
        message: &[u8],
        is_system: bool,
        is_binary: bool,
        target: Option<&str>,
        message_type: u32,
        cmd: &Value,
    );

    /// Send a tagged binary command (image capture and friends).
    fn send_binary_command(
        &self,
        target: Option<&str>,
        message_type: u32,
        payload: &[u8],
        cmd: Value,
    );

    /// Ask the cloud side to re-announce this vehicle's identity.
    fn announce_identity(&self, target: Option<&str>);

    /// Request task loading (geofences, waypoints) for a scope.
    fn load_tasks_by_scope(&self, scope: TaskScope, message_type: u32);
}

/// Licensing backend validating module hardware ids.
pub trait Authenticator: Send + Sync {
    /// Whether the backend is reachable and authenticated.
    fn is_ready(&self) -> bool;

    /// Whether the reported hardware is allowed to run.
    fn validate_hardware(&self, serial: &str, hardware_type: i64) -> bool;
}

/// User-facing notification channel.
pub trait AlertSink: Send + Sync {
    fn notify(&self, severity: Severity, text: &str);
}

/// Peer-to-peer mesh client.
pub trait P2pLink: Send + Sync {
    /// Connect the requesting party to the mesh on this vehicle's MAC.
    fn connect_to_mesh(&self, party: &str);

    /// Try to relay a swarm payload over a direct route. Returns false when
    /// no route exists and the caller should fall back to the cloud.
    fn relay_swarm(&self, target: Option<&str>, message: &[u8]) -> bool;
}

/// Cloud client used when no cloud bridge is wired up (standalone broker).
#[derive(Debug, Default)]
pub struct NullCloud;

impl CloudLink for NullCloud {
    fn relay_raw(
        &self,
        _message: &[u8],
        _is_system: bool,
        _is_binary: bool,
        _target: Option<&str>,
        message_type: u32,
        _cmd: &Value,
    ) {
        tracing::debug!(message_type, "no cloud link, dropping relay");
    }

    fn send_binary_command(
        &self,
        _target: Option<&str>,
        message_type: u32,
        _payload: &[u8],
        _cmd: Value,
    ) {
        tracing::debug!(message_type, "no cloud link, dropping binary command");
    }

    fn announce_identity(&self, _target: Option<&str>) {}

    fn load_tasks_by_scope(&self, _scope: TaskScope, _message_type: u32) {}
}

/// Authenticator used before the licensing backend is wired up. Never ready,
/// so modules stay NotVerified and get re-checked on later registrations.
#[derive(Debug, Default)]
pub struct OfflineAuthenticator;

impl Authenticator for OfflineAuthenticator {
    fn is_ready(&self) -> bool {
        false
    }

    fn validate_hardware(&self, _serial: &str, _hardware_type: i64) -> bool {
        false
    }
}

/// Alert sink that only logs.
#[derive(Debug, Default)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn notify(&self, severity: Severity, text: &str) {
        match severity {
            Severity::Emergency | Severity::Alert | Severity::Critical | Severity::Error => {
                tracing::error!("{}", text)
            }
            Severity::Warning => tracing::warn!("{}", text),
            _ => tracing::info!("{}", text),
        }
    }
}

/// P2p client with no mesh: every relay declines.
#[derive(Debug, Default)]
pub struct NullP2p;

impl P2pLink for NullP2p {
    fn connect_to_mesh(&self, _party: &str) {}

    fn relay_swarm(&self, _target: Option<&str>, _message: &[u8]) -> bool {
        false
    }
}
