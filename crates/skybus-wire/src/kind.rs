//! Message kinds the broker itself understands
//!
//! Every other type flows through [`MessageKind::Opaque`] untouched, which is
//! what keeps the broker forward compatible with message types it only
//! routes.

use skybus_core::{
    TYPE_IMAGE, TYPE_MODULE_ID, TYPE_MODULE_LOCATION_INFO, TYPE_MODULE_REMOTE_EXECUTE,
    TYPE_P2P_ACTION, TYPE_SWARM_RELAY, TYPE_UNIT_IDENTITY,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Module identity / registration announcement.
    ModuleId,
    /// Module-directed command for the broker itself.
    ModuleRemoteExecute,
    /// Vehicle location snapshot from whichever module owns motion data.
    ModuleLocationInfo,
    /// Aggregated vehicle identity from the flight-control module.
    UnitIdentity,
    /// JSON header + NUL + image bytes.
    Image,
    /// Peer-to-peer mesh control action.
    P2pAction,
    /// Swarm payload relayed over the mesh, cloud fallback.
    SwarmRelay,
    /// Anything the broker only routes, never interprets.
    Opaque(u32),
}

impl MessageKind {
    pub fn from_type(message_type: u32) -> MessageKind {
        match message_type {
            TYPE_MODULE_ID => MessageKind::ModuleId,
            TYPE_MODULE_REMOTE_EXECUTE => MessageKind::ModuleRemoteExecute,
            TYPE_MODULE_LOCATION_INFO => MessageKind::ModuleLocationInfo,
            TYPE_UNIT_IDENTITY => MessageKind::UnitIdentity,
            TYPE_IMAGE => MessageKind::Image,
            TYPE_P2P_ACTION => MessageKind::P2pAction,
            TYPE_SWARM_RELAY => MessageKind::SwarmRelay,
            other => MessageKind::Opaque(other),
        }
    }
}
