//! skybus Broker - module manager and message dispatch
//!
//! The broker tracks module registrations and heartbeats, routes messages to
//! subscribers over the chunked UDP transport, maintains the camera device
//! index, and bridges non-local traffic to the cloud collaborator:
//! - Peer registry with restart detection and licensing bookkeeping
//! - Message-type subscription index driving fan-out
//! - Inbound dispatch state machine over the known message kinds
//! - Liveness sweeper marking silent modules dead

pub mod broker;
pub mod camera;
pub mod dispatch;
pub mod hooks;
pub mod registry;
pub mod subscriptions;
pub mod sweeper;

pub use broker::*;
pub use camera::*;
pub use hooks::*;
pub use registry::*;
pub use subscriptions::*;
pub use sweeper::*;
