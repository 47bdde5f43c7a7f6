//! Protocol constants shared by the broker and module clients
//!
//! One logical message is a JSON envelope, optionally followed by a NUL byte
//! and a raw binary tail. Field names are single letters for wire economy and
//! are kept compatible with the existing module ecosystem.

/// Routing-type string: message addressed to local modules / broker only.
pub const ROUTING_INTERMODULE: &str = "uv";
/// Routing-type string: message addressed to the whole group.
pub const ROUTING_GROUP: &str = "g";
/// Routing-type string: message addressed to a single party.
pub const ROUTING_INDIVIDUAL: &str = "i";
/// Routing-type string: system message for the cloud server itself.
pub const ROUTING_SYSTEM: &str = "s";

// Envelope fields
pub const FIELD_ROUTING_TYPE: &str = "ty";
pub const FIELD_TARGET_ID: &str = "tg";
pub const FIELD_MESSAGE_TYPE: &str = "mt";
pub const FIELD_MESSAGE_CMD: &str = "ms";
/// Legacy sender-module-key field. Presence marks a message that entered via
/// the server-forwarded path and must be fanned out to subscribers.
pub const FIELD_SENDER_MODULE_KEY: &str = "GU";

// Identity payload fields
pub const ID_FIELD_MODULE_ID: &str = "a";
pub const ID_FIELD_MODULE_CLASS: &str = "b";
pub const ID_FIELD_MESSAGE_FILTER: &str = "c";
pub const ID_FIELD_FEATURES: &str = "d";
pub const ID_FIELD_MODULE_KEY: &str = "e";
pub const ID_FIELD_PARTY_RECORD: &str = "f";
pub const ID_FIELD_HARDWARE_ID: &str = "s";
pub const ID_FIELD_HARDWARE_TYPE: &str = "t";
pub const ID_FIELD_INSTANCE_TIMESTAMP: &str = "u";
pub const ID_FIELD_VERSION: &str = "v";
pub const ID_FIELD_SOCKET_STATUS: &str = "w";
pub const ID_FIELD_RESEND: &str = "z";

// Party record sub-fields
pub const PARTY_FIELD_ID: &str = "sd";
pub const PARTY_FIELD_GROUP: &str = "gr";

// Module classes. Matched by string prefix, not equality, so "camera2" still
// counts as a camera module.
pub const MODULE_CLASS_COMM: &str = "comm";
pub const MODULE_CLASS_FCB: &str = "fcb";
pub const MODULE_CLASS_CAMERA: &str = "camera";
pub const MODULE_CLASS_GENERIC: &str = "gen";

// Module feature capability strings
pub const FEATURE_SEND_TELEMETRY: &str = "T";
pub const FEATURE_RECEIVE_TELEMETRY: &str = "R";
pub const FEATURE_VIDEO: &str = "V";
pub const FEATURE_CAMERA_CONTROL: &str = "C";

// System message types
pub const TYPE_SYSTEM_LOAD_TASKS: u32 = 9001;

// Intermodule message types
pub const TYPE_MODULE_ID: u32 = 9100;
pub const TYPE_MODULE_REMOTE_EXECUTE: u32 = 9101;
pub const TYPE_MODULE_LOCATION_INFO: u32 = 9102;

// Application message types the broker itself understands
pub const TYPE_UNIT_IDENTITY: u32 = 1004;
pub const TYPE_IMAGE: u32 = 1006;
pub const TYPE_EXTERNAL_GEOFENCE: u32 = 1024;
pub const TYPE_UPLOAD_WAYPOINTS: u32 = 1046;
pub const TYPE_SWARM_RELAY: u32 = 6503;
pub const TYPE_P2P_ACTION: u32 = 6505;

/// P2P action sub-command: connect to the mesh on the requester's MAC.
pub const P2P_ACTION_CONNECT_TO_MAC: i64 = 2;

/// Camera device list field inside an identity payload.
pub const ID_FIELD_CAMERA_LIST: &str = "m";

// Camera device entry fields
pub const CAM_FIELD_ID: &str = "id";
pub const CAM_FIELD_LOGICAL_NAME: &str = "ln";
pub const CAM_FIELD_RECORDING: &str = "r";
pub const CAM_FIELD_AVAILABLE: &str = "v";
pub const CAM_FIELD_STREAMING: &str = "active";
pub const CAM_FIELD_DEVICE_TYPE: &str = "p";

/// Notification severity sent through the alert channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

/// License verification state of a registered module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LicenseStatus {
    /// License exists and was verified.
    VerifiedOk,
    /// License exists and was rejected.
    VerifiedBad,
    /// License exists but the authenticator was not reachable yet.
    NotVerified,
    /// The module reported no hardware info at all.
    #[default]
    NoData,
}

/// Cloud connection status carried in the broker identity message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CloudStatus {
    #[default]
    Fresh,
    Connecting,
    Disconnecting,
    Disconnected,
    Connected,
    Registered,
    Unregistered,
    Error,
}

impl CloudStatus {
    /// Wire code used in the identity payload.
    pub fn code(self) -> u32 {
        match self {
            CloudStatus::Fresh => 1,
            CloudStatus::Connecting => 2,
            CloudStatus::Disconnecting => 3,
            CloudStatus::Disconnected => 4,
            CloudStatus::Connected => 5,
            CloudStatus::Registered => 6,
            CloudStatus::Unregistered => 7,
            CloudStatus::Error => 8,
        }
    }

    /// Online means the cloud link can carry user-visible notifications.
    pub fn is_online(self) -> bool {
        matches!(self, CloudStatus::Connected | CloudStatus::Registered)
    }
}
