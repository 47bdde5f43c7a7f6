//! JSON message envelope parsing and routing classification

use serde_json::Value;

use skybus_core::{
    BusError, BusResult, FIELD_MESSAGE_CMD, FIELD_MESSAGE_TYPE, FIELD_ROUTING_TYPE,
    FIELD_SENDER_MODULE_KEY, FIELD_TARGET_ID, ROUTING_GROUP, ROUTING_INTERMODULE,
    ROUTING_SYSTEM,
};

/// How a message should travel once it reaches the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Routing {
    /// Local peers / broker only; never relayed to the cloud.
    Intermodule,
    /// Every party in the group.
    Group,
    /// A single explicitly named party.
    Individual,
    /// Addressed to the cloud server itself.
    System,
}

impl Routing {
    /// Classification keeps the legacy substring semantics of the routing
    /// string so prefixed or suffixed variants keep working.
    fn classify(ty: &str) -> Routing {
        if ty.contains(ROUTING_INTERMODULE) {
            Routing::Intermodule
        } else if ty.contains(ROUTING_SYSTEM) {
            Routing::System
        } else if ty.contains(ROUTING_GROUP) {
            Routing::Group
        } else {
            Routing::Individual
        }
    }
}

/// Parsed message envelope. `body` keeps the full JSON object so opaque
/// messages can be relayed verbatim.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub routing: Routing,
    pub message_type: u32,
    /// Target party, present only for non-group, non-system messages.
    pub target_id: Option<String>,
    /// Legacy sender key, set when another module originated the message.
    pub sender_module_key: Option<String>,
    pub body: Value,
}

impl Envelope {
    /// Parse and validate the JSON part of a message. Malformed envelopes
    /// are errors the dispatcher turns into silent drops.
    pub fn parse(json_part: &[u8]) -> BusResult<Self> {
        let body: Value = serde_json::from_slice(json_part)
            .map_err(|e| BusError::InvalidEnvelope(e.to_string()))?;

        let Some(routing_type) = body[FIELD_ROUTING_TYPE].as_str() else {
            return Err(BusError::InvalidEnvelope("missing routing type".into()));
        };
        let Some(message_type) = body[FIELD_MESSAGE_TYPE].as_u64() else {
            return Err(BusError::InvalidEnvelope("missing message type".into()));
        };

        let routing = Routing::classify(routing_type);

        // Group and system messages have no single target even when one is
        // present in the JSON.
        let target_id = match routing {
            Routing::Group | Routing::System => None,
            _ => body[FIELD_TARGET_ID].as_str().map(str::to_string),
        };

        let sender_module_key = body[FIELD_SENDER_MODULE_KEY]
            .as_str()
            .map(str::to_string);

        Ok(Envelope {
            routing,
            message_type: message_type as u32,
            target_id,
            sender_module_key,
            body,
        })
    }

    /// Type-specific payload, `Null` when absent.
    pub fn cmd(&self) -> &Value {
        &self.body[FIELD_MESSAGE_CMD]
    }

    pub fn is_intermodule(&self) -> bool {
        self.routing == Routing::Intermodule
    }

    pub fn is_system(&self) -> bool {
        self.routing == Routing::System
    }
}
