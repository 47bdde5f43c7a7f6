//! Identity types for the skybus broker
//!
//! Identifiers on the wire are free-form strings chosen by each module, so
//! the newtypes are string-backed rather than numeric.

use std::fmt;

/// Stable logical name of a module. Unique key in the registry; a restarted
/// module keeps its id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub String);

impl ModuleId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        ModuleId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({})", self.0)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        ModuleId(s.to_string())
    }
}

/// GUID of one module *instance*. Unlike [`ModuleId`] this is unique across
/// the whole system and across restarts, which is what lets the broker tell
/// a stale instance's key from a freshly restarted one.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ModuleKey(pub String);

impl ModuleKey {
    #[inline]
    pub fn new(key: impl Into<String>) -> Self {
        ModuleKey(key.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Legacy echo-suppression match: the registered key is compared by
    /// substring against the sender key carried in the envelope.
    pub fn matches(&self, sender_key: &str) -> bool {
        !sender_key.is_empty() && self.0.contains(sender_key)
    }
}

impl fmt::Debug for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Party identity used by the cloud side to address this vehicle.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PartyId(pub String);

impl PartyId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        PartyId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Party({})", self.0)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
