//! Message-type subscription index
//!
//! Maps a message type to the modules that declared it in their identity
//! filter. Union-only: module death never removes entries, dead peers are
//! skipped at dispatch time instead.

use std::collections::HashMap;

use serde_json::Value;

use skybus_core::ModuleId;

#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    by_type: HashMap<u32, Vec<ModuleId>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union a module's declared message filter into the index.
    ///
    /// Returns true when at least one new (type, module) pair was added, so
    /// registration can tell whether anything actually changed.
    pub fn subscribe_all(&mut self, module_id: &ModuleId, filter: &Value) -> bool {
        let Some(types) = filter.as_array() else {
            return false;
        };

        let mut added = false;
        for t in types.iter().filter_map(Value::as_u64) {
            let subscribers = self.by_type.entry(t as u32).or_default();
            if !subscribers.contains(module_id) {
                subscribers.push(module_id.clone());
                added = true;
            }
        }
        added
    }

    /// Modules subscribed to a message type, in subscription order.
    pub fn subscribers(&self, message_type: u32) -> &[ModuleId] {
        self.by_type
            .get(&message_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_union_no_duplicates() {
        let mut index = SubscriptionIndex::new();
        let id = ModuleId::new("fcb1");

        assert!(index.subscribe_all(&id, &json!([1002, 1010])));
        // Idempotent: resubscribing the same filter adds nothing.
        assert!(!index.subscribe_all(&id, &json!([1002, 1010])));
        // A partially new filter still reports a change.
        assert!(index.subscribe_all(&id, &json!([1010, 1030])));

        assert_eq!(index.subscribers(1002), &[id.clone()]);
        assert_eq!(index.subscribers(1030), &[id]);
    }

    #[test]
    fn test_subscription_order_preserved() {
        let mut index = SubscriptionIndex::new();
        index.subscribe_all(&ModuleId::new("a"), &json!([9001]));
        index.subscribe_all(&ModuleId::new("b"), &json!([9001]));

        let ids: Vec<&str> = index.subscribers(9001).iter().map(|m| m.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_unknown_type_has_no_subscribers() {
        let index = SubscriptionIndex::new();
        assert!(index.subscribers(4242).is_empty());
    }

    #[test]
    fn test_non_array_filter_ignored() {
        let mut index = SubscriptionIndex::new();
        assert!(!index.subscribe_all(&ModuleId::new("x"), &json!("")));
        assert!(!index.subscribe_all(&ModuleId::new("x"), &Value::Null));
    }
}
