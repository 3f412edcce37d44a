use serde_json::{Map, Value};

/// Insert every key from `incoming` that `existing` lacks. Existing entries
/// always win; nothing is merged field by field. Returns the added keys in
/// payload order.
pub fn merge_new(existing: &mut Map<String, Value>, incoming: &Map<String, Value>) -> Vec<String> {
    let mut added = Vec::new();
    for (key, entry) in incoming {
        if existing.contains_key(key) { continue; }
        existing.insert(key.clone(), entry.clone());
        added.push(key.clone());
    }
    added
}
