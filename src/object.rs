//! The object kind: a mapping from rendered-string keys to values.
//!
//! Objects carry an optional `type` slot alongside their entries; a literal
//! pair whose key renders as `type` sets the slot instead of storing an
//! entry. Keys are the rendered string form of the key value, so `"k"`,
//! `k`, and a one-element list holding either all address the same entry.

use std::collections::BTreeMap;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    map: BTreeMap<String, Value>,
    type_name: String,
}

impl Default for Object {
    fn default() -> Self {
        Object {
            map: BTreeMap::new(),
            type_name: "object".to_owned(),
        }
    }
}

impl Object {
    pub fn new() -> Self {
        Object::default()
    }

    /// Build an object from a key-value pair sequence in source order.
    /// Duplicate keys keep the last-written value; a `type` key sets the
    /// type slot.
    pub fn from_pairs(pairs: Vec<(Value, Value)>) -> Self {
        let mut object = Object::new();

        for (key, value) in pairs {
            if let Some(key) = normalize_key(&key) {
                if key == "type" {
                    object.type_name = value.render_default();
                } else {
                    object.map.insert(key, value);
                }
            }
        }

        object
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.map.iter()
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        let key = normalize_key(key)?;
        Some(self.map.get(&key).cloned().unwrap_or(Value::Nothing))
    }

    pub fn set(&mut self, key: &Value, value: Value) -> bool {
        match normalize_key(key) {
            Some(key) => {
                self.map.insert(key, value);
                true
            }
            None => false,
        }
    }

    pub fn del(&mut self, key: &Value) -> bool {
        match normalize_key(key) {
            Some(key) => {
                self.map.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn has(&self, key: &Value) -> bool {
        normalize_key(key)
            .map(|key| self.map.contains_key(&key))
            .unwrap_or(false)
    }
}

/// Reduce a key value to its entry string. A one-element sequence unwraps
/// to its element; nothing-valued keys are rejected.
fn normalize_key(key: &Value) -> Option<String> {
    match key {
        Value::Nothing => None,
        Value::List(items) | Value::Expression(items) if items.len() == 1 => {
            normalize_key(&items[0])
        }
        Value::List(_) | Value::Expression(_) => None,
        other => Some(other.render_default()),
    }
}
