//! Resource - Configuration values and the per-resource field accessor
//!
//! The configuration engine hands each CRUD call a [`ResourceData`]: the
//! configured (desired) attributes, the last known state, and the persisted
//! remote ID. Providers read configuration from it and write flattened remote
//! state back into it.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::differ::{changed_attributes, values_equivalent};
use crate::provider::{ProviderError, ProviderResult};
use crate::schema::ResourceSchema;

/// Address of a resource instance, used as error and log context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    /// Resource type (e.g., "azurerm_firewall")
    pub resource_type: String,
    /// Resource name as known to the remote API
    pub name: String,
    /// Resource group, when the resource lives in one
    pub resource_group: Option<String>,
}

impl ResourceAddress {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            resource_group: None,
        }
    }

    pub fn in_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = Some(resource_group.into());
        self
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_group {
            Some(group) => write!(
                f,
                "{} {:?} (Resource Group {:?})",
                self.resource_type, self.name, group
            ),
            None => write!(f, "{} {:?}", self.resource_type, self.name),
        }
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// True for empty lists, empty maps and empty strings
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Int(_) | Value::Bool(_) => false,
        }
    }

    /// True for the zero value of each type, which configuration treats the
    /// same as an absent attribute
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(i) => *i == 0,
            Value::Bool(b) => !*b,
            _ => self.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }

    /// Convert a JSON value; `null` has no configuration counterpart
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(|f| Value::Int(f as i64))
                }
            }
            serde_json::Value::Array(arr) => {
                Some(Value::List(arr.iter().filter_map(Value::from_json).collect()))
            }
            serde_json::Value::Object(obj) => Some(Value::Map(
                obj.iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Field accessor for one resource instance during a CRUD call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceData {
    resource_type: String,
    id: Option<String>,
    config: HashMap<String, Value>,
    state: HashMap<String, Value>,
}

impl ResourceData {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    pub fn with_config_map(mut self, config: HashMap<String, Value>) -> Self {
        self.config = config;
        self
    }

    pub fn with_state(mut self, state: HashMap<String, Value>) -> Self {
        self.state = state;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Configured value, falling back to the last known state
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key).or_else(|| self.state.get(key))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Last known state only
    pub fn get_state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn config(&self) -> &HashMap<String, Value> {
        &self.config
    }

    pub fn state(&self) -> &HashMap<String, Value> {
        &self.state
    }

    /// Record a value read back from the remote API
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    /// Fill unset top-level attributes with their schema defaults, so an
    /// omitted attribute compares equal to the defaulted value in state
    pub fn apply_defaults(&mut self, schema: &ResourceSchema) {
        for (name, attribute) in &schema.attributes {
            if let Some(default) = &attribute.default
                && !self.config.contains_key(name)
            {
                self.config.insert(name.clone(), default.clone());
            }
        }
    }

    pub fn has_change(&self, key: &str) -> bool {
        !values_equivalent(self.config.get(key), self.state.get(key))
    }

    pub fn has_changes(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.has_change(k))
    }

    /// All configured attributes whose value differs from state
    pub fn changed_attributes(&self) -> Vec<String> {
        changed_attributes(&self.config, &self.state)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The persisted ID, or an error when the engine called without one
    pub fn require_id(&self) -> ProviderResult<&str> {
        self.id().ok_or_else(|| {
            ProviderError::configuration(format!(
                "{} has no ID in state",
                self.resource_type
            ))
        })
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Forget the remote object; the engine reads this as "deleted"
    pub fn clear_id(&mut self) {
        self.id = None;
        self.state.clear();
    }

    /// Decode a typed model from configuration layered over state
    pub fn decode<T: DeserializeOwned>(&self) -> ProviderResult<T> {
        let mut merged = serde_json::Map::new();
        for (k, v) in &self.state {
            merged.insert(k.clone(), v.to_json());
        }
        for (k, v) in &self.config {
            merged.insert(k.clone(), v.to_json());
        }
        serde_json::from_value(serde_json::Value::Object(merged)).map_err(|e| {
            ProviderError::serialization(format!(
                "Failed to decode {} configuration",
                self.resource_type
            ))
            .with_cause(e)
        })
    }

    /// Decode a typed model from the last known state only
    pub fn decode_state<T: DeserializeOwned>(&self) -> ProviderResult<T> {
        let state = self
            .state
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(state)).map_err(|e| {
            ProviderError::serialization(format!(
                "Failed to decode {} state",
                self.resource_type
            ))
            .with_cause(e)
        })
    }

    /// Write every field of a typed model into state
    pub fn encode<T: Serialize>(&mut self, model: &T) -> ProviderResult<()> {
        let json = serde_json::to_value(model).map_err(|e| {
            ProviderError::serialization(format!(
                "Failed to encode {} state",
                self.resource_type
            ))
            .with_cause(e)
        })?;
        match Value::from_json(&json) {
            Some(Value::Map(fields)) => {
                self.state.extend(fields);
                Ok(())
            }
            _ => Err(ProviderError::serialization(format!(
                "{} state must encode to an object",
                self.resource_type
            ))),
        }
    }

    /// Promote the configuration to the known state, as the engine does once
    /// an apply finished
    pub fn apply_state(&mut self) {
        for (k, v) in &self.config {
            self.state.insert(k.clone(), v.clone());
        }
    }
}
