//! Serde helpers for typed configuration models
//!
//! Singleton blocks are configured as a list holding at most one map.
//! Typed models hold them as `Option<T>`:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct EventHubModel {
//!     #[serde(default, with = "stratus_core::codec::singleton")]
//!     capture_description: Option<CaptureDescriptionBlock>,
//! }
//! ```

pub mod singleton {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        let items: Vec<&T> = value.iter().collect();
        items.serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let items: Option<Vec<T>> = Option::deserialize(deserializer)?;
        Ok(items.and_then(|items| items.into_iter().next()))
    }
}
