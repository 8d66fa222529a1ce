//! Resource Manager wire models
//!
//! Field names follow the REST API (camelCase). Every field is optional
//! because the API omits what it has no value for, and requests omit what
//! the configuration leaves unset.

pub mod eventhub;
pub mod hdinsight;
pub mod network;

use serde::{Deserialize, Serialize};

/// Fields every top-level resource carries
pub trait ArmResource {
    fn id(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
}

macro_rules! impl_arm_resource {
    ($($model:ty),* $(,)?) => {
        $(
            impl ArmResource for $model {
                fn id(&self) -> Option<&str> {
                    self.id.as_deref()
                }

                fn name(&self) -> Option<&str> {
                    self.name.as_deref()
                }
            }
        )*
    };
}

impl_arm_resource!(
    network::AzureFirewall,
    network::VirtualHub,
    eventhub::EhNamespace,
    eventhub::Eventhub,
    hdinsight::Cluster,
);

/// Reference to another resource by ID
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }
}
