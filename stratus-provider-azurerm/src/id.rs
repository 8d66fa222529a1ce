//! Resource Manager resource IDs
//!
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{type}/{name}...]`
//!
//! Segment keys compare case-insensitively; the API is not consistent about
//! `resourceGroups` vs `resourcegroups`.

use std::fmt;

use stratus_core::provider::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("ID {id:?} is not a Resource Manager ID: {reason}")]
    Malformed { id: String, reason: String },

    #[error("ID {id:?} has no {key:?} segment")]
    MissingKey { id: String, key: String },
}

impl From<IdError> for ProviderError {
    fn from(e: IdError) -> Self {
        ProviderError::configuration("Failed to parse resource ID").with_cause(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: Option<String>,
    /// Type/name pairs after the provider namespace, outermost first
    path: Vec<(String, String)>,
}

impl AzureResourceId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: Some(provider.into()),
            path: Vec::new(),
        }
    }

    /// Append a `{key}/{name}` segment
    pub fn push(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.path.push((key.into(), name.into()));
        self
    }

    pub fn parse(id: &str) -> Result<Self, IdError> {
        let malformed = |reason: &str| IdError::Malformed {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = id.trim().trim_end_matches('/');
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Err(malformed("expected a leading '/'"));
        };
        let components: Vec<&str> = rest.split('/').collect();
        if components.iter().any(|c| c.is_empty()) {
            return Err(malformed("empty path segment"));
        }
        if components.len() % 2 != 0 {
            return Err(malformed("segments must come in key/value pairs"));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = Vec::new();

        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if subscription_id.is_none() {
                if !key.eq_ignore_ascii_case("subscriptions") {
                    return Err(malformed("must start with /subscriptions"));
                }
                subscription_id = Some(value.to_string());
            } else if resource_group.is_none() && key.eq_ignore_ascii_case("resourceGroups") {
                resource_group = Some(value.to_string());
            } else if provider.is_none() && key.eq_ignore_ascii_case("providers") {
                provider = Some(value.to_string());
            } else {
                path.push((key.to_string(), value.to_string()));
            }
        }

        Ok(Self {
            subscription_id: subscription_id.ok_or_else(|| malformed("missing subscription"))?,
            resource_group: resource_group.ok_or_else(|| malformed("missing resource group"))?,
            provider,
            path,
        })
    }

    pub fn get(&self, key: &str) -> Result<&str, IdError> {
        self.path
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| self.missing(key))
    }

    /// Take the value for `key` out of the path
    pub fn pop(&mut self, key: &str) -> Result<String, IdError> {
        let index = self
            .path
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
            .ok_or_else(|| self.missing(key))?;
        Ok(self.path.remove(index).1)
    }

    fn missing(&self, key: &str) -> IdError {
        IdError::MissingKey {
            id: self.to_string(),
            key: key.to_string(),
        }
    }
}

impl fmt::Display for AzureResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )?;
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (key, value) in &self.path {
            write!(f, "/{}/{}", key, value)?;
        }
        Ok(())
    }
}

pub const NETWORK: &str = "Microsoft.Network";
pub const EVENTHUB: &str = "Microsoft.EventHub";
pub const HDINSIGHT: &str = "Microsoft.HDInsight";

pub const AZURE_FIREWALLS: &str = "azureFirewalls";
pub const NETWORK_RULE_COLLECTIONS: &str = "networkRuleCollections";
pub const APPLICATION_RULE_COLLECTIONS: &str = "applicationRuleCollections";
pub const VIRTUAL_HUBS: &str = "virtualHubs";
pub const HUB_CONNECTIONS: &str = "hubVirtualNetworkConnections";
pub const NAMESPACES: &str = "namespaces";
pub const EVENTHUBS: &str = "eventhubs";
pub const CLUSTERS: &str = "clusters";

pub fn firewall_id(subscription_id: &str, resource_group: &str, name: &str) -> AzureResourceId {
    AzureResourceId::new(subscription_id, resource_group, NETWORK).push(AZURE_FIREWALLS, name)
}

pub fn virtual_hub_id(subscription_id: &str, resource_group: &str, name: &str) -> AzureResourceId {
    AzureResourceId::new(subscription_id, resource_group, NETWORK).push(VIRTUAL_HUBS, name)
}

pub fn eventhub_namespace_id(
    subscription_id: &str,
    resource_group: &str,
    name: &str,
) -> AzureResourceId {
    AzureResourceId::new(subscription_id, resource_group, EVENTHUB).push(NAMESPACES, name)
}

pub fn eventhub_id(
    subscription_id: &str,
    resource_group: &str,
    namespace: &str,
    name: &str,
) -> AzureResourceId {
    eventhub_namespace_id(subscription_id, resource_group, namespace).push(EVENTHUBS, name)
}

pub fn hdinsight_cluster_id(
    subscription_id: &str,
    resource_group: &str,
    name: &str,
) -> AzureResourceId {
    AzureResourceId::new(subscription_id, resource_group, HDINSIGHT).push(CLUSTERS, name)
}
