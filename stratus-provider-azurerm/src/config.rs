//! Provider configuration
//!
//! Read from the provider block's attributes, falling back to the `ARM_*`
//! environment variables the Azure tooling uses.

use std::collections::HashMap;
use std::time::Duration;

use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::Value;

pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Behaviour switches from the `features` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Features {
    /// Refuse to create a resource that already exists remotely
    pub import_protection: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            import_protection: true,
        }
    }
}

/// How the provider authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A bearer token obtained out of band
    AccessToken(String),
    /// Service principal with a client secret
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Credentials::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub credentials: Credentials,
    pub resource_manager_endpoint: String,
    pub authority_host: String,
    /// Delay between polls when the API gives no Retry-After hint
    pub poll_interval: Duration,
    pub features: Features,
}

/// Attribute lookups over a provider block
struct Attributes<'a> {
    attributes: &'a HashMap<String, Value>,
    env: &'a dyn Fn(&str) -> Option<String>,
}

impl Attributes<'_> {
    fn get_string(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attribute value, or the environment variable when unset
    fn get_string_or_env(&self, key: &str, var: &str) -> Option<String> {
        self.get_string(key)
            .map(str::to_string)
            .or_else(|| (self.env)(var).filter(|v| !v.is_empty()))
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.attributes.get(key) {
            Some(Value::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// The `features` block, configured as a map or a single-item list
    fn features(&self) -> Features {
        let block = match self.attributes.get("features") {
            Some(Value::Map(map)) => Some(map),
            Some(Value::List(items)) => items.first().and_then(Value::as_map),
            _ => None,
        };
        let import_protection = block
            .and_then(|b| b.get("import_protection"))
            .and_then(Value::as_bool)
            .unwrap_or(true);
        Features { import_protection }
    }
}

impl ProviderConfig {
    /// Configuration with a static token, for tests and local tooling
    pub fn with_access_token(subscription_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            credentials: Credentials::AccessToken(token.into()),
            resource_manager_endpoint: DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            features: Features::default(),
        }
    }

    /// Read the provider block, consulting the process environment
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> ProviderResult<Self> {
        Self::from_attributes_with_env(attributes, &|var| std::env::var(var).ok())
    }

    pub fn from_attributes_with_env(
        attributes: &HashMap<String, Value>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> ProviderResult<Self> {
        let attrs = Attributes { attributes, env };

        let subscription_id = attrs
            .get_string_or_env("subscription_id", "ARM_SUBSCRIPTION_ID")
            .ok_or_else(|| {
                ProviderError::configuration(
                    "subscription_id must be set in the provider block or ARM_SUBSCRIPTION_ID",
                )
            })?;

        let credentials =
            if let Some(token) = attrs.get_string_or_env("access_token", "ARM_ACCESS_TOKEN") {
                Credentials::AccessToken(token)
            } else {
                let tenant_id = attrs.get_string_or_env("tenant_id", "ARM_TENANT_ID");
                let client_id = attrs.get_string_or_env("client_id", "ARM_CLIENT_ID");
                let client_secret = attrs.get_string_or_env("client_secret", "ARM_CLIENT_SECRET");
                match (tenant_id, client_id, client_secret) {
                    (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                        Credentials::ClientSecret {
                            tenant_id,
                            client_id,
                            client_secret,
                        }
                    }
                    _ => {
                        return Err(ProviderError::configuration(
                            "no credentials configured: set access_token, or tenant_id, \
                             client_id and client_secret (or the matching ARM_* variables)",
                        ));
                    }
                }
            };

        let poll_interval = match attrs.get_int("poll_interval_seconds") {
            Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
            Some(secs) => {
                return Err(ProviderError::configuration(format!(
                    "poll_interval_seconds must be positive, got {}",
                    secs
                )));
            }
            None => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        };

        let config = Self {
            subscription_id,
            credentials,
            resource_manager_endpoint: attrs
                .get_string("resource_manager_endpoint")
                .unwrap_or(DEFAULT_RESOURCE_MANAGER_ENDPOINT)
                .to_string(),
            authority_host: attrs
                .get_string("authority_host")
                .unwrap_or(DEFAULT_AUTHORITY_HOST)
                .to_string(),
            poll_interval,
            features: attrs.features(),
        };
        log::debug!("provider configuration: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::provider::ErrorKind;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn attrs(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn reads_service_principal_from_attributes() {
        let config = ProviderConfig::from_attributes_with_env(
            &attrs(&[
                ("subscription_id", Value::string("sub")),
                ("tenant_id", Value::string("tenant")),
                ("client_id", Value::string("client")),
                ("client_secret", Value::string("hunter2")),
            ]),
            &no_env,
        )
        .unwrap();

        assert_eq!(config.subscription_id, "sub");
        assert_eq!(
            config.credentials,
            Credentials::ClientSecret {
                tenant_id: "tenant".to_string(),
                client_id: "client".to_string(),
                client_secret: "hunter2".to_string(),
            }
        );
        assert_eq!(config.resource_manager_endpoint, DEFAULT_RESOURCE_MANAGER_ENDPOINT);
        assert!(config.features.import_protection);
    }

    #[test]
    fn falls_back_to_environment() {
        let env = |var: &str| match var {
            "ARM_SUBSCRIPTION_ID" => Some("env-sub".to_string()),
            "ARM_ACCESS_TOKEN" => Some("token".to_string()),
            _ => None,
        };
        let config = ProviderConfig::from_attributes_with_env(&HashMap::new(), &env).unwrap();
        assert_eq!(config.subscription_id, "env-sub");
        assert_eq!(config.credentials, Credentials::AccessToken("token".to_string()));
    }

    #[test]
    fn attributes_win_over_environment() {
        let env = |_: &str| Some("env".to_string());
        let config = ProviderConfig::from_attributes_with_env(
            &attrs(&[("subscription_id", Value::string("attr"))]),
            &env,
        )
        .unwrap();
        assert_eq!(config.subscription_id, "attr");
    }

    #[test]
    fn missing_subscription_is_a_configuration_error() {
        let err = ProviderConfig::from_attributes_with_env(
            &attrs(&[("access_token", Value::string("t"))]),
            &no_env,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn partial_service_principal_is_rejected() {
        let err = ProviderConfig::from_attributes_with_env(
            &attrs(&[
                ("subscription_id", Value::string("sub")),
                ("client_id", Value::string("client")),
            ]),
            &no_env,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn features_block_disables_import_protection() {
        let features = Value::List(vec![Value::Map(HashMap::from([(
            "import_protection".to_string(),
            Value::Bool(false),
        )]))]);
        let config = ProviderConfig::from_attributes_with_env(
            &attrs(&[
                ("subscription_id", Value::string("sub")),
                ("access_token", Value::string("t")),
                ("features", features),
                ("poll_interval_seconds", Value::Int(2)),
            ]),
            &no_env,
        )
        .unwrap();
        assert!(!config.features.import_protection);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = ProviderConfig {
            credentials: Credentials::ClientSecret {
                tenant_id: "tenant".to_string(),
                client_id: "client".to_string(),
                client_secret: "hunter2".to_string(),
            },
            ..ProviderConfig::with_access_token("sub", "tok")
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        let debug = format!("{:?}", ProviderConfig::with_access_token("s", "zz-bearer-zz"));
        assert!(!debug.contains("zz-bearer-zz"));
    }
}
