//! Azure Resource Manager provider
//!
//! Owns the shared [`ArmContext`] and dispatches every lifecycle call to the
//! registered resource named by the data's resource type.

use std::collections::HashMap;
use std::sync::Arc;

use stratus_core::provider::{
    BoxFuture, ErrorKind, Provider, ProviderError, ProviderResult, ResourceType,
};
use stratus_core::resource::{ResourceData, Value};
use stratus_core::validation::Diagnostics;

use crate::arm::ArmClient;
use crate::auth::{ClientSecretCredential, StaticTokenCredential, TokenCredential};
use crate::config::{Credentials, ProviderConfig};
use crate::resources::{ArmApis, ArmContext, AzureResource, RegisteredType, registry};

/// Azure Resource Manager Provider
pub struct AzureRmProvider {
    ctx: ArmContext,
    resources: HashMap<&'static str, Arc<dyn AzureResource>>,
}

impl AzureRmProvider {
    /// Build the HTTP stack for `config`; no request is sent until the first
    /// lifecycle call
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let credential: Arc<dyn TokenCredential> = match &config.credentials {
            Credentials::AccessToken(token) => Arc::new(StaticTokenCredential::new(token.clone())),
            Credentials::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => Arc::new(ClientSecretCredential::new(
                &config.authority_host,
                tenant_id,
                client_id.clone(),
                client_secret.clone(),
                &config.resource_manager_endpoint,
            )),
        };

        let client = ArmClient::new(&config.resource_manager_endpoint, credential).map_err(|e| {
            ProviderError::configuration("Failed to build Resource Manager client").with_cause(e)
        })?;
        log::info!(
            "azurerm provider using {} for subscription {}",
            config.resource_manager_endpoint,
            config.subscription_id
        );

        let ctx = ArmContext::new(config.subscription_id.clone(), ArmApis::http(&client))
            .with_features(config.features.clone())
            .with_poll_interval(config.poll_interval);
        Ok(Self::with_context(ctx))
    }

    /// Provider over an already assembled context, e.g. with injected clients
    pub fn with_context(ctx: ArmContext) -> Self {
        let resources = registry().into_iter().map(|r| (r.name(), r)).collect();
        Self { ctx, resources }
    }

    pub fn context(&self) -> &ArmContext {
        &self.ctx
    }

    fn resource(&self, resource_type: &str) -> ProviderResult<&Arc<dyn AzureResource>> {
        self.resources.get(resource_type).ok_or_else(|| {
            ProviderError::new(
                ErrorKind::UnknownResourceType,
                format!("Unknown resource type: {}", resource_type),
            )
        })
    }
}

impl Provider for AzureRmProvider {
    fn name(&self) -> &'static str {
        "azurerm"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        registry()
            .into_iter()
            .map(|r| Box::new(RegisteredType::from(r)) as Box<dyn ResourceType>)
            .collect()
    }

    fn validate(
        &self,
        resource_type: &str,
        attributes: &HashMap<String, Value>,
    ) -> ProviderResult<Diagnostics> {
        Ok(self.resource(resource_type)?.validate(attributes))
    }

    fn create<'a>(&'a self, data: &'a mut ResourceData) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let resource = self.resource(data.resource_type())?;
            resource.create(&self.ctx, data).await
        })
    }

    fn read<'a>(&'a self, data: &'a mut ResourceData) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let resource = self.resource(data.resource_type())?;
            let limit = resource.timeouts().read;
            let result = tokio::time::timeout(limit, resource.read(&self.ctx, data)).await;
            result.unwrap_or_else(|_| {
                Err(ProviderError::timeout(format!(
                    "Reading {} did not finish within {:?}",
                    resource.name(),
                    limit
                )))
            })
        })
    }

    fn update<'a>(&'a self, data: &'a mut ResourceData) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let resource = self.resource(data.resource_type())?;
            resource.update(&self.ctx, data).await
        })
    }

    fn delete<'a>(&'a self, data: &'a mut ResourceData) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let resource = self.resource(data.resource_type())?;
            resource.delete(&self.ctx, data).await
        })
    }
}
