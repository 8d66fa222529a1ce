//! Resource implementations
//!
//! Every resource follows the same lifecycle:
//!
//! - **create**: import-protection check, expand the typed model, PUT, wait
//!   for the operation, Get again, set the ID, then Read
//! - **read**: parse the ID, Get, clear the ID on 404, flatten into state
//! - **update**: only when a mutable attribute changed; same write path as create
//! - **delete**: DELETE (404 is success) and wait
//!
//! Child resources without their own endpoint go through [`child`].

mod child;
pub mod eventhub;
pub mod eventhub_namespace;
pub mod firewall;
pub mod firewall_application_rule_collection;
pub mod firewall_network_rule_collection;
pub mod hdinsight_hadoop_cluster;
pub mod virtual_hub;
pub mod virtual_hub_connection;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stratus_core::locks::LockRegistry;
use stratus_core::poller::{
    Clock, LongRunningOperation, PollOptions, TokioClock, wait_for_completion,
};
use stratus_core::provider::{ProviderError, ProviderResult, ResourceType, Timeouts};
use stratus_core::resource::{ResourceAddress, ResourceData, Value};
use stratus_core::schema::ResourceSchema;
use stratus_core::validation::Diagnostics;
use tokio_util::sync::CancellationToken;

use crate::arm::{ArmClient, ArmError, ArmResourceApi, ArmResult, ResourceApi};
use crate::config::Features;
use crate::sdk::ArmResource;
use crate::sdk::eventhub::{EhNamespace, Eventhub};
use crate::sdk::hdinsight::{self, Cluster};
use crate::sdk::network::{self, AzureFirewall, VirtualHub};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Per-service API clients
#[derive(Clone)]
pub struct ArmApis {
    pub firewalls: Arc<dyn ResourceApi<AzureFirewall>>,
    pub virtual_hubs: Arc<dyn ResourceApi<VirtualHub>>,
    pub eventhub_namespaces: Arc<dyn ResourceApi<EhNamespace>>,
    pub eventhubs: Arc<dyn ResourceApi<Eventhub>>,
    pub hdinsight_clusters: Arc<dyn ResourceApi<Cluster>>,
}

impl ArmApis {
    /// HTTP clients for every service, sharing one connection pool
    pub fn http(client: &ArmClient) -> Self {
        Self {
            firewalls: Arc::new(ArmResourceApi::<AzureFirewall>::new(
                client.clone(),
                network::API_VERSION,
            )),
            virtual_hubs: Arc::new(ArmResourceApi::<VirtualHub>::new(
                client.clone(),
                network::API_VERSION,
            )),
            eventhub_namespaces: Arc::new(ArmResourceApi::<EhNamespace>::new(
                client.clone(),
                crate::sdk::eventhub::API_VERSION,
            )),
            eventhubs: Arc::new(ArmResourceApi::<Eventhub>::new(
                client.clone(),
                crate::sdk::eventhub::API_VERSION,
            )),
            hdinsight_clusters: Arc::new(ArmResourceApi::<Cluster>::new(
                client.clone(),
                hdinsight::API_VERSION,
            )),
        }
    }
}

/// Everything a CRUD call needs besides the resource's own data
pub struct ArmContext {
    pub subscription_id: String,
    pub features: Features,
    pub apis: ArmApis,
    pub locks: Arc<LockRegistry>,
    pub clock: Arc<dyn Clock>,
    pub cancel: CancellationToken,
    pub poll_interval: Duration,
}

impl ArmContext {
    pub fn new(subscription_id: impl Into<String>, apis: ArmApis) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            features: Features::default(),
            apis,
            locks: Arc::new(LockRegistry::new()),
            clock: Arc::new(TokioClock),
            cancel: CancellationToken::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Block until `operation` finishes or `timeout` passes
    pub(crate) async fn wait(
        &self,
        operation: Box<dyn LongRunningOperation>,
        timeout: Duration,
        address: &ResourceAddress,
    ) -> ProviderResult<()> {
        log::debug!("waiting up to {:?} for {}", timeout, address);
        let options = PollOptions::new(self.poll_interval, timeout);
        wait_for_completion(operation.as_ref(), options, self.clock.as_ref(), &self.cancel)
            .await
            .map_err(|e| e.for_resource(address.clone()))
    }

    /// With import protection on, fail when `id` already exists remotely
    pub(crate) async fn ensure_absent<T>(
        &self,
        api: &dyn ResourceApi<T>,
        id: &str,
        address: &ResourceAddress,
    ) -> ProviderResult<()>
    where
        T: ArmResource + Send + Sync,
    {
        if !self.features.import_protection {
            return Ok(());
        }
        match api.get(id).await {
            Ok(existing) if existing.id().is_some_and(|i| !i.is_empty()) => {
                Err(ProviderError::import_required(&address.resource_type, id)
                    .for_resource(address.clone()))
            }
            Ok(_) | Err(ArmError::NotFound(_)) => Ok(()),
            Err(e) => Err(e
                .into_provider("Failed to check for presence of existing resource")
                .for_resource(address.clone())),
        }
    }

    /// The remote object a create would adopt. With import protection on an
    /// existing object is an error instead, so this is always `None` then.
    pub(crate) async fn existing_for_create<T>(
        &self,
        api: &dyn ResourceApi<T>,
        id: &str,
        address: &ResourceAddress,
    ) -> ProviderResult<Option<T>>
    where
        T: ArmResource + Send + Sync,
    {
        if self.features.import_protection {
            self.ensure_absent(api, id, address).await?;
            return Ok(None);
        }
        let existing = get_if_exists(api, id)
            .await
            .context("Failed to check for presence of existing resource", address)?;
        if existing.is_some() {
            log::info!("adopting existing {}", address);
        }
        Ok(existing)
    }
}

/// Attach a message and the resource address to an ARM failure
pub(crate) trait ArmResultExt<T> {
    fn context(self, message: &str, address: &ResourceAddress) -> ProviderResult<T>;
}

impl<T> ArmResultExt<T> for ArmResult<T> {
    fn context(self, message: &str, address: &ResourceAddress) -> ProviderResult<T> {
        self.map_err(|e| e.into_provider(message).for_resource(address.clone()))
    }
}

/// `Get`, with 404 as `None`
pub(crate) async fn get_if_exists<T>(
    api: &dyn ResourceApi<T>,
    id: &str,
) -> ArmResult<Option<T>>
where
    T: Send + Sync,
{
    match api.get(id).await {
        Ok(resource) => Ok(Some(resource)),
        Err(ArmError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The ID of a freshly written resource; its absence means the API answered
/// with an incomplete body
pub(crate) fn require_remote_id(
    id: Option<&str>,
    address: &ResourceAddress,
) -> ProviderResult<String> {
    match id {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ProviderError::malformed("Cannot read ID").for_resource(address.clone())),
    }
}

/// One resource type's schema and lifecycle
#[async_trait]
pub trait AzureResource: Send + Sync {
    fn name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Schema validation plus cross-field checks
    fn validate(&self, attributes: &HashMap<String, Value>) -> Diagnostics {
        self.schema().validate(attributes)
    }

    async fn create(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()>;

    async fn read(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()>;

    async fn update(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()>;

    async fn delete(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()>;
}

/// [`ResourceType`] view of a registered resource
pub struct RegisteredType(Arc<dyn AzureResource>);

impl ResourceType for RegisteredType {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn schema(&self) -> ResourceSchema {
        self.0.schema()
    }

    fn timeouts(&self) -> Timeouts {
        self.0.timeouts()
    }
}

impl From<Arc<dyn AzureResource>> for RegisteredType {
    fn from(resource: Arc<dyn AzureResource>) -> Self {
        Self(resource)
    }
}

/// Returns all resources supported by this provider
pub fn registry() -> Vec<Arc<dyn AzureResource>> {
    vec![
        Arc::new(firewall::Firewall),
        Arc::new(firewall_network_rule_collection::FirewallNetworkRuleCollection),
        Arc::new(firewall_application_rule_collection::FirewallApplicationRuleCollection),
        Arc::new(eventhub_namespace::EventHubNamespace),
        Arc::new(eventhub::EventHub),
        Arc::new(virtual_hub::VirtualHubResource),
        Arc::new(virtual_hub_connection::VirtualHubConnection),
        Arc::new(hdinsight_hadoop_cluster::HdInsightHadoopCluster),
    ]
}
