//! In-memory Resource Manager for resource tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stratus_core::poller::{Completed, LongRunningOperation, ManualClock, OperationStatus};
use stratus_core::provider::{BoxFuture, ProviderResult};
use stratus_core::resource::Value;

use super::{ArmApis, ArmContext};
use crate::arm::{ArmError, ArmResult, ResourceApi};
use crate::sdk::eventhub::{EhNamespace, Eventhub, EventhubProperties};
use crate::sdk::hdinsight::{self, Cluster, ConnectivityEndpoint};
use crate::sdk::network::{AzureFirewall, VirtualHub};

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// Server-side behaviour of a stored model
pub trait Stored: Clone + Send + Sync + 'static {
    /// Fill in what the API assigns on write
    fn assign_ids(&mut self, id: &str);

    fn set_tags(&mut self, _tags: HashMap<String, String>) {}

    fn apply_action(&mut self, action: &str, _body: &serde_json::Value) -> ArmResult<()> {
        Err(ArmError::Status {
            status: 400,
            code: "UnsupportedAction".to_string(),
            message: action.to_string(),
        })
    }
}

/// Stays in progress for a number of polls
struct Pending {
    remaining: AtomicUsize,
}

impl LongRunningOperation for Pending {
    fn poll(&self) -> BoxFuture<'_, ProviderResult<OperationStatus>> {
        Box::pin(async move {
            let before = self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            Ok(match before {
                Ok(_) => OperationStatus::InProgress { retry_after: None },
                Err(_) => OperationStatus::Succeeded,
            })
        })
    }
}

/// Never leaves the in-progress state
struct Stuck;

impl LongRunningOperation for Stuck {
    fn poll(&self) -> BoxFuture<'_, ProviderResult<OperationStatus>> {
        Box::pin(async { Ok(OperationStatus::InProgress { retry_after: None }) })
    }
}

pub struct InMemoryApi<T> {
    store: Mutex<HashMap<String, T>>,
    writes: AtomicUsize,
    deletes: AtomicUsize,
    actions: Mutex<Vec<String>>,
    pending_polls: AtomicUsize,
    stuck: AtomicBool,
    /// Yield inside calls so concurrent tasks interleave
    lag: AtomicBool,
    /// `get` never answers
    hung: AtomicBool,
}

impl<T: Stored> InMemoryApi<T> {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            actions: Mutex::new(Vec::new()),
            pending_polls: AtomicUsize::new(0),
            stuck: AtomicBool::new(false),
            lag: AtomicBool::new(false),
            hung: AtomicBool::new(false),
        }
    }

    /// Store a resource as if created out of band
    pub fn seed(&self, id: &str, mut resource: T) {
        resource.assign_ids(id);
        self.store.lock().unwrap().insert(id.to_lowercase(), resource);
    }

    pub fn fetch(&self, id: &str) -> Option<T> {
        self.store.lock().unwrap().get(&id.to_lowercase()).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    pub fn set_pending_polls(&self, polls: usize) {
        self.pending_polls.store(polls, Ordering::SeqCst);
    }

    pub fn never_complete(&self) {
        self.stuck.store(true, Ordering::SeqCst);
    }

    pub fn lag(&self) {
        self.lag.store(true, Ordering::SeqCst);
    }

    pub fn hang(&self) {
        self.hung.store(true, Ordering::SeqCst);
    }

    async fn maybe_yield(&self) {
        if self.lag.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    fn operation(&self) -> Box<dyn LongRunningOperation> {
        if self.stuck.load(Ordering::SeqCst) {
            return Box::new(Stuck);
        }
        match self.pending_polls.load(Ordering::SeqCst) {
            0 => Box::new(Completed),
            n => Box::new(Pending {
                remaining: AtomicUsize::new(n),
            }),
        }
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut T) -> ArmResult<()>) -> ArmResult<()> {
        let mut store = self.store.lock().unwrap();
        let resource = store
            .get_mut(&id.to_lowercase())
            .ok_or_else(|| ArmError::NotFound(id.to_string()))?;
        f(resource)
    }
}

#[async_trait]
impl<T: Stored> ResourceApi<T> for InMemoryApi<T> {
    async fn get(&self, id: &str) -> ArmResult<T> {
        if self.hung.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let found = self.fetch(id);
        self.maybe_yield().await;
        found.ok_or_else(|| ArmError::NotFound(id.to_string()))
    }

    async fn create_or_update(
        &self,
        id: &str,
        body: &T,
    ) -> ArmResult<Box<dyn LongRunningOperation>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.maybe_yield().await;
        let mut resource = body.clone();
        resource.assign_ids(id);
        self.store.lock().unwrap().insert(id.to_lowercase(), resource);
        Ok(self.operation())
    }

    async fn update_tags(
        &self,
        id: &str,
        tags: &HashMap<String, String>,
    ) -> ArmResult<Box<dyn LongRunningOperation>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.modify(id, |r| {
            r.set_tags(tags.clone());
            Ok(())
        })?;
        Ok(self.operation())
    }

    async fn post_action(
        &self,
        id: &str,
        action: &str,
        body: &serde_json::Value,
    ) -> ArmResult<Box<dyn LongRunningOperation>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.modify(id, |r| r.apply_action(action, body))?;
        self.actions.lock().unwrap().push(action.to_string());
        Ok(self.operation())
    }

    async fn delete(&self, id: &str) -> ArmResult<Option<Box<dyn LongRunningOperation>>> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let removed = self.store.lock().unwrap().remove(&id.to_lowercase());
        Ok(removed.map(|_| self.operation()))
    }
}

fn last_segment(id: &str) -> String {
    id.rsplit('/').next().unwrap_or_default().to_string()
}

impl Stored for AzureFirewall {
    fn assign_ids(&mut self, id: &str) {
        self.id = Some(id.to_string());
        self.name.get_or_insert_with(|| last_segment(id));
        let props = self.properties.get_or_insert_with(Default::default);
        props.provisioning_state = Some("Succeeded".to_string());
        for (i, ip) in props.ip_configurations.iter_mut().flatten().enumerate() {
            let name = ip.name.clone().unwrap_or_default();
            ip.id = Some(format!("{}/azureFirewallIpConfigurations/{}", id, name));
            ip.properties
                .get_or_insert_with(Default::default)
                .private_ip_address
                .get_or_insert_with(|| format!("10.0.1.{}", 4 + i));
        }
        for c in props.network_rule_collections.iter_mut().flatten() {
            c.id = Some(format!(
                "{}/networkRuleCollections/{}",
                id,
                c.name.clone().unwrap_or_default()
            ));
        }
        for c in props.application_rule_collections.iter_mut().flatten() {
            c.id = Some(format!(
                "{}/applicationRuleCollections/{}",
                id,
                c.name.clone().unwrap_or_default()
            ));
        }
    }

    fn set_tags(&mut self, tags: HashMap<String, String>) {
        self.tags = Some(tags);
    }
}

impl Stored for VirtualHub {
    fn assign_ids(&mut self, id: &str) {
        self.id = Some(id.to_string());
        self.name.get_or_insert_with(|| last_segment(id));
        let props = self.properties.get_or_insert_with(Default::default);
        props.provisioning_state = Some("Succeeded".to_string());
        for c in props.virtual_network_connections.iter_mut().flatten() {
            c.id = Some(format!(
                "{}/hubVirtualNetworkConnections/{}",
                id,
                c.name.clone().unwrap_or_default()
            ));
        }
    }

    fn set_tags(&mut self, tags: HashMap<String, String>) {
        self.tags = Some(tags);
    }
}

impl Stored for EhNamespace {
    fn assign_ids(&mut self, id: &str) {
        self.id = Some(id.to_string());
        let name = self.name.get_or_insert_with(|| last_segment(id)).clone();
        let props = self.properties.get_or_insert_with(Default::default);
        props.service_bus_endpoint = Some(format!("https://{}.servicebus.windows.net:443/", name));
        props.provisioning_state = Some("Succeeded".to_string());
    }

    fn set_tags(&mut self, tags: HashMap<String, String>) {
        self.tags = Some(tags);
    }
}

impl Stored for Eventhub {
    fn assign_ids(&mut self, id: &str) {
        self.id = Some(id.to_string());
        self.name.get_or_insert_with(|| last_segment(id));
        let props: &mut EventhubProperties = self.properties.get_or_insert_with(Default::default);
        let count = props.partition_count.unwrap_or(0);
        props.partition_ids = Some((0..count).map(|i| i.to_string()).collect());
        props.status = Some("Active".to_string());
    }
}

impl Stored for Cluster {
    /// Like the real API, credentials are dropped from what is stored
    fn assign_ids(&mut self, id: &str) {
        self.id = Some(id.to_string());
        let name = self.name.get_or_insert_with(|| last_segment(id)).clone();
        let props = self.properties.get_or_insert_with(Default::default);
        props.provisioning_state = Some("Succeeded".to_string());
        props.cluster_state = Some("Running".to_string());
        if let Some(definition) = props.cluster_definition.as_mut() {
            definition.configurations = None;
        }
        for role in props
            .compute_profile
            .iter_mut()
            .flat_map(|p| p.roles.iter_mut().flatten())
        {
            if let Some(linux) = role
                .os_profile
                .as_mut()
                .and_then(|os| os.linux_operating_system_profile.as_mut())
            {
                linux.password = None;
                linux.ssh_profile = None;
            }
        }
        for account in props
            .storage_profile
            .iter_mut()
            .flat_map(|p| p.storage_accounts.iter_mut().flatten())
        {
            account.key = None;
        }
        props.connectivity_endpoints = Some(vec![
            ConnectivityEndpoint {
                name: Some("HTTPS".to_string()),
                protocol: Some("TCP".to_string()),
                location: Some(format!("{}.azurehdinsight.net", name)),
                port: Some(443),
            },
            ConnectivityEndpoint {
                name: Some("SSH".to_string()),
                protocol: Some("TCP".to_string()),
                location: Some(format!("{}-ssh.azurehdinsight.net", name)),
                port: Some(22),
            },
        ]);
    }

    fn set_tags(&mut self, tags: HashMap<String, String>) {
        self.tags = Some(tags);
    }

    fn apply_action(&mut self, action: &str, body: &serde_json::Value) -> ArmResult<()> {
        // Gateway credentials are never returned, so there is nothing to store
        if action == "updateGatewaySettings" {
            return Ok(());
        }
        if action != "roles/workernode/resize" {
            return Err(ArmError::NotFound(action.to_string()));
        }
        let count = body["targetInstanceCount"].as_i64();
        let worker = self
            .properties
            .as_mut()
            .and_then(|p| p.compute_profile.as_mut())
            .and_then(|c| c.roles.as_mut())
            .and_then(|roles| {
                roles
                    .iter_mut()
                    .find(|r| r.name.as_deref() == Some(hdinsight::WORKER_NODE))
            })
            .ok_or_else(|| ArmError::NotFound(hdinsight::WORKER_NODE.to_string()))?;
        worker.target_instance_count = count;
        Ok(())
    }
}

/// One in-memory API per service, over a manual clock
pub struct Fakes {
    pub firewalls: Arc<InMemoryApi<AzureFirewall>>,
    pub virtual_hubs: Arc<InMemoryApi<VirtualHub>>,
    pub eventhub_namespaces: Arc<InMemoryApi<EhNamespace>>,
    pub eventhubs: Arc<InMemoryApi<Eventhub>>,
    pub hdinsight_clusters: Arc<InMemoryApi<Cluster>>,
    pub clock: Arc<ManualClock>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            firewalls: Arc::new(InMemoryApi::new()),
            virtual_hubs: Arc::new(InMemoryApi::new()),
            eventhub_namespaces: Arc::new(InMemoryApi::new()),
            eventhubs: Arc::new(InMemoryApi::new()),
            hdinsight_clusters: Arc::new(InMemoryApi::new()),
            clock: Arc::new(ManualClock::new()),
        }
    }

    pub fn context(&self) -> ArmContext {
        let apis = ArmApis {
            firewalls: self.firewalls.clone(),
            virtual_hubs: self.virtual_hubs.clone(),
            eventhub_namespaces: self.eventhub_namespaces.clone(),
            eventhubs: self.eventhubs.clone(),
            hdinsight_clusters: self.hdinsight_clusters.clone(),
        };
        ArmContext::new(SUBSCRIPTION, apis)
            .with_clock(self.clock.clone())
            .with_poll_interval(std::time::Duration::from_secs(5))
    }
}

pub fn strings(items: &[&str]) -> Value {
    Value::List(items.iter().map(|s| Value::string(*s)).collect())
}

pub fn block(pairs: &[(&str, Value)]) -> Value {
    Value::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

pub fn tags(pairs: &[(&str, &str)]) -> Value {
    Value::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::string(*v)))
            .collect(),
    )
}
