//! azurerm_hdinsight_hadoop_cluster
//!
//! Azure never returns credentials: gateway settings, node passwords, SSH keys
//! and storage account keys are carried over from prior data on Read. Only
//! tags, the worker node count and the gateway credentials update in place.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use stratus_core::codec::singleton;
use stratus_core::provider::{ProviderError, ProviderResult, Timeouts};
use stratus_core::resource::{ResourceAddress, ResourceData, Value};
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};
use stratus_core::validation::Diagnostics;

use super::{ArmContext, ArmResultExt, AzureResource, get_if_exists, require_remote_id};
use crate::id::{self, AzureResourceId};
use crate::sdk::hdinsight::{
    Cluster, ClusterDefinition, ClusterProperties, ComputeProfile, ConnectivityEndpoint,
    HEAD_NODE, HardwareProfile, LinuxOperatingSystemProfile, OsProfile, Role, SshProfile,
    SshPublicKey, StorageAccount, StorageProfile, VirtualNetworkProfile, WORKER_NODE,
    ZOOKEEPER_NODE,
};
use crate::utils::{
    expand_tags, flatten_tags, normalize_location, parse_storage_container_id, validate_tags,
};
use crate::validate;

pub const RESOURCE_TYPE: &str = "azurerm_hdinsight_hadoop_cluster";

pub const CLUSTER_KIND: &str = "Hadoop";
pub const RESIZE_ACTION: &str = "roles/workernode/resize";
pub const UPDATE_GATEWAY_ACTION: &str = "updateGatewaySettings";

const HEAD_NODE_COUNT: i64 = 2;
const ZOOKEEPER_NODE_COUNT: i64 = 3;

const MUTABLE: &[&str] = &["tags", "roles", "gateway"];

fn default_gateway_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HadoopClusterModel {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub cluster_version: String,
    pub tier: String,
    #[serde(default, with = "singleton")]
    pub component_version: Option<ComponentVersionBlock>,
    #[serde(default, with = "singleton")]
    pub gateway: Option<GatewayBlock>,
    #[serde(default)]
    pub storage_account: Vec<StorageAccountBlock>,
    #[serde(default, with = "singleton")]
    pub roles: Option<RolesBlock>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub https_endpoint: String,
    #[serde(default)]
    pub ssh_endpoint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentVersionBlock {
    pub hadoop: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayBlock {
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageAccountBlock {
    pub storage_account_key: String,
    pub storage_container_id: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolesBlock {
    #[serde(default, with = "singleton")]
    pub head_node: Option<NodeBlock>,
    #[serde(default, with = "singleton")]
    pub worker_node: Option<WorkerNodeBlock>,
    #[serde(default, with = "singleton")]
    pub zookeeper_node: Option<NodeBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBlock {
    pub vm_size: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub ssh_keys: Vec<String>,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub virtual_network_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerNodeBlock {
    #[serde(flatten)]
    pub node: NodeBlock,
    #[serde(default)]
    pub min_instance_count: i64,
    pub target_instance_count: i64,
}

/// Gateway credentials in the shape of both `configurations.gateway` and
/// the `updateGatewaySettings` body
pub fn gateway_settings(gateway: &GatewayBlock) -> serde_json::Value {
    json!({
        "restAuthCredential.isEnabled": gateway.enabled,
        "restAuthCredential.username": gateway.username,
        "restAuthCredential.password": gateway.password,
    })
}

pub fn expand_cluster(model: &HadoopClusterModel) -> ProviderResult<Cluster> {
    let component_version = model
        .component_version
        .as_ref()
        .map(|c| HashMap::from([(CLUSTER_KIND.to_string(), c.hadoop.clone())]));

    Ok(Cluster {
        name: Some(model.name.clone()),
        location: Some(normalize_location(&model.location)),
        tags: expand_tags(&model.tags),
        properties: Some(ClusterProperties {
            cluster_version: Some(model.cluster_version.clone()),
            os_type: Some("Linux".to_string()),
            tier: Some(model.tier.clone()),
            cluster_definition: Some(ClusterDefinition {
                kind: Some(CLUSTER_KIND.to_string()),
                component_version,
                configurations: model
                    .gateway
                    .as_ref()
                    .map(|g| json!({ "gateway": gateway_settings(g) })),
            }),
            compute_profile: Some(ComputeProfile {
                roles: Some(expand_roles(model.roles.as_ref())),
            }),
            storage_profile: Some(StorageProfile {
                storage_accounts: Some(expand_storage_accounts(&model.storage_account)?),
            }),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Head and zookeeper nodes have fixed instance counts
pub fn expand_roles(roles: Option<&RolesBlock>) -> Vec<Role> {
    let Some(roles) = roles else {
        return Vec::new();
    };
    let mut expanded = Vec::new();
    if let Some(head) = &roles.head_node {
        expanded.push(expand_role(HEAD_NODE, head, HEAD_NODE_COUNT, None));
    }
    if let Some(worker) = &roles.worker_node {
        let min = (worker.min_instance_count > 0).then_some(worker.min_instance_count);
        expanded.push(expand_role(
            WORKER_NODE,
            &worker.node,
            worker.target_instance_count,
            min,
        ));
    }
    if let Some(zookeeper) = &roles.zookeeper_node {
        expanded.push(expand_role(
            ZOOKEEPER_NODE,
            zookeeper,
            ZOOKEEPER_NODE_COUNT,
            None,
        ));
    }
    expanded
}

fn expand_role(name: &str, node: &NodeBlock, target: i64, min: Option<i64>) -> Role {
    let ssh_profile = (!node.ssh_keys.is_empty()).then(|| SshProfile {
        public_keys: Some(
            node.ssh_keys
                .iter()
                .map(|key| SshPublicKey {
                    certificate_data: Some(key.clone()),
                })
                .collect(),
        ),
    });

    Role {
        name: Some(name.to_string()),
        min_instance_count: min,
        target_instance_count: Some(target),
        hardware_profile: Some(HardwareProfile {
            vm_size: Some(node.vm_size.clone()),
        }),
        os_profile: Some(OsProfile {
            linux_operating_system_profile: Some(LinuxOperatingSystemProfile {
                username: Some(node.username.clone()),
                password: (!node.password.is_empty()).then(|| node.password.clone()),
                ssh_profile,
            }),
        }),
        virtual_network_profile: (!node.virtual_network_id.is_empty()).then(|| {
            VirtualNetworkProfile {
                id: Some(node.virtual_network_id.clone()),
                subnet: Some(node.subnet_id.clone()),
            }
        }),
    }
}

pub fn expand_storage_accounts(
    blocks: &[StorageAccountBlock],
) -> ProviderResult<Vec<StorageAccount>> {
    blocks
        .iter()
        .map(|block| {
            let container = parse_storage_container_id(&block.storage_container_id)
                .map_err(|e| ProviderError::validation(format!("storage_container_id: {}", e)))?;
            Ok(StorageAccount {
                name: Some(container.blob_endpoint_host),
                is_default: Some(block.is_default),
                container: Some(container.container_name),
                key: Some(block.storage_account_key.clone()),
            })
        })
        .collect()
}

/// `prior` supplies what the API never returns
pub fn flatten_cluster(
    cluster: &Cluster,
    resource_group: &str,
    prior: &HadoopClusterModel,
) -> HadoopClusterModel {
    let props = cluster.properties.as_ref();
    let definition = props.and_then(|p| p.cluster_definition.as_ref());
    let endpoints = props.and_then(|p| p.connectivity_endpoints.as_ref());

    HadoopClusterModel {
        name: cluster.name.clone().unwrap_or_default(),
        resource_group_name: resource_group.to_string(),
        location: cluster
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        cluster_version: props
            .and_then(|p| p.cluster_version.clone())
            .unwrap_or_default(),
        tier: props.and_then(|p| p.tier.clone()).unwrap_or_default(),
        component_version: definition
            .and_then(|d| d.component_version.as_ref())
            .and_then(|versions| versions.get(CLUSTER_KIND))
            .map(|hadoop| ComponentVersionBlock {
                hadoop: hadoop.clone(),
            }),
        gateway: prior.gateway.clone(),
        storage_account: flatten_storage_accounts(
            props
                .and_then(|p| p.storage_profile.as_ref())
                .and_then(|s| s.storage_accounts.as_ref()),
            &prior.storage_account,
        ),
        roles: flatten_roles(
            props.and_then(|p| p.compute_profile.as_ref()),
            prior.roles.as_ref(),
        ),
        tags: flatten_tags(cluster.tags.as_ref()),
        https_endpoint: endpoint_location(endpoints, "HTTPS"),
        ssh_endpoint: endpoint_location(endpoints, "SSH"),
    }
}

pub fn flatten_roles(
    profile: Option<&ComputeProfile>,
    prior: Option<&RolesBlock>,
) -> Option<RolesBlock> {
    let profile = profile?;
    let worker = profile.role(WORKER_NODE);
    Some(RolesBlock {
        head_node: flatten_node(
            profile.role(HEAD_NODE),
            prior.and_then(|p| p.head_node.as_ref()),
        ),
        worker_node: flatten_node(
            worker,
            prior.and_then(|p| p.worker_node.as_ref()).map(|w| &w.node),
        )
        .map(|node| WorkerNodeBlock {
            node,
            min_instance_count: worker.and_then(|w| w.min_instance_count).unwrap_or_default(),
            target_instance_count: worker
                .and_then(|w| w.target_instance_count)
                .unwrap_or_default(),
        }),
        zookeeper_node: flatten_node(
            profile.role(ZOOKEEPER_NODE),
            prior.and_then(|p| p.zookeeper_node.as_ref()),
        ),
    })
}

fn flatten_node(role: Option<&Role>, prior: Option<&NodeBlock>) -> Option<NodeBlock> {
    let role = role?;
    let linux = role
        .os_profile
        .as_ref()
        .and_then(|os| os.linux_operating_system_profile.as_ref());
    let network = role.virtual_network_profile.as_ref();

    let password = linux
        .and_then(|l| l.password.clone())
        .or_else(|| prior.map(|p| p.password.clone()))
        .unwrap_or_default();
    let ssh_keys = linux
        .and_then(|l| l.ssh_profile.as_ref())
        .and_then(|s| s.public_keys.as_ref())
        .map(|keys| keys.iter().filter_map(|k| k.certificate_data.clone()).collect())
        .or_else(|| prior.map(|p| p.ssh_keys.clone()))
        .unwrap_or_default();

    Some(NodeBlock {
        vm_size: role
            .hardware_profile
            .as_ref()
            .and_then(|h| h.vm_size.clone())
            .unwrap_or_default(),
        username: linux.and_then(|l| l.username.clone()).unwrap_or_default(),
        password,
        ssh_keys,
        subnet_id: network.and_then(|n| n.subnet.clone()).unwrap_or_default(),
        virtual_network_id: network.and_then(|n| n.id.clone()).unwrap_or_default(),
    })
}

pub fn flatten_storage_accounts(
    accounts: Option<&Vec<StorageAccount>>,
    prior: &[StorageAccountBlock],
) -> Vec<StorageAccountBlock> {
    accounts
        .into_iter()
        .flatten()
        .map(|account| {
            let storage_container_id = format!(
                "https://{}/{}",
                account.name.as_deref().unwrap_or_default(),
                account.container.as_deref().unwrap_or_default()
            );
            let storage_account_key = account
                .key
                .clone()
                .or_else(|| {
                    prior
                        .iter()
                        .find(|p| p.storage_container_id == storage_container_id)
                        .map(|p| p.storage_account_key.clone())
                })
                .unwrap_or_default();
            StorageAccountBlock {
                storage_account_key,
                storage_container_id,
                is_default: account.is_default.unwrap_or_default(),
            }
        })
        .collect()
}

fn endpoint_location(endpoints: Option<&Vec<ConnectivityEndpoint>>, name: &str) -> String {
    endpoints
        .into_iter()
        .flatten()
        .find(|e| e.name.as_deref() == Some(name))
        .and_then(|e| e.location.clone())
        .unwrap_or_default()
}

/// Checks that depend on more than one attribute
pub fn validate_model(model: &HadoopClusterModel) -> Diagnostics {
    let mut diags = Diagnostics::ok();

    if let Some(gateway) = &model.gateway
        && !gateway.enabled
    {
        diags.push_error("gateway.0.enabled", "only an enabled gateway is supported");
    }

    let defaults = model.storage_account.iter().filter(|s| s.is_default).count();
    if defaults != 1 {
        diags.push_error(
            "storage_account",
            format!("exactly one storage_account must be the default, got {}", defaults),
        );
    }
    for (i, account) in model.storage_account.iter().enumerate() {
        if let Err(e) = parse_storage_container_id(&account.storage_container_id) {
            diags.push_error(format!("storage_account.{}.storage_container_id", i), e);
        }
    }

    if let Some(roles) = &model.roles {
        let nodes = [
            ("head_node", roles.head_node.as_ref()),
            ("worker_node", roles.worker_node.as_ref().map(|w| &w.node)),
            ("zookeeper_node", roles.zookeeper_node.as_ref()),
        ];
        for (role, node) in nodes {
            if let Some(node) = node
                && node.password.is_empty()
                && node.ssh_keys.is_empty()
            {
                diags.push_error(
                    format!("roles.0.{}.0", role),
                    "either a password or ssh_keys must be specified",
                );
            }
        }
        if let Some(worker) = &roles.worker_node
            && worker.min_instance_count > worker.target_instance_count
        {
            diags.push_error(
                "roles.0.worker_node.0.min_instance_count",
                format!(
                    "min_instance_count must not exceed target_instance_count ({})",
                    worker.target_instance_count
                ),
            );
        }
    }
    diags
}

fn node_schema() -> BlockSchema {
    BlockSchema::single()
        .min_items(1)
        .attribute(
            AttributeSchema::new("vm_size", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("username", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("password", AttributeType::String)
                .sensitive()
                .force_new(),
        )
        .attribute(AttributeSchema::new("ssh_keys", types::string_list()).force_new())
        .attribute(AttributeSchema::new("subnet_id", AttributeType::String).force_new())
        .attribute(AttributeSchema::new("virtual_network_id", AttributeType::String).force_new())
}

fn parse_id(id: &str) -> ProviderResult<(String, String)> {
    let parsed = AzureResourceId::parse(id)?;
    let name = parsed.get(id::CLUSTERS)?.to_string();
    Ok((parsed.resource_group, name))
}

fn address(name: &str, resource_group: &str) -> ResourceAddress {
    ResourceAddress::new(RESOURCE_TYPE, name).in_group(resource_group)
}

pub struct HdInsightHadoopCluster;

#[async_trait]
impl AzureResource for HdInsightHadoopCluster {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let component_version = BlockSchema::single().min_items(1).attribute(
            AttributeSchema::new("hadoop", AttributeType::String)
                .required()
                .force_new(),
        );
        let gateway = BlockSchema::single()
            .min_items(1)
            .attribute(
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .with_default(Value::Bool(true)),
            )
            .attribute(AttributeSchema::new("username", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("password", AttributeType::String)
                    .required()
                    .sensitive(),
            );
        let storage_account = BlockSchema::new()
            .min_items(1)
            .attribute(
                AttributeSchema::new("storage_account_key", AttributeType::String)
                    .required()
                    .sensitive()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("storage_container_id", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("is_default", AttributeType::Bool)
                    .required()
                    .force_new(),
            );
        let worker_node = node_schema()
            .attribute(
                AttributeSchema::new("min_instance_count", types::positive_int()).force_new(),
            )
            .attribute(
                AttributeSchema::new("target_instance_count", types::positive_int()).required(),
            );
        let roles = BlockSchema::single()
            .min_items(1)
            .attribute(
                AttributeSchema::new("head_node", AttributeType::Block(node_schema())).required(),
            )
            .attribute(
                AttributeSchema::new("worker_node", AttributeType::Block(worker_node)).required(),
            )
            .attribute(
                AttributeSchema::new("zookeeper_node", AttributeType::Block(node_schema())).required(),
            );

        ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Manages a HDInsight Hadoop Cluster")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_validation(validate::hdinsight_cluster_name),
            )
            .attribute(
                AttributeSchema::new("resource_group_name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("location", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("cluster_version", AttributeType::String)
                    .required()
                    .force_new()
                    .with_validation(validate::hdinsight_cluster_version),
            )
            .attribute(
                AttributeSchema::new(
                    "tier",
                    AttributeType::Enum(vec!["Standard".into(), "Premium".into()]),
                )
                .required()
                .force_new(),
            )
            .attribute(
                AttributeSchema::new("component_version", AttributeType::Block(component_version))
                    .required(),
            )
            .attribute(AttributeSchema::new("gateway", AttributeType::Block(gateway)).required())
            .attribute(
                AttributeSchema::new("storage_account", AttributeType::Block(storage_account))
                    .required(),
            )
            .attribute(AttributeSchema::new("roles", AttributeType::Block(roles)).required())
            .attribute(AttributeSchema::new("tags", types::tags()).with_validation(validate_tags))
            .attribute(AttributeSchema::new("https_endpoint", AttributeType::String).computed())
            .attribute(AttributeSchema::new("ssh_endpoint", AttributeType::String).computed())
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(60, 5, 60, 60)
    }

    fn validate(&self, attributes: &HashMap<String, Value>) -> Diagnostics {
        let mut diags = self.schema().validate(attributes);
        let json = serde_json::Value::Object(
            attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        );
        // A model that does not decode has already been reported by the schema
        if let Ok(model) = serde_json::from_value::<HadoopClusterModel>(json) {
            diags.extend(validate_model(&model));
        }
        diags
    }

    async fn create(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        data.apply_defaults(&self.schema());
        let model: HadoopClusterModel = data.decode()?;
        let address = address(&model.name, &model.resource_group_name);
        let id =
            id::hdinsight_cluster_id(&ctx.subscription_id, &model.resource_group_name, &model.name)
                .to_string();
        log::info!("Creating {}", address);

        ctx.ensure_absent(ctx.apis.hdinsight_clusters.as_ref(), &id, &address)
            .await?;
        let body = expand_cluster(&model).map_err(|e| e.for_resource(address.clone()))?;
        let operation = ctx
            .apis
            .hdinsight_clusters
            .create_or_update(&id, &body)
            .await
            .context("Failed to create HDInsight Hadoop Cluster", &address)?;
        ctx.wait(operation, self.timeouts().create, &address).await?;

        let created = ctx
            .apis
            .hdinsight_clusters
            .get(&id)
            .await
            .context("Failed to retrieve HDInsight Hadoop Cluster", &address)?;
        data.set_id(require_remote_id(created.id.as_deref(), &address)?);

        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        let (resource_group, name) = parse_id(data.require_id()?)?;
        let address = address(&name, &resource_group);

        let cluster = get_if_exists(ctx.apis.hdinsight_clusters.as_ref(), data.require_id()?)
            .await
            .context("Failed to retrieve HDInsight Hadoop Cluster", &address)?;
        let Some(cluster) = cluster else {
            log::info!("{} was not found - removing from state", address);
            data.clear_id();
            return Ok(());
        };

        let prior = match data.decode::<HadoopClusterModel>() {
            Ok(prior) => prior,
            Err(e) => {
                log::debug!("no prior credentials for {}: {}", address, e);
                HadoopClusterModel::default()
            }
        };
        data.encode(&flatten_cluster(&cluster, &resource_group, &prior))
    }

    async fn update(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        data.apply_defaults(&self.schema());
        let id = data.require_id()?.to_string();
        let (resource_group, name) = parse_id(&id)?;
        let address = address(&name, &resource_group);
        if !data.has_changes(MUTABLE) {
            log::debug!("{} has no changes", address);
            return Ok(());
        }
        let model: HadoopClusterModel = data.decode()?;
        let api = ctx.apis.hdinsight_clusters.as_ref();

        if data.has_change("tags") {
            log::info!("Updating tags of {}", address);
            let operation = api
                .update_tags(&id, &model.tags)
                .await
                .context("Failed to update tags of HDInsight Hadoop Cluster", &address)?;
            ctx.wait(operation, self.timeouts().update, &address).await?;
        }

        let target = model
            .roles
            .as_ref()
            .and_then(|r| r.worker_node.as_ref())
            .map(|w| w.target_instance_count);
        if data.has_change("roles")
            && let Some(target) = target
        {
            let existing = api
                .get(&id)
                .await
                .context("Failed to retrieve HDInsight Hadoop Cluster", &address)?;
            let current = existing
                .properties
                .as_ref()
                .and_then(|p| p.compute_profile.as_ref())
                .and_then(|c| c.role(WORKER_NODE))
                .and_then(|r| r.target_instance_count);
            if current != Some(target) {
                log::info!("Resizing worker nodes of {} to {}", address, target);
                let operation = api
                    .post_action(&id, RESIZE_ACTION, &json!({ "targetInstanceCount": target }))
                    .await
                    .context(
                        "Failed to resize worker nodes of HDInsight Hadoop Cluster",
                        &address,
                    )?;
                ctx.wait(operation, self.timeouts().update, &address).await?;
            }
        }

        if data.has_change("gateway")
            && let Some(gateway) = &model.gateway
        {
            log::info!("Updating gateway credentials of {}", address);
            let operation = api
                .post_action(&id, UPDATE_GATEWAY_ACTION, &gateway_settings(gateway))
                .await
                .context("Failed to update gateway of HDInsight Hadoop Cluster", &address)?;
            ctx.wait(operation, self.timeouts().update, &address).await?;
        }

        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data.require_id()?.to_string();
        let (resource_group, name) = parse_id(&id)?;
        let address = address(&name, &resource_group);
        log::info!("Deleting {}", address);

        let operation = ctx
            .apis
            .hdinsight_clusters
            .delete(&id)
            .await
            .context("Failed to delete HDInsight Hadoop Cluster", &address)?;
        match operation {
            Some(operation) => ctx.wait(operation, self.timeouts().delete, &address).await,
            None => Ok(()),
        }
    }
}
