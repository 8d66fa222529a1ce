//! azurerm_firewall
//!
//! Rule collections are managed by their own resources and live inside the
//! firewall object, so every firewall write carries over the collections the
//! remote firewall already has and happens under the firewall's name lock.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::provider::{ProviderResult, Timeouts};
use stratus_core::resource::{ResourceAddress, ResourceData};
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use super::{ArmContext, ArmResultExt, AzureResource, get_if_exists, require_remote_id};
use crate::id::{self, AzureResourceId};
use crate::sdk::SubResource;
use crate::sdk::network::{
    AzureFirewall, AzureFirewallIpConfiguration, AzureFirewallIpConfigurationProperties,
    AzureFirewallProperties,
};
use crate::utils::{expand_tags, flatten_tags, normalize_location, validate_tags};
use crate::validate;

pub const RESOURCE_TYPE: &str = "azurerm_firewall";

const MUTABLE: &[&str] = &["ip_configuration", "threat_intel_mode", "tags"];

fn default_threat_intel_mode() -> String {
    "Alert".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallModel {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    #[serde(default = "default_threat_intel_mode")]
    pub threat_intel_mode: String,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub ip_configuration: Vec<IpConfigurationBlock>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpConfigurationBlock {
    pub name: String,
    #[serde(default)]
    pub subnet_id: String,
    pub public_ip_address_id: String,
    /// Assigned by Azure
    #[serde(default)]
    pub private_ip_address: String,
}

/// Build the request body; `existing` supplies the rule collections owned by
/// sibling resources
pub fn expand_firewall(model: &FirewallModel, existing: Option<&AzureFirewall>) -> AzureFirewall {
    let existing_props = existing.and_then(|fw| fw.properties.as_ref());

    AzureFirewall {
        name: Some(model.name.clone()),
        location: Some(normalize_location(&model.location)),
        tags: expand_tags(&model.tags),
        zones: (!model.zones.is_empty()).then(|| model.zones.clone()),
        properties: Some(AzureFirewallProperties {
            ip_configurations: Some(expand_ip_configurations(&model.ip_configuration)),
            network_rule_collections: existing_props
                .and_then(|p| p.network_rule_collections.clone()),
            application_rule_collections: existing_props
                .and_then(|p| p.application_rule_collections.clone()),
            threat_intel_mode: Some(model.threat_intel_mode.clone()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn expand_ip_configurations(
    blocks: &[IpConfigurationBlock],
) -> Vec<AzureFirewallIpConfiguration> {
    blocks
        .iter()
        .map(|block| AzureFirewallIpConfiguration {
            name: Some(block.name.clone()),
            properties: Some(AzureFirewallIpConfigurationProperties {
                subnet: (!block.subnet_id.is_empty()).then(|| SubResource::new(&block.subnet_id)),
                public_ip_address: Some(SubResource::new(&block.public_ip_address_id)),
                private_ip_address: None,
            }),
            ..Default::default()
        })
        .collect()
}

pub fn flatten_firewall(firewall: &AzureFirewall, resource_group: &str) -> FirewallModel {
    let props = firewall.properties.as_ref();
    FirewallModel {
        name: firewall.name.clone().unwrap_or_default(),
        resource_group_name: resource_group.to_string(),
        location: firewall
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        threat_intel_mode: props
            .and_then(|p| p.threat_intel_mode.clone())
            .unwrap_or_default(),
        zones: firewall.zones.clone().unwrap_or_default(),
        ip_configuration: flatten_ip_configurations(
            props.and_then(|p| p.ip_configurations.as_ref()),
        ),
        tags: flatten_tags(firewall.tags.as_ref()),
    }
}

pub fn flatten_ip_configurations(
    configurations: Option<&Vec<AzureFirewallIpConfiguration>>,
) -> Vec<IpConfigurationBlock> {
    let Some(configurations) = configurations else {
        return Vec::new();
    };
    configurations
        .iter()
        .map(|config| {
            let props = config.properties.as_ref();
            IpConfigurationBlock {
                name: config.name.clone().unwrap_or_default(),
                subnet_id: props
                    .and_then(|p| p.subnet.as_ref())
                    .and_then(|s| s.id.clone())
                    .unwrap_or_default(),
                public_ip_address_id: props
                    .and_then(|p| p.public_ip_address.as_ref())
                    .and_then(|s| s.id.clone())
                    .unwrap_or_default(),
                private_ip_address: props
                    .and_then(|p| p.private_ip_address.clone())
                    .unwrap_or_default(),
            }
        })
        .collect()
}

fn parse_id(id: &str) -> ProviderResult<(String, String)> {
    let parsed = AzureResourceId::parse(id)?;
    let name = parsed.get(id::AZURE_FIREWALLS)?.to_string();
    Ok((parsed.resource_group, name))
}

fn address(name: &str, resource_group: &str) -> ResourceAddress {
    ResourceAddress::new(RESOURCE_TYPE, name).in_group(resource_group)
}

pub struct Firewall;

impl Firewall {
    /// PUT the firewall, keeping the remote rule collections, and wait
    async fn write(
        &self,
        ctx: &ArmContext,
        model: &FirewallModel,
        id: &str,
        existing: Option<&AzureFirewall>,
        timeout: std::time::Duration,
        address: &ResourceAddress,
    ) -> ProviderResult<()> {
        let body = expand_firewall(model, existing);
        let operation = ctx
            .apis
            .firewalls
            .create_or_update(id, &body)
            .await
            .context("Failed to create/update Azure Firewall", address)?;
        ctx.wait(operation, timeout, address).await
    }
}

#[async_trait]
impl AzureResource for Firewall {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let ip_configuration = BlockSchema::new()
            .min_items(1)
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("subnet_id", AttributeType::String))
            .attribute(
                AttributeSchema::new("public_ip_address_id", AttributeType::String).required(),
            )
            .attribute(
                AttributeSchema::new("private_ip_address", AttributeType::String).computed(),
            );

        ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Manages an Azure Firewall")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_validation(validate::firewall_name),
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
                AttributeSchema::new(
                    "threat_intel_mode",
                    AttributeType::Enum(vec!["Off".into(), "Alert".into(), "Deny".into()]),
                )
                .with_default("Alert".into()),
            )
            .attribute(AttributeSchema::new("zones", types::string_list()).force_new())
            .attribute(
                AttributeSchema::new("ip_configuration", AttributeType::Block(ip_configuration))
                    .required(),
            )
            .attribute(AttributeSchema::new("tags", types::tags()).with_validation(validate_tags))
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(90, 5, 90, 90)
    }

    async fn create(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        data.apply_defaults(&self.schema());
        let model: FirewallModel = data.decode()?;
        let address = address(&model.name, &model.resource_group_name);
        let id = id::firewall_id(&ctx.subscription_id, &model.resource_group_name, &model.name)
            .to_string();
        log::info!("Creating {}", address);

        let lock = ctx.locks.lock(&model.name, RESOURCE_TYPE).await;
        let existing = ctx
            .existing_for_create(ctx.apis.firewalls.as_ref(), &id, &address)
            .await?;
        self.write(ctx, &model, &id, existing.as_ref(), self.timeouts().create, &address)
            .await?;

        let created = ctx
            .apis
            .firewalls
            .get(&id)
            .await
            .context("Failed to retrieve Azure Firewall", &address)?;
        data.set_id(require_remote_id(created.id.as_deref(), &address)?);
        drop(lock);

        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        let (resource_group, name) = parse_id(data.require_id()?)?;
        let address = address(&name, &resource_group);

        let firewall = get_if_exists(ctx.apis.firewalls.as_ref(), data.require_id()?)
            .await
            .context("Failed to retrieve Azure Firewall", &address)?;
        let Some(firewall) = firewall else {
            log::info!("{} was not found - removing from state", address);
            data.clear_id();
            return Ok(());
        };

        data.encode(&flatten_firewall(&firewall, &resource_group))
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
        log::info!("Updating {}", address);

        let model: FirewallModel = data.decode()?;
        let lock = ctx.locks.lock(&name, RESOURCE_TYPE).await;
        let existing = ctx
            .apis
            .firewalls
            .get(&id)
            .await
            .context("Failed to retrieve Azure Firewall", &address)?;
        self.write(ctx, &model, &id, Some(&existing), self.timeouts().update, &address)
            .await?;
        drop(lock);

        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data.require_id()?.to_string();
        let (resource_group, name) = parse_id(&id)?;
        let address = address(&name, &resource_group);
        log::info!("Deleting {}", address);

        let _lock = ctx.locks.lock(&name, RESOURCE_TYPE).await;
        let operation = ctx
            .apis
            .firewalls
            .delete(&id)
            .await
            .context("Failed to delete Azure Firewall", &address)?;
        match operation {
            Some(operation) => ctx.wait(operation, self.timeouts().delete, &address).await,
            None => Ok(()),
        }
    }
}
