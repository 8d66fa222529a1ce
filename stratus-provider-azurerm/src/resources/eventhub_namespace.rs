//! azurerm_eventhub_namespace

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::provider::ProviderResult;
use stratus_core::resource::{ResourceAddress, ResourceData, Value};
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use stratus_core::validation::Diagnostics;

use super::{ArmContext, ArmResultExt, AzureResource, get_if_exists, require_remote_id};
use crate::id::{self, AzureResourceId};
use crate::sdk::eventhub::{EhNamespace, EhNamespaceProperties, Sku};
use crate::utils::{expand_tags, flatten_tags, normalize_location, validate_tags};
use crate::validate;

pub const RESOURCE_TYPE: &str = "azurerm_eventhub_namespace";

const MUTABLE: &[&str] = &[
    "sku",
    "capacity",
    "auto_inflate_enabled",
    "maximum_throughput_units",
    "kafka_enabled",
    "tags",
];

fn default_capacity() -> i64 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventHubNamespaceModel {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub sku: String,
    #[serde(default = "default_capacity")]
    pub capacity: i64,
    #[serde(default)]
    pub auto_inflate_enabled: bool,
    #[serde(default)]
    pub maximum_throughput_units: i64,
    #[serde(default)]
    pub kafka_enabled: bool,
    #[serde(default)]
    pub zone_redundant: bool,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

pub fn expand_namespace(model: &EventHubNamespaceModel) -> EhNamespace {
    EhNamespace {
        name: Some(model.name.clone()),
        location: Some(normalize_location(&model.location)),
        tags: expand_tags(&model.tags),
        sku: Some(Sku {
            name: Some(model.sku.clone()),
            tier: Some(model.sku.clone()),
            capacity: Some(model.capacity),
        }),
        properties: Some(EhNamespaceProperties {
            is_auto_inflate_enabled: Some(model.auto_inflate_enabled),
            maximum_throughput_units: model
                .auto_inflate_enabled
                .then_some(model.maximum_throughput_units),
            kafka_enabled: Some(model.kafka_enabled),
            zone_redundant: Some(model.zone_redundant),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn flatten_namespace(namespace: &EhNamespace, resource_group: &str) -> EventHubNamespaceModel {
    let sku = namespace.sku.as_ref();
    let props = namespace.properties.as_ref();
    EventHubNamespaceModel {
        name: namespace.name.clone().unwrap_or_default(),
        resource_group_name: resource_group.to_string(),
        location: namespace
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        sku: sku.and_then(|s| s.name.clone()).unwrap_or_default(),
        capacity: sku.and_then(|s| s.capacity).unwrap_or_default(),
        auto_inflate_enabled: props
            .and_then(|p| p.is_auto_inflate_enabled)
            .unwrap_or_default(),
        maximum_throughput_units: props
            .and_then(|p| p.maximum_throughput_units)
            .unwrap_or_default(),
        kafka_enabled: props.and_then(|p| p.kafka_enabled).unwrap_or_default(),
        zone_redundant: props.and_then(|p| p.zone_redundant).unwrap_or_default(),
        tags: flatten_tags(namespace.tags.as_ref()),
    }
}

fn parse_id(id: &str) -> ProviderResult<(String, String)> {
    let parsed = AzureResourceId::parse(id)?;
    let name = parsed.get(id::NAMESPACES)?.to_string();
    Ok((parsed.resource_group, name))
}

fn address(name: &str, resource_group: &str) -> ResourceAddress {
    ResourceAddress::new(RESOURCE_TYPE, name).in_group(resource_group)
}

pub struct EventHubNamespace;

impl EventHubNamespace {
    async fn write(
        &self,
        ctx: &ArmContext,
        model: &EventHubNamespaceModel,
        id: &str,
        timeout: std::time::Duration,
        address: &ResourceAddress,
    ) -> ProviderResult<()> {
        let operation = ctx
            .apis
            .eventhub_namespaces
            .create_or_update(id, &expand_namespace(model))
            .await
            .context("Failed to create/update EventHub Namespace", address)?;
        ctx.wait(operation, timeout, address).await
    }
}

#[async_trait]
impl AzureResource for EventHubNamespace {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Manages an EventHub Namespace")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_validation(validate::eventhub_namespace_name),
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
                    "sku",
                    AttributeType::Enum(vec!["Basic".into(), "Standard".into()]),
                )
                .required(),
            )
            .attribute(
                AttributeSchema::new("capacity", AttributeType::Int)
                    .with_default(Value::Int(1))
                    .with_validation(validate::eventhub_namespace_capacity),
            )
            .attribute(
                AttributeSchema::new("auto_inflate_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false)),
            )
            .attribute(
                AttributeSchema::new("maximum_throughput_units", AttributeType::Int)
                    .with_validation(validate::eventhub_maximum_throughput_units),
            )
            .attribute(AttributeSchema::new("kafka_enabled", AttributeType::Bool))
            .attribute(AttributeSchema::new("zone_redundant", AttributeType::Bool).force_new())
            .attribute(AttributeSchema::new("tags", types::tags()).with_validation(validate_tags))
    }

    /// Auto-inflate is Standard-only, and the throughput ceiling only applies
    /// with auto-inflate on
    fn validate(&self, attributes: &HashMap<String, Value>) -> Diagnostics {
        let mut diags = self.schema().validate(attributes);
        let auto_inflate = attributes
            .get("auto_inflate_enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let maximum = attributes
            .get("maximum_throughput_units")
            .and_then(Value::as_int)
            .unwrap_or(0);
        let capacity = attributes
            .get("capacity")
            .and_then(Value::as_int)
            .unwrap_or(1);
        let sku = attributes.get("sku").and_then(Value::as_str);

        if maximum > 0 && !auto_inflate {
            diags.push_error(
                "maximum_throughput_units",
                "maximum_throughput_units can only be set when auto_inflate_enabled is true",
            );
        }
        if auto_inflate && sku == Some("Basic") {
            diags.push_error(
                "auto_inflate_enabled",
                "auto inflate is not supported by the Basic SKU",
            );
        }
        if auto_inflate && maximum < capacity {
            diags.push_error(
                "maximum_throughput_units",
                format!(
                    "maximum_throughput_units must be at least capacity ({}) when auto inflate is enabled",
                    capacity
                ),
            );
        }
        diags
    }

    async fn create(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        data.apply_defaults(&self.schema());
        let model: EventHubNamespaceModel = data.decode()?;
        let address = address(&model.name, &model.resource_group_name);
        let id = id::eventhub_namespace_id(
            &ctx.subscription_id,
            &model.resource_group_name,
            &model.name,
        )
        .to_string();
        log::info!("Creating {}", address);

        ctx.ensure_absent(ctx.apis.eventhub_namespaces.as_ref(), &id, &address)
            .await?;
        self.write(ctx, &model, &id, self.timeouts().create, &address)
            .await?;

        let created = ctx
            .apis
            .eventhub_namespaces
            .get(&id)
            .await
            .context("Failed to retrieve EventHub Namespace", &address)?;
        data.set_id(require_remote_id(created.id.as_deref(), &address)?);

        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data.require_id()?.to_string();
        let (resource_group, name) = parse_id(&id)?;
        let address = address(&name, &resource_group);

        let namespace = get_if_exists(ctx.apis.eventhub_namespaces.as_ref(), &id)
            .await
            .context("Failed to retrieve EventHub Namespace", &address)?;
        let Some(namespace) = namespace else {
            log::info!("{} was not found - removing from state", address);
            data.clear_id();
            return Ok(());
        };

        data.encode(&flatten_namespace(&namespace, &resource_group))
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

        let model: EventHubNamespaceModel = data.decode()?;
        self.write(ctx, &model, &id, self.timeouts().update, &address)
            .await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data.require_id()?.to_string();
        let (resource_group, name) = parse_id(&id)?;
        let address = address(&name, &resource_group);
        log::info!("Deleting {}", address);

        let operation = ctx
            .apis
            .eventhub_namespaces
            .delete(&id)
            .await
            .context("Failed to delete EventHub Namespace", &address)?;
        match operation {
            Some(operation) => ctx.wait(operation, self.timeouts().delete, &address).await,
            None => Ok(()),
        }
    }
}
