//! azurerm_eventhub
//!
//! Event hubs live under a namespace but have their own endpoint, so they
//! follow the top-level lifecycle with a namespace-scoped ID.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::codec::singleton;
use stratus_core::provider::ProviderResult;
use stratus_core::resource::{ResourceAddress, ResourceData, Value};
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use super::{ArmContext, ArmResultExt, AzureResource, get_if_exists, require_remote_id};
use crate::id::{self, AzureResourceId};
use crate::sdk::eventhub::{
    CaptureDescription, Destination, DestinationProperties, Eventhub, EventhubProperties,
};
use crate::validate;

pub const RESOURCE_TYPE: &str = "azurerm_eventhub";

/// The only capture destination Azure supports
pub const BLOB_DESTINATION: &str = "EventHubArchive.AzureBlockBlob";

const MUTABLE: &[&str] = &["message_retention", "capture_description"];

fn default_interval() -> i64 {
    300
}

fn default_size_limit() -> i64 {
    314_572_800
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventHubModel {
    pub name: String,
    pub namespace_name: String,
    pub resource_group_name: String,
    pub partition_count: i64,
    pub message_retention: i64,
    #[serde(default, with = "singleton")]
    pub capture_description: Option<CaptureDescriptionBlock>,
    #[serde(default)]
    pub partition_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureDescriptionBlock {
    pub enabled: bool,
    pub encoding: String,
    #[serde(default = "default_interval")]
    pub interval_in_seconds: i64,
    #[serde(default = "default_size_limit")]
    pub size_limit_in_bytes: i64,
    #[serde(default)]
    pub skip_empty_archives: bool,
    #[serde(default, with = "singleton")]
    pub destination: Option<DestinationBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationBlock {
    pub name: String,
    pub archive_name_format: String,
    pub blob_container_name: String,
    pub storage_account_id: String,
}

pub fn expand_eventhub(model: &EventHubModel) -> Eventhub {
    Eventhub {
        name: Some(model.name.clone()),
        properties: Some(EventhubProperties {
            partition_count: Some(model.partition_count),
            message_retention_in_days: Some(model.message_retention),
            capture_description: model.capture_description.as_ref().map(expand_capture),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn expand_capture(block: &CaptureDescriptionBlock) -> CaptureDescription {
    CaptureDescription {
        enabled: Some(block.enabled),
        encoding: Some(block.encoding.clone()),
        interval_in_seconds: Some(block.interval_in_seconds),
        size_limit_in_bytes: Some(block.size_limit_in_bytes),
        skip_empty_archives: Some(block.skip_empty_archives),
        destination: block.destination.as_ref().map(|d| Destination {
            name: Some(d.name.clone()),
            properties: Some(DestinationProperties {
                storage_account_resource_id: Some(d.storage_account_id.clone()),
                blob_container: Some(d.blob_container_name.clone()),
                archive_name_format: Some(d.archive_name_format.clone()),
            }),
        }),
    }
}

pub fn flatten_eventhub(hub: &Eventhub, key: &EventHubKey) -> EventHubModel {
    let props = hub.properties.as_ref();
    EventHubModel {
        name: hub.name.clone().unwrap_or_else(|| key.name.clone()),
        namespace_name: key.namespace.clone(),
        resource_group_name: key.resource_group.clone(),
        partition_count: props.and_then(|p| p.partition_count).unwrap_or_default(),
        message_retention: props
            .and_then(|p| p.message_retention_in_days)
            .unwrap_or_default(),
        capture_description: flatten_capture(props.and_then(|p| p.capture_description.as_ref())),
        partition_ids: props
            .and_then(|p| p.partition_ids.clone())
            .unwrap_or_default(),
    }
}

pub fn flatten_capture(capture: Option<&CaptureDescription>) -> Option<CaptureDescriptionBlock> {
    let capture = capture?;
    let destination = capture.destination.as_ref().map(|d| {
        let props = d.properties.as_ref();
        DestinationBlock {
            name: d.name.clone().unwrap_or_default(),
            archive_name_format: props
                .and_then(|p| p.archive_name_format.clone())
                .unwrap_or_default(),
            blob_container_name: props
                .and_then(|p| p.blob_container.clone())
                .unwrap_or_default(),
            storage_account_id: props
                .and_then(|p| p.storage_account_resource_id.clone())
                .unwrap_or_default(),
        }
    });
    Some(CaptureDescriptionBlock {
        enabled: capture.enabled.unwrap_or_default(),
        encoding: capture.encoding.clone().unwrap_or_default(),
        interval_in_seconds: capture.interval_in_seconds.unwrap_or_default(),
        size_limit_in_bytes: capture.size_limit_in_bytes.unwrap_or_default(),
        skip_empty_archives: capture.skip_empty_archives.unwrap_or_default(),
        destination,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHubKey {
    pub resource_group: String,
    pub namespace: String,
    pub name: String,
}

impl EventHubKey {
    fn parse(id: &str) -> ProviderResult<Self> {
        let parsed = AzureResourceId::parse(id)?;
        Ok(Self {
            namespace: parsed.get(id::NAMESPACES)?.to_string(),
            name: parsed.get(id::EVENTHUBS)?.to_string(),
            resource_group: parsed.resource_group,
        })
    }

    fn address(&self) -> ResourceAddress {
        ResourceAddress::new(RESOURCE_TYPE, &self.name).in_group(&self.resource_group)
    }
}

pub struct EventHub;

impl EventHub {
    async fn write(
        &self,
        ctx: &ArmContext,
        model: &EventHubModel,
        id: &str,
        timeout: std::time::Duration,
        address: &ResourceAddress,
    ) -> ProviderResult<()> {
        let operation = ctx
            .apis
            .eventhubs
            .create_or_update(id, &expand_eventhub(model))
            .await
            .context("Failed to create/update EventHub", address)?;
        ctx.wait(operation, timeout, address).await
    }
}

#[async_trait]
impl AzureResource for EventHub {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let destination = BlockSchema::single()
            .min_items(1)
            .attribute(
                AttributeSchema::new(
                    "name",
                    AttributeType::Enum(vec![BLOB_DESTINATION.to_string()]),
                )
                .required(),
            )
            .attribute(
                AttributeSchema::new("archive_name_format", AttributeType::String)
                    .required()
                    .with_validation(validate::capture_archive_name_format),
            )
            .attribute(
                AttributeSchema::new("blob_container_name", AttributeType::String).required(),
            )
            .attribute(
                AttributeSchema::new("storage_account_id", AttributeType::String).required(),
            );

        let capture = BlockSchema::single()
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool).required())
            .attribute(
                AttributeSchema::new(
                    "encoding",
                    AttributeType::Enum(vec!["Avro".into(), "AvroDeflate".into()]),
                )
                .required(),
            )
            .attribute(
                AttributeSchema::new("interval_in_seconds", AttributeType::Int)
                    .with_default(Value::Int(default_interval()))
                    .with_validation(validate::capture_interval),
            )
            .attribute(
                AttributeSchema::new("size_limit_in_bytes", AttributeType::Int)
                    .with_default(Value::Int(default_size_limit()))
                    .with_validation(validate::capture_size_limit),
            )
            .attribute(AttributeSchema::new("skip_empty_archives", AttributeType::Bool))
            .attribute(
                AttributeSchema::new("destination", AttributeType::Block(destination)).required(),
            );

        ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Manages an Event Hub within an EventHub Namespace")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_validation(validate::eventhub_name),
            )
            .attribute(
                AttributeSchema::new("namespace_name", AttributeType::String)
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
                AttributeSchema::new("partition_count", AttributeType::Int)
                    .required()
                    .force_new()
                    .with_validation(validate::eventhub_partition_count),
            )
            .attribute(
                AttributeSchema::new("message_retention", AttributeType::Int)
                    .required()
                    .with_validation(validate::eventhub_message_retention),
            )
            .attribute(AttributeSchema::new(
                "capture_description",
                AttributeType::Block(capture),
            ))
            .attribute(AttributeSchema::new("partition_ids", types::string_list()).computed())
    }

    async fn create(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        data.apply_defaults(&self.schema());
        let model: EventHubModel = data.decode()?;
        let key = EventHubKey {
            resource_group: model.resource_group_name.clone(),
            namespace: model.namespace_name.clone(),
            name: model.name.clone(),
        };
        let address = key.address();
        let id = id::eventhub_id(
            &ctx.subscription_id,
            &key.resource_group,
            &key.namespace,
            &key.name,
        )
        .to_string();
        log::info!("Creating {}", address);

        ctx.ensure_absent(ctx.apis.eventhubs.as_ref(), &id, &address)
            .await?;
        self.write(ctx, &model, &id, self.timeouts().create, &address)
            .await?;

        let created = ctx
            .apis
            .eventhubs
            .get(&id)
            .await
            .context("Failed to retrieve EventHub", &address)?;
        data.set_id(require_remote_id(created.id.as_deref(), &address)?);

        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data.require_id()?.to_string();
        let key = EventHubKey::parse(&id)?;
        let address = key.address();

        let hub = get_if_exists(ctx.apis.eventhubs.as_ref(), &id)
            .await
            .context("Failed to retrieve EventHub", &address)?;
        let Some(hub) = hub else {
            log::info!("{} was not found - removing from state", address);
            data.clear_id();
            return Ok(());
        };

        data.encode(&flatten_eventhub(&hub, &key))
    }

    async fn update(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        data.apply_defaults(&self.schema());
        let id = data.require_id()?.to_string();
        let address = EventHubKey::parse(&id)?.address();
        if !data.has_changes(MUTABLE) {
            log::debug!("{} has no changes", address);
            return Ok(());
        }
        log::info!("Updating {}", address);

        let model: EventHubModel = data.decode()?;
        self.write(ctx, &model, &id, self.timeouts().update, &address)
            .await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data.require_id()?.to_string();
        let address = EventHubKey::parse(&id)?.address();
        log::info!("Deleting {}", address);

        let operation = ctx
            .apis
            .eventhubs
            .delete(&id)
            .await
            .context("Failed to delete EventHub", &address)?;
        match operation {
            Some(operation) => ctx.wait(operation, self.timeouts().delete, &address).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{Fakes, SUBSCRIPTION, block};
    use std::time::Duration;
    use stratus_core::provider::ErrorKind;

    const ARCHIVE_FORMAT: &str =
        "{Namespace}/{EventHub}/{PartitionId}/{Year}/{Month}/{Day}/{Hour}/{Minute}/{Second}";
    const STORAGE_ACCOUNT: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/acctestRG/providers/Microsoft.Storage/storageAccounts/acctestsa";

    fn hub_id() -> String {
        id::eventhub_id(SUBSCRIPTION, "acctestRG", "acctesteventhubnamespace", "acctesteventhub")
            .to_string()
    }

    fn key() -> EventHubKey {
        EventHubKey {
            resource_group: "acctestRG".to_string(),
            namespace: "acctesteventhubnamespace".to_string(),
            name: "acctesteventhub".to_string(),
        }
    }

    fn capture_config() -> Value {
        Value::List(vec![block(&[
            ("enabled", Value::Bool(true)),
            ("encoding", Value::string("Avro")),
            (
                "destination",
                Value::List(vec![block(&[
                    ("name", Value::string(BLOB_DESTINATION)),
                    ("archive_name_format", Value::string(ARCHIVE_FORMAT)),
                    ("blob_container_name", Value::string("capture")),
                    ("storage_account_id", Value::string(STORAGE_ACCOUNT)),
                ])]),
            ),
        ])])
    }

    fn config() -> ResourceData {
        ResourceData::new(RESOURCE_TYPE)
            .with_config("name", Value::string("acctesteventhub"))
            .with_config("namespace_name", Value::string("acctesteventhubnamespace"))
            .with_config("resource_group_name", Value::string("acctestRG"))
            .with_config("partition_count", Value::Int(2))
            .with_config("message_retention", Value::Int(1))
    }

    fn model_with_capture() -> EventHubModel {
        EventHubModel {
            name: "acctesteventhub".to_string(),
            namespace_name: "acctesteventhubnamespace".to_string(),
            resource_group_name: "acctestRG".to_string(),
            partition_count: 2,
            message_retention: 7,
            capture_description: Some(CaptureDescriptionBlock {
                enabled: true,
                encoding: "AvroDeflate".to_string(),
                interval_in_seconds: 60,
                size_limit_in_bytes: 10_485_760,
                skip_empty_archives: true,
                destination: Some(DestinationBlock {
                    name: BLOB_DESTINATION.to_string(),
                    archive_name_format: ARCHIVE_FORMAT.to_string(),
                    blob_container_name: "capture".to_string(),
                    storage_account_id: STORAGE_ACCOUNT.to_string(),
                }),
            }),
            partition_ids: vec![],
        }
    }

    #[test]
    fn flatten_inverts_expand() {
        let model = model_with_capture();
        assert_eq!(flatten_eventhub(&expand_eventhub(&model), &key()), model);

        let without_capture = EventHubModel {
            capture_description: None,
            ..model
        };
        assert_eq!(
            flatten_eventhub(&expand_eventhub(&without_capture), &key()),
            without_capture
        );
    }

    #[test]
    fn absent_capture_flattens_to_empty_block_list() {
        assert_eq!(flatten_capture(None), None);

        let flattened = flatten_eventhub(&Eventhub::default(), &key());
        let json = serde_json::to_value(&flattened).unwrap();
        assert_eq!(json["capture_description"], serde_json::json!([]));
    }

    #[test]
    fn capture_defaults_apply_when_omitted() {
        let data = config().with_config("capture_description", capture_config());
        let model: EventHubModel = data.decode().unwrap();
        let capture = model.capture_description.unwrap();
        assert_eq!(capture.interval_in_seconds, 300);
        assert_eq!(capture.size_limit_in_bytes, 314_572_800);
        assert!(!capture.skip_empty_archives);
    }

    #[test]
    fn schema_checks_ranges_and_archive_format() {
        assert!(!EventHub.validate(config().config()).has_errors());

        let bad = config()
            .with_config("partition_count", Value::Int(33))
            .with_config("message_retention", Value::Int(8));
        let paths: Vec<String> = EventHub
            .validate(bad.config())
            .errors
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert!(paths.contains(&"partition_count".to_string()));
        assert!(paths.contains(&"message_retention".to_string()));

        let capture = Value::List(vec![block(&[
            ("enabled", Value::Bool(true)),
            ("encoding", Value::string("Avro")),
            ("interval_in_seconds", Value::Int(30)),
            (
                "destination",
                Value::List(vec![block(&[
                    ("name", Value::string(BLOB_DESTINATION)),
                    ("archive_name_format", Value::string("{Namespace}/{EventHub}")),
                    ("blob_container_name", Value::string("capture")),
                    ("storage_account_id", Value::string(STORAGE_ACCOUNT)),
                ])]),
            ),
        ])]);
        let diags = EventHub.validate(
            config()
                .with_config("capture_description", capture)
                .config(),
        );
        let paths: Vec<&str> = diags.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"capture_description.0.interval_in_seconds"));
        assert!(paths.contains(&"capture_description.0.destination.0.archive_name_format"));
    }

    #[tokio::test]
    async fn create_records_partition_ids() {
        let fakes = Fakes::new();
        let ctx = fakes.context();
        let mut data = config();

        EventHub.create(&ctx, &mut data).await.unwrap();

        assert_eq!(data.id(), Some(hub_id().as_str()));
        assert_eq!(
            data.get_state("partition_ids"),
            Some(&Value::List(vec![Value::string("0"), Value::string("1")]))
        );
    }

    #[tokio::test]
    async fn adding_capture_is_an_update_and_reapplying_is_not() {
        let fakes = Fakes::new();
        let ctx = fakes.context();
        let mut data = config();
        EventHub.create(&ctx, &mut data).await.unwrap();
        EventHub.update(&ctx, &mut data).await.unwrap();
        assert_eq!(fakes.eventhubs.writes(), 1);

        let mut data = data.with_config("capture_description", capture_config());
        EventHub.update(&ctx, &mut data).await.unwrap();
        assert_eq!(fakes.eventhubs.writes(), 2);

        let remote = fakes.eventhubs.fetch(&hub_id()).unwrap();
        let capture = remote.properties.unwrap().capture_description.unwrap();
        assert_eq!(capture.interval_in_seconds, Some(300));

        EventHub.update(&ctx, &mut data).await.unwrap();
        assert_eq!(fakes.eventhubs.writes(), 2);
    }

    #[tokio::test]
    async fn slow_create_completes_on_the_manual_clock() {
        let fakes = Fakes::new();
        fakes.eventhubs.set_pending_polls(4);
        let ctx = fakes.context();
        let mut data = config();

        EventHub.create(&ctx, &mut data).await.unwrap();
        assert!(data.id().is_some());
        assert_eq!(fakes.clock.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn create_that_never_finishes_times_out_without_id() {
        let fakes = Fakes::new();
        fakes.eventhubs.never_complete();
        let ctx = fakes.context();
        let mut data = config();

        let err = EventHub.create(&ctx, &mut data).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(data.id(), None);
        assert_eq!(fakes.clock.elapsed(), EventHub.timeouts().create);
    }

    #[tokio::test]
    async fn existing_hub_requires_import() {
        let fakes = Fakes::new();
        fakes.eventhubs.seed(&hub_id(), Eventhub::default());
        let ctx = fakes.context();
        let mut data = config();

        let err = EventHub.create(&ctx, &mut data).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert!(err.message.contains(&hub_id()));
    }

    #[tokio::test]
    async fn read_and_delete_tolerate_missing_hub() {
        let fakes = Fakes::new();
        let ctx = fakes.context();
        let mut data = ResourceData::new(RESOURCE_TYPE).with_id(hub_id());

        EventHub.delete(&ctx, &mut data).await.unwrap();
        EventHub.read(&ctx, &mut data).await.unwrap();
        assert_eq!(data.id(), None);
    }

    #[test]
    fn malformed_id_is_a_configuration_error() {
        let err = EventHubKey::parse(
            "/subscriptions/x/resourceGroups/rg/providers/Microsoft.EventHub/namespaces/ns",
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.to_string().contains("eventhubs"));
    }
}
