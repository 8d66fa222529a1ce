//! azurerm_virtual_hub

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::provider::{ProviderResult, Timeouts};
use stratus_core::resource::{ResourceAddress, ResourceData};
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use super::{ArmContext, ArmResultExt, AzureResource, get_if_exists, require_remote_id};
use crate::id::{self, AzureResourceId};
use crate::sdk::SubResource;
use crate::sdk::network::{VirtualHub, VirtualHubProperties, VirtualHubRoute, VirtualHubRouteTable};
use crate::utils::{expand_tags, flatten_tags, normalize_location, validate_tags};
use crate::validate;

pub const RESOURCE_TYPE: &str = "azurerm_virtual_hub";

const MUTABLE: &[&str] = &["route", "tags"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualHubModel {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub address_prefix: String,
    pub virtual_wan_id: String,
    #[serde(default)]
    pub route: Vec<RouteBlock>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteBlock {
    pub address_prefixes: Vec<String>,
    pub next_hop_ip_address: String,
}

/// Build the request body; connections owned by
/// `azurerm_virtual_hub_connection` resources are carried over from `existing`
pub fn expand_virtual_hub(model: &VirtualHubModel, existing: Option<&VirtualHub>) -> VirtualHub {
    VirtualHub {
        name: Some(model.name.clone()),
        location: Some(normalize_location(&model.location)),
        tags: expand_tags(&model.tags),
        properties: Some(VirtualHubProperties {
            address_prefix: Some(model.address_prefix.clone()),
            virtual_wan: Some(SubResource::new(&model.virtual_wan_id)),
            route_table: Some(VirtualHubRouteTable {
                routes: Some(expand_routes(&model.route)),
            }),
            virtual_network_connections: existing
                .and_then(|hub| hub.properties.as_ref())
                .and_then(|p| p.virtual_network_connections.clone()),
            provisioning_state: None,
        }),
        ..Default::default()
    }
}

pub fn expand_routes(routes: &[RouteBlock]) -> Vec<VirtualHubRoute> {
    routes
        .iter()
        .map(|route| VirtualHubRoute {
            address_prefixes: Some(route.address_prefixes.clone()),
            next_hop_ip_address: Some(route.next_hop_ip_address.clone()),
        })
        .collect()
}

pub fn flatten_virtual_hub(hub: &VirtualHub, resource_group: &str) -> VirtualHubModel {
    let props = hub.properties.as_ref();
    VirtualHubModel {
        name: hub.name.clone().unwrap_or_default(),
        resource_group_name: resource_group.to_string(),
        location: hub
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        address_prefix: props
            .and_then(|p| p.address_prefix.clone())
            .unwrap_or_default(),
        virtual_wan_id: props
            .and_then(|p| p.virtual_wan.as_ref())
            .and_then(|w| w.id.clone())
            .unwrap_or_default(),
        route: flatten_routes(props.and_then(|p| p.route_table.as_ref())),
        tags: flatten_tags(hub.tags.as_ref()),
    }
}

pub fn flatten_routes(table: Option<&VirtualHubRouteTable>) -> Vec<RouteBlock> {
    table
        .and_then(|t| t.routes.as_ref())
        .map(|routes| {
            routes
                .iter()
                .map(|route| RouteBlock {
                    address_prefixes: route.address_prefixes.clone().unwrap_or_default(),
                    next_hop_ip_address: route.next_hop_ip_address.clone().unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_id(id: &str) -> ProviderResult<(String, String)> {
    let parsed = AzureResourceId::parse(id)?;
    let name = parsed.get(id::VIRTUAL_HUBS)?.to_string();
    Ok((parsed.resource_group, name))
}

fn address(name: &str, resource_group: &str) -> ResourceAddress {
    ResourceAddress::new(RESOURCE_TYPE, name).in_group(resource_group)
}

pub struct VirtualHubResource;

impl VirtualHubResource {
    async fn write(
        &self,
        ctx: &ArmContext,
        body: &VirtualHub,
        id: &str,
        timeout: std::time::Duration,
        address: &ResourceAddress,
    ) -> ProviderResult<()> {
        let operation = ctx
            .apis
            .virtual_hubs
            .create_or_update(id, body)
            .await
            .context("Failed to create/update Virtual Hub", address)?;
        ctx.wait(operation, timeout, address).await
    }
}

#[async_trait]
impl AzureResource for VirtualHubResource {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let route = BlockSchema::new()
            .attribute(
                AttributeSchema::new(
                    "address_prefixes",
                    AttributeType::List(Box::new(types::cidr())),
                )
                .required(),
            )
            .attribute(
                AttributeSchema::new("next_hop_ip_address", AttributeType::String).required(),
            );

        ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Manages a Virtual Hub within a Virtual WAN")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_validation(validate::virtual_hub_name),
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
                AttributeSchema::new("address_prefix", types::cidr())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("virtual_wan_id", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("route", AttributeType::Block(route)))
            .attribute(AttributeSchema::new("tags", types::tags()).with_validation(validate_tags))
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(60, 5, 60, 60)
    }

    async fn create(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        data.apply_defaults(&self.schema());
        let model: VirtualHubModel = data.decode()?;
        let address = address(&model.name, &model.resource_group_name);
        let id = id::virtual_hub_id(&ctx.subscription_id, &model.resource_group_name, &model.name)
            .to_string();
        log::info!("Creating {}", address);

        let lock = ctx.locks.lock(&model.name, RESOURCE_TYPE).await;
        let existing = ctx
            .existing_for_create(ctx.apis.virtual_hubs.as_ref(), &id, &address)
            .await?;
        let body = expand_virtual_hub(&model, existing.as_ref());
        self.write(ctx, &body, &id, self.timeouts().create, &address)
            .await?;

        let created = ctx
            .apis
            .virtual_hubs
            .get(&id)
            .await
            .context("Failed to retrieve Virtual Hub", &address)?;
        data.set_id(require_remote_id(created.id.as_deref(), &address)?);
        drop(lock);

        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data.require_id()?.to_string();
        let (resource_group, name) = parse_id(&id)?;
        let address = address(&name, &resource_group);

        let hub = get_if_exists(ctx.apis.virtual_hubs.as_ref(), &id)
            .await
            .context("Failed to retrieve Virtual Hub", &address)?;
        let Some(hub) = hub else {
            log::info!("{} was not found - removing from state", address);
            data.clear_id();
            return Ok(());
        };

        data.encode(&flatten_virtual_hub(&hub, &resource_group))
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

        let model: VirtualHubModel = data.decode()?;
        let lock = ctx.locks.lock(&name, RESOURCE_TYPE).await;
        let existing = ctx
            .apis
            .virtual_hubs
            .get(&id)
            .await
            .context("Failed to retrieve Virtual Hub", &address)?;
        let body = expand_virtual_hub(&model, Some(&existing));
        self.write(ctx, &body, &id, self.timeouts().update, &address)
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
            .virtual_hubs
            .delete(&id)
            .await
            .context("Failed to delete Virtual Hub", &address)?;
        match operation {
            Some(operation) => ctx.wait(operation, self.timeouts().delete, &address).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{Fakes, SUBSCRIPTION, block, strings, tags};
    use crate::sdk::network::HubVirtualNetworkConnection;
    use stratus_core::provider::ErrorKind;
    use stratus_core::resource::Value;

    const WAN: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/acctestRG/providers/Microsoft.Network/virtualWans/acctestvwan";

    fn hub_id() -> String {
        id::virtual_hub_id(SUBSCRIPTION, "acctestRG", "acctestvhub").to_string()
    }

    fn config() -> ResourceData {
        ResourceData::new(RESOURCE_TYPE)
            .with_config("name", Value::string("acctestvhub"))
            .with_config("resource_group_name", Value::string("acctestRG"))
            .with_config("location", Value::string("westeurope"))
            .with_config("address_prefix", Value::string("10.0.1.0/24"))
            .with_config("virtual_wan_id", Value::string(WAN))
            .with_config(
                "route",
                Value::List(vec![block(&[
                    ("address_prefixes", strings(&["172.0.1.0/24"])),
                    ("next_hop_ip_address", Value::string("12.34.56.78")),
                ])]),
            )
    }

    #[test]
    fn flatten_inverts_expand() {
        let model = VirtualHubModel {
            name: "acctestvhub".to_string(),
            resource_group_name: "acctestRG".to_string(),
            location: "westeurope".to_string(),
            address_prefix: "10.0.1.0/24".to_string(),
            virtual_wan_id: WAN.to_string(),
            route: vec![RouteBlock {
                address_prefixes: vec!["172.0.1.0/24".to_string(), "172.0.2.0/24".to_string()],
                next_hop_ip_address: "12.34.56.78".to_string(),
            }],
            tags: HashMap::from([("env".to_string(), "test".to_string())]),
        };
        assert_eq!(
            flatten_virtual_hub(&expand_virtual_hub(&model, None), "acctestRG"),
            model
        );
    }

    #[test]
    fn flatten_of_empty_hub_has_no_routes() {
        assert!(flatten_routes(None).is_empty());
        assert!(flatten_routes(Some(&VirtualHubRouteTable::default())).is_empty());
        let flattened = flatten_virtual_hub(&VirtualHub::default(), "rg");
        assert_eq!(flattened.virtual_wan_id, "");
    }

    #[tokio::test]
    async fn create_and_reapply() {
        let fakes = Fakes::new();
        let ctx = fakes.context();
        let mut data = config();

        VirtualHubResource.create(&ctx, &mut data).await.unwrap();
        assert_eq!(data.id(), Some(hub_id().as_str()));
        assert_eq!(data.get_state("virtual_wan_id"), Some(&Value::string(WAN)));

        VirtualHubResource.update(&ctx, &mut data).await.unwrap();
        assert_eq!(fakes.virtual_hubs.writes(), 1);
    }

    #[tokio::test]
    async fn route_change_keeps_connections() {
        let fakes = Fakes::new();
        let ctx = fakes.context();
        let mut data = config();
        VirtualHubResource.create(&ctx, &mut data).await.unwrap();

        let mut remote = fakes.virtual_hubs.fetch(&hub_id()).unwrap();
        remote.properties.as_mut().unwrap().virtual_network_connections =
            Some(vec![HubVirtualNetworkConnection {
                name: Some("acctestvhubconn".to_string()),
                ..Default::default()
            }]);
        fakes.virtual_hubs.seed(&hub_id(), remote);

        let mut data = data
            .with_config("route", Value::List(vec![]))
            .with_config("tags", tags(&[("env", "prod")]));
        VirtualHubResource.update(&ctx, &mut data).await.unwrap();

        let props = fakes.virtual_hubs.fetch(&hub_id()).unwrap().properties.unwrap();
        assert!(props.route_table.unwrap().routes.unwrap().is_empty());
        assert_eq!(props.virtual_network_connections.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existing_hub_requires_import() {
        let fakes = Fakes::new();
        fakes.virtual_hubs.seed(&hub_id(), VirtualHub::default());
        let ctx = fakes.context();
        let mut data = config();

        let err = VirtualHubResource.create(&ctx, &mut data).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn adopting_existing_hub_keeps_its_connections() {
        let fakes = Fakes::new();
        fakes.virtual_hubs.seed(
            &hub_id(),
            VirtualHub {
                properties: Some(VirtualHubProperties {
                    virtual_network_connections: Some(vec![HubVirtualNetworkConnection {
                        name: Some("acctestvhubconn".to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let ctx = fakes.context().with_features(crate::config::Features {
            import_protection: false,
        });
        let mut data = config();

        VirtualHubResource.create(&ctx, &mut data).await.unwrap();

        let props = fakes.virtual_hubs.fetch(&hub_id()).unwrap().properties.unwrap();
        assert_eq!(props.virtual_network_connections.unwrap().len(), 1);
        assert_eq!(props.route_table.unwrap().routes.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_hub_is_not_an_error() {
        let fakes = Fakes::new();
        let ctx = fakes.context();
        let mut data = ResourceData::new(RESOURCE_TYPE).with_id(hub_id());

        VirtualHubResource.delete(&ctx, &mut data).await.unwrap();
        VirtualHubResource.read(&ctx, &mut data).await.unwrap();
        assert_eq!(data.id(), None);
    }

    #[test]
    fn schema_rejects_bad_prefix() {
        assert!(!VirtualHubResource.validate(config().config()).has_errors());
        let bad = config().with_config("address_prefix", Value::string("10.0.1.0"));
        let diags = VirtualHubResource.validate(bad.config());
        assert!(diags.errors.iter().any(|e| e.path == "address_prefix"));
    }
}
