//! azurerm_virtual_hub_connection

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::collection::ParentCollection;
use stratus_core::provider::{ProviderResult, Timeouts};
use stratus_core::resource::ResourceData;
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::child::{self, ChildKey, ChildResource};
use super::{ArmContext, AzureResource, virtual_hub};
use crate::arm::ResourceApi;
use crate::id::{self, AzureResourceId};
use crate::sdk::SubResource;
use crate::sdk::network::{
    HubVirtualNetworkConnection, HubVirtualNetworkConnectionProperties, VirtualHub,
};

pub const RESOURCE_TYPE: &str = "azurerm_virtual_hub_connection";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualHubConnectionModel {
    pub name: String,
    pub virtual_hub_id: String,
    pub remote_virtual_network_id: String,
    #[serde(default)]
    pub hub_to_virtual_network_traffic_allowed: bool,
    #[serde(default)]
    pub virtual_network_to_hub_gateways_traffic_allowed: bool,
    #[serde(default)]
    pub internet_security_enabled: bool,
}

pub struct VirtualHubConnection;

impl ChildResource for VirtualHubConnection {
    type Parent = VirtualHub;
    type Item = HubVirtualNetworkConnection;
    type Model = VirtualHubConnectionModel;

    const RESOURCE_TYPE: &'static str = RESOURCE_TYPE;
    const PARENT_TYPE: &'static str = virtual_hub::RESOURCE_TYPE;
    const NAMESPACE: &'static str = id::NETWORK;
    const PARENT_KEY: &'static str = id::VIRTUAL_HUBS;
    const ITEM_KEY: &'static str = id::HUB_CONNECTIONS;
    const MUTABLE: &'static [&'static str] = &[
        "hub_to_virtual_network_traffic_allowed",
        "virtual_network_to_hub_gateways_traffic_allowed",
        "internet_security_enabled",
    ];

    fn api(ctx: &ArmContext) -> &dyn ResourceApi<VirtualHub> {
        ctx.apis.virtual_hubs.as_ref()
    }

    fn key(model: &VirtualHubConnectionModel) -> ProviderResult<ChildKey> {
        let hub = AzureResourceId::parse(&model.virtual_hub_id)?;
        Ok(ChildKey {
            parent: hub.get(id::VIRTUAL_HUBS)?.to_string(),
            name: model.name.clone(),
            resource_group: hub.resource_group,
        })
    }

    fn take_items(parent: &mut VirtualHub) -> ParentCollection<HubVirtualNetworkConnection> {
        ParentCollection::from_option(
            parent
                .properties
                .as_mut()
                .and_then(|p| p.virtual_network_connections.take()),
        )
    }

    fn put_items(parent: &mut VirtualHub, items: Vec<HubVirtualNetworkConnection>) {
        parent
            .properties
            .get_or_insert_with(Default::default)
            .virtual_network_connections = Some(items);
    }

    fn item_id(item: &HubVirtualNetworkConnection) -> Option<&str> {
        item.id.as_deref()
    }

    fn expand(model: &VirtualHubConnectionModel) -> HubVirtualNetworkConnection {
        HubVirtualNetworkConnection {
            id: None,
            name: Some(model.name.clone()),
            properties: Some(HubVirtualNetworkConnectionProperties {
                remote_virtual_network: Some(SubResource::new(&model.remote_virtual_network_id)),
                allow_hub_to_remote_vnet_transit: Some(
                    model.hub_to_virtual_network_traffic_allowed,
                ),
                allow_remote_vnet_to_use_hub_vnet_gateways: Some(
                    model.virtual_network_to_hub_gateways_traffic_allowed,
                ),
                enable_internet_security: Some(model.internet_security_enabled),
                provisioning_state: None,
            }),
        }
    }

    fn flatten(
        item: &HubVirtualNetworkConnection,
        key: &ChildKey,
        parent_id: &str,
    ) -> VirtualHubConnectionModel {
        let props = item.properties.as_ref();
        VirtualHubConnectionModel {
            name: item.name.clone().unwrap_or_else(|| key.name.clone()),
            virtual_hub_id: parent_id.to_string(),
            remote_virtual_network_id: props
                .and_then(|p| p.remote_virtual_network.as_ref())
                .and_then(|r| r.id.clone())
                .unwrap_or_default(),
            hub_to_virtual_network_traffic_allowed: props
                .and_then(|p| p.allow_hub_to_remote_vnet_transit)
                .unwrap_or_default(),
            virtual_network_to_hub_gateways_traffic_allowed: props
                .and_then(|p| p.allow_remote_vnet_to_use_hub_vnet_gateways)
                .unwrap_or_default(),
            internet_security_enabled: props
                .and_then(|p| p.enable_internet_security)
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl AzureResource for VirtualHubConnection {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Manages a Connection between a Virtual Hub and a Virtual Network")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("virtual_hub_id", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("remote_virtual_network_id", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new(
                "hub_to_virtual_network_traffic_allowed",
                AttributeType::Bool,
            ))
            .attribute(AttributeSchema::new(
                "virtual_network_to_hub_gateways_traffic_allowed",
                AttributeType::Bool,
            ))
            .attribute(AttributeSchema::new(
                "internet_security_enabled",
                AttributeType::Bool,
            ))
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(60, 5, 60, 60)
    }

    async fn create(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        data.apply_defaults(&self.schema());
        child::create::<Self>(ctx, data, self.timeouts()).await
    }

    async fn read(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        child::read::<Self>(ctx, data).await
    }

    async fn update(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        data.apply_defaults(&self.schema());
        child::update::<Self>(ctx, data, self.timeouts()).await
    }

    async fn delete(&self, ctx: &ArmContext, data: &mut ResourceData) -> ProviderResult<()> {
        child::delete::<Self>(ctx, data, self.timeouts()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{Fakes, SUBSCRIPTION};
    use stratus_core::provider::ErrorKind;
    use stratus_core::resource::Value;

    const VNET: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/acctestRG/providers/Microsoft.Network/virtualNetworks/acctestvnet";

    fn hub_id() -> String {
        id::virtual_hub_id(SUBSCRIPTION, "acctestRG", "acctestvhub").to_string()
    }

    fn connection_id(name: &str) -> String {
        format!("{}/hubVirtualNetworkConnections/{}", hub_id(), name)
    }

    fn config(name: &str) -> ResourceData {
        ResourceData::new(RESOURCE_TYPE)
            .with_config("name", Value::string(name))
            .with_config("virtual_hub_id", Value::string(hub_id()))
            .with_config("remote_virtual_network_id", Value::string(VNET))
            .with_config("internet_security_enabled", Value::Bool(true))
    }

    fn seed_hub(fakes: &Fakes) {
        fakes.virtual_hubs.seed(&hub_id(), VirtualHub::default());
    }

    fn remote_connections(fakes: &Fakes) -> Vec<HubVirtualNetworkConnection> {
        fakes
            .virtual_hubs
            .fetch(&hub_id())
            .and_then(|hub| hub.properties)
            .and_then(|p| p.virtual_network_connections)
            .unwrap_or_default()
    }

    #[test]
    fn key_comes_from_the_hub_id() {
        let model: VirtualHubConnectionModel = config("conn").decode().unwrap();
        let key = VirtualHubConnection::key(&model).unwrap();
        assert_eq!(key.parent, "acctestvhub");
        assert_eq!(key.resource_group, "acctestRG");
        assert_eq!(key.name, "conn");

        let bad = VirtualHubConnectionModel {
            virtual_hub_id: "not-an-id".to_string(),
            ..model
        };
        assert_eq!(
            VirtualHubConnection::key(&bad).unwrap_err().kind,
            ErrorKind::Configuration
        );
    }

    #[test]
    fn flatten_inverts_expand() {
        let model = VirtualHubConnectionModel {
            name: "conn".to_string(),
            virtual_hub_id: hub_id(),
            remote_virtual_network_id: VNET.to_string(),
            hub_to_virtual_network_traffic_allowed: true,
            virtual_network_to_hub_gateways_traffic_allowed: false,
            internet_security_enabled: true,
        };
        let key = VirtualHubConnection::key(&model).unwrap();
        let item = VirtualHubConnection::expand(&model);
        assert_eq!(VirtualHubConnection::flatten(&item, &key, &hub_id()), model);
    }

    #[tokio::test]
    async fn create_appends_and_sets_narrow_id() {
        let fakes = Fakes::new();
        seed_hub(&fakes);
        let ctx = fakes.context();

        let mut data = config("conn1");
        VirtualHubConnection.create(&ctx, &mut data).await.unwrap();
        assert_eq!(data.id(), Some(connection_id("conn1").as_str()));
        assert_eq!(
            data.get_state("virtual_hub_id"),
            Some(&Value::string(hub_id()))
        );

        VirtualHubConnection.update(&ctx, &mut data).await.unwrap();
        assert_eq!(fakes.virtual_hubs.writes(), 1);
    }

    #[tokio::test]
    async fn concurrent_connections_on_one_hub_are_both_kept() {
        let fakes = Fakes::new();
        seed_hub(&fakes);
        fakes.virtual_hubs.lag();
        let ctx = fakes.context();

        let mut first = config("conn1");
        let mut second = config("conn2");
        let (a, b) = tokio::join!(
            VirtualHubConnection.create(&ctx, &mut first),
            VirtualHubConnection.create(&ctx, &mut second),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(remote_connections(&fakes).len(), 2);
    }

    #[tokio::test]
    async fn toggling_a_flag_updates_in_place() {
        let fakes = Fakes::new();
        seed_hub(&fakes);
        let ctx = fakes.context();
        let mut data = config("conn1");
        VirtualHubConnection.create(&ctx, &mut data).await.unwrap();

        let mut data = data.with_config("internet_security_enabled", Value::Bool(false));
        VirtualHubConnection.update(&ctx, &mut data).await.unwrap();

        let connections = remote_connections(&fakes);
        assert_eq!(connections.len(), 1);
        let props = connections[0].properties.as_ref().unwrap();
        assert_eq!(props.enable_internet_security, Some(false));
    }

    #[tokio::test]
    async fn delete_removes_the_connection() {
        let fakes = Fakes::new();
        seed_hub(&fakes);
        let ctx = fakes.context();
        let mut data = config("conn1");
        VirtualHubConnection.create(&ctx, &mut data).await.unwrap();

        VirtualHubConnection.delete(&ctx, &mut data).await.unwrap();
        assert!(remote_connections(&fakes).is_empty());

        VirtualHubConnection.read(&ctx, &mut data).await.unwrap();
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn create_under_missing_hub_fails_with_not_found() {
        let fakes = Fakes::new();
        let ctx = fakes.context();
        let mut data = config("conn1");

        let err = VirtualHubConnection.create(&ctx, &mut data).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(data.id(), None);
    }
}
