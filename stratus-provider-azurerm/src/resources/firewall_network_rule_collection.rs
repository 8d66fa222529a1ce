//! azurerm_firewall_network_rule_collection

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::collection::ParentCollection;
use stratus_core::provider::ProviderResult;
use stratus_core::resource::ResourceData;
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use super::child::{self, ChildKey, ChildResource};
use super::{ArmContext, AzureResource, firewall};
use crate::arm::ResourceApi;
use crate::id;
use crate::sdk::network::{
    AzureFirewall, AzureFirewallNetworkRule, AzureFirewallNetworkRuleCollection,
    AzureFirewallNetworkRuleCollectionProperties, AzureFirewallRcAction,
};
use crate::validate;

pub const RESOURCE_TYPE: &str = "azurerm_firewall_network_rule_collection";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkRuleCollectionModel {
    pub name: String,
    pub azure_firewall_name: String,
    pub resource_group_name: String,
    pub priority: i64,
    pub action: String,
    #[serde(default)]
    pub rule: Vec<NetworkRuleBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkRuleBlock {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_addresses: Vec<String>,
    #[serde(default)]
    pub destination_addresses: Vec<String>,
    #[serde(default)]
    pub destination_ports: Vec<String>,
    #[serde(default)]
    pub protocols: Vec<String>,
}

pub fn expand_rules(rules: &[NetworkRuleBlock]) -> Vec<AzureFirewallNetworkRule> {
    rules
        .iter()
        .map(|rule| AzureFirewallNetworkRule {
            name: Some(rule.name.clone()),
            description: (!rule.description.is_empty()).then(|| rule.description.clone()),
            protocols: Some(rule.protocols.clone()),
            source_addresses: Some(rule.source_addresses.clone()),
            destination_addresses: Some(rule.destination_addresses.clone()),
            destination_fqdns: None,
            destination_ports: Some(rule.destination_ports.clone()),
        })
        .collect()
}

pub fn flatten_rules(rules: Option<&Vec<AzureFirewallNetworkRule>>) -> Vec<NetworkRuleBlock> {
    let Some(rules) = rules else {
        return Vec::new();
    };
    rules
        .iter()
        .map(|rule| NetworkRuleBlock {
            name: rule.name.clone().unwrap_or_default(),
            description: rule.description.clone().unwrap_or_default(),
            source_addresses: rule.source_addresses.clone().unwrap_or_default(),
            destination_addresses: rule.destination_addresses.clone().unwrap_or_default(),
            destination_ports: rule.destination_ports.clone().unwrap_or_default(),
            protocols: rule.protocols.clone().unwrap_or_default(),
        })
        .collect()
}

pub struct FirewallNetworkRuleCollection;

impl ChildResource for FirewallNetworkRuleCollection {
    type Parent = AzureFirewall;
    type Item = AzureFirewallNetworkRuleCollection;
    type Model = NetworkRuleCollectionModel;

    const RESOURCE_TYPE: &'static str = RESOURCE_TYPE;
    const PARENT_TYPE: &'static str = firewall::RESOURCE_TYPE;
    const NAMESPACE: &'static str = id::NETWORK;
    const PARENT_KEY: &'static str = id::AZURE_FIREWALLS;
    const ITEM_KEY: &'static str = id::NETWORK_RULE_COLLECTIONS;
    const MUTABLE: &'static [&'static str] = &["priority", "action", "rule"];

    fn api(ctx: &ArmContext) -> &dyn ResourceApi<AzureFirewall> {
        ctx.apis.firewalls.as_ref()
    }

    fn key(model: &NetworkRuleCollectionModel) -> ProviderResult<ChildKey> {
        Ok(ChildKey {
            resource_group: model.resource_group_name.clone(),
            parent: model.azure_firewall_name.clone(),
            name: model.name.clone(),
        })
    }

    fn take_items(
        parent: &mut AzureFirewall,
    ) -> ParentCollection<AzureFirewallNetworkRuleCollection> {
        ParentCollection::from_option(
            parent
                .properties
                .as_mut()
                .and_then(|p| p.network_rule_collections.take()),
        )
    }

    fn put_items(parent: &mut AzureFirewall, items: Vec<AzureFirewallNetworkRuleCollection>) {
        parent
            .properties
            .get_or_insert_with(Default::default)
            .network_rule_collections = Some(items);
    }

    fn item_id(item: &AzureFirewallNetworkRuleCollection) -> Option<&str> {
        item.id.as_deref()
    }

    fn expand(model: &NetworkRuleCollectionModel) -> AzureFirewallNetworkRuleCollection {
        AzureFirewallNetworkRuleCollection {
            id: None,
            name: Some(model.name.clone()),
            properties: Some(AzureFirewallNetworkRuleCollectionProperties {
                priority: Some(model.priority),
                action: Some(AzureFirewallRcAction {
                    action_type: Some(model.action.clone()),
                }),
                rules: Some(expand_rules(&model.rule)),
                provisioning_state: None,
            }),
        }
    }

    fn flatten(
        item: &AzureFirewallNetworkRuleCollection,
        key: &ChildKey,
        _parent_id: &str,
    ) -> NetworkRuleCollectionModel {
        let props = item.properties.as_ref();
        NetworkRuleCollectionModel {
            name: item.name.clone().unwrap_or_else(|| key.name.clone()),
            azure_firewall_name: key.parent.clone(),
            resource_group_name: key.resource_group.clone(),
            priority: props.and_then(|p| p.priority).unwrap_or_default(),
            action: props
                .and_then(|p| p.action.as_ref())
                .and_then(|a| a.action_type.clone())
                .unwrap_or_default(),
            rule: flatten_rules(props.and_then(|p| p.rules.as_ref())),
        }
    }
}

#[async_trait]
impl AzureResource for FirewallNetworkRuleCollection {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let protocols = AttributeType::List(Box::new(AttributeType::Enum(vec![
            "Any".into(),
            "ICMP".into(),
            "TCP".into(),
            "UDP".into(),
        ])));
        let rule = BlockSchema::new()
            .min_items(1)
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(AttributeSchema::new("source_addresses", types::string_list()).required())
            .attribute(
                AttributeSchema::new("destination_addresses", types::string_list()).required(),
            )
            .attribute(AttributeSchema::new("destination_ports", types::string_list()).required())
            .attribute(AttributeSchema::new("protocols", protocols).required());

        ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Manages a Network Rule Collection within an Azure Firewall")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_validation(validate::rule_collection_name),
            )
            .attribute(
                AttributeSchema::new("azure_firewall_name", AttributeType::String)
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
                AttributeSchema::new("priority", AttributeType::Int)
                    .required()
                    .with_validation(validate::rule_collection_priority),
            )
            .attribute(
                AttributeSchema::new(
                    "action",
                    AttributeType::Enum(vec!["Allow".into(), "Deny".into()]),
                )
                .required(),
            )
            .attribute(AttributeSchema::new("rule", AttributeType::Block(rule)).required())
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
