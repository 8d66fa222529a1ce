//! azurerm_firewall_application_rule_collection

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::collection::ParentCollection;
use stratus_core::provider::ProviderResult;
use stratus_core::resource::{ResourceData, Value};
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};
use stratus_core::validation::Diagnostics;

use super::child::{self, ChildKey, ChildResource};
use super::{ArmContext, AzureResource, firewall};
use crate::arm::ResourceApi;
use crate::id;
use crate::sdk::network::{
    AzureFirewall, AzureFirewallApplicationRule, AzureFirewallApplicationRuleCollection,
    AzureFirewallApplicationRuleCollectionProperties, AzureFirewallApplicationRuleProtocol,
    AzureFirewallRcAction,
};
use crate::validate;

pub const RESOURCE_TYPE: &str = "azurerm_firewall_application_rule_collection";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRuleCollectionModel {
    pub name: String,
    pub azure_firewall_name: String,
    pub resource_group_name: String,
    pub priority: i64,
    pub action: String,
    #[serde(default)]
    pub rule: Vec<ApplicationRuleBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRuleBlock {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_addresses: Vec<String>,
    #[serde(default)]
    pub fqdn_tags: Vec<String>,
    #[serde(default)]
    pub target_fqdns: Vec<String>,
    #[serde(default)]
    pub protocol: Vec<ProtocolBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolBlock {
    #[serde(rename = "type")]
    pub protocol_type: String,
    #[serde(default)]
    pub port: i64,
}

fn non_empty(items: &[String]) -> Option<Vec<String>> {
    (!items.is_empty()).then(|| items.to_vec())
}

pub fn expand_rules(rules: &[ApplicationRuleBlock]) -> Vec<AzureFirewallApplicationRule> {
    rules
        .iter()
        .map(|rule| AzureFirewallApplicationRule {
            name: Some(rule.name.clone()),
            description: (!rule.description.is_empty()).then(|| rule.description.clone()),
            source_addresses: Some(rule.source_addresses.clone()),
            fqdn_tags: non_empty(&rule.fqdn_tags),
            target_fqdns: non_empty(&rule.target_fqdns),
            protocols: Some(
                rule.protocol
                    .iter()
                    .map(|p| AzureFirewallApplicationRuleProtocol {
                        protocol_type: Some(p.protocol_type.clone()),
                        port: Some(p.port),
                    })
                    .collect(),
            ),
        })
        .collect()
}

pub fn flatten_rules(
    rules: Option<&Vec<AzureFirewallApplicationRule>>,
) -> Vec<ApplicationRuleBlock> {
    let Some(rules) = rules else {
        return Vec::new();
    };
    rules
        .iter()
        .map(|rule| ApplicationRuleBlock {
            name: rule.name.clone().unwrap_or_default(),
            description: rule.description.clone().unwrap_or_default(),
            source_addresses: rule.source_addresses.clone().unwrap_or_default(),
            fqdn_tags: rule.fqdn_tags.clone().unwrap_or_default(),
            target_fqdns: rule.target_fqdns.clone().unwrap_or_default(),
            protocol: rule
                .protocols
                .iter()
                .flatten()
                .map(|p| ProtocolBlock {
                    protocol_type: p.protocol_type.clone().unwrap_or_default(),
                    port: p.port.unwrap_or_default(),
                })
                .collect(),
        })
        .collect()
}

pub struct FirewallApplicationRuleCollection;

impl ChildResource for FirewallApplicationRuleCollection {
    type Parent = AzureFirewall;
    type Item = AzureFirewallApplicationRuleCollection;
    type Model = ApplicationRuleCollectionModel;

    const RESOURCE_TYPE: &'static str = RESOURCE_TYPE;
    const PARENT_TYPE: &'static str = firewall::RESOURCE_TYPE;
    const NAMESPACE: &'static str = id::NETWORK;
    const PARENT_KEY: &'static str = id::AZURE_FIREWALLS;
    const ITEM_KEY: &'static str = id::APPLICATION_RULE_COLLECTIONS;
    const MUTABLE: &'static [&'static str] = &["priority", "action", "rule"];

    fn api(ctx: &ArmContext) -> &dyn ResourceApi<AzureFirewall> {
        ctx.apis.firewalls.as_ref()
    }

    fn key(model: &ApplicationRuleCollectionModel) -> ProviderResult<ChildKey> {
        Ok(ChildKey {
            resource_group: model.resource_group_name.clone(),
            parent: model.azure_firewall_name.clone(),
            name: model.name.clone(),
        })
    }

    fn take_items(
        parent: &mut AzureFirewall,
    ) -> ParentCollection<AzureFirewallApplicationRuleCollection> {
        ParentCollection::from_option(
            parent
                .properties
                .as_mut()
                .and_then(|p| p.application_rule_collections.take()),
        )
    }

    fn put_items(parent: &mut AzureFirewall, items: Vec<AzureFirewallApplicationRuleCollection>) {
        parent
            .properties
            .get_or_insert_with(Default::default)
            .application_rule_collections = Some(items);
    }

    fn item_id(item: &AzureFirewallApplicationRuleCollection) -> Option<&str> {
        item.id.as_deref()
    }

    fn expand(model: &ApplicationRuleCollectionModel) -> AzureFirewallApplicationRuleCollection {
        AzureFirewallApplicationRuleCollection {
            id: None,
            name: Some(model.name.clone()),
            properties: Some(AzureFirewallApplicationRuleCollectionProperties {
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
        item: &AzureFirewallApplicationRuleCollection,
        key: &ChildKey,
        _parent_id: &str,
    ) -> ApplicationRuleCollectionModel {
        let props = item.properties.as_ref();
        ApplicationRuleCollectionModel {
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
impl AzureResource for FirewallApplicationRuleCollection {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let protocol = BlockSchema::new()
            .attribute(
                AttributeSchema::new(
                    "type",
                    AttributeType::Enum(vec!["Http".into(), "Https".into(), "Mssql".into()]),
                )
                .required(),
            )
            .attribute(
                AttributeSchema::new("port", AttributeType::Int)
                    .with_validation(validate::application_rule_port),
            );
        let rule = BlockSchema::new()
            .min_items(1)
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(AttributeSchema::new("source_addresses", types::string_list()).required())
            .attribute(AttributeSchema::new("fqdn_tags", types::string_list()))
            .attribute(AttributeSchema::new("target_fqdns", types::string_list()))
            .attribute(AttributeSchema::new("protocol", AttributeType::Block(protocol)));

        ResourceSchema::new(RESOURCE_TYPE)
            .with_description("Manages an Application Rule Collection within an Azure Firewall")
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

    /// A rule matches either FQDN tags or target FQDNs with protocols, never both
    fn validate(&self, attributes: &HashMap<String, Value>) -> Diagnostics {
        let mut diags = self.schema().validate(attributes);
        let Some(rules) = attributes.get("rule").and_then(|r| r.as_list()) else {
            return diags;
        };
        for (i, rule) in rules.iter().enumerate() {
            let Some(fields) = rule.as_map() else {
                continue;
            };
            let present = |key: &str| fields.get(key).is_some_and(|v| !v.is_zero());
            let path = format!("rule.{}", i);
            if present("fqdn_tags") && (present("target_fqdns") || present("protocol")) {
                diags.push_error(
                    &path,
                    "fqdn_tags cannot be combined with target_fqdns or protocol",
                );
            }
            if !present("fqdn_tags") && !present("target_fqdns") {
                diags.push_error(&path, "one of fqdn_tags or target_fqdns must be set");
            }
            if present("target_fqdns") && !present("protocol") {
                diags.push_error(&path, "protocol is required with target_fqdns");
            }
        }
        diags
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
    use crate::resources::testing::{Fakes, SUBSCRIPTION, block, strings};
    use crate::sdk::network::{AzureFirewallNetworkRuleCollection, AzureFirewallProperties};

    fn firewall_id() -> String {
        id::firewall_id(SUBSCRIPTION, "acctestRG", "acctestfirewall").to_string()
    }

    fn collection_id(name: &str) -> String {
        format!("{}/applicationRuleCollections/{}", firewall_id(), name)
    }

    fn key() -> ChildKey {
        ChildKey {
            resource_group: "acctestRG".to_string(),
            parent: "acctestfirewall".to_string(),
            name: "acctestarc".to_string(),
        }
    }

    fn model() -> ApplicationRuleCollectionModel {
        ApplicationRuleCollectionModel {
            name: "acctestarc".to_string(),
            azure_firewall_name: "acctestfirewall".to_string(),
            resource_group_name: "acctestRG".to_string(),
            priority: 100,
            action: "Allow".to_string(),
            rule: vec![ApplicationRuleBlock {
                name: "rule1".to_string(),
                description: "allow example".to_string(),
                source_addresses: vec!["10.0.0.0/16".to_string()],
                fqdn_tags: vec![],
                target_fqdns: vec!["*.example.com".to_string()],
                protocol: vec![ProtocolBlock {
                    protocol_type: "Https".to_string(),
                    port: 443,
                }],
            }],
        }
    }

    fn rule_block(extra: &[(&str, Value)]) -> Value {
        let mut pairs = vec![
            ("name", Value::string("rule1")),
            ("source_addresses", strings(&["10.0.0.0/16"])),
        ];
        pairs.extend(extra.iter().cloned());
        block(&pairs)
    }

    fn config(rule: Value) -> ResourceData {
        ResourceData::new(RESOURCE_TYPE)
            .with_config("name", Value::string("acctestarc"))
            .with_config("azure_firewall_name", Value::string("acctestfirewall"))
            .with_config("resource_group_name", Value::string("acctestRG"))
            .with_config("priority", Value::Int(100))
            .with_config("action", Value::string("Allow"))
            .with_config("rule", Value::List(vec![rule]))
    }

    fn https_rule() -> Value {
        rule_block(&[
            ("target_fqdns", strings(&["*.example.com"])),
            (
                "protocol",
                Value::List(vec![block(&[
                    ("type", Value::string("Https")),
                    ("port", Value::Int(443)),
                ])]),
            ),
        ])
    }

    #[test]
    fn flatten_inverts_expand() {
        let model = model();
        let item = FirewallApplicationRuleCollection::expand(&model);
        assert_eq!(
            FirewallApplicationRuleCollection::flatten(&item, &key(), &firewall_id()),
            model
        );
    }

    #[test]
    fn flatten_of_rule_without_protocols_is_empty_list() {
        let rules = vec![AzureFirewallApplicationRule {
            name: Some("r".to_string()),
            ..Default::default()
        }];
        let flattened = flatten_rules(Some(&rules));
        assert_eq!(flattened.len(), 1);
        assert!(flattened[0].protocol.is_empty());
        assert!(flatten_rules(None).is_empty());
    }

    #[tokio::test]
    async fn create_leaves_network_rule_collections_alone() {
        let fakes = Fakes::new();
        fakes.firewalls.seed(
            &firewall_id(),
            AzureFirewall {
                properties: Some(AzureFirewallProperties {
                    network_rule_collections: Some(vec![AzureFirewallNetworkRuleCollection {
                        name: Some("acctestnrc".to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let ctx = fakes.context();

        let mut data = config(https_rule());
        FirewallApplicationRuleCollection.create(&ctx, &mut data).await.unwrap();
        assert_eq!(data.id(), Some(collection_id("acctestarc").as_str()));

        let props = fakes.firewalls.fetch(&firewall_id()).unwrap().properties.unwrap();
        assert_eq!(props.network_rule_collections.unwrap().len(), 1);
        assert_eq!(props.application_rule_collections.unwrap().len(), 1);

        FirewallApplicationRuleCollection.update(&ctx, &mut data).await.unwrap();
        assert_eq!(fakes.firewalls.writes(), 1);
    }

    #[tokio::test]
    async fn delete_removes_the_collection() {
        let fakes = Fakes::new();
        fakes.firewalls.seed(&firewall_id(), AzureFirewall::default());
        let ctx = fakes.context();
        let mut data = config(https_rule());
        FirewallApplicationRuleCollection.create(&ctx, &mut data).await.unwrap();

        FirewallApplicationRuleCollection.delete(&ctx, &mut data).await.unwrap();
        let props = fakes.firewalls.fetch(&firewall_id()).unwrap().properties.unwrap();
        assert!(props.application_rule_collections.unwrap().is_empty());

        FirewallApplicationRuleCollection.read(&ctx, &mut data).await.unwrap();
        assert_eq!(data.id(), None);
    }

    #[test]
    fn rules_need_exactly_one_target_kind() {
        let ok = config(https_rule());
        assert!(!FirewallApplicationRuleCollection.validate(ok.config()).has_errors());

        let tags_only = config(rule_block(&[("fqdn_tags", strings(&["WindowsUpdate"]))]));
        assert!(!FirewallApplicationRuleCollection.validate(tags_only.config()).has_errors());

        let neither = config(rule_block(&[]));
        assert!(FirewallApplicationRuleCollection.validate(neither.config()).has_errors());

        let both = config(rule_block(&[
            ("fqdn_tags", strings(&["WindowsUpdate"])),
            ("target_fqdns", strings(&["*.example.com"])),
        ]));
        let diags = FirewallApplicationRuleCollection.validate(both.config());
        assert!(diags.errors.iter().any(|e| e.path == "rule.0"));

        let no_protocol = config(rule_block(&[("target_fqdns", strings(&["*.example.com"]))]));
        assert!(FirewallApplicationRuleCollection.validate(no_protocol.config()).has_errors());
    }
}
