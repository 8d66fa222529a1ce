//! Child resources stored as named entries of a parent's list
//!
//! Rule collections and hub connections have no endpoint of their own. Every
//! write fetches the parent, edits its list through a [`ParentCollection`]
//! and PUTs the whole parent back, holding the parent's name lock throughout
//! so concurrent siblings never overwrite each other.

use serde::Serialize;
use serde::de::DeserializeOwned;
use stratus_core::collection::{Named, ParentCollection, Upserted};
use stratus_core::provider::{ProviderError, ProviderResult, Timeouts};
use stratus_core::resource::{ResourceAddress, ResourceData};

use super::{ArmContext, ArmResultExt, get_if_exists, require_remote_id};
use crate::arm::ResourceApi;
use crate::id::AzureResourceId;
use crate::sdk::ArmResource;

/// Where a child lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChildKey {
    pub resource_group: String,
    pub parent: String,
    pub name: String,
}

pub(crate) trait ChildResource: Send + Sync {
    type Parent: ArmResource + Send + Sync;
    type Item: Named + Send + Sync;
    type Model: Serialize + DeserializeOwned + Send + Sync;

    const RESOURCE_TYPE: &'static str;
    /// Lock type of the parent; shared with the parent's own resource
    const PARENT_TYPE: &'static str;
    const NAMESPACE: &'static str;
    const PARENT_KEY: &'static str;
    const ITEM_KEY: &'static str;
    /// Attributes that can change without replacing the child
    const MUTABLE: &'static [&'static str];

    fn api(ctx: &ArmContext) -> &dyn ResourceApi<Self::Parent>;

    fn key(model: &Self::Model) -> ProviderResult<ChildKey>;

    /// Move the child list out of the parent
    fn take_items(parent: &mut Self::Parent) -> ParentCollection<Self::Item>;

    fn put_items(parent: &mut Self::Parent, items: Vec<Self::Item>);

    fn item_id(item: &Self::Item) -> Option<&str>;

    fn expand(model: &Self::Model) -> Self::Item;

    fn flatten(item: &Self::Item, key: &ChildKey, parent_id: &str) -> Self::Model;
}

fn address<K: ChildResource>(key: &ChildKey) -> ResourceAddress {
    ResourceAddress::new(K::RESOURCE_TYPE, &key.name).in_group(&key.resource_group)
}

fn parent_id<K: ChildResource>(subscription_id: &str, key: &ChildKey) -> String {
    AzureResourceId::new(subscription_id, &key.resource_group, K::NAMESPACE)
        .push(K::PARENT_KEY, &key.parent)
        .to_string()
}

pub(crate) fn parse_key<K: ChildResource>(id: &str) -> ProviderResult<ChildKey> {
    let parsed = AzureResourceId::parse(id)?;
    Ok(ChildKey {
        parent: parsed.get(K::PARENT_KEY)?.to_string(),
        name: parsed.get(K::ITEM_KEY)?.to_string(),
        resource_group: parsed.resource_group,
    })
}

/// Insert or replace the child inside its parent, then write the parent back
async fn upsert<K: ChildResource>(
    ctx: &ArmContext,
    model: &K::Model,
    key: &ChildKey,
    timeout: std::time::Duration,
    reject_existing: bool,
) -> ProviderResult<String> {
    let address = address::<K>(key);
    let parent_id = parent_id::<K>(&ctx.subscription_id, key);
    let api = K::api(ctx);

    let _lock = ctx.locks.lock(&key.parent, K::PARENT_TYPE).await;

    let mut parent = api
        .get(&parent_id)
        .await
        .context(&format!("Failed to retrieve {} {:?}", K::PARENT_TYPE, key.parent), &address)?;

    let mut items = K::take_items(&mut parent);
    if reject_existing && items.contains(&key.name) {
        let existing = format!("{}/{}/{}", parent_id, K::ITEM_KEY, key.name);
        return Err(
            ProviderError::import_required(K::RESOURCE_TYPE, &existing).for_resource(address)
        );
    }
    match items.upsert(&key.name, K::expand(model)) {
        Upserted::Inserted => log::debug!("appending {} to {}", key.name, key.parent),
        Upserted::Replaced => log::debug!("replacing {} in {}", key.name, key.parent),
    }
    K::put_items(&mut parent, items.into_inner());

    let operation = api
        .create_or_update(&parent_id, &parent)
        .await
        .context(&format!("Failed to write {}", K::PARENT_TYPE), &address)?;
    ctx.wait(operation, timeout, &address).await?;

    let mut written = api
        .get(&parent_id)
        .await
        .context(&format!("Failed to retrieve {} {:?}", K::PARENT_TYPE, key.parent), &address)?;
    let items = K::take_items(&mut written);
    require_remote_id(items.find(&key.name).and_then(K::item_id), &address)
}

pub(crate) async fn create<K: ChildResource>(
    ctx: &ArmContext,
    data: &mut ResourceData,
    timeouts: Timeouts,
) -> ProviderResult<()> {
    let model: K::Model = data.decode()?;
    let key = K::key(&model)?;
    log::info!("Creating {}", address::<K>(&key));

    let id = upsert::<K>(ctx, &model, &key, timeouts.create, ctx.features.import_protection).await?;
    data.set_id(id);
    read::<K>(ctx, data).await
}

pub(crate) async fn read<K: ChildResource>(
    ctx: &ArmContext,
    data: &mut ResourceData,
) -> ProviderResult<()> {
    let key = parse_key::<K>(data.require_id()?)?;
    let address = address::<K>(&key);
    let parent_id = parent_id::<K>(&ctx.subscription_id, &key);

    let parent = get_if_exists(K::api(ctx), &parent_id)
        .await
        .context(&format!("Failed to retrieve {} {:?}", K::PARENT_TYPE, key.parent), &address)?;
    let Some(mut parent) = parent else {
        log::info!(
            "{} {:?} was not found - removing {} from state",
            K::PARENT_TYPE,
            key.parent,
            address
        );
        data.clear_id();
        return Ok(());
    };

    let items = K::take_items(&mut parent);
    let Some(item) = items.find(&key.name) else {
        log::info!("{} was not found - removing from state", address);
        data.clear_id();
        return Ok(());
    };
    data.encode(&K::flatten(item, &key, &parent_id))
}

pub(crate) async fn update<K: ChildResource>(
    ctx: &ArmContext,
    data: &mut ResourceData,
    timeouts: Timeouts,
) -> ProviderResult<()> {
    let key = parse_key::<K>(data.require_id()?)?;
    if !data.has_changes(K::MUTABLE) {
        log::debug!("{} has no changes", address::<K>(&key));
        return Ok(());
    }
    log::info!("Updating {}", address::<K>(&key));

    let model: K::Model = data.decode()?;
    upsert::<K>(ctx, &model, &key, timeouts.update, false).await?;
    read::<K>(ctx, data).await
}

pub(crate) async fn delete<K: ChildResource>(
    ctx: &ArmContext,
    data: &mut ResourceData,
    timeouts: Timeouts,
) -> ProviderResult<()> {
    let key = parse_key::<K>(data.require_id()?)?;
    let address = address::<K>(&key);
    let parent_id = parent_id::<K>(&ctx.subscription_id, &key);
    let api = K::api(ctx);
    log::info!("Deleting {}", address);

    let _lock = ctx.locks.lock(&key.parent, K::PARENT_TYPE).await;

    let parent = get_if_exists(api, &parent_id)
        .await
        .context(&format!("Failed to retrieve {} {:?}", K::PARENT_TYPE, key.parent), &address)?;
    let Some(mut parent) = parent else {
        return Ok(());
    };

    let mut items = K::take_items(&mut parent);
    if items.remove(&key.name).is_none() {
        log::debug!("{} is already absent", address);
        return Ok(());
    }
    K::put_items(&mut parent, items.into_inner());

    let operation = api
        .create_or_update(&parent_id, &parent)
        .await
        .context(&format!("Failed to write {}", K::PARENT_TYPE), &address)?;
    ctx.wait(operation, timeouts.delete, &address).await
}
