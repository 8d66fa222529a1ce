//! Typed per-resource API surface over the ARM client

use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use stratus_core::poller::LongRunningOperation;

use super::client::ArmClient;
use super::error::{ArmError, ArmResult};
use super::operation::ArmOperation;

/// Operations every Resource Manager resource type exposes
///
/// Resource IDs are full ARM paths. `get` reports a missing resource as
/// [`ArmError::NotFound`]; `delete` reports it as `Ok(None)`.
#[async_trait]
pub trait ResourceApi<T>: Send + Sync
where
    T: Send + Sync,
{
    async fn get(&self, id: &str) -> ArmResult<T>;

    async fn create_or_update(
        &self,
        id: &str,
        body: &T,
    ) -> ArmResult<Box<dyn LongRunningOperation>>;

    /// PATCH only the tags of an existing resource
    async fn update_tags(
        &self,
        id: &str,
        tags: &HashMap<String, String>,
    ) -> ArmResult<Box<dyn LongRunningOperation>>;

    /// POST to an action endpoint below the resource (e.g. `roles/workernode/resize`)
    async fn post_action(
        &self,
        id: &str,
        action: &str,
        body: &serde_json::Value,
    ) -> ArmResult<Box<dyn LongRunningOperation>>;

    async fn delete(&self, id: &str) -> ArmResult<Option<Box<dyn LongRunningOperation>>>;
}

/// [`ResourceApi`] over HTTP, pinned to one `api-version`
pub struct ArmResourceApi<T> {
    client: ArmClient,
    api_version: &'static str,
    _model: PhantomData<fn() -> T>,
}

impl<T> ArmResourceApi<T> {
    pub fn new(client: ArmClient, api_version: &'static str) -> Self {
        Self {
            client,
            api_version,
            _model: PhantomData,
        }
    }

    pub fn api_version(&self) -> &'static str {
        self.api_version
    }

    /// Send a write to `path` and track it; `resource_id` is the resource
    /// whose provisioning state reflects the write
    async fn write(
        &self,
        method: Method,
        path: &str,
        resource_id: &str,
        body: &serde_json::Value,
    ) -> ArmResult<Box<dyn LongRunningOperation>> {
        let url = self.client.url(path, self.api_version)?;
        let response = self.client.send(method, url, Some(body)).await?;
        let resource_url = self.client.url(resource_id, self.api_version)?;
        let operation = ArmOperation::from_response(&self.client, &resource_url, &response)?;
        Ok(Box::new(operation))
    }
}

#[async_trait]
impl<T> ResourceApi<T> for ArmResourceApi<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, id: &str) -> ArmResult<T> {
        let response = self
            .client
            .request(Method::GET, id, self.api_version, None)
            .await?;
        response.json()
    }

    async fn create_or_update(
        &self,
        id: &str,
        body: &T,
    ) -> ArmResult<Box<dyn LongRunningOperation>> {
        let body = serde_json::to_value(body)?;
        self.write(Method::PUT, id, id, &body).await
    }

    async fn update_tags(
        &self,
        id: &str,
        tags: &HashMap<String, String>,
    ) -> ArmResult<Box<dyn LongRunningOperation>> {
        self.write(Method::PATCH, id, id, &json!({ "tags": tags }))
            .await
    }

    async fn post_action(
        &self,
        id: &str,
        action: &str,
        body: &serde_json::Value,
    ) -> ArmResult<Box<dyn LongRunningOperation>> {
        let path = format!("{}/{}", id.trim_end_matches('/'), action);
        self.write(Method::POST, &path, id, body).await
    }

    async fn delete(&self, id: &str) -> ArmResult<Option<Box<dyn LongRunningOperation>>> {
        let url = self.client.url(id, self.api_version)?;
        match self.client.send(Method::DELETE, url.clone(), None).await {
            Ok(response) => {
                let operation = ArmOperation::from_response(&self.client, &url, &response)?;
                Ok(Some(Box::new(operation)))
            }
            Err(ArmError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
