//! Long-running operation tracking for ARM write calls
//!
//! Resource Manager reports asynchronous progress in one of three ways:
//! an `Azure-AsyncOperation` status document, a `Location` URL that answers
//! 202 until the work is done, or a `provisioningState` on the resource
//! itself. A response carrying none of these is already complete.

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use stratus_core::poller::{LongRunningOperation, OperationStatus};
use stratus_core::provider::{BoxFuture, ProviderResult};
use url::Url;

use super::client::{ArmClient, ArmResponse};
use super::error::{ArmError, ArmResult};

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
const LOCATION: &str = "location";

#[derive(Debug, Clone, PartialEq, Eq)]
enum PollTarget {
    Done,
    AsyncOperation(Url),
    Location(Url),
    ProvisioningState(Url),
}

#[derive(Deserialize)]
struct OperationDocument {
    status: Option<String>,
    error: Option<OperationError>,
}

#[derive(Deserialize)]
struct OperationError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ProvisionedResource {
    properties: Option<ProvisionedProperties>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionedProperties {
    provisioning_state: Option<String>,
}

fn provisioning_state(body: &str) -> Option<String> {
    serde_json::from_str::<ProvisionedResource>(body)
        .ok()
        .and_then(|r| r.properties)
        .and_then(|p| p.provisioning_state)
}

fn status_from_state(state: &str, detail: Option<String>) -> OperationStatus {
    match state.to_ascii_lowercase().as_str() {
        "succeeded" => OperationStatus::Succeeded,
        "failed" => OperationStatus::Failed(detail.unwrap_or_else(|| state.to_string())),
        "canceled" | "cancelled" => OperationStatus::Canceled,
        _ => OperationStatus::InProgress { retry_after: None },
    }
}

/// Pollable handle for an ARM write
pub struct ArmOperation {
    client: ArmClient,
    target: PollTarget,
}

impl ArmOperation {
    /// Work out how to track the write that produced `response`
    pub fn from_response(
        client: &ArmClient,
        resource_url: &Url,
        response: &ArmResponse,
    ) -> ArmResult<Self> {
        let target = if let Some(link) = response.header(AZURE_ASYNC_OPERATION) {
            PollTarget::AsyncOperation(Url::parse(link)?)
        } else if response.status == StatusCode::ACCEPTED
            && let Some(link) = response.header(LOCATION)
        {
            PollTarget::Location(Url::parse(link)?)
        } else if let Some(state) = provisioning_state(&response.body)
            && matches!(
                status_from_state(&state, None),
                OperationStatus::InProgress { .. }
            )
        {
            PollTarget::ProvisioningState(resource_url.clone())
        } else {
            PollTarget::Done
        };

        Ok(Self {
            client: client.clone(),
            target,
        })
    }

    pub fn is_done(&self) -> bool {
        self.target == PollTarget::Done
    }

    async fn poll_target(&self) -> ArmResult<OperationStatus> {
        match &self.target {
            PollTarget::Done => Ok(OperationStatus::Succeeded),
            PollTarget::AsyncOperation(url) => {
                let response = self.client.send(Method::GET, url.clone(), None).await?;
                let doc: OperationDocument = response.json()?;
                let detail = doc.error.map(|e| {
                    format!(
                        "{}: {}",
                        e.code.unwrap_or_else(|| "Unknown".to_string()),
                        e.message.unwrap_or_default()
                    )
                });
                let state = doc.status.unwrap_or_else(|| "InProgress".to_string());
                Ok(match status_from_state(&state, detail) {
                    OperationStatus::InProgress { .. } => OperationStatus::InProgress {
                        retry_after: response.retry_after(),
                    },
                    other => other,
                })
            }
            PollTarget::Location(url) => {
                let response = self.client.send(Method::GET, url.clone(), None).await?;
                if response.status == StatusCode::ACCEPTED {
                    Ok(OperationStatus::InProgress {
                        retry_after: response.retry_after(),
                    })
                } else {
                    Ok(OperationStatus::Succeeded)
                }
            }
            PollTarget::ProvisioningState(url) => {
                let response = self.client.send(Method::GET, url.clone(), None).await?;
                Ok(match provisioning_state(&response.body) {
                    Some(state) => status_from_state(&state, None),
                    None => OperationStatus::Succeeded,
                })
            }
        }
    }
}

impl LongRunningOperation for ArmOperation {
    fn poll(&self) -> BoxFuture<'_, ProviderResult<OperationStatus>> {
        Box::pin(async move {
            match self.poll_target().await {
                Ok(status) => Ok(status),
                // A delete tracked through the resource URL is done once it is gone
                Err(ArmError::NotFound(_))
                    if matches!(self.target, PollTarget::ProvisioningState(_)) =>
                {
                    Ok(OperationStatus::Succeeded)
                }
                Err(e) => Err(e.into_provider("Failed to poll operation status")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_map_to_statuses() {
        assert_eq!(status_from_state("Succeeded", None), OperationStatus::Succeeded);
        assert_eq!(status_from_state("Canceled", None), OperationStatus::Canceled);
        assert_eq!(
            status_from_state("Failed", Some("Conflict: busy".to_string())),
            OperationStatus::Failed("Conflict: busy".to_string())
        );
        assert_eq!(
            status_from_state("Updating", None),
            OperationStatus::InProgress { retry_after: None }
        );
    }

    #[test]
    fn provisioning_state_is_read_from_properties() {
        let body = r#"{"name":"fw","properties":{"provisioningState":"Updating"}}"#;
        assert_eq!(provisioning_state(body), Some("Updating".to_string()));
        assert_eq!(provisioning_state("{}"), None);
        assert_eq!(provisioning_state(""), None);
    }
}
