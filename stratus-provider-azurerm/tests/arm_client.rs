//! Integration tests for the Resource Manager client using wiremock
//!
//! These drive the HTTP layer against mocked management and token endpoints:
//! status mapping, long-running operation polling and credential exchange.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use stratus_core::poller::{PollOptions, TokioClock, wait_for_completion};
use stratus_core::provider::{ErrorKind, Provider};
use stratus_core::resource::{ResourceData, Value};
use stratus_provider_azurerm::arm::{ArmClient, ArmError, ArmResourceApi, ResourceApi};
use stratus_provider_azurerm::auth::{ClientSecretCredential, StaticTokenCredential};
use stratus_provider_azurerm::sdk::eventhub::{self, EhNamespace, Sku};
use stratus_provider_azurerm::{AzureRmProvider, ProviderConfig};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{bearer_token, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NAMESPACE_ID: &str = "/subscriptions/sub/resourceGroups/acctestRG/providers/Microsoft.EventHub/namespaces/acctestns";

fn namespaces(server: &MockServer) -> ArmResourceApi<EhNamespace> {
    let client = ArmClient::new(
        &server.uri(),
        Arc::new(StaticTokenCredential::new("test-token")),
    )
    .unwrap();
    ArmResourceApi::new(client, eventhub::API_VERSION)
}

fn namespace_body() -> serde_json::Value {
    json!({
        "id": NAMESPACE_ID,
        "name": "acctestns",
        "location": "westeurope",
        "sku": { "name": "Standard", "tier": "Standard", "capacity": 1 },
        "properties": {
            "provisioningState": "Succeeded",
            "serviceBusEndpoint": "https://acctestns.servicebus.windows.net:443/"
        }
    })
}

fn poll_options() -> PollOptions {
    PollOptions::new(Duration::from_millis(10), Duration::from_secs(5))
}

/// Test module for status mapping
mod status_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_sends_token_and_api_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(NAMESPACE_ID))
            .and(query_param("api-version", eventhub::API_VERSION))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(namespace_body()))
            .mount(&server)
            .await;

        let namespace = namespaces(&server).get(NAMESPACE_ID).await.unwrap();
        assert_eq!(namespace.name.as_deref(), Some("acctestns"));
        assert_eq!(namespace.sku.and_then(|s| s.capacity), Some(1));
    }

    #[tokio::test]
    async fn test_get_404_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(NAMESPACE_ID))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "ResourceNotFound", "message": "not found" }
            })))
            .mount(&server)
            .await;

        let err = namespaces(&server).get(NAMESPACE_ID).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.into_provider("Failed to retrieve").kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_error_body_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(NAMESPACE_ID))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": { "code": "Conflict", "message": "namespace is being deleted" }
            })))
            .mount(&server)
            .await;

        let err = namespaces(&server)
            .create_or_update(NAMESPACE_ID, &EhNamespace::default())
            .await
            .err()
            .unwrap();
        match err {
            ArmError::Status {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 409);
                assert_eq!(code, "Conflict");
                assert_eq!(message, "namespace is being deleted");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_404_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(NAMESPACE_ID))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let operation = namespaces(&server).delete(NAMESPACE_ID).await.unwrap();
        assert!(operation.is_none());
    }
}

/// Test module for long-running operations
mod operation_tests {
    use super::*;

    #[tokio::test]
    async fn test_put_polls_async_operation_until_succeeded() {
        let server = MockServer::start().await;
        let operation_url = format!("{}/operations/op1", server.uri());
        Mock::given(method("PUT"))
            .and(path(NAMESPACE_ID))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Azure-AsyncOperation", operation_url.as_str())
                    .set_body_json(namespace_body()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/op1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/op1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })),
            )
            .mount(&server)
            .await;

        let body = EhNamespace {
            location: Some("westeurope".to_string()),
            sku: Some(Sku {
                name: Some("Standard".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let operation = namespaces(&server)
            .create_or_update(NAMESPACE_ID, &body)
            .await
            .unwrap();
        wait_for_completion(
            operation.as_ref(),
            poll_options(),
            &TokioClock,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let polls = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/operations/op1")
            .count();
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn test_failed_operation_reports_error() {
        let server = MockServer::start().await;
        let operation_url = format!("{}/operations/op2", server.uri());
        Mock::given(method("PUT"))
            .and(path(NAMESPACE_ID))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Azure-AsyncOperation", operation_url.as_str())
                    .set_body_json(namespace_body()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/op2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Failed",
                "error": { "code": "QuotaExceeded", "message": "no capacity left" }
            })))
            .mount(&server)
            .await;

        let operation = namespaces(&server)
            .create_or_update(NAMESPACE_ID, &EhNamespace::default())
            .await
            .unwrap();
        let err = wait_for_completion(
            operation.as_ref(),
            poll_options(),
            &TokioClock,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Api);
        assert!(err.to_string().contains("QuotaExceeded"));
    }

    #[tokio::test]
    async fn test_accepted_delete_polls_location() {
        let server = MockServer::start().await;
        let location = format!("{}/operations/delete1", server.uri());
        Mock::given(method("DELETE"))
            .and(path(NAMESPACE_ID))
            .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/delete1"))
            .respond_with(ResponseTemplate::new(202))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/delete1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let operation = namespaces(&server)
            .delete(NAMESPACE_ID)
            .await
            .unwrap()
            .unwrap();
        wait_for_completion(
            operation.as_ref(),
            poll_options(),
            &TokioClock,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    }
}

/// Test module for credentials
mod credential_tests {
    use super::*;

    #[tokio::test]
    async fn test_client_secret_token_is_exchanged_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "access_token": "from-aad",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(NAMESPACE_ID))
            .and(bearer_token("from-aad"))
            .respond_with(ResponseTemplate::new(200).set_body_json(namespace_body()))
            .expect(2)
            .mount(&server)
            .await;

        let credential =
            ClientSecretCredential::new(&server.uri(), "tenant", "client", "secret", &server.uri());
        let client = ArmClient::new(&server.uri(), Arc::new(credential)).unwrap();
        let api: ArmResourceApi<EhNamespace> = ArmResourceApi::new(client, eventhub::API_VERSION);

        api.get(NAMESPACE_ID).await.unwrap();
        api.get(NAMESPACE_ID).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_token_request_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let credential =
            ClientSecretCredential::new(&server.uri(), "tenant", "client", "wrong", &server.uri());
        let client = ArmClient::new(&server.uri(), Arc::new(credential)).unwrap();
        let api: ArmResourceApi<EhNamespace> = ArmResourceApi::new(client, eventhub::API_VERSION);

        let err = api.get(NAMESPACE_ID).await.unwrap_err();
        assert!(matches!(err, ArmError::Auth(_)));
        assert_eq!(err.into_provider("Failed").kind, ErrorKind::Configuration);
    }
}

/// Test module for the provider over HTTP
mod provider_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_namespace_end_to_end() {
        let server = MockServer::start().await;
        // Import check finds nothing
        Mock::given(method("GET"))
            .and(path(NAMESPACE_ID))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(NAMESPACE_ID))
            .and(body_string_contains("\"capacity\":1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(namespace_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(NAMESPACE_ID))
            .respond_with(ResponseTemplate::new(200).set_body_json(namespace_body()))
            .mount(&server)
            .await;

        let mut config = ProviderConfig::with_access_token("sub", "test-token");
        config.resource_manager_endpoint = server.uri();
        config.poll_interval = Duration::from_millis(10);
        let provider = AzureRmProvider::new(config).unwrap();

        let mut data = ResourceData::new("azurerm_eventhub_namespace")
            .with_config("name", Value::string("acctestns"))
            .with_config("resource_group_name", Value::string("acctestRG"))
            .with_config("location", Value::string("westeurope"))
            .with_config("sku", Value::string("Standard"))
            .with_config("capacity", Value::Int(1));
        provider.create(&mut data).await.unwrap();

        assert_eq!(data.id(), Some(NAMESPACE_ID));
        assert_eq!(data.get_state("sku"), Some(&Value::string("Standard")));
        assert_eq!(data.get_state("capacity"), Some(&Value::Int(1)));
    }

    #[tokio::test]
    async fn test_create_refuses_existing_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(NAMESPACE_ID))
            .respond_with(ResponseTemplate::new(200).set_body_json(namespace_body()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = ProviderConfig::with_access_token("sub", "test-token");
        config.resource_manager_endpoint = server.uri();
        let provider = AzureRmProvider::new(config).unwrap();

        let mut data = ResourceData::new("azurerm_eventhub_namespace")
            .with_config("name", Value::string("acctestns"))
            .with_config("resource_group_name", Value::string("acctestRG"))
            .with_config("location", Value::string("westeurope"))
            .with_config("sku", Value::string("Standard"));
        let err = provider.create(&mut data).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert_eq!(data.id(), None);
    }
}
