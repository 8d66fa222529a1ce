//! HTTP client for Azure Resource Manager REST calls

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::{ArmError, ArmResult};
use crate::auth::TokenCredential;

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body and strip control characters for logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };
    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

#[derive(Deserialize)]
struct CloudErrorEnvelope {
    error: Option<CloudErrorBody>,
}

#[derive(Deserialize)]
struct CloudErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Raw response from a successful ARM call
#[derive(Debug)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ArmResponse {
    pub fn json<T: DeserializeOwned>(&self) -> ArmResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Server-suggested delay before the next poll, in seconds
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// Authenticated client for one Resource Manager endpoint
#[derive(Clone)]
pub struct ArmClient {
    http: Client,
    endpoint: Url,
    credential: Arc<dyn TokenCredential>,
}

impl ArmClient {
    pub fn new(endpoint: &str, credential: Arc<dyn TokenCredential>) -> ArmResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("stratus-provider-azurerm/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: Url::parse(endpoint)?,
            credential,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build the URL for a resource path with its `api-version`
    pub fn url(&self, path: &str, api_version: &str) -> ArmResult<Url> {
        let mut url = self.endpoint.join(path)?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    /// Call `path` relative to the endpoint
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&serde_json::Value>,
    ) -> ArmResult<ArmResponse> {
        let url = self.url(path, api_version)?;
        self.send(method, url, body).await
    }

    /// Call an absolute URL, e.g. an operation status link
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> ArmResult<ArmResponse> {
        log::debug!("{} {}", method, url);

        let token = self.credential.token().await?;
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(&token.token)
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ArmError::NotFound(url.path().to_string()));
        }

        if !status.is_success() {
            log::error!(
                "{} {} returned {} - {}",
                method,
                url.path(),
                status,
                sanitize_for_log(&body)
            );
            let error = serde_json::from_str::<CloudErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error);
            let (code, message) = match error {
                Some(e) => (
                    e.code.unwrap_or_else(|| "Unknown".to_string()),
                    e.message.unwrap_or_default(),
                ),
                None => ("Unknown".to_string(), sanitize_for_log(&body)),
            };
            return Err(ArmError::Status {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(ArmResponse {
            status,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}
