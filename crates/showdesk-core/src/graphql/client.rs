//! GraphQL client for the backend API.
//!
//! Each call authorizes the request according to the configured mode, sends
//! a single POST and parses the response. There is no response cache and no
//! retry; every call is a fresh round trip.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::{ClientError, CredentialSource, GraphQlRequest, GraphQlResponse, OperationKind};
use crate::auth::AuthError;
use crate::config::{AuthorizationMode, Config};
use crate::signing::{self, SignableRequest, SigningParams};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const JSON_CONTENT_TYPE: &str = "application/json";
const API_KEY_HEADER: &str = "x-api-key";

/// Service name GraphQL requests are signed for
const SIGNING_SERVICE: &str = "appsync";

/// GraphQL client. Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct GraphQlClient {
    client: Client,
    config: Arc<Config>,
    credentials: Arc<dyn CredentialSource>,
    endpoint: Url,
}

impl GraphQlClient {
    pub fn new(config: Arc<Config>, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let endpoint = Url::parse(&config.graphql_endpoint)
            .with_context(|| format!("Invalid GraphQL endpoint: {}", config.graphql_endpoint))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            config,
            credentials,
            endpoint,
        })
    }

    pub async fn query(&self, request: &GraphQlRequest) -> Result<GraphQlResponse, ClientError> {
        self.execute(request, OperationKind::Query).await
    }

    pub async fn mutate(&self, request: &GraphQlRequest) -> Result<GraphQlResponse, ClientError> {
        self.execute(request, OperationKind::Mutation).await
    }

    /// Authorize, send and parse one GraphQL operation.
    ///
    /// Field-level errors come back inside the response, next to any data.
    /// `Err` is reserved for failures where no usable response exists.
    pub async fn execute(
        &self,
        request: &GraphQlRequest,
        kind: OperationKind,
    ) -> Result<GraphQlResponse, ClientError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| ClientError::Transport(format!("Failed to encode request: {}", e)))?;

        debug!(%kind, mode = %self.config.authorization_mode, phase = "authorizing", "GraphQL call");
        let headers = match self.authorize(&body).await {
            Ok(headers) => headers,
            Err(e) => {
                warn!(%kind, error = %e, phase = "unauthenticated", "GraphQL call not sent");
                return Err(ClientError::Unauthenticated(e));
            }
        };

        debug!(%kind, endpoint = %self.endpoint, phase = "sending", "GraphQL call");
        let response = match self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(%kind, error = %e, phase = "failed_transport", "GraphQL call failed");
                return Err(e.into());
            }
        };

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(%kind, status = %status, phase = "failed_transport", "GraphQL call failed");
            return Err(ClientError::from_status(status, &text));
        }

        let parsed = GraphQlResponse::parse(&text)?;
        if parsed.has_errors() {
            debug!(
                %kind,
                errors = parsed.errors.len(),
                partial = parsed.is_partial(),
                phase = "failed_graphql",
                "GraphQL call returned errors"
            );
        } else {
            debug!(%kind, phase = "succeeded", "GraphQL call");
        }
        Ok(parsed)
    }

    /// Build the headers for one request body under the configured mode.
    async fn authorize(&self, body: &[u8]) -> Result<HeaderMap, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(header::ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

        match self.config.authorization_mode {
            AuthorizationMode::ApiKey => {
                let key = self.config.api_key.as_deref().ok_or_else(|| {
                    AuthError::ServiceError("No API key configured".to_string())
                })?;
                headers.insert(API_KEY_HEADER, header_value(key)?);
            }
            AuthorizationMode::BearerToken => {
                let token = self.credentials.access_token().await?;
                headers.insert(header::AUTHORIZATION, header_value(&token)?);
            }
            AuthorizationMode::SignedRequest => {
                let credentials = self.credentials.signing_credentials().await?;
                let query = signing::canonical_query(&self.endpoint);
                let request = SignableRequest {
                    method: "POST",
                    path: self.endpoint.path(),
                    query: &query,
                    headers: vec![
                        ("host".to_string(), host_header(&self.endpoint)),
                        ("content-type".to_string(), JSON_CONTENT_TYPE.to_string()),
                    ],
                    body,
                };
                let params = SigningParams {
                    credentials: &credentials,
                    region: &self.config.region,
                    service: SIGNING_SERVICE,
                    time: Utc::now(),
                };
                for (name, value) in signing::sign(&request, &params) {
                    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                        AuthError::ServiceError(format!("Invalid signing header name: {}", e))
                    })?;
                    headers.insert(name, header_value(&value)?);
                }
            }
        }
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value)
        .map_err(|_| AuthError::ServiceError("Credential is not a valid header value".to_string()))
}

/// The Host header value reqwest will send for this URL.
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
