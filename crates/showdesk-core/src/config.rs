//! Credential configuration.
//!
//! Describes where the identity service and the GraphQL endpoint live and how
//! GraphQL requests are authorized. The configuration is loaded once at
//! startup and shared read-only (`Arc<Config>`) afterwards.
//!
//! Configuration is read from `$SHOWDESK_CONFIG` if set, otherwise from
//! `~/.config/showdesk/config.json`, and then patched with `SHOWDESK_*`
//! environment overrides.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "showdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable pointing at an explicit config file
const CONFIG_PATH_ENV: &str = "SHOWDESK_CONFIG";

const GRAPHQL_ENDPOINT_ENV: &str = "SHOWDESK_GRAPHQL_ENDPOINT";
const REGION_ENV: &str = "SHOWDESK_REGION";
const AUTH_MODE_ENV: &str = "SHOWDESK_AUTH_MODE";
const API_KEY_ENV: &str = "SHOWDESK_API_KEY";

/// How outbound GraphQL requests are authorized.
///
/// The AppSync names (`AWS_IAM`, `AMAZON_COGNITO_USER_POOLS`, `API_KEY`) are
/// accepted so an exported AppSync config can be used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationMode {
    /// Every request carries a SigV4 signature made with temporary credentials.
    #[serde(rename = "signed-request", alias = "AWS_IAM")]
    SignedRequest,
    /// The session's access token goes in the `Authorization` header.
    #[serde(rename = "bearer-token", alias = "AMAZON_COGNITO_USER_POOLS")]
    BearerToken,
    /// A static key goes in the `x-api-key` header.
    #[serde(rename = "api-key", alias = "API_KEY")]
    ApiKey,
}

impl AuthorizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationMode::SignedRequest => "signed-request",
            AuthorizationMode::BearerToken => "bearer-token",
            AuthorizationMode::ApiKey => "api-key",
        }
    }
}

impl fmt::Display for AuthorizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorizationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "signed-request" | "AWS_IAM" => Ok(AuthorizationMode::SignedRequest),
            "bearer-token" | "AMAZON_COGNITO_USER_POOLS" => Ok(AuthorizationMode::BearerToken),
            "api-key" | "API_KEY" => Ok(AuthorizationMode::ApiKey),
            other => bail!("Unknown authorization mode: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Cognito user pool endpoint; derived from `region` when absent
    #[serde(default)]
    pub identity_endpoint: Option<String>,
    pub region: String,
    #[serde(default)]
    pub user_pool_id: Option<String>,
    #[serde(default)]
    pub user_pool_client_id: Option<String>,
    #[serde(default)]
    pub identity_pool_id: Option<String>,
    /// Cognito identity pool endpoint; derived from `region` when absent
    #[serde(default)]
    pub identity_pool_endpoint: Option<String>,
    #[serde(rename = "graphQlEndpoint")]
    pub graphql_endpoint: String,
    #[serde(alias = "mainGraphQLAuthenticationMethod")]
    pub authorization_mode: AuthorizationMode,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Config {
    /// Load the configuration file, apply environment overrides and validate.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Apply `SHOWDESK_*` overrides using the given lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(GRAPHQL_ENDPOINT_ENV) {
            self.graphql_endpoint = endpoint;
        }
        if let Some(region) = lookup(REGION_ENV) {
            self.region = region;
        }
        if let Some(mode) = lookup(AUTH_MODE_ENV) {
            self.authorization_mode = mode
                .parse()
                .with_context(|| format!("Invalid {}", AUTH_MODE_ENV))?;
        }
        if let Some(key) = lookup(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        Ok(())
    }

    /// Check that every field the selected authorization mode depends on is present.
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            bail!("region must not be empty");
        }
        url::Url::parse(&self.graphql_endpoint)
            .with_context(|| format!("Invalid graphQlEndpoint: {}", self.graphql_endpoint))?;

        match self.authorization_mode {
            AuthorizationMode::ApiKey => {
                if self.api_key.as_deref().map_or(true, str::is_empty) {
                    bail!("apiKey is required when authorizationMode is api-key");
                }
            }
            AuthorizationMode::BearerToken => {
                if self.user_pool_client_id.is_none() {
                    bail!("userPoolClientId is required when authorizationMode is bearer-token");
                }
            }
            AuthorizationMode::SignedRequest => {
                if self.user_pool_client_id.is_none() {
                    bail!("userPoolClientId is required when authorizationMode is signed-request");
                }
                if self.user_pool_id.is_none() || self.identity_pool_id.is_none() {
                    bail!(
                        "userPoolId and identityPoolId are required when authorizationMode is signed-request"
                    );
                }
            }
        }
        Ok(())
    }

    pub fn identity_endpoint(&self) -> String {
        self.identity_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com/", self.region))
    }

    pub fn identity_pool_endpoint(&self) -> String {
        self.identity_pool_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-identity.{}.amazonaws.com/", self.region))
    }

    /// Login provider name used to exchange an ID token at the identity pool,
    /// e.g. `cognito-idp.eu-central-1.amazonaws.com/eu-central-1_abc`.
    pub fn login_provider(&self) -> Option<String> {
        self.user_pool_id
            .as_ref()
            .map(|pool| format!("cognito-idp.{}.amazonaws.com/{}", self.region, pool))
    }

    fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
