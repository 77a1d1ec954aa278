use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::ClientError;
use crate::auth::error::truncate_body;

/// One step in the path to the field an error belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(u64),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,
    /// AppSync's error classification, e.g. `UnauthorizedException`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(ref path) = self.path {
            let joined = path.iter().map(ToString::to_string).collect::<Vec<_>>().join(".");
            write!(f, " (at {})", joined)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

/// A parsed GraphQL response.
///
/// Data and errors may both be present (partial success); they are kept side
/// by side. At least one of them is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQlResponse {
    pub data: Option<Value>,
    pub errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    /// Parse a response body from the endpoint.
    pub fn parse(body: &str) -> Result<Self, ClientError> {
        let wire: WireResponse = serde_json::from_str(body).map_err(|e| {
            ClientError::InvalidResponse(format!(
                "Body is not a GraphQL response: {} ({})",
                e,
                truncate_body(body)
            ))
        })?;

        let data = wire.data.filter(|d| !d.is_null());
        let errors = wire.errors.unwrap_or_default();

        if data.is_none() && errors.is_empty() {
            return Err(ClientError::InvalidResponse(
                "Response has neither data nor errors".to_string(),
            ));
        }

        Ok(Self { data, errors })
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Usable data alongside field-level errors
    pub fn is_partial(&self) -> bool {
        self.data.is_some() && self.has_errors()
    }

    /// Look up a root field of `data`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|d| d.get(name))
            .filter(|v| !v.is_null())
    }

    /// Deserialize a root field of `data`.
    ///
    /// A missing or null field is reported with the response's errors when
    /// there are any, since they usually explain why the field is absent.
    pub fn field_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ClientError> {
        match self.field(name) {
            Some(value) => T::deserialize(value).map_err(|e| {
                ClientError::InvalidResponse(format!("Unexpected shape for {}: {}", name, e))
            }),
            None if self.has_errors() => Err(ClientError::GraphQl(self.errors.clone())),
            None => Err(ClientError::InvalidResponse(format!("Response has no {} field", name))),
        }
    }

    /// Collapse into data-or-error for callers that do not want partial data.
    pub fn into_result(self) -> Result<Value, ClientError> {
        if !self.errors.is_empty() {
            return Err(ClientError::GraphQl(self.errors));
        }
        self.data.ok_or_else(|| ClientError::InvalidResponse("Response has no data".to_string()))
    }
}
