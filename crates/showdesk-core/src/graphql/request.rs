use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Whether a document reads or writes. Both travel as the same POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => f.write_str("query"),
            OperationKind::Mutation => f.write_str("mutation"),
        }
    }
}

/// A GraphQL document and its variables, exactly as they go on the wire.
///
/// The document is opaque text; validating it against the schema is the
/// server's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: Map<String, Value>,
}

impl GraphQlRequest {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            query: document.into(),
            variables: Map::new(),
        }
    }

    pub fn with_variables(document: impl Into<String>, variables: Map<String, Value>) -> Self {
        Self {
            query: document.into(),
            variables,
        }
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = GraphQlRequest::new("query q($id: String!) { getShow(sID: $id) { sName } }")
            .variable("id", "3");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "query": "query q($id: String!) { getShow(sID: $id) { sName } }",
                "variables": { "id": "3" }
            })
        );
    }

    #[test]
    fn test_empty_variables_serialize_as_object() {
        let body = serde_json::to_value(GraphQlRequest::new("{ ping }")).unwrap();
        assert_eq!(body["variables"], json!({}));
    }
}
