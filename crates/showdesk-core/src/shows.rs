//! The show documents the screen issues.

use serde::{Deserialize, Serialize};

use crate::graphql::GraphQlRequest;

pub const GET_SHOW_FIELD: &str = "getShow";
pub const DELETE_SHOW_FIELD: &str = "deleteShow";

const LOAD_SHOW: &str = r#"query queryShows($sID: String!) {
  getShow(sID: $sID) {
    description
    sName
  }
}"#;

const DELETE_SHOW: &str = r#"mutation fakeDelete($sID: Int!) {
  deleteShow(sID: $sID) {
    description
    sName
  }
}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    #[serde(rename = "sID", default)]
    pub s_id: Option<String>,
    #[serde(rename = "sName")]
    pub s_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub fn load_show(id: &str) -> GraphQlRequest {
    GraphQlRequest::new(LOAD_SHOW).variable("sID", id)
}

pub fn delete_show(id: i64) -> GraphQlRequest {
    GraphQlRequest::new(DELETE_SHOW).variable("sID", id)
}
