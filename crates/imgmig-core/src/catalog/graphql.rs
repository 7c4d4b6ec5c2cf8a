//! GraphQL documents and response envelopes for the source admin API.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::TransportError;
use crate::record::Record;

pub(crate) const CREATE_SESSION: &str = r#"
mutation CreateSession($email: String!, $password: String!) {
  createSession(email: $email, password: $password) {
    token
  }
}"#;

pub(crate) const IMAGES: &str = r#"
query Images($take: Int, $skip: Int, $sort: ImageSort, $order: SortOrder) {
  images(take: $take, skip: $skip, sort: $sort, order: $order) {
    nodes {
      id
      url
      createdAt
    }
  }
}"#;

/// Stable ordering so repeated runs enumerate records identically.
pub(crate) const SORT_FIELD: &str = "CREATED_AT";
pub(crate) const SORT_ORDER: &str = "DESCENDING";

pub(crate) fn request(query: &str, variables: Value) -> Value {
    json!({ "query": query, "variables": variables })
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionData {
    pub create_session: Option<Session>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Session {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImagesData {
    pub images: Option<ImagePage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImagePage {
    pub nodes: Option<Vec<Record>>,
}

/// Decode a GraphQL response, turning an `errors` list or missing `data` into a protocol error.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, TransportError> {
    let envelope: Envelope<T> = serde_json::from_slice(body)?;
    if !envelope.errors.is_empty() {
        let messages: Vec<&str> = envelope.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(TransportError::Protocol(messages.join("; ")));
    }
    envelope
        .data
        .ok_or_else(|| TransportError::Protocol("response has no data".to_string()))
}

pub(crate) fn session_token(body: &[u8]) -> Result<String, TransportError> {
    let data: SessionData = decode(body)?;
    data.create_session
        .map(|s| s.token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TransportError::Protocol("createSession returned no token".to_string()))
}

pub(crate) fn image_nodes(body: &[u8]) -> Result<Vec<Record>, TransportError> {
    let data: ImagesData = decode(body)?;
    data.images
        .and_then(|page| page.nodes)
        .ok_or_else(|| TransportError::Protocol("images.nodes missing from response".to_string()))
}
