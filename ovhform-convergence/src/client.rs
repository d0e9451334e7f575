//! The cloud API capability the engine drives.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ConvergeError, RemoteError, Result};

/// REST-shaped access to the remote resource hierarchy.
///
/// Paths are absolute API paths (see [`crate::paths`]). Every method fails
/// with [`RemoteError`] on a non-2xx response.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// List a collection, optionally filtered by query parameters.
    async fn list(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<Vec<Value>, RemoteError>;

    async fn get(&self, path: &str) -> std::result::Result<Value, RemoteError>;

    async fn post(&self, path: &str, body: Value) -> std::result::Result<Value, RemoteError>;

    async fn put(&self, path: &str, body: Value) -> std::result::Result<Value, RemoteError>;

    async fn delete(&self, path: &str) -> std::result::Result<(), RemoteError>;
}

/// List a collection and decode every entry.
pub async fn list_as<T: DeserializeOwned>(
    api: &dyn CloudApi,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Vec<T>> {
    let items = api.list(path, query).await?;
    items
        .into_iter()
        .map(|item| decode(path, item))
        .collect()
}

/// Fetch and decode a single record.
pub async fn get_as<T: DeserializeOwned>(api: &dyn CloudApi, path: &str) -> Result<T> {
    let value = api.get(path).await?;
    decode(path, value)
}

/// Serialize a typed request body.
pub(crate) fn body<T: Serialize>(path: &str, request: &T) -> Result<Value> {
    serde_json::to_value(request).map_err(|source| ConvergeError::MalformedResponse {
        path: path.to_string(),
        source,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| ConvergeError::MalformedResponse {
        path: path.to_string(),
        source,
    })
}

/// Render a collection entry that is a bare id (string or number).
pub(crate) fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
