//! Name-based resource resolution
//!
//! The API's identifiers are opaque, so resources are located by scanning a
//! collection for a caller-assigned name. Names are not unique server-side:
//! the first match in listing order wins and any later duplicate is ignored.
//! "No match" is a normal outcome; each call site decides what it means.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::client::{decode, get_as, id_of, list_as, CloudApi};
use crate::error::{ConvergeError, Result};
use ovhform_models::ResourceRef;

/// First record of `collection` satisfying `predicate`, in listing order.
pub fn resolve<T, P>(collection: impl IntoIterator<Item = T>, mut predicate: P) -> Option<T>
where
    P: FnMut(&T) -> bool,
{
    collection.into_iter().find(|item| predicate(item))
}

/// List `path` and return the first entry whose `name` equals `name`.
pub async fn resolve_by_name(
    api: &dyn CloudApi,
    path: &str,
    query: &[(&str, &str)],
    name: &str,
) -> Result<Option<ResourceRef>> {
    let candidates: Vec<ResourceRef> = list_as(api, path, query).await?;
    let found = resolve(candidates, |candidate| candidate.name == name);
    debug!(path, name, found = ?found.as_ref().map(|r| &r.id), "resolved by name");
    Ok(found)
}

/// Like [`resolve_by_name`], but decodes the full listing entry.
pub async fn resolve_record_by_name<T: DeserializeOwned>(
    api: &dyn CloudApi,
    path: &str,
    query: &[(&str, &str)],
    name: &str,
) -> Result<Option<T>> {
    let candidates = api.list(path, query).await?;
    let found = resolve(candidates, |candidate| {
        candidate.get("name").and_then(Value::as_str) == Some(name)
    });
    found.map(|value| decode(path, value)).transpose()
}

/// Resolve over a collection that only lists ids.
///
/// Each id is fetched through `item_path` and decoded until `predicate`
/// holds; the remaining ids are not fetched.
pub async fn resolve_by_detail<T, F, P>(
    api: &dyn CloudApi,
    ids_path: &str,
    query: &[(&str, &str)],
    item_path: F,
    mut predicate: P,
) -> Result<Option<T>>
where
    T: DeserializeOwned,
    F: Fn(&str) -> String,
    P: FnMut(&T) -> bool,
{
    for id in list_ids(api, ids_path, query).await? {
        let record: T = get_as(api, &item_path(&id)).await?;
        if predicate(&record) {
            debug!(path = ids_path, id = %id, "resolved by detail");
            return Ok(Some(record));
        }
    }
    debug!(path = ids_path, "no matching record");
    Ok(None)
}

/// Fetch every record of an id-only collection, in listing order.
pub async fn fetch_all<T, F>(
    api: &dyn CloudApi,
    ids_path: &str,
    query: &[(&str, &str)],
    item_path: F,
) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&str) -> String,
{
    let mut records = Vec::new();
    for id in list_ids(api, ids_path, query).await? {
        records.push(get_as(api, &item_path(&id)).await?);
    }
    Ok(records)
}

async fn list_ids(api: &dyn CloudApi, path: &str, query: &[(&str, &str)]) -> Result<Vec<String>> {
    api.list(path, query)
        .await?
        .iter()
        .map(|value| {
            id_of(value).ok_or_else(|| ConvergeError::MalformedResponse {
                path: path.to_string(),
                source: serde::de::Error::custom(format!("expected an id, got {}", value)),
            })
        })
        .collect()
}
