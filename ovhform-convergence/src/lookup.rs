//! Read-only lookups by name, returning the full remote record.

use std::sync::Arc;

use serde_json::Value;

use crate::client::CloudApi;
use crate::error::{ConvergeError, Result};
use crate::paths;
use crate::resolver::{resolve_by_detail, resolve_by_name};
use ovhform_models::ClusterRef;

pub struct Lookup {
    api: Arc<dyn CloudApi>,
}

impl Lookup {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self { api }
    }

    pub async fn flavor(&self, project: &str, region: &str, name: &str) -> Result<Value> {
        let api = self.api.as_ref();
        let found = resolve_by_name(api, &paths::instance::flavors(project), &[("region", region)], name)
            .await?
            .ok_or_else(|| ConvergeError::not_found("Flavor", format!("{} in {}", name, region)))?;
        Ok(api.get(&paths::instance::flavor(project, &found.id)).await?)
    }

    /// An image, or a snapshot of the same name when no image matches.
    pub async fn image(&self, project: &str, region: &str, name: &str) -> Result<Value> {
        let api = self.api.as_ref();
        let query = [("region", region)];

        if let Some(image) = resolve_by_name(api, &paths::volume::images(project), &query, name).await? {
            return Ok(api.get(&paths::volume::image(project, &image.id)).await?);
        }
        if let Some(snapshot) =
            resolve_by_name(api, &paths::volume::snapshots(project), &query, name).await?
        {
            return Ok(api.get(&paths::volume::snapshot(project, &snapshot.id)).await?);
        }
        Err(ConvergeError::not_found("Image", format!("{} in {}", name, region)))
    }

    pub async fn instance(&self, project: &str, name: &str) -> Result<Value> {
        let api = self.api.as_ref();
        let found = resolve_by_name(api, &paths::instance::collection(project), &[], name)
            .await?
            .ok_or_else(|| ConvergeError::not_found("Instance", name))?;
        Ok(api.get(&paths::instance::item(project, &found.id)).await?)
    }

    pub async fn volume(&self, project: &str, region: &str, name: &str) -> Result<Value> {
        let api = self.api.as_ref();
        let found = resolve_by_name(api, &paths::volume::collection(project), &[("region", region)], name)
            .await?
            .ok_or_else(|| ConvergeError::not_found("Block storage", name))?;
        Ok(api.get(&paths::volume::item(project, &found.id)).await?)
    }

    pub async fn cluster(&self, cluster: &ClusterRef) -> Result<Value> {
        let project = cluster.service_name.as_str();
        let engine = cluster.engine;
        resolve_by_detail(
            self.api.as_ref(),
            &paths::database::clusters(project, engine),
            &[],
            |id| paths::database::cluster(project, engine, id),
            |candidate: &Value| {
                candidate.get("description").and_then(Value::as_str) == Some(cluster.name.as_str())
            },
        )
        .await?
        .ok_or_else(|| ConvergeError::not_found("Cluster", format!("{} ({})", cluster.name, engine)))
    }
}
