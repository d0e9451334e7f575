//! Compute instance convergence

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::Converge;
use crate::client::{body, CloudApi};
use crate::error::{ConvergeError, Result};
use crate::paths;
use crate::resolver::resolve_by_name;
use ovhform_models::{CreateInstanceRequest, InstanceDesc, Outcome, Presence, ResourceRef};

pub struct InstanceConvergence {
    api: Arc<dyn CloudApi>,
}

impl InstanceConvergence {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self { api }
    }

    async fn create(&self, desired: &InstanceDesc) -> Result<Outcome> {
        let api = self.api.as_ref();
        let project = desired.service_name.as_str();
        let region = [("region", desired.region.as_str())];

        let flavor = resolve_by_name(api, &paths::instance::flavors(project), &region, &desired.flavor_name)
            .await?
            .ok_or_else(|| ConvergeError::not_found("Flavor", &desired.flavor_name))?;

        let image = resolve_by_name(api, &paths::volume::images(project), &region, &desired.image_name)
            .await?
            .ok_or_else(|| ConvergeError::not_found("Image", &desired.image_name))?;

        let ssh_key_id = match &desired.ssh_key_name {
            Some(key) => {
                let found =
                    resolve_by_name(api, &paths::instance::ssh_keys(project), &region, key).await?;
                if found.is_none() {
                    warn!(ssh_key = %key, "ssh key not found, creating instance without it");
                }
                found.map(|r| r.id)
            }
            None => None,
        };

        let collection = paths::instance::collection(project);
        let request = CreateInstanceRequest {
            flavor_id: flavor.id,
            image_id: image.id,
            monthly_billing: desired.monthly_billing,
            name: desired.name.clone(),
            region: desired.region.clone(),
            networks: desired.networks.clone(),
            ssh_key_id,
        };
        info!(instance = %desired.name, flavor = %desired.flavor_name, "creating instance");
        let created = api.post(&collection, body(&collection, &request)?).await?;

        Ok(Outcome::changed(format!("Instance {} created", desired.name)).with_attributes(created))
    }
}

/// Resolve an instance of the project by name, failing when absent.
pub(crate) async fn require_instance(
    api: &dyn CloudApi,
    project: &str,
    name: &str,
) -> Result<ResourceRef> {
    resolve_by_name(api, &paths::instance::collection(project), &[], name)
        .await?
        .ok_or_else(|| ConvergeError::not_found("Instance", name))
}

#[async_trait]
impl Converge for InstanceConvergence {
    type Desired = InstanceDesc;

    async fn converge(&self, desired: &InstanceDesc) -> Result<Outcome> {
        let api = self.api.as_ref();
        let project = desired.service_name.as_str();

        let found = resolve_by_name(
            api,
            &paths::instance::collection(project),
            &[("region", desired.region.as_str())],
            &desired.name,
        )
        .await?;

        match (found, desired.state) {
            (Some(_), Presence::Present) => Ok(Outcome::unchanged(format!(
                "Instance {} already exists",
                desired.name
            ))),
            (Some(instance), Presence::Absent) => {
                info!(instance = %desired.name, id = %instance.id, "deleting instance");
                api.delete(&paths::instance::item(project, &instance.id)).await?;
                Ok(Outcome::changed(format!("Instance {} deleted", desired.name)))
            }
            (None, Presence::Absent) => Ok(Outcome::unchanged(format!(
                "Instance {} does not exist",
                desired.name
            ))),
            (None, Presence::Present) => self.create(desired).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::FakeCloud;
    use ovhform_models::InstanceNetwork;
    use serde_json::json;

    const INSTANCES: &str = "/cloud/project/p1/instance";

    fn desc(state: Presence) -> InstanceDesc {
        InstanceDesc {
            service_name: "p1".to_string(),
            name: "web-1".to_string(),
            region: "GRA11".to_string(),
            flavor_name: "b2-7".to_string(),
            image_name: "Debian 12".to_string(),
            ssh_key_name: Some("deploy".to_string()),
            networks: vec![],
            monthly_billing: false,
            state,
        }
    }

    fn catalog() -> FakeCloud {
        FakeCloud::new()
            .on_list(INSTANCES, json!([]))
            .on_list("/cloud/project/p1/flavor", json!([{"id": "f-7", "name": "b2-7"}]))
            .on_list("/cloud/project/p1/image", json!([{"id": "img-1", "name": "Debian 12"}]))
            .on_list("/cloud/project/p1/sshkey", json!([{"id": "k-1", "name": "deploy"}]))
            .on_post(INSTANCES, json!({"id": "i1", "name": "web-1", "status": "BUILD"}))
    }

    #[tokio::test]
    async fn test_create_resolves_catalog_names() {
        let cloud = Arc::new(catalog());
        let instances = InstanceConvergence::new(cloud.clone());
        let mut desired = desc(Presence::Present);
        desired.networks = vec![InstanceNetwork {
            network_id: "net-1".to_string(),
            ip: None,
        }];

        let outcome = instances.converge(&desired).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.attributes["status"], "BUILD");

        let create = &cloud.mutations()[0];
        assert_eq!(
            create.body,
            Some(json!({
                "flavorId": "f-7",
                "imageId": "img-1",
                "monthlyBilling": false,
                "name": "web-1",
                "region": "GRA11",
                "networks": [{"networkId": "net-1"}],
                "sshKeyId": "k-1",
            }))
        );
    }

    #[tokio::test]
    async fn test_unknown_flavor_is_not_found() {
        let cloud = Arc::new(catalog());
        let instances = InstanceConvergence::new(cloud.clone());
        let mut desired = desc(Presence::Present);
        desired.flavor_name = "r3-64".to_string();

        let err = instances.converge(&desired).await.unwrap_err();
        assert!(matches!(err, ConvergeError::NotFound { kind: "Flavor", .. }));
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_existing_instance_is_left_alone() {
        let cloud = Arc::new(FakeCloud::new().on_list(INSTANCES, json!([{"id": "i1", "name": "web-1"}])));
        let instances = InstanceConvergence::new(cloud.clone());

        let outcome = instances.converge(&desc(Presence::Present)).await.unwrap();
        assert!(!outcome.changed);
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_absent_deletes_then_is_idempotent() {
        let cloud = Arc::new(FakeCloud::new().on_list(INSTANCES, json!([{"id": "i1", "name": "web-1"}])));
        let outcome = InstanceConvergence::new(cloud.clone())
            .converge(&desc(Presence::Absent))
            .await
            .unwrap();
        assert!(outcome.changed);
        assert!(cloud.was_called("DELETE", "/cloud/project/p1/instance/i1"));

        let gone = Arc::new(FakeCloud::new().on_list(INSTANCES, json!([])));
        let outcome = InstanceConvergence::new(gone.clone())
            .converge(&desc(Presence::Absent))
            .await
            .unwrap();
        assert!(!outcome.changed);
        assert!(gone.mutations().is_empty());
    }
}
