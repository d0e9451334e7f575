//! Block storage convergence: create, upsize, attach, detach, delete.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use super::instance::require_instance;
use super::Converge;
use crate::client::{body, decode, get_as, CloudApi};
use crate::error::{ConvergeError, Result};
use crate::paths;
use crate::resolver::resolve_by_name;
use crate::waiter::WaitPolicy;
use ovhform_models::{
    CreateVolumeRequest, Outcome, ResourceRef, Volume, VolumeDesc, VolumeState,
};

pub struct VolumeConvergence {
    api: Arc<dyn CloudApi>,
    wait: WaitPolicy,
}

impl VolumeConvergence {
    pub fn new(api: Arc<dyn CloudApi>, wait: WaitPolicy) -> Self {
        Self { api, wait }
    }

    /// Existing volume, desired `present` or `attach`.
    async fn update_existing(&self, desired: &VolumeDesc, volume: Volume) -> Result<Outcome> {
        let api = self.api.as_ref();
        let project = desired.service_name.as_str();
        let mut resized = false;

        if desired.upsize {
            let size = required_size(desired, "upsize")?;
            // Only a smaller size is rejected; an equal size converges as a no-op.
            if size < volume.size {
                return Err(ConvergeError::InvalidTransition(format!(
                    "Cannot downsize block storage {} from {} GB to {} GB",
                    desired.name, volume.size, size
                )));
            }
            if size > volume.size {
                info!(volume = %desired.name, from = volume.size, to = size, "upsizing block storage");
                api.post(&paths::volume::upsize(project, &volume.id), json!({ "size": size }))
                    .await?;
                resized = true;
            }
        }

        if desired.state == VolumeState::Attach {
            let instance_name = required_instance_name(desired)?;
            let instance = require_instance(api, project, instance_name).await?;

            if volume.attached_to.contains(&instance.id) {
                let message = format!(
                    "Block storage {} already exists and attached to {}",
                    desired.name, instance_name
                );
                return Ok(if resized {
                    Outcome::changed(message)
                } else {
                    Outcome::unchanged(message)
                });
            }

            let result = self.attach(project, &volume.id, &instance).await?;
            return Ok(Outcome::changed(format!(
                "Block storage {} attached to {}",
                desired.name, instance_name
            ))
            .with_attributes(result));
        }

        Ok(if resized {
            Outcome::changed(format!("Size of block storage {} updated", desired.name))
        } else {
            Outcome::unchanged(format!("Block storage {} already exists", desired.name))
        })
    }

    /// Existing volume, desired `absent` or `detach`.
    async fn detach_and_remove(&self, desired: &VolumeDesc, volume: Volume) -> Result<Outcome> {
        let api = self.api.as_ref();
        let project = desired.service_name.as_str();

        for instance_id in &volume.attached_to {
            self.detach(project, &volume.id, instance_id).await?;
        }

        if desired.state == VolumeState::Detach {
            return Ok(if volume.attached_to.is_empty() {
                Outcome::unchanged(format!(
                    "Block storage {} is not attached to an instance",
                    desired.name
                ))
            } else {
                Outcome::changed(format!("Block storage {} detached", desired.name))
            });
        }

        info!(volume = %desired.name, id = %volume.id, "deleting block storage");
        api.delete(&paths::volume::item(project, &volume.id)).await?;
        Ok(Outcome::changed(format!(
            "Block storage {} has been deleted",
            desired.name
        )))
    }

    /// Missing volume, desired `present` or `attach`.
    ///
    /// Not transactional: if the attach step fails, the created volume stays.
    async fn create(&self, desired: &VolumeDesc) -> Result<Outcome> {
        let api = self.api.as_ref();
        let project = desired.service_name.as_str();
        let size = required_size(desired, "create")?;
        let instance_name = match desired.state {
            VolumeState::Attach => Some(required_instance_name(desired)?),
            _ => None,
        };

        let image_id = match &desired.image_name {
            Some(image) => {
                let found = resolve_by_name(
                    api,
                    &paths::volume::images(project),
                    &[("region", desired.region.as_str())],
                    image,
                )
                .await?;
                if found.is_none() {
                    warn!(image = %image, "image not found, creating block storage without it");
                }
                found.map(|r| r.id)
            }
            None => None,
        };

        let snapshot_id = match &desired.snapshot_name {
            Some(snapshot) => {
                let found =
                    resolve_by_name(api, &paths::volume::snapshots(project), &[], snapshot).await?;
                if found.is_none() {
                    warn!(snapshot = %snapshot, "snapshot not found, creating block storage without it");
                }
                found.map(|r| r.id)
            }
            None => None,
        };

        let collection = paths::volume::collection(project);
        let request = CreateVolumeRequest {
            name: desired.name.clone(),
            description: desired.description.clone(),
            size,
            region: desired.region.clone(),
            volume_type: desired.volume_type,
            image_id,
            snapshot_id,
        };
        info!(volume = %desired.name, size, region = %desired.region, "creating block storage");
        let created = api.post(&collection, body(&collection, &request)?).await?;

        let Some(instance_name) = instance_name else {
            return Ok(Outcome::changed(format!("Block storage {} created", desired.name))
                .with_attributes(created));
        };

        let volume: ResourceRef = decode(&collection, created)?;
        let attached = async {
            let instance = require_instance(api, project, instance_name).await?;
            self.attach(project, &volume.id, &instance).await
        }
        .await;

        match attached {
            Ok(result) => Ok(Outcome::changed(format!(
                "Block storage {} created and attached to {}",
                desired.name, instance_name
            ))
            .with_attributes(result)),
            Err(e) => {
                warn!(
                    volume = %desired.name,
                    id = %volume.id,
                    "block storage created but could not be attached: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn attach(
        &self,
        project: &str,
        volume_id: &str,
        instance: &ResourceRef,
    ) -> Result<serde_json::Value> {
        info!(volume_id, instance = %instance.name, "attaching block storage");
        let result = self
            .api
            .post(
                &paths::volume::attach(project, volume_id),
                json!({ "instanceId": instance.id }),
            )
            .await?;
        Ok(result)
    }

    /// Issue a detach and block until the volume stops reporting `detaching`.
    async fn detach(&self, project: &str, volume_id: &str, instance_id: &str) -> Result<()> {
        let api = self.api.as_ref();
        info!(volume_id, instance_id, "detaching block storage");
        let response = api
            .post(
                &paths::volume::detach(project, volume_id),
                json!({ "instanceId": instance_id }),
            )
            .await?;

        let settled = serde_json::from_value::<Volume>(response)
            .map(|volume| !volume.is_detaching())
            .unwrap_or(false);
        if settled {
            return Ok(());
        }

        let item = paths::volume::item(project, volume_id);
        self.wait
            .await_terminal(
                &format!("volume {} to detach from {}", volume_id, instance_id),
                || get_as::<Volume>(api, &item),
                |volume| !volume.is_detaching(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Converge for VolumeConvergence {
    type Desired = VolumeDesc;

    async fn converge(&self, desired: &VolumeDesc) -> Result<Outcome> {
        let api = self.api.as_ref();
        let project = desired.service_name.as_str();
        info!(volume = %desired.name, state = ?desired.state, "converging block storage");
        validate(desired)?;

        let found = resolve_by_name(
            api,
            &paths::volume::collection(project),
            &[("region", desired.region.as_str())],
            &desired.name,
        )
        .await?;

        match (found, desired.state) {
            (Some(found), VolumeState::Present | VolumeState::Attach) => {
                let volume = get_as(api, &paths::volume::item(project, &found.id)).await?;
                self.update_existing(desired, volume).await
            }
            (Some(found), VolumeState::Absent | VolumeState::Detach) => {
                let volume = get_as(api, &paths::volume::item(project, &found.id)).await?;
                self.detach_and_remove(desired, volume).await
            }
            (None, VolumeState::Absent | VolumeState::Detach) => Ok(Outcome::unchanged(format!(
                "Block storage {} does not exist",
                desired.name
            ))),
            (None, VolumeState::Present | VolumeState::Attach) => self.create(desired).await,
        }
    }
}

/// Checks that need no remote state, run before the first call.
fn validate(desired: &VolumeDesc) -> Result<()> {
    if desired.upsize {
        required_size(desired, "upsize")?;
    }
    if desired.state == VolumeState::Attach {
        required_instance_name(desired)?;
    }
    Ok(())
}

fn required_size(desired: &VolumeDesc, action: &str) -> Result<u32> {
    desired.size_gb.ok_or_else(|| {
        ConvergeError::Configuration(format!(
            "size_gb is required to {} block storage {}",
            action, desired.name
        ))
    })
}

fn required_instance_name(desired: &VolumeDesc) -> Result<&str> {
    desired.attached_instance_name.as_deref().ok_or_else(|| {
        ConvergeError::Configuration(format!(
            "attached_instance_name is required to attach block storage {}",
            desired.name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::test_util::FakeCloud;
    use ovhform_models::VolumeType;
    use std::time::Duration;

    const VOLUMES: &str = "/cloud/project/p1/volume";
    const VOLUME: &str = "/cloud/project/p1/volume/v1";
    const INSTANCES: &str = "/cloud/project/p1/instance";

    fn desc(state: VolumeState) -> VolumeDesc {
        VolumeDesc {
            service_name: "p1".to_string(),
            name: "data".to_string(),
            description: None,
            region: "GRA11".to_string(),
            size_gb: Some(10),
            volume_type: VolumeType::Classic,
            image_name: None,
            snapshot_name: None,
            attached_instance_name: None,
            upsize: false,
            state,
        }
    }

    fn volume(size: u32, attached_to: &[&str], status: &str) -> serde_json::Value {
        json!({
            "id": "v1",
            "name": "data",
            "size": size,
            "attachedTo": attached_to,
            "status": status,
            "region": "GRA11",
        })
    }

    fn existing(size: u32, attached_to: &[&str]) -> FakeCloud {
        FakeCloud::new()
            .on_list(VOLUMES, json!([{"id": "v1", "name": "data"}]))
            .on_get(VOLUME, volume(size, attached_to, "in-use"))
    }

    fn engine(cloud: FakeCloud) -> (Arc<FakeCloud>, VolumeConvergence) {
        let cloud = Arc::new(cloud);
        let wait = WaitPolicy::new(Duration::from_secs(1), Duration::from_secs(30));
        (cloud.clone(), VolumeConvergence::new(cloud, wait))
    }

    #[tokio::test]
    async fn test_downsize_is_rejected_without_mutation() {
        let (cloud, volumes) = engine(existing(20, &[]));
        let mut desired = desc(VolumeState::Present);
        desired.upsize = true;
        desired.size_gb = Some(10);

        let err = volumes.converge(&desired).await.unwrap_err();
        assert!(matches!(err, ConvergeError::InvalidTransition(_)));
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_upsize_grows_volume() {
        let (cloud, volumes) = engine(existing(10, &[]));
        let mut desired = desc(VolumeState::Present);
        desired.upsize = true;
        desired.size_gb = Some(50);

        let outcome = volumes.converge(&desired).await.unwrap();
        assert!(outcome.changed);

        let mutations = cloud.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].path, "/cloud/project/p1/volume/v1/upsize");
        assert_eq!(mutations[0].body, Some(json!({"size": 50})));
    }

    #[tokio::test]
    async fn test_upsize_to_current_size_is_unchanged() {
        let (cloud, volumes) = engine(existing(20, &[]));
        let mut desired = desc(VolumeState::Present);
        desired.upsize = true;
        desired.size_gb = Some(20);

        let outcome = volumes.converge(&desired).await.unwrap();
        assert!(!outcome.changed);
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_present_existing_volume_is_unchanged() {
        let (cloud, volumes) = engine(existing(10, &[]));

        let outcome = volumes.converge(&desc(VolumeState::Present)).await.unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.message, "Block storage data already exists");
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_attach_existing_volume() {
        let cloud = existing(10, &[])
            .on_list(INSTANCES, json!([{"id": "i1", "name": "web-1"}]))
            .on_post("/cloud/project/p1/volume/v1/attach", volume(10, &["i1"], "attaching"));
        let (cloud, volumes) = engine(cloud);
        let mut desired = desc(VolumeState::Attach);
        desired.attached_instance_name = Some("web-1".to_string());

        let outcome = volumes.converge(&desired).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.attributes["status"], "attaching");
        assert_eq!(cloud.mutations()[0].body, Some(json!({"instanceId": "i1"})));
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let cloud = existing(10, &["i1"]).on_list(INSTANCES, json!([{"id": "i1", "name": "web-1"}]));
        let (cloud, volumes) = engine(cloud);
        let mut desired = desc(VolumeState::Attach);
        desired.attached_instance_name = Some("web-1".to_string());

        let outcome = volumes.converge(&desired).await.unwrap();
        assert!(!outcome.changed);
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_attach_to_unknown_instance_is_not_found() {
        let cloud = existing(10, &[]).on_list(INSTANCES, json!([{"id": "i9", "name": "other"}]));
        let (cloud, volumes) = engine(cloud);
        let mut desired = desc(VolumeState::Attach);
        desired.attached_instance_name = Some("web-1".to_string());

        let err = volumes.converge(&desired).await.unwrap_err();
        assert!(matches!(err, ConvergeError::NotFound { kind: "Instance", .. }));
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_attach_without_instance_name_is_configuration_error() {
        let (cloud, volumes) = engine(FakeCloud::new().on_list(VOLUMES, json!([])));

        let err = volumes.converge(&desc(VolumeState::Attach)).await.unwrap_err();
        assert!(matches!(err, ConvergeError::Configuration(_)));
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_upsize_with_attach_and_no_instance_name_makes_no_call() {
        let (cloud, volumes) = engine(existing(10, &[]));
        let mut desired = desc(VolumeState::Attach);
        desired.upsize = true;
        desired.size_gb = Some(50);

        let err = volumes.converge(&desired).await.unwrap_err();
        assert!(matches!(err, ConvergeError::Configuration(_)));
        assert!(cloud.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upsize_without_size_makes_no_call() {
        let (cloud, volumes) = engine(existing(10, &[]));
        let mut desired = desc(VolumeState::Present);
        desired.upsize = true;
        desired.size_gb = None;

        let err = volumes.converge(&desired).await.unwrap_err();
        assert!(matches!(err, ConvergeError::Configuration(_)));
        assert!(cloud.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_detaches_every_instance_before_delete() {
        let cloud = existing(10, &["i1", "i2"])
            .on_post("/cloud/project/p1/volume/v1/detach", volume(10, &["i1", "i2"], "detaching"));
        // After the initial details read, polls see detaching then settled, twice.
        let cloud = cloud.on_get_sequence(
            VOLUME,
            vec![
                volume(10, &["i2"], "detaching"),
                volume(10, &["i2"], "in-use"),
                volume(10, &[], "detaching"),
                volume(10, &[], "available"),
            ],
        );
        let (cloud, volumes) = engine(cloud);

        let outcome = volumes.converge(&desc(VolumeState::Absent)).await.unwrap();
        assert!(outcome.changed);

        let mutations: Vec<(String, String)> = cloud
            .mutations()
            .into_iter()
            .map(|call| (call.method.to_string(), call.path))
            .collect();
        assert_eq!(
            mutations,
            vec![
                ("POST".to_string(), "/cloud/project/p1/volume/v1/detach".to_string()),
                ("POST".to_string(), "/cloud/project/p1/volume/v1/detach".to_string()),
                ("DELETE".to_string(), VOLUME.to_string()),
            ]
        );
        let bodies: Vec<_> = cloud.mutations().into_iter().filter_map(|c| c.body).collect();
        assert_eq!(bodies, vec![json!({"instanceId": "i1"}), json!({"instanceId": "i2"})]);

        // Each detach is followed by polling until the status settles, and the
        // delete comes only after the last poll.
        let calls = cloud.calls();
        let delete_at = calls.iter().position(|c| c.method == "DELETE").unwrap();
        let last_poll = calls.iter().rposition(|c| c.method == "GET" && c.path == VOLUME).unwrap();
        assert!(last_poll < delete_at);
        assert_eq!(cloud.count("GET", VOLUME), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_that_never_settles_times_out() {
        let cloud = existing(10, &["i1"])
            .on_post("/cloud/project/p1/volume/v1/detach", volume(10, &["i1"], "detaching"))
            .on_get(VOLUME, volume(10, &["i1"], "detaching"));
        let (cloud, volumes) = engine(cloud);

        let err = volumes.converge(&desc(VolumeState::Absent)).await.unwrap_err();
        assert!(matches!(err, ConvergeError::Timeout { .. }));
        assert!(!cloud.was_called("DELETE", VOLUME));
    }

    #[tokio::test]
    async fn test_detach_unattached_volume_is_unchanged() {
        let (cloud, volumes) = engine(existing(10, &[]));

        let outcome = volumes.converge(&desc(VolumeState::Detach)).await.unwrap();
        assert!(!outcome.changed);
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_detach_stops_before_delete() {
        let cloud = existing(10, &["i1"])
            .on_post("/cloud/project/p1/volume/v1/detach", volume(10, &[], "available"));
        let (cloud, volumes) = engine(cloud);

        let outcome = volumes.converge(&desc(VolumeState::Detach)).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(cloud.mutations().len(), 1);
        assert!(!cloud.was_called("DELETE", VOLUME));
    }

    #[tokio::test]
    async fn test_missing_volume_absent_is_unchanged() {
        let (cloud, volumes) = engine(FakeCloud::new().on_list(VOLUMES, json!([])));

        let outcome = volumes.converge(&desc(VolumeState::Absent)).await.unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.message, "Block storage data does not exist");
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_unresolved_image_proceeds_without_it() {
        let cloud = FakeCloud::new()
            .on_list(VOLUMES, json!([]))
            .on_list("/cloud/project/p1/image", json!([{"id": "img-1", "name": "Debian 12"}]))
            .on_list("/cloud/project/p1/snapshot", json!([{"id": "snap-1", "name": "nightly"}]))
            .on_post(VOLUMES, volume(10, &[], "creating"));
        let (cloud, volumes) = engine(cloud);
        let mut desired = desc(VolumeState::Present);
        desired.image_name = Some("Windows".to_string());
        desired.snapshot_name = Some("nightly".to_string());

        let outcome = volumes.converge(&desired).await.unwrap();
        assert!(outcome.changed);

        let create = &cloud.mutations()[0];
        assert_eq!(create.path, VOLUMES);
        assert_eq!(
            create.body,
            Some(json!({
                "name": "data",
                "size": 10,
                "region": "GRA11",
                "type": "classic",
                "snapshotId": "snap-1",
            }))
        );
    }

    #[tokio::test]
    async fn test_create_without_size_is_configuration_error() {
        let (cloud, volumes) = engine(FakeCloud::new().on_list(VOLUMES, json!([])));
        let mut desired = desc(VolumeState::Present);
        desired.size_gb = None;

        let err = volumes.converge(&desired).await.unwrap_err();
        assert!(matches!(err, ConvergeError::Configuration(_)));
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_attach() {
        let cloud = FakeCloud::new()
            .on_list(VOLUMES, json!([]))
            .on_post(VOLUMES, volume(10, &[], "creating"))
            .on_list(INSTANCES, json!([{"id": "i1", "name": "web-1"}]))
            .on_post("/cloud/project/p1/volume/v1/attach", volume(10, &["i1"], "attaching"));
        let (cloud, volumes) = engine(cloud);
        let mut desired = desc(VolumeState::Attach);
        desired.attached_instance_name = Some("web-1".to_string());

        let outcome = volumes.converge(&desired).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.attributes["attachedTo"], json!(["i1"]));

        let paths: Vec<String> = cloud.mutations().into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec![VOLUMES.to_string(), "/cloud/project/p1/volume/v1/attach".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_attach_after_create_leaves_volume_in_place() {
        let cloud = FakeCloud::new()
            .on_list(VOLUMES, json!([]))
            .on_post(VOLUMES, volume(10, &[], "creating"))
            .on_list(INSTANCES, json!([{"id": "i1", "name": "web-1"}]))
            .fail(
                "POST",
                "/cloud/project/p1/volume/v1/attach",
                RemoteError::new(409, "Volume is not available"),
            );
        let (cloud, volumes) = engine(cloud);
        let mut desired = desc(VolumeState::Attach);
        desired.attached_instance_name = Some("web-1".to_string());

        let err = volumes.converge(&desired).await.unwrap_err();
        assert!(matches!(err, ConvergeError::Remote(RemoteError { status: Some(409), .. })));
        assert!(cloud.was_called("POST", VOLUMES));
        assert!(!cloud.was_called("DELETE", VOLUME));
    }
}
