//! IP allow-list of a database cluster. Blocks are only ever added.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::cluster::require_cluster;
use super::Converge;
use crate::client::{body, list_as, CloudApi};
use crate::error::Result;
use crate::paths;
use ovhform_models::{ClusterIpRestrictionDesc, Outcome};

pub struct ClusterIpRestrictionConvergence {
    api: Arc<dyn CloudApi>,
}

impl ClusterIpRestrictionConvergence {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Converge for ClusterIpRestrictionConvergence {
    type Desired = ClusterIpRestrictionDesc;

    async fn converge(&self, desired: &ClusterIpRestrictionDesc) -> Result<Outcome> {
        let api = self.api.as_ref();
        let cluster = require_cluster(api, &desired.cluster).await?;
        let path = paths::database::ip_restrictions(
            &desired.cluster.service_name,
            desired.cluster.engine,
            &cluster.id,
        );

        let mut allowed: Vec<String> = list_as(api, &path, &[]).await?;
        let mut added = Vec::new();
        for block in &desired.ip_blocks {
            if allowed.contains(&block.ip) {
                continue;
            }
            info!(cluster = %desired.cluster.name, ip = %block.ip, "adding ip restriction");
            api.post(&path, body(&path, block)?).await?;
            allowed.push(block.ip.clone());
            added.push(block.ip.as_str());
        }

        Ok(if added.is_empty() {
            Outcome::unchanged(format!(
                "Cluster {} already allows every ip block",
                desired.cluster.name
            ))
        } else {
            Outcome::changed(format!(
                "{} added to cluster {}",
                added.join(","),
                desired.cluster.name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::FakeCloud;
    use ovhform_models::{ClusterEngine, ClusterRef, IpBlock};
    use serde_json::json;

    const RESTRICTIONS: &str = "/cloud/project/p1/database/mysql/c1/ipRestriction";

    fn desc(ips: &[&str]) -> ClusterIpRestrictionDesc {
        ClusterIpRestrictionDesc {
            cluster: ClusterRef {
                service_name: "p1".to_string(),
                engine: ClusterEngine::Mysql,
                name: "orders".to_string(),
            },
            ip_blocks: ips
                .iter()
                .map(|ip| IpBlock {
                    ip: ip.to_string(),
                    description: Some("office".to_string()),
                })
                .collect(),
        }
    }

    fn cloud(current: &[&str]) -> Arc<FakeCloud> {
        Arc::new(
            FakeCloud::new()
                .on_list("/cloud/project/p1/database/mysql", json!(["c1"]))
                .on_get(
                    "/cloud/project/p1/database/mysql/c1",
                    json!({"id": "c1", "description": "orders"}),
                )
                .on_list(RESTRICTIONS, json!(current)),
        )
    }

    #[tokio::test]
    async fn test_only_missing_blocks_are_added() {
        let cloud = cloud(&["192.0.2.0/24"]);
        let outcome = ClusterIpRestrictionConvergence::new(cloud.clone())
            .converge(&desc(&["192.0.2.0/24", "198.51.100.0/24", "198.51.100.0/24"]))
            .await
            .unwrap();

        assert!(outcome.changed);
        let mutations = cloud.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(
            mutations[0].body,
            Some(json!({"ip": "198.51.100.0/24", "description": "office"}))
        );
    }

    #[tokio::test]
    async fn test_second_run_is_unchanged() {
        let cloud = cloud(&["192.0.2.0/24", "198.51.100.0/24"]);
        let outcome = ClusterIpRestrictionConvergence::new(cloud.clone())
            .converge(&desc(&["198.51.100.0/24"]))
            .await
            .unwrap();

        assert!(!outcome.changed);
        assert!(cloud.mutations().is_empty());
    }
}
