//! Managed database cluster convergence
//!
//! Two phases: the desired attributes must match an offer of the live
//! availability catalog, then the cluster whose `description` equals the
//! desired name is updated, or created when there is none.
//!
//! Both branches report `changed = false`. The remote side applies cluster
//! changes asynchronously and a successful call does not mean the cluster
//! has converged; callers must not read `changed` as "cluster ready".

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::Converge;
use crate::client::{body, decode, CloudApi};
use crate::error::{ConvergeError, Result};
use crate::offer::OfferMatcher;
use crate::paths;
use crate::resolver::resolve_by_detail;
use ovhform_models::{
    Cluster, ClusterDesc, ClusterOffer, ClusterRef, CreateClusterRequest, NetworkMode,
    NodesPattern, OfferQuery, Outcome, UpdateClusterRequest,
};

pub struct ClusterConvergence {
    api: Arc<dyn CloudApi>,
    matcher: OfferMatcher,
}

impl ClusterConvergence {
    pub fn new(api: Arc<dyn CloudApi>, matcher: OfferMatcher) -> Self {
        Self { api, matcher }
    }

    /// Find the first offer of the catalog matching `query`.
    pub async fn find_offer(&self, project: &str, query: &OfferQuery) -> Result<ClusterOffer> {
        let path = paths::database::availability(project);
        let offers = self.api.list(&path, &[]).await?;
        debug!(offers = offers.len(), "fetched availability catalog");

        let offer = self
            .matcher
            .find(&offers, &query.attributes())
            .ok_or_else(|| ConvergeError::UnmatchedOffer(query.clone()))?;
        decode(&path, offer.clone())
    }
}

fn validate(desired: &ClusterDesc) -> Result<()> {
    match (&desired.network_id, &desired.subnet_id) {
        (Some(_), None) => Err(ConvergeError::Configuration(format!(
            "subnet_id is required with network_id for cluster {}",
            desired.name
        ))),
        (None, Some(_)) => Err(ConvergeError::Configuration(format!(
            "subnet_id given without network_id for cluster {}",
            desired.name
        ))),
        _ => Ok(()),
    }
}

/// The first cluster of the engine whose description is the cluster name.
pub(crate) async fn find_cluster(api: &dyn CloudApi, cluster: &ClusterRef) -> Result<Option<Cluster>> {
    let project = cluster.service_name.as_str();
    let engine = cluster.engine;
    resolve_by_detail(
        api,
        &paths::database::clusters(project, engine),
        &[],
        |id| paths::database::cluster(project, engine, id),
        |candidate: &Cluster| candidate.description == cluster.name,
    )
    .await
}

pub(crate) async fn require_cluster(api: &dyn CloudApi, cluster: &ClusterRef) -> Result<Cluster> {
    find_cluster(api, cluster)
        .await?
        .ok_or_else(|| ConvergeError::not_found("Cluster", &cluster.name))
}

#[async_trait]
impl Converge for ClusterConvergence {
    type Desired = ClusterDesc;

    async fn converge(&self, desired: &ClusterDesc) -> Result<Outcome> {
        validate(desired)?;
        let api = self.api.as_ref();
        let project = desired.service_name.as_str();
        let private = desired.network_mode() == NetworkMode::Private;

        let offer = self.find_offer(project, &OfferQuery::from(desired)).await?;
        let node_number = offer.min_node_number;
        info!(cluster = %desired.name, node_number, "matched availability offer");

        match find_cluster(api, &desired.cluster_ref()).await? {
            Some(cluster) => {
                let path = paths::database::cluster(project, desired.engine, &cluster.id);
                let request = UpdateClusterRequest {
                    description: desired.name.clone(),
                    flavor: desired.flavor.clone(),
                    node_number,
                    plan: desired.plan.clone(),
                    version: desired.version.clone(),
                    subnet_id: desired.subnet_id.clone().filter(|_| private),
                };
                info!(cluster = %desired.name, id = %cluster.id, "updating cluster");
                let result = api.put(&path, body(&path, &request)?).await?;
                Ok(Outcome::unchanged(format!("Cluster {} update requested", desired.name))
                    .with_attributes(result))
            }
            None => {
                let path = paths::database::clusters(project, desired.engine);
                let request = CreateClusterRequest {
                    description: desired.name.clone(),
                    nodes_pattern: NodesPattern {
                        flavor: desired.flavor.clone(),
                        number: node_number,
                        region: desired.region.clone(),
                    },
                    plan: desired.plan.clone(),
                    version: desired.version.clone(),
                    network_id: desired.network_id.clone(),
                    subnet_id: desired.subnet_id.clone(),
                };
                info!(cluster = %desired.name, engine = %desired.engine, "creating cluster");
                let result = api.post(&path, body(&path, &request)?).await?;
                Ok(Outcome::unchanged(format!("Cluster {} creation requested", desired.name))
                    .with_attributes(result))
            }
        }
    }
}
