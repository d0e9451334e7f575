//! Engine builder wiring every convergence component to one cloud client

use std::sync::Arc;

use tracing::info;

use crate::client::CloudApi;
use crate::convergence::{
    ClusterConvergence, ClusterIpRestrictionConvergence, ClusterUserConvergence, Converge,
    DnsRecordConvergence, InstanceConvergence, IpReverseConvergence, MonthlyBillingConvergence,
    VolumeConvergence,
};
use crate::error::{ConvergeError, Result};
use crate::lookup::Lookup;
use crate::offer::OfferMatcher;
use crate::waiter::WaitPolicy;
use ovhform_models::{DesiredResource, Outcome};

/// Builds an [`Engine`]. A cloud client is mandatory.
#[derive(Default)]
pub struct EngineBuilder {
    api: Option<Arc<dyn CloudApi>>,
    wait: WaitPolicy,
    matcher: Option<OfferMatcher>,
}

impl EngineBuilder {
    pub fn client(mut self, api: Arc<dyn CloudApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Override the offer fields ignored during cluster matching.
    pub fn offer_matcher(mut self, matcher: OfferMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let api = self.api.ok_or_else(|| {
            ConvergeError::Configuration("no cloud API client configured".to_string())
        })?;
        let matcher = self.matcher.unwrap_or_default();

        Ok(Engine {
            volumes: VolumeConvergence::new(api.clone(), self.wait),
            clusters: ClusterConvergence::new(api.clone(), matcher),
            cluster_users: ClusterUserConvergence::new(api.clone(), self.wait),
            ip_restrictions: ClusterIpRestrictionConvergence::new(api.clone()),
            dns_records: DnsRecordConvergence::new(api.clone()),
            ip_reverses: IpReverseConvergence::new(api.clone()),
            instances: InstanceConvergence::new(api.clone()),
            monthly_billing: MonthlyBillingConvergence::new(api.clone()),
            lookup: Lookup::new(api),
        })
    }
}

/// Converges desired-state records against the cloud API.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ovhform_convergence::{CloudApi, Engine};
/// use ovhform_models::DesiredResource;
///
/// # async fn example(api: Arc<dyn CloudApi>, desired: DesiredResource) -> ovhform_convergence::Result<()> {
/// let engine = Engine::builder().client(api).build()?;
/// let outcome = engine.apply(&desired).await?;
/// println!("changed: {}", outcome.changed);
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    volumes: VolumeConvergence,
    clusters: ClusterConvergence,
    cluster_users: ClusterUserConvergence,
    ip_restrictions: ClusterIpRestrictionConvergence,
    dns_records: DnsRecordConvergence,
    ip_reverses: IpReverseConvergence,
    instances: InstanceConvergence,
    monthly_billing: MonthlyBillingConvergence,
    lookup: Lookup,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Converge one desired-state record.
    pub async fn apply(&self, desired: &DesiredResource) -> Result<Outcome> {
        info!(kind = desired.kind(), name = %desired.display_name(), "applying");
        let outcome = match desired {
            DesiredResource::Volume(d) => self.volumes.converge(d).await,
            DesiredResource::Cluster(d) => self.clusters.converge(d).await,
            DesiredResource::ClusterUser(d) => self.cluster_users.converge(d).await,
            DesiredResource::ClusterIpRestriction(d) => self.ip_restrictions.converge(d).await,
            DesiredResource::DnsRecord(d) => self.dns_records.converge(d).await,
            DesiredResource::IpReverse(d) => self.ip_reverses.converge(d).await,
            DesiredResource::Instance(d) => self.instances.converge(d).await,
            DesiredResource::MonthlyBilling(d) => self.monthly_billing.converge(d).await,
        }?;
        info!(
            kind = desired.kind(),
            changed = outcome.changed,
            "{}",
            outcome.message
        );
        Ok(outcome)
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::FakeCloud;
    use ovhform_models::{DnsRecordDesc, DnsRecordType, Presence};
    use serde_json::json;

    #[test]
    fn test_build_without_client_is_configuration_error() {
        let err = Engine::builder().build().err().unwrap();
        assert!(matches!(err, ConvergeError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_apply_dispatches_by_kind() {
        let cloud = Arc::new(
            FakeCloud::new()
                .on_list("/domain/zone", json!(["example.com"]))
                .on_list("/domain/zone/example.com/record", json!([])),
        );
        let engine = Engine::builder().client(cloud.clone()).build().unwrap();

        let desired = DesiredResource::DnsRecord(DnsRecordDesc {
            domain: "example.com".to_string(),
            sub_name: "www".to_string(),
            record_type: DnsRecordType::A,
            target: "192.0.2.1".to_string(),
            ttl: None,
            state: Presence::Absent,
        });
        let outcome = engine.apply(&desired).await.unwrap();

        assert!(!outcome.changed);
        assert!(cloud.mutations().is_empty());
    }
}
