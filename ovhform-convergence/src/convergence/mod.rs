//! Convergence components, one per resource kind.
//!
//! Each component resolves the current remote state by name, walks a
//! decision table to at most one mutating action, and reports an
//! [`Outcome`]. Components hold no state between runs.

pub mod cluster;
pub mod cluster_user;
pub mod dns_record;
pub mod instance;
pub mod ip_restriction;
pub mod ip_reverse;
pub mod monthly_billing;
pub mod volume;

use async_trait::async_trait;
use ovhform_models::Outcome;

use crate::error::Result;

pub use cluster::ClusterConvergence;
pub use cluster_user::ClusterUserConvergence;
pub use dns_record::DnsRecordConvergence;
pub use instance::InstanceConvergence;
pub use ip_restriction::ClusterIpRestrictionConvergence;
pub use ip_reverse::IpReverseConvergence;
pub use monthly_billing::MonthlyBillingConvergence;
pub use volume::VolumeConvergence;

/// Drives one kind of remote resource towards a declared state.
#[async_trait]
pub trait Converge: Send + Sync {
    /// The desired-state description this component accepts.
    type Desired: Send + Sync;

    /// Compare desired vs actual state and issue the calls needed to converge.
    async fn converge(&self, desired: &Self::Desired) -> Result<Outcome>;
}
