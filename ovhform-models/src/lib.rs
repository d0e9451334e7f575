//! Value records exchanged with the convergence engine.
//!
//! Two families of types live here:
//! - desired-state descriptions (`*Desc`), deserialized from manifests and
//!   validated by the engine before any remote call;
//! - remote record shapes, decoded from the cloud API's JSON bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod cluster;
pub mod dns;
pub mod instance;
pub mod network;
pub mod volume;

pub use cluster::*;
pub use dns::*;
pub use instance::*;
pub use network::*;
pub use volume::*;

/// A remote resource known by its human-assigned name and its opaque id.
///
/// Names are unique by convention only; lookups take the first match in
/// listing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

/// Two-valued desired state shared by resources that are either there or not.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Present,
    Absent,
}

/// Normalized result of one convergence run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    /// Whether a mutating call was issued and succeeded
    pub changed: bool,
    /// Human-readable summary
    pub message: String,
    /// Resulting remote attributes, when the API returned any
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub attributes: Value,
}

impl Outcome {
    pub fn changed(message: impl Into<String>) -> Self {
        Self {
            changed: true,
            message: message.into(),
            attributes: Value::Null,
        }
    }

    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            changed: false,
            message: message.into(),
            attributes: Value::Null,
        }
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }
}

/// One entry of a desired-state manifest, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DesiredResource {
    Volume(VolumeDesc),
    Cluster(ClusterDesc),
    ClusterUser(ClusterUserDesc),
    ClusterIpRestriction(ClusterIpRestrictionDesc),
    DnsRecord(DnsRecordDesc),
    IpReverse(IpReverseDesc),
    Instance(InstanceDesc),
    MonthlyBilling(MonthlyBillingDesc),
}

impl DesiredResource {
    /// Manifest kind, as written in the `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Volume(_) => "volume",
            Self::Cluster(_) => "cluster",
            Self::ClusterUser(_) => "cluster_user",
            Self::ClusterIpRestriction(_) => "cluster_ip_restriction",
            Self::DnsRecord(_) => "dns_record",
            Self::IpReverse(_) => "ip_reverse",
            Self::Instance(_) => "instance",
            Self::MonthlyBilling(_) => "monthly_billing",
        }
    }

    /// The human-assigned name the resource is correlated by.
    pub fn display_name(&self) -> String {
        match self {
            Self::Volume(d) => d.name.clone(),
            Self::Cluster(d) => d.name.clone(),
            Self::ClusterUser(d) => format!("{}@{}", d.username, d.cluster.name),
            Self::ClusterIpRestriction(d) => d.cluster.name.clone(),
            Self::DnsRecord(d) => format!("{}.{}", d.sub_name, d.domain),
            Self::IpReverse(d) => d.ip.clone(),
            Self::Instance(d) => d.name.clone(),
            Self::MonthlyBilling(d) => d.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_omits_null_attributes() {
        let json = serde_json::to_value(Outcome::unchanged("nothing to do")).unwrap();
        assert_eq!(json, serde_json::json!({"changed": false, "message": "nothing to do"}));
    }

    #[test]
    fn test_manifest_entries_are_tagged_by_kind() {
        let yaml = r#"
- kind: volume
  service_name: abc123
  name: data
  region: GRA11
  size_gb: 20
  state: attach
  instance_name: web-1
- kind: dns_record
  domain: example.com
  sub_name: www
  target: 192.0.2.10
- kind: cluster_user
  service_name: abc123
  engine: postgresql
  name: orders
  username: app
  roles: [replication]
"#;
        let resources: Vec<DesiredResource> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(resources.len(), 3);

        let DesiredResource::Volume(volume) = &resources[0] else {
            panic!("expected a volume");
        };
        assert_eq!(volume.state, VolumeState::Attach);
        assert_eq!(volume.volume_type, VolumeType::Classic);
        assert_eq!(volume.attached_instance_name.as_deref(), Some("web-1"));

        let DesiredResource::DnsRecord(record) = &resources[1] else {
            panic!("expected a dns record");
        };
        assert_eq!(record.record_type, DnsRecordType::A);
        assert_eq!(record.state, Presence::Present);

        assert_eq!(resources[2].kind(), "cluster_user");
        assert_eq!(resources[2].display_name(), "app@orders");
    }
}
