//! Managed database clusters and their users

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status a database user reports once provisioning is over.
pub const USER_READY: &str = "READY";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClusterEngine {
    Kafka,
    Mongodb,
    Mysql,
    Opensearch,
    Postgresql,
    Redis,
}

impl ClusterEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kafka => "kafka",
            Self::Mongodb => "mongodb",
            Self::Mysql => "mysql",
            Self::Opensearch => "opensearch",
            Self::Postgresql => "postgresql",
            Self::Redis => "redis",
        }
    }
}

impl fmt::Display for ClusterEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kafka" => Ok(Self::Kafka),
            "mongodb" => Ok(Self::Mongodb),
            "mysql" => Ok(Self::Mysql),
            "opensearch" => Ok(Self::Opensearch),
            "postgresql" => Ok(Self::Postgresql),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown database engine: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    Public,
    Private,
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

// ============================================================================
// Cluster
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterDesc {
    pub service_name: String,
    /// Stored remotely in the cluster's `description`, the only correlation key
    pub name: String,
    #[serde(alias = "type")]
    pub engine: ClusterEngine,
    pub version: String,
    pub flavor: String,
    pub region: String,
    pub plan: String,
    /// Private network; requires `subnet_id`
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
}

impl ClusterDesc {
    pub fn network_mode(&self) -> NetworkMode {
        if self.network_id.is_some() {
            NetworkMode::Private
        } else {
            NetworkMode::Public
        }
    }

    pub fn cluster_ref(&self) -> ClusterRef {
        ClusterRef {
            service_name: self.service_name.clone(),
            engine: self.engine,
            name: self.name.clone(),
        }
    }
}

/// Points at an existing cluster by project, engine and description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterRef {
    pub service_name: String,
    #[serde(alias = "type")]
    pub engine: ClusterEngine,
    /// Cluster description
    pub name: String,
}

/// One provisionable combination from the availability catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOffer {
    pub engine: String,
    pub version: String,
    pub plan: String,
    pub region: String,
    pub flavor: String,
    pub network: String,
    #[serde(default = "one")]
    pub min_node_number: u32,
    #[serde(default)]
    pub max_node_number: Option<u32>,
    #[serde(default)]
    pub min_disk_size: Option<u32>,
    #[serde(default)]
    pub max_disk_size: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_of_life: Option<String>,
    #[serde(default)]
    pub upstream_end_of_life: Option<String>,
    #[serde(default)]
    pub backup: Option<Value>,
}

fn one() -> u32 {
    1
}

/// The offer attributes a desired cluster is matched on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfferQuery {
    pub engine: String,
    pub version: String,
    pub plan: String,
    pub region: String,
    pub flavor: String,
    pub network: String,
}

impl From<&ClusterDesc> for OfferQuery {
    fn from(desc: &ClusterDesc) -> Self {
        Self {
            engine: desc.engine.as_str().to_string(),
            version: desc.version.clone(),
            plan: desc.plan.clone(),
            region: desc.region.clone(),
            flavor: desc.flavor.clone(),
            network: desc.network_mode().as_str().to_string(),
        }
    }
}

impl OfferQuery {
    /// The query as an offer-shaped attribute record.
    pub fn attributes(&self) -> Map<String, Value> {
        [
            ("engine", &self.engine),
            ("version", &self.version),
            ("plan", &self.plan),
            ("region", &self.region),
            ("flavor", &self.flavor),
            ("network", &self.network),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
        .collect()
    }
}

impl fmt::Display for OfferQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "engine: {}, version: {}, plan: {}, region: {}, flavor: {}, network: {}",
            self.engine, self.version, self.plan, self.region, self.flavor, self.network
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodesPattern {
    pub flavor: String,
    pub number: u32,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    pub description: String,
    pub nodes_pattern: NodesPattern,
    pub plan: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterRequest {
    pub description: String,
    pub flavor: String,
    pub node_number: u32,
    pub plan: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

// ============================================================================
// Cluster users
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    #[default]
    Present,
    Absent,
    Reset,
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterUserDesc {
    #[serde(flatten)]
    pub cluster: ClusterRef,
    pub username: String,
    /// Only needed when the user has to be created
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub state: UserState,
}

impl fmt::Debug for ClusterUserDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterUserDesc")
            .field("cluster", &self.cluster)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("roles", &self.roles)
            .field("state", &self.state)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUser {
    pub id: String,
    /// Possibly decorated (`name@suffix`)
    pub username: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateUserRequest {
    pub name: String,
    pub password: String,
    pub roles: BTreeSet<String>,
}

impl fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("name", &self.name)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateUserRequest {
    pub roles: BTreeSet<String>,
}

// ============================================================================
// IP restrictions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpBlock {
    /// CIDR block, e.g. `203.0.113.0/24`
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterIpRestrictionDesc {
    #[serde(flatten)]
    pub cluster: ClusterRef,
    pub ip_blocks: Vec<IpBlock>,
}
