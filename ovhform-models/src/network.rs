//! IP reverse DNS

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpReverseDesc {
    pub ip: String,
    /// Reverse name the IP should resolve to
    #[serde(alias = "domain_name")]
    pub reverse: String,
    /// Enclosing block, only needed for vRack IPs
    #[serde(default)]
    pub ip_block: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpReverse {
    #[serde(default)]
    pub ip_reverse: Option<String>,
    #[serde(default)]
    pub reverse: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetReverseRequest {
    pub ip_reverse: String,
    pub reverse: String,
}
