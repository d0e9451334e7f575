//! Compute instances and monthly billing

use serde::{Deserialize, Serialize};

use crate::Presence;

/// Billing status reported once monthly billing is active.
pub const MONTHLY_BILLING_OK: &str = "ok";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceNetwork {
    #[serde(alias = "network_id")]
    pub network_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceDesc {
    pub service_name: String,
    pub name: String,
    pub region: String,
    pub flavor_name: String,
    pub image_name: String,
    #[serde(default)]
    pub ssh_key_name: Option<String>,
    #[serde(default)]
    pub networks: Vec<InstanceNetwork>,
    #[serde(default)]
    pub monthly_billing: bool,
    #[serde(default)]
    pub state: Presence,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub flavor_id: String,
    pub image_id: String,
    pub monthly_billing: bool,
    pub name: String,
    pub region: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<InstanceNetwork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBilling {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub since: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub monthly_billing: Option<MonthlyBilling>,
}

impl Instance {
    pub fn monthly_billing_active(&self) -> bool {
        self.monthly_billing
            .as_ref()
            .is_some_and(|billing| billing.status == MONTHLY_BILLING_OK)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyBillingDesc {
    pub service_name: String,
    /// Instance name
    pub name: String,
}
