//! DNS zone record convergence
//!
//! Records are never modified in place. `present` adds a record unless one
//! with the same sub-domain and target already exists, so several records
//! of the same type may accumulate for one sub-domain. `absent` removes
//! every record of the type for the sub-domain, whatever its target.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::Converge;
use crate::client::{body, list_as, CloudApi};
use crate::error::{ConvergeError, Result};
use crate::paths;
use crate::resolver::fetch_all;
use ovhform_models::{CreateRecordRequest, DnsRecord, DnsRecordDesc, Outcome, Presence};

pub struct DnsRecordConvergence {
    api: Arc<dyn CloudApi>,
}

impl DnsRecordConvergence {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self { api }
    }

    async fn ensure_known_domain(&self, domain: &str) -> Result<()> {
        let zones: Vec<String> = list_as(self.api.as_ref(), paths::domain::ZONES, &[]).await?;
        if zones.iter().any(|zone| zone == domain) {
            Ok(())
        } else {
            Err(ConvergeError::UnknownDomain(domain.to_string()))
        }
    }

    /// Records of the desired type for the desired sub-domain.
    async fn matching_records(&self, desired: &DnsRecordDesc) -> Result<Vec<DnsRecord>> {
        let zone = desired.domain.as_str();
        let records: Vec<DnsRecord> = fetch_all(
            self.api.as_ref(),
            &paths::domain::records(zone),
            &[
                ("fieldType", desired.record_type.as_str()),
                ("subDomain", desired.sub_name.as_str()),
            ],
            |id| paths::domain::record(zone, id),
        )
        .await?;

        let records: Vec<DnsRecord> = records
            .into_iter()
            .filter(|record| {
                record.field_type == desired.record_type.as_str()
                    && record.sub_domain == desired.sub_name
            })
            .collect();
        debug!(domain = zone, sub_domain = %desired.sub_name, count = records.len(), "existing records");
        Ok(records)
    }

    async fn refresh(&self, zone: &str) -> Result<()> {
        debug!(zone, "refreshing zone");
        self.api.post(&paths::domain::refresh(zone), Value::Null).await?;
        Ok(())
    }
}

#[async_trait]
impl Converge for DnsRecordConvergence {
    type Desired = DnsRecordDesc;

    async fn converge(&self, desired: &DnsRecordDesc) -> Result<Outcome> {
        let zone = desired.domain.as_str();
        self.ensure_known_domain(zone).await?;
        let existing = self.matching_records(desired).await?;

        match desired.state {
            Presence::Present => {
                if existing.iter().any(|record| record.target == desired.target) {
                    return Ok(Outcome::unchanged(format!(
                        "{} is already registered on domain {}",
                        desired.sub_name, zone
                    )));
                }

                let path = paths::domain::records(zone);
                let request = CreateRecordRequest {
                    field_type: desired.record_type,
                    sub_domain: desired.sub_name.clone(),
                    target: desired.target.clone(),
                    ttl: desired.ttl,
                };
                info!(domain = zone, sub_domain = %desired.sub_name, target = %desired.target, "creating record");
                let created = self.api.post(&path, body(&path, &request)?).await?;
                self.refresh(zone).await?;

                Ok(Outcome::changed(format!(
                    "{} IN {} {} added to domain {}",
                    desired.sub_name, desired.record_type, desired.target, zone
                ))
                .with_attributes(created))
            }
            Presence::Absent => {
                if existing.is_empty() {
                    return Ok(Outcome::unchanged(format!(
                        "Target {} doesn't exist on domain {}",
                        desired.sub_name, zone
                    )));
                }

                let mut deleted = Vec::with_capacity(existing.len());
                for record in &existing {
                    info!(domain = zone, record = %record, "deleting record");
                    self.api
                        .delete(&paths::domain::record(zone, &record.id.to_string()))
                        .await?;
                    deleted.push(record.to_string());
                }
                self.refresh(zone).await?;

                Ok(Outcome::changed(format!(
                    "{} successfully deleted from domain {}",
                    deleted.join(","),
                    zone
                )))
            }
        }
    }
}
