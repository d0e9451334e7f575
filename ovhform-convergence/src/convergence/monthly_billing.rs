//! Switching an instance to monthly billing

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::instance::require_instance;
use super::Converge;
use crate::client::{get_as, CloudApi};
use crate::error::Result;
use crate::paths;
use ovhform_models::{Instance, MonthlyBillingDesc, Outcome};

pub struct MonthlyBillingConvergence {
    api: Arc<dyn CloudApi>,
}

impl MonthlyBillingConvergence {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Converge for MonthlyBillingConvergence {
    type Desired = MonthlyBillingDesc;

    async fn converge(&self, desired: &MonthlyBillingDesc) -> Result<Outcome> {
        let api = self.api.as_ref();
        let project = desired.service_name.as_str();

        let found = require_instance(api, project, &desired.name).await?;
        let instance: Instance = get_as(api, &paths::instance::item(project, &found.id)).await?;
        if instance.monthly_billing_active() {
            return Ok(Outcome::unchanged(format!(
                "Monthly billing already enabled for {}",
                desired.name
            )));
        }

        info!(instance = %desired.name, "enabling monthly billing");
        let result = api
            .post(&paths::instance::monthly_billing(project, &found.id), Value::Null)
            .await?;
        Ok(
            Outcome::changed(format!("Monthly billing enabled for {}", desired.name))
                .with_attributes(result),
        )
    }
}
