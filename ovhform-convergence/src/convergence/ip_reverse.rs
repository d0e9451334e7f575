//! Reverse DNS of an IP address

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ipnet::IpNet;
use tracing::info;

use super::Converge;
use crate::client::{body, decode, CloudApi};
use crate::error::{ConvergeError, Result};
use crate::paths;
use ovhform_models::{IpReverse, IpReverseDesc, Outcome, SetReverseRequest};

pub struct IpReverseConvergence {
    api: Arc<dyn CloudApi>,
}

impl IpReverseConvergence {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self { api }
    }

    /// Current reverse, empty when none is set.
    async fn current_reverse(&self, block: &str, ip: &str) -> Result<String> {
        let path = paths::ip::reverse(block, ip);
        match self.api.get(&path).await {
            Ok(value) => Ok(decode::<IpReverse>(&path, value)?.reverse),
            Err(e) if e.is_not_found() => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The URL-encoded block path segment the IP is managed under.
fn block_segment(desired: &IpReverseDesc) -> Result<String> {
    let Some(block) = &desired.ip_block else {
        return Ok(desired.ip.clone());
    };

    let ip: IpAddr = desired.ip.parse().map_err(|_| {
        ConvergeError::Configuration(format!("{} is not an IP address", desired.ip))
    })?;
    let network: IpNet = block.parse().map_err(|_| {
        ConvergeError::Configuration(format!("{} is not an IP block", block))
    })?;
    if !network.contains(&ip) {
        return Err(ConvergeError::InvalidTransition(format!(
            "IP {} not in IP block {}",
            desired.ip, block
        )));
    }
    Ok(block.replace('/', "%2F"))
}

#[async_trait]
impl Converge for IpReverseConvergence {
    type Desired = IpReverseDesc;

    async fn converge(&self, desired: &IpReverseDesc) -> Result<Outcome> {
        let block = block_segment(desired)?;

        if self.current_reverse(&block, &desired.ip).await? == desired.reverse {
            return Ok(Outcome::unchanged(format!(
                "Reverse {} to {} already set",
                desired.ip, desired.reverse
            )));
        }

        let path = paths::ip::reverses(&block);
        let request = SetReverseRequest {
            ip_reverse: desired.ip.clone(),
            reverse: desired.reverse.clone(),
        };
        info!(ip = %desired.ip, reverse = %desired.reverse, "setting reverse");
        let result = self.api.post(&path, body(&path, &request)?).await?;
        Ok(Outcome::changed(format!(
            "Reverse {} to {} successfully set",
            desired.ip, desired.reverse
        ))
        .with_attributes(result))
    }
}
