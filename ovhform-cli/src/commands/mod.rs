pub mod apply;
pub mod config;
pub mod info;

use std::sync::Arc;

use anyhow::Result;
use ovhform_convergence::{Engine, WaitPolicy};

use crate::config::Config;
use crate::http::OvhClient;

/// Build the engine; fails when the API credentials are incomplete.
pub fn build_engine(config: &Config) -> Result<Engine> {
    let mut builder = Engine::builder().wait_policy(WaitPolicy::new(config.poll_interval, config.wait_timeout));

    match config.credentials() {
        Some(credentials) => {
            let client = OvhClient::new(&config.base_url, credentials, config.http_timeout)?;
            builder = builder.client(Arc::new(client));
        }
        None => {
            tracing::warn!(
                "OVH_APPLICATION_KEY, OVH_APPLICATION_SECRET and OVH_CONSUMER_KEY must all be set"
            );
        }
    }

    Ok(builder.build()?)
}
