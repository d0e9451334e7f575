use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use ovhform_models::DesiredResource;

/// A desired-state document: resources are converged in the order listed.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<DesiredResource>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}
