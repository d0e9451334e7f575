use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_ENDPOINT: &str = "ovh-eu";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Known API endpoint aliases.
const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

#[derive(Clone)]
pub struct Credentials {
    pub application_key: String,
    pub application_secret: String,
    pub consumer_key: String,
}

#[derive(Clone)]
pub struct Config {
    /// As given, alias or URL
    pub endpoint: String,
    /// Resolved API base URL
    pub base_url: String,
    pub application_key: Option<String>,
    pub application_secret: Option<String>,
    pub consumer_key: Option<String>,
    pub poll_interval: Duration,
    pub wait_timeout: Duration,
    pub http_timeout: Duration,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let endpoint = std::env::var("OVH_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let base_url = resolve_endpoint(&endpoint)?;

        Ok(Self {
            endpoint,
            base_url,
            application_key: non_empty_var("OVH_APPLICATION_KEY"),
            application_secret: non_empty_var("OVH_APPLICATION_SECRET"),
            consumer_key: non_empty_var("OVH_CONSUMER_KEY"),
            poll_interval: secs_var("OVHFORM_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            wait_timeout: secs_var("OVHFORM_WAIT_TIMEOUT_SECS", DEFAULT_WAIT_TIMEOUT_SECS)?,
            http_timeout: secs_var("OVHFORM_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            log_file: non_empty_var("OVHFORM_LOG_FILE").map(PathBuf::from),
        })
    }

    /// All three credentials, or `None` when any is missing.
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            application_key: self.application_key.clone()?,
            application_secret: self.application_secret.clone()?,
            consumer_key: self.consumer_key.clone()?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn secs_var(name: &str, default: u64) -> Result<Duration> {
    match non_empty_var(name) {
        Some(value) => parse_secs(&value).with_context(|| format!("{} must be a number of seconds", name)),
        None => Ok(Duration::from_secs(default)),
    }
}

fn parse_secs(value: &str) -> Result<Duration> {
    let secs: u64 = value.trim().parse()?;
    if secs == 0 {
        bail!("must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

/// Map an endpoint alias to its base URL; full URLs pass through.
pub fn resolve_endpoint(endpoint: &str) -> Result<String> {
    if let Some((_, url)) = ENDPOINTS.iter().find(|(alias, _)| *alias == endpoint) {
        return Ok(url.to_string());
    }
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        return Ok(endpoint.trim_end_matches('/').to_string());
    }
    bail!(
        "unknown OVH_ENDPOINT '{}' (expected one of {} or a URL)",
        endpoint,
        ENDPOINTS
            .iter()
            .map(|(alias, _)| *alias)
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_aliases() {
        assert_eq!(resolve_endpoint("ovh-eu").unwrap(), "https://eu.api.ovh.com/1.0");
        assert_eq!(resolve_endpoint("soyoustart-ca").unwrap(), "https://ca.api.soyoustart.com/1.0");
        assert_eq!(
            resolve_endpoint("https://api.example.test/1.0/").unwrap(),
            "https://api.example.test/1.0"
        );
        assert!(resolve_endpoint("ovh-mars").is_err());
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs(" 5 ").unwrap(), Duration::from_secs(5));
        assert!(parse_secs("0").is_err());
        assert!(parse_secs("soon").is_err());
    }

    #[test]
    fn test_credentials_require_all_three_keys() {
        let mut config = Config {
            endpoint: "ovh-eu".to_string(),
            base_url: "https://eu.api.ovh.com/1.0".to_string(),
            application_key: Some("ak".to_string()),
            application_secret: Some("as".to_string()),
            consumer_key: None,
            poll_interval: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(600),
            http_timeout: Duration::from_secs(30),
            log_file: None,
        };
        assert!(config.credentials().is_none());

        config.consumer_key = Some("ck".to_string());
        assert_eq!(config.credentials().unwrap().consumer_key, "ck");
    }
}
