//! Signed OVH REST client implementing [`CloudApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::Value;
use sha1::{Digest, Sha1};
use tokio::sync::OnceCell;
use tracing::debug;

use ovhform_convergence::{CloudApi, RemoteError};

use crate::config::Credentials;

type ApiResult<T> = std::result::Result<T, RemoteError>;

pub struct OvhClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    /// Server clock minus local clock, read once from `/auth/time`
    time_delta: OnceCell<i64>,
}

impl OvhClient {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ovhform/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            time_delta: OnceCell::new(),
        })
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Url> {
        let raw = format!("{}{}", self.base_url, path);
        let parsed = if query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, query)
        };
        parsed.map_err(|e| RemoteError::transport(format!("invalid URL {}: {}", raw, e)))
    }

    async fn time_delta(&self) -> ApiResult<i64> {
        self.time_delta
            .get_or_try_init(|| async {
                let url = self.url("/auth/time", &[])?;
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| RemoteError::transport(e.to_string()))?;
                let server_time = match read_response(response).await? {
                    Value::Number(n) => n.as_i64(),
                    _ => None,
                }
                .ok_or_else(|| RemoteError::transport("unexpected /auth/time response"))?;
                let delta = server_time - chrono::Utc::now().timestamp();
                debug!(delta, "computed API clock delta");
                Ok::<i64, RemoteError>(delta)
            })
            .await
            .copied()
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let url = self.url(path, query)?;
        let payload = match body {
            Some(Value::Null) | None => String::new(),
            Some(value) => value.to_string(),
        };
        let timestamp = (chrono::Utc::now().timestamp() + self.time_delta().await?).to_string();
        let signature = sign(
            &self.credentials.application_secret,
            &self.credentials.consumer_key,
            method.as_str(),
            url.as_str(),
            &payload,
            &timestamp,
        );

        debug!(method = %method, url = %url, "calling OVH API");
        let mut request = self
            .http
            .request(method, url)
            .header("X-Ovh-Application", &self.credentials.application_key)
            .header("X-Ovh-Consumer", &self.credentials.consumer_key)
            .header("X-Ovh-Timestamp", &timestamp)
            .header("X-Ovh-Signature", signature);
        if !payload.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        read_response(response).await
    }
}

/// `$1$` followed by the hex SHA-1 of the `+`-joined request parts.
pub fn sign(secret: &str, consumer: &str, method: &str, url: &str, body: &str, timestamp: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update([secret, consumer, method, url, body, timestamp].join("+").as_bytes());
    format!("$1${:x}", hasher.finalize())
}

async fn read_response(response: reqwest::Response) -> ApiResult<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| RemoteError::transport(e.to_string()))?;

    if !status.is_success() {
        return Err(RemoteError::new(status.as_u16(), error_message(&text)));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text)
        .map_err(|e| RemoteError::new(status.as_u16(), format!("invalid JSON in response: {}", e)))
}

/// The `message` field of an error body, or the body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl CloudApi for OvhClient {
    async fn list(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Vec<Value>> {
        match self.call(Method::GET, path, query, None).await? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(RemoteError::transport(format!(
                "expected a list from {}, got {}",
                path, other
            ))),
        }
    }

    async fn get(&self, path: &str) -> ApiResult<Value> {
        self.call(Method::GET, path, &[], None).await
    }

    async fn post(&self, path: &str, body: Value) -> ApiResult<Value> {
        self.call(Method::POST, path, &[], Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> ApiResult<Value> {
        self.call(Method::PUT, path, &[], Some(body)).await
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        self.call(Method::DELETE, path, &[], None).await.map(|_| ())
    }
}
