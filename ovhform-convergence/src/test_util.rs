//! Scripted in-memory cloud for tests.
//!
//! Responses are registered per `(method, path)`. When several responses
//! are registered for one key they are served in order and the last one
//! repeats, which is how polled status transitions are scripted. Reads with
//! no script fail with a 404 [`RemoteError`]; writes with no script succeed
//! with a `null` body. Every call is recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::CloudApi;
use crate::error::RemoteError;

type Response = Result<Value, RemoteError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
pub struct FakeCloud {
    scripts: Mutex<HashMap<(&'static str, String), VecDeque<Response>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a collection listing; `items` must be a JSON array.
    pub fn on_list(self, path: &str, items: Value) -> Self {
        self.script("GET", path, Ok(items))
    }

    pub fn on_get(self, path: &str, record: Value) -> Self {
        self.script("GET", path, Ok(record))
    }

    /// Script successive reads of the same path.
    pub fn on_get_sequence(mut self, path: &str, records: Vec<Value>) -> Self {
        for record in records {
            self = self.script("GET", path, Ok(record));
        }
        self
    }

    pub fn on_post(self, path: &str, response: Value) -> Self {
        self.script("POST", path, Ok(response))
    }

    pub fn on_put(self, path: &str, response: Value) -> Self {
        self.script("PUT", path, Ok(response))
    }

    pub fn fail(self, method: &'static str, path: &str, error: RemoteError) -> Self {
        self.script(method, path, Err(error))
    }

    fn script(self, method: &'static str, path: &str, response: Response) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than reads, in order.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method != "GET")
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn was_called(&self, method: &str, path: &str) -> bool {
        self.count(method, path) > 0
    }

    fn respond(
        &self,
        method: &'static str,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Response {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
        });

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ if method == "GET" => Err(RemoteError::new(
                404,
                format!("The requested object ({}) does not exist", path),
            )),
            _ => Ok(Value::Null),
        }
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn list(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<Value>, RemoteError> {
        match self.respond("GET", path, query, None)? {
            Value::Array(items) => Ok(items),
            other => Err(RemoteError::new(500, format!("expected a list, got {}", other))),
        }
    }

    async fn get(&self, path: &str) -> Result<Value, RemoteError> {
        self.respond("GET", path, &[], None)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, RemoteError> {
        self.respond("POST", path, &[], Some(body))
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, RemoteError> {
        self.respond("PUT", path, &[], Some(body))
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.respond("DELETE", path, &[], None).map(|_| ())
    }
}
