//! Database cluster user convergence: create, update, delete, reset.
//!
//! The API decorates usernames with an authentication suffix, so a user is
//! correlated by the undecorated part of its `username` (see
//! [`base_username`]).

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use super::cluster::require_cluster;
use super::Converge;
use crate::client::{body, get_as, CloudApi};
use crate::error::{ConvergeError, Result};
use crate::paths;
use crate::resolver::resolve_by_detail;
use crate::waiter::WaitPolicy;
use ovhform_models::{
    ClusterUserDesc, CreateUserRequest, DatabaseUser, Outcome, UpdateUserRequest, UserState,
    USER_READY,
};

/// `name` or `name@suffix`, the suffix being a host or auth-database label.
static DECORATED_USERNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^@]+)(?:@([A-Za-z0-9._-]+))?$").expect("hardcoded regex pattern is valid")
});

/// Strip the decoration from a remote username.
///
/// Returns `None` when the username does not have a recognised shape, in
/// which case it never matches a desired user.
pub fn base_username(remote: &str) -> Option<&str> {
    DECORATED_USERNAME
        .captures(remote)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

pub struct ClusterUserConvergence {
    api: Arc<dyn CloudApi>,
    wait: WaitPolicy,
}

impl ClusterUserConvergence {
    pub fn new(api: Arc<dyn CloudApi>, wait: WaitPolicy) -> Self {
        Self { api, wait }
    }

    /// Wait for the user to be ready, then grant the union of the desired
    /// roles and every role seen on the user while waiting.
    async fn update(&self, desired: &ClusterUserDesc, user_path: &str) -> Result<Outcome> {
        let api = self.api.as_ref();
        let mut roles: BTreeSet<String> = desired.roles.clone();

        let ready = self
            .wait
            .await_terminal(
                &format!("user {} to be {}", desired.username, USER_READY),
                || get_as::<DatabaseUser>(api, user_path),
                |user| {
                    roles.extend(user.roles.iter().cloned());
                    user.status == USER_READY
                },
            )
            .await?;

        let granted: BTreeSet<String> = ready.roles.into_iter().collect();
        if granted == roles {
            return Ok(Outcome::unchanged(format!(
                "User {} already up to date",
                desired.username
            )));
        }

        debug!(user = %desired.username, ?roles, "updating roles");
        let request = UpdateUserRequest { roles };
        let result = api.put(user_path, body(user_path, &request)?).await?;
        Ok(Outcome::changed(format!("User {} updated", desired.username)).with_attributes(result))
    }

    async fn create(&self, desired: &ClusterUserDesc, users_path: &str) -> Result<Outcome> {
        let password = desired
            .password
            .as_deref()
            .filter(|password| !password.is_empty())
            .ok_or_else(|| {
                ConvergeError::Configuration(format!(
                    "password is required to create user {}",
                    desired.username
                ))
            })?;

        let request = CreateUserRequest {
            name: desired.username.clone(),
            password: password.to_string(),
            roles: desired.roles.clone(),
        };
        info!(user = %desired.username, "creating user");
        let result = self
            .api
            .post(users_path, body(users_path, &request)?)
            .await?;
        Ok(Outcome::changed(format!("User {} created", desired.username)).with_attributes(result))
    }
}

#[async_trait]
impl Converge for ClusterUserConvergence {
    type Desired = ClusterUserDesc;

    async fn converge(&self, desired: &ClusterUserDesc) -> Result<Outcome> {
        let api = self.api.as_ref();
        let project = desired.cluster.service_name.as_str();
        let engine = desired.cluster.engine;

        let cluster = require_cluster(api, &desired.cluster).await?;
        let users_path = paths::database::users(project, engine, &cluster.id);
        let user_path = |id: &str| paths::database::user(project, engine, &cluster.id, id);

        let found: Option<DatabaseUser> = resolve_by_detail(
            api,
            &users_path,
            &[],
            user_path,
            |user: &DatabaseUser| base_username(&user.username) == Some(desired.username.as_str()),
        )
        .await?;
        info!(user = %desired.username, exists = found.is_some(), state = ?desired.state, "converging user");

        match (found, desired.state) {
            (Some(user), UserState::Present) => self.update(desired, &user_path(&user.id)).await,
            (None, UserState::Present) => self.create(desired, &users_path).await,
            (Some(user), UserState::Absent) => {
                info!(user = %desired.username, id = %user.id, "deleting user");
                api.delete(&user_path(&user.id)).await?;
                Ok(Outcome::changed(format!("User {} deleted", desired.username)))
            }
            (None, UserState::Absent) => Ok(Outcome::unchanged(format!(
                "User {} does not exist",
                desired.username
            ))),
            (Some(user), UserState::Reset) => {
                info!(user = %desired.username, "resetting credentials");
                let result = api
                    .post(
                        &paths::database::reset_credentials(project, engine, &cluster.id, &user.id),
                        Value::Null,
                    )
                    .await?;
                Ok(Outcome::changed(format!("Credentials of user {} reset", desired.username))
                    .with_attributes(result))
            }
            (None, UserState::Reset) => Err(ConvergeError::not_found("User", &desired.username)),
        }
    }
}
