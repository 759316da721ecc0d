//! Database user adapter
//!
//! Like databases, users exist only within an instance and are observed by
//! scanning the parent's user listing for a name match. The service never
//! echoes passwords back, so the declared password cannot be verified after
//! creation, only re-sent on re-create.

use pyxis_core::{LifecycleState, Probe, wait_for_state};
use pyxis_core::waiter::WaitError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::DbApi;
use crate::config::PollTuning;
use crate::error::{TroveError, TroveResult};
use crate::types::{DatabaseRef, User, UserCreate};

const KIND: &str = "user";

const CREATE_PENDING: &[LifecycleState] = &[LifecycleState::Build];
const CREATE_TARGET: &[LifecycleState] = &[LifecycleState::Active];
const DELETE_PENDING: &[LifecycleState] = &[LifecycleState::Active];
const DELETE_TARGET: &[LifecycleState] = &[LifecycleState::Deleted];

/// Declared configuration for a user within an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    /// ID of the instance hosting the user.
    pub instance: String,
    pub password: String,
    #[serde(default)]
    pub host: Option<String>,
    /// Databases the user is granted access to.
    #[serde(default)]
    pub databases: Vec<String>,
}

/// Map the declared configuration into the wire payload.
pub fn build_create_request(config: &UserConfig) -> TroveResult<UserCreate> {
    if config.name.trim().is_empty() {
        return Err(TroveError::validation(KIND, "name must not be empty"));
    }
    if config.instance.trim().is_empty() {
        return Err(TroveError::validation(KIND, "instance is required"));
    }
    if config.password.is_empty() {
        return Err(TroveError::validation(KIND, "password must not be empty"));
    }

    Ok(UserCreate {
        name: config.name.clone(),
        password: config.password.clone(),
        host: config.host.clone(),
        databases: config
            .databases
            .iter()
            .map(|name| DatabaseRef { name: name.clone() })
            .collect(),
    })
}

/// Create the user and wait for it to appear in the parent's listing.
pub async fn create(api: &dyn DbApi, tuning: &PollTuning, config: &UserConfig) -> TroveResult<User> {
    let body = build_create_request(config)?;
    debug!(name = %body.name, instance = %config.instance, "creating user");

    api.create_users(&config.instance, std::slice::from_ref(&body))
        .await?;

    let spec = tuning.create_spec(CREATE_PENDING, CREATE_TARGET);
    wait_for_state(&spec, || probe(api, &config.instance, &config.name))
        .await
        .map_err(|e| match e {
            WaitError::Timeout { last: None, .. } => {
                TroveError::child_not_found(KIND, &config.name, &config.instance)
            }
            other => TroveError::wait(KIND, &config.name, other),
        })?;

    info!(name = %config.name, instance = %config.instance, "user ready");
    read(api, &config.instance, &config.name)
        .await?
        .ok_or_else(|| TroveError::child_not_found(KIND, &config.name, &config.instance))
}

/// Scan the parent instance's user listing for the declared name.
pub async fn probe(api: &dyn DbApi, instance_id: &str, name: &str) -> Result<Probe, TroveError> {
    let users = api.list_users(instance_id).await?;
    if users.iter().any(|user| user.name == name) {
        Ok(Probe::Status(LifecycleState::Active))
    } else {
        Ok(Probe::Absent)
    }
}

/// Find the user in the parent's listing, tolerating a vanished parent.
pub async fn read(api: &dyn DbApi, instance_id: &str, name: &str) -> TroveResult<Option<User>> {
    match api.list_users(instance_id).await {
        Ok(users) => Ok(users.into_iter().find(|user| user.name == name)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Delete the user and wait for it to leave the parent's listing.
pub async fn delete(
    api: &dyn DbApi,
    tuning: &PollTuning,
    instance_id: &str,
    name: &str,
) -> TroveResult<()> {
    debug!(name, instance = instance_id, "deleting user");
    match api.delete_user(instance_id, name).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            debug!(name, "user already gone");
        }
        Err(e) => return Err(e),
    }

    let spec = tuning.delete_spec(DELETE_PENDING, DELETE_TARGET);
    wait_for_state(&spec, || delete_probe(api, instance_id, name))
        .await
        .map_err(|e| TroveError::wait(KIND, name, e))?;

    info!(name, instance = instance_id, "user deleted");
    Ok(())
}

async fn delete_probe(api: &dyn DbApi, instance_id: &str, name: &str) -> Result<Probe, TroveError> {
    match probe(api, instance_id, name).await {
        Err(e) if e.is_not_found() => Ok(Probe::Absent),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedApi;

    fn config() -> UserConfig {
        UserConfig {
            name: "svc".to_string(),
            instance: "I1".to_string(),
            password: "x".to_string(),
            host: None,
            databases: vec!["app".to_string()],
        }
    }

    fn listed(name: &str) -> User {
        User {
            name: name.to_string(),
            host: Some("%".to_string()),
            databases: vec![DatabaseRef {
                name: "app".to_string(),
            }],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_succeeds_once_listing_contains_user() {
        let api = ScriptedApi::new();
        api.script_create_users(Ok(()));
        api.script_list_users(Ok(Vec::new()));
        api.script_list_users(Ok(vec![listed("svc")]));
        api.script_list_users(Ok(vec![listed("svc")]));

        let user = create(&api, &PollTuning::default(), &config())
            .await
            .unwrap();

        assert_eq!(user.name, "svc");
        let created = api.created_users.lock().unwrap();
        assert_eq!(created[0].1[0].password, "x");
        assert_eq!(created[0].1[0].databases[0].name, "app");
    }

    #[tokio::test(start_paused = true)]
    async fn create_times_out_with_child_not_found_when_user_never_appears() {
        let api = ScriptedApi::new();
        api.script_create_users(Ok(()));
        api.fallback_list_users(Vec::new());

        let tuning = PollTuning {
            create_timeout_secs: 60,
            ..Default::default()
        };
        let err = create(&api, &tuning, &config()).await.unwrap_err();

        match err {
            TroveError::ChildNotFound {
                kind,
                name,
                instance_id,
            } => {
                assert_eq!(kind, "user");
                assert_eq!(name, "svc");
                assert_eq!(instance_id, "I1");
            }
            other => panic!("expected child-not-found, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delete_is_idempotent_when_user_absent() {
        let api = ScriptedApi::new();
        api.script_delete_user(Err(TroveError::not_found("user", "svc")));
        api.script_list_users(Ok(Vec::new()));

        delete(&api, &PollTuning::default(), "I1", "svc")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn read_returns_none_when_parent_gone() {
        let api = ScriptedApi::new();
        api.script_list_users(Err(TroveError::not_found("instance", "I1")));

        let found = read(&api, "I1", "svc").await.unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn build_request_requires_password() {
        let mut bad = config();
        bad.password = String::new();
        let err = build_create_request(&bad).unwrap_err();
        assert!(matches!(err, TroveError::Validation { .. }));
    }
}
