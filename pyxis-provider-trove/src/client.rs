//! Trove API client
//!
//! [`DbApi`] is the seam between the resource adapters and the wire: one
//! typed method per endpoint the provider uses. [`TroveClient`] is the
//! production implementation over HTTP. Tests substitute a scripted
//! implementation of the trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TroveConfig;
use crate::error::{TroveError, TroveResult};
use crate::types::{
    Configuration, ConfigurationCreate, Database, DatabaseCreate, Instance, InstanceCreate, User,
    UserCreate,
};

/// Operations the provider needs from the database service.
///
/// Instances and configuration groups have a direct get-by-ID; databases and
/// users exist only within an instance and are observed by listing the
/// parent. Implementations must be safe for concurrent use.
#[async_trait]
pub trait DbApi: Send + Sync {
    async fn create_instance(&self, body: &InstanceCreate) -> TroveResult<Instance>;
    async fn get_instance(&self, id: &str) -> TroveResult<Instance>;
    async fn delete_instance(&self, id: &str) -> TroveResult<()>;

    async fn create_databases(
        &self,
        instance_id: &str,
        databases: &[DatabaseCreate],
    ) -> TroveResult<()>;
    async fn list_databases(&self, instance_id: &str) -> TroveResult<Vec<Database>>;
    async fn delete_database(&self, instance_id: &str, name: &str) -> TroveResult<()>;

    async fn create_users(&self, instance_id: &str, users: &[UserCreate]) -> TroveResult<()>;
    async fn list_users(&self, instance_id: &str) -> TroveResult<Vec<User>>;
    async fn delete_user(&self, instance_id: &str, name: &str) -> TroveResult<()>;

    async fn create_configuration(&self, body: &ConfigurationCreate) -> TroveResult<Configuration>;
    async fn get_configuration(&self, id: &str) -> TroveResult<Configuration>;
    async fn delete_configuration(&self, id: &str) -> TroveResult<()>;
}

// JSON envelopes the service wraps every body in.

#[derive(Serialize)]
struct InstanceEnvelope<'a> {
    instance: &'a InstanceCreate,
}

#[derive(Deserialize)]
struct InstanceResponse {
    instance: Instance,
}

#[derive(Serialize)]
struct DatabasesEnvelope<'a> {
    databases: &'a [DatabaseCreate],
}

#[derive(Deserialize)]
struct DatabasesResponse {
    databases: Vec<Database>,
}

#[derive(Serialize)]
struct UsersEnvelope<'a> {
    users: &'a [UserCreate],
}

#[derive(Deserialize)]
struct UsersResponse {
    users: Vec<User>,
}

#[derive(Serialize)]
struct ConfigurationEnvelope<'a> {
    configuration: &'a ConfigurationCreate,
}

#[derive(Deserialize)]
struct ConfigurationResponse {
    configuration: Configuration,
}

/// HTTP client for the Trove v1 API.
#[derive(Debug)]
pub struct TroveClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl TroveClient {
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    const READ_TIMEOUT: Duration = Duration::from_secs(60);

    /// Build a client from provider configuration.
    ///
    /// Fails with a configuration error before any remote call if the
    /// endpoint or token is missing.
    pub fn new(config: &TroveConfig) -> TroveResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(TroveError::configuration("endpoint must not be empty"));
        }
        if config.token.trim().is_empty() {
            return Err(TroveError::configuration("auth token must not be empty"));
        }

        let http = Client::builder()
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .timeout(Self::READ_TIMEOUT)
            .build()
            .map_err(|e| TroveError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Map an unsuccessful response to the provider error taxonomy.
    /// HTTP 404 becomes the distinguishable not-found kind; everything else
    /// is surfaced verbatim as an API error.
    async fn check(
        &self,
        response: Response,
        kind: &'static str,
        id: &str,
    ) -> TroveResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(TroveError::not_found(kind, id));
        }
        let message = response.text().await.unwrap_or_default();
        Err(TroveError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        kind: &'static str,
        id: &str,
    ) -> TroveResult<T> {
        debug!(path, "GET");
        let response = self
            .http
            .get(self.url(path))
            .header("X-Auth-Token", &self.token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let response = self.check(response, kind, id).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        kind: &'static str,
        id: &str,
    ) -> TroveResult<Response> {
        debug!(path, "POST");
        let response = self
            .http
            .post(self.url(path))
            .header("X-Auth-Token", &self.token)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        self.check(response, kind, id).await
    }

    async fn delete(&self, path: &str, kind: &'static str, id: &str) -> TroveResult<()> {
        debug!(path, "DELETE");
        let response = self
            .http
            .delete(self.url(path))
            .header("X-Auth-Token", &self.token)
            .send()
            .await?;
        self.check(response, kind, id).await?;
        Ok(())
    }
}

#[async_trait]
impl DbApi for TroveClient {
    async fn create_instance(&self, body: &InstanceCreate) -> TroveResult<Instance> {
        let response = self
            .post_json(
                "/instances",
                &InstanceEnvelope { instance: body },
                "instance",
                &body.name,
            )
            .await?;
        let parsed: InstanceResponse = response.json().await?;
        Ok(parsed.instance)
    }

    async fn get_instance(&self, id: &str) -> TroveResult<Instance> {
        let parsed: InstanceResponse = self
            .get_json(&format!("/instances/{id}"), "instance", id)
            .await?;
        Ok(parsed.instance)
    }

    async fn delete_instance(&self, id: &str) -> TroveResult<()> {
        self.delete(&format!("/instances/{id}"), "instance", id)
            .await
    }

    async fn create_databases(
        &self,
        instance_id: &str,
        databases: &[DatabaseCreate],
    ) -> TroveResult<()> {
        self.post_json(
            &format!("/instances/{instance_id}/databases"),
            &DatabasesEnvelope { databases },
            "instance",
            instance_id,
        )
        .await?;
        Ok(())
    }

    async fn list_databases(&self, instance_id: &str) -> TroveResult<Vec<Database>> {
        let parsed: DatabasesResponse = self
            .get_json(
                &format!("/instances/{instance_id}/databases"),
                "instance",
                instance_id,
            )
            .await?;
        Ok(parsed.databases)
    }

    async fn delete_database(&self, instance_id: &str, name: &str) -> TroveResult<()> {
        self.delete(
            &format!("/instances/{instance_id}/databases/{name}"),
            "database",
            name,
        )
        .await
    }

    async fn create_users(&self, instance_id: &str, users: &[UserCreate]) -> TroveResult<()> {
        self.post_json(
            &format!("/instances/{instance_id}/users"),
            &UsersEnvelope { users },
            "instance",
            instance_id,
        )
        .await?;
        Ok(())
    }

    async fn list_users(&self, instance_id: &str) -> TroveResult<Vec<User>> {
        let parsed: UsersResponse = self
            .get_json(
                &format!("/instances/{instance_id}/users"),
                "instance",
                instance_id,
            )
            .await?;
        Ok(parsed.users)
    }

    async fn delete_user(&self, instance_id: &str, name: &str) -> TroveResult<()> {
        self.delete(
            &format!("/instances/{instance_id}/users/{name}"),
            "user",
            name,
        )
        .await
    }

    async fn create_configuration(&self, body: &ConfigurationCreate) -> TroveResult<Configuration> {
        let response = self
            .post_json(
                "/configurations",
                &ConfigurationEnvelope {
                    configuration: body,
                },
                "configuration",
                &body.name,
            )
            .await?;
        let parsed: ConfigurationResponse = response.json().await?;
        Ok(parsed.configuration)
    }

    async fn get_configuration(&self, id: &str) -> TroveResult<Configuration> {
        let parsed: ConfigurationResponse = self
            .get_json(&format!("/configurations/{id}"), "configuration", id)
            .await?;
        Ok(parsed.configuration)
    }

    async fn delete_configuration(&self, id: &str) -> TroveResult<()> {
        self.delete(&format!("/configurations/{id}"), "configuration", id)
            .await
    }
}
