//! Managed private registries (Harbor) and their users

use serde::{Deserialize, Serialize};
use tfplug::types::{AttributePath, DynamicValue};

use crate::api::{path_escape, ApiError, Client};

pub const STATUS_READY: &str = "READY";
pub const STATUS_PENDING: &[&str] = &["INSTALLING", "UPDATING", "RESTORING", "SCALING_UP"];
pub const STATUS_DELETING: &[&str] = &["DELETING", "DELETED"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub id: String,
    pub name: String,
    pub region: String,
    pub status: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(rename = "projectID", default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Registry {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.id.clone());
        let _ = state.set_string(&AttributePath::new("name"), self.name.clone());
        let _ = state.set_string(&AttributePath::new("region"), self.region.clone());
        let _ = state.set_string(&AttributePath::new("status"), self.status.clone());
        let _ = state.set_optional_string(&AttributePath::new("url"), self.url.clone());
        let _ = state.set_optional_string(&AttributePath::new("version"), self.version.clone());
        let _ = state.set_optional_number(&AttributePath::new("size"), self.size.map(|s| s as f64));
        let _ = state.set_optional_string(&AttributePath::new("project_id"), self.project_id.clone());
        let _ = state.set_optional_string(&AttributePath::new("created_at"), self.created_at.clone());
        let _ = state.set_optional_string(&AttributePath::new("updated_at"), self.updated_at.clone());
    }
}

/// Plan currently applied to a registry
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryPlan {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request body for POST /cloud/project/{serviceName}/containerRegistry
#[derive(Debug, Serialize)]
pub struct CreateRegistryRequest {
    pub name: String,
    pub region: String,
    #[serde(rename = "planID", skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct RenameRegistryRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdatePlanRequest<'a> {
    #[serde(rename = "planID")]
    plan_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryUser {
    pub id: String,
    pub user: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl RegistryUser {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.id.clone());
        let _ = state.set_string(&AttributePath::new("user"), self.user.clone());
        if let Some(email) = &self.email {
            let _ = state.set_string(&AttributePath::new("email"), email.clone());
        }
        if let Some(password) = &self.password {
            let _ = state.set_string(&AttributePath::new("password"), password.clone());
        }
    }
}

/// Request body for POST .../containerRegistry/{registryID}/users
#[derive(Debug, Serialize)]
pub struct CreateRegistryUserRequest {
    pub email: String,
    pub login: String,
}

pub struct RegistryApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> RegistryApi<'a> {
    pub fn new(client: &'a Client, base: String) -> Self {
        Self { client, base }
    }

    fn path(&self, registry_id: &str) -> String {
        format!("{}/{}", self.base, path_escape(registry_id))
    }

    pub async fn get(&self, registry_id: &str) -> Result<Registry, ApiError> {
        self.client.get(&self.path(registry_id)).await
    }

    pub async fn create(&self, request: &CreateRegistryRequest) -> Result<Registry, ApiError> {
        self.client.post(&self.base, request).await
    }

    pub async fn rename(&self, registry_id: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&self.path(registry_id), &RenameRegistryRequest { name })
            .await
    }

    /// GET .../containerRegistry/{registryID}/plan
    pub async fn plan(&self, registry_id: &str) -> Result<RegistryPlan, ApiError> {
        self.client
            .get(&format!("{}/plan", self.path(registry_id)))
            .await
    }

    /// PUT .../containerRegistry/{registryID}/plan
    pub async fn set_plan(&self, registry_id: &str, plan_id: &str) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(
                &format!("{}/plan", self.path(registry_id)),
                &UpdatePlanRequest { plan_id },
            )
            .await
    }

    pub async fn delete(&self, registry_id: &str) -> Result<(), ApiError> {
        self.client.delete::<()>(&self.path(registry_id)).await
    }

    pub fn users(&self, registry_id: &str) -> RegistryUsersApi<'a> {
        RegistryUsersApi {
            client: self.client,
            base: format!("{}/users", self.path(registry_id)),
        }
    }
}

pub struct RegistryUsersApi<'a> {
    client: &'a Client,
    base: String,
}

impl RegistryUsersApi<'_> {
    fn path(&self, user_id: &str) -> String {
        format!("{}/{}", self.base, path_escape(user_id))
    }

    pub async fn get(&self, user_id: &str) -> Result<RegistryUser, ApiError> {
        self.client.get(&self.path(user_id)).await
    }

    pub async fn create(&self, request: &CreateRegistryUserRequest) -> Result<RegistryUser, ApiError> {
        self.client.post(&self.base, request).await
    }

    pub async fn delete(&self, user_id: &str) -> Result<(), ApiError> {
        self.client.delete::<()>(&self.path(user_id)).await
    }
}
