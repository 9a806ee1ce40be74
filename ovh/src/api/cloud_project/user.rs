//! OpenStack users of a Public Cloud project

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use crate::api::{ApiError, Client};

pub const STATUS_OK: &str = "ok";
pub const STATUS_PENDING: &[&str] = &["creating"];
pub const STATUS_DELETING: &[&str] = &["deleting", "deleted"];

pub const ROLES: &[&str] = &[
    "admin",
    "administrator",
    "ai_training_operator",
    "ai_training_read",
    "authentication",
    "backup_operator",
    "compute_operator",
    "image_operator",
    "infrastructure_supervisor",
    "network_operator",
    "network_security_operator",
    "objectstore_operator",
    "volume_operator",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CloudUser {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.id.to_string());
        let _ = state.set_string(&AttributePath::new("username"), self.username.clone());
        let _ = state.set_optional_string(&AttributePath::new("description"), self.description.clone());
        let _ = state.set_string(&AttributePath::new("status"), self.status.clone());
        let _ = state.set_optional_string(
            &AttributePath::new("creation_date"),
            self.creation_date.clone(),
        );
        if let Some(password) = &self.password {
            let _ = state.set_string(&AttributePath::new("password"), password.clone());
        }
        let roles = self
            .roles
            .iter()
            .map(|role| {
                Dynamic::Map(HashMap::from([
                    ("id".to_string(), Dynamic::String(role.id.clone())),
                    ("name".to_string(), Dynamic::String(role.name.clone())),
                    ("description".to_string(), role.description.clone().into()),
                ]))
            })
            .collect();
        let _ = state.set_list(&AttributePath::new("roles"), roles);
    }
}

/// Request body for POST /cloud/project/{serviceName}/user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

pub struct UsersApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a Client, base: String) -> Self {
        Self { client, base }
    }

    pub async fn get(&self, user_id: i64) -> Result<CloudUser, ApiError> {
        self.client.get(&format!("{}/{}", self.base, user_id)).await
    }

    pub async fn create(&self, request: &CreateUserRequest) -> Result<CloudUser, ApiError> {
        self.client.post(&self.base, request).await
    }

    pub async fn delete(&self, user_id: i64) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", self.base, user_id))
            .await
    }
}
