//! Account (`/me`) API

use serde::{Deserialize, Serialize};
use tfplug::types::{AttributePath, DynamicValue};

use super::{path_escape, ApiError, Client};

/// Response from GET /me
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Me {
    pub nichandle: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub organisation: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub ovh_subsidiary: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub customer_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Currency {
    pub code: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl Me {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.nichandle.clone());
        let _ = state.set_string(&AttributePath::new("nichandle"), self.nichandle.clone());
        let _ = state.set_optional_string(&AttributePath::new("firstname"), self.firstname.clone());
        let _ = state.set_optional_string(&AttributePath::new("name"), self.name.clone());
        let _ = state.set_optional_string(&AttributePath::new("email"), self.email.clone());
        let _ = state.set_optional_string(&AttributePath::new("country"), self.country.clone());
        let _ = state.set_optional_string(
            &AttributePath::new("currency_code"),
            self.currency.as_ref().map(|c| c.code.clone()),
        );
        let _ = state.set_optional_string(
            &AttributePath::new("organisation"),
            self.organisation.clone(),
        );
        let _ = state.set_optional_string(&AttributePath::new("state"), self.state.clone());
        let _ = state.set_optional_string(
            &AttributePath::new("ovh_subsidiary"),
            self.ovh_subsidiary.clone(),
        );
        let _ = state.set_optional_string(&AttributePath::new("language"), self.language.clone());
        let _ = state.set_optional_string(
            &AttributePath::new("customer_code"),
            self.customer_code.clone(),
        );
    }
}

/// SSH key registered on the account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKey {
    pub key_name: String,
    pub key: String,
    #[serde(default)]
    pub default: bool,
}

impl SshKey {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.key_name.clone());
        let _ = state.set_string(&AttributePath::new("key_name"), self.key_name.clone());
        let _ = state.set_string(&AttributePath::new("key"), self.key.clone());
        let _ = state.set_bool(&AttributePath::new("default"), self.default);
    }
}

/// Request body for POST /me/sshKey
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSshKeyRequest {
    pub key_name: String,
    pub key: String,
}

/// Request body for PUT /me/sshKey/{keyName}
#[derive(Debug, Serialize)]
pub struct UpdateSshKeyRequest {
    pub default: bool,
}

pub struct MeApi<'a> {
    client: &'a Client,
}

impl<'a> MeApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /me
    pub async fn get(&self) -> Result<Me, ApiError> {
        self.client.get("/me").await
    }

    pub fn ssh_keys(&self) -> SshKeysApi<'a> {
        SshKeysApi {
            client: self.client,
        }
    }
}

pub struct SshKeysApi<'a> {
    client: &'a Client,
}

impl SshKeysApi<'_> {
    /// GET /me/sshKey/{keyName}
    pub async fn get(&self, key_name: &str) -> Result<SshKey, ApiError> {
        self.client
            .get(&format!("/me/sshKey/{}", path_escape(key_name)))
            .await
    }

    /// POST /me/sshKey
    pub async fn create(&self, request: &CreateSshKeyRequest) -> Result<(), ApiError> {
        self.client.post::<(), _>("/me/sshKey", request).await
    }

    /// PUT /me/sshKey/{keyName}
    pub async fn update(&self, key_name: &str, request: &UpdateSshKeyRequest) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&format!("/me/sshKey/{}", path_escape(key_name)), request)
            .await
    }

    /// DELETE /me/sshKey/{keyName}
    pub async fn delete(&self, key_name: &str) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("/me/sshKey/{}", path_escape(key_name)))
            .await
    }
}
