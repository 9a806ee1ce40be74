//! SSH key registered on the OVH account

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::StringLengthValidator;

use crate::api::me::{CreateSshKeyRequest, UpdateSshKeyRequest};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, configure_response, create_response, delete_response,
    id_attribute, ignore_not_found, opt_bool, read_response, required_string, update_response,
};

#[derive(Default)]
pub struct SshKeyResource {
    provider_data: Option<OvhProviderData>,
}

impl SshKeyResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_key(&self, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let key_name = required_string(state, "key_name")?;
        let request = CreateSshKeyRequest {
            key_name: key_name.clone(),
            key: required_string(state, "key")?,
        };

        tracing::info!("Creating SSH key {}", key_name);
        let keys = client.me().ssh_keys();
        keys.create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create SSH key", &e))?;

        if opt_bool(state, "default") == Some(true) {
            keys.update(&key_name, &UpdateSshKeyRequest { default: true })
                .await
                .map_err(|e| api_diagnostic("Failed to set SSH key as default", &e))?;
        }

        let key = keys
            .get(&key_name)
            .await
            .map_err(|e| api_diagnostic("Failed to read SSH key", &e))?;
        key.apply_to_state(state);
        Ok(())
    }

    async fn read_key(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let key_name = required_string(state, "id")?;

        match client.me().ssh_keys().get(&key_name).await {
            Ok(key) => {
                let mut new_state = state.clone();
                key.apply_to_state(&mut new_state);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("SSH key {} no longer exists, removing from state", key_name);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read SSH key", &e)),
        }
    }
}

#[async_trait]
impl Resource for SshKeyResource {
    fn type_name(&self) -> &str {
        "ovh_me_ssh_key"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an SSH key of the OVH account")
            .attribute(id_attribute("Name of the key"))
            .attribute(
                AttributeBuilder::new("key_name", AttributeType::String)
                    .description("Name of the SSH key")
                    .required()
                    .validator(StringLengthValidator::at_least(1))
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("key", AttributeType::String)
                    .description("Public key content in OpenSSH format")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("default", AttributeType::Bool)
                    .description("Use this key by default for rescue and reinstallation")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.create_key(&mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_key(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = async {
            let client = client(&self.provider_data)?;
            let key_name = required_string(&request.prior_state, "id")?;
            let default = opt_bool(&new_state, "default").unwrap_or(false);

            client
                .me()
                .ssh_keys()
                .update(&key_name, &UpdateSshKeyRequest { default })
                .await
                .map_err(|e| api_diagnostic("Failed to update SSH key", &e))?;
            let key = client
                .me()
                .ssh_keys()
                .get(&key_name)
                .await
                .map_err(|e| api_diagnostic("Failed to read SSH key", &e))?;
            key.apply_to_state(&mut new_state);
            Ok::<(), Diagnostic>(())
        }
        .await;

        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result = async {
            let client = client(&self.provider_data)?;
            let key_name = required_string(&request.prior_state, "id")?;
            ignore_not_found(client.me().ssh_keys().delete(&key_name).await)
                .map_err(|e| api_diagnostic("Failed to delete SSH key", &e))
        }
        .await;

        delete_response(result)
    }
}

#[async_trait]
impl ResourceWithConfigure for SshKeyResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        ConfigureResourceResponse {
            diagnostics: configure_response(&mut self.provider_data, request.provider_data),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::{Client, Credentials};
    use tfplug::types::AttributePath;

    fn configured(server: &mockito::Server) -> SshKeyResource {
        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        SshKeyResource {
            provider_data: Some(OvhProviderData::new(client)),
        }
    }

    fn planned() -> DynamicValue {
        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("key_name"), "laptop".to_string());
        let _ = state.set_string(&AttributePath::new("key"), "ssh-ed25519 AAAA user@host".to_string());
        let _ = state.set_bool(&AttributePath::new("default"), true);
        let _ = state.mark_unknown(&AttributePath::new("id"));
        state
    }

    #[tokio::test]
    async fn create_registers_key_and_marks_it_default() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/me/sshKey")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "keyName": "laptop",
                "key": "ssh-ed25519 AAAA user@host"
            })))
            .with_body("null")
            .create_async()
            .await;
        let set_default = server
            .mock("PUT", "/me/sshKey/laptop")
            .match_body(mockito::Matcher::Json(serde_json::json!({ "default": true })))
            .with_body("null")
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/me/sshKey/laptop")
            .with_body(r#"{"keyName":"laptop","key":"ssh-ed25519 AAAA user@host","default":true}"#)
            .create_async()
            .await;

        let resource = configured(&server);
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_me_ssh_key".to_string(),
                    planned_state: planned(),
                    config: planned(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            "laptop"
        );
        create.assert_async().await;
        set_default.assert_async().await;
    }

    #[tokio::test]
    async fn failed_create_returns_null_state() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/me/sshKey")
            .with_status(409)
            .with_body(r#"{"class":"Client::Conflict::KeyExists","message":"key already exists"}"#)
            .create_async()
            .await;

        let response = configured(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_me_ssh_key".to_string(),
                    planned_state: planned(),
                    config: planned(),
                },
            )
            .await;

        assert!(response.new_state.is_null());
        assert_eq!(response.diagnostics[0].summary, "Failed to create SSH key");
        assert!(response.diagnostics[0].detail.contains("key already exists"));
    }

    #[tokio::test]
    async fn read_of_missing_key_removes_it() {
        let mut server = mockito::Server::new_async().await;
        let _get = server
            .mock("GET", "/me/sshKey/laptop")
            .with_status(404)
            .with_body(r#"{"class":"Client::NotFound","message":"not found"}"#)
            .create_async()
            .await;

        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("id"), "laptop".to_string());

        let response = configured(&server)
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "ovh_me_ssh_key".to_string(),
                    current_state: state,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn unconfigured_resource_reports_diagnostic() {
        let response = SshKeyResource::new()
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "ovh_me_ssh_key".to_string(),
                    prior_state: planned(),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
