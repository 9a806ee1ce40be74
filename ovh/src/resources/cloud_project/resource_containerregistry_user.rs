//! Harbor user of a managed private registry

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::cloud_project::registry::CreateRegistryUserRequest;
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, configure_response, create_response, delete_response, id_attribute,
    ignore_not_found, import_composite_id, read_response, required_string, service_name,
    service_name_attribute,
};

#[derive(Default)]
pub struct ContainerRegistryUserResource {
    provider_data: Option<OvhProviderData>,
}

impl ContainerRegistryUserResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_user(&self, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let registry_id = required_string(state, "registry_id")?;
        let request = CreateRegistryUserRequest {
            email: required_string(state, "email")?,
            login: required_string(state, "login")?,
        };

        tracing::info!("Creating user {} on registry {}", request.login, registry_id);
        let user = client
            .cloud_project(&service_name)
            .container_registry()
            .users(&registry_id)
            .create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create registry user", &e))?;
        user.apply_to_state(state);
        Ok(())
    }

    async fn read_user(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut new_state = state.clone();
        let service_name = service_name(&mut new_state)?;
        let registry_id = required_string(state, "registry_id")?;
        let user_id = required_string(state, "id")?;

        match client
            .cloud_project(&service_name)
            .container_registry()
            .users(&registry_id)
            .get(&user_id)
            .await
        {
            Ok(user) => {
                user.apply_to_state(&mut new_state);
                if new_state.is_null_or_unknown_at(&AttributePath::new("login")) {
                    let _ = new_state.set_string(&AttributePath::new("login"), user.user.clone());
                }
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Registry user {} no longer exists", user_id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read registry user", &e)),
        }
    }
}

#[async_trait]
impl Resource for ContainerRegistryUserResource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_containerregistry_user"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Creates a user on a private container registry")
            .attribute(id_attribute("User identifier"))
            .attribute(service_name_attribute("Public Cloud project identifier"))
            .attribute(
                AttributeBuilder::new("registry_id", AttributeType::String)
                    .description("Registry identifier")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("email", AttributeType::String)
                    .description("Email of the user")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("login", AttributeType::String)
                    .description("Login of the user")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user", AttributeType::String)
                    .description("Harbor user name")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("Password, only known when the user is created")
                    .computed()
                    .sensitive()
                    .plan_modifier(UseStateForUnknown)
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
        let result = self.create_user(&mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_user(&request.current_state).await;
        read_response(request.current_state, result)
    }

    /// Every configurable attribute forces replacement
    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result = async {
            let client = client(&self.provider_data)?;
            let mut state = request.prior_state.clone();
            let service_name = service_name(&mut state)?;
            let registry_id = required_string(&state, "registry_id")?;
            let user_id = required_string(&state, "id")?;
            let users = client
                .cloud_project(&service_name)
                .container_registry()
                .users(&registry_id);
            ignore_not_found(users.delete(&user_id).await)
                .map_err(|e| api_diagnostic("Failed to delete registry user", &e))
        }
        .await;

        delete_response(result)
    }

    /// Import ID is `<service_name>/<registry_id>/<user id>`; the password stays unknown
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(
            &request,
            '/',
            &["service_name", "registry_id", "id"],
            "service_name/registry_id/user_id",
        )
    }
}

#[async_trait]
impl ResourceWithConfigure for ContainerRegistryUserResource {
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
