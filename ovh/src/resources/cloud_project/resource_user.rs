//! OpenStack user of a Public Cloud project

use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringOneOfValidator;

use crate::api::cloud_project::user::{
    CreateUserRequest, ROLES, STATUS_DELETING, STATUS_OK, STATUS_PENDING,
};
use crate::api::{wait_for_state, StateChangeConf, DELETED};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, create_response, delete_response,
    id_attribute, ignore_not_found, import_composite_id, opt_string, opt_string_list,
    read_response, refresh_result, required_string, service_name, service_name_attribute,
    wait_diagnostic,
};

const TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Default)]
pub struct CloudProjectUserResource {
    provider_data: Option<OvhProviderData>,
}

fn user_id(state: &DynamicValue) -> Result<i64, Diagnostic> {
    let id = required_string(state, "id")?;
    id.parse().map_err(|_| {
        Diagnostic::error("Invalid user id", format!("'{}' is not a numeric user id", id))
            .with_attribute(AttributePath::new("id"))
    })
}

fn role_type() -> AttributeType {
    AttributeType::object(&[
        ("id", AttributeType::String),
        ("name", AttributeType::String),
        ("description", AttributeType::String),
    ])
}

impl CloudProjectUserResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_user(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let request = CreateUserRequest {
            description: opt_string(state, "description"),
            role: opt_string(state, "role_name"),
            roles: opt_string_list(state, "role_names").filter(|roles| !roles.is_empty()),
        };

        tracing::info!("Creating OpenStack user in project {}", service_name);
        let users = client.cloud_project(&service_name).users();
        let user = users
            .create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create user", &e))?;
        user.apply_to_state(state);

        let conf = StateChangeConf::new(STATUS_PENDING, &[STATUS_OK], TIMEOUT);
        let users = &users;
        let id = user.id;
        let ready = wait_for_state(ctx, &conf, move || async move {
            refresh_result(users.get(id).await, |user| user.status.clone())
        })
        .await
        .map_err(|e| wait_diagnostic("Error waiting for user to be ready", &e))?;
        if let Some(ready) = ready {
            ready.apply_to_state(state);
        }
        Ok(())
    }

    async fn read_user(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut new_state = state.clone();
        let service_name = service_name(&mut new_state)?;
        let id = user_id(state)?;

        match client.cloud_project(&service_name).users().get(id).await {
            Ok(user) => {
                user.apply_to_state(&mut new_state);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("User {} no longer exists", id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read user", &e)),
        }
    }

    async fn delete_user(&self, ctx: &Context, state: &DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut state = state.clone();
        let service_name = service_name(&mut state)?;
        let id = user_id(&state)?;
        let users = client.cloud_project(&service_name).users();

        ignore_not_found(users.delete(id).await)
            .map_err(|e| api_diagnostic("Failed to delete user", &e))?;

        let mut pending = STATUS_DELETING.to_vec();
        pending.push(STATUS_OK);
        let conf = StateChangeConf::new(&pending, &[DELETED], TIMEOUT);
        let users = &users;
        wait_for_state(ctx, &conf, move || async move {
            refresh_result(users.get(id).await, |user| user.status.clone())
        })
        .await
        .map_err(|e| wait_diagnostic("Error waiting for user deletion", &e))?;
        Ok(())
    }
}

#[async_trait]
impl Resource for CloudProjectUserResource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_user"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Creates an OpenStack user in a Public Cloud project")
            .attribute(id_attribute("Numeric user identifier"))
            .attribute(service_name_attribute("Public Cloud project identifier"))
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Description of the user")
                    .optional()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role_name", AttributeType::String)
                    .description("Single role granted to the user")
                    .optional()
                    .validator(StringOneOfValidator::new(ROLES))
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role_names", AttributeType::list_of(AttributeType::String))
                    .description("Roles granted to the user")
                    .optional()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("username", AttributeType::String)
                    .description("Generated OpenStack user name")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(computed("status", AttributeType::String, "User status"))
            .attribute(
                AttributeBuilder::new("creation_date", AttributeType::String)
                    .description("Creation date")
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
            .attribute(computed("roles", AttributeType::list_of(role_type()), "Granted roles"))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = Vec::new();
        let single = !request.config.is_null_or_unknown_at(&AttributePath::new("role_name"));
        let many = !request.config.is_null_or_unknown_at(&AttributePath::new("role_names"));
        if single && many {
            diagnostics.push(
                Diagnostic::error(
                    "Conflicting roles",
                    "Only one of 'role_name' and 'role_names' can be set",
                )
                .with_attribute(AttributePath::new("role_names")),
            );
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.create_user(&ctx, &mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_user(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_user(&ctx, &request.prior_state).await)
    }

    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(&request, '/', &["service_name", "id"], "service_name/user_id")
    }
}

#[async_trait]
impl ResourceWithConfigure for CloudProjectUserResource {
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
