//! User of a managed database cluster

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
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{StringLengthValidator, StringOneOfValidator};

use crate::api::cloud_project::database::{STATUS_PENDING, STATUS_READY, USER_ENGINES};
use crate::api::{wait_for_state, StateChangeConf};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, create_response, delete_response,
    id_attribute, ignore_not_found, import_composite_id, read_response, refresh_result,
    required_string, service_name, service_name_attribute, wait_diagnostic,
};

const TIMEOUT: Duration = Duration::from_secs(20 * 60);

#[derive(Default)]
pub struct DatabaseUserResource {
    provider_data: Option<OvhProviderData>,
}

impl DatabaseUserResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_user(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let engine = required_string(state, "engine")?;
        let cluster_id = required_string(state, "cluster_id")?;
        let name = required_string(state, "name")?;

        tracing::info!("Creating user {} on {} cluster {}", name, engine, cluster_id);
        let users = client
            .cloud_project(&service_name)
            .database(&engine)
            .users(&cluster_id);
        let user = users
            .create(&name)
            .await
            .map_err(|e| api_diagnostic("Failed to create database user", &e))?;
        user.apply_to_state(state);

        let conf = StateChangeConf::new(STATUS_PENDING, &[STATUS_READY], TIMEOUT);
        let users = &users;
        let user_id = user.id.as_str();
        let ready = wait_for_state(ctx, &conf, move || async move {
            refresh_result(users.get(user_id).await, |user| user.status.clone())
        })
        .await
        .map_err(|e| wait_diagnostic("Error waiting for database user to be ready", &e))?;
        if let Some(ready) = ready {
            ready.apply_to_state(state);
        }
        Ok(())
    }

    async fn read_user(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut new_state = state.clone();
        let service_name = service_name(&mut new_state)?;
        let engine = required_string(state, "engine")?;
        let cluster_id = required_string(state, "cluster_id")?;
        let user_id = required_string(state, "id")?;

        match client
            .cloud_project(&service_name)
            .database(&engine)
            .users(&cluster_id)
            .get(&user_id)
            .await
        {
            Ok(user) => {
                user.apply_to_state(&mut new_state);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Database user {} no longer exists", user_id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read database user", &e)),
        }
    }
}

#[async_trait]
impl Resource for DatabaseUserResource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_database_user"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Creates a user on a managed database cluster")
            .attribute(id_attribute("User identifier"))
            .attribute(service_name_attribute("Public Cloud project identifier"))
            .attribute(
                AttributeBuilder::new("engine", AttributeType::String)
                    .description("Engine of the cluster")
                    .required()
                    .validator(StringOneOfValidator::new(USER_ENGINES))
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cluster_id", AttributeType::String)
                    .description("Cluster identifier")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("User name")
                    .required()
                    .validator(StringLengthValidator::between(1, 32))
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(computed("status", AttributeType::String, "User status"))
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
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
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
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

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result = async {
            let client = client(&self.provider_data)?;
            let mut state = request.prior_state.clone();
            let service_name = service_name(&mut state)?;
            let engine = required_string(&state, "engine")?;
            let cluster_id = required_string(&state, "cluster_id")?;
            let user_id = required_string(&state, "id")?;
            let users = client
                .cloud_project(&service_name)
                .database(&engine)
                .users(&cluster_id);
            ignore_not_found(users.delete(&user_id).await)
                .map_err(|e| api_diagnostic("Failed to delete database user", &e))
        }
        .await;

        delete_response(result)
    }

    /// Import ID is `<service_name>/<engine>/<cluster_id>/<user id>`
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(
            &request,
            '/',
            &["service_name", "engine", "cluster_id", "id"],
            "service_name/engine/cluster_id/user_id",
        )
    }
}

#[async_trait]
impl ResourceWithConfigure for DatabaseUserResource {
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
