//! Managed private registry

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
use tfplug::validator::StringLengthValidator;

use crate::api::cloud_project::registry::{
    CreateRegistryRequest, Registry, RegistryApi, STATUS_DELETING, STATUS_PENDING, STATUS_READY,
};
use crate::api::{wait_for_state, StateChangeConf, DELETED};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, create_response, delete_response,
    id_attribute, ignore_not_found, import_composite_id, opt_string, read_response,
    refresh_result, required_string, service_name, service_name_attribute, update_response,
    wait_diagnostic,
};

const TIMEOUT: Duration = Duration::from_secs(20 * 60);

#[derive(Default)]
pub struct ContainerRegistryResource {
    provider_data: Option<OvhProviderData>,
}

async fn wait_for_registry(
    ctx: &Context,
    registries: &RegistryApi<'_>,
    registry_id: &str,
    pending: &[&str],
    target: &[&str],
) -> Result<Option<Registry>, Diagnostic> {
    let conf = StateChangeConf::new(pending, target, TIMEOUT);
    wait_for_state(ctx, &conf, move || async move {
        refresh_result(registries.get(registry_id).await, |registry| registry.status.clone())
    })
    .await
    .map_err(|e| wait_diagnostic("Error waiting for container registry", &e))
}

impl ContainerRegistryResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the registry and its current plan into `state`
    async fn refresh_state(
        registries: &RegistryApi<'_>,
        registry: &Registry,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        registry.apply_to_state(state);
        let plan = registries
            .plan(&registry.id)
            .await
            .map_err(|e| api_diagnostic("Failed to read container registry plan", &e))?;
        let _ = state.set_string(&AttributePath::new("plan_id"), plan.id);
        Ok(())
    }

    async fn create_registry(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let request = CreateRegistryRequest {
            name: required_string(state, "name")?,
            region: required_string(state, "region")?,
            plan_id: opt_string(state, "plan_id"),
        };

        tracing::info!("Creating container registry {} in {}", request.name, request.region);
        let registries = client.cloud_project(&service_name).container_registry();
        let registry = registries
            .create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create container registry", &e))?;
        let registry_id = registry.id.clone();
        let _ = state.set_string(&AttributePath::new("id"), registry_id.clone());

        let registry = wait_for_registry(ctx, &registries, &registry_id, STATUS_PENDING, &[STATUS_READY])
            .await?
            .unwrap_or(registry);
        Self::refresh_state(&registries, &registry, state).await
    }

    async fn read_registry(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut new_state = state.clone();
        let service_name = service_name(&mut new_state)?;
        let registry_id = required_string(state, "id")?;
        let registries = client.cloud_project(&service_name).container_registry();

        match registries.get(&registry_id).await {
            Ok(registry) => {
                Self::refresh_state(&registries, &registry, &mut new_state).await?;
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Container registry {} no longer exists", registry_id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read container registry", &e)),
        }
    }

    async fn update_registry(
        &self,
        ctx: &Context,
        prior_state: &DynamicValue,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let registry_id = required_string(prior_state, "id")?;
        let registries = client.cloud_project(&service_name).container_registry();

        let name = required_string(state, "name")?;
        if opt_string(prior_state, "name").as_ref() != Some(&name) {
            registries
                .rename(&registry_id, &name)
                .await
                .map_err(|e| api_diagnostic("Failed to rename container registry", &e))?;
        }

        if let Some(plan_id) = opt_string(state, "plan_id") {
            if opt_string(prior_state, "plan_id").as_ref() != Some(&plan_id) {
                tracing::info!("Moving container registry {} to plan {}", registry_id, plan_id);
                registries
                    .set_plan(&registry_id, &plan_id)
                    .await
                    .map_err(|e| api_diagnostic("Failed to change container registry plan", &e))?;
            }
        }

        let registry = wait_for_registry(ctx, &registries, &registry_id, STATUS_PENDING, &[STATUS_READY])
            .await?
            .ok_or_else(|| {
                Diagnostic::error(
                    "Container registry disappeared",
                    format!("Registry {} was deleted during the update", registry_id),
                )
            })?;
        Self::refresh_state(&registries, &registry, state).await
    }

    async fn delete_registry(&self, ctx: &Context, state: &DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut state = state.clone();
        let service_name = service_name(&mut state)?;
        let registry_id = required_string(&state, "id")?;
        let registries = client.cloud_project(&service_name).container_registry();

        ignore_not_found(registries.delete(&registry_id).await)
            .map_err(|e| api_diagnostic("Failed to delete container registry", &e))?;

        let mut pending = STATUS_DELETING.to_vec();
        pending.push(STATUS_READY);
        wait_for_registry(ctx, &registries, &registry_id, &pending, &[DELETED]).await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for ContainerRegistryResource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_containerregistry"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a private container registry of a Public Cloud project")
            .attribute(id_attribute("Registry identifier"))
            .attribute(service_name_attribute("Public Cloud project identifier"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Registry name")
                    .required()
                    .validator(StringLengthValidator::between(1, 128))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Region of the registry, e.g. GRA")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("plan_id", AttributeType::String)
                    .description("Capability plan; defaults to the smallest one")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(computed("status", AttributeType::String, "Registry status"))
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("Harbor URL")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(computed("version", AttributeType::String, "Harbor version"))
            .attribute(computed("size", AttributeType::Number, "Storage used, in bytes"))
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project owning the registry")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("Creation date")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(computed("updated_at", AttributeType::String, "Last update date"))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.create_registry(&ctx, &mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_registry(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = self
            .update_registry(&ctx, &request.prior_state, &mut new_state)
            .await;
        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_registry(&ctx, &request.prior_state).await)
    }

    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(&request, '/', &["service_name", "id"], "service_name/registry_id")
    }
}

#[async_trait]
impl ResourceWithConfigure for ContainerRegistryResource {
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
