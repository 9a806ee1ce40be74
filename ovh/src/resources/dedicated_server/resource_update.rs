//! Settings of an existing dedicated server
//!
//! The server itself is never created or destroyed here: create and update
//! both PUT the configured values, delete only forgets them.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringOneOfValidator;

use crate::api::dedicated_server::{DedicatedServer, UpdateServerRequest, SERVER_STATES};
use crate::api::Client;
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, configure_response, create_response, id_attribute, opt_bool,
    opt_i64, opt_string, read_response, required_string, update_response,
};

#[derive(Default)]
pub struct DedicatedServerUpdateResource {
    provider_data: Option<OvhProviderData>,
}

fn apply_settings(server: &DedicatedServer, state: &mut DynamicValue) {
    let _ = state.set_string(&AttributePath::new("id"), server.name.clone());
    let _ = state.set_optional_number(
        &AttributePath::new("boot_id"),
        server.boot_id.map(|id| id as f64),
    );
    let _ = state.set_bool(&AttributePath::new("monitoring"), server.monitoring);
    let _ = state.set_optional_string(&AttributePath::new("state"), server.state.clone());
}

impl DedicatedServerUpdateResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn apply(&self, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let request = UpdateServerRequest {
            boot_id: opt_i64(state, "boot_id"),
            monitoring: opt_bool(state, "monitoring"),
            state: opt_string(state, "state"),
        };

        tracing::info!("Updating dedicated server {}", service_name);
        client
            .dedicated_server()
            .update(&service_name, &request)
            .await
            .map_err(|e| api_diagnostic("Failed to update dedicated server", &e))?;

        let server = fetch(client, &service_name).await?;
        apply_settings(&server, state);
        Ok(())
    }

    async fn read_server(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;

        match client.dedicated_server().get(&service_name).await {
            Ok(server) => {
                let mut new_state = state.clone();
                apply_settings(&server, &mut new_state);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Dedicated server {} no longer exists", service_name);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read dedicated server", &e)),
        }
    }
}

async fn fetch(client: &Client, service_name: &str) -> Result<DedicatedServer, Diagnostic> {
    client
        .dedicated_server()
        .get(service_name)
        .await
        .map_err(|e| api_diagnostic("Failed to read dedicated server", &e))
}

#[async_trait]
impl Resource for DedicatedServerUpdateResource {
    fn type_name(&self) -> &str {
        "ovh_dedicated_server_update"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Updates the settings of a dedicated server")
            .attribute(id_attribute("Server name"))
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Dedicated server service name")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("boot_id", AttributeType::Number)
                    .description("Boot netboot identifier")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("monitoring", AttributeType::Bool)
                    .description("Whether OVHcloud monitors the server")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Server state")
                    .optional()
                    .computed()
                    .validator(StringOneOfValidator::new(SERVER_STATES))
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
        let result = self.apply(&mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_server(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = self.apply(&mut new_state).await;
        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        tracing::debug!(
            "Forgetting dedicated server settings {:?}",
            opt_string(&request.prior_state, "service_name")
        );
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for DedicatedServerUpdateResource {
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
