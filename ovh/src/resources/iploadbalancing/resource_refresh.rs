//! Applies pending configuration of an IP Load Balancer
//!
//! Creating the resource posts a refresh and waits for the task. Changing
//! `keepers` replaces it, which triggers a new refresh.

use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::{wait_for_state, ApiError, StateChangeConf, TASK_DONE, TASK_PENDING};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, create_response, id_attribute,
    required_string, wait_diagnostic,
};

const TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Default)]
pub struct RefreshResource {
    provider_data: Option<OvhProviderData>,
}

impl RefreshResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn refresh(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let lb = client.ip_loadbalancing(&service_name);

        tracing::info!("Refreshing load balancer {}", service_name);
        let task = lb
            .refresh()
            .await
            .map_err(|e| api_diagnostic("Failed to refresh load balancer", &e))?;
        let _ = state.set_string(&AttributePath::new("id"), task.id.to_string());

        let conf = StateChangeConf::new(TASK_PENDING, TASK_DONE, TIMEOUT)
            .with_poll_interval(Duration::from_secs(5));
        let lb = &lb;
        let task_id = task.id;
        let done = wait_for_state(ctx, &conf, move || async move {
            let task = lb.task(task_id).await?;
            let status = task.status.clone();
            Ok::<_, ApiError>(Some((task, status)))
        })
        .await
        .map_err(|e| wait_diagnostic("Error waiting for load balancer refresh", &e))?
        .unwrap_or(task);

        let _ = state.set_string(&AttributePath::new("action"), done.action);
        let _ = state.set_string(&AttributePath::new("status"), done.status);
        Ok(())
    }
}

#[async_trait]
impl Resource for RefreshResource {
    fn type_name(&self) -> &str {
        "ovh_iploadbalancing_refresh"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Applies the pending configuration of an IP Load Balancer")
            .attribute(id_attribute("Refresh task identifier"))
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Load balancer service name")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("keepers", AttributeType::list_of(AttributeType::String))
                    .description("Values whose change triggers a new refresh")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(computed("action", AttributeType::String, "Task action"))
            .attribute(computed("status", AttributeType::String, "Final task status"))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.refresh(&ctx, &mut state).await;
        create_response(state, result)
    }

    /// Nothing remote to compare against
    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![],
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, _request: DeleteResourceRequest) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for RefreshResource {
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
