//! Hard reboot of a dedicated server, replayed whenever `keepers` change

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

const TIMEOUT: Duration = Duration::from_secs(20 * 60);

#[derive(Default)]
pub struct RebootTaskResource {
    provider_data: Option<OvhProviderData>,
}

impl RebootTaskResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn reboot(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let servers = client.dedicated_server();

        tracing::info!("Rebooting dedicated server {}", service_name);
        let task = servers
            .reboot(&service_name)
            .await
            .map_err(|e| api_diagnostic("Failed to reboot dedicated server", &e))?;
        let _ = state.set_string(&AttributePath::new("id"), task.task_id.to_string());

        let conf = StateChangeConf::new(TASK_PENDING, TASK_DONE, TIMEOUT)
            .with_poll_interval(Duration::from_secs(15));
        let servers = &servers;
        let service = service_name.as_str();
        let task_id = task.task_id;
        let done = wait_for_state(ctx, &conf, move || async move {
            let task = servers.task(service, task_id).await?;
            let status = task.status.clone();
            Ok::<_, ApiError>(Some((task, status)))
        })
        .await
        .map_err(|e| wait_diagnostic("Error waiting for dedicated server reboot", &e))?
        .unwrap_or(task);

        done.apply_to_state(state);
        Ok(())
    }
}

#[async_trait]
impl Resource for RebootTaskResource {
    fn type_name(&self) -> &str {
        "ovh_dedicated_server_reboot_task"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Hard reboots a dedicated server")
            .attribute(id_attribute("Reboot task identifier"))
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Dedicated server service name")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("keepers", AttributeType::list_of(AttributeType::String))
                    .description("Values whose change triggers a new reboot")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(computed("function", AttributeType::String, "Task function"))
            .attribute(computed("status", AttributeType::String, "Final task status"))
            .attribute(computed("comment", AttributeType::String, "Task details"))
            .attribute(computed("start_date", AttributeType::String, "Task start date"))
            .attribute(computed("done_date", AttributeType::String, "Task completion date"))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.reboot(&ctx, &mut state).await;
        create_response(state, result)
    }

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
impl ResourceWithConfigure for RebootTaskResource {
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

    fn configured(server: &mockito::Server) -> RebootTaskResource {
        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        RebootTaskResource {
            provider_data: Some(OvhProviderData::new(client)),
        }
    }

    fn planned() -> DynamicValue {
        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("service_name"), "ns123.ip-1-2-3.eu".to_string());
        let _ = state.set_string_list(&AttributePath::new("keepers"), &["kernel-6.1".to_string()]);
        for name in ["id", "function", "status", "comment", "start_date", "done_date"] {
            let _ = state.mark_unknown(&AttributePath::new(name));
        }
        state
    }

    #[tokio::test]
    async fn reboot_records_finished_task() {
        let mut server = mockito::Server::new_async().await;
        let reboot = server
            .mock("POST", "/dedicated/server/ns123.ip-1-2-3.eu/reboot")
            .with_body(r#"{"taskId":4242,"function":"hardReboot","status":"init"}"#)
            .create_async()
            .await;
        let _task = server
            .mock("GET", "/dedicated/server/ns123.ip-1-2-3.eu/task/4242")
            .with_body(
                r#"{"taskId":4242,"function":"hardReboot","status":"done",
                    "startDate":"2024-05-01T10:00:00Z","doneDate":"2024-05-01T10:04:00Z"}"#,
            )
            .create_async()
            .await;

        let response = configured(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_dedicated_server_reboot_task".to_string(),
                    planned_state: planned(),
                    config: planned(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        reboot.assert_async().await;
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "4242");
        assert_eq!(
            state.get_string(&AttributePath::new("done_date")).unwrap(),
            "2024-05-01T10:04:00Z"
        );
        assert!(!state.has_unknowns());
    }

    #[tokio::test]
    async fn customer_error_fails_and_keeps_task_id() {
        let mut server = mockito::Server::new_async().await;
        let _reboot = server
            .mock("POST", "/dedicated/server/ns123.ip-1-2-3.eu/reboot")
            .with_body(r#"{"taskId":4243,"function":"hardReboot","status":"init"}"#)
            .create_async()
            .await;
        let _task = server
            .mock("GET", "/dedicated/server/ns123.ip-1-2-3.eu/task/4243")
            .with_body(r#"{"taskId":4243,"function":"hardReboot","status":"customerError"}"#)
            .create_async()
            .await;

        let response = configured(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_dedicated_server_reboot_task".to_string(),
                    planned_state: planned(),
                    config: planned(),
                },
            )
            .await;

        assert_eq!(
            response.diagnostics[0].summary,
            "Error waiting for dedicated server reboot"
        );
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            "4243"
        );
    }
}
