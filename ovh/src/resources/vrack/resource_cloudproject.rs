//! Attachment of a Public Cloud project to a vRack

use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::vrack::{Task, VrackApi};
use crate::api::{wait_for_state, StateChangeConf, WaitError, DELETED, TASK_PENDING};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, configure_response, create_response, delete_response, id_attribute,
    import_composite_id, read_response, refresh_result, required_string, wait_diagnostic,
};

const TIMEOUT: Duration = Duration::from_secs(20 * 60);

#[derive(Default)]
pub struct VrackCloudProjectResource {
    provider_data: Option<OvhProviderData>,
}

fn attachment_id(service_name: &str, project_id: &str) -> String {
    format!("vrack_{}-cloudproject_{}", service_name, project_id)
}

/// Completed vRack tasks are removed, so both `done` and a 404 end the wait
async fn wait_for_task(ctx: &Context, vrack: &VrackApi<'_>, task: &Task) -> Result<(), WaitError> {
    let conf = StateChangeConf::new(TASK_PENDING, &["done", DELETED], TIMEOUT)
        .with_delay(Duration::from_secs(1))
        .with_poll_interval(Duration::from_secs(5));
    let task_id = task.id;
    wait_for_state(ctx, &conf, move || async move {
        refresh_result(vrack.task(task_id).await, |t| t.status.clone())
    })
    .await?;
    Ok(())
}

impl VrackCloudProjectResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn attach(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let project_id = required_string(state, "project_id")?;
        let vrack = client.vrack(&service_name);

        tracing::info!("Attaching cloud project {} to vRack {}", project_id, service_name);
        let task = vrack
            .attach_cloud_project(&project_id)
            .await
            .map_err(|e| api_diagnostic("Failed to attach cloud project to vRack", &e))?;
        let _ = state.set_string(
            &AttributePath::new("id"),
            attachment_id(&service_name, &project_id),
        );

        wait_for_task(ctx, &vrack, &task)
            .await
            .map_err(|e| wait_diagnostic("Error waiting for vRack attachment", &e))
    }

    async fn read_attachment(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let project_id = required_string(state, "project_id")?;

        match client.vrack(&service_name).cloud_project(&project_id).await {
            Ok(attachment) => {
                let mut new_state = state.clone();
                let _ = new_state.set_string(
                    &AttributePath::new("id"),
                    attachment_id(&attachment.vrack, &attachment.project),
                );
                let _ = new_state.set_string(&AttributePath::new("service_name"), attachment.vrack);
                let _ = new_state.set_string(&AttributePath::new("project_id"), attachment.project);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Cloud project {} is no longer attached to vRack {}", project_id, service_name);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read vRack attachment", &e)),
        }
    }

    async fn detach(&self, ctx: &Context, state: &DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let project_id = required_string(state, "project_id")?;
        let vrack = client.vrack(&service_name);

        tracing::info!("Detaching cloud project {} from vRack {}", project_id, service_name);
        let task = match vrack.detach_cloud_project(&project_id).await {
            Ok(task) => task,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(api_diagnostic("Failed to detach cloud project from vRack", &e)),
        };

        wait_for_task(ctx, &vrack, &task)
            .await
            .map_err(|e| wait_diagnostic("Error waiting for vRack detachment", &e))
    }
}

#[async_trait]
impl Resource for VrackCloudProjectResource {
    fn type_name(&self) -> &str {
        "ovh_vrack_cloudproject"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Attaches a Public Cloud project to a vRack")
            .attribute(id_attribute("Attachment identifier"))
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("vRack service name")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Public Cloud project identifier")
                    .required()
                    .plan_modifier(RequiresReplace)
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
        let result = self.attach(&ctx, &mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_attachment(&request.current_state).await;
        read_response(request.current_state, result)
    }

    /// Every attribute forces replacement
    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.detach(&ctx, &request.prior_state).await)
    }

    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(
            &request,
            '/',
            &["service_name", "project_id"],
            "service_name/project_id",
        )
    }
}

#[async_trait]
impl ResourceWithConfigure for VrackCloudProjectResource {
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

    fn configured(server: &mockito::Server) -> VrackCloudProjectResource {
        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        VrackCloudProjectResource {
            provider_data: Some(OvhProviderData::new(client)),
        }
    }

    fn planned() -> DynamicValue {
        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("service_name"), "pn-1234".to_string());
        let _ = state.set_string(&AttributePath::new("project_id"), "abc123".to_string());
        let _ = state.mark_unknown(&AttributePath::new("id"));
        state
    }

    #[tokio::test]
    async fn attach_finishes_when_task_disappears() {
        let mut server = mockito::Server::new_async().await;
        let attach = server
            .mock("POST", "/vrack/pn-1234/cloudProject")
            .match_body(mockito::Matcher::Json(serde_json::json!({"project": "abc123"})))
            .with_body(r#"{"id":77,"function":"addCloudProjectToVrack","status":"init"}"#)
            .create_async()
            .await;
        let _task = server
            .mock("GET", "/vrack/pn-1234/task/77")
            .with_status(404)
            .with_body(r#"{"class":"Client::NotFound","message":"The requested object (id = 77) does not exist"}"#)
            .create_async()
            .await;

        let response = configured(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_vrack_cloudproject".to_string(),
                    planned_state: planned(),
                    config: planned(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        attach.assert_async().await;
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            "vrack_pn-1234-cloudproject_abc123"
        );
    }

    #[tokio::test]
    async fn detach_of_missing_attachment_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let _detach = server
            .mock("DELETE", "/vrack/pn-1234/cloudProject/abc123")
            .with_status(404)
            .with_body(r#"{"class":"Client::NotFound","message":"not attached"}"#)
            .create_async()
            .await;

        let mut prior = planned();
        let _ = prior.set_string(
            &AttributePath::new("id"),
            "vrack_pn-1234-cloudproject_abc123".to_string(),
        );

        let response = configured(&server)
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "ovh_vrack_cloudproject".to_string(),
                    prior_state: prior,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    }

    #[tokio::test]
    async fn import_splits_vrack_and_project() {
        let response = VrackCloudProjectResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "ovh_vrack_cloudproject".to_string(),
                    id: "pn-1234/abc123".to_string(),
                },
            )
            .await;

        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("service_name")).unwrap(), "pn-1234");
        assert_eq!(state.get_string(&AttributePath::new("project_id")).unwrap(), "abc123");
    }
}
