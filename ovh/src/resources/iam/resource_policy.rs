//! IAM policy granting actions on resources to identities

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::{ListLengthValidator, StringLengthValidator};

use crate::api::iam::{Permissions, PolicyRequest};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, create_response, delete_response,
    id_attribute, ignore_not_found, missing_attribute, opt_string, opt_string_list,
    read_response, required_string, update_response,
};

#[derive(Default)]
pub struct IamPolicyResource {
    provider_data: Option<OvhProviderData>,
}

fn policy_request(state: &DynamicValue) -> Result<PolicyRequest, Diagnostic> {
    let identities = opt_string_list(state, "identities").ok_or_else(|| missing_attribute("identities"))?;
    let resources = opt_string_list(state, "resources").ok_or_else(|| missing_attribute("resources"))?;
    let list = |name: &str| opt_string_list(state, name).unwrap_or_default();

    let mut request = PolicyRequest::new(required_string(state, "name")?, identities, resources);
    request.description = opt_string(state, "description");
    request.permissions = Permissions::new(&list("allow"), &list("except"), &list("deny"));
    Ok(request)
}

fn action_list(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::set_of(AttributeType::String))
        .description(description)
        .optional()
        .build()
}

impl IamPolicyResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_policy(&self, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let request = policy_request(state)?;

        tracing::info!("Creating IAM policy {}", request.name);
        let policy = client
            .iam()
            .create_policy(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create IAM policy", &e))?;
        policy.apply_to_state(state);
        Ok(())
    }

    async fn read_policy(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let id = required_string(state, "id")?;

        match client.iam().get_policy(&id).await {
            Ok(policy) => {
                let mut new_state = state.clone();
                policy.apply_to_state(&mut new_state);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("IAM policy {} no longer exists", id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read IAM policy", &e)),
        }
    }

    async fn update_policy(&self, prior_state: &DynamicValue, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let id = required_string(prior_state, "id")?;
        let request = policy_request(state)?;

        let policy = client
            .iam()
            .update_policy(&id, &request)
            .await
            .map_err(|e| api_diagnostic("Failed to update IAM policy", &e))?;
        policy.apply_to_state(state);
        Ok(())
    }
}

#[async_trait]
impl Resource for IamPolicyResource {
    fn type_name(&self) -> &str {
        "ovh_iam_policy"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an IAM policy")
            .attribute(id_attribute("Policy identifier"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Policy name")
                    .required()
                    .validator(StringLengthValidator::between(1, 255))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Policy description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("identities", AttributeType::set_of(AttributeType::String))
                    .description("URNs of the users, groups or accounts the policy applies to")
                    .required()
                    .validator(ListLengthValidator::at_least(1))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("resources", AttributeType::set_of(AttributeType::String))
                    .description("URNs of the resources the policy covers")
                    .required()
                    .validator(ListLengthValidator::at_least(1))
                    .build(),
            )
            .attribute(action_list("allow", "Actions granted on the resources"))
            .attribute(action_list("except", "Actions removed from the allowed wildcards"))
            .attribute(action_list("deny", "Actions explicitly denied"))
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("Creation date")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(computed("updated_at", AttributeType::String, "Last update date"))
            .attribute(
                AttributeBuilder::new("read_only", AttributeType::Bool)
                    .description("Whether the policy is managed by OVHcloud")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("owner", AttributeType::String)
                    .description("Account owning the policy")
                    .computed()
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
        let result = self.create_policy(&mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_policy(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = self.update_policy(&request.prior_state, &mut new_state).await;
        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result = async {
            let client = client(&self.provider_data)?;
            let id = required_string(&request.prior_state, "id")?;
            ignore_not_found(client.iam().delete_policy(&id).await)
                .map_err(|e| api_diagnostic("Failed to delete IAM policy", &e))
        }
        .await;

        delete_response(result)
    }
}

#[async_trait]
impl ResourceWithConfigure for IamPolicyResource {
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
