//! IAM policy lookups: one policy by id, or the ids of all policies

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, data_source_response, required_string,
};

#[derive(Default)]
pub struct IamPolicyDataSource {
    provider_data: Option<OvhProviderData>,
}

impl IamPolicyDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_policy(&self, config: DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let id = required_string(&config, "id")?;
        let policy = client
            .iam()
            .get_policy(&id)
            .await
            .map_err(|e| api_diagnostic("Failed to read IAM policy", &e))?;

        let mut state = config;
        policy.apply_to_state(&mut state);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for IamPolicyDataSource {
    fn type_name(&self) -> &str {
        "ovh_iam_policy"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let strings = || AttributeType::set_of(AttributeType::String);
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Gets an IAM policy")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Policy identifier")
                    .required()
                    .build(),
            )
            .attribute(computed("name", AttributeType::String, "Policy name"))
            .attribute(computed("description", AttributeType::String, "Policy description"))
            .attribute(computed("identities", strings(), "Identities the policy applies to"))
            .attribute(computed("resources", strings(), "Resources the policy covers"))
            .attribute(computed("allow", strings(), "Allowed actions"))
            .attribute(computed("except", strings(), "Actions removed from the allowed wildcards"))
            .attribute(computed("deny", strings(), "Denied actions"))
            .attribute(computed("created_at", AttributeType::String, "Creation date"))
            .attribute(computed("updated_at", AttributeType::String, "Last update date"))
            .attribute(computed("read_only", AttributeType::Bool, "Whether OVHcloud manages the policy"))
            .attribute(computed("owner", AttributeType::String, "Owning account"))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_policy(request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for IamPolicyDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        ConfigureDataSourceResponse {
            diagnostics: configure_response(&mut self.provider_data, request.provider_data),
        }
    }
}

#[derive(Default)]
pub struct IamPoliciesDataSource {
    provider_data: Option<OvhProviderData>,
}

impl IamPoliciesDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn list_policies(&self) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let policies = client
            .iam()
            .list_policies()
            .await
            .map_err(|e| api_diagnostic("Failed to list IAM policies", &e))?;

        let mut ids: Vec<String> = policies.into_iter().map(|policy| policy.id).collect();
        ids.sort();

        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("id"), "iam_policies".to_string());
        let _ = state.set_string_list(&AttributePath::new("policies"), &ids);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for IamPoliciesDataSource {
    fn type_name(&self) -> &str {
        "ovh_iam_policies"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the IAM policies of the account")
            .attribute(computed("id", AttributeType::String, "Placeholder identifier"))
            .attribute(computed(
                "policies",
                AttributeType::set_of(AttributeType::String),
                "Policy identifiers",
            ))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.list_policies().await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for IamPoliciesDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        ConfigureDataSourceResponse {
            diagnostics: configure_response(&mut self.provider_data, request.provider_data),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::{Client, Credentials};

    fn provider_data(server: &mockito::Server) -> Option<OvhProviderData> {
        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        Some(OvhProviderData::new(client))
    }

    #[tokio::test]
    async fn policies_are_listed_by_id() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/v2/iam/policy")
            .with_body(r#"[{"id":"pol-b","name":"b"},{"id":"pol-a","name":"a"}]"#)
            .create_async()
            .await;

        let data_source = IamPoliciesDataSource {
            provider_data: provider_data(&server),
        };
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_iam_policies".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.state.get_string_list(&AttributePath::new("policies")).unwrap(),
            vec!["pol-a".to_string(), "pol-b".to_string()]
        );
    }

    #[tokio::test]
    async fn policy_read_maps_permissions() {
        let mut server = mockito::Server::new_async().await;
        let _policy = server
            .mock("GET", "/v2/iam/policy/pol-a")
            .with_body(
                r#"{"id":"pol-a","name":"a","identities":["urn:v1:eu:identity:account:xx1111-ovh"],
                    "resources":[{"urn":"urn:v1:eu:resource:vrack:pn-1234"}],
                    "permissions":{"allow":[{"action":"vrack:apiovh:*"}]},"readOnly":true}"#,
            )
            .create_async()
            .await;

        let data_source = IamPolicyDataSource {
            provider_data: provider_data(&server),
        };
        let mut config = DynamicValue::object();
        let _ = config.set_string(&AttributePath::new("id"), "pol-a".to_string());

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_iam_policy".to_string(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.state;
        assert_eq!(
            state.get_string_list(&AttributePath::new("allow")).unwrap(),
            vec!["vrack:apiovh:*".to_string()]
        );
        assert!(state.get_bool(&AttributePath::new("read_only")).unwrap());
    }
}
