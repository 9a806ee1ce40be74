//! Managed private registry lookup

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, data_source_response, required_string,
    service_name,
};

#[derive(Default)]
pub struct ContainerRegistryDataSource {
    provider_data: Option<OvhProviderData>,
}

impl ContainerRegistryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_registry(&self, config: DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut state = config;
        let service_name = service_name(&mut state)?;
        let registry_id = required_string(&state, "registry_id")?;

        let registry = client
            .cloud_project(&service_name)
            .container_registry()
            .get(&registry_id)
            .await
            .map_err(|e| api_diagnostic("Failed to read container registry", &e))?;
        registry.apply_to_state(&mut state);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for ContainerRegistryDataSource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_containerregistry"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Gets a managed private registry")
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Public Cloud project identifier")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("registry_id", AttributeType::String)
                    .description("Registry identifier")
                    .required()
                    .build(),
            )
            .attribute(computed("id", AttributeType::String, "Registry identifier"))
            .attribute(computed("name", AttributeType::String, "Registry name"))
            .attribute(computed("region", AttributeType::String, "Region"))
            .attribute(computed("status", AttributeType::String, "Registry status"))
            .attribute(computed("url", AttributeType::String, "Registry URL"))
            .attribute(computed("version", AttributeType::String, "Harbor version"))
            .attribute(computed("size", AttributeType::Number, "Storage used in bytes"))
            .attribute(computed("project_id", AttributeType::String, "Owning project"))
            .attribute(computed("created_at", AttributeType::String, "Creation date"))
            .attribute(computed("updated_at", AttributeType::String, "Last update date"))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_registry(request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for ContainerRegistryDataSource {
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
    use tfplug::types::AttributePath;

    #[tokio::test]
    async fn missing_registry_id_is_reported() {
        let server = mockito::Server::new_async().await;
        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        let data_source = ContainerRegistryDataSource {
            provider_data: Some(OvhProviderData::new(client)),
        };
        let mut config = DynamicValue::object();
        let _ = config.set_string(&AttributePath::new("service_name"), "abc123".to_string());

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_cloud_project_containerregistry".to_string(),
                    config,
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Missing registry_id");
    }

    #[tokio::test]
    async fn read_maps_registry() {
        let mut server = mockito::Server::new_async().await;
        let _registry = server
            .mock("GET", "/cloud/project/abc123/containerRegistry/reg-1")
            .with_body(
                r#"{"id":"reg-1","name":"images","region":"GRA","status":"READY",
                    "url":"https://xyz.gra7.container-registry.ovh.net","projectID":"abc123"}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        let data_source = ContainerRegistryDataSource {
            provider_data: Some(OvhProviderData::new(client)),
        };
        let mut config = DynamicValue::object();
        let _ = config.set_string(&AttributePath::new("service_name"), "abc123".to_string());
        let _ = config.set_string(&AttributePath::new("registry_id"), "reg-1".to_string());

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_cloud_project_containerregistry".to_string(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.state.get_string(&AttributePath::new("url")).unwrap(),
            "https://xyz.gra7.container-registry.ovh.net"
        );
    }
}
