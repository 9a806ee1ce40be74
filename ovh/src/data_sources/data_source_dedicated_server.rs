//! Dedicated server lookups: one server by service name, or all service names

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
pub struct DedicatedServerDataSource {
    provider_data: Option<OvhProviderData>,
}

impl DedicatedServerDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_server(&self, config: DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(&config, "service_name")?;
        let server = client
            .dedicated_server()
            .get(&service_name)
            .await
            .map_err(|e| api_diagnostic("Failed to read dedicated server", &e))?;

        let mut state = config;
        server.apply_to_state(&mut state);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for DedicatedServerDataSource {
    fn type_name(&self) -> &str {
        "ovh_dedicated_server"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Gets a dedicated server")
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Dedicated server service name")
                    .required()
                    .build(),
            );

        for (name, type_, description) in [
            ("id", AttributeType::String, "Server name"),
            ("name", AttributeType::String, "Server name"),
            ("server_id", AttributeType::Number, "Numeric server identifier"),
            ("boot_id", AttributeType::Number, "Boot netboot identifier"),
            ("commercial_range", AttributeType::String, "Commercial range"),
            ("datacenter", AttributeType::String, "Datacenter"),
            ("ip", AttributeType::String, "Main IPv4 address"),
            ("reverse", AttributeType::String, "Reverse DNS of the main address"),
            ("link_speed", AttributeType::Number, "Link speed in Mbps"),
            ("monitoring", AttributeType::Bool, "Whether OVHcloud monitors the server"),
            ("no_intervention", AttributeType::Bool, "Whether datacenter intervention is disabled"),
            ("os", AttributeType::String, "Installed operating system"),
            ("power_state", AttributeType::String, "Power state"),
            ("professional_use", AttributeType::Bool, "Whether professional use is enabled"),
            ("rack", AttributeType::String, "Rack identifier"),
            ("rescue_mail", AttributeType::String, "Rescue notification email"),
            ("root_device", AttributeType::String, "Root device"),
            ("state", AttributeType::String, "Server state"),
            ("support_level", AttributeType::String, "Support level"),
        ] {
            builder = builder.attribute(computed(name, type_, description));
        }

        DataSourceSchemaResponse {
            schema: builder.build(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_server(request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for DedicatedServerDataSource {
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
pub struct DedicatedServersDataSource {
    provider_data: Option<OvhProviderData>,
}

impl DedicatedServersDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn list_servers(&self) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut names = client
            .dedicated_server()
            .list()
            .await
            .map_err(|e| api_diagnostic("Failed to list dedicated servers", &e))?;
        names.sort();

        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("id"), "dedicated_servers".to_string());
        let _ = state.set_string_list(&AttributePath::new("result"), &names);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for DedicatedServersDataSource {
    fn type_name(&self) -> &str {
        "ovh_dedicated_servers"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the dedicated servers of the account")
            .attribute(computed("id", AttributeType::String, "Placeholder identifier"))
            .attribute(computed(
                "result",
                AttributeType::set_of(AttributeType::String),
                "Server service names",
            ))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.list_servers().await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for DedicatedServersDataSource {
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
    async fn server_read_maps_hardware_details() {
        let mut server = mockito::Server::new_async().await;
        let _get = server
            .mock("GET", "/dedicated/server/ns123.ip-1-2-3.eu")
            .with_body(
                r#"{"name":"ns123.ip-1-2-3.eu","serverId":98765,"datacenter":"rbx8",
                    "ip":"1.2.3.4","linkSpeed":1000,"monitoring":true,"state":"ok"}"#,
            )
            .create_async()
            .await;

        let data_source = DedicatedServerDataSource {
            provider_data: provider_data(&server),
        };
        let mut config = DynamicValue::object();
        let _ = config.set_string(&AttributePath::new("service_name"), "ns123.ip-1-2-3.eu".to_string());

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_dedicated_server".to_string(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.state;
        assert_eq!(state.get_number(&AttributePath::new("server_id")).unwrap(), 98765.0);
        assert_eq!(state.get_string(&AttributePath::new("datacenter")).unwrap(), "rbx8");
        assert!(state.get_bool(&AttributePath::new("monitoring")).unwrap());
    }

    #[tokio::test]
    async fn servers_are_listed_sorted() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/dedicated/server")
            .with_body(r#"["ns2.ip-5-6-7.eu","ns1.ip-1-2-3.eu"]"#)
            .create_async()
            .await;

        let data_source = DedicatedServersDataSource {
            provider_data: provider_data(&server),
        };
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_dedicated_servers".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert_eq!(
            response.state.get_string_list(&AttributePath::new("result")).unwrap(),
            vec!["ns1.ip-1-2-3.eu".to_string(), "ns2.ip-5-6-7.eu".to_string()]
        );
    }
}
