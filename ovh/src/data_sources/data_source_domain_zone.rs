//! DNS zone lookup by name

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
};

#[derive(Default)]
pub struct DomainZoneDataSource {
    provider_data: Option<OvhProviderData>,
}

impl DomainZoneDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_zone(&self, config: DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let name = required_string(&config, "name")?;
        let zone = client
            .domain()
            .zone(&name)
            .await
            .map_err(|e| api_diagnostic("Failed to read DNS zone", &e))?;

        let mut state = config;
        zone.apply_to_state(&mut state);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for DomainZoneDataSource {
    fn type_name(&self) -> &str {
        "ovh_domain_zone"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Gets a DNS zone")
            .attribute(computed("id", AttributeType::String, "Zone name"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Zone name, e.g. example.com")
                    .required()
                    .build(),
            )
            .attribute(computed("has_dns_anycast", AttributeType::Bool, "Whether anycast DNS is enabled"))
            .attribute(computed("dnssec_supported", AttributeType::Bool, "Whether DNSSEC is supported"))
            .attribute(computed(
                "name_servers",
                AttributeType::list_of(AttributeType::String),
                "Name servers serving the zone",
            ))
            .attribute(computed("last_update", AttributeType::String, "Last modification date"))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_zone(request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for DomainZoneDataSource {
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
    async fn read_returns_name_servers() {
        let mut server = mockito::Server::new_async().await;
        let _zone = server
            .mock("GET", "/domain/zone/example.com")
            .with_body(
                r#"{"name":"example.com","hasDnsAnycast":false,"dnssecSupported":true,
                    "nameServers":["dns10.ovh.net","ns10.ovh.net"]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        let data_source = DomainZoneDataSource {
            provider_data: Some(OvhProviderData::new(client)),
        };
        let mut config = DynamicValue::object();
        let _ = config.set_string(&AttributePath::new("name"), "example.com".to_string());

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_domain_zone".to_string(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.state.get_string_list(&AttributePath::new("name_servers")).unwrap(),
            vec!["dns10.ovh.net".to_string(), "ns10.ovh.net".to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_zone_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _zone = server
            .mock("GET", "/domain/zone/missing.com")
            .with_status(404)
            .with_body(r#"{"class":"Client::NotFound","message":"This service does not exist"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        let data_source = DomainZoneDataSource {
            provider_data: Some(OvhProviderData::new(client)),
        };
        let mut config = DynamicValue::object();
        let _ = config.set_string(&AttributePath::new("name"), "missing.com".to_string());

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_domain_zone".to_string(),
                    config,
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to read DNS zone");
        assert!(response.diagnostics[0].detail.contains("This service does not exist"));
    }
}
