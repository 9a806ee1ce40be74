//! IP Load Balancer lookup by service name

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
pub struct IpLoadbalancingDataSource {
    provider_data: Option<OvhProviderData>,
}

impl IpLoadbalancingDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_service(&self, config: DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(&config, "service_name")?;
        let service = client
            .ip_loadbalancing(&service_name)
            .get()
            .await
            .map_err(|e| api_diagnostic("Failed to read load balancer", &e))?;

        let mut state = config;
        service.apply_to_state(&mut state);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for IpLoadbalancingDataSource {
    fn type_name(&self) -> &str {
        "ovh_iploadbalancing"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Gets an IP Load Balancer")
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Load balancer service name")
                    .required()
                    .build(),
            )
            .attribute(computed("id", AttributeType::String, "Service name"))
            .attribute(computed("display_name", AttributeType::String, "Display name"))
            .attribute(computed("ip_loadbalancing", AttributeType::String, "Load balancer identifier"))
            .attribute(computed("ipv4", AttributeType::String, "Frontend IPv4"))
            .attribute(computed("ipv6", AttributeType::String, "Frontend IPv6"))
            .attribute(computed(
                "zone",
                AttributeType::list_of(AttributeType::String),
                "Zones the service runs in",
            ))
            .attribute(computed("offer", AttributeType::String, "Commercial offer"))
            .attribute(computed("state", AttributeType::String, "Service state"))
            .attribute(computed("ssl_configuration", AttributeType::String, "TLS cipher configuration"))
            .attribute(computed("vrack_eligibility", AttributeType::Bool, "Whether a vRack can be attached"))
            .attribute(computed("vrack_name", AttributeType::String, "Attached vRack"))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_service(request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for IpLoadbalancingDataSource {
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
