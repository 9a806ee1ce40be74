//! Managed database cluster lookup

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::StringOneOfValidator;

use crate::api::cloud_project::database::{Endpoint, ENGINES};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, data_source_response, required_string,
    service_name,
};

#[derive(Default)]
pub struct DatabaseDataSource {
    provider_data: Option<OvhProviderData>,
}

impl DatabaseDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_database(&self, config: DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut state = config;
        let service_name = service_name(&mut state)?;
        let engine = required_string(&state, "engine")?;
        let id = required_string(&state, "id")?;

        let database = client
            .cloud_project(&service_name)
            .database(&engine)
            .get(&id)
            .await
            .map_err(|e| api_diagnostic("Failed to read database cluster", &e))?;
        database.apply_to_state(&mut state);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for DatabaseDataSource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_database"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Gets a managed database cluster")
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Public Cloud project identifier")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine", AttributeType::String)
                    .description("Database engine")
                    .required()
                    .validator(StringOneOfValidator::new(ENGINES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Cluster identifier")
                    .required()
                    .build(),
            )
            .attribute(computed("description", AttributeType::String, "Cluster description"))
            .attribute(computed("plan", AttributeType::String, "Plan"))
            .attribute(computed("version", AttributeType::String, "Engine version"))
            .attribute(computed("flavor", AttributeType::String, "Node flavor"))
            .attribute(computed("status", AttributeType::String, "Cluster status"))
            .attribute(computed("disk_size", AttributeType::Number, "Disk size in GB"))
            .attribute(computed("disk_type", AttributeType::String, "Disk type"))
            .attribute(computed(
                "endpoints",
                AttributeType::list_of(Endpoint::attribute_type()),
                "Connection endpoints",
            ))
            .attribute(computed("created_at", AttributeType::String, "Creation date"))
            .attribute(computed("maintenance_time", AttributeType::String, "Daily maintenance time"))
            .attribute(computed("backup_time", AttributeType::String, "Daily backup time"))
            .attribute(computed("network_type", AttributeType::String, "public or private"))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_database(request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for DatabaseDataSource {
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
