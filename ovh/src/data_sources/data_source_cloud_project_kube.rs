//! Managed Kubernetes cluster lookup

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
pub struct KubeDataSource {
    provider_data: Option<OvhProviderData>,
}

impl KubeDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_kube(&self, config: DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut state = config;
        let service_name = service_name(&mut state)?;
        let kube_id = required_string(&state, "kube_id")?;

        let kube = client
            .cloud_project(&service_name)
            .kube()
            .get(&kube_id)
            .await
            .map_err(|e| api_diagnostic("Failed to read Kubernetes cluster", &e))?;
        kube.apply_to_state(&mut state);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for KubeDataSource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_kube"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Gets a managed Kubernetes cluster")
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Public Cloud project identifier")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("kube_id", AttributeType::String)
                    .description("Cluster identifier")
                    .required()
                    .build(),
            )
            .attribute(computed("id", AttributeType::String, "Cluster identifier"))
            .attribute(computed("name", AttributeType::String, "Cluster name"))
            .attribute(computed("region", AttributeType::String, "Region"))
            .attribute(computed("version", AttributeType::String, "Kubernetes minor version"))
            .attribute(computed("status", AttributeType::String, "Cluster status"))
            .attribute(computed("url", AttributeType::String, "API server URL"))
            .attribute(computed("nodes_url", AttributeType::String, "Nodes domain"))
            .attribute(computed(
                "control_plane_is_up_to_date",
                AttributeType::Bool,
                "Whether the control plane runs the latest patch",
            ))
            .attribute(computed("is_up_to_date", AttributeType::Bool, "Whether all nodes are up to date"))
            .attribute(computed(
                "next_upgrade_versions",
                AttributeType::list_of(AttributeType::String),
                "Versions available for upgrade",
            ))
            .attribute(computed("update_policy", AttributeType::String, "Patch update policy"))
            .attribute(computed("private_network_id", AttributeType::String, "Attached private network"))
            .attribute(computed("kube_proxy_mode", AttributeType::String, "kube-proxy mode"))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_kube(request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for KubeDataSource {
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
