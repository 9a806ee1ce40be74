//! Terraform provider for the OVHcloud API

pub mod api;
pub mod config;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, ServerCapabilities};
use tfplug::{DataSourceWithConfigure, ResourceWithConfigure};

use crate::config::{default_conf_paths, resolve_endpoint, Config};
pub use crate::provider_data::OvhProviderData;

pub struct OvhProvider {
    conf_paths: Vec<PathBuf>,
    provider_data: Option<OvhProviderData>,
}

impl Default for OvhProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OvhProvider {
    pub fn new() -> Self {
        Self::with_conf_paths(default_conf_paths())
    }

    /// Reads `ovh.conf` from the given locations instead of the usual ones
    pub fn with_conf_paths(conf_paths: Vec<PathBuf>) -> Self {
        Self {
            conf_paths,
            provider_data: None,
        }
    }

    pub fn provider_data(&self) -> Option<&OvhProviderData> {
        self.provider_data.as_ref()
    }
}

fn resource<R: ResourceWithConfigure + Default + 'static>() -> ResourceFactory {
    Box::new(|| Box::new(R::default()) as Box<dyn ResourceWithConfigure>)
}

fn data_source<D: DataSourceWithConfigure + Default + 'static>() -> DataSourceFactory {
    Box::new(|| Box::new(D::default()) as Box<dyn DataSourceWithConfigure>)
}

fn setting(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .build()
}

fn secret(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .sensitive()
        .build()
}

#[async_trait]
impl Provider for OvhProvider {
    fn type_name(&self) -> &str {
        "ovh"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities {
                plan_destroy: true,
                get_provider_schema_optional: false,
                move_resource_state: false,
            },
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("OVHcloud provider")
            .attribute(setting(
                "endpoint",
                "API endpoint name (ovh-eu, ovh-ca, ovh-us, ...) or URL. Env: OVH_ENDPOINT",
            ))
            .attribute(setting("application_key", "Application key. Env: OVH_APPLICATION_KEY"))
            .attribute(secret(
                "application_secret",
                "Application secret. Env: OVH_APPLICATION_SECRET",
            ))
            .attribute(secret("consumer_key", "Consumer key. Env: OVH_CONSUMER_KEY"))
            .attribute(setting("client_id", "OAuth2 client ID. Env: OVH_CLIENT_ID"))
            .attribute(secret("client_secret", "OAuth2 client secret. Env: OVH_CLIENT_SECRET"))
            .attribute(secret("access_token", "OAuth2 access token. Env: OVH_ACCESS_TOKEN"))
            .attribute(setting(
                "user_agent_extra",
                "Text appended to the User-Agent header. Env: OVH_USER_AGENT_EXTRA",
            ))
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    /// Checks what can be checked without the environment or `ovh.conf`
    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = Vec::new();
        let config = Config::from_provider_config(&request.config);

        if let Some(endpoint) = &config.endpoint {
            if let Err(e) = resolve_endpoint(endpoint) {
                diagnostics.push(
                    Diagnostic::error("Invalid endpoint", e.to_string())
                        .with_attribute(AttributePath::new("endpoint")),
                );
            }
        }

        let key = config.application_key.is_some() || config.application_secret.is_some();
        let oauth2 = config.client_id.is_some() || config.client_secret.is_some();
        let token = config.access_token.is_some();
        if [key, oauth2, token].iter().filter(|set| **set).count() > 1 {
            diagnostics.push(Diagnostic::error(
                "Conflicting credentials",
                "Use only one of application_key/application_secret, client_id/client_secret or access_token",
            ));
        }

        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::info!(
            "Configuring OVH provider for Terraform {}",
            request.terraform_version
        );

        let mut config = Config::from_provider_config(&request.config);
        config.merge_env();
        if let Err(e) = config.merge_conf_file(&self.conf_paths) {
            tracing::error!("{}", e);
            return ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error("Invalid ovh.conf", e.to_string())],
                provider_data: None,
            };
        }

        match config.load_and_validate().await {
            Ok(client) => {
                let data = OvhProviderData::new(client);
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => {
                tracing::error!("Provider configuration failed: {}", e);
                ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Failed to configure OVH provider",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        use crate::resources::*;

        HashMap::from([
            ("ovh_me_ssh_key".to_string(), resource::<SshKeyResource>()),
            ("ovh_domain_zone_record".to_string(), resource::<ZoneRecordResource>()),
            ("ovh_cloud_project_kube".to_string(), resource::<KubeResource>()),
            (
                "ovh_cloud_project_kube_nodepool".to_string(),
                resource::<KubeNodePoolResource>(),
            ),
            ("ovh_cloud_project_database".to_string(), resource::<DatabaseResource>()),
            (
                "ovh_cloud_project_database_user".to_string(),
                resource::<DatabaseUserResource>(),
            ),
            (
                "ovh_cloud_project_containerregistry".to_string(),
                resource::<ContainerRegistryResource>(),
            ),
            (
                "ovh_cloud_project_containerregistry_user".to_string(),
                resource::<ContainerRegistryUserResource>(),
            ),
            ("ovh_cloud_project_user".to_string(), resource::<CloudProjectUserResource>()),
            ("ovh_iploadbalancing_http_farm".to_string(), resource::<HttpFarmResource>()),
            (
                "ovh_iploadbalancing_http_farm_server".to_string(),
                resource::<HttpFarmServerResource>(),
            ),
            ("ovh_iploadbalancing_refresh".to_string(), resource::<RefreshResource>()),
            ("ovh_iam_policy".to_string(), resource::<IamPolicyResource>()),
            (
                "ovh_dedicated_server_update".to_string(),
                resource::<DedicatedServerUpdateResource>(),
            ),
            (
                "ovh_dedicated_server_reboot_task".to_string(),
                resource::<RebootTaskResource>(),
            ),
            ("ovh_vrack_cloudproject".to_string(), resource::<VrackCloudProjectResource>()),
        ])
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        use crate::data_sources::*;

        HashMap::from([
            ("ovh_me".to_string(), data_source::<MeDataSource>()),
            ("ovh_domain_zone".to_string(), data_source::<DomainZoneDataSource>()),
            ("ovh_cloud_project_kube".to_string(), data_source::<KubeDataSource>()),
            ("ovh_cloud_project_database".to_string(), data_source::<DatabaseDataSource>()),
            (
                "ovh_cloud_project_containerregistry".to_string(),
                data_source::<ContainerRegistryDataSource>(),
            ),
            ("ovh_iam_policy".to_string(), data_source::<IamPolicyDataSource>()),
            ("ovh_iam_policies".to_string(), data_source::<IamPoliciesDataSource>()),
            ("ovh_dedicated_server".to_string(), data_source::<DedicatedServerDataSource>()),
            ("ovh_dedicated_servers".to_string(), data_source::<DedicatedServersDataSource>()),
            ("ovh_iploadbalancing".to_string(), data_source::<IpLoadbalancingDataSource>()),
        ])
    }
}
