//! Backend server of an IP Load Balancer HTTP farm

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::invalid_import_id;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, StringOneOfValidator};

use crate::api::iploadbalancing::{FarmServerRequest, PROXY_PROTOCOL_VERSIONS, SERVER_STATUSES};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, configure_response, create_response, delete_response, id_attribute,
    ignore_not_found, import_composite_id, missing_attribute, numeric_id, opt_bool, opt_i64,
    opt_string, read_response, required_string, update_response,
};

#[derive(Default)]
pub struct HttpFarmServerResource {
    provider_data: Option<OvhProviderData>,
}

fn farm_id(state: &DynamicValue) -> Result<i64, Diagnostic> {
    opt_i64(state, "farm_id").ok_or_else(|| missing_attribute("farm_id"))
}

fn server_request(state: &DynamicValue) -> Result<FarmServerRequest, Diagnostic> {
    Ok(FarmServerRequest {
        address: opt_string(state, "address"),
        status: required_string(state, "status")?,
        port: opt_i64(state, "port"),
        display_name: opt_string(state, "display_name"),
        weight: opt_i64(state, "weight"),
        ssl: opt_bool(state, "ssl"),
        backup: opt_bool(state, "backup"),
        health_checked: opt_bool(state, "probe"),
        proxy_protocol_version: opt_string(state, "proxy_protocol_version"),
    })
}

impl HttpFarmServerResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_server(&self, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let farm_id = farm_id(state)?;
        let request = server_request(state)?;

        tracing::info!("Adding server {:?} to HTTP farm {}", request.address, farm_id);
        let server = client
            .ip_loadbalancing(&service_name)
            .http_farms()
            .servers(farm_id)
            .create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create farm server", &e))?;
        server.apply_to_state(state);
        Ok(())
    }

    async fn read_server(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let farm_id = farm_id(state)?;
        let server_id = numeric_id(state, "id")?;

        match client
            .ip_loadbalancing(&service_name)
            .http_farms()
            .servers(farm_id)
            .get(server_id)
            .await
        {
            Ok(server) => {
                let mut new_state = state.clone();
                server.apply_to_state(&mut new_state);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Farm server {} no longer exists", server_id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read farm server", &e)),
        }
    }

    async fn update_server(&self, prior_state: &DynamicValue, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let farm_id = farm_id(state)?;
        let server_id = numeric_id(prior_state, "id")?;
        let servers = client
            .ip_loadbalancing(&service_name)
            .http_farms()
            .servers(farm_id);

        // address is fixed at creation
        let request = FarmServerRequest {
            address: None,
            ..server_request(state)?
        };
        servers
            .update(server_id, &request)
            .await
            .map_err(|e| api_diagnostic("Failed to update farm server", &e))?;
        let server = servers
            .get(server_id)
            .await
            .map_err(|e| api_diagnostic("Failed to read farm server", &e))?;
        server.apply_to_state(state);
        Ok(())
    }
}

#[async_trait]
impl Resource for HttpFarmServerResource {
    fn type_name(&self) -> &str {
        "ovh_iploadbalancing_http_farm_server"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a backend server of an IP Load Balancer HTTP farm")
            .attribute(id_attribute("Server identifier"))
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Load balancer service name")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("farm_id", AttributeType::Number)
                    .description("HTTP farm identifier")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("address", AttributeType::String)
                    .description("IPv4 address of the backend")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("active or inactive")
                    .required()
                    .validator(StringOneOfValidator::new(SERVER_STATUSES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port", AttributeType::Number)
                    .description("Port of the backend; defaults to the farm port")
                    .optional()
                    .validator(NumberRangeValidator::between(1.0, 65535.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("Human readable name")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("weight", AttributeType::Number)
                    .description("Balancing weight")
                    .optional()
                    .computed()
                    .validator(NumberRangeValidator::between(1.0, 256.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ssl", AttributeType::Bool)
                    .description("Talk to the backend over SSL")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("backup", AttributeType::Bool)
                    .description("Only use this server when the others are down")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("probe", AttributeType::Bool)
                    .description("Health check this server with the farm check settings")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("proxy_protocol_version", AttributeType::String)
                    .description("PROXY protocol version sent to the backend")
                    .optional()
                    .validator(StringOneOfValidator::new(PROXY_PROTOCOL_VERSIONS))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cookie", AttributeType::String)
                    .description("Stickiness cookie value")
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
        let result = self.create_server(&mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_server(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = self.update_server(&request.prior_state, &mut new_state).await;
        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result = async {
            let client = client(&self.provider_data)?;
            let service_name = required_string(&request.prior_state, "service_name")?;
            let farm_id = farm_id(&request.prior_state)?;
            let server_id = numeric_id(&request.prior_state, "id")?;
            let servers = client
                .ip_loadbalancing(&service_name)
                .http_farms()
                .servers(farm_id);
            ignore_not_found(servers.delete(server_id).await)
                .map_err(|e| api_diagnostic("Failed to delete farm server", &e))
        }
        .await;

        delete_response(result)
    }

    /// Import ID is `<service_name>/<farm_id>/<server id>`
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = import_composite_id(
            &request,
            '/',
            &["service_name", "farm_id", "id"],
            "service_name/farm_id/server_id",
        );
        for imported in &mut response.imported_resources {
            let farm = imported.state.get_string(&AttributePath::new("farm_id")).ok();
            match farm.as_deref().map(str::parse::<i64>) {
                Some(Ok(id)) => {
                    let _ = imported.state.set_number(&AttributePath::new("farm_id"), id as f64);
                }
                _ => response
                    .diagnostics
                    .push(invalid_import_id(&request.id, "service_name/farm_id/server_id with a numeric farm_id")),
            }
        }
        if !response.diagnostics.is_empty() {
            response.imported_resources.clear();
        }
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for HttpFarmServerResource {
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

    const SERVERS: &str = "/ipLoadbalancing/loadbalancer-1/http/farm/42/server";

    fn configured(server: &mockito::Server) -> HttpFarmServerResource {
        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        HttpFarmServerResource {
            provider_data: Some(OvhProviderData::new(client)),
        }
    }

    fn planned() -> DynamicValue {
        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("service_name"), "loadbalancer-1".to_string());
        let _ = state.set_number(&AttributePath::new("farm_id"), 42.0);
        let _ = state.set_string(&AttributePath::new("address"), "10.0.0.11".to_string());
        let _ = state.set_string(&AttributePath::new("status"), "active".to_string());
        let _ = state.set_number(&AttributePath::new("port"), 80.0);
        let _ = state.mark_unknown(&AttributePath::new("id"));
        state
    }

    fn server_json(status: &str) -> String {
        format!(
            r#"{{"serverId":7,"address":"10.0.0.11","status":"{}","port":80,"weight":1,
                "ssl":false,"backup":false,"probe":false,"cookie":"c7"}}"#,
            status
        )
    }

    #[tokio::test]
    async fn create_fills_server_defaults() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", SERVERS)
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "address": "10.0.0.11",
                "status": "active",
                "port": 80
            })))
            .with_body(server_json("active"))
            .create_async()
            .await;

        let response = configured(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_iploadbalancing_http_farm_server".to_string(),
                    planned_state: planned(),
                    config: planned(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        create.assert_async().await;
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "7");
        assert_eq!(state.get_i64(&AttributePath::new("weight")).unwrap(), 1);
        assert_eq!(state.get_string(&AttributePath::new("cookie")).unwrap(), "c7");
    }

    #[tokio::test]
    async fn update_changes_status_without_address() {
        let mut server = mockito::Server::new_async().await;
        let update = server
            .mock("PUT", format!("{}/7", SERVERS).as_str())
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "status": "inactive",
                "port": 80
            })))
            .with_body("null")
            .create_async()
            .await;
        let _get = server
            .mock("GET", format!("{}/7", SERVERS).as_str())
            .with_body(server_json("inactive"))
            .create_async()
            .await;

        let mut prior = planned();
        let _ = prior.set_string(&AttributePath::new("id"), "7".to_string());
        let mut new = prior.clone();
        let _ = new.set_string(&AttributePath::new("status"), "inactive".to_string());

        let response = configured(&server)
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "ovh_iploadbalancing_http_farm_server".to_string(),
                    prior_state: prior,
                    planned_state: new.clone(),
                    config: new,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        update.assert_async().await;
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("status")).unwrap(),
            "inactive"
        );
    }

    #[tokio::test]
    async fn import_converts_farm_id_to_number() {
        let response = HttpFarmServerResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "ovh_iploadbalancing_http_farm_server".to_string(),
                    id: "loadbalancer-1/42/7".to_string(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_i64(&AttributePath::new("farm_id")).unwrap(), 42);

        let invalid = HttpFarmServerResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "ovh_iploadbalancing_http_farm_server".to_string(),
                    id: "loadbalancer-1/web/7".to_string(),
                },
            )
            .await;
        assert!(invalid.imported_resources.is_empty());
        assert_eq!(invalid.diagnostics[0].summary, "Invalid import ID");
    }
}
