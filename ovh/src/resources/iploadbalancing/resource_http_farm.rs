//! HTTP farm of an IP Load Balancer

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, StringOneOfValidator};

use crate::api::iploadbalancing::{
    HttpFarmRequest, HealthCheck, BALANCE_MODES, HEALTH_CHECK_MATCHES, HEALTH_CHECK_METHODS, HEALTH_CHECK_TYPES,
    STICKINESS_MODES,
};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, configure_response, create_response, delete_response, id_attribute,
    ignore_not_found, import_composite_id, numeric_id, opt_i64, opt_string, read_response,
    required_string, update_response,
};

#[derive(Default)]
pub struct HttpFarmResource {
    provider_data: Option<OvhProviderData>,
}

fn farm_request(state: &DynamicValue) -> HttpFarmRequest {
    HttpFarmRequest {
        zone: opt_string(state, "zone"),
        port: opt_i64(state, "port"),
        balance: opt_string(state, "balance"),
        stickiness: opt_string(state, "stickiness"),
        display_name: opt_string(state, "display_name"),
        vrack_network_id: opt_i64(state, "vrack_network_id"),
        health_check: HealthCheck::from_state(state),
    }
}

impl HttpFarmResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_farm(&self, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let request = farm_request(state);

        tracing::info!("Creating HTTP farm on load balancer {}", service_name);
        let farm = client
            .ip_loadbalancing(&service_name)
            .http_farms()
            .create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create HTTP farm", &e))?;
        farm.apply_to_state(state);
        Ok(())
    }

    async fn read_farm(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let farm_id = numeric_id(state, "id")?;

        match client.ip_loadbalancing(&service_name).http_farms().get(farm_id).await {
            Ok(farm) => {
                let mut new_state = state.clone();
                farm.apply_to_state(&mut new_state);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("HTTP farm {} no longer exists", farm_id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read HTTP farm", &e)),
        }
    }

    async fn update_farm(&self, prior_state: &DynamicValue, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = required_string(state, "service_name")?;
        let farm_id = numeric_id(prior_state, "id")?;
        let farms = client.ip_loadbalancing(&service_name).http_farms();

        // zone is fixed at creation
        let request = HttpFarmRequest {
            zone: None,
            ..farm_request(state)
        };

        farms
            .update(farm_id, &request)
            .await
            .map_err(|e| api_diagnostic("Failed to update HTTP farm", &e))?;
        let farm = farms
            .get(farm_id)
            .await
            .map_err(|e| api_diagnostic("Failed to read HTTP farm", &e))?;
        farm.apply_to_state(state);
        Ok(())
    }
}

#[async_trait]
impl Resource for HttpFarmResource {
    fn type_name(&self) -> &str {
        "ovh_iploadbalancing_http_farm"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let health_check = NestedBlockBuilder::new("probe", NestingMode::List)
            .description("Health check of the farm servers")
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Health check type")
                    .required()
                    .validator(StringOneOfValidator::new(HEALTH_CHECK_TYPES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port", AttributeType::Number)
                    .description("Port to check; defaults to the server port")
                    .optional()
                    .validator(NumberRangeValidator::between(1.0, 65535.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("interval", AttributeType::Number)
                    .description("Seconds between checks (30 to 3600)")
                    .optional()
                    .validator(NumberRangeValidator::between(30.0, 3600.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("match", AttributeType::String)
                    .description("How the response is matched against the pattern")
                    .optional()
                    .validator(StringOneOfValidator::new(HEALTH_CHECK_MATCHES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("pattern", AttributeType::String)
                    .description("Pattern to match")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("force_ssl", AttributeType::Bool)
                    .description("Check over SSL")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("URL to request for HTTP checks")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("method", AttributeType::String)
                    .description("HTTP method")
                    .optional()
                    .validator(StringOneOfValidator::new(HEALTH_CHECK_METHODS))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("negate", AttributeType::Bool)
                    .description("Invert the match")
                    .optional()
                    .build(),
            )
            .max_items(1)
            .build();

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an HTTP farm of an IP Load Balancer")
            .attribute(id_attribute("Farm identifier"))
            .attribute(
                AttributeBuilder::new("service_name", AttributeType::String)
                    .description("Load balancer service name")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("zone", AttributeType::String)
                    .description("Zone of the farm, or 'all'")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port", AttributeType::Number)
                    .description("Port of the backend servers")
                    .optional()
                    .validator(NumberRangeValidator::between(1.0, 65535.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("balance", AttributeType::String)
                    .description("Load balancing algorithm")
                    .optional()
                    .validator(StringOneOfValidator::new(BALANCE_MODES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("stickiness", AttributeType::String)
                    .description("Session stickiness")
                    .optional()
                    .validator(StringOneOfValidator::new(STICKINESS_MODES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("Human readable name")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vrack_network_id", AttributeType::Number)
                    .description("vRack network of the backend servers")
                    .optional()
                    .build(),
            )
            .block(health_check)
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.create_farm(&mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_farm(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = self.update_farm(&request.prior_state, &mut new_state).await;
        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result = async {
            let client = client(&self.provider_data)?;
            let service_name = required_string(&request.prior_state, "service_name")?;
            let farm_id = numeric_id(&request.prior_state, "id")?;
            ignore_not_found(
                client
                    .ip_loadbalancing(&service_name)
                    .http_farms()
                    .delete(farm_id)
                    .await,
            )
            .map_err(|e| api_diagnostic("Failed to delete HTTP farm", &e))
        }
        .await;

        delete_response(result)
    }

    /// Import ID is `<service_name>/<farm id>`
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(&request, '/', &["service_name", "id"], "service_name/farm_id")
    }
}

#[async_trait]
impl ResourceWithConfigure for HttpFarmResource {
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
    use std::collections::HashMap;
    use tfplug::types::{AttributePath, Dynamic};

    const FARMS: &str = "/ipLoadbalancing/loadbalancer-1/http/farm";

    fn configured(server: &mockito::Server) -> HttpFarmResource {
        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        HttpFarmResource {
            provider_data: Some(OvhProviderData::new(client)),
        }
    }

    fn planned() -> DynamicValue {
        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("service_name"), "loadbalancer-1".to_string());
        let _ = state.set_string(&AttributePath::new("zone"), "all".to_string());
        let _ = state.set_number(&AttributePath::new("port"), 8080.0);
        let _ = state.set_string(&AttributePath::new("balance"), "roundrobin".to_string());
        let _ = state.set_list(
            &AttributePath::new("probe"),
            vec![Dynamic::Map(HashMap::from([
                ("type".to_string(), Dynamic::String("http".to_string())),
                ("url".to_string(), Dynamic::String("/health".to_string())),
                ("interval".to_string(), Dynamic::Number(30.0)),
            ]))],
        );
        let _ = state.mark_unknown(&AttributePath::new("id"));
        state
    }

    #[tokio::test]
    async fn create_sends_health_check_object() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", FARMS)
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "zone": "all",
                "port": 8080,
                "balance": "roundrobin",
                "probe": {"type": "http", "url": "/health", "interval": 30}
            })))
            .with_body(
                r#"{"farmId":42,"zone":"all","port":8080,"balance":"roundrobin",
                    "probe":{"type":"http","url":"/health","interval":30}}"#,
            )
            .create_async()
            .await;

        let response = configured(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_iploadbalancing_http_farm".to_string(),
                    planned_state: planned(),
                    config: planned(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        create.assert_async().await;
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "42");
        assert_eq!(
            state
                .get_string(&AttributePath::new("probe").index(0).attribute("url"))
                .unwrap(),
            "/health"
        );
    }

    #[tokio::test]
    async fn update_never_sends_zone() {
        let mut server = mockito::Server::new_async().await;
        let update = server
            .mock("PUT", format!("{}/42", FARMS).as_str())
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "port": 8080,
                "balance": "leastconn",
                "probe": {"type": "http", "url": "/health", "interval": 30}
            })))
            .with_body("null")
            .create_async()
            .await;
        let _get = server
            .mock("GET", format!("{}/42", FARMS).as_str())
            .with_body(r#"{"farmId":42,"zone":"all","port":8080,"balance":"leastconn"}"#)
            .create_async()
            .await;

        let mut prior = planned();
        let _ = prior.set_string(&AttributePath::new("id"), "42".to_string());
        let mut new = prior.clone();
        let _ = new.set_string(&AttributePath::new("balance"), "leastconn".to_string());

        let response = configured(&server)
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "ovh_iploadbalancing_http_farm".to_string(),
                    prior_state: prior,
                    planned_state: new.clone(),
                    config: new,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        update.assert_async().await;
    }

    #[tokio::test]
    async fn non_numeric_id_fails_read() {
        let server = mockito::Server::new_async().await;
        let mut state = planned();
        let _ = state.set_string(&AttributePath::new("id"), "farm-a".to_string());

        let response = configured(&server)
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "ovh_iploadbalancing_http_farm".to_string(),
                    current_state: state,
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Invalid identifier");
    }
}
