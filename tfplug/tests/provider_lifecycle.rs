//! Drives a provider through the gRPC service the way Terraform does

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use tfplug::context::Context;
use tfplug::grpc::GrpcProviderServer;
use tfplug::proto::{self, ProviderService};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue, ServerCapabilities};
use tonic::Request;

// Track concurrent operations
#[derive(Default)]
struct OperationStats {
    in_flight: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl OperationStats {
    fn start_operation(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(current, Ordering::SeqCst);
    }

    fn end_operation(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FarmResource {
    stats: Arc<OperationStats>,
    token: Option<String>,
}

#[async_trait]
impl Resource for FarmResource {
    fn type_name(&self) -> &str {
        "lab_farm"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("delay_ms", AttributeType::Number)
                        .required()
                        .build(),
                )
                .block(
                    NestedBlockBuilder::new("check", NestingMode::List)
                        .attribute(
                            AttributeBuilder::new("url", AttributeType::String)
                                .optional()
                                .build(),
                        )
                        .attribute(
                            AttributeBuilder::new("interval", AttributeType::Number)
                                .optional()
                                .build(),
                        )
                        .max_items(1)
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let delay = request
            .planned_state
            .get_number(&AttributePath::new("delay_ms"))
            .unwrap_or(0.0) as u64;

        self.stats.start_operation();
        let finished = tokio::select! {
            _ = sleep(Duration::from_millis(delay)) => true,
            _ = ctx.cancelled() => false,
        };
        self.stats.end_operation();

        if !finished {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics: vec![Diagnostic::error("Operation cancelled", "Provider is stopping")],
            };
        }

        let mut state = request.planned_state;
        state
            .set_string(
                &AttributePath::new("id"),
                format!("farm-{}", self.token.clone().unwrap_or_default()),
            )
            .unwrap();
        CreateResourceResponse {
            new_state: state,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![],
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, _request: DeleteResourceRequest) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for FarmResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        self.token = request
            .provider_data
            .and_then(|data| data.downcast_ref::<String>().cloned());
        ConfigureResourceResponse {
            diagnostics: vec![],
        }
    }
}

struct LabProvider {
    stats: Arc<OperationStats>,
}

#[async_trait]
impl Provider for LabProvider {
    fn type_name(&self) -> &str {
        "lab"
    }

    async fn metadata(&self, _ctx: Context, _request: ProviderMetadataRequest) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "lab".to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("token", AttributeType::String)
                        .required()
                        .sensitive()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        match request.config.get_string(&AttributePath::new("token")) {
            Ok(token) => ConfigureProviderResponse {
                diagnostics: vec![],
                provider_data: Some(Arc::new(token)),
            },
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error("Missing token", e.to_string())],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let stats = self.stats.clone();
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "lab_farm".to_string(),
            Box::new(move || {
                Box::new(FarmResource {
                    stats: stats.clone(),
                    token: None,
                }) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        HashMap::new()
    }
}

fn msgpack(value: Dynamic) -> Option<proto::DynamicValue> {
    Some(proto::DynamicValue {
        msgpack: DynamicValue::new(value).encode_msgpack().unwrap(),
        json: vec![],
    })
}

fn farm_config(delay_ms: f64) -> Dynamic {
    Dynamic::Map(HashMap::from([
        ("id".to_string(), Dynamic::Null),
        ("delay_ms".to_string(), Dynamic::Number(delay_ms)),
        ("check".to_string(), Dynamic::List(vec![])),
    ]))
}

async fn configured(stats: Arc<OperationStats>) -> Arc<GrpcProviderServer<LabProvider>> {
    let server = Arc::new(GrpcProviderServer::new(LabProvider { stats }));
    let response = server
        .configure_provider(Request::new(proto::configure_provider::Request {
            terraform_version: "1.9.0".to_string(),
            config: msgpack(Dynamic::Map(HashMap::from([(
                "token".to_string(),
                Dynamic::String("t0k3n".to_string()),
            )]))),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(response.diagnostics.is_empty());
    server
}

async fn apply_create(
    server: &GrpcProviderServer<LabProvider>,
    delay_ms: f64,
) -> proto::apply_resource_change::Response {
    server
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "lab_farm".to_string(),
            prior_state: msgpack(Dynamic::Null),
            planned_state: msgpack(farm_config(delay_ms)),
            config: msgpack(farm_config(delay_ms)),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner()
}

#[tokio::test]
async fn concurrent_applies_run_in_parallel() {
    let stats = Arc::new(OperationStats::default());
    let server = configured(stats.clone()).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let server = server.clone();
        handles.push(tokio::spawn(async move { apply_create(&server, 100.0).await }));
    }

    for handle in handles {
        let response = handle.await.unwrap();
        assert!(response.diagnostics.is_empty());
        let state = DynamicValue::decode_msgpack(&response.new_state.unwrap().msgpack).unwrap();
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "farm-t0k3n");
    }

    assert!(stats.max_concurrent.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn stop_provider_cancels_running_apply() {
    let stats = Arc::new(OperationStats::default());
    let server = configured(stats).await;

    let running = {
        let server = server.clone();
        tokio::spawn(async move { apply_create(&server, 60_000.0).await })
    };
    sleep(Duration::from_millis(50)).await;

    server
        .stop_provider(Request::new(proto::stop_provider::Request {}))
        .await
        .unwrap();

    let response = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("apply should return after StopProvider")
        .unwrap();
    assert_eq!(response.diagnostics[0].summary, "Operation cancelled");
    let state = DynamicValue::decode_msgpack(&response.new_state.unwrap().msgpack).unwrap();
    assert!(state.is_null());
}

#[tokio::test]
async fn plan_fills_absent_blocks_with_empty_lists() {
    let server = configured(Arc::new(OperationStats::default())).await;
    let config = Dynamic::Map(HashMap::from([
        ("id".to_string(), Dynamic::Null),
        ("delay_ms".to_string(), Dynamic::Number(1.0)),
    ]));

    let response = server
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "lab_farm".to_string(),
            prior_state: msgpack(Dynamic::Null),
            proposed_new_state: msgpack(config.clone()),
            config: msgpack(config),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();

    let planned = DynamicValue::decode_msgpack(&response.planned_state.unwrap().msgpack).unwrap();
    assert_eq!(planned.get_list(&AttributePath::new("check")).unwrap(), vec![]);
    assert_eq!(planned.get_dynamic(&AttributePath::new("id")), Some(&Dynamic::Unknown));
}

#[tokio::test]
async fn provider_validation_requires_token() {
    let server = configured(Arc::new(OperationStats::default())).await;
    let response = server
        .validate_provider_config(Request::new(proto::validate_provider_config::Request {
            config: msgpack(Dynamic::Map(HashMap::from([(
                "token".to_string(),
                Dynamic::Null,
            )]))),
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Missing required argument");
}

#[tokio::test]
async fn nested_block_items_are_validated() {
    let server = configured(Arc::new(OperationStats::default())).await;
    let check = Dynamic::Map(HashMap::from([
        ("url".to_string(), Dynamic::String("/health".to_string())),
        ("interval".to_string(), Dynamic::String("often".to_string())),
    ]));
    let config = Dynamic::Map(HashMap::from([
        ("delay_ms".to_string(), Dynamic::Number(1.0)),
        ("check".to_string(), Dynamic::List(vec![check])),
    ]));

    let response = server
        .validate_resource_config(Request::new(proto::validate_resource_config::Request {
            type_name: "lab_farm".to_string(),
            config: msgpack(config),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    let steps = &response.diagnostics[0].attribute.as_ref().unwrap().steps;
    assert_eq!(steps.len(), 3);
}

