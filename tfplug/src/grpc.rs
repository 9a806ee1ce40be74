//! gRPC service implementation
//!
//! Bridges the tfplugin6 wire protocol to the Provider/Resource/DataSource
//! traits. Resources and data sources are created per request from their
//! factories; schemas are collected once and cached.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::plan_modifier::values_equal;
use crate::proto;
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, Provider, ProviderMetaSchemaRequest,
    ProviderMetadataRequest, ProviderSchemaRequest, ResourceFactory, StopProviderRequest,
    ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ModifyPlanRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, UpgradeResourceStateRequest,
    ValidateResourceConfigRequest,
};
use crate::schema::{DefaultRequest, NestingMode, PlanModifierRequest, Schema, StringKind};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Diagnostic,
    DiagnosticSeverity, Dynamic, DynamicValue, RawState, ServerCapabilities,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tonic::{Request, Response, Status};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;
type DiagResult<T> = std::result::Result<T, Vec<Diagnostic>>;

struct SchemaCache {
    provider: Schema,
    provider_meta: Option<Schema>,
    resources: HashMap<String, Schema>,
    data_sources: HashMap<String, Schema>,
    diagnostics: Vec<Diagnostic>,
}

/// tfplugin6 `Provider` service backed by a [`Provider`] implementation
pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: RwLock<ProviderData>,
    resource_factories: HashMap<String, ResourceFactory>,
    data_source_factories: HashMap<String, DataSourceFactory>,
    schemas: OnceCell<SchemaCache>,
    ctx: Context,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        Self::with_context(provider, Context::new())
    }

    /// All operations receive clones of `ctx`; StopProvider cancels it
    pub fn with_context(provider: P, ctx: Context) -> Self {
        let resource_factories = provider.resources();
        let data_source_factories = provider.data_sources();

        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: RwLock::new(None),
            resource_factories,
            data_source_factories,
            schemas: OnceCell::new(),
            ctx,
        }
    }

    pub fn context(&self) -> Context {
        self.ctx.clone()
    }

    async fn schemas(&self) -> &SchemaCache {
        self.schemas.get_or_init(|| self.load_schemas()).await
    }

    async fn load_schemas(&self) -> SchemaCache {
        let mut diagnostics = Vec::new();

        let provider = self.provider.read().await;
        let response = provider.schema(self.ctx.clone(), ProviderSchemaRequest).await;
        diagnostics.extend(response.diagnostics);
        let meta = provider
            .meta_schema(self.ctx.clone(), ProviderMetaSchemaRequest)
            .await;
        diagnostics.extend(meta.diagnostics);
        drop(provider);

        let mut resources = HashMap::new();
        for (name, factory) in &self.resource_factories {
            let schema = factory().schema(self.ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(schema.diagnostics);
            resources.insert(name.clone(), schema.schema);
        }

        let mut data_sources = HashMap::new();
        for (name, factory) in &self.data_source_factories {
            let schema = factory()
                .schema(self.ctx.clone(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(schema.diagnostics);
            data_sources.insert(name.clone(), schema.schema);
        }

        tracing::debug!(
            resources = resources.len(),
            data_sources = data_sources.len(),
            "Loaded provider schemas"
        );

        SchemaCache {
            provider: response.schema,
            provider_meta: meta.schema,
            resources,
            data_sources,
            diagnostics,
        }
    }

    async fn resource_schema(&self, type_name: &str) -> DiagResult<&Schema> {
        self.schemas()
            .await
            .resources
            .get(type_name)
            .ok_or_else(|| vec![unknown_type("resource", type_name)])
    }

    async fn data_source_schema(&self, type_name: &str) -> DiagResult<&Schema> {
        self.schemas()
            .await
            .data_sources
            .get(type_name)
            .ok_or_else(|| vec![unknown_type("data source", type_name)])
    }

    fn new_resource(&self, type_name: &str) -> DiagResult<Box<dyn ResourceWithConfigure>> {
        self.resource_factories
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| vec![unknown_type("resource", type_name)])
    }

    fn new_data_source(&self, type_name: &str) -> DiagResult<Box<dyn DataSourceWithConfigure>> {
        self.data_source_factories
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| vec![unknown_type("data source", type_name)])
    }

    async fn configured_resource(
        &self,
        type_name: &str,
    ) -> DiagResult<Box<dyn ResourceWithConfigure>> {
        let mut resource = self.new_resource(type_name)?;
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(self.ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(resource)
    }

    async fn configured_data_source(
        &self,
        type_name: &str,
    ) -> DiagResult<Box<dyn DataSourceWithConfigure>> {
        let mut data_source = self.new_data_source(type_name)?;
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(self.ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(data_source)
    }

    async fn configure(
        &self,
        req: proto::configure_provider::Request,
    ) -> DiagResult<proto::configure_provider::Response> {
        let config = decode(req.config)?;
        let client_capabilities = req
            .client_capabilities
            .map(|caps| ClientCapabilities {
                deferral_allowed: caps.deferral_allowed,
                write_only_attributes_allowed: caps.write_only_attributes_allowed,
            })
            .unwrap_or_default();

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(
                self.ctx.clone(),
                ConfigureProviderRequest {
                    terraform_version: req.terraform_version,
                    config,
                    client_capabilities,
                },
            )
            .await;
        drop(provider);

        if !has_errors(&response.diagnostics) {
            *self.provider_data.write().await = response.provider_data;
            tracing::info!("Provider configured");
        }

        Ok(proto::configure_provider::Response {
            diagnostics: to_proto_diagnostics(&response.diagnostics),
        })
    }

    async fn validate_resource(
        &self,
        req: proto::validate_resource_config::Request,
    ) -> DiagResult<proto::validate_resource_config::Response> {
        let schema = self.resource_schema(&req.type_name).await?;
        let config = decode(req.config)?;

        let mut diagnostics = schema.validate_config(&config);
        if !has_errors(&diagnostics) {
            let resource = self.new_resource(&req.type_name)?;
            let response = resource
                .validate(
                    self.ctx.clone(),
                    ValidateResourceConfigRequest {
                        type_name: req.type_name,
                        config,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(proto::validate_resource_config::Response {
            diagnostics: to_proto_diagnostics(&diagnostics),
        })
    }

    async fn validate_data_source(
        &self,
        req: proto::validate_data_resource_config::Request,
    ) -> DiagResult<proto::validate_data_resource_config::Response> {
        let schema = self.data_source_schema(&req.type_name).await?;
        let config = decode(req.config)?;

        let mut diagnostics = schema.validate_config(&config);
        if !has_errors(&diagnostics) {
            let data_source = self.new_data_source(&req.type_name)?;
            let response = data_source
                .validate(
                    self.ctx.clone(),
                    ValidateDataSourceConfigRequest {
                        type_name: req.type_name,
                        config,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(proto::validate_data_resource_config::Response {
            diagnostics: to_proto_diagnostics(&diagnostics),
        })
    }

    async fn read(
        &self,
        req: proto::read_resource::Request,
    ) -> DiagResult<proto::read_resource::Response> {
        let schema = self.resource_schema(&req.type_name).await?;
        let current_state = decode(req.current_state)?;

        if current_state.is_null() {
            return Ok(proto::read_resource::Response {
                new_state: Some(encode(&current_state)?),
                private: req.private,
                ..Default::default()
            });
        }

        let resource = self.configured_resource(&req.type_name).await?;
        let response = resource
            .read(
                self.ctx.clone(),
                ReadResourceRequest {
                    type_name: req.type_name.clone(),
                    current_state: current_state.clone(),
                },
            )
            .await;

        let new_state = if has_errors(&response.diagnostics) {
            current_state
        } else {
            match response.new_state {
                Some(state) => schema.conform(&state),
                None => {
                    tracing::info!(type_name = %req.type_name, "Resource no longer exists, removing from state");
                    DynamicValue::null()
                }
            }
        };

        Ok(proto::read_resource::Response {
            new_state: Some(encode(&new_state)?),
            diagnostics: to_proto_diagnostics(&response.diagnostics),
            private: req.private,
            ..Default::default()
        })
    }

    async fn plan(
        &self,
        req: proto::plan_resource_change::Request,
    ) -> DiagResult<proto::plan_resource_change::Response> {
        let schema = self.resource_schema(&req.type_name).await?;
        let prior_state = decode(req.prior_state)?;
        let proposed = decode(req.proposed_new_state)?;
        let config = decode(req.config)?;

        // Destroy plans pass through untouched.
        if proposed.is_null() {
            return Ok(proto::plan_resource_change::Response {
                planned_state: Some(encode(&proposed)?),
                planned_private: req.prior_private,
                ..Default::default()
            });
        }

        let mut change = plan_attributes(schema, &prior_state, &proposed, &config);
        if has_errors(&change.diagnostics) {
            return Err(change.diagnostics);
        }

        let resource = self.configured_resource(&req.type_name).await?;
        let modified = resource
            .modify_plan(
                self.ctx.clone(),
                ModifyPlanRequest {
                    type_name: req.type_name,
                    config,
                    prior_state,
                    planned_state: change.planned_state,
                },
            )
            .await;
        change.diagnostics.extend(modified.diagnostics);
        for path in modified.requires_replace {
            if !change.requires_replace.contains(&path) {
                change.requires_replace.push(path);
            }
        }

        let planned_state = schema.conform(&modified.planned_state);

        Ok(proto::plan_resource_change::Response {
            planned_state: Some(encode(&planned_state)?),
            requires_replace: change.requires_replace.iter().map(path_to_proto).collect(),
            planned_private: req.prior_private,
            diagnostics: to_proto_diagnostics(&change.diagnostics),
            ..Default::default()
        })
    }

    async fn apply(
        &self,
        req: proto::apply_resource_change::Request,
    ) -> DiagResult<proto::apply_resource_change::Response> {
        let schema = self.resource_schema(&req.type_name).await?;
        let prior_state = decode(req.prior_state)?;
        let planned_state = decode(req.planned_state)?;
        let config = decode(req.config)?;

        let resource = self.configured_resource(&req.type_name).await?;
        let ctx = self.ctx.clone();
        let type_name = req.type_name.clone();

        let (new_state, diagnostics) = if planned_state.is_null() {
            tracing::info!(type_name = %type_name, "Deleting resource");
            let response = resource
                .delete(
                    ctx,
                    DeleteResourceRequest {
                        type_name,
                        prior_state: prior_state.clone(),
                    },
                )
                .await;
            // A failed delete keeps the resource in state.
            let state = if has_errors(&response.diagnostics) {
                prior_state
            } else {
                DynamicValue::null()
            };
            (state, response.diagnostics)
        } else if prior_state.is_null() {
            tracing::info!(type_name = %type_name, "Creating resource");
            let response = resource
                .create(
                    ctx,
                    CreateResourceRequest {
                        type_name,
                        planned_state,
                        config,
                    },
                )
                .await;
            (response.new_state, response.diagnostics)
        } else {
            tracing::info!(type_name = %type_name, "Updating resource");
            let response = resource
                .update(
                    ctx,
                    UpdateResourceRequest {
                        type_name,
                        prior_state: prior_state.clone(),
                        planned_state,
                        config,
                    },
                )
                .await;
            let state = if has_errors(&response.diagnostics) && response.new_state.is_null() {
                prior_state
            } else {
                response.new_state
            };
            (state, response.diagnostics)
        };

        let mut new_state = if new_state.is_null() {
            new_state
        } else {
            schema.conform(&new_state)
        };
        new_state.unknowns_to_null();

        Ok(proto::apply_resource_change::Response {
            new_state: Some(encode(&new_state)?),
            private: req.planned_private,
            diagnostics: to_proto_diagnostics(&diagnostics),
            ..Default::default()
        })
    }

    async fn import(
        &self,
        req: proto::import_resource_state::Request,
    ) -> DiagResult<proto::import_resource_state::Response> {
        let schema = self.resource_schema(&req.type_name).await?;
        let resource = self.configured_resource(&req.type_name).await?;

        let response = resource
            .import_state(
                self.ctx.clone(),
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                },
            )
            .await;

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in response.imported_resources {
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name,
                state: Some(encode(&schema.conform(&imported.state))?),
                ..Default::default()
            });
        }

        Ok(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: to_proto_diagnostics(&response.diagnostics),
            deferred: None,
        })
    }

    async fn upgrade(
        &self,
        req: proto::upgrade_resource_state::Request,
    ) -> DiagResult<proto::upgrade_resource_state::Response> {
        let schema = self.resource_schema(&req.type_name).await?;
        let resource = self.new_resource(&req.type_name)?;

        let raw_state = req
            .raw_state
            .map(|raw| RawState {
                json: (!raw.json.is_empty()).then_some(raw.json),
                flatmap: (!raw.flatmap.is_empty()).then_some(raw.flatmap),
            })
            .unwrap_or_default();

        let response = resource
            .upgrade_state(
                self.ctx.clone(),
                UpgradeResourceStateRequest {
                    type_name: req.type_name,
                    version: req.version,
                    raw_state,
                },
            )
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }

        let upgraded_state = schema.conform(&response.upgraded_state);
        Ok(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode(&upgraded_state)?),
            diagnostics: to_proto_diagnostics(&response.diagnostics),
        })
    }

    async fn read_data(
        &self,
        req: proto::read_data_source::Request,
    ) -> DiagResult<proto::read_data_source::Response> {
        let schema = self.data_source_schema(&req.type_name).await?;
        let config = decode(req.config)?;
        let data_source = self.configured_data_source(&req.type_name).await?;

        let response = data_source
            .read(
                self.ctx.clone(),
                ReadDataSourceRequest {
                    type_name: req.type_name,
                    config,
                },
            )
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }

        let mut state = schema.conform(&response.state);
        state.unknowns_to_null();

        Ok(proto::read_data_source::Response {
            state: Some(encode(&state)?),
            diagnostics: to_proto_diagnostics(&response.diagnostics),
            deferred: None,
        })
    }
}

/// Result of the framework's attribute-level planning pass
pub(crate) struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Plans top-level attributes in order:
/// 1. defaults for optional+computed attributes left null in config
/// 2. unknown for other computed attributes left null in config, on create,
///    or on an update that changes anything
/// 3. attribute plan modifiers
pub(crate) fn plan_attributes(
    schema: &Schema,
    prior_state: &DynamicValue,
    proposed: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    let is_create = prior_state.is_null();
    let mut planned_state = proposed.clone();
    let mut diagnostics = Vec::new();
    let mut requires_replace = Vec::new();

    let config_null = |path: &AttributePath| {
        config
            .get_dynamic(path)
            .map_or(true, Dynamic::is_null)
    };

    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        if !attr.computed || !config_null(&path) {
            continue;
        }
        if let (true, Some(default)) = (attr.optional, &attr.default) {
            let value = default.default_value(DefaultRequest { path: path.clone() });
            set_planned(&mut planned_state, &path, value.value.value, &mut diagnostics);
        }
    }

    let changed = !is_create && !values_equal(&planned_state.value, &prior_state.value);
    if is_create || changed {
        for attr in &schema.block.attributes {
            let path = AttributePath::new(&attr.name);
            if attr.computed && attr.default.is_none() && config_null(&path) {
                set_planned(&mut planned_state, &path, Dynamic::Unknown, &mut diagnostics);
            }
        }
    }

    for attr in &schema.block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }
        let path = AttributePath::new(&attr.name);
        let value_at = |value: &DynamicValue| {
            DynamicValue::new(value.get_dynamic(&path).cloned().unwrap_or(Dynamic::Null))
        };
        let config_value = value_at(config);
        let state_value = value_at(prior_state);
        let mut plan_value = value_at(&planned_state);

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: config_value.clone(),
                state_value: state_value.clone(),
                plan_value,
                path: path.clone(),
                is_create,
            });
            plan_value = response.plan_value;
            diagnostics.extend(response.diagnostics);
            if response.requires_replace && !requires_replace.contains(&path) {
                requires_replace.push(path.clone());
            }
        }

        set_planned(&mut planned_state, &path, plan_value.value, &mut diagnostics);
    }

    PlannedChange {
        planned_state,
        requires_replace,
        diagnostics,
    }
}

fn set_planned(
    planned: &mut DynamicValue,
    path: &AttributePath,
    value: Dynamic,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Err(e) = planned.set_dynamic(path, value) {
        diagnostics.push(
            Diagnostic::error("Failed to plan attribute", e.to_string())
                .with_attribute(path.clone()),
        );
    }
}

fn unknown_type(kind: &str, type_name: &str) -> Diagnostic {
    Diagnostic::error(
        format!("Unknown {} type", kind),
        format!("This provider does not support the {} type \"{}\"", kind, type_name),
    )
}

fn unsupported(feature: &str) -> Diagnostic {
    Diagnostic::error(
        format!("{} not supported", feature),
        format!("This provider does not implement {}", feature.to_lowercase()),
    )
}

fn decode(value: Option<proto::DynamicValue>) -> DiagResult<DynamicValue> {
    let value = match value {
        Some(value) => value,
        None => return Ok(DynamicValue::null()),
    };

    let decoded = if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack)
    } else {
        DynamicValue::decode_json(&value.json)
    };

    decoded.map_err(|e| vec![Diagnostic::error("Failed to decode value", e.to_string())])
}

fn encode(value: &DynamicValue) -> DiagResult<proto::DynamicValue> {
    let msgpack = value
        .encode_msgpack()
        .map_err(|e| vec![Diagnostic::error("Failed to encode value", e.to_string())])?;

    Ok(proto::DynamicValue {
        msgpack,
        json: Vec::new(),
    })
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::{step::Selector, Step};

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn to_proto_diagnostics(diagnostics: &[Diagnostic]) -> Vec<proto::Diagnostic> {
    diagnostics
        .iter()
        .map(|diag| proto::Diagnostic {
            severity: match diag.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            } as i32,
            summary: diag.summary.clone(),
            detail: diag.detail.clone(),
            attribute: diag.attribute.as_ref().map(path_to_proto),
        })
        .collect()
}

fn string_kind(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn block_to_proto(block: &crate::schema::Block) -> proto::schema::Block {
    use proto::schema::nested_block::NestingMode as ProtoNesting;

    proto::schema::Block {
        version: block.version,
        attributes: block
            .attributes
            .iter()
            .map(|attr| proto::schema::Attribute {
                name: attr.name.clone(),
                r#type: attr.r#type.type_bytes(),
                nested_type: None,
                description: attr.description.clone(),
                required: attr.required,
                optional: attr.optional,
                computed: attr.computed,
                sensitive: attr.sensitive,
                description_kind: proto::StringKind::Plain as i32,
                deprecated: attr.deprecated,
                write_only: false,
            })
            .collect(),
        block_types: block
            .block_types
            .iter()
            .map(|nested| proto::schema::NestedBlock {
                type_name: nested.type_name.clone(),
                block: Some(block_to_proto(&nested.block)),
                nesting: match nested.nesting {
                    NestingMode::Single => ProtoNesting::Single,
                    NestingMode::List => ProtoNesting::List,
                    NestingMode::Set => ProtoNesting::Set,
                } as i32,
                min_items: nested.min_items,
                max_items: nested.max_items,
            })
            .collect(),
        description: block.description.clone(),
        description_kind: string_kind(block.description_kind),
        deprecated: block.deprecated,
    }
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn capabilities_to_proto(caps: &ServerCapabilities) -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: caps.plan_destroy,
        get_provider_schema_optional: caps.get_provider_schema_optional,
        move_resource_state: caps.move_resource_state,
    }
}

/// Responses that can carry nothing but diagnostics
trait DiagnosticsResponse: Default {
    fn with_diagnostics(diagnostics: Vec<proto::Diagnostic>) -> Self;
}

macro_rules! impl_diagnostics_response {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DiagnosticsResponse for $ty {
                fn with_diagnostics(diagnostics: Vec<proto::Diagnostic>) -> Self {
                    Self {
                        diagnostics,
                        ..Default::default()
                    }
                }
            }
        )*
    };
}

impl_diagnostics_response!(
    proto::validate_provider_config::Response,
    proto::validate_resource_config::Response,
    proto::validate_data_resource_config::Response,
    proto::configure_provider::Response,
    proto::read_resource::Response,
    proto::plan_resource_change::Response,
    proto::apply_resource_change::Response,
    proto::import_resource_state::Response,
    proto::move_resource_state::Response,
    proto::upgrade_resource_state::Response,
    proto::upgrade_resource_identity::Response,
    proto::read_data_source::Response,
    proto::validate_ephemeral_resource_config::Response,
    proto::open_ephemeral_resource::Response,
    proto::renew_ephemeral_resource::Response,
    proto::close_ephemeral_resource::Response,
);

#[allow(clippy::result_large_err)]
fn respond<T: DiagnosticsResponse>(
    result: DiagResult<T>,
) -> std::result::Result<Response<T>, Status> {
    Ok(Response::new(result.unwrap_or_else(|diagnostics| {
        T::with_diagnostics(to_proto_diagnostics(&diagnostics))
    })))
}

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> std::result::Result<Response<proto::get_metadata::Response>, Status> {
        let metadata = self
            .provider
            .read()
            .await
            .metadata(self.ctx.clone(), ProviderMetadataRequest)
            .await;

        let mut resources: Vec<_> = self.resource_factories.keys().cloned().collect();
        resources.sort();
        let mut data_sources: Vec<_> = self.data_source_factories.keys().cloned().collect();
        data_sources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(capabilities_to_proto(&metadata.server_capabilities)),
            diagnostics: Vec::new(),
            data_sources: data_sources
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
            functions: Vec::new(),
            ephemeral_resources: Vec::new(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> std::result::Result<Response<proto::get_provider_schema::Response>, Status> {
        tracing::debug!("GetProviderSchema");
        let schemas = self.schemas().await;
        let metadata = self
            .provider
            .read()
            .await
            .metadata(self.ctx.clone(), ProviderMetadataRequest)
            .await;

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&schemas.provider)),
            resource_schemas: schemas
                .resources
                .iter()
                .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
                .collect(),
            data_source_schemas: schemas
                .data_sources
                .iter()
                .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
                .collect(),
            functions: HashMap::new(),
            ephemeral_resource_schemas: HashMap::new(),
            diagnostics: to_proto_diagnostics(&schemas.diagnostics),
            provider_meta: schemas.provider_meta.as_ref().map(schema_to_proto),
            server_capabilities: Some(capabilities_to_proto(&metadata.server_capabilities)),
        }))
    }

    async fn get_resource_identity_schemas(
        &self,
        _request: Request<proto::get_resource_identity_schemas::Request>,
    ) -> std::result::Result<Response<proto::get_resource_identity_schemas::Response>, Status>
    {
        Ok(Response::new(proto::get_resource_identity_schemas::Response {
            identity_schemas: HashMap::new(),
            diagnostics: Vec::new(),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> std::result::Result<Response<proto::validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let result: DiagResult<_> = async {
            let config = decode(req.config)?;
            let mut diagnostics = self.schemas().await.provider.validate_config(&config);
            let response = self
                .provider
                .read()
                .await
                .validate(self.ctx.clone(), ValidateProviderConfigRequest { config })
                .await;
            diagnostics.extend(response.diagnostics);
            Ok(proto::validate_provider_config::Response {
                diagnostics: to_proto_diagnostics(&diagnostics),
            })
        }
        .await;
        respond(result)
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_resource_config::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ValidateResourceConfig");
        respond(self.validate_resource(req).await)
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_data_resource_config::Response>, Status>
    {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ValidateDataResourceConfig");
        respond(self.validate_data_source(req).await)
    }

    async fn validate_ephemeral_resource_config(
        &self,
        _request: Request<proto::validate_ephemeral_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_ephemeral_resource_config::Response>, Status>
    {
        respond(Err(vec![unsupported("Ephemeral resources")]))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> std::result::Result<Response<proto::configure_provider::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(terraform_version = %req.terraform_version, "ConfigureProvider");
        respond(self.configure(req).await)
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> std::result::Result<Response<proto::stop_provider::Response>, Status> {
        tracing::info!("StopProvider received, cancelling in-flight operations");
        let response = self
            .provider
            .read()
            .await
            .stop(self.ctx.clone(), StopProviderRequest)
            .await;
        self.ctx.cancel();

        Ok(Response::new(proto::stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> std::result::Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, version = req.version, "UpgradeResourceState");
        respond(self.upgrade(req).await)
    }

    async fn upgrade_resource_identity(
        &self,
        _request: Request<proto::upgrade_resource_identity::Request>,
    ) -> std::result::Result<Response<proto::upgrade_resource_identity::Response>, Status> {
        respond(Err(vec![unsupported("Resource identity")]))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> std::result::Result<Response<proto::read_resource::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ReadResource");
        respond(self.read(req).await)
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> std::result::Result<Response<proto::plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "PlanResourceChange");
        respond(self.plan(req).await)
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> std::result::Result<Response<proto::apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ApplyResourceChange");
        respond(self.apply(req).await)
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> std::result::Result<Response<proto::import_resource_state::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, id = %req.id, "ImportResourceState");
        respond(self.import(req).await)
    }

    async fn move_resource_state(
        &self,
        _request: Request<proto::move_resource_state::Request>,
    ) -> std::result::Result<Response<proto::move_resource_state::Response>, Status> {
        respond(Err(vec![unsupported("Moving resource state")]))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> std::result::Result<Response<proto::read_data_source::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ReadDataSource");
        respond(self.read_data(req).await)
    }

    async fn get_functions(
        &self,
        _request: Request<proto::get_functions::Request>,
    ) -> std::result::Result<Response<proto::get_functions::Response>, Status> {
        Ok(Response::new(proto::get_functions::Response {
            functions: HashMap::new(),
            diagnostics: Vec::new(),
        }))
    }

    async fn call_function(
        &self,
        request: Request<proto::call_function::Request>,
    ) -> std::result::Result<Response<proto::call_function::Response>, Status> {
        let req = request.into_inner();
        Ok(Response::new(proto::call_function::Response {
            result: None,
            error: Some(proto::FunctionError {
                text: format!("Function \"{}\" is not implemented by this provider", req.name),
                function_argument: None,
            }),
        }))
    }

    async fn open_ephemeral_resource(
        &self,
        _request: Request<proto::open_ephemeral_resource::Request>,
    ) -> std::result::Result<Response<proto::open_ephemeral_resource::Response>, Status> {
        respond(Err(vec![unsupported("Ephemeral resources")]))
    }

    async fn renew_ephemeral_resource(
        &self,
        _request: Request<proto::renew_ephemeral_resource::Request>,
    ) -> std::result::Result<Response<proto::renew_ephemeral_resource::Response>, Status> {
        respond(Err(vec![unsupported("Ephemeral resources")]))
    }

    async fn close_ephemeral_resource(
        &self,
        _request: Request<proto::close_ephemeral_resource::Request>,
    ) -> std::result::Result<Response<proto::close_ephemeral_resource::Response>, Status> {
        respond(Err(vec![unsupported("Ephemeral resources")]))
    }
}
