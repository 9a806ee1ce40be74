//! Managed database cluster

use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, StringOneOfValidator};

use crate::api::cloud_project::database::{
    CreateDatabaseRequest, Database, DatabaseApi, Disk, Endpoint, NodeRequest,
    UpdateDatabaseRequest, ENGINES, STATUS_DELETING, STATUS_PENDING, STATUS_READY,
};
use crate::api::{wait_for_state, ApiError, StateChangeConf, CHANGE_PENDING, DELETED};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, create_response, delete_response,
    id_attribute, ignore_not_found, import_composite_id, opt_i64, opt_string, read_response,
    refresh_result, required_string, service_name, service_name_attribute, update_response,
    wait_diagnostic,
};

const CREATE_TIMEOUT: Duration = Duration::from_secs(40 * 60);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(40 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Node fields that cannot change without rebuilding the cluster
const NODE_PLACEMENT: &[&str] = &["region", "subnet_id", "network_id"];

#[derive(Default)]
pub struct DatabaseResource {
    provider_data: Option<OvhProviderData>,
}

fn node_path(index: usize) -> AttributePath {
    AttributePath::new("nodes").index(index as i64)
}

fn node_count(state: &DynamicValue) -> usize {
    state
        .get_list(&AttributePath::new("nodes"))
        .map(|nodes| nodes.len())
        .unwrap_or(0)
}

fn node_field(state: &DynamicValue, index: usize, field: &str) -> Option<String> {
    state
        .get_string(&node_path(index).attribute(field))
        .ok()
        .filter(|value| !value.is_empty())
}

/// Every node of a cluster shares the same flavor
fn nodes_request(state: &DynamicValue, flavor: &str) -> Result<Vec<NodeRequest>, Diagnostic> {
    (0..node_count(state))
        .map(|index| {
            let region = node_field(state, index, "region").ok_or_else(|| {
                Diagnostic::error("Missing node region", "Every node needs a region")
                    .with_attribute(node_path(index).attribute("region"))
            })?;
            Ok(NodeRequest {
                flavor: flavor.to_string(),
                region,
                subnet_id: node_field(state, index, "subnet_id"),
                network_id: node_field(state, index, "network_id"),
            })
        })
        .collect()
}

async fn wait_for_database(
    ctx: &Context,
    databases: &DatabaseApi<'_>,
    cluster_id: &str,
    timeout: Duration,
) -> Result<Option<Database>, Diagnostic> {
    let conf = StateChangeConf::new(STATUS_PENDING, &[STATUS_READY], timeout);
    wait_for_state(ctx, &conf, move || async move {
        refresh_result(databases.get(cluster_id).await, |db| db.status.clone())
    })
    .await
    .map_err(|e| wait_diagnostic("Error waiting for database cluster to be ready", &e))
}

impl DatabaseResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_database(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let engine = required_string(state, "engine")?;
        let flavor = required_string(state, "flavor")?;
        let request = CreateDatabaseRequest {
            description: opt_string(state, "description"),
            plan: required_string(state, "plan")?,
            version: required_string(state, "version")?,
            nodes_list: nodes_request(state, &flavor)?,
            disk: opt_i64(state, "disk_size").map(|size| Disk {
                size: Some(size),
                disk_type: None,
            }),
        };

        tracing::info!(
            "Creating {} database cluster with {} nodes",
            engine,
            request.nodes_list.len()
        );
        let databases = client.cloud_project(&service_name).database(&engine);
        let database = databases
            .create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create database cluster", &e))?;
        let cluster_id = database.id.clone();
        let _ = state.set_string(&AttributePath::new("id"), cluster_id.clone());

        let database = wait_for_database(ctx, &databases, &cluster_id, CREATE_TIMEOUT)
            .await?
            .unwrap_or(database);
        database.apply_to_state(state);
        Ok(())
    }

    async fn read_database(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut new_state = state.clone();
        let service_name = service_name(&mut new_state)?;
        let engine = required_string(state, "engine")?;
        let cluster_id = required_string(state, "id")?;

        let databases = client.cloud_project(&service_name).database(&engine);
        match databases.get(&cluster_id).await {
            Ok(database) => {
                database.apply_to_state(&mut new_state);
                let nodes = databases
                    .nodes(&cluster_id)
                    .await
                    .map_err(|e| api_diagnostic("Failed to read database nodes", &e))?;
                let _ = new_state.set_list(&AttributePath::new("nodes"), database.node_values(&nodes));
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Database cluster {} no longer exists", cluster_id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read database cluster", &e)),
        }
    }

    async fn update_database(
        &self,
        ctx: &Context,
        prior_state: &DynamicValue,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let engine = required_string(state, "engine")?;
        let cluster_id = required_string(prior_state, "id")?;

        let changed = |name: &str| {
            opt_string(state, name).filter(|value| opt_string(prior_state, name).as_ref() != Some(value))
        };
        let mut request = UpdateDatabaseRequest {
            description: changed("description"),
            plan: changed("plan"),
            flavor: changed("flavor"),
            version: changed("version"),
            ..Default::default()
        };
        let disk_size = opt_i64(state, "disk_size");
        if disk_size.is_some() && disk_size != opt_i64(prior_state, "disk_size") {
            request.disk = Some(Disk {
                size: disk_size,
                disk_type: None,
            });
        }
        let nodes = node_count(state);
        if nodes != node_count(prior_state) {
            request.node_number = Some(nodes as i64);
        }

        let databases = client.cloud_project(&service_name).database(&engine);
        databases
            .update(&cluster_id, &request)
            .await
            .map_err(|e| api_diagnostic("Failed to update database cluster", &e))?;

        let mut pending = STATUS_PENDING.to_vec();
        pending.push(CHANGE_PENDING);
        let conf = StateChangeConf::new(&pending, &[STATUS_READY], UPDATE_TIMEOUT);
        let (databases, cluster_id, request) = (&databases, cluster_id.as_str(), &request);
        let database = wait_for_state(ctx, &conf, move || async move {
            let database = databases.get(cluster_id).await?;
            let status = if database.status == STATUS_READY && !request.is_applied_to(&database) {
                CHANGE_PENDING.to_string()
            } else {
                database.status.clone()
            };
            Ok::<_, ApiError>(Some((database, status)))
        })
        .await
        .map_err(|e| wait_diagnostic("Error waiting for database cluster update", &e))?
        .ok_or_else(|| {
            Diagnostic::error(
                "Database cluster disappeared",
                format!("Cluster {} was deleted during the update", cluster_id),
            )
        })?;
        database.apply_to_state(state);
        Ok(())
    }

    async fn delete_database(&self, ctx: &Context, state: &DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut state = state.clone();
        let service_name = service_name(&mut state)?;
        let engine = required_string(&state, "engine")?;
        let cluster_id = required_string(&state, "id")?;

        let databases = client.cloud_project(&service_name).database(&engine);
        ignore_not_found(databases.delete(&cluster_id).await)
            .map_err(|e| api_diagnostic("Failed to delete database cluster", &e))?;

        let mut pending = STATUS_DELETING.to_vec();
        pending.push(STATUS_READY);
        let conf = StateChangeConf::new(&pending, &[DELETED], DELETE_TIMEOUT);
        let databases = &databases;
        let cluster_id = cluster_id.as_str();
        wait_for_state(ctx, &conf, move || async move {
            refresh_result(databases.get(cluster_id).await, |db| db.status.clone())
        })
        .await
        .map_err(|e| wait_diagnostic("Error waiting for database cluster deletion", &e))?;
        Ok(())
    }
}

#[async_trait]
impl Resource for DatabaseResource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_database"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let nodes = NestedBlockBuilder::new("nodes", NestingMode::List)
            .description("Nodes of the cluster; adding or removing nodes resizes it in place")
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Region of the node")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("subnet_id", AttributeType::String)
                    .description("Private subnet of the node")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("network_id", AttributeType::String)
                    .description("Private network of the node")
                    .optional()
                    .build(),
            )
            .min_items(1)
            .build();

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a managed database cluster of a Public Cloud project")
            .attribute(id_attribute("Cluster identifier"))
            .attribute(service_name_attribute("Public Cloud project identifier"))
            .attribute(
                AttributeBuilder::new("engine", AttributeType::String)
                    .description("Database engine")
                    .required()
                    .validator(StringOneOfValidator::new(ENGINES))
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Description of the cluster")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("plan", AttributeType::String)
                    .description("Plan, e.g. essential, business or enterprise")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("version", AttributeType::String)
                    .description("Engine version")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("flavor", AttributeType::String)
                    .description("Flavor of every node, e.g. db1-4")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disk_size", AttributeType::Number)
                    .description("Disk size in GB")
                    .optional()
                    .computed()
                    .validator(NumberRangeValidator::at_least(1.0))
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(computed("disk_type", AttributeType::String, "Disk type"))
            .attribute(computed(
                "endpoints",
                AttributeType::list_of(Endpoint::attribute_type()),
                "Connection endpoints",
            ))
            .attribute(computed("status", AttributeType::String, "Cluster status"))
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("Creation date")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(computed("maintenance_time", AttributeType::String, "Daily maintenance time"))
            .attribute(computed("backup_time", AttributeType::String, "Daily backup time"))
            .attribute(computed("network_type", AttributeType::String, "public or private"))
            .block(nodes)
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    /// Moving a node to another region or network rebuilds the cluster
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut requires_replace = Vec::new();
        if !request.prior_state.is_null() && !request.planned_state.is_null() {
            let shared = node_count(&request.prior_state).min(node_count(&request.planned_state));
            for index in 0..shared {
                for field in NODE_PLACEMENT {
                    if node_field(&request.prior_state, index, field)
                        != node_field(&request.planned_state, index, field)
                    {
                        requires_replace.push(node_path(index).attribute(field));
                    }
                }
            }
        }

        ModifyPlanResponse {
            planned_state: request.planned_state,
            requires_replace,
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.create_database(&ctx, &mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_database(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = self
            .update_database(&ctx, &request.prior_state, &mut new_state)
            .await;
        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_database(&ctx, &request.prior_state).await)
    }

    /// Import ID is `<service_name>/<engine>/<cluster id>`
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(
            &request,
            '/',
            &["service_name", "engine", "id"],
            "service_name/engine/cluster_id",
        )
    }
}

#[async_trait]
impl ResourceWithConfigure for DatabaseResource {
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
