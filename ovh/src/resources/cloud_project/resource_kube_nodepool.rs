//! Node pool of a managed Kubernetes cluster

use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::NumberRangeValidator;

use crate::api::cloud_project::nodepool::{
    CreateNodePoolRequest, NodePool, NodePoolsApi, UpdateNodePoolRequest, STATUS_DELETING,
    STATUS_PENDING, STATUS_READY,
};
use crate::api::{wait_for_state, ApiError, StateChangeConf, CHANGE_PENDING, DELETED};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, create_response, delete_response,
    id_attribute, ignore_not_found, import_composite_id, opt_bool, opt_i64, opt_string,
    read_response, refresh_result, required_string, service_name, service_name_attribute,
    update_response, wait_diagnostic,
};

const TIMEOUT: Duration = Duration::from_secs(20 * 60);

#[derive(Default)]
pub struct KubeNodePoolResource {
    provider_data: Option<OvhProviderData>,
}

async fn wait_for_pool(
    ctx: &Context,
    pools: &NodePoolsApi<'_>,
    pool_id: &str,
    pending: &[&str],
    target: &[&str],
) -> Result<Option<NodePool>, Diagnostic> {
    let conf = StateChangeConf::new(pending, target, TIMEOUT);
    wait_for_state(ctx, &conf, move || async move {
        refresh_result(pools.get(pool_id).await, |pool| pool.status.clone())
    })
    .await
    .map_err(|e| wait_diagnostic("Error waiting for node pool", &e))
}

fn count_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::Number)
        .description(description)
        .optional()
        .computed()
        .validator(NumberRangeValidator::between(0.0, 100.0))
        .build()
}

impl KubeNodePoolResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_pool(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let kube_id = required_string(state, "kube_id")?;
        let request = CreateNodePoolRequest {
            name: opt_string(state, "name"),
            flavor_name: required_string(state, "flavor_name")?,
            desired_nodes: opt_i64(state, "desired_nodes"),
            min_nodes: opt_i64(state, "min_nodes"),
            max_nodes: opt_i64(state, "max_nodes"),
            autoscale: opt_bool(state, "autoscale"),
            monthly_billed: opt_bool(state, "monthly_billed"),
            anti_affinity: opt_bool(state, "anti_affinity"),
        };

        tracing::info!("Creating node pool of {} nodes on cluster {}", request.flavor_name, kube_id);
        let pools = client.cloud_project(&service_name).kube().node_pools(&kube_id);
        let pool = pools
            .create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create node pool", &e))?;
        let pool_id = pool.id.clone();
        let _ = state.set_string(&AttributePath::new("id"), pool_id.clone());

        let pool = wait_for_pool(ctx, &pools, &pool_id, STATUS_PENDING, &[STATUS_READY])
            .await?
            .unwrap_or(pool);
        pool.apply_to_state(state);
        Ok(())
    }

    async fn read_pool(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut new_state = state.clone();
        let service_name = service_name(&mut new_state)?;
        let kube_id = required_string(state, "kube_id")?;
        let pool_id = required_string(state, "id")?;

        match client
            .cloud_project(&service_name)
            .kube()
            .node_pools(&kube_id)
            .get(&pool_id)
            .await
        {
            Ok(pool) => {
                pool.apply_to_state(&mut new_state);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Node pool {} no longer exists", pool_id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read node pool", &e)),
        }
    }

    async fn update_pool(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let kube_id = required_string(state, "kube_id")?;
        let pool_id = required_string(state, "id")?;
        let request = UpdateNodePoolRequest {
            desired_nodes: opt_i64(state, "desired_nodes"),
            min_nodes: opt_i64(state, "min_nodes"),
            max_nodes: opt_i64(state, "max_nodes"),
            autoscale: opt_bool(state, "autoscale"),
        };

        let pools = client.cloud_project(&service_name).kube().node_pools(&kube_id);
        pools
            .update(&pool_id, &request)
            .await
            .map_err(|e| api_diagnostic("Failed to update node pool", &e))?;

        let mut pending = STATUS_PENDING.to_vec();
        pending.push(CHANGE_PENDING);
        let conf = StateChangeConf::new(&pending, &[STATUS_READY], TIMEOUT);
        let (pools, pool_id, request) = (&pools, pool_id.as_str(), &request);
        let pool = wait_for_state(ctx, &conf, move || async move {
            let pool = pools.get(pool_id).await?;
            let status = if pool.status == STATUS_READY && !request.is_applied_to(&pool) {
                CHANGE_PENDING.to_string()
            } else {
                pool.status.clone()
            };
            Ok::<_, ApiError>(Some((pool, status)))
        })
        .await
        .map_err(|e| wait_diagnostic("Error waiting for node pool update", &e))?
        .ok_or_else(|| {
            Diagnostic::error(
                "Node pool disappeared",
                format!("Node pool {} was deleted during the update", pool_id),
            )
        })?;
        pool.apply_to_state(state);
        Ok(())
    }

    async fn delete_pool(&self, ctx: &Context, state: &DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut state = state.clone();
        let service_name = service_name(&mut state)?;
        let kube_id = required_string(&state, "kube_id")?;
        let pool_id = required_string(&state, "id")?;

        let pools = client.cloud_project(&service_name).kube().node_pools(&kube_id);
        ignore_not_found(pools.delete(&pool_id).await)
            .map_err(|e| api_diagnostic("Failed to delete node pool", &e))?;

        let mut pending = STATUS_DELETING.to_vec();
        pending.push(STATUS_READY);
        wait_for_pool(ctx, &pools, &pool_id, &pending, &[DELETED]).await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for KubeNodePoolResource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_kube_nodepool"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a node pool of a managed Kubernetes cluster")
            .attribute(id_attribute("Node pool identifier"))
            .attribute(service_name_attribute("Public Cloud project identifier"))
            .attribute(
                AttributeBuilder::new("kube_id", AttributeType::String)
                    .description("Kubernetes cluster identifier")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Node pool name")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("flavor_name", AttributeType::String)
                    .description("Instance flavor of the nodes, e.g. b2-7")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(count_attribute("desired_nodes", "Number of nodes to run"))
            .attribute(count_attribute("min_nodes", "Lower bound for the autoscaler"))
            .attribute(count_attribute("max_nodes", "Upper bound for the autoscaler"))
            .attribute(
                AttributeBuilder::new("autoscale", AttributeType::Bool)
                    .description("Let the cluster autoscaler resize the pool")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("monthly_billed", AttributeType::Bool)
                    .description("Bill nodes monthly instead of hourly")
                    .optional()
                    .computed()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("anti_affinity", AttributeType::Bool)
                    .description("Spread nodes across hypervisors (max 5 nodes)")
                    .optional()
                    .computed()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(computed("status", AttributeType::String, "Node pool status"))
            .attribute(computed("size_status", AttributeType::String, "Sizing status"))
            .attribute(computed("current_nodes", AttributeType::Number, "Nodes currently in the pool"))
            .attribute(computed("available_nodes", AttributeType::Number, "Nodes ready to run pods"))
            .attribute(computed("up_to_date_nodes", AttributeType::Number, "Nodes on the latest patch"))
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("Creation date")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(computed("updated_at", AttributeType::String, "Last update date"))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.create_pool(&ctx, &mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_pool(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = self.update_pool(&ctx, &mut new_state).await;
        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_pool(&ctx, &request.prior_state).await)
    }

    /// Import ID is `<service_name>/<kube_id>/<node pool id>`
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(
            &request,
            '/',
            &["service_name", "kube_id", "id"],
            "service_name/kube_id/nodepool_id",
        )
    }
}

#[async_trait]
impl ResourceWithConfigure for KubeNodePoolResource {
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

    const POOL_BASE: &str = "/cloud/project/abc123/kube/kube-1/nodepool";

    fn configured(server: &mockito::Server) -> KubeNodePoolResource {
        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        KubeNodePoolResource {
            provider_data: Some(OvhProviderData::new(client)),
        }
    }

    fn pool_json(status: &str, desired: i64) -> String {
        format!(
            r#"{{"id":"pool-1","name":"workers","flavor":"b2-7","status":"{}","desiredNodes":{},
                "minNodes":0,"maxNodes":10,"currentNodes":{},"autoscale":false}}"#,
            status, desired, desired
        )
    }

    fn state() -> DynamicValue {
        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("service_name"), "abc123".to_string());
        let _ = state.set_string(&AttributePath::new("kube_id"), "kube-1".to_string());
        let _ = state.set_string(&AttributePath::new("flavor_name"), "b2-7".to_string());
        let _ = state.set_number(&AttributePath::new("desired_nodes"), 3.0);
        state
    }

    #[tokio::test]
    async fn create_sends_counts_and_waits_for_ready() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", POOL_BASE)
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "flavorName": "b2-7",
                "desiredNodes": 3
            })))
            .with_body(pool_json("INSTALLING", 3))
            .create_async()
            .await;
        let _get = server
            .mock("GET", format!("{}/pool-1", POOL_BASE).as_str())
            .with_body(pool_json("READY", 3))
            .create_async()
            .await;

        let mut planned = state();
        let _ = planned.mark_unknown(&AttributePath::new("id"));
        let response = configured(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_cloud_project_kube_nodepool".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        create.assert_async().await;
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "pool-1");
        assert_eq!(state.get_string(&AttributePath::new("status")).unwrap(), "READY");
        assert_eq!(state.get_i64(&AttributePath::new("current_nodes")).unwrap(), 3);
    }

    #[tokio::test]
    async fn update_resizes_pool() {
        let mut server = mockito::Server::new_async().await;
        let update = server
            .mock("PUT", format!("{}/pool-1", POOL_BASE).as_str())
            .match_body(mockito::Matcher::Json(serde_json::json!({ "desiredNodes": 5 })))
            .with_body("null")
            .create_async()
            .await;
        let stale = server
            .mock("GET", format!("{}/pool-1", POOL_BASE).as_str())
            .with_body(pool_json("READY", 3))
            .create_async()
            .await;
        let _resized = server
            .mock("GET", format!("{}/pool-1", POOL_BASE).as_str())
            .with_body(pool_json("READY", 5))
            .create_async()
            .await;

        let mut prior = state();
        let _ = prior.set_string(&AttributePath::new("id"), "pool-1".to_string());
        let mut planned = prior.clone();
        let _ = planned.set_number(&AttributePath::new("desired_nodes"), 5.0);

        let response = configured(&server)
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "ovh_cloud_project_kube_nodepool".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        update.assert_async().await;
        stale.assert_async().await;
        assert_eq!(
            response.new_state.get_i64(&AttributePath::new("desired_nodes")).unwrap(),
            5
        );
        assert_eq!(
            response.new_state.get_i64(&AttributePath::new("current_nodes")).unwrap(),
            5
        );
    }

    #[tokio::test]
    async fn import_splits_three_segments() {
        let response = KubeNodePoolResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "ovh_cloud_project_kube_nodepool".to_string(),
                    id: "abc123/kube-1/pool-1".to_string(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("kube_id")).unwrap(), "kube-1");
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "pool-1");
    }
}
