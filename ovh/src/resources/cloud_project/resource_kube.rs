//! Managed Kubernetes cluster

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
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{StringOneOfValidator, StringPatternValidator};

use crate::api::cloud_project::kube::{
    CreateKubeRequest, Kube, KubeApi, KUBE_PROXY_MODES, STATUS_DELETING, STATUS_PENDING,
    STATUS_READY, UPDATE_POLICIES,
};
use crate::api::{wait_for_state, ApiError, StateChangeConf, CHANGE_PENDING, DELETED};
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, create_response, delete_response,
    id_attribute, ignore_not_found, import_composite_id, opt_string, read_response,
    refresh_result, required_string, service_name, service_name_attribute, update_response,
    wait_diagnostic,
};

const CREATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Default)]
pub struct KubeResource {
    provider_data: Option<OvhProviderData>,
}

/// `major.minor` as a comparable pair
fn parse_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.split('-').next()?.parse().ok()?;
    Some((major, minor))
}

pub(crate) async fn wait_for_kube(
    ctx: &Context,
    kubes: &KubeApi<'_>,
    kube_id: &str,
    timeout: Duration,
) -> Result<Option<Kube>, Diagnostic> {
    let conf = StateChangeConf::new(STATUS_PENDING, &[STATUS_READY], timeout);
    wait_for_state(ctx, &conf, move || async move {
        refresh_result(kubes.get(kube_id).await, |kube| kube.status.clone())
    })
    .await
    .map_err(|e| wait_diagnostic("Error waiting for Kubernetes cluster to be ready", &e))
}

/// Waits for an upgrade requested while the cluster ran `from`
///
/// The cluster may still report READY on the old version right after the
/// request, so READY only counts once the minor version has moved.
async fn wait_for_upgrade(
    ctx: &Context,
    kubes: &KubeApi<'_>,
    kube_id: &str,
    from: (u32, u32),
) -> Result<Kube, Diagnostic> {
    let mut pending = STATUS_PENDING.to_vec();
    pending.push(CHANGE_PENDING);
    let conf = StateChangeConf::new(&pending, &[STATUS_READY], UPDATE_TIMEOUT);
    wait_for_state(ctx, &conf, move || async move {
        let kube = kubes.get(kube_id).await?;
        let status = if kube.status == STATUS_READY && parse_minor(&kube.version) == Some(from) {
            CHANGE_PENDING.to_string()
        } else {
            kube.status.clone()
        };
        Ok::<_, ApiError>(Some((kube, status)))
    })
    .await
    .map_err(|e| wait_diagnostic("Error waiting for Kubernetes cluster upgrade", &e))?
    .ok_or_else(|| {
        Diagnostic::error(
            "Kubernetes cluster disappeared",
            format!("Cluster {} was deleted during the upgrade", kube_id),
        )
    })
}

impl KubeResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn refresh_kubeconfig(
        kubes: &KubeApi<'_>,
        kube_id: &str,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let kubeconfig = kubes
            .kubeconfig(kube_id)
            .await
            .map_err(|e| api_diagnostic("Failed to fetch kubeconfig", &e))?;
        let _ = state.set_string(&AttributePath::new("kubeconfig"), kubeconfig.content);
        Ok(())
    }

    async fn create_kube(&self, ctx: &Context, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let request = CreateKubeRequest {
            name: opt_string(state, "name"),
            region: required_string(state, "region")?,
            version: opt_string(state, "version"),
            private_network_id: opt_string(state, "private_network_id"),
            update_policy: opt_string(state, "update_policy"),
            kube_proxy_mode: opt_string(state, "kube_proxy_mode"),
        };

        tracing::info!("Creating Kubernetes cluster in {} ({})", request.region, service_name);
        let cloud_project = client.cloud_project(&service_name);
        let kubes = cloud_project.kube();
        let kube = kubes
            .create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create Kubernetes cluster", &e))?;
        let kube_id = kube.id.clone();
        let _ = state.set_string(&AttributePath::new("id"), kube_id.clone());

        let kube = wait_for_kube(ctx, &kubes, &kube_id, CREATE_TIMEOUT)
            .await?
            .unwrap_or(kube);
        kube.apply_to_state(state);
        Self::refresh_kubeconfig(&kubes, &kube_id, state).await
    }

    async fn read_kube(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut new_state = state.clone();
        let service_name = service_name(&mut new_state)?;
        let kube_id = required_string(state, "id")?;
        let cloud_project = client.cloud_project(&service_name);
        let kubes = cloud_project.kube();

        match kubes.get(&kube_id).await {
            Ok(kube) => {
                kube.apply_to_state(&mut new_state);
                if new_state.is_null_or_unknown_at(&AttributePath::new("kubeconfig")) {
                    Self::refresh_kubeconfig(&kubes, &kube_id, &mut new_state).await?;
                }
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Kubernetes cluster {} no longer exists", kube_id);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read Kubernetes cluster", &e)),
        }
    }

    async fn update_kube(
        &self,
        ctx: &Context,
        prior_state: &DynamicValue,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let service_name = service_name(state)?;
        let kube_id = required_string(prior_state, "id")?;
        let cloud_project = client.cloud_project(&service_name);
        let kubes = cloud_project.kube();

        if let Some(name) = opt_string(state, "name") {
            if opt_string(prior_state, "name").as_ref() != Some(&name) {
                kubes
                    .rename(&kube_id, &name)
                    .await
                    .map_err(|e| api_diagnostic("Failed to rename Kubernetes cluster", &e))?;
            }
        }

        if let Some(policy) = opt_string(state, "update_policy") {
            if opt_string(prior_state, "update_policy").as_ref() != Some(&policy) {
                kubes
                    .set_update_policy(&kube_id, &policy)
                    .await
                    .map_err(|e| api_diagnostic("Failed to change update policy", &e))?;
            }
        }

        if let Some(target) = opt_string(state, "version") {
            let target_minor = parse_minor(&target).ok_or_else(|| {
                Diagnostic::error("Invalid version", format!("'{}' is not major.minor", target))
                    .with_attribute(AttributePath::new("version"))
            })?;

            let current = kubes
                .get(&kube_id)
                .await
                .map_err(|e| api_diagnostic("Failed to read Kubernetes cluster", &e))?;
            let mut current_minor = parse_minor(&current.version).unwrap_or(target_minor);
            if current_minor > target_minor {
                return Err(Diagnostic::error(
                    "Downgrade not supported",
                    format!(
                        "Cluster runs {} and cannot be downgraded to {}",
                        current.minor_version(),
                        target
                    ),
                )
                .with_attribute(AttributePath::new("version")));
            }
            if current_minor.0 != target_minor.0 {
                return Err(Diagnostic::error(
                    "Major upgrade not supported",
                    format!(
                        "Cluster runs {} and can only move to another {}.x version",
                        current.minor_version(),
                        current_minor.0
                    ),
                )
                .with_attribute(AttributePath::new("version")));
            }

            // One minor per upgrade
            for _ in current_minor.1..target_minor.1 {
                tracing::info!(
                    "Upgrading Kubernetes cluster {} from {}.{}",
                    kube_id,
                    current_minor.0,
                    current_minor.1
                );
                kubes
                    .upgrade(&kube_id)
                    .await
                    .map_err(|e| api_diagnostic("Failed to upgrade Kubernetes cluster", &e))?;
                let upgraded = wait_for_upgrade(ctx, &kubes, &kube_id, current_minor).await?;
                current_minor = parse_minor(&upgraded.version).unwrap_or(target_minor);
                if current_minor >= target_minor {
                    break;
                }
            }
            if current_minor != target_minor {
                return Err(Diagnostic::error(
                    "Kubernetes upgrade incomplete",
                    format!(
                        "Cluster runs {}.{} after upgrading towards {}",
                        current_minor.0, current_minor.1, target
                    ),
                )
                .with_attribute(AttributePath::new("version")));
            }
        }

        let kube = wait_for_kube(ctx, &kubes, &kube_id, UPDATE_TIMEOUT)
            .await?
            .ok_or_else(|| {
                Diagnostic::error(
                    "Kubernetes cluster disappeared",
                    format!("Cluster {} was deleted during the update", kube_id),
                )
            })?;
        kube.apply_to_state(state);
        if state.is_null_or_unknown_at(&AttributePath::new("kubeconfig")) {
            Self::refresh_kubeconfig(&kubes, &kube_id, state).await?;
        }
        Ok(())
    }

    async fn delete_kube(&self, ctx: &Context, state: &DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let mut state = state.clone();
        let service_name = service_name(&mut state)?;
        let kube_id = required_string(&state, "id")?;
        let cloud_project = client.cloud_project(&service_name);
        let kubes = cloud_project.kube();

        tracing::info!("Deleting Kubernetes cluster {}", kube_id);
        ignore_not_found(kubes.delete(&kube_id).await)
            .map_err(|e| api_diagnostic("Failed to delete Kubernetes cluster", &e))?;

        let mut pending = STATUS_DELETING.to_vec();
        pending.push(STATUS_READY);
        let conf = StateChangeConf::new(&pending, &[DELETED], DELETE_TIMEOUT);
        let kube_id = kube_id.as_str();
        let kubes = &kubes;
        wait_for_state(ctx, &conf, move || async move {
            refresh_result(kubes.get(kube_id).await, |kube| kube.status.clone())
        })
        .await
        .map_err(|e| wait_diagnostic("Error waiting for Kubernetes cluster deletion", &e))?;
        Ok(())
    }
}

#[async_trait]
impl Resource for KubeResource {
    fn type_name(&self) -> &str {
        "ovh_cloud_project_kube"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let version_pattern = regex::Regex::new(r"^\d+\.\d+$").ok();
        let mut version = AttributeBuilder::new("version", AttributeType::String)
            .description("Kubernetes version (major.minor); upgrades happen in place")
            .optional()
            .computed()
            .plan_modifier(UseStateForUnknown);
        if let Some(pattern) = version_pattern {
            version = version.validator(StringPatternValidator::new(pattern, "a major.minor version"));
        }

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a managed Kubernetes cluster of a Public Cloud project")
            .attribute(id_attribute("Cluster identifier"))
            .attribute(service_name_attribute("Public Cloud project identifier"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Cluster name")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Region where the cluster runs, e.g. GRA7")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(version.build())
            .attribute(
                AttributeBuilder::new("update_policy", AttributeType::String)
                    .description("Patch version update policy")
                    .optional()
                    .computed()
                    .validator(StringOneOfValidator::new(UPDATE_POLICIES))
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("kube_proxy_mode", AttributeType::String)
                    .description("kube-proxy mode")
                    .optional()
                    .computed()
                    .validator(StringOneOfValidator::new(KUBE_PROXY_MODES))
                    .plan_modifier(UseStateForUnknown)
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("private_network_id", AttributeType::String)
                    .description("OpenStack private network to attach nodes to")
                    .optional()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(computed("status", AttributeType::String, "Cluster status"))
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("API server URL")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("nodes_url", AttributeType::String)
                    .description("Nodes URL")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(computed(
                "control_plane_is_up_to_date",
                AttributeType::Bool,
                "Whether the control plane runs the latest patch",
            ))
            .attribute(computed(
                "is_up_to_date",
                AttributeType::Bool,
                "Whether all nodes run the latest patch",
            ))
            .attribute(computed(
                "next_upgrade_versions",
                AttributeType::list_of(AttributeType::String),
                "Versions the cluster can be upgraded to",
            ))
            .attribute(
                AttributeBuilder::new("kubeconfig", AttributeType::String)
                    .description("Admin kubeconfig")
                    .computed()
                    .sensitive()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.create_kube(&ctx, &mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_kube(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = self
            .update_kube(&ctx, &request.prior_state, &mut new_state)
            .await;
        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_kube(&ctx, &request.prior_state).await)
    }

    /// Import ID is `<service_name>/<kube id>`
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(&request, '/', &["service_name", "id"], "service_name/kube_id")
    }
}

#[async_trait]
impl ResourceWithConfigure for KubeResource {
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

    const KUBE_BASE: &str = "/cloud/project/abc123/kube";

    fn configured(server: &mockito::Server) -> KubeResource {
        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        KubeResource {
            provider_data: Some(OvhProviderData::new(client)),
        }
    }

    fn kube_json(status: &str, version: &str) -> String {
        format!(
            r#"{{"id":"kube-1","name":"prod","region":"GRA7","version":"{}","status":"{}",
                "url":"https://kube-1.c1.gra7.k8s.ovh.net","nodesUrl":"kube-1.nodes.c1.gra7.k8s.ovh.net",
                "controlPlaneIsUpToDate":true,"isUpToDate":true,"nextUpgradeVersions":[],
                "updatePolicy":"ALWAYS_UPDATE","kubeProxyMode":"iptables"}}"#,
            version, status
        )
    }

    #[test]
    fn minor_versions_compare_numerically() {
        assert_eq!(parse_minor("1.29"), Some((1, 29)));
        assert_eq!(parse_minor("1.30.2-1"), Some((1, 30)));
        assert!(parse_minor("1.9") < parse_minor("1.10"));
        assert_eq!(parse_minor("latest"), None);
    }

    #[tokio::test]
    async fn create_waits_for_ready_and_stores_kubeconfig() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", KUBE_BASE)
            .with_body(kube_json("INSTALLING", "1.29.3-1"))
            .create_async()
            .await;
        let _get = server
            .mock("GET", format!("{}/kube-1", KUBE_BASE).as_str())
            .with_body(kube_json("READY", "1.29.3-1"))
            .create_async()
            .await;
        let _kubeconfig = server
            .mock("POST", format!("{}/kube-1/kubeconfig", KUBE_BASE).as_str())
            .with_body(r#"{"content":"apiVersion: v1\nkind: Config\n"}"#)
            .create_async()
            .await;

        let mut planned = DynamicValue::object();
        let _ = planned.set_string(&AttributePath::new("service_name"), "abc123".to_string());
        let _ = planned.set_string(&AttributePath::new("region"), "GRA7".to_string());
        let _ = planned.mark_unknown(&AttributePath::new("id"));
        let _ = planned.mark_unknown(&AttributePath::new("kubeconfig"));

        let response = configured(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_cloud_project_kube".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("status")).unwrap(), "READY");
        assert_eq!(state.get_string(&AttributePath::new("version")).unwrap(), "1.29");
        assert!(state
            .get_string(&AttributePath::new("kubeconfig"))
            .unwrap()
            .starts_with("apiVersion"));
        assert!(!state.has_unknowns());
    }

    #[tokio::test]
    async fn unexpected_status_keeps_created_cluster_in_state() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", KUBE_BASE)
            .with_body(kube_json("INSTALLING", "1.29.3-1"))
            .create_async()
            .await;
        let _get = server
            .mock("GET", format!("{}/kube-1", KUBE_BASE).as_str())
            .with_body(kube_json("ERROR", "1.29.3-1"))
            .create_async()
            .await;

        let mut planned = DynamicValue::object();
        let _ = planned.set_string(&AttributePath::new("service_name"), "abc123".to_string());
        let _ = planned.set_string(&AttributePath::new("region"), "GRA7".to_string());
        let _ = planned.mark_unknown(&AttributePath::new("id"));

        let response = configured(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ovh_cloud_project_kube".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert_eq!(
            response.diagnostics[0].summary,
            "Error waiting for Kubernetes cluster to be ready"
        );
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            "kube-1"
        );
    }

    #[tokio::test]
    async fn delete_waits_until_cluster_is_gone() {
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("DELETE", format!("{}/kube-1", KUBE_BASE).as_str())
            .with_body("null")
            .create_async()
            .await;
        let _get = server
            .mock("GET", format!("{}/kube-1", KUBE_BASE).as_str())
            .with_status(404)
            .with_body(r#"{"class":"Client::NotFound","message":"not found"}"#)
            .create_async()
            .await;

        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("service_name"), "abc123".to_string());
        let _ = state.set_string(&AttributePath::new("id"), "kube-1".to_string());

        let response = configured(&server)
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "ovh_cloud_project_kube".to_string(),
                    prior_state: state,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        delete.assert_async().await;
    }

    fn existing_cluster(version: &str) -> DynamicValue {
        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("service_name"), "abc123".to_string());
        let _ = state.set_string(&AttributePath::new("id"), "kube-1".to_string());
        let _ = state.set_string(&AttributePath::new("region"), "GRA7".to_string());
        let _ = state.set_string(&AttributePath::new("version"), version.to_string());
        let _ = state.set_string(&AttributePath::new("kubeconfig"), "apiVersion: v1\n".to_string());
        state
    }

    #[tokio::test]
    async fn version_bump_waits_for_the_new_minor() {
        let mut server = mockito::Server::new_async().await;
        // Read before the upgrade, then once more while the request is queued
        let old = server
            .mock("GET", format!("{}/kube-1", KUBE_BASE).as_str())
            .with_body(kube_json("READY", "1.28.9-1"))
            .expect(2)
            .create_async()
            .await;
        let _updating = server
            .mock("GET", format!("{}/kube-1", KUBE_BASE).as_str())
            .with_body(kube_json("UPDATING", "1.28.9-1"))
            .create_async()
            .await;
        let _upgraded = server
            .mock("GET", format!("{}/kube-1", KUBE_BASE).as_str())
            .with_body(kube_json("READY", "1.29.3-0"))
            .create_async()
            .await;
        let upgrade = server
            .mock("POST", format!("{}/kube-1/update", KUBE_BASE).as_str())
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "strategy": "NEXT_MINOR"
            })))
            .with_body("null")
            .expect(1)
            .create_async()
            .await;

        let prior = existing_cluster("1.28");
        let planned = existing_cluster("1.29");
        let response = configured(&server)
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "ovh_cloud_project_kube".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        upgrade.assert_async().await;
        old.assert_async().await;
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("version")).unwrap(),
            "1.29"
        );
    }

    #[tokio::test]
    async fn version_downgrade_is_refused() {
        let mut server = mockito::Server::new_async().await;
        let _get = server
            .mock("GET", format!("{}/kube-1", KUBE_BASE).as_str())
            .with_body(kube_json("READY", "1.30.1-0"))
            .create_async()
            .await;
        let upgrade = server
            .mock("POST", format!("{}/kube-1/update", KUBE_BASE).as_str())
            .expect(0)
            .create_async()
            .await;

        let prior = existing_cluster("1.30");
        let planned = existing_cluster("1.29");
        let response = configured(&server)
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "ovh_cloud_project_kube".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Downgrade not supported");
        upgrade.assert_async().await;
    }
}
