//! Managed Kubernetes clusters

use serde::{Deserialize, Serialize};
use tfplug::types::{AttributePath, DynamicValue};

use super::nodepool::NodePoolsApi;
use crate::api::{path_escape, ApiError, Client};

pub const STATUS_READY: &str = "READY";
pub const STATUS_PENDING: &[&str] = &[
    "INSTALLING",
    "UPDATING",
    "REDEPLOYING",
    "RESETTING",
    "REOPENING",
    "RESTORING",
    "MAINTENANCE",
    "SUSPENDING",
    "RESUMING",
];
pub const STATUS_DELETING: &[&str] = &["DELETING", "DELETED"];

pub const UPDATE_POLICIES: &[&str] = &["ALWAYS_UPDATE", "MINIMAL_DOWNTIME", "NEVER_UPDATE"];
pub const KUBE_PROXY_MODES: &[&str] = &["iptables", "ipvs"];

/// Response from GET /cloud/project/{serviceName}/kube/{kubeId}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kube {
    pub id: String,
    pub name: String,
    pub region: String,
    pub version: String,
    pub status: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub nodes_url: Option<String>,
    #[serde(default)]
    pub control_plane_is_up_to_date: bool,
    #[serde(default)]
    pub is_up_to_date: bool,
    #[serde(default)]
    pub next_upgrade_versions: Vec<String>,
    #[serde(default)]
    pub update_policy: Option<String>,
    #[serde(default)]
    pub private_network_id: Option<String>,
    #[serde(default)]
    pub kube_proxy_mode: Option<String>,
}

impl Kube {
    /// The API reports patch versions; users configure `major.minor`
    pub fn minor_version(&self) -> String {
        self.version.split('.').take(2).collect::<Vec<_>>().join(".")
    }

    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.id.clone());
        let _ = state.set_string(&AttributePath::new("name"), self.name.clone());
        let _ = state.set_string(&AttributePath::new("region"), self.region.clone());
        let _ = state.set_string(&AttributePath::new("version"), self.minor_version());
        let _ = state.set_string(&AttributePath::new("status"), self.status.clone());
        let _ = state.set_optional_string(&AttributePath::new("url"), self.url.clone());
        let _ = state.set_optional_string(&AttributePath::new("nodes_url"), self.nodes_url.clone());
        let _ = state.set_bool(
            &AttributePath::new("control_plane_is_up_to_date"),
            self.control_plane_is_up_to_date,
        );
        let _ = state.set_bool(&AttributePath::new("is_up_to_date"), self.is_up_to_date);
        let _ = state.set_string_list(
            &AttributePath::new("next_upgrade_versions"),
            &self.next_upgrade_versions,
        );
        let _ = state.set_optional_string(
            &AttributePath::new("update_policy"),
            self.update_policy.clone(),
        );
        let _ = state.set_optional_string(
            &AttributePath::new("private_network_id"),
            self.private_network_id.clone(),
        );
        let _ = state.set_optional_string(
            &AttributePath::new("kube_proxy_mode"),
            self.kube_proxy_mode.clone(),
        );
    }
}

/// Request body for POST /cloud/project/{serviceName}/kube
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKubeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_network_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_proxy_mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct RenameKubeRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct UpgradeKubeRequest {
    force: bool,
    strategy: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePolicyRequest<'a> {
    update_policy: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct Kubeconfig {
    pub content: String,
}

pub struct KubeApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> KubeApi<'a> {
    pub fn new(client: &'a Client, base: String) -> Self {
        Self { client, base }
    }

    fn path(&self, kube_id: &str) -> String {
        format!("{}/{}", self.base, path_escape(kube_id))
    }

    /// GET /cloud/project/{serviceName}/kube/{kubeId}
    pub async fn get(&self, kube_id: &str) -> Result<Kube, ApiError> {
        self.client.get(&self.path(kube_id)).await
    }

    /// POST /cloud/project/{serviceName}/kube
    pub async fn create(&self, request: &CreateKubeRequest) -> Result<Kube, ApiError> {
        self.client.post(&self.base, request).await
    }

    /// PUT /cloud/project/{serviceName}/kube/{kubeId}
    pub async fn rename(&self, kube_id: &str, name: &str) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&self.path(kube_id), &RenameKubeRequest { name })
            .await
    }

    /// POST /cloud/project/{serviceName}/kube/{kubeId}/update
    ///
    /// Moves the cluster to the next minor version.
    pub async fn upgrade(&self, kube_id: &str) -> Result<(), ApiError> {
        self.client
            .post::<(), _>(
                &format!("{}/update", self.path(kube_id)),
                &UpgradeKubeRequest {
                    force: false,
                    strategy: "NEXT_MINOR",
                },
            )
            .await
    }

    /// PUT /cloud/project/{serviceName}/kube/{kubeId}/updatePolicy
    pub async fn set_update_policy(&self, kube_id: &str, update_policy: &str) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(
                &format!("{}/updatePolicy", self.path(kube_id)),
                &UpdatePolicyRequest { update_policy },
            )
            .await
    }

    /// POST /cloud/project/{serviceName}/kube/{kubeId}/kubeconfig
    pub async fn kubeconfig(&self, kube_id: &str) -> Result<Kubeconfig, ApiError> {
        self.client
            .post_empty(&format!("{}/kubeconfig", self.path(kube_id)))
            .await
    }

    /// DELETE /cloud/project/{serviceName}/kube/{kubeId}
    pub async fn delete(&self, kube_id: &str) -> Result<(), ApiError> {
        self.client.delete::<()>(&self.path(kube_id)).await
    }

    pub fn node_pools(&self, kube_id: &str) -> NodePoolsApi<'a> {
        NodePoolsApi::new(self.client, format!("{}/nodepool", self.path(kube_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_keeps_minor_version() {
        let kube: Kube = serde_json::from_str(
            r#"{"id":"k1","name":"prod","region":"GRA7","version":"1.29.3-1","status":"READY",
                "nextUpgradeVersions":["1.30"],"updatePolicy":"ALWAYS_UPDATE","isUpToDate":true}"#,
        )
        .unwrap();
        let mut state = DynamicValue::object();
        kube.apply_to_state(&mut state);

        assert_eq!(state.get_string(&AttributePath::new("version")).unwrap(), "1.29");
        assert_eq!(
            state
                .get_string_list(&AttributePath::new("next_upgrade_versions"))
                .unwrap(),
            vec!["1.30".to_string()]
        );
        assert!(state.get_bool(&AttributePath::new("is_up_to_date")).unwrap());
    }
}
