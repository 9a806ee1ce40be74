//! Node pools of a managed Kubernetes cluster

use serde::{Deserialize, Serialize};
use tfplug::types::{AttributePath, DynamicValue};

use crate::api::{path_escape, ApiError, Client};

pub const STATUS_READY: &str = "READY";
pub const STATUS_PENDING: &[&str] = &["INSTALLING", "UPDATING", "REDEPLOYING", "RESIZING"];
pub const STATUS_DELETING: &[&str] = &["DELETING"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    pub id: String,
    pub name: String,
    pub flavor: String,
    pub status: String,
    #[serde(default)]
    pub size_status: Option<String>,
    pub desired_nodes: i64,
    pub min_nodes: i64,
    pub max_nodes: i64,
    #[serde(default)]
    pub current_nodes: i64,
    #[serde(default)]
    pub available_nodes: i64,
    #[serde(default)]
    pub up_to_date_nodes: i64,
    #[serde(default)]
    pub autoscale: bool,
    #[serde(default)]
    pub monthly_billed: bool,
    #[serde(default)]
    pub anti_affinity: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl NodePool {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.id.clone());
        let _ = state.set_string(&AttributePath::new("name"), self.name.clone());
        let _ = state.set_string(&AttributePath::new("flavor_name"), self.flavor.clone());
        let _ = state.set_string(&AttributePath::new("status"), self.status.clone());
        let _ = state.set_optional_string(&AttributePath::new("size_status"), self.size_status.clone());
        let _ = state.set_number(&AttributePath::new("desired_nodes"), self.desired_nodes as f64);
        let _ = state.set_number(&AttributePath::new("min_nodes"), self.min_nodes as f64);
        let _ = state.set_number(&AttributePath::new("max_nodes"), self.max_nodes as f64);
        let _ = state.set_number(&AttributePath::new("current_nodes"), self.current_nodes as f64);
        let _ = state.set_number(&AttributePath::new("available_nodes"), self.available_nodes as f64);
        let _ = state.set_number(&AttributePath::new("up_to_date_nodes"), self.up_to_date_nodes as f64);
        let _ = state.set_bool(&AttributePath::new("autoscale"), self.autoscale);
        let _ = state.set_bool(&AttributePath::new("monthly_billed"), self.monthly_billed);
        let _ = state.set_bool(&AttributePath::new("anti_affinity"), self.anti_affinity);
        let _ = state.set_optional_string(&AttributePath::new("created_at"), self.created_at.clone());
        let _ = state.set_optional_string(&AttributePath::new("updated_at"), self.updated_at.clone());
    }
}

/// Request body for POST .../kube/{kubeId}/nodepool
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodePoolRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub flavor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_nodes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_nodes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_billed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anti_affinity: Option<bool>,
}

/// Request body for PUT .../kube/{kubeId}/nodepool/{nodePoolId}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodePoolRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_nodes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_nodes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscale: Option<bool>,
}

impl UpdateNodePoolRequest {
    /// Whether `pool` already reports the requested sizing
    pub fn is_applied_to(&self, pool: &NodePool) -> bool {
        self.desired_nodes.map_or(true, |n| n == pool.desired_nodes)
            && self.min_nodes.map_or(true, |n| n == pool.min_nodes)
            && self.max_nodes.map_or(true, |n| n == pool.max_nodes)
            && self.autoscale.map_or(true, |a| a == pool.autoscale)
    }
}

pub struct NodePoolsApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> NodePoolsApi<'a> {
    pub fn new(client: &'a Client, base: String) -> Self {
        Self { client, base }
    }

    fn path(&self, id: &str) -> String {
        format!("{}/{}", self.base, path_escape(id))
    }

    pub async fn get(&self, id: &str) -> Result<NodePool, ApiError> {
        self.client.get(&self.path(id)).await
    }

    pub async fn create(&self, request: &CreateNodePoolRequest) -> Result<NodePool, ApiError> {
        self.client.post(&self.base, request).await
    }

    pub async fn update(&self, id: &str, request: &UpdateNodePoolRequest) -> Result<(), ApiError> {
        self.client.put::<(), _>(&self.path(id), request).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete::<()>(&self.path(id)).await
    }
}
