//! Managed database clusters and their users

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::schema::AttributeType;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use crate::api::{path_escape, ApiError, Client};

pub const STATUS_READY: &str = "READY";
pub const STATUS_PENDING: &[&str] = &["PENDING", "CREATING", "UPDATING"];
pub const STATUS_DELETING: &[&str] = &["DELETING", "DELETED"];

pub const ENGINES: &[&str] = &[
    "cassandra",
    "grafana",
    "kafka",
    "kafkaConnect",
    "kafkaMirrorMaker",
    "m3aggregator",
    "m3db",
    "mongodb",
    "mysql",
    "opensearch",
    "postgresql",
    "redis",
    "valkey",
];

/// Engines exposing the generic `/user` endpoint
pub const USER_ENGINES: &[&str] = &[
    "cassandra",
    "kafka",
    "m3db",
    "mysql",
    "opensearch",
    "postgresql",
    "redis",
    "valkey",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub plan: String,
    pub status: String,
    pub version: String,
    #[serde(default)]
    pub flavor: Option<String>,
    #[serde(default)]
    pub node_number: Option<i64>,
    #[serde(default)]
    pub disk: Option<Disk>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub maintenance_time: Option<String>,
    #[serde(default)]
    pub backup_time: Option<String>,
    #[serde(default)]
    pub network_type: Option<String>,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
}

/// Response from GET .../{clusterId}/node/{nodeId}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub flavor: String,
    pub region: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Disk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(rename = "type", default, skip_serializing)]
    pub disk_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub component: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub ssl_mode: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
}

impl Endpoint {
    /// Element type of the `endpoints` attribute
    pub fn attribute_type() -> AttributeType {
        AttributeType::object(&[
            ("component", AttributeType::String),
            ("domain", AttributeType::String),
            ("port", AttributeType::Number),
            ("ssl", AttributeType::Bool),
            ("ssl_mode", AttributeType::String),
            ("uri", AttributeType::String),
            ("path", AttributeType::String),
            ("scheme", AttributeType::String),
        ])
    }

    fn to_dynamic(&self) -> Dynamic {
        Dynamic::Map(HashMap::from([
            ("component".to_string(), Dynamic::String(self.component.clone())),
            ("domain".to_string(), self.domain.clone().into()),
            ("port".to_string(), self.port.into()),
            ("ssl".to_string(), Dynamic::Bool(self.ssl)),
            ("ssl_mode".to_string(), self.ssl_mode.clone().into()),
            ("uri".to_string(), self.uri.clone().into()),
            ("path".to_string(), self.path.clone().into()),
            ("scheme".to_string(), self.scheme.clone().into()),
        ]))
    }
}

impl Database {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.id.clone());
        let _ = state.set_string(&AttributePath::new("description"), self.description.clone());
        let _ = state.set_string(&AttributePath::new("plan"), self.plan.clone());
        let _ = state.set_string(&AttributePath::new("status"), self.status.clone());
        let _ = state.set_string(&AttributePath::new("version"), self.version.clone());
        if let Some(flavor) = &self.flavor {
            let _ = state.set_string(&AttributePath::new("flavor"), flavor.clone());
        }
        if let Some(disk) = &self.disk {
            let _ = state.set_optional_number(
                &AttributePath::new("disk_size"),
                disk.size.map(|size| size as f64),
            );
            let _ = state.set_optional_string(&AttributePath::new("disk_type"), disk.disk_type.clone());
        }
        let _ = state.set_list(
            &AttributePath::new("endpoints"),
            self.endpoints.iter().map(Endpoint::to_dynamic).collect(),
        );
        let _ = state.set_optional_string(&AttributePath::new("created_at"), self.created_at.clone());
        let _ = state.set_optional_string(
            &AttributePath::new("maintenance_time"),
            self.maintenance_time.clone(),
        );
        let _ = state.set_optional_string(&AttributePath::new("backup_time"), self.backup_time.clone());
        let _ = state.set_optional_string(&AttributePath::new("network_type"), self.network_type.clone());
    }

    /// `nodes` block entries; placement is per cluster, region per node
    pub fn node_values(&self, nodes: &[Node]) -> Vec<Dynamic> {
        nodes
            .iter()
            .map(|node| {
                Dynamic::Map(HashMap::from([
                    ("region".to_string(), Dynamic::String(node.region.clone())),
                    ("subnet_id".to_string(), self.subnet_id.clone().into()),
                    ("network_id".to_string(), self.network_id.clone().into()),
                ]))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRequest {
    pub flavor: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
}

/// Request body for POST /cloud/project/{serviceName}/database/{engine}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub plan: String,
    pub version: String,
    pub nodes_list: Vec<NodeRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<Disk>,
}

/// Request body for PUT /cloud/project/{serviceName}/database/{engine}/{clusterId}
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<Disk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_number: Option<i64>,
}

impl UpdateDatabaseRequest {
    /// Whether `database` already reflects every field of this request
    ///
    /// The cluster can still report READY right after the PUT, before the
    /// change is picked up.
    pub fn is_applied_to(&self, database: &Database) -> bool {
        let matches = |wanted: &Option<String>, actual: Option<&String>| {
            wanted.as_ref().map_or(true, |wanted| Some(wanted) == actual)
        };
        let disk_size = database.disk.as_ref().and_then(|disk| disk.size);

        matches(&self.description, Some(&database.description))
            && matches(&self.plan, Some(&database.plan))
            && matches(&self.flavor, database.flavor.as_ref())
            && matches(&self.version, Some(&database.version))
            && self
                .disk
                .as_ref()
                .and_then(|disk| disk.size)
                .map_or(true, |size| Some(size) == disk_size)
            && self.node_number.map_or(true, |wanted| {
                database.node_number.map_or(true, |actual| actual == wanted)
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUser {
    pub id: String,
    pub username: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl DatabaseUser {
    /// The password is only returned at creation and stays untouched otherwise
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.id.clone());
        let _ = state.set_string(&AttributePath::new("name"), self.username.clone());
        let _ = state.set_string(&AttributePath::new("status"), self.status.clone());
        let _ = state.set_optional_string(&AttributePath::new("created_at"), self.created_at.clone());
        if let Some(password) = &self.password {
            let _ = state.set_string(&AttributePath::new("password"), password.clone());
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateUserRequest<'a> {
    name: &'a str,
}

pub struct DatabaseApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> DatabaseApi<'a> {
    pub fn new(client: &'a Client, base: String) -> Self {
        Self { client, base }
    }

    fn path(&self, cluster_id: &str) -> String {
        format!("{}/{}", self.base, path_escape(cluster_id))
    }

    pub async fn get(&self, cluster_id: &str) -> Result<Database, ApiError> {
        self.client.get(&self.path(cluster_id)).await
    }

    pub async fn create(&self, request: &CreateDatabaseRequest) -> Result<Database, ApiError> {
        self.client.post(&self.base, request).await
    }

    pub async fn update(&self, cluster_id: &str, request: &UpdateDatabaseRequest) -> Result<(), ApiError> {
        self.client.put::<(), _>(&self.path(cluster_id), request).await
    }

    pub async fn delete(&self, cluster_id: &str) -> Result<(), ApiError> {
        self.client.delete::<()>(&self.path(cluster_id)).await
    }

    /// Every node of the cluster, in the order the API lists them
    pub async fn nodes(&self, cluster_id: &str) -> Result<Vec<Node>, ApiError> {
        let base = format!("{}/node", self.path(cluster_id));
        let ids: Vec<String> = self.client.get(&base).await?;
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            nodes.push(self.client.get(&format!("{}/{}", base, path_escape(&id))).await?);
        }
        Ok(nodes)
    }

    pub fn users(&self, cluster_id: &str) -> DatabaseUsersApi<'a> {
        DatabaseUsersApi {
            client: self.client,
            base: format!("{}/user", self.path(cluster_id)),
        }
    }
}

pub struct DatabaseUsersApi<'a> {
    client: &'a Client,
    base: String,
}

impl DatabaseUsersApi<'_> {
    fn path(&self, user_id: &str) -> String {
        format!("{}/{}", self.base, path_escape(user_id))
    }

    pub async fn get(&self, user_id: &str) -> Result<DatabaseUser, ApiError> {
        self.client.get(&self.path(user_id)).await
    }

    pub async fn create(&self, name: &str) -> Result<DatabaseUser, ApiError> {
        self.client
            .post(&self.base, &CreateUserRequest { name })
            .await
    }

    pub async fn delete(&self, user_id: &str) -> Result<(), ApiError> {
        self.client.delete::<()>(&self.path(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uses_nodes_list() {
        let request = CreateDatabaseRequest {
            description: Some("analytics".to_string()),
            plan: "business".to_string(),
            version: "16".to_string(),
            nodes_list: vec![NodeRequest {
                flavor: "db1-4".to_string(),
                region: "GRA".to_string(),
                subnet_id: None,
                network_id: None,
            }],
            disk: None,
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["nodesList"][0]["flavor"], "db1-4");
        assert!(body.get("disk").is_none());
        assert!(body["nodesList"][0].get("subnetId").is_none());
    }

    #[test]
    fn update_is_applied_once_cluster_shows_it() {
        let database: Database = serde_json::from_str(
            r#"{"id":"c1","description":"old","plan":"business","status":"READY","version":"16",
                "flavor":"db1-4","nodeNumber":2,"disk":{"size":80}}"#,
        )
        .unwrap();

        let resize = UpdateDatabaseRequest {
            node_number: Some(3),
            ..Default::default()
        };
        assert!(!resize.is_applied_to(&database));

        let rename = UpdateDatabaseRequest {
            description: Some("old".to_string()),
            disk: Some(Disk {
                size: Some(80),
                disk_type: None,
            }),
            ..Default::default()
        };
        assert!(rename.is_applied_to(&database));
    }

    #[test]
    fn endpoints_become_objects() {
        let database: Database = serde_json::from_str(
            r#"{"id":"c1","plan":"essential","status":"READY","version":"16","flavor":"db1-4",
                "disk":{"size":80,"type":"high-speed"},
                "endpoints":[{"component":"postgresql","domain":"pg.example","port":20184,"ssl":true,"sslMode":"require"}]}"#,
        )
        .unwrap();
        let mut state = DynamicValue::object();
        database.apply_to_state(&mut state);

        let endpoints = state.get_list(&AttributePath::new("endpoints")).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(
            state
                .get_number(&AttributePath::new("endpoints").index(0).attribute("port"))
                .unwrap(),
            20184.0
        );
        assert_eq!(state.get_string(&AttributePath::new("disk_type")).unwrap(), "high-speed");
        assert!(Endpoint::attribute_type().matches(&endpoints[0]));
    }
}
