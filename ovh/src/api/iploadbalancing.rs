//! IP Load Balancer (`/ipLoadbalancing/{serviceName}`) API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use super::{path_escape, ApiError, Client};

pub const BALANCE_MODES: &[&str] = &["first", "leastconn", "roundrobin", "source", "uri"];
pub const STICKINESS_MODES: &[&str] = &["sourceIp", "cookie"];
pub const HEALTH_CHECK_TYPES: &[&str] = &["http", "internal", "mysql", "oco", "pgsql", "smtp", "tcp"];
pub const HEALTH_CHECK_METHODS: &[&str] = &["GET", "HEAD", "OPTIONS", "internal"];
pub const HEALTH_CHECK_MATCHES: &[&str] = &["contains", "default", "internal", "matches", "status"];
pub const SERVER_STATUSES: &[&str] = &["active", "inactive"];
pub const PROXY_PROTOCOL_VERSIONS: &[&str] = &["v1", "v2", "v2-ssl", "v2-ssl-cn"];

/// Response from GET /ipLoadbalancing/{serviceName}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpLoadbalancing {
    pub service_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub ip_loadbalancing: Option<String>,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
    #[serde(default)]
    pub zone: Vec<String>,
    #[serde(default)]
    pub offer: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub ssl_configuration: Option<String>,
    #[serde(default)]
    pub vrack_eligibility: bool,
    #[serde(default)]
    pub vrack_name: Option<String>,
}

impl IpLoadbalancing {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.service_name.clone());
        let _ = state.set_string(&AttributePath::new("service_name"), self.service_name.clone());
        let _ = state.set_optional_string(&AttributePath::new("display_name"), self.display_name.clone());
        let _ = state.set_optional_string(
            &AttributePath::new("ip_loadbalancing"),
            self.ip_loadbalancing.clone(),
        );
        let _ = state.set_optional_string(&AttributePath::new("ipv4"), self.ipv4.clone());
        let _ = state.set_optional_string(&AttributePath::new("ipv6"), self.ipv6.clone());
        let _ = state.set_string_list(&AttributePath::new("zone"), &self.zone);
        let _ = state.set_optional_string(&AttributePath::new("offer"), self.offer.clone());
        let _ = state.set_optional_string(&AttributePath::new("state"), self.state.clone());
        let _ = state.set_optional_string(
            &AttributePath::new("ssl_configuration"),
            self.ssl_configuration.clone(),
        );
        let _ = state.set_bool(&AttributePath::new("vrack_eligibility"), self.vrack_eligibility);
        let _ = state.set_optional_string(&AttributePath::new("vrack_name"), self.vrack_name.clone());
    }
}

/// Health check of a farm
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    #[serde(rename = "type")]
    pub check_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub interval: Option<i64>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none", default)]
    pub match_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub force_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub negate: Option<bool>,
}

impl HealthCheck {
    pub fn to_dynamic(&self) -> Dynamic {
        Dynamic::Map(HashMap::from([
            ("type".to_string(), Dynamic::String(self.check_type.clone())),
            ("port".to_string(), self.port.into()),
            ("interval".to_string(), self.interval.into()),
            ("match".to_string(), self.match_kind.clone().into()),
            ("pattern".to_string(), self.pattern.clone().into()),
            ("force_ssl".to_string(), self.force_ssl.into()),
            ("url".to_string(), self.url.clone().into()),
            ("method".to_string(), self.method.clone().into()),
            ("negate".to_string(), self.negate.into()),
        ]))
    }

    /// Reads the single health check block item, if any
    pub fn from_state(state: &DynamicValue) -> Option<Self> {
        let item = AttributePath::new("probe").index(0);
        let check_type = state.get_string(&item.clone().attribute("type")).ok()?;
        Some(Self {
            check_type,
            port: state.get_i64(&item.clone().attribute("port")).ok(),
            interval: state.get_i64(&item.clone().attribute("interval")).ok(),
            match_kind: state.get_string(&item.clone().attribute("match")).ok(),
            pattern: state.get_string(&item.clone().attribute("pattern")).ok(),
            force_ssl: state.get_bool(&item.clone().attribute("force_ssl")).ok(),
            url: state.get_string(&item.clone().attribute("url")).ok(),
            method: state.get_string(&item.clone().attribute("method")).ok(),
            negate: state.get_bool(&item.attribute("negate")).ok(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpFarm {
    pub farm_id: i64,
    pub zone: String,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub balance: Option<String>,
    #[serde(default)]
    pub stickiness: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub vrack_network_id: Option<i64>,
    #[serde(rename = "probe", default)]
    pub health_check: Option<HealthCheck>,
}

impl HttpFarm {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.farm_id.to_string());
        let _ = state.set_string(&AttributePath::new("zone"), self.zone.clone());
        let _ = state.set_optional_number(&AttributePath::new("port"), self.port.map(|p| p as f64));
        let _ = state.set_optional_string(&AttributePath::new("balance"), self.balance.clone());
        let _ = state.set_optional_string(&AttributePath::new("stickiness"), self.stickiness.clone());
        let _ = state.set_optional_string(&AttributePath::new("display_name"), self.display_name.clone());
        let _ = state.set_optional_number(
            &AttributePath::new("vrack_network_id"),
            self.vrack_network_id.map(|id| id as f64),
        );
        let check = self.health_check.iter().map(HealthCheck::to_dynamic).collect();
        let _ = state.set_list(&AttributePath::new("probe"), check);
    }
}

/// Request body for POST and PUT on .../http/farm
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpFarmRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stickiness: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrack_network_id: Option<i64>,
    #[serde(rename = "probe", skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmServer {
    pub server_id: i64,
    pub address: String,
    pub status: String,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default)]
    pub ssl: Option<bool>,
    #[serde(default)]
    pub backup: Option<bool>,
    #[serde(rename = "probe", default)]
    pub health_checked: Option<bool>,
    #[serde(default)]
    pub proxy_protocol_version: Option<String>,
    #[serde(default)]
    pub cookie: Option<String>,
}

impl FarmServer {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.server_id.to_string());
        let _ = state.set_string(&AttributePath::new("address"), self.address.clone());
        let _ = state.set_string(&AttributePath::new("status"), self.status.clone());
        let _ = state.set_optional_number(&AttributePath::new("port"), self.port.map(|p| p as f64));
        let _ = state.set_optional_string(&AttributePath::new("display_name"), self.display_name.clone());
        let _ = state.set_optional_number(&AttributePath::new("weight"), self.weight.map(|w| w as f64));
        let _ = state.set_optional_bool(&AttributePath::new("ssl"), self.ssl);
        let _ = state.set_optional_bool(&AttributePath::new("backup"), self.backup);
        let _ = state.set_optional_bool(&AttributePath::new("probe"), self.health_checked);
        let _ = state.set_optional_string(
            &AttributePath::new("proxy_protocol_version"),
            self.proxy_protocol_version.clone(),
        );
        let _ = state.set_optional_string(&AttributePath::new("cookie"), self.cookie.clone());
    }
}

/// Request body for POST and PUT on .../http/farm/{farmId}/server
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmServerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<bool>,
    #[serde(rename = "probe", skip_serializing_if = "Option::is_none")]
    pub health_checked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_protocol_version: Option<String>,
}

/// Asynchronous operation on a load balancer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub action: String,
    pub status: String,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub done_date: Option<String>,
}

pub struct IpLoadbalancingApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> IpLoadbalancingApi<'a> {
    pub fn new(client: &'a Client, service_name: &str) -> Self {
        Self {
            client,
            base: format!("/ipLoadbalancing/{}", path_escape(service_name)),
        }
    }

    /// GET /ipLoadbalancing/{serviceName}
    pub async fn get(&self) -> Result<IpLoadbalancing, ApiError> {
        self.client.get(&self.base).await
    }

    /// POST /ipLoadbalancing/{serviceName}/refresh
    ///
    /// Applies pending configuration changes.
    pub async fn refresh(&self) -> Result<Task, ApiError> {
        self.client
            .post_empty(&format!("{}/refresh", self.base))
            .await
    }

    /// GET /ipLoadbalancing/{serviceName}/task/{id}
    pub async fn task(&self, task_id: i64) -> Result<Task, ApiError> {
        self.client
            .get(&format!("{}/task/{}", self.base, task_id))
            .await
    }

    pub fn http_farms(&self) -> HttpFarmsApi<'a> {
        HttpFarmsApi {
            client: self.client,
            base: format!("{}/http/farm", self.base),
        }
    }
}

pub struct HttpFarmsApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> HttpFarmsApi<'a> {
    pub async fn get(&self, farm_id: i64) -> Result<HttpFarm, ApiError> {
        self.client.get(&format!("{}/{}", self.base, farm_id)).await
    }

    pub async fn create(&self, request: &HttpFarmRequest) -> Result<HttpFarm, ApiError> {
        self.client.post(&self.base, request).await
    }

    pub async fn update(&self, farm_id: i64, request: &HttpFarmRequest) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&format!("{}/{}", self.base, farm_id), request)
            .await
    }

    pub async fn delete(&self, farm_id: i64) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", self.base, farm_id))
            .await
    }

    pub fn servers(&self, farm_id: i64) -> FarmServersApi<'a> {
        FarmServersApi {
            client: self.client,
            base: format!("{}/{}/server", self.base, farm_id),
        }
    }
}

pub struct FarmServersApi<'a> {
    client: &'a Client,
    base: String,
}

impl FarmServersApi<'_> {
    pub async fn get(&self, server_id: i64) -> Result<FarmServer, ApiError> {
        self.client.get(&format!("{}/{}", self.base, server_id)).await
    }

    pub async fn create(&self, request: &FarmServerRequest) -> Result<FarmServer, ApiError> {
        self.client.post(&self.base, request).await
    }

    pub async fn update(&self, server_id: i64, request: &FarmServerRequest) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&format!("{}/{}", self.base, server_id), request)
            .await
    }

    pub async fn delete(&self, server_id: i64) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", self.base, server_id))
            .await
    }
}
