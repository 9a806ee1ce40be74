//! Dedicated servers (`/dedicated/server`)

use serde::{Deserialize, Serialize};
use tfplug::types::{AttributePath, DynamicValue};

use super::{path_escape, ApiError, Client};

pub const SERVER_STATES: &[&str] = &["error", "hacked", "hackedBlocked", "ok"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedicatedServer {
    pub name: String,
    #[serde(default)]
    pub server_id: Option<i64>,
    #[serde(default)]
    pub boot_id: Option<i64>,
    #[serde(default)]
    pub commercial_range: Option<String>,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub reverse: Option<String>,
    #[serde(default)]
    pub link_speed: Option<i64>,
    #[serde(default)]
    pub monitoring: bool,
    #[serde(default)]
    pub no_intervention: bool,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub power_state: Option<String>,
    #[serde(default)]
    pub professional_use: bool,
    #[serde(default)]
    pub rack: Option<String>,
    #[serde(default)]
    pub rescue_mail: Option<String>,
    #[serde(default)]
    pub root_device: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub support_level: Option<String>,
}

impl DedicatedServer {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.name.clone());
        let _ = state.set_string(&AttributePath::new("name"), self.name.clone());
        let _ = state.set_optional_number(
            &AttributePath::new("server_id"),
            self.server_id.map(|id| id as f64),
        );
        let _ = state.set_optional_number(&AttributePath::new("boot_id"), self.boot_id.map(|id| id as f64));
        let _ = state.set_optional_string(
            &AttributePath::new("commercial_range"),
            self.commercial_range.clone(),
        );
        let _ = state.set_optional_string(&AttributePath::new("datacenter"), self.datacenter.clone());
        let _ = state.set_optional_string(&AttributePath::new("ip"), self.ip.clone());
        let _ = state.set_optional_string(&AttributePath::new("reverse"), self.reverse.clone());
        let _ = state.set_optional_number(
            &AttributePath::new("link_speed"),
            self.link_speed.map(|speed| speed as f64),
        );
        let _ = state.set_bool(&AttributePath::new("monitoring"), self.monitoring);
        let _ = state.set_bool(&AttributePath::new("no_intervention"), self.no_intervention);
        let _ = state.set_optional_string(&AttributePath::new("os"), self.os.clone());
        let _ = state.set_optional_string(&AttributePath::new("power_state"), self.power_state.clone());
        let _ = state.set_bool(&AttributePath::new("professional_use"), self.professional_use);
        let _ = state.set_optional_string(&AttributePath::new("rack"), self.rack.clone());
        let _ = state.set_optional_string(&AttributePath::new("rescue_mail"), self.rescue_mail.clone());
        let _ = state.set_optional_string(&AttributePath::new("root_device"), self.root_device.clone());
        let _ = state.set_optional_string(&AttributePath::new("state"), self.state.clone());
        let _ = state.set_optional_string(&AttributePath::new("support_level"), self.support_level.clone());
    }
}

/// Request body for PUT /dedicated/server/{serviceName}
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: i64,
    pub function: String,
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub done_date: Option<String>,
}

impl Task {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.task_id.to_string());
        let _ = state.set_string(&AttributePath::new("function"), self.function.clone());
        let _ = state.set_string(&AttributePath::new("status"), self.status.clone());
        let _ = state.set_optional_string(&AttributePath::new("comment"), self.comment.clone());
        let _ = state.set_optional_string(&AttributePath::new("start_date"), self.start_date.clone());
        let _ = state.set_optional_string(&AttributePath::new("done_date"), self.done_date.clone());
    }
}

pub struct DedicatedServerApi<'a> {
    client: &'a Client,
}

impl<'a> DedicatedServerApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn path(service_name: &str) -> String {
        format!("/dedicated/server/{}", path_escape(service_name))
    }

    /// GET /dedicated/server
    pub async fn list(&self) -> Result<Vec<String>, ApiError> {
        self.client.get("/dedicated/server").await
    }

    pub async fn get(&self, service_name: &str) -> Result<DedicatedServer, ApiError> {
        self.client.get(&Self::path(service_name)).await
    }

    pub async fn update(
        &self,
        service_name: &str,
        request: &UpdateServerRequest,
    ) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&Self::path(service_name), request)
            .await
    }

    /// POST /dedicated/server/{serviceName}/reboot
    pub async fn reboot(&self, service_name: &str) -> Result<Task, ApiError> {
        self.client
            .post_empty(&format!("{}/reboot", Self::path(service_name)))
            .await
    }

    pub async fn task(&self, service_name: &str, task_id: i64) -> Result<Task, ApiError> {
        self.client
            .get(&format!("{}/task/{}", Self::path(service_name), task_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_sends_only_set_fields() {
        let request = UpdateServerRequest {
            monitoring: Some(true),
            ..Default::default()
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, serde_json::json!({ "monitoring": true }));
    }

    #[test]
    fn task_id_is_stringified_in_state() {
        let task: Task = serde_json::from_str(
            r#"{"taskId":4242,"function":"hardReboot","status":"init","startDate":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let mut state = DynamicValue::object();
        task.apply_to_state(&mut state);

        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "4242");
        assert!(state.is_null_or_unknown_at(&AttributePath::new("done_date")));
    }
}
