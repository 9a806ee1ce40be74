//! DNS zone (`/domain/zone`) API

use serde::{Deserialize, Serialize};
use tfplug::types::{AttributePath, DynamicValue};

use super::{path_escape, ApiError, Client};

/// Response from GET /domain/zone/{zoneName}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub name: String,
    #[serde(default)]
    pub has_dns_anycast: bool,
    #[serde(default)]
    pub dnssec_supported: bool,
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub last_update: Option<String>,
}

impl Zone {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.name.clone());
        let _ = state.set_string(&AttributePath::new("name"), self.name.clone());
        let _ = state.set_bool(&AttributePath::new("has_dns_anycast"), self.has_dns_anycast);
        let _ = state.set_bool(&AttributePath::new("dnssec_supported"), self.dnssec_supported);
        let _ = state.set_string_list(&AttributePath::new("name_servers"), &self.name_servers);
        let _ = state.set_optional_string(&AttributePath::new("last_update"), self.last_update.clone());
    }
}

/// A record of a DNS zone
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub zone: String,
    pub field_type: String,
    #[serde(default)]
    pub sub_domain: String,
    pub target: String,
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl Record {
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.id.to_string());
        let _ = state.set_string(&AttributePath::new("zone"), self.zone.clone());
        let _ = state.set_string(&AttributePath::new("fieldtype"), self.field_type.clone());
        let _ = state.set_string(&AttributePath::new("subdomain"), self.sub_domain.clone());
        let _ = state.set_string(&AttributePath::new("target"), self.target.clone());
        let _ = state.set_optional_number(
            &AttributePath::new("ttl"),
            self.ttl.map(|ttl| ttl as f64),
        );
    }
}

/// Request body for POST /domain/zone/{zoneName}/record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub field_type: String,
    pub sub_domain: String,
    pub target: String,
    pub ttl: i64,
}

/// Request body for PUT /domain/zone/{zoneName}/record/{id}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    pub sub_domain: String,
    pub target: String,
    pub ttl: i64,
}

pub struct DomainApi<'a> {
    client: &'a Client,
}

impl<'a> DomainApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /domain/zone/{zoneName}
    pub async fn zone(&self, zone: &str) -> Result<Zone, ApiError> {
        self.client
            .get(&format!("/domain/zone/{}", path_escape(zone)))
            .await
    }

    /// POST /domain/zone/{zoneName}/refresh
    ///
    /// Record changes are only published once the zone is refreshed.
    pub async fn refresh_zone(&self, zone: &str) -> Result<(), ApiError> {
        tracing::debug!("Refreshing zone {}", zone);
        self.client
            .post_empty::<()>(&format!("/domain/zone/{}/refresh", path_escape(zone)))
            .await
    }

    pub fn records(&self, zone: &str) -> RecordsApi<'a> {
        RecordsApi {
            client: self.client,
            base: format!("/domain/zone/{}/record", path_escape(zone)),
        }
    }
}

pub struct RecordsApi<'a> {
    client: &'a Client,
    base: String,
}

impl RecordsApi<'_> {
    /// GET /domain/zone/{zoneName}/record/{id}
    pub async fn get(&self, id: i64) -> Result<Record, ApiError> {
        self.client.get(&format!("{}/{}", self.base, id)).await
    }

    /// POST /domain/zone/{zoneName}/record
    pub async fn create(&self, request: &CreateRecordRequest) -> Result<Record, ApiError> {
        self.client.post(&self.base, request).await
    }

    /// PUT /domain/zone/{zoneName}/record/{id}
    pub async fn update(&self, id: i64, request: &UpdateRecordRequest) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&format!("{}/{}", self.base, id), request)
            .await
    }

    /// DELETE /domain/zone/{zoneName}/record/{id}
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", self.base, id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_state_uses_string_id() {
        let record: Record = serde_json::from_str(
            r#"{"id":5123,"zone":"example.com","fieldType":"A","subDomain":"www","target":"1.2.3.4","ttl":3600}"#,
        )
        .unwrap();
        let mut state = DynamicValue::object();
        record.apply_to_state(&mut state);

        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "5123");
        assert_eq!(state.get_string(&AttributePath::new("fieldtype")).unwrap(), "A");
        assert_eq!(state.get_number(&AttributePath::new("ttl")).unwrap(), 3600.0);
    }
}
